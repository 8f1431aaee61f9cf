use std::borrow::Borrow;
use std::hash::Hash;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use hashbrown::HashMap;
use parking_lot::Mutex;

/// Per-identity state kept by a policy.
pub trait State: Default {
    /// A vacant state carries nothing worth keeping and is dropped from the
    /// store, so a default state must be vacant.
    fn is_vacant(&self) -> bool;
}

/// Keyed store of policy states.
///
/// `update` is the only way to touch a state: the closure sees the
/// identity's state (a default, vacant one if the identity is unknown) and
/// runs without interleaving with any other `update` of the same identity.
/// Whatever is vacant once the closure returns is not kept.
pub trait Storage<K, S: State> {
    fn update<Q, R, F>(&self, key: &Q, f: F) -> R
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
        F: FnOnce(&mut S) -> R;

    /// Runs `f` on every stored state, dropping those left vacant. Returns
    /// the number of dropped identities.
    fn sweep<F>(&self, f: F) -> usize
    where
        F: FnMut(&K, &mut S);

    fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized;

    fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Every identity behind one lock.
#[derive(Debug)]
pub struct InMemoryStorage<K, S> {
    store: Mutex<HashMap<K, S>>,
}

impl<K, S> InMemoryStorage<K, S> {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, S> Default for InMemoryStorage<K, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq, S: State> Storage<K, S> for InMemoryStorage<K, S> {
    fn update<Q, R, F>(&self, key: &Q, f: F) -> R
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
        F: FnOnce(&mut S) -> R,
    {
        let mut store = self.store.lock();

        if let Some(state) = store.get_mut(key) {
            let result = f(state);
            if state.is_vacant() {
                store.remove(key);
            }
            return result;
        }

        let mut state = S::default();
        let result = f(&mut state);
        if !state.is_vacant() {
            store.insert(key.to_owned(), state);
        }

        result
    }

    fn sweep<F>(&self, mut f: F) -> usize
    where
        F: FnMut(&K, &mut S),
    {
        let mut store = self.store.lock();
        let before = store.len();

        store.retain(|key, state| {
            f(key, state);
            !state.is_vacant()
        });

        before - store.len()
    }

    fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.store.lock().remove(key).is_some()
    }

    fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.store.lock().contains_key(key)
    }

    fn len(&self) -> usize {
        self.store.lock().len()
    }
}

/// Identities spread over independently locked shards, so callers working on
/// different identities rarely contend.
#[derive(Debug)]
pub struct ShardedStorage<K: Hash + Eq, S> {
    store: DashMap<K, S>,
}

impl<K: Hash + Eq, S> ShardedStorage<K, S> {
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
        }
    }
}

impl<K: Hash + Eq, S> Default for ShardedStorage<K, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq, S: State> Storage<K, S> for ShardedStorage<K, S> {
    fn update<Q, R, F>(&self, key: &Q, f: F) -> R
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
        F: FnOnce(&mut S) -> R,
    {
        // The entry guard holds the shard lock until the slot is settled, so no
        // other caller ever sees a vacant state.
        match self.store.entry(key.to_owned()) {
            Entry::Occupied(mut occupied) => {
                let result = f(occupied.get_mut());
                if occupied.get().is_vacant() {
                    occupied.remove();
                }
                result
            }
            Entry::Vacant(vacant) => {
                let mut state = S::default();
                let result = f(&mut state);
                if !state.is_vacant() {
                    vacant.insert(state);
                }
                result
            }
        }
    }

    fn sweep<F>(&self, mut f: F) -> usize
    where
        F: FnMut(&K, &mut S),
    {
        // Counted per entry: shards are locked one at a time, so the map's
        // length may move while the sweep runs.
        let mut dropped = 0;

        self.store.retain(|key, state| {
            f(key, state);
            let keep = !state.is_vacant();
            dropped += usize::from(!keep);
            keep
        });

        dropped
    }

    fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.store.remove(key).is_some()
    }

    fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.store.contains_key(key)
    }

    fn len(&self) -> usize {
        self.store.len()
    }
}
