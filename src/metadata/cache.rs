//! Bounded memoization of decoded method bodies.
//!
//! Decoded bodies are a pure function of the class bytes, so they can be dropped and rebuilt
//! at any time. [`BodyCache`] keeps at most `capacity` of them per class and evicts the
//! least recently used entry when full. Two threads asking for the same uncached body may
//! both decode it; the second insert simply replaces the first with an equivalent value.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

struct CacheEntry<V> {
    value: Arc<V>,
    last_used: u64,
}

struct CacheState<V> {
    entries: HashMap<usize, CacheEntry<V>>,
    clock: u64,
}

/// A mutex-guarded LRU map from method index to shared value.
pub struct BodyCache<V> {
    capacity: usize,
    state: Mutex<CacheState<V>>,
}

impl<V> BodyCache<V> {
    /// Creates a cache holding at most `capacity` values. `0` disables caching.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        BodyCache {
            capacity,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                clock: 0,
            }),
        }
    }

    /// Maximum number of values kept.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of values currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        lock!(self.state).entries.len()
    }

    /// `true` when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the value for `key` and marks it most recently used.
    #[must_use]
    pub fn get(&self, key: usize) -> Option<Arc<V>> {
        let mut state = lock!(self.state);
        state.clock += 1;
        let now = state.clock;
        state.entries.get_mut(&key).map(|entry| {
            entry.last_used = now;
            Arc::clone(&entry.value)
        })
    }

    /// Stores `value` for `key`, evicting the least recently used entry if full.
    pub fn insert(&self, key: usize, value: Arc<V>) {
        if self.capacity == 0 {
            return;
        }

        let mut state = lock!(self.state);
        state.clock += 1;
        let now = state.clock;

        if !state.entries.contains_key(&key) && state.entries.len() >= self.capacity {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| *key);
            if let Some(oldest) = oldest {
                state.entries.remove(&oldest);
            }
        }

        state.entries.insert(
            key,
            CacheEntry {
                value,
                last_used: now,
            },
        );
    }

    /// Drops every cached value.
    pub fn clear(&self) {
        lock!(self.state).entries.clear();
    }
}

impl<V> std::fmt::Debug for BodyCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used() {
        let cache = BodyCache::new(2);
        cache.insert(1, Arc::new("one"));
        cache.insert(2, Arc::new("two"));
        assert_eq!(cache.get(1).as_deref(), Some(&"one"));

        cache.insert(3, Arc::new("three"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(2).is_none());
        assert!(cache.get(1).is_some());
        assert!(cache.get(3).is_some());
    }

    #[test]
    fn replacing_does_not_evict() {
        let cache = BodyCache::new(2);
        cache.insert(1, Arc::new(10));
        cache.insert(2, Arc::new(20));
        cache.insert(2, Arc::new(21));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(2).as_deref(), Some(&21));
        assert!(cache.get(1).is_some());
    }

    #[test]
    fn zero_capacity_disables() {
        let cache = BodyCache::new(0);
        cache.insert(1, Arc::new(()));
        assert!(cache.is_empty());
        assert!(cache.get(1).is_none());
    }

    #[test]
    fn shared_across_threads() {
        let cache = Arc::new(BodyCache::new(8));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache.insert(i, Arc::new(i * 2));
                    cache.get(i).map(|v| *v)
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), Some(i * 2));
        }

        cache.clear();
        assert!(cache.is_empty());
    }
}
