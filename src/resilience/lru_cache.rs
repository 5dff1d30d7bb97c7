//! Fixed-capacity LRU cache with true recency-refresh semantics (C1).

use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache as Backing;

use crate::error::ResilienceError;

/// A bounded cache where both `get` and `set` move the touched key to the
/// most-recently-used position; misses never mutate recency order.
pub struct LruCache<K: Hash + Eq, V> {
    backing: Backing<K, V>,
}

impl<K: Hash + Eq, V> LruCache<K, V> {
    /// Construct a cache with the given capacity.
    ///
    /// Returns [`ResilienceError::InvalidCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, ResilienceError> {
        let capacity = NonZeroUsize::new(capacity).ok_or(ResilienceError::InvalidCapacity)?;
        Ok(Self {
            backing: Backing::new(capacity),
        })
    }

    /// Look up `key`, promoting it to most-recently-used on a hit.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.backing.get(key)
    }

    /// Insert or update `key`. Refreshes recency regardless of whether the
    /// key already existed; evicts the least-recently-used entry first when
    /// inserting a new key at capacity.
    pub fn set(&mut self, key: K, value: V) {
        self.backing.put(key, value);
    }

    /// True if `key` is present. Does not affect recency.
    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.backing.contains(key)
    }

    /// Remove `key`, returning its value if present.
    pub fn delete<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.backing.pop(key)
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.backing.clear();
    }

    /// Current number of entries.
    pub fn size(&self) -> usize {
        self.backing.len()
    }

    /// Entries from oldest to most-recently-used.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.backing.iter().rev()
    }
}
