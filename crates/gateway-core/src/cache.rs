//! Time- and size-bounded key/value cache with access-order eviction.
//!
//! `get` touches the access time of the entry it returns; expired entries
//! are deleted lazily on lookup rather than swept proactively. `set` on a
//! new key that would overflow capacity evicts whichever live entry has
//! the oldest access time — not insertion order, access order.

use std::hash::Hash;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::time::now_ms;

struct CacheEntry<V> {
    value: V,
    expires_at: u64,
    access_time: u64,
}

/// A bounded, TTL-aware cache keyed by `K`.
///
/// Safe to share across tasks: all mutation goes through a single
/// `parking_lot::Mutex`, and the mutex is never held across an `.await`
/// point by callers (the API client takes the lock only for the
/// synchronous get/set calls below).
pub struct BoundedCache<K, V> {
    capacity: usize,
    entries: Mutex<IndexMap<K, CacheEntry<V>>>,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache holding at most `capacity` live entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Use [`BoundedCache::try_new`] to
    /// handle that case without panicking.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::try_new(capacity).expect("BoundedCache capacity must be greater than zero")
    }

    /// Fallible constructor; returns `None` for a zero capacity.
    #[must_use]
    pub fn try_new(capacity: usize) -> Option<Self> {
        if capacity == 0 {
            return None;
        }
        Some(Self {
            capacity,
            entries: Mutex::new(IndexMap::with_capacity(capacity)),
        })
    }

    /// Number of live entries currently stored (includes not-yet-expired
    /// entries only; this does not trigger expiry of anything else).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Look up `key`. Returns `None` if absent or expired; on a hit,
    /// refreshes the entry's access time.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock();
        let now = now_ms();

        let expired = match entries.get(key) {
            Some(entry) => entry.expires_at <= now,
            None => return None,
        };

        if expired {
            entries.shift_remove(key);
            return None;
        }

        let entry = entries.get_mut(key).expect("checked above");
        entry.access_time = now;
        Some(entry.value.clone())
    }

    /// Insert or update `key` with a time-to-live of `ttl_ms`.
    ///
    /// If inserting a new key would exceed capacity, evicts the live
    /// entry with the smallest access time first.
    pub fn set(&self, key: K, value: V, ttl_ms: u64) {
        let mut entries = self.entries.lock();
        let now = now_ms();

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            if let Some(evict_key) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.access_time)
                .map(|(k, _)| k.clone())
            {
                entries.shift_remove(&evict_key);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now.saturating_add(ttl_ms),
                access_time: now,
            },
        );
    }

    /// Remove `key` unconditionally. Returns whether it was present.
    pub fn remove(&self, key: &K) -> bool {
        self.entries.lock().shift_remove(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_returns_value() {
        let cache = BoundedCache::new(4);
        cache.set("a", 1, 10_000);
        assert_eq!(cache.get(&"a"), Some(1));
    }

    #[test]
    fn get_on_expired_entry_returns_none_and_deletes_it() {
        let cache: BoundedCache<&str, i32> = BoundedCache::new(4);
        cache.set("a", 1, 0);
        // ttl of 0ms: expires_at == now, and now() on the next call is
        // always >= that, so the entry reads as expired immediately.
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert_eq!(cache.get(&"a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn overflow_evicts_minimum_access_time_entry() {
        let cache = BoundedCache::new(2);
        cache.set("a", 1, 10_000);
        std::thread::sleep(std::time::Duration::from_millis(2));
        cache.set("b", 2, 10_000);
        // touch "b" so "a" is strictly the oldest by access time
        std::thread::sleep(std::time::Duration::from_millis(2));
        cache.get(&"b");
        std::thread::sleep(std::time::Duration::from_millis(2));

        cache.set("c", 3, 10_000);

        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(2));
        assert_eq!(cache.get(&"c"), Some(3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let cache = BoundedCache::new(3);
        for i in 0..50 {
            cache.set(i, i, 10_000);
            assert!(cache.len() <= 3);
        }
    }

    #[test]
    fn updating_an_existing_key_does_not_evict() {
        let cache = BoundedCache::new(2);
        cache.set("a", 1, 10_000);
        cache.set("b", 2, 10_000);
        cache.set("a", 99, 10_000);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a"), Some(99));
        assert_eq!(cache.get(&"b"), Some(2));
    }
}
