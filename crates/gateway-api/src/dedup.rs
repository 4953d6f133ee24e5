//! Single-flight request coalescing for concurrent identical GETs.
//!
//! The in-flight map stores a cloneable [`futures::future::Shared`] future
//! per key. A concurrent caller with the same key joins the in-flight
//! future only while it is younger than [`DEDUP_WINDOW_MS`]; once it ages
//! out, the entry is dropped and the next caller starts a fresh call —
//! this is the Rust read of the "promise-sharing" dedup map described in
//! the system this gateway generalizes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::future::{FutureExt, Shared};
use gateway_core::BoundedCache;
use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::error::ApiResult;
use gateway_core::time::now_ms;

/// Concurrent identical GETs started within this window share one fetch.
pub const DEDUP_WINDOW_MS: u64 = 500;

/// Sweep interval multiplier: entries older than this are purged even if
/// nobody looked them up.
const SWEEP_MULTIPLIER: u64 = 10;

/// Cap on the in-flight map; oldest entries are evicted first.
const MAX_IN_FLIGHT: usize = 500;

type BoxedCall = Pin<Box<dyn Future<Output = ApiResult<serde_json::Value>> + Send>>;
/// A clonable, awaitable handle onto a single outstanding call.
pub type SharedCall = Shared<BoxedCall>;

struct InFlightEntry {
    call: SharedCall,
    created_at: u64,
}

/// Mutex-guarded map of in-flight GET calls, keyed by `METHOD:endpoint:body`.
pub struct DedupMap {
    entries: Mutex<IndexMap<String, InFlightEntry>>,
}

impl Default for DedupMap {
    fn default() -> Self {
        Self::new()
    }
}

impl DedupMap {
    /// Create an empty dedup map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
        }
    }

    /// Look up a live in-flight call for `key`, or register and return
    /// `make()`'s future as the new in-flight entry.
    ///
    /// `make` is only invoked when no fresh entry exists; the caller's
    /// own work only actually runs if it wins the race to populate the map.
    pub fn call_or_insert(
        &self,
        key: &str,
        make: impl FnOnce() -> BoxedCall,
    ) -> SharedCall {
        let now = now_ms();
        let mut entries = self.entries.lock();

        self.sweep_locked(&mut entries, now);

        if let Some(entry) = entries.get(key) {
            if now.saturating_sub(entry.created_at) < DEDUP_WINDOW_MS {
                return entry.call.clone();
            }
            entries.shift_remove(key);
        }

        if entries.len() >= MAX_IN_FLIGHT {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.created_at)
                .map(|(k, _)| k.clone())
            {
                entries.shift_remove(&oldest);
            }
        }

        let call = make().shared();
        entries.insert(
            key.to_string(),
            InFlightEntry {
                call: call.clone(),
                created_at: now,
            },
        );
        call
    }

    fn sweep_locked(&self, entries: &mut IndexMap<String, InFlightEntry>, now: u64) {
        let cutoff = now.saturating_sub(DEDUP_WINDOW_MS * SWEEP_MULTIPLIER);
        entries.retain(|_, entry| entry.created_at >= cutoff);
    }

    /// Number of tracked in-flight calls (test/diagnostic helper).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when no calls are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// The two-tier TTL used for the `/patterns*` cache: short for detail
/// lookups, longer for list/search.
#[must_use]
pub fn pattern_cache_ttl_ms(endpoint: &str) -> u64 {
    const DETAIL_TTL_MS: u64 = 2_000;
    const LIST_TTL_MS: u64 = 5_000;
    const LIST_SEGMENTS: &[&str] = &["search"];

    let path = endpoint.split('?').next().unwrap_or(endpoint);
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    match segments.as_slice() {
        ["patterns", id] if !id.is_empty() && !LIST_SEGMENTS.contains(id) => DETAIL_TTL_MS,
        _ => LIST_TTL_MS,
    }
}

/// Whether `endpoint` is eligible for the bounded pattern cache at all.
#[must_use]
pub fn is_cacheable_pattern_endpoint(endpoint: &str) -> bool {
    endpoint.trim_start_matches('/').starts_with("patterns")
}

/// Bounded LRU cache of raw JSON responses, capacity fixed at 100.
pub const PATTERN_CACHE_CAPACITY: usize = 100;

/// Construct the pattern response cache.
#[must_use]
pub fn new_pattern_cache() -> Arc<BoundedCache<String, serde_json::Value>> {
    Arc::new(BoundedCache::new(PATTERN_CACHE_CAPACITY))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_path_gets_short_ttl() {
        assert_eq!(pattern_cache_ttl_ms("/patterns/abc123"), 2_000);
    }

    #[test]
    fn list_path_gets_long_ttl() {
        assert_eq!(pattern_cache_ttl_ms("/patterns"), 5_000);
        assert_eq!(pattern_cache_ttl_ms("/patterns/search?q=retry"), 5_000);
    }

    #[test]
    fn non_pattern_endpoints_are_not_cacheable() {
        assert!(!is_cacheable_pattern_endpoint("/health"));
        assert!(is_cacheable_pattern_endpoint("/patterns"));
    }

    #[tokio::test]
    async fn concurrent_identical_calls_share_one_invocation() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let map = DedupMap::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let make = || -> BoxedCall {
            let calls = calls.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(serde_json::json!({ "ok": true }))
            })
        };

        let a = map.call_or_insert("GET:/patterns", make);
        let b = map.call_or_insert("GET:/patterns", make);

        let (ra, rb) = tokio::join!(a, b);
        assert!(ra.is_ok());
        assert!(rb.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_entry_triggers_fresh_call() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let map = DedupMap::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let make = || -> BoxedCall {
            let calls = calls.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(serde_json::json!(1))
            })
        };

        let first = map.call_or_insert("GET:/x", make);
        first.await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(DEDUP_WINDOW_MS + 50)).await;

        let second = map.call_or_insert("GET:/x", make);
        second.await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
