//! Millisecond timestamp helpers.
//!
//! Every bounded structure in this crate stores timestamps as `u64`
//! milliseconds since the Unix epoch rather than `Instant`/`SystemTime`
//! directly, so tests can construct entries with explicit, deterministic
//! times (see `cache::tests` and `event_store::tests`).

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
