//! Foundation error types shared by every gateway crate.

/// Result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the bounded cache and event store.
///
/// Both structures are infallible in normal operation (eviction and
/// expiry are silent), so this enum only covers programmer-facing misuse:
/// invalid capacities supplied at construction time.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CoreError {
    /// A bounded structure was constructed with a zero capacity.
    #[error("{what} capacity must be greater than zero")]
    ZeroCapacity {
        /// Name of the structure that was misconfigured.
        what: &'static str,
    },

    /// `replayEventsAfter` was called with an event id the store no longer
    /// holds (outside the TTL/size window).
    #[error("unknown event id: {0}")]
    UnknownEventId(String),
}
