//! Error types for lrucache

use thiserror::Error;

/// Result type alias for lrucache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cache construction and self-checks
///
/// Nothing on the read/write path returns an error: a miss is `None` and a
/// zero-capacity cache silently declines to store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Capacity was negative
    #[error("Invalid capacity: {0} (must be >= 0)")]
    InvalidCapacity(i64),

    /// Capacity does not fit in `usize` on this target
    #[error("Capacity too large: {0} (max {max})", max = usize::MAX)]
    CapacityTooLarge(i64),

    /// Internal index/list invariant violated
    #[error("Invariant violated: {0}")]
    Invariant(String),
}

impl Error {
    pub(crate) fn invariant<S: Into<String>>(msg: S) -> Self {
        Error::Invariant(msg.into())
    }
}
