//! Cache construction parameters

use crate::error::{Error, Result};

/// Validated configuration for an [`LruCache`](crate::LruCache)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries (0 disables storage)
    pub capacity: usize,
}

impl CacheConfig {
    /// Create a config with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Create a config from a signed capacity, rejecting negatives
    ///
    /// Capacities arriving from CLI flags, env vars or other untyped sources
    /// go through here so a negative value is an error rather than clamped.
    /// A positive value that overflows `usize` (32-bit targets) is reported
    /// separately.
    pub fn from_signed(capacity: i64) -> Result<Self> {
        if capacity < 0 {
            return Err(Error::InvalidCapacity(capacity));
        }
        usize::try_from(capacity)
            .map(Self::new)
            .map_err(|_| Error::CapacityTooLarge(capacity))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_signed_accepts_zero_and_positive() {
        assert_eq!(CacheConfig::from_signed(0).unwrap().capacity, 0);
        assert_eq!(CacheConfig::from_signed(42).unwrap().capacity, 42);
    }

    #[test]
    fn test_from_signed_rejects_negative() {
        assert_eq!(
            CacheConfig::from_signed(-1),
            Err(Error::InvalidCapacity(-1))
        );
        assert_eq!(
            CacheConfig::from_signed(i64::MIN),
            Err(Error::InvalidCapacity(i64::MIN))
        );
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_from_signed_accepts_i64_max() {
        assert_eq!(
            CacheConfig::from_signed(i64::MAX).unwrap().capacity,
            i64::MAX as usize
        );
    }

    #[test]
    #[cfg(not(target_pointer_width = "64"))]
    fn test_from_signed_overflowing_usize_is_too_large() {
        let capacity = usize::MAX as i64 + 1;
        assert_eq!(
            CacheConfig::from_signed(capacity),
            Err(Error::CapacityTooLarge(capacity))
        );
    }
}
