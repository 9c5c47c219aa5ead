//! # lrucache
//!
//! Thread-safe, fixed-capacity LRU cache.
//!
//! ## Architecture
//! - **HashMap**: AHash index from key to arena slot (O(1))
//! - **LRU List**: Index-linked doubly-linked list for recency (O(1))
//! - **Mutex**: One lock over both, so they never disagree
//!
//! ```
//! use lrucache::LruCache;
//!
//! let cache = LruCache::new(2);
//! cache.set(1, "a");
//! cache.set(2, "b");
//! assert_eq!(cache.get(&1), Some("a"));
//!
//! cache.set(3, "c"); // evicts 2
//! assert_eq!(cache.get(&2), None);
//! ```
//!
//! Values only leave the cache as owned copies; the list itself stays
//! private to the crate:
//!
//! ```compile_fail
//! use lrucache::LruList;
//! ```

#![warn(missing_docs)]

mod cache;
mod config;
mod error;
mod lru;
mod stats;

pub use cache::LruCache;
pub use config::CacheConfig;
pub use error::{Error, Result};
pub use stats::{CacheStats, StatsSnapshot};
