//! # Cache Store
//!
//! Bounded, evicting on-disk byte store shared by every session and by the
//! pre-cache workers.
//!
//! ```text
//! ┌──────────────────────┐      ┌───────────────────────┐
//! │  CacheDataSource     │─────>│      CacheStore       │
//! │  (read-through)      │      │  - read()             │
//! └──────────────────────┘      │  - start_write()      │
//! ┌──────────────────────┐      │  - clear()            │
//! │  PreCacheWorker      │─────>│  LRU index + spans    │
//! └──────────────────────┘      └──────────┬────────────┘
//!                                          │
//!                                 <dir>/index.json
//!                                 <dir>/<sha256>.<pos>.<id>.span
//! ```
//!
//! Entries are keyed by the explicit cache key of a source, or by its URI.
//! The sum of all spans never exceeds the configured ceiling: a write first
//! evicts least recently used entries, skipping keys held by a writer, and
//! fails with [`PlaybackError::CacheFull`](crate::PlaybackError::CacheFull)
//! when nothing else can go.

pub mod config;
pub mod shared;
pub mod stats;
pub mod store;

pub use config::CacheConfig;
pub use shared::SharedCache;
pub use stats::CacheStats;
pub use store::{CacheEntry, CacheSpan, CacheStore, CacheWriter};
