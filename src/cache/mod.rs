//! Freshness cache for persisted weather snapshots
//!
//! This module provides the TTL-bounded cache that backs the weather widget:
//! a version-qualified key namespace over an injected key-value storage
//! backend. Expired or malformed records read as misses rather than errors,
//! and storage write failures degrade to in-memory-only caching for the
//! current session.

mod freshness;
mod store;

pub use freshness::{CacheKey, CachedEntry, FreshnessCache, CACHE_TTL};
pub use store::{DiskStore, MemoryStore, StorageBackend, StorageError};
