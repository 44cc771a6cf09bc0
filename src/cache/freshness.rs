//! TTL-bounded freshness cache over a key-value storage backend
//!
//! Stores one entry per distinct fetch-parameter combination under a
//! version-qualified key. Validity is re-evaluated on every read against a
//! fixed TTL; expired entries read as misses but are left in place to be
//! overwritten by the next successful fetch. Keys bearing a foreign schema
//! version are purged before the cache serves its first read, so stale-schema
//! entries can never be returned.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::store::StorageBackend;
use crate::config::{Coordinates, Units, View, WidgetConfig};

/// Namespace prefix shared by every key this feature owns
const KEY_NAMESPACE: &str = "weatherCache";

/// Schema version tag embedded in every key; bump when the persisted entry
/// shape changes incompatibly
const SCHEMA_VERSION: &str = "v1";

/// How long a cached entry may be served as fresh
pub const CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Identity of a cache entry: two requests are cache-equivalent iff all
/// components are equal
#[derive(Debug, Clone, PartialEq)]
pub struct CacheKey {
    coordinates: Coordinates,
    units: Units,
    view: View,
    timezone: String,
}

impl CacheKey {
    /// Builds the key for a widget configuration resolved to coordinates
    pub fn new(coordinates: Coordinates, config: &WidgetConfig) -> Self {
        Self {
            coordinates,
            units: config.units,
            view: config.view,
            timezone: config.timezone_or_auto().to_string(),
        }
    }

    /// The colon-delimited, version-qualified storage key
    pub fn storage_key(&self) -> String {
        format!(
            "{}:{}:{},{}:{}:{}:{}",
            KEY_NAMESPACE,
            SCHEMA_VERSION,
            self.coordinates.latitude(),
            self.coordinates.longitude(),
            self.units.as_str(),
            self.view.as_str(),
            self.timezone,
        )
    }
}

/// A cached payload with the timestamp it was stored at
///
/// Persisted as `{"time": <epoch-ms>, "data": <payload>}`; a record missing
/// either field fails to parse and is treated as absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedEntry<T> {
    /// When the payload was stored, in epoch milliseconds
    pub time: i64,
    /// The cached payload
    pub data: T,
}

impl<T> CachedEntry<T> {
    /// Age of this entry relative to `now`; negative clock skew reads as zero
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        let millis = now.timestamp_millis().saturating_sub(self.time);
        Duration::from_millis(millis.max(0) as u64)
    }
}

/// Freshness cache over an injected storage backend
///
/// Constructed once per widget instance; construction purges foreign-version
/// keys so no read can observe an incompatible historical entry. Reads never
/// fail: a missing, unparseable, incomplete, or expired record is a miss.
/// Writes are best-effort: a storage rejection is logged and swallowed, and
/// the in-memory copy held by the caller stays authoritative for the session.
pub struct FreshnessCache {
    store: Arc<dyn StorageBackend>,
    ttl: Duration,
}

impl FreshnessCache {
    /// Creates a cache with the standard 15-minute TTL
    pub fn new(store: Arc<dyn StorageBackend>) -> Self {
        Self::with_ttl(store, CACHE_TTL)
    }

    /// Creates a cache with a custom TTL (tests use short windows)
    pub fn with_ttl(store: Arc<dyn StorageBackend>, ttl: Duration) -> Self {
        let cache = Self { store, ttl };
        cache.purge_foreign_versions();
        cache
    }

    /// The TTL governing every entry in this cache
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Reads the entry for `key`, returning `None` on miss or expiry
    ///
    /// An expired record is not deleted here; it will be overwritten by the
    /// next successful write for the same key.
    pub fn read<T: DeserializeOwned>(
        &self,
        key: &CacheKey,
        now: DateTime<Utc>,
    ) -> Option<CachedEntry<T>> {
        let storage_key = key.storage_key();
        let raw = self.store.get(&storage_key)?;
        let entry: CachedEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                debug!(key = %storage_key, %err, "discarding unparseable cache record");
                return None;
            }
        };

        if entry.age(now) >= self.ttl {
            debug!(key = %storage_key, "cache entry expired");
            return None;
        }

        debug!(key = %storage_key, "cache hit");
        Some(entry)
    }

    /// Persists `{time: now, data: payload}` under the key, best-effort
    pub fn write<T: Serialize>(&self, key: &CacheKey, payload: &T, now: DateTime<Utc>) {
        let entry = CachedEntry {
            time: now.timestamp_millis(),
            data: payload,
        };

        let json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(err) => {
                warn!(%err, "failed to encode cache entry");
                return;
            }
        };

        let storage_key = key.storage_key();
        if let Err(err) = self.store.set(&storage_key, &json) {
            warn!(key = %storage_key, %err, "cache write rejected by storage");
        }
    }

    /// Deletes every key in this feature's namespace that does not carry the
    /// current schema version tag
    pub fn purge_foreign_versions(&self) {
        let namespace = format!("{}:", KEY_NAMESPACE);
        let current = format!("{}:{}:", KEY_NAMESPACE, SCHEMA_VERSION);

        let mut purged = 0usize;
        for key in self.store.keys() {
            if key.starts_with(&namespace) && !key.starts_with(&current) {
                self.store.delete(&key);
                purged += 1;
            }
        }

        if purged > 0 {
            debug!(purged, "purged foreign-version cache entries");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::{MemoryStore, StorageError};
    use chrono::TimeZone;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestPayload {
        temperature: f64,
        code: u8,
    }

    fn test_key() -> CacheKey {
        let coords = Coordinates::new(49.2827, -123.1207).unwrap();
        CacheKey::new(coords, &WidgetConfig::default())
    }

    fn test_payload() -> TestPayload {
        TestPayload {
            temperature: 21.5,
            code: 2,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_storage_key_format() {
        let key = test_key();
        assert_eq!(
            key.storage_key(),
            "weatherCache:v1:49.2827,-123.1207:metric:compact:auto"
        );
    }

    #[test]
    fn test_storage_key_reflects_all_components() {
        let coords = Coordinates::new(49.2827, -123.1207).unwrap();
        let config = WidgetConfig {
            units: Units::Imperial,
            view: View::Detailed,
            timezone: Some("America/Vancouver".to_string()),
            ..Default::default()
        };
        let key = CacheKey::new(coords, &config);
        assert_eq!(
            key.storage_key(),
            "weatherCache:v1:49.2827,-123.1207:imperial:detailed:America/Vancouver"
        );
    }

    #[test]
    fn test_roundtrip_within_ttl() {
        let cache = FreshnessCache::new(Arc::new(MemoryStore::new()));
        let key = test_key();
        let written = test_payload();

        cache.write(&key, &written, now());
        let entry: CachedEntry<TestPayload> = cache
            .read(&key, now() + chrono::Duration::minutes(5))
            .expect("entry aged 5 minutes should be fresh");

        assert_eq!(entry.data, written);
        assert_eq!(entry.time, now().timestamp_millis());
    }

    #[test]
    fn test_expired_entry_reads_as_miss_but_record_remains() {
        let store = Arc::new(MemoryStore::new());
        let cache = FreshnessCache::new(store.clone());
        let key = test_key();

        cache.write(&key, &test_payload(), now());

        let later = now() + chrono::Duration::minutes(15);
        let entry: Option<CachedEntry<TestPayload>> = cache.read(&key, later);
        assert!(entry.is_none(), "entry at exactly TTL age must be a miss");

        // The physical record is not eagerly deleted
        assert!(store.get(&key.storage_key()).is_some());
    }

    #[test]
    fn test_read_just_inside_ttl_is_fresh() {
        let cache = FreshnessCache::new(Arc::new(MemoryStore::new()));
        let key = test_key();
        cache.write(&key, &test_payload(), now());

        let almost = now() + chrono::Duration::minutes(15) - chrono::Duration::milliseconds(1);
        let entry: Option<CachedEntry<TestPayload>> = cache.read(&key, almost);
        assert!(entry.is_some());
    }

    #[test]
    fn test_unparseable_record_is_a_miss() {
        let store = Arc::new(MemoryStore::new());
        let cache = FreshnessCache::new(store.clone());
        let key = test_key();

        store.set(&key.storage_key(), "not json at all").unwrap();
        let entry: Option<CachedEntry<TestPayload>> = cache.read(&key, now());
        assert!(entry.is_none());
    }

    #[test]
    fn test_structurally_incomplete_record_is_a_miss() {
        let store = Arc::new(MemoryStore::new());
        let cache = FreshnessCache::new(store.clone());
        let key = test_key();

        // Missing the data field
        store
            .set(&key.storage_key(), r#"{"time": 1752580800000}"#)
            .unwrap();
        let entry: Option<CachedEntry<TestPayload>> = cache.read(&key, now());
        assert!(entry.is_none());

        // Missing the time field
        store
            .set(
                &key.storage_key(),
                r#"{"data": {"temperature": 20.0, "code": 1}}"#,
            )
            .unwrap();
        let entry: Option<CachedEntry<TestPayload>> = cache.read(&key, now());
        assert!(entry.is_none());
    }

    #[test]
    fn test_keys_are_isolated_per_parameter_combination() {
        let cache = FreshnessCache::new(Arc::new(MemoryStore::new()));
        let coords = Coordinates::new(49.2827, -123.1207).unwrap();

        let metric_key = CacheKey::new(coords, &WidgetConfig::default());
        let imperial_key = CacheKey::new(
            coords,
            &WidgetConfig {
                units: Units::Imperial,
                ..Default::default()
            },
        );

        cache.write(&metric_key, &test_payload(), now());

        let hit: Option<CachedEntry<TestPayload>> = cache.read(&metric_key, now());
        let miss: Option<CachedEntry<TestPayload>> = cache.read(&imperial_key, now());
        assert!(hit.is_some());
        assert!(miss.is_none());
    }

    #[test]
    fn test_purge_removes_only_foreign_versions() {
        let store = Arc::new(MemoryStore::new());
        store
            .set("weatherCache:v0:49,-123:metric:compact:auto", "{}")
            .unwrap();
        store
            .set("weatherCache:v2:49,-123:metric:compact:auto", "{}")
            .unwrap();
        store
            .set(
                "weatherCache:v1:49.2827,-123.1207:metric:compact:auto",
                r#"{"time": 1, "data": {"temperature": 1.0, "code": 0}}"#,
            )
            .unwrap();
        store.set("unrelated:key", "kept").unwrap();

        // Construction runs the purge before any read
        let _cache = FreshnessCache::new(store.clone());

        let mut keys = store.keys();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "unrelated:key".to_string(),
                "weatherCache:v1:49.2827,-123.1207:metric:compact:auto".to_string(),
            ]
        );
    }

    #[test]
    fn test_two_caches_share_entries_through_one_store() {
        let store = Arc::new(MemoryStore::new());
        let writer = FreshnessCache::new(store.clone());
        let reader = FreshnessCache::new(store);
        let key = test_key();

        writer.write(&key, &test_payload(), now());
        let entry: Option<CachedEntry<TestPayload>> = reader.read(&key, now());
        assert_eq!(entry.map(|e| e.data), Some(test_payload()));
    }

    /// Backend that rejects every write, for exercising best-effort semantics
    struct RejectingStore;

    impl StorageBackend for RejectingStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "quota exceeded",
            )))
        }

        fn delete(&self, _key: &str) {}

        fn keys(&self) -> Vec<String> {
            Vec::new()
        }
    }

    #[test]
    fn test_rejected_write_is_swallowed() {
        let cache = FreshnessCache::new(Arc::new(RejectingStore));
        // Must not panic or surface the failure
        cache.write(&test_key(), &test_payload(), now());
    }

    #[test]
    fn test_custom_ttl_is_honored() {
        let cache =
            FreshnessCache::with_ttl(Arc::new(MemoryStore::new()), Duration::from_secs(60));
        let key = test_key();
        cache.write(&key, &test_payload(), now());

        let fresh: Option<CachedEntry<TestPayload>> =
            cache.read(&key, now() + chrono::Duration::seconds(59));
        let stale: Option<CachedEntry<TestPayload>> =
            cache.read(&key, now() + chrono::Duration::seconds(60));
        assert!(fresh.is_some());
        assert!(stale.is_none());
    }
}
