use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Key namespace shared with the rest of the product family; cached data
/// written by other clients under the same namespace stays interoperable.
pub const CACHE_PREFIX: &str = "prelude_data_cache_";

/// Entries older than this are fair game for eviction when a write runs out
/// of room, regardless of their logical TTL.
const MAX_ENTRY_AGE: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug)]
pub struct QuotaExceeded;

/// Storage a `CacheStore` can be mounted on. Disk in production, a plain
/// map in tests.
pub trait CacheBackend: Send + Sync {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&self, key: &str, value: &str) -> std::result::Result<(), QuotaExceeded>;
    fn remove(&self, key: &str);
    fn keys(&self) -> Vec<String>;
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    data: serde_json::Value,
    timestamp: i64,
}

/// TTL-aware key-value cache. Keys are namespaced and optionally suffixed
/// with the signed-in user's email, which is the only thing keeping two
/// accounts on one machine from reading each other's lists.
pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    prefix: String,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            prefix: CACHE_PREFIX.to_string(),
        }
    }

    fn full_key(&self, key: &str, user: Option<&str>) -> String {
        match user {
            Some(email) => format!("{}{}_{}", self.prefix, key, email),
            None => format!("{}{}", self.prefix, key),
        }
    }

    /// Read an entry, treating anything past its TTL as absent. An expired
    /// or unreadable entry is deleted on the spot so no later read can see
    /// it again. Never fails.
    pub fn get<T: DeserializeOwned>(&self, key: &str, ttl: Duration, user: Option<&str>) -> Option<T> {
        let full = self.full_key(key, user);
        let raw = self.backend.read(&full)?;

        let envelope: Envelope = match serde_json::from_str(&raw) {
            Ok(e) => e,
            Err(e) => {
                debug!("Dropping unreadable cache entry {}: {}", full, e);
                self.backend.remove(&full);
                return None;
            }
        };

        let age_ms = Utc::now().timestamp_millis() - envelope.timestamp;
        if age_ms > ttl.as_millis() as i64 {
            debug!("Cache entry {} expired ({}ms old), removing", full, age_ms);
            self.backend.remove(&full);
            return None;
        }

        match serde_json::from_value(envelope.data) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Cache entry {} has stale shape, removing: {}", full, e);
                self.backend.remove(&full);
                None
            }
        }
    }

    /// Write an entry stamped with the current time. If the backend is out
    /// of room, evict everything older than the max entry age and retry
    /// once; a second failure is swallowed.
    pub fn set<T: Serialize>(&self, key: &str, data: &T, user: Option<&str>) {
        let full = self.full_key(key, user);
        let envelope = Envelope {
            data: match serde_json::to_value(data) {
                Ok(v) => v,
                Err(e) => {
                    warn!("Refusing to cache unserializable value for {}: {}", full, e);
                    return;
                }
            },
            timestamp: Utc::now().timestamp_millis(),
        };
        let raw = match serde_json::to_string(&envelope) {
            Ok(r) => r,
            Err(e) => {
                warn!("Failed to encode cache envelope for {}: {}", full, e);
                return;
            }
        };

        if self.backend.write(&full, &raw).is_err() {
            debug!("Cache write for {} hit the quota, evicting old entries", full);
            self.evict_older_than(MAX_ENTRY_AGE);
            if self.backend.write(&full, &raw).is_err() {
                warn!("Cache write for {} failed even after eviction, giving up", full);
            }
        }
    }

    pub fn clear(&self, key: &str, user: Option<&str>) {
        self.backend.remove(&self.full_key(key, user));
    }

    pub fn clear_all(&self) {
        for key in self.backend.keys() {
            if key.starts_with(&self.prefix) {
                self.backend.remove(&key);
            }
        }
    }

    fn evict_older_than(&self, max_age: Duration) {
        let now = Utc::now().timestamp_millis();
        for key in self.backend.keys() {
            if !key.starts_with(&self.prefix) {
                continue;
            }
            let Some(raw) = self.backend.read(&key) else {
                continue;
            };
            match serde_json::from_str::<Envelope>(&raw) {
                Ok(envelope) if now - envelope.timestamp <= max_age.as_millis() as i64 => {}
                _ => {
                    debug!("Evicting cache entry {}", key);
                    self.backend.remove(&key);
                }
            }
        }
    }
}

/// In-memory backend. Tests use the optional entry capacity to provoke
/// quota failures.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
    capacity: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: Some(capacity),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CacheBackend for MemoryBackend {
    fn read(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn write(&self, key: &str, value: &str) -> std::result::Result<(), QuotaExceeded> {
        let mut entries = self.lock();
        if let Some(capacity) = self.capacity {
            if !entries.contains_key(key) && entries.len() >= capacity {
                return Err(QuotaExceeded);
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }
}

/// On-disk backend: one JSON file per key under the cache directory, with a
/// byte budget playing the role of the storage quota. Writes go through a
/// temp file and a rename so a crash never leaves a half-written entry.
pub struct DiskBackend {
    directory: PathBuf,
    budget_bytes: u64,
}

impl DiskBackend {
    pub fn new(directory: impl Into<PathBuf>, budget_bytes: u64) -> std::io::Result<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            budget_bytes,
        })
    }

    // Key characters outside [A-Za-z0-9_-] (the `@` and `.` of an email
    // suffix, mostly) are flattened to `_`. The mapping is idempotent, so
    // `keys()` output can be passed straight back to `read`/`remove`.
    fn sanitize(key: &str) -> String {
        key.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{}.json", Self::sanitize(key)))
    }

    fn used_bytes(&self) -> u64 {
        let Ok(entries) = std::fs::read_dir(&self.directory) else {
            return 0;
        };
        entries
            .flatten()
            .filter_map(|e| e.metadata().ok())
            .filter(|m| m.is_file())
            .map(|m| m.len())
            .sum()
    }
}

impl CacheBackend for DiskBackend {
    fn read(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for(key)).ok()
    }

    fn write(&self, key: &str, value: &str) -> std::result::Result<(), QuotaExceeded> {
        let path = self.path_for(key);
        let existing = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let projected = self.used_bytes() - existing + value.len() as u64;
        if projected > self.budget_bytes {
            return Err(QuotaExceeded);
        }

        let tmp = self
            .directory
            .join(format!(".tmp_{}_{:016x}", Self::sanitize(key), fastrand::u64(..)));
        if std::fs::write(&tmp, value).is_err() {
            let _ = std::fs::remove_file(&tmp);
            return Err(QuotaExceeded);
        }
        if std::fs::rename(&tmp, &path).is_err() {
            let _ = std::fs::remove_file(&tmp);
            return Err(QuotaExceeded);
        }
        Ok(())
    }

    fn remove(&self, key: &str) {
        let _ = std::fs::remove_file(self.path_for(key));
    }

    fn keys(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.directory) else {
            return Vec::new();
        };
        entries
            .flatten()
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                name.strip_suffix(".json").map(String::from)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_backend() -> (CacheStore, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        (CacheStore::new(backend.clone() as Arc<dyn CacheBackend>), backend)
    }

    #[test]
    fn get_returns_fresh_data() {
        let (store, _) = store_with_backend();
        store.set("leads", &vec![1, 2, 3], None);
        let back: Option<Vec<i32>> = store.get("leads", Duration::from_secs(60), None);
        assert_eq!(back, Some(vec![1, 2, 3]));
    }

    #[test]
    fn expired_entry_is_absent_and_removed() {
        let (store, backend) = store_with_backend();
        store.set("leads", &vec![1, 2, 3], None);

        std::thread::sleep(Duration::from_millis(30));

        let back: Option<Vec<i32>> = store.get("leads", Duration::from_millis(10), None);
        assert_eq!(back, None);
        // The expired entry must be deleted, not just skipped.
        assert!(backend.read("prelude_data_cache_leads").is_none());
    }

    #[test]
    fn unparseable_entry_is_removed() {
        let (store, backend) = store_with_backend();
        backend
            .write("prelude_data_cache_leads", "not json at all")
            .unwrap();

        let back: Option<Vec<i32>> = store.get("leads", Duration::from_secs(60), None);
        assert_eq!(back, None);
        assert!(backend.read("prelude_data_cache_leads").is_none());
    }

    #[test]
    fn users_never_see_each_others_entries() {
        let (store, _) = store_with_backend();
        store.set("leads", &"alpha", Some("a@example.com"));
        store.set("leads", &"beta", Some("b@example.com"));

        let a: Option<String> = store.get("leads", Duration::from_secs(60), Some("a@example.com"));
        let b: Option<String> = store.get("leads", Duration::from_secs(60), Some("b@example.com"));
        let anon: Option<String> = store.get("leads", Duration::from_secs(60), None);

        assert_eq!(a.as_deref(), Some("alpha"));
        assert_eq!(b.as_deref(), Some("beta"));
        assert_eq!(anon, None);
    }

    #[test]
    fn clear_is_key_and_user_scoped() {
        let (store, _) = store_with_backend();
        store.set("leads", &1, Some("a@example.com"));
        store.set("stats", &2, Some("a@example.com"));
        store.clear("leads", Some("a@example.com"));

        let leads: Option<i32> = store.get("leads", Duration::from_secs(60), Some("a@example.com"));
        let stats: Option<i32> = store.get("stats", Duration::from_secs(60), Some("a@example.com"));
        assert_eq!(leads, None);
        assert_eq!(stats, Some(2));
    }

    #[test]
    fn clear_all_only_touches_namespaced_keys() {
        let (store, backend) = store_with_backend();
        store.set("leads", &1, None);
        backend.write("unrelated_key", "kept").unwrap();

        store.clear_all();

        assert!(backend.read("prelude_data_cache_leads").is_none());
        assert_eq!(backend.read("unrelated_key").as_deref(), Some("kept"));
    }

    #[test]
    fn quota_failure_evicts_old_entries_and_retries() {
        let backend = Arc::new(MemoryBackend::with_capacity(1));
        let store = CacheStore::new(backend.clone() as Arc<dyn CacheBackend>);

        // Seed a stale entry by hand: 25 hours old, past the max entry age.
        let stale = serde_json::json!({
            "data": "old",
            "timestamp": Utc::now().timestamp_millis() - 25 * 60 * 60 * 1000,
        });
        backend
            .write("prelude_data_cache_old", &stale.to_string())
            .unwrap();

        store.set("fresh", &"new", None);

        assert!(backend.read("prelude_data_cache_old").is_none());
        let fresh: Option<String> = store.get("fresh", Duration::from_secs(60), None);
        assert_eq!(fresh.as_deref(), Some("new"));
    }

    #[test]
    fn quota_failure_with_no_evictable_entries_is_silent() {
        let backend = Arc::new(MemoryBackend::with_capacity(1));
        let store = CacheStore::new(backend.clone() as Arc<dyn CacheBackend>);

        store.set("first", &1, None);
        // Second write cannot fit and nothing is old enough to evict; the
        // call must swallow the failure.
        store.set("second", &2, None);

        let first: Option<i32> = store.get("first", Duration::from_secs(60), None);
        let second: Option<i32> = store.get("second", Duration::from_secs(60), None);
        assert_eq!(first, Some(1));
        assert_eq!(second, None);
    }

    #[test]
    fn disk_backend_round_trips_and_lists_keys() {
        let dir = std::env::temp_dir().join(format!("lead_desk_cache_{:016x}", fastrand::u64(..)));
        let backend = DiskBackend::new(&dir, 1024 * 1024).unwrap();

        backend
            .write("prelude_data_cache_leads_a@example.com", "{\"x\":1}")
            .unwrap();

        let keys = backend.keys();
        assert_eq!(keys.len(), 1);
        // Read back through the sanitized name keys() reports.
        assert_eq!(backend.read(&keys[0]).as_deref(), Some("{\"x\":1}"));

        backend.remove(&keys[0]);
        assert!(backend.keys().is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn disk_backend_enforces_byte_budget() {
        let dir = std::env::temp_dir().join(format!("lead_desk_cache_{:016x}", fastrand::u64(..)));
        let backend = DiskBackend::new(&dir, 16).unwrap();

        assert!(backend.write("small", "12345678").is_ok());
        assert!(backend.write("too_big", &"x".repeat(64)).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
