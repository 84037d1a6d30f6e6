// TTL cache over a pluggable key/value store.
//
// Entries are stored as JSON `{data, timestamp, ttl}` (milliseconds). Reads of
// expired or unreadable entries evict them. Storage failures are logged and
// never surface to callers.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::metrics;

pub const ONGOING_TOURNAMENT_KEY: &str = "cache_ongoing_tournament";
pub const PAST_TOURNAMENTS_KEY: &str = "cache_past_tournaments";
pub const ALL_TIME_LEADERBOARD_KEY: &str = "cache_all_time_leaderboard";

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage lock poisoned")]
    Poisoned,
}

/// String key/value store backing the cache.
pub trait Storage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn set_item(&self, key: &str, value: String) -> Result<(), CacheError>;
    fn remove_item(&self, key: &str) -> Result<(), CacheError>;
    fn keys(&self) -> Result<Vec<String>, CacheError>;
}

/// Process-local storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, CacheError> {
        let map = self.inner.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: String) -> Result<(), CacheError> {
        let mut map = self.inner.lock().map_err(|_| CacheError::Poisoned)?;
        map.insert(key.to_string(), value);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), CacheError> {
        let mut map = self.inner.lock().map_err(|_| CacheError::Poisoned)?;
        map.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, CacheError> {
        let map = self.inner.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(map.keys().cloned().collect())
    }
}

/// Storage persisted to a JSON file, rewritten on every change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    inner: Mutex<HashMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the store at `path`.
    ///
    /// A corrupt file is discarded rather than failing startup.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        let map = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!("Discarding unreadable cache file {}: {e}", path.display());
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            inner: Mutex::new(map),
        })
    }

    fn persist(&self, map: &HashMap<String, String>) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec_pretty(map)?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, CacheError> {
        let map = self.inner.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: String) -> Result<(), CacheError> {
        let mut map = self.inner.lock().map_err(|_| CacheError::Poisoned)?;
        map.insert(key.to_string(), value);
        self.persist(&map)
    }

    fn remove_item(&self, key: &str) -> Result<(), CacheError> {
        let mut map = self.inner.lock().map_err(|_| CacheError::Poisoned)?;
        if map.remove(key).is_some() {
            self.persist(&map)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, CacheError> {
        let map = self.inner.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(map.keys().cloned().collect())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    data: serde_json::Value,
    timestamp: i64,
    ttl: i64,
}

/// TTL cache manager.
///
/// Every invalidation bumps a shared generation counter, so a value loaded
/// before an invalidation can be recognised as stale and dropped.
#[derive(Clone)]
pub struct CacheManager {
    storage: Arc<dyn Storage>,
    default_ttl: Duration,
    generation: Arc<AtomicU64>,
}

impl CacheManager {
    pub fn new(storage: Arc<dyn Storage>, default_ttl: Duration) -> Self {
        Self {
            storage,
            default_ttl,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn in_memory(default_ttl: Duration) -> Self {
        Self::new(Arc::new(MemoryStorage::new()), default_ttl)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Cached value for `key`, or None if missing or expired.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_at(key, now_millis())
    }

    pub(crate) fn get_at<T: DeserializeOwned>(&self, key: &str, now: i64) -> Option<T> {
        let value = self.lookup(key, now);
        metrics::CACHE_LOOKUPS_TOTAL
            .with_label_values(&[if value.is_some() { "hit" } else { "miss" }])
            .inc();
        value
    }

    fn lookup<T: DeserializeOwned>(&self, key: &str, now: i64) -> Option<T> {
        let raw = match self.storage.get_item(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Cache get error for {key}: {e}");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Cache get error for {key}: {e}");
                self.remove(key);
                return None;
            }
        };

        if now - entry.timestamp > entry.ttl {
            self.remove(key);
            return None;
        }

        match serde_json::from_value(entry.data) {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::warn!("Cache get error for {key}: {e}");
                None
            }
        }
    }

    /// Store `data` under `key` with the default TTL.
    pub fn set<T: Serialize>(&self, key: &str, data: &T) {
        self.set_with_ttl(key, data, self.default_ttl);
    }

    pub fn set_with_ttl<T: Serialize>(&self, key: &str, data: &T, ttl: Duration) {
        self.set_at(key, data, ttl, now_millis());
    }

    /// Store `data` unless an invalidation happened since `generation` was
    /// read. Returns whether the value was kept.
    pub fn set_if_current<T: Serialize>(&self, key: &str, data: &T, generation: u64) -> bool {
        if self.generation() != generation {
            return false;
        }
        self.set(key, data);
        // An invalidation racing the write above removes the key after us,
        // or is seen here.
        if self.generation() != generation {
            self.remove(key);
            return false;
        }
        true
    }

    pub(crate) fn set_at<T: Serialize>(&self, key: &str, data: &T, ttl: Duration, now: i64) {
        let result = serde_json::to_value(data)
            .and_then(|data| {
                serde_json::to_string(&CacheEntry {
                    data,
                    timestamp: now,
                    ttl: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
                })
            })
            .map_err(CacheError::from)
            .and_then(|raw| self.storage.set_item(key, raw));

        if let Err(e) = result {
            tracing::warn!("Cache set error for {key}: {e}");
        }
    }

    pub fn invalidate(&self, key: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.remove(key);
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.storage.remove_item(key) {
            tracing::warn!("Cache invalidate error for {key}: {e}");
        }
    }

    pub fn invalidate_multiple(&self, keys: &[&str]) {
        for key in keys {
            self.invalidate(key);
        }
    }

    /// Remove every application cache key (names containing `_cache` or `cache_`).
    pub fn clear_all(&self) {
        match self.storage.keys() {
            Ok(keys) => {
                for key in keys
                    .iter()
                    .filter(|k| k.contains("_cache") || k.contains("cache_"))
                {
                    self.invalidate(key);
                }
            }
            Err(e) => tracing::warn!("Cache clearAll error: {e}"),
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
