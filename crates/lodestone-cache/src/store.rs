//! Persistent TTL key/value store.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lodestone_core::sha256_hex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Errors raised by the cache store.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// One stored entry. Expiry is evaluated lazily when the entry is read.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    data: Value,
    timestamp: DateTime<Utc>,
    ttl_secs: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.timestamp);
        age.num_seconds() < 0 || age.num_seconds() as u64 > self.ttl_secs
    }
}

/// JSON-file-backed key/value store with per-entry TTL.
///
/// The whole store is loaded into memory at open time; every mutation is
/// written back under one async mutex, which serializes concurrent
/// read-modify-write cycles so no update is lost.
pub struct CacheStore {
    path: PathBuf,
    default_ttl: Duration,
    entries: Mutex<BTreeMap<String, CacheEntry>>,
}

impl CacheStore {
    /// Open the store, loading existing entries and sweeping any that have
    /// already expired. A missing or unreadable file starts empty rather
    /// than failing - the cache is an accelerator, not a source of truth.
    pub async fn open(path: PathBuf, default_ttl: Duration) -> CacheResult<Self> {
        let mut entries: BTreeMap<String, CacheEntry> = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cache file unreadable, starting empty");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };

        let now = Utc::now();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let swept = before - entries.len();

        let store = Self {
            path,
            default_ttl,
            entries: Mutex::new(entries),
        };
        if swept > 0 {
            info!(swept, "swept expired cache entries at startup");
            store.persist(&*store.entries.lock().await).await?;
        }
        Ok(store)
    }

    /// Fetch a value by semantic key. Expired entries read as absent.
    pub async fn get(&self, key: &str) -> Option<Value> {
        let hash = sha256_hex(key);
        let entries = self.entries.lock().await;
        match entries.get(&hash) {
            Some(entry) if !entry.is_expired(Utc::now()) => {
                debug!(key = %truncate_key(key), "cache hit");
                Some(entry.data.clone())
            }
            Some(_) => {
                debug!(key = %truncate_key(key), "cache entry expired");
                None
            }
            None => None,
        }
    }

    /// Store a value under a semantic key with the default TTL.
    pub async fn set(&self, key: &str, data: Value) -> CacheResult<()> {
        self.set_with_ttl(key, data, self.default_ttl).await
    }

    /// Store a value under a semantic key with an explicit TTL.
    pub async fn set_with_ttl(&self, key: &str, data: Value, ttl: Duration) -> CacheResult<()> {
        let hash = sha256_hex(key);
        let mut entries = self.entries.lock().await;
        entries.insert(
            hash,
            CacheEntry {
                data,
                timestamp: Utc::now(),
                ttl_secs: ttl.as_secs(),
            },
        );
        self.persist(&entries).await?;
        debug!(key = %truncate_key(key), "cache entry stored");
        Ok(())
    }

    /// Remove one entry by semantic key.
    pub async fn remove(&self, key: &str) -> CacheResult<()> {
        let hash = sha256_hex(key);
        let mut entries = self.entries.lock().await;
        if entries.remove(&hash).is_some() {
            self.persist(&entries).await?;
        }
        Ok(())
    }

    /// Drop every entry and the backing file.
    pub async fn clear(&self) -> CacheResult<()> {
        let mut entries = self.entries.lock().await;
        entries.clear();
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        info!("cache cleared");
        Ok(())
    }

    /// Write the current state to disk. Called by every mutation; exposed
    /// for the shutdown path.
    pub async fn flush(&self) -> CacheResult<()> {
        let entries = self.entries.lock().await;
        self.persist(&entries).await
    }

    async fn persist(&self, entries: &BTreeMap<String, CacheEntry>) -> CacheResult<()> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}

fn truncate_key(key: &str) -> &str {
    let end = key
        .char_indices()
        .nth(50)
        .map(|(idx, _)| idx)
        .unwrap_or(key.len());
    &key[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn open_temp(ttl: Duration) -> (CacheStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path().join("cache.json"), ttl)
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn set_then_get_returns_value() {
        let (store, _dir) = open_temp(Duration::from_secs(60)).await;
        store.set("embedding_abc", json!([0.1, 0.2])).await.unwrap();
        assert_eq!(store.get("embedding_abc").await, Some(json!([0.1, 0.2])));
    }

    #[tokio::test]
    async fn expired_entry_reads_as_absent() {
        let (store, _dir) = open_temp(Duration::from_secs(60)).await;
        store
            .set_with_ttl("soon-gone", json!(1), Duration::from_secs(0))
            .await
            .unwrap();
        // zero TTL expires as soon as one second of age accumulates; force
        // the comparison by backdating the entry
        {
            let mut entries = store.entries.lock().await;
            for entry in entries.values_mut() {
                entry.timestamp = Utc::now() - chrono::Duration::seconds(5);
            }
        }
        assert_eq!(store.get("soon-gone").await, None);
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        {
            let store = CacheStore::open(path.clone(), Duration::from_secs(60))
                .await
                .unwrap();
            store.set("persisted", json!("yes")).await.unwrap();
        }
        let store = CacheStore::open(path, Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("persisted").await, Some(json!("yes")));
    }

    #[tokio::test]
    async fn reopen_sweeps_expired_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        {
            let store = CacheStore::open(path.clone(), Duration::from_secs(60))
                .await
                .unwrap();
            store
                .set_with_ttl("old", json!(1), Duration::from_secs(0))
                .await
                .unwrap();
            let mut entries = store.entries.lock().await;
            for entry in entries.values_mut() {
                entry.timestamp = Utc::now() - chrono::Duration::seconds(5);
            }
            let snapshot = entries.clone();
            store.persist(&snapshot).await.unwrap();
        }
        let store = CacheStore::open(path, Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.entries.lock().await.len(), 0);
    }

    #[tokio::test]
    async fn clear_removes_file_and_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let store = CacheStore::open(path.clone(), Duration::from_secs(60))
            .await
            .unwrap();
        store.set("k", json!(1)).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.get("k").await, None);
        assert!(!path.exists());
    }
}
