//! TTL'd in-memory schema cache, backed by the persistent store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use lodestone_cache::CacheStore;
use lodestone_core::SchemaDigest;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Semantic key of the digest in the persistent store.
pub const SCHEMA_CACHE_KEY: &str = "graph_schema_digest";

struct CacheState {
    digest: Option<SchemaDigest>,
    last_update: Option<Instant>,
}

/// Owner of the current [`SchemaDigest`]. Replacement goes exclusively
/// through [`SchemaCache::set`].
///
/// On construction the cache hydrates from the persistent store and marks
/// the result fresh immediately - a deliberate tradeoff that avoids a
/// cold-start introspection at the cost of possibly serving a schema older
/// than the TTL suggests right after a restart. Documented limitation, not
/// a bug.
pub struct SchemaCache {
    ttl: Duration,
    store: Arc<CacheStore>,
    state: Mutex<CacheState>,
}

impl SchemaCache {
    /// Create the cache and hydrate it from the persistent store.
    pub async fn hydrate(store: Arc<CacheStore>, ttl: Duration) -> Self {
        let digest = match store.get(SCHEMA_CACHE_KEY).await {
            Some(value) => match serde_json::from_value::<SchemaDigest>(value) {
                Ok(digest) => {
                    info!("schema digest hydrated from persistent cache");
                    Some(digest)
                }
                Err(e) => {
                    warn!(error = %e, "persisted schema digest unreadable, starting empty");
                    None
                }
            },
            None => None,
        };
        let last_update = digest.as_ref().map(|_| Instant::now());
        Self {
            ttl,
            store,
            state: Mutex::new(CacheState {
                digest,
                last_update,
            }),
        }
    }

    /// The digest, or `None` when the cache is empty or expired.
    pub async fn get(&self) -> Option<SchemaDigest> {
        let state = self.state.lock().await;
        if Self::expired(&state, self.ttl) {
            return None;
        }
        state.digest.clone()
    }

    /// The digest regardless of TTL - the stale fallback path.
    pub async fn get_stale(&self) -> Option<SchemaDigest> {
        self.state.lock().await.digest.clone()
    }

    /// Replace the digest, reset its age and persist it.
    pub async fn set(&self, digest: SchemaDigest) {
        {
            let mut state = self.state.lock().await;
            state.digest = Some(digest.clone());
            state.last_update = Some(Instant::now());
        }
        match serde_json::to_value(&digest) {
            Ok(value) => {
                if let Err(e) = self.store.set(SCHEMA_CACHE_KEY, value).await {
                    warn!(error = %e, "failed to persist schema digest");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize schema digest"),
        }
        debug!(ttl_secs = self.ttl.as_secs(), "schema cache updated");
    }

    /// True when the cache is empty or its age exceeds the TTL.
    pub async fn is_expired(&self) -> bool {
        Self::expired(&*self.state.lock().await, self.ttl)
    }

    /// Age of the current digest; `None` means empty (unbounded age).
    pub async fn age(&self) -> Option<Duration> {
        self.state.lock().await.last_update.map(|at| at.elapsed())
    }

    /// Drop the digest from memory and the persistent store.
    pub async fn clear(&self) {
        {
            let mut state = self.state.lock().await;
            state.digest = None;
            state.last_update = None;
        }
        if let Err(e) = self.store.remove(SCHEMA_CACHE_KEY).await {
            warn!(error = %e, "failed to remove persisted schema digest");
        }
        info!("schema cache cleared");
    }

    fn expired(state: &CacheState, ttl: Duration) -> bool {
        match state.last_update {
            Some(at) => at.elapsed() > ttl,
            None => true,
        }
    }

    /// Age the cached digest artificially. Test hook for TTL behavior.
    #[cfg(test)]
    pub(crate) async fn backdate(&self, by: Duration) {
        let mut state = self.state.lock().await;
        if let Some(at) = state.last_update {
            state.last_update = Some(at.checked_sub(by).unwrap_or(at));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_cache(ttl: Duration) -> (SchemaCache, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            CacheStore::open(dir.path().join("cache.json"), Duration::from_secs(3600))
                .await
                .unwrap(),
        );
        (SchemaCache::hydrate(store, ttl).await, dir)
    }

    #[tokio::test]
    async fn empty_cache_is_expired_with_unbounded_age() {
        let (cache, _dir) = temp_cache(Duration::from_secs(300)).await;
        assert!(cache.is_expired().await);
        assert!(cache.age().await.is_none());
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn get_after_set_returns_digest_unchanged() {
        let (cache, _dir) = temp_cache(Duration::from_secs(300)).await;
        let digest = SchemaDigest::empty();
        cache.set(digest.clone()).await;
        assert!(!cache.is_expired().await);
        assert_eq!(cache.get().await, Some(digest));
    }

    #[tokio::test]
    async fn expires_after_ttl_elapses() {
        let (cache, _dir) = temp_cache(Duration::from_secs(300)).await;
        cache.set(SchemaDigest::empty()).await;
        assert!(!cache.is_expired().await);

        cache.backdate(Duration::from_secs(301)).await;
        assert!(cache.is_expired().await);
        assert!(cache.get().await.is_none());
        // the stale path still serves it
        assert!(cache.get_stale().await.is_some());
    }

    #[tokio::test]
    async fn hydrates_fresh_from_persistent_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            CacheStore::open(dir.path().join("cache.json"), Duration::from_secs(3600))
                .await
                .unwrap(),
        );
        {
            let cache = SchemaCache::hydrate(store.clone(), Duration::from_secs(300)).await;
            cache.set(SchemaDigest::empty()).await;
        }
        // a new cache over the same store sees the digest and treats it as
        // fresh - the documented restart tradeoff
        let cache = SchemaCache::hydrate(store, Duration::from_secs(300)).await;
        assert!(!cache.is_expired().await);
        assert!(cache.get().await.is_some());
    }

    #[tokio::test]
    async fn clear_empties_memory_and_store() {
        let (cache, _dir) = temp_cache(Duration::from_secs(300)).await;
        cache.set(SchemaDigest::empty()).await;
        cache.clear().await;
        assert!(cache.get().await.is_none());
        assert!(cache.get_stale().await.is_none());
        assert!(cache.is_expired().await);
    }
}
