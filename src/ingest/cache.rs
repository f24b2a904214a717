//! Per-source result cache: fresh hits skip the network, successful fetches
//! write through, failed fetches fall back to whatever is cached.
//!
//! The store itself is injected (`DynCacheStore`) so tests can use the
//! in-memory variant while the service persists entries as JSON files.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::error::{SourceError, StoreError};
use crate::ingest::types::{SourcePayload, SourceProvider};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub key: String,
    pub payload: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Age at `now`; entries stamped in the future count as age zero.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.updated_at)
            .max(Duration::zero())
    }
}

#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError>;
    async fn upsert(
        &self,
        key: &str,
        payload: serde_json::Value,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

pub type DynCacheStore = Arc<dyn CacheStore>;

/// Decoded cache read: payload plus its age, or `None` on miss.
/// A store error or an undecodable payload is treated as a miss.
pub async fn read(
    store: &dyn CacheStore,
    key: &str,
    now: DateTime<Utc>,
) -> Option<(SourcePayload, Duration)> {
    let entry = match store.get(key).await {
        Ok(Some(e)) => e,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(target: "ingest", source = key, error = %e, "cache read failed");
            return None;
        }
    };
    let age = entry.age(now);
    match serde_json::from_value::<SourcePayload>(entry.payload) {
        Ok(p) => Some((p, age)),
        Err(e) => {
            tracing::warn!(target: "ingest", source = key, error = %e, "cache entry undecodable");
            None
        }
    }
}

/// Encode and upsert. Failures are logged, never returned.
pub async fn write(store: &dyn CacheStore, key: &str, payload: &SourcePayload, now: DateTime<Utc>) {
    let value = match serde_json::to_value(payload) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(target: "ingest", source = key, error = %e, "cache encode failed");
            return;
        }
    };
    if let Err(e) = store.upsert(key, value, now).await {
        tracing::warn!(target: "ingest", source = key, error = %e, "cache write failed");
    }
}

// ------------------------------------------------------------
// Stores
// ------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    inner: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        let g = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        Ok(g.get(key).cloned())
    }

    async fn upsert(
        &self,
        key: &str,
        payload: serde_json::Value,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut g = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        g.insert(
            key.to_string(),
            CacheEntry {
                key: key.to_string(),
                payload,
                updated_at,
            },
        );
        Ok(())
    }
}

/// One JSON file per key under `dir`, replaced atomically via rename.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

#[async_trait::async_trait]
impl CacheStore for FileCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(s) => Ok(Some(serde_json::from_str(&s)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn upsert(
        &self,
        key: &str,
        payload: serde_json::Value,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let entry = CacheEntry {
            key: key.to_string(),
            payload,
            updated_at,
        };
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec(&entry)?).await?;
        tokio::fs::rename(tmp, path).await?;
        Ok(())
    }
}

// ------------------------------------------------------------
// Caching wrapper around a provider
// ------------------------------------------------------------

/// Wraps a provider with read-through / write-through caching keyed by the
/// provider name.
pub struct CachedSource<P: SourceProvider> {
    inner: P,
    store: DynCacheStore,
    fresh_for: Duration,
}

impl<P: SourceProvider> CachedSource<P> {
    pub fn new(inner: P, store: DynCacheStore, fresh_for: Duration) -> Self {
        Self {
            inner,
            store,
            fresh_for,
        }
    }
}

#[async_trait::async_trait]
impl<P: SourceProvider> SourceProvider for CachedSource<P> {
    async fn fetch_latest(&self) -> Result<SourcePayload, SourceError> {
        let key = self.inner.name();
        let cached = read(self.store.as_ref(), key, Utc::now()).await;

        if let Some((payload, age)) = &cached {
            if *age < self.fresh_for {
                counter!("radar_cache_hits_total", "source" => key, "state" => "fresh")
                    .increment(1);
                tracing::debug!(target: "ingest", source = key, age_secs = age.num_seconds(), "fresh cache hit");
                return Ok(payload.clone());
            }
        }

        match self.inner.fetch_latest().await {
            Ok(fresh) if !fresh.is_empty() => {
                write(self.store.as_ref(), key, &fresh, Utc::now()).await;
                Ok(fresh)
            }
            Ok(empty) => match cached {
                // An empty success usually means every sub-query got throttled.
                Some((payload, age)) => {
                    counter!("radar_cache_hits_total", "source" => key, "state" => "stale")
                        .increment(1);
                    tracing::warn!(target: "ingest", source = key, age_secs = age.num_seconds(), "empty fetch, serving stale cache");
                    Ok(payload)
                }
                None => Ok(empty),
            },
            Err(e) => match cached {
                Some((payload, age)) => {
                    counter!("radar_cache_hits_total", "source" => key, "state" => "stale")
                        .increment(1);
                    tracing::warn!(target: "ingest", source = key, age_secs = age.num_seconds(), error = %e, "fetch failed, serving stale cache");
                    Ok(payload)
                }
                None => Err(e),
            },
        }
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
