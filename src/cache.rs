use crate::error::CacheError;
use crate::key::CacheKey;
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// A key-value byte-blob store for transformed response bodies.
///
/// Shared read/write by every in-flight response. Entries are never
/// invalidated; they live as long as the backing store does. Two concurrent
/// misses for the same key may both transform and both `put` — duplicate
/// work, not corruption, because `put` is idempotent and atomic at
/// single-entry granularity.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Looks up a cached body. `Ok(None)` is a clean miss.
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError>;

    /// Stores a transformed body under the key.
    async fn put(&self, key: &CacheKey, body: Bytes) -> Result<(), CacheError>;
}

/// Selects the cache backend at construction time.
#[derive(Debug, Clone, Default)]
pub enum CacheConfig {
    /// In-process volatile cache, lost on restart.
    #[default]
    Memory,
    /// One file per key under the given directory.
    Dir(PathBuf),
}

/// Builds the configured store. A `Dir` whose directory is not writable
/// degrades to [`MemoryCache`] with one warning; construction never fails.
pub(crate) fn build_store(config: &CacheConfig) -> std::sync::Arc<dyn CacheStore> {
    match config {
        CacheConfig::Memory => std::sync::Arc::new(MemoryCache::new()),
        CacheConfig::Dir(dir) => match FileCache::open(dir) {
            Ok(cache) => std::sync::Arc::new(cache),
            Err(err) => {
                warn!(
                    dir = %dir.display(),
                    error = %err,
                    "cache directory is not writable, falling back to in-memory cache"
                );
                std::sync::Arc::new(MemoryCache::new())
            }
        },
    }
}

/// The volatile in-process cache. Unbounded; no eviction.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<CacheKey, Bytes>,
}

impl MemoryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: &CacheKey, body: Bytes) -> Result<(), CacheError> {
        self.entries.insert(key.clone(), body);
        Ok(())
    }
}

/// The durable file-backed cache: one file per key, named by the key's hex
/// digest, body bytes as the entire file content.
///
/// `put` writes to a uniquely named `.tmp` sibling and renames it over the
/// final path, so a reader never observes a partially written entry.
/// Concurrent writers for the same key each rename their own private file;
/// last rename wins with a complete body either way. A crash leaves at worst
/// a stale `.tmp` file, never a corrupt entry.
#[derive(Debug)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Opens the cache at the given directory, probing that it is writable.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, CacheError> {
        let dir = dir.as_ref().to_path_buf();
        let probe = dir.join(".write-probe.tmp");
        std::fs::write(&probe, b"probe")?;
        std::fs::remove_file(&probe)?;
        Ok(Self { dir })
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.as_hex())
    }
}

#[async_trait]
impl CacheStore for FileCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        match tokio::fs::read(self.entry_path(key)).await {
            Ok(body) => Ok(Some(Bytes::from(body))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn put(&self, key: &CacheKey, body: Bytes) -> Result<(), CacheError> {
        // Two concurrent puts for the same key must never share a temp
        // inode, or one could rename a file the other is still writing.
        static TMP_SEQ: AtomicU64 = AtomicU64::new(0);
        let final_path = self.entry_path(key);
        let tmp_path = self.dir.join(format!(
            "{}.{}.{}.tmp",
            key.as_hex(),
            std::process::id(),
            TMP_SEQ.fetch_add(1, Ordering::Relaxed),
        ));
        tokio::fs::write(&tmp_path, &body).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;
        debug!(key = %key, bytes = body.len(), "cached transformed body");
        Ok(())
    }
}
