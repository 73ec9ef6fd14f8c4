//! Blocking Cache Module
//!
//! Synchronous variants of the cache operations, for callers without an
//! async runtime of their own.

use tokio::runtime::{Builder, Runtime};
use tokio_util::sync::CancellationToken;

use crate::cache::{CassandraCache, CassandraCacheOptions, DistributedCache, EntryOptions};
use crate::error::{CacheError, Result};
use crate::session::CqlSession;

// == Blocking Cache ==
/// Wraps a [`DistributedCache`] and blocks the calling thread on each operation.
///
/// Owns a current-thread runtime. Like other blocking clients it must not be
/// used, or dropped, from within an async context.
#[derive(Debug)]
pub struct BlockingCache<C> {
    inner: C,
    runtime: Runtime,
}

fn runtime() -> Result<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CacheError::Runtime)
}

impl<S: CqlSession> BlockingCache<CassandraCache<S>> {
    /// Constructs a [`CassandraCache`], blocking until its statements are prepared.
    pub fn connect(options: CassandraCacheOptions<S>) -> Result<Self> {
        let runtime = runtime()?;
        let inner = runtime.block_on(CassandraCache::new(options))?;
        Ok(Self { inner, runtime })
    }
}

impl<C: DistributedCache> BlockingCache<C> {
    /// Wraps an already constructed cache.
    pub fn new(inner: C) -> Result<Self> {
        Ok(Self {
            inner,
            runtime: runtime()?,
        })
    }

    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let token = CancellationToken::new();
        self.runtime.block_on(self.inner.get(key, &token))
    }

    pub fn set(&self, key: &str, value: &[u8], options: &EntryOptions) -> Result<()> {
        let token = CancellationToken::new();
        self.runtime
            .block_on(self.inner.set(key, value, options, &token))
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let token = CancellationToken::new();
        self.runtime.block_on(self.inner.remove(key, &token))
    }

    pub fn refresh(&self, key: &str) -> Result<()> {
        let token = CancellationToken::new();
        self.runtime.block_on(self.inner.refresh(key, &token))
    }

    /// The wrapped async cache.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Runs a future on the cache's runtime; useful for inspecting the session.
    pub fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySession;
    use std::sync::Arc;

    fn create_cache() -> (BlockingCache<CassandraCache<MemorySession>>, Arc<MemorySession>) {
        let session = Arc::new(MemorySession::new());
        let cache = BlockingCache::connect(CassandraCacheOptions::new(session.clone())).unwrap();
        (cache, session)
    }

    #[test]
    fn test_blocking_get_nonexistent() {
        let (cache, _) = create_cache();
        assert_eq!(cache.get("test").unwrap(), None);
    }

    #[test]
    fn test_blocking_set_get_remove() {
        let (cache, session) = create_cache();

        cache.set("key1", b"this is a test", &EntryOptions::default()).unwrap();
        assert_eq!(cache.get("key1").unwrap(), Some(b"this is a test".to_vec()));
        assert_eq!(cache.block_on(session.row_count()), 1);

        cache.remove("key1").unwrap();
        assert_eq!(cache.get("key1").unwrap(), None);
    }

    #[test]
    fn test_blocking_refresh_is_noop() {
        let (cache, session) = create_cache();
        cache.set("key1", b"v", &EntryOptions::default()).unwrap();

        cache.refresh("key1").unwrap();

        assert_eq!(cache.block_on(session.stats()).writes, 1);
        assert_eq!(cache.get("key1").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_blocking_connect_fails_without_table() {
        let result = BlockingCache::connect(CassandraCacheOptions::new(Arc::new(MemorySession::empty())));
        assert!(matches!(result, Err(CacheError::Preparation { .. })));
    }

    #[test]
    fn test_blocking_wraps_shared_cache() {
        let (cache, _) = create_cache();
        cache.set("key1", b"v", &EntryOptions::default()).unwrap();

        let runtime = runtime().unwrap();
        let shared = Arc::new(runtime.block_on(CassandraCache::new(CassandraCacheOptions::new(
            cache.inner().session().clone(),
        ))).unwrap());
        drop(runtime);

        let wrapped = BlockingCache::new(shared).unwrap();
        assert_eq!(wrapped.get("key1").unwrap(), Some(b"v".to_vec()));
    }
}
