//! Distributed Cache Capability
//!
//! The generic cache contract the Cassandra adapter implements.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::cache::EntryOptions;
use crate::error::Result;

/// A shared byte cache with per-entry expiration.
///
/// Every operation checks `token` on entry and fails with
/// [`CacheError::Cancelled`](crate::error::CacheError::Cancelled) if it is
/// already cancelled. Once a store request is in flight the token is ignored.
#[async_trait]
pub trait DistributedCache: Send + Sync + 'static {
    /// Returns the value stored under `key`, or `None` when there is none.
    async fn get(&self, key: &str, token: &CancellationToken) -> Result<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value and lifetime.
    async fn set(
        &self,
        key: &str,
        value: &[u8],
        options: &EntryOptions,
        token: &CancellationToken,
    ) -> Result<()>;

    /// Removes `key`. Removing a missing key succeeds.
    async fn remove(&self, key: &str, token: &CancellationToken) -> Result<()>;

    /// Resets a sliding expiration window for `key`, where supported.
    async fn refresh(&self, key: &str, token: &CancellationToken) -> Result<()>;
}

#[async_trait]
impl<C> DistributedCache for Arc<C>
where
    C: DistributedCache + ?Sized,
{
    async fn get(&self, key: &str, token: &CancellationToken) -> Result<Option<Vec<u8>>> {
        (**self).get(key, token).await
    }

    async fn set(
        &self,
        key: &str,
        value: &[u8],
        options: &EntryOptions,
        token: &CancellationToken,
    ) -> Result<()> {
        (**self).set(key, value, options, token).await
    }

    async fn remove(&self, key: &str, token: &CancellationToken) -> Result<()> {
        (**self).remove(key, token).await
    }

    async fn refresh(&self, key: &str, token: &CancellationToken) -> Result<()> {
        (**self).refresh(key, token).await
    }
}
