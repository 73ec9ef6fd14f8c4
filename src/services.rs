//! Services Module
//!
//! Registration of the distributed cache capability for hosts that wire their
//! components through a service container.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::cache::{CassandraCache, CassandraCacheOptions, DistributedCache};
use crate::error::{CacheError, Result};
use crate::session::CqlSession;

/// A cache shared across the host.
pub type SharedCache = Arc<dyn DistributedCache>;

type CacheFactory = Box<dyn Fn() -> BoxFuture<'static, Result<SharedCache>> + Send + Sync>;

/// How often a registration constructs its cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceLifetime {
    /// Constructed on first resolution, then reused
    Singleton,
    /// Constructed on every resolution
    Transient,
}

// == Cache Descriptor ==
/// A single cache registration.
pub struct CacheDescriptor {
    lifetime: ServiceLifetime,
    implementation: &'static str,
    factory: CacheFactory,
    instance: OnceCell<SharedCache>,
}

impl CacheDescriptor {
    pub fn lifetime(&self) -> ServiceLifetime {
        self.lifetime
    }

    /// Type name of the registered implementation.
    pub fn implementation(&self) -> &'static str {
        self.implementation
    }

    async fn resolve(&self) -> Result<SharedCache> {
        match self.lifetime {
            ServiceLifetime::Singleton => self
                .instance
                .get_or_try_init(|| (self.factory)())
                .await
                .cloned(),
            ServiceLifetime::Transient => (self.factory)().await,
        }
    }
}

impl fmt::Debug for CacheDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheDescriptor")
            .field("lifetime", &self.lifetime)
            .field("implementation", &self.implementation)
            .field("constructed", &self.instance.initialized())
            .finish()
    }
}

// == Cache Services ==
/// Ordered cache registrations; the most recent one is what resolves.
#[derive(Debug, Default)]
pub struct CacheServices {
    descriptors: Vec<CacheDescriptor>,
}

impl CacheServices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a cache built by `factory`.
    pub fn add<C, F, Fut>(&mut self, lifetime: ServiceLifetime, factory: F) -> &mut Self
    where
        C: DistributedCache,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<C>> + Send + 'static,
    {
        let factory: CacheFactory = Box::new(move || {
            let construct = factory();
            async move {
                let cache = construct.await?;
                Ok(Arc::new(cache) as SharedCache)
            }
            .boxed()
        });

        self.descriptors.push(CacheDescriptor {
            lifetime,
            implementation: std::any::type_name::<C>(),
            factory,
            instance: OnceCell::new(),
        });
        self
    }

    /// Registers a singleton [`CassandraCache`] whose options are filled in by
    /// `configure` when the cache is first resolved.
    ///
    /// # Errors
    /// `InvalidArgument` if `configure` is `None`; nothing is registered.
    pub fn add_distributed_cassandra_cache<S, F>(&mut self, configure: Option<F>) -> Result<&mut Self>
    where
        S: CqlSession,
        F: Fn(&mut CassandraCacheOptions<S>) + Send + Sync + 'static,
    {
        let configure = Arc::new(configure.ok_or(CacheError::InvalidArgument("configure"))?);

        debug!("Registering cassandra distributed cache");
        Ok(self.add(ServiceLifetime::Singleton, move || {
            let configure = Arc::clone(&configure);
            async move {
                let mut options = CassandraCacheOptions::default();
                (*configure)(&mut options);
                CassandraCache::new(options).await
            }
        }))
    }

    /// Registrations in the order they were added.
    pub fn descriptors(&self) -> &[CacheDescriptor] {
        &self.descriptors
    }

    /// Resolves the most recently registered cache.
    pub async fn resolve(&self) -> Result<SharedCache> {
        self.descriptors
            .last()
            .ok_or(CacheError::NotRegistered)?
            .resolve()
            .await
    }
}
