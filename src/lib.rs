//! Cassandra Cache - A distributed cache backed by a Cassandra table
//!
//! Stores opaque byte values under string keys with per-entry expiration,
//! delegated to the store's native row TTL.

pub mod cache;
pub mod config;
pub mod error;
pub mod schema;
pub mod services;
pub mod session;

pub use cache::{BlockingCache, CassandraCache, CassandraCacheOptions, DistributedCache, EntryOptions};
pub use config::SessionConfig;
pub use error::{CacheError, Result};
pub use services::{CacheServices, ServiceLifetime};
pub use session::{Consistency, CqlSession, MemorySession};
