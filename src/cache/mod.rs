//! Cache Module
//!
//! The distributed cache capability and its Cassandra-backed implementation,
//! with TTL-based expiration delegated to the store.

mod blocking;
mod cassandra;
mod distributed;
mod options;
mod statements;
pub mod ttl;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use blocking::BlockingCache;
pub use cassandra::CassandraCache;
pub use distributed::DistributedCache;
pub use options::{CassandraCacheOptions, EntryOptions};
pub use statements::{PreparedStatements, StatementKind};
pub use ttl::DEFAULT_TTL_SECONDS;
