//! Schema Module
//!
//! Table layout and CQL text for the cache table.
//!
//! ```text
//! cassandra_cache
//!   id              text       primary key
//!   value           blob       opaque payload
//!   expiration_time timestamp  informational; expiry is the row TTL
//! ```

/// Cache table name
pub const TABLE: &str = "cassandra_cache";

/// Primary key column
pub const ID_COLUMN: &str = "id";

/// Payload column
pub const VALUE_COLUMN: &str = "value";

/// Absolute expiration, stored for inspection only
pub const EXPIRATION_COLUMN: &str = "expiration_time";

// == Statements ==
pub const SELECT: &str = "SELECT value FROM cassandra_cache WHERE id = ?";

pub const INSERT: &str =
    "INSERT INTO cassandra_cache (id, expiration_time, value) VALUES (?, ?, ?) USING TTL ?";

/// Prepared alongside the others but not issued by any cache operation.
pub const UPDATE: &str = "UPDATE cassandra_cache SET expiration_time = ?, value = ? WHERE id = ?";

pub const DELETE: &str = "DELETE FROM cassandra_cache WHERE id = ?";

// == DDL ==
pub const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS cassandra_cache \
     (id text PRIMARY KEY, value blob, expiration_time timestamp)";

/// Keyspace DDL for a single-datacenter development node.
pub fn create_keyspace_cql(keyspace: &str) -> String {
    format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = \
         {{'class': 'SimpleStrategy', 'replication_factor': 1}}",
        keyspace
    )
}
