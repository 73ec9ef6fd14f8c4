//! Configuration Module
//!
//! Handles loading cluster connection settings from environment variables.

use std::env;

use crate::session::Consistency;

/// Cluster connection and consistency settings.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Host of the node to bootstrap from
    pub contact_point: String,
    /// Native protocol port
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Keyspace holding the cache table
    pub keyspace: String,
    /// Consistency for cache reads
    pub read_consistency: Consistency,
    /// Consistency for cache writes and deletes
    pub write_consistency: Consistency,
}

impl SessionConfig {
    /// Creates a new SessionConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CASSANDRA_CONTACT_POINT` - Node host (default: localhost)
    /// - `CASSANDRA_PORT` - Native protocol port (default: 9042)
    /// - `CASSANDRA_USERNAME` / `CASSANDRA_PASSWORD` - Credentials (default: cassandra)
    /// - `CASSANDRA_KEYSPACE` - Keyspace (default: cassandracache)
    /// - `CASSANDRA_READ_CONSISTENCY` / `CASSANDRA_WRITE_CONSISTENCY` - e.g. `local_quorum` (default: local_one)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            contact_point: env::var("CASSANDRA_CONTACT_POINT").unwrap_or(defaults.contact_point),
            port: env::var("CASSANDRA_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            username: env::var("CASSANDRA_USERNAME").unwrap_or(defaults.username),
            password: env::var("CASSANDRA_PASSWORD").unwrap_or(defaults.password),
            keyspace: env::var("CASSANDRA_KEYSPACE").unwrap_or(defaults.keyspace),
            read_consistency: env::var("CASSANDRA_READ_CONSISTENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.read_consistency),
            write_consistency: env::var("CASSANDRA_WRITE_CONSISTENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.write_consistency),
        }
    }

    /// `host:port` of the contact point.
    pub fn node_address(&self) -> String {
        format!("{}:{}", self.contact_point, self.port)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            contact_point: "localhost".to_string(),
            port: 9042,
            username: "cassandra".to_string(),
            password: "cassandra".to_string(),
            keyspace: "cassandracache".to_string(),
            read_consistency: Consistency::LocalOne,
            write_consistency: Consistency::LocalOne,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 7] = [
        "CASSANDRA_CONTACT_POINT",
        "CASSANDRA_PORT",
        "CASSANDRA_USERNAME",
        "CASSANDRA_PASSWORD",
        "CASSANDRA_KEYSPACE",
        "CASSANDRA_READ_CONSISTENCY",
        "CASSANDRA_WRITE_CONSISTENCY",
    ];

    #[test]
    fn test_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.contact_point, "localhost");
        assert_eq!(config.port, 9042);
        assert_eq!(config.keyspace, "cassandracache");
        assert_eq!(config.read_consistency, Consistency::LocalOne);
        assert_eq!(config.node_address(), "localhost:9042");
    }

    // Single test so env mutations are not raced by a parallel test
    #[test]
    fn test_config_from_env() {
        for var in VARS {
            env::remove_var(var);
        }
        assert_eq!(SessionConfig::from_env(), SessionConfig::default());

        env::set_var("CASSANDRA_PORT", "19042");
        env::set_var("CASSANDRA_READ_CONSISTENCY", "local_quorum");
        env::set_var("CASSANDRA_WRITE_CONSISTENCY", "not-a-level");

        let config = SessionConfig::from_env();
        assert_eq!(config.port, 19042);
        assert_eq!(config.read_consistency, Consistency::LocalQuorum);
        assert_eq!(config.write_consistency, Consistency::LocalOne);

        for var in VARS {
            env::remove_var(var);
        }
    }
}
