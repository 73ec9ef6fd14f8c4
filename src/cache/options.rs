//! Options Module
//!
//! Per-entry expiration options and construction-time cache options.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::Dispatch;

use crate::config::SessionConfig;
use crate::session::Consistency;

// == Entry Options ==
/// Expiration settings for a single `set`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryOptions {
    /// Point in time the entry expires at
    pub absolute_expiration: Option<DateTime<Utc>>,
    /// Lifetime relative to the moment of writing; wins over `absolute_expiration`
    pub absolute_expiration_relative_to_now: Option<Duration>,
    /// Accepted but not honoured; the store has no sliding expiry
    pub sliding_expiration: Option<Duration>,
}

impl EntryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_absolute_expiration(mut self, at: DateTime<Utc>) -> Self {
        self.absolute_expiration = Some(at);
        self
    }

    pub fn with_relative_expiration(mut self, lifetime: Duration) -> Self {
        self.absolute_expiration_relative_to_now = Some(lifetime);
        self
    }

    pub fn with_sliding_expiration(mut self, window: Duration) -> Self {
        self.sliding_expiration = Some(window);
        self
    }
}

// == Cache Options ==
/// Construction-time options for [`CassandraCache`](crate::cache::CassandraCache).
pub struct CassandraCacheOptions<S> {
    /// Connected store session; required
    pub session: Option<Arc<S>>,
    /// Diagnostic sink; the global subscriber is used when unset
    pub logger: Option<Dispatch>,
    /// Consistency for reads
    pub read_consistency: Consistency,
    /// Consistency for inserts and deletes
    pub write_consistency: Consistency,
}

impl<S> CassandraCacheOptions<S> {
    /// Creates options for a session with default consistency levels.
    pub fn new(session: Arc<S>) -> Self {
        Self {
            session: Some(session),
            ..Self::default()
        }
    }

    /// Creates options taking consistency levels from configuration.
    pub fn from_config(session: Arc<S>, config: &SessionConfig) -> Self {
        Self::new(session)
            .with_read_consistency(config.read_consistency)
            .with_write_consistency(config.write_consistency)
    }

    pub fn with_logger(mut self, logger: Dispatch) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_read_consistency(mut self, consistency: Consistency) -> Self {
        self.read_consistency = consistency;
        self
    }

    pub fn with_write_consistency(mut self, consistency: Consistency) -> Self {
        self.write_consistency = consistency;
        self
    }
}

impl<S> Default for CassandraCacheOptions<S> {
    fn default() -> Self {
        Self {
            session: None,
            logger: None,
            read_consistency: Consistency::default(),
            write_consistency: Consistency::default(),
        }
    }
}

impl<S> Clone for CassandraCacheOptions<S> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            logger: self.logger.clone(),
            read_consistency: self.read_consistency,
            write_consistency: self.write_consistency,
        }
    }
}

impl<S> fmt::Debug for CassandraCacheOptions<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CassandraCacheOptions")
            .field("session", &self.session.is_some())
            .field("logger", &self.logger.is_some())
            .field("read_consistency", &self.read_consistency)
            .field("write_consistency", &self.write_consistency)
            .finish()
    }
}
