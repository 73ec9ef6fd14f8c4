//! Cassandra Cache Module
//!
//! [`DistributedCache`] over the `cassandra_cache` table. Values are opaque
//! blobs; lifetime is enforced by the store through the row TTL.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, Dispatch};

use crate::cache::{ttl, CassandraCacheOptions, DistributedCache, EntryOptions, PreparedStatements, StatementKind};
use crate::error::{CacheError, Result};
use crate::schema::VALUE_COLUMN;
use crate::session::{BoundStatement, Consistency, CqlSession, CqlValue, ResultRows};

// == Cassandra Cache ==
/// Distributed cache backed by a Cassandra table.
pub struct CassandraCache<S: CqlSession> {
    session: Arc<S>,
    statements: PreparedStatements<S::Statement>,
    logger: Option<Dispatch>,
    read_consistency: Consistency,
    write_consistency: Consistency,
}

impl<S: CqlSession> CassandraCache<S> {
    // == Constructor ==
    /// Prepares the cache statements against the configured session.
    ///
    /// # Errors
    /// - `InvalidArgument` if no session is configured
    /// - `Preparation` if any statement fails to prepare, e.g. the table is missing
    pub async fn new(options: CassandraCacheOptions<S>) -> Result<Self> {
        let CassandraCacheOptions {
            session,
            logger,
            read_consistency,
            write_consistency,
        } = options;
        let session = session.ok_or(CacheError::InvalidArgument("session"))?;

        let statements = match PreparedStatements::prepare(session.as_ref()).await {
            Ok(statements) => statements,
            Err(err) => {
                let cause = std::error::Error::source(&err)
                    .map(ToString::to_string)
                    .unwrap_or_default();
                with_logger(logger.as_ref(), || {
                    error!(error = %err, %cause, "Failed to prepare cassandra cache statements")
                });
                return Err(err);
            }
        };

        with_logger(logger.as_ref(), || {
            info!(
                statements = StatementKind::ALL.len(),
                %read_consistency,
                %write_consistency,
                "Cassandra cache initialized"
            )
        });

        Ok(Self {
            session,
            statements,
            logger,
            read_consistency,
            write_consistency,
        })
    }

    pub fn session(&self) -> &Arc<S> {
        &self.session
    }

    pub fn read_consistency(&self) -> Consistency {
        self.read_consistency
    }

    pub fn write_consistency(&self) -> Consistency {
        self.write_consistency
    }

    /// Runs `f` with the configured diagnostic sink as the default subscriber.
    fn diagnostics<R>(&self, f: impl FnOnce() -> R) -> R {
        with_logger(self.logger.as_ref(), f)
    }

    async fn execute(
        &self,
        kind: StatementKind,
        values: Vec<CqlValue>,
        consistency: Consistency,
    ) -> Result<ResultRows> {
        let bound = BoundStatement::new(self.statements.get(kind), values).with_consistency(consistency);
        self.session.execute(bound).await.map_err(CacheError::store)
    }
}

impl<S: CqlSession> fmt::Debug for CassandraCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CassandraCache")
            .field("read_consistency", &self.read_consistency)
            .field("write_consistency", &self.write_consistency)
            .finish_non_exhaustive()
    }
}

fn with_logger<R>(logger: Option<&Dispatch>, f: impl FnOnce() -> R) -> R {
    match logger {
        Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
        None => f(),
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidArgument("key"));
    }
    Ok(())
}

fn ensure_not_cancelled(token: &CancellationToken) -> Result<()> {
    if token.is_cancelled() {
        return Err(CacheError::Cancelled);
    }
    Ok(())
}

/// Extracts the payload from the first row; no rows or a null cell is a miss.
fn read_value(rows: &ResultRows) -> Result<Option<Vec<u8>>> {
    match rows.first_value(VALUE_COLUMN) {
        None | Some(Some(CqlValue::Null)) => Ok(None),
        Some(Some(CqlValue::Blob(bytes))) => Ok(Some(bytes.clone())),
        Some(_) => Err(CacheError::UnexpectedColumn {
            column: VALUE_COLUMN,
        }),
    }
}

#[async_trait]
impl<S: CqlSession> DistributedCache for CassandraCache<S> {
    async fn get(&self, key: &str, token: &CancellationToken) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        ensure_not_cancelled(token)?;

        let rows = self
            .execute(
                StatementKind::Select,
                vec![CqlValue::Text(key.to_string())],
                self.read_consistency,
            )
            .await?;
        let value = read_value(&rows)?;

        self.diagnostics(|| debug!(key, hit = value.is_some(), "Cache get"));
        Ok(value)
    }

    async fn set(
        &self,
        key: &str,
        value: &[u8],
        options: &EntryOptions,
        token: &CancellationToken,
    ) -> Result<()> {
        validate_key(key)?;
        ensure_not_cancelled(token)?;

        let creation_time = Utc::now();
        let expiration = ttl::resolve_expiration(creation_time, options)?;
        let ttl = ttl::ttl_seconds(creation_time, expiration)?;

        if options.sliding_expiration.is_some() {
            self.diagnostics(|| debug!(key, "Sliding expiration is not supported, ignoring"));
        }

        self.execute(
            StatementKind::Insert,
            vec![
                CqlValue::Text(key.to_string()),
                CqlValue::from(expiration),
                CqlValue::Blob(value.to_vec()),
                CqlValue::Int(ttl),
            ],
            self.write_consistency,
        )
        .await?;

        self.diagnostics(|| debug!(key, ttl, bytes = value.len(), "Cache set"));
        Ok(())
    }

    async fn remove(&self, key: &str, token: &CancellationToken) -> Result<()> {
        validate_key(key)?;
        ensure_not_cancelled(token)?;

        self.execute(
            StatementKind::Delete,
            vec![CqlValue::Text(key.to_string())],
            self.write_consistency,
        )
        .await?;

        self.diagnostics(|| debug!(key, "Cache remove"));
        Ok(())
    }

    /// Sliding expiration is not supported: nothing is sent to the store.
    async fn refresh(&self, key: &str, token: &CancellationToken) -> Result<()> {
        ensure_not_cancelled(token)?;
        self.diagnostics(|| trace!(key, "Cache refresh is a no-op"));
        Ok(())
    }
}
