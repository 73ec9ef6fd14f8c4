//! Scylla Driver Session
//!
//! [`CqlSession`] over the `scylla` driver, which speaks the native protocol
//! to Cassandra and ScyllaDB clusters.

use async_trait::async_trait;
use chrono::DateTime;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::statement::prepared::PreparedStatement;
use scylla::statement::Consistency as DriverConsistency;
use scylla::value::{CqlTimestamp, CqlValue as DriverValue, Row};
use thiserror::Error;
use tracing::info;

use crate::config::SessionConfig;
use crate::schema;
use crate::session::{BoundStatement, Consistency, CqlSession, CqlValue, ResultRows};

/// Errors raised through the scylla driver.
#[derive(Error, Debug)]
pub enum ScyllaSessionError {
    /// Any error reported by the driver
    #[error(transparent)]
    Driver(Box<dyn std::error::Error + Send + Sync + 'static>),

    /// A column came back with a type the cache does not read
    #[error("Unsupported column type in column {0}")]
    UnsupportedColumn(String),
}

impl ScyllaSessionError {
    fn driver<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ScyllaSessionError::Driver(Box::new(err))
    }
}

/// A connected scylla driver session.
pub struct ScyllaSession {
    session: Session,
}

impl std::fmt::Debug for ScyllaSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScyllaSession").finish_non_exhaustive()
    }
}

impl ScyllaSession {
    /// Wraps an already connected driver session.
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Connects to the configured node, creates the keyspace and cache table
    /// if missing, and switches to the keyspace.
    pub async fn connect(config: &SessionConfig) -> Result<Self, ScyllaSessionError> {
        let session = SessionBuilder::new()
            .known_node(config.node_address())
            .user(config.username.as_str(), config.password.as_str())
            .build()
            .await
            .map_err(ScyllaSessionError::driver)?;
        info!("Connected to {}", config.node_address());

        session
            .query_unpaged(schema::create_keyspace_cql(&config.keyspace), ())
            .await
            .map_err(ScyllaSessionError::driver)?;
        session
            .use_keyspace(config.keyspace.as_str(), false)
            .await
            .map_err(ScyllaSessionError::driver)?;
        session
            .query_unpaged(schema::CREATE_TABLE, ())
            .await
            .map_err(ScyllaSessionError::driver)?;

        Ok(Self::new(session))
    }

    pub fn inner(&self) -> &Session {
        &self.session
    }
}

fn driver_consistency(consistency: Consistency) -> DriverConsistency {
    match consistency {
        Consistency::Any => DriverConsistency::Any,
        Consistency::One => DriverConsistency::One,
        Consistency::Two => DriverConsistency::Two,
        Consistency::Three => DriverConsistency::Three,
        Consistency::Quorum => DriverConsistency::Quorum,
        Consistency::All => DriverConsistency::All,
        Consistency::LocalQuorum => DriverConsistency::LocalQuorum,
        Consistency::EachQuorum => DriverConsistency::EachQuorum,
        Consistency::Serial => DriverConsistency::Serial,
        Consistency::LocalSerial => DriverConsistency::LocalSerial,
        Consistency::LocalOne => DriverConsistency::LocalOne,
    }
}

fn driver_value(value: CqlValue) -> Option<DriverValue> {
    match value {
        CqlValue::Text(text) => Some(DriverValue::Text(text)),
        CqlValue::Blob(bytes) => Some(DriverValue::Blob(bytes)),
        CqlValue::Timestamp(at) => Some(DriverValue::Timestamp(CqlTimestamp(at.timestamp_millis()))),
        CqlValue::Int(n) => Some(DriverValue::Int(n)),
        CqlValue::Null => None,
    }
}

fn cache_value(column: &str, value: Option<DriverValue>) -> Result<CqlValue, ScyllaSessionError> {
    let unsupported = || ScyllaSessionError::UnsupportedColumn(column.to_string());
    match value {
        None => Ok(CqlValue::Null),
        Some(DriverValue::Text(text)) | Some(DriverValue::Ascii(text)) => Ok(CqlValue::Text(text)),
        Some(DriverValue::Blob(bytes)) => Ok(CqlValue::Blob(bytes)),
        Some(DriverValue::Int(n)) => Ok(CqlValue::Int(n)),
        Some(DriverValue::Timestamp(CqlTimestamp(millis))) => DateTime::from_timestamp_millis(millis)
            .map(CqlValue::Timestamp)
            .ok_or_else(unsupported),
        Some(_) => Err(unsupported()),
    }
}

#[async_trait]
impl CqlSession for ScyllaSession {
    type Statement = PreparedStatement;
    type Error = ScyllaSessionError;

    async fn prepare(&self, cql: &str) -> Result<PreparedStatement, ScyllaSessionError> {
        self.session
            .prepare(cql)
            .await
            .map_err(ScyllaSessionError::driver)
    }

    async fn execute(
        &self,
        bound: BoundStatement<'_, PreparedStatement>,
    ) -> Result<ResultRows, ScyllaSessionError> {
        let mut statement = bound.statement.clone();
        statement.set_consistency(driver_consistency(bound.consistency));
        let values: Vec<Option<DriverValue>> = bound.values.into_iter().map(driver_value).collect();

        let result = self
            .session
            .execute_unpaged(&statement, values)
            .await
            .map_err(ScyllaSessionError::driver)?;
        if !result.is_rows() {
            return Ok(ResultRows::empty());
        }

        let rows_result = result
            .into_rows_result()
            .map_err(ScyllaSessionError::driver)?;
        let columns: Vec<String> = rows_result
            .column_specs()
            .iter()
            .map(|spec| spec.name().to_string())
            .collect();

        let mut rows = Vec::new();
        for row in rows_result.rows::<Row>().map_err(ScyllaSessionError::driver)? {
            let row = row.map_err(ScyllaSessionError::driver)?;
            let values = columns
                .iter()
                .zip(row.columns)
                .map(|(column, value)| cache_value(column, value))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(values);
        }

        Ok(ResultRows::new(columns, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_consistency_mapping() {
        assert_eq!(driver_consistency(Consistency::LocalOne), DriverConsistency::LocalOne);
        assert_eq!(driver_consistency(Consistency::EachQuorum), DriverConsistency::EachQuorum);
    }

    #[test]
    fn test_value_conversion() {
        let at = DateTime::from_timestamp_millis(Utc::now().timestamp_millis()).unwrap();
        let driver = driver_value(CqlValue::Timestamp(at));
        assert_eq!(cache_value("expiration_time", driver).unwrap(), CqlValue::Timestamp(at));
        assert_eq!(driver_value(CqlValue::Null), None);
        assert!(matches!(
            cache_value("value", Some(DriverValue::Boolean(true))),
            Err(ScyllaSessionError::UnsupportedColumn(_))
        ));
    }
}
