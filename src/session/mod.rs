//! Session Module
//!
//! The seam between the cache adapter and a Cassandra driver: a session prepares
//! CQL text into statement handles and executes bound statements at a given
//! consistency level.

mod memory;
#[cfg(feature = "scylla")]
mod scylla_session;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use memory::{MemorySession, MemorySessionError, MemoryStatement, SessionStats};
#[cfg(feature = "scylla")]
pub use scylla_session::ScyllaSession;

// == Store Session ==
/// A connected store session capable of preparing and executing CQL.
///
/// Implementations are expected to be internally synchronized: the cache shares
/// one session across every in-flight operation.
#[async_trait]
pub trait CqlSession: Send + Sync + 'static {
    /// Driver-specific prepared statement handle
    type Statement: Send + Sync + 'static;
    /// Error raised by the driver
    type Error: std::error::Error + Send + Sync + 'static;

    /// Prepares a CQL statement for repeated execution.
    async fn prepare(&self, cql: &str) -> Result<Self::Statement, Self::Error>;

    /// Executes a bound statement, returning any rows produced.
    async fn execute(
        &self,
        bound: BoundStatement<'_, Self::Statement>,
    ) -> Result<ResultRows, Self::Error>;
}

// == Consistency ==
/// Replica acknowledgement requirement for a single statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consistency {
    Any,
    One,
    Two,
    Three,
    Quorum,
    All,
    LocalQuorum,
    EachQuorum,
    Serial,
    LocalSerial,
    #[default]
    LocalOne,
}

impl Consistency {
    /// Canonical CQL spelling, as used by `CONSISTENCY` in cqlsh.
    pub fn as_str(&self) -> &'static str {
        match self {
            Consistency::Any => "ANY",
            Consistency::One => "ONE",
            Consistency::Two => "TWO",
            Consistency::Three => "THREE",
            Consistency::Quorum => "QUORUM",
            Consistency::All => "ALL",
            Consistency::LocalQuorum => "LOCAL_QUORUM",
            Consistency::EachQuorum => "EACH_QUORUM",
            Consistency::Serial => "SERIAL",
            Consistency::LocalSerial => "LOCAL_SERIAL",
            Consistency::LocalOne => "LOCAL_ONE",
        }
    }
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a consistency level name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown consistency level: {0}")]
pub struct ParseConsistencyError(String);

impl FromStr for Consistency {
    type Err = ParseConsistencyError;

    /// Accepts `LOCAL_ONE`, `local_one` and `local-one` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        let level = match normalized.as_str() {
            "ANY" => Consistency::Any,
            "ONE" => Consistency::One,
            "TWO" => Consistency::Two,
            "THREE" => Consistency::Three,
            "QUORUM" => Consistency::Quorum,
            "ALL" => Consistency::All,
            "LOCAL_QUORUM" => Consistency::LocalQuorum,
            "EACH_QUORUM" => Consistency::EachQuorum,
            "SERIAL" => Consistency::Serial,
            "LOCAL_SERIAL" => Consistency::LocalSerial,
            "LOCAL_ONE" => Consistency::LocalOne,
            _ => return Err(ParseConsistencyError(s.to_string())),
        };
        Ok(level)
    }
}

// == CQL Values ==
/// A value bound to, or read from, a statement column.
#[derive(Debug, Clone, PartialEq)]
pub enum CqlValue {
    Text(String),
    Blob(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Int(i32),
    Null,
}

impl CqlValue {
    /// Returns the payload if this is a blob.
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            CqlValue::Blob(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns the text if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CqlValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<Option<DateTime<Utc>>> for CqlValue {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map(CqlValue::Timestamp).unwrap_or(CqlValue::Null)
    }
}

// == Bound Statement ==
/// A prepared statement together with its positional values and consistency.
#[derive(Debug)]
pub struct BoundStatement<'a, P> {
    pub statement: &'a P,
    pub values: Vec<CqlValue>,
    pub consistency: Consistency,
}

impl<'a, P> BoundStatement<'a, P> {
    /// Binds positional values to a prepared statement at the default level.
    pub fn new(statement: &'a P, values: Vec<CqlValue>) -> Self {
        Self {
            statement,
            values,
            consistency: Consistency::default(),
        }
    }

    /// Sets the consistency level the statement executes at.
    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = consistency;
        self
    }
}

// == Result Rows ==
/// Rows returned by a statement; empty for writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRows {
    columns: Vec<String>,
    rows: Vec<Vec<CqlValue>>,
}

impl ResultRows {
    /// Creates an empty result, as returned by writes.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a result with the given column names and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CqlValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Looks up `column` in the first row.
    ///
    /// Returns `None` when there are no rows, `Some(None)` when the rows do not
    /// carry that column.
    pub fn first_value(&self, column: &str) -> Option<Option<&CqlValue>> {
        let row = self.rows.first()?;
        let index = self.columns.iter().position(|name| name == column);
        Some(index.and_then(|i| row.get(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consistency_parse_spellings() {
        assert_eq!("LOCAL_ONE".parse::<Consistency>().unwrap(), Consistency::LocalOne);
        assert_eq!("local_quorum".parse::<Consistency>().unwrap(), Consistency::LocalQuorum);
        assert_eq!("each-quorum".parse::<Consistency>().unwrap(), Consistency::EachQuorum);
        assert!("majority".parse::<Consistency>().is_err());
    }

    #[test]
    fn test_consistency_display_round_trips() {
        let level = Consistency::LocalSerial;
        assert_eq!(level.to_string(), "LOCAL_SERIAL");
        assert_eq!(level.to_string().parse::<Consistency>().unwrap(), level);
    }

    #[test]
    fn test_consistency_serde_snake_case() {
        let level: Consistency = serde_json::from_str("\"local_quorum\"").unwrap();
        assert_eq!(level, Consistency::LocalQuorum);
        assert_eq!(serde_json::to_string(&Consistency::One).unwrap(), "\"one\"");
    }

    #[test]
    fn test_consistency_default_is_local_one() {
        assert_eq!(Consistency::default(), Consistency::LocalOne);
    }

    #[test]
    fn test_result_rows_first_value() {
        let rows = ResultRows::new(
            vec!["value".to_string()],
            vec![
                vec![CqlValue::Blob(b"first".to_vec())],
                vec![CqlValue::Blob(b"second".to_vec())],
            ],
        );

        let value = rows.first_value("value").unwrap().unwrap();
        assert_eq!(value.as_blob(), Some(&b"first"[..]));
        assert_eq!(rows.first_value("missing"), Some(None));
        assert_eq!(ResultRows::empty().first_value("value"), None);
    }

    #[test]
    fn test_optional_timestamp_into_value() {
        assert_eq!(CqlValue::from(None::<DateTime<Utc>>), CqlValue::Null);
        let now = Utc::now();
        assert_eq!(CqlValue::from(Some(now)), CqlValue::Timestamp(now));
    }
}
