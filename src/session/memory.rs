//! In-Memory Session
//!
//! A single-node, in-process stand-in for the cache keyspace. It recognizes the
//! statements in [`schema`] (single-key SELECT, INSERT with `USING TTL`, UPDATE,
//! DELETE and the table DDL) and enforces per-row TTL the way the store does:
//! expired rows stop being visible and are swept on the next write.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::schema;
use crate::session::{BoundStatement, Consistency, CqlSession, CqlValue, ResultRows};

// == Errors ==
/// Errors raised by [`MemorySession`], shaped after the store's own responses.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MemorySessionError {
    /// Statement references a table that does not exist
    #[error("unconfigured table {0}")]
    UnknownTable(String),

    /// Statement text is not one the session recognizes
    #[error("Unsupported statement: {0}")]
    Unsupported(String),

    /// Wrong number of bound values
    #[error("Invalid amount of bind variables: expected {expected}, got {actual}")]
    BindMismatch { expected: usize, actual: usize },

    /// A bound value has the wrong type for its position
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    /// Not enough replicas are available for the requested consistency
    #[error("Cannot achieve consistency level {0}")]
    Unavailable(Consistency),

    /// Statement handle was prepared by a different session
    #[error("Prepared statement {0} is unknown to this session")]
    UnknownStatement(u64),
}

type SessionResult<T> = std::result::Result<T, MemorySessionError>;

// == Session Stats ==
/// Counts of the requests a [`MemorySession`] has served.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Statements prepared
    pub prepared: u64,
    /// SELECT statements executed
    pub reads: u64,
    /// INSERT, UPDATE, DELETE and DDL statements executed
    pub writes: u64,
    /// Rows dropped because their TTL had elapsed
    pub expired: u64,
}

impl SessionStats {
    /// Total statements executed.
    pub fn executed(&self) -> u64 {
        self.reads + self.writes
    }
}

// == Stored Row ==
/// A row held by the session, with its native expiry.
#[derive(Debug, Clone, Default)]
struct StoredRow {
    cells: HashMap<&'static str, CqlValue>,
    /// Expiration timestamp (Unix milliseconds), None = no TTL
    expires_at: Option<u64>,
}

impl StoredRow {
    /// An entry is expired once the current time reaches its expiry.
    fn is_expired(&self, now: u64) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    /// Remaining TTL in whole seconds, as `SELECT TTL(...)` reports it.
    fn ttl_remaining(&self, now: u64) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(now) / 1000)
    }
}

/// Returns current Unix timestamp in milliseconds.
fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

// == Cache Table ==
/// Rows of the cache table, keyed by `id`.
#[derive(Debug, Clone, Default)]
struct Table {
    rows: HashMap<String, StoredRow>,
}

impl Table {
    /// Fetches a live row, dropping it if its TTL has elapsed.
    fn live_row(&mut self, key: &str, now: u64, stats: &mut SessionStats) -> Option<&StoredRow> {
        if self.rows.get(key).is_some_and(|row| row.is_expired(now)) {
            self.rows.remove(key);
            stats.expired += 1;
        }
        self.rows.get(key)
    }

    /// Writes cells into a row, creating it if needed. Null values clear cells.
    fn upsert(&mut self, key: String, cells: [(&'static str, CqlValue); 2], expires_at: Option<u64>, now: u64) {
        let row = self.rows.entry(key).or_default();
        if row.is_expired(now) {
            row.cells.clear();
        }
        for (column, value) in cells {
            match value {
                CqlValue::Null => {
                    row.cells.remove(column);
                }
                value => {
                    row.cells.insert(column, value);
                }
            }
        }
        row.expires_at = expires_at;
    }

    // == Cleanup Expired ==
    /// Removes all expired rows.
    ///
    /// Returns the number of rows removed.
    fn cleanup_expired(&mut self, now: u64) -> usize {
        let before = self.rows.len();
        self.rows.retain(|_, row| !row.is_expired(now));
        before - self.rows.len()
    }
}

#[derive(Debug, Default)]
struct SessionState {
    /// None until the cache table is created
    table: Option<Table>,
    stats: SessionStats,
}

impl SessionState {
    fn sweep(table: &mut Table, stats: &mut SessionStats, now: u64) -> usize {
        let removed = table.cleanup_expired(now);
        stats.expired += removed as u64;
        removed
    }
}

// == Statements ==
/// The statements the session recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Select,
    Insert,
    Update,
    Delete,
    CreateTable,
}

impl Shape {
    const KNOWN: [(&'static str, Shape); 5] = [
        (schema::SELECT, Shape::Select),
        (schema::INSERT, Shape::Insert),
        (schema::UPDATE, Shape::Update),
        (schema::DELETE, Shape::Delete),
        (schema::CREATE_TABLE, Shape::CreateTable),
    ];

    /// Matches `cql` against the known statements, ignoring case, runs of
    /// whitespace and a trailing semicolon.
    fn recognize(cql: &str) -> SessionResult<Shape> {
        let normalized = normalize(cql);
        Self::KNOWN
            .iter()
            .find(|(text, _)| normalize(text).eq_ignore_ascii_case(&normalized))
            .map(|(_, shape)| *shape)
            .ok_or_else(|| MemorySessionError::Unsupported(cql.to_string()))
    }
}

fn normalize(cql: &str) -> String {
    cql.trim()
        .trim_end_matches(';')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// A statement prepared by a [`MemorySession`].
#[derive(Debug, Clone)]
pub struct MemoryStatement {
    id: u64,
    session: u64,
    shape: Shape,
    markers: usize,
}

impl MemoryStatement {
    /// Number of bind markers in the statement.
    pub fn markers(&self) -> usize {
        self.markers
    }
}

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

// == Memory Session ==
/// In-process session holding the cache table, with native TTL expiry.
#[derive(Debug)]
pub struct MemorySession {
    id: u64,
    state: RwLock<SessionState>,
    next_statement: AtomicU64,
    unavailable: AtomicBool,
}

impl MemorySession {
    // == Constructor ==
    /// Creates a session whose keyspace already holds the cache table.
    pub fn new() -> Self {
        Self::with_table(Some(Table::default()))
    }

    /// Creates a session over an empty keyspace.
    pub fn empty() -> Self {
        Self::with_table(None)
    }

    fn with_table(table: Option<Table>) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            state: RwLock::new(SessionState {
                table,
                stats: SessionStats::default(),
            }),
            next_statement: AtomicU64::new(1),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent execute fail as if replicas were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Removes every expired row now rather than on the next write.
    ///
    /// Returns the number of rows removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = current_timestamp_ms();
        let mut state = self.state.write().await;
        let SessionState { table, stats } = &mut *state;
        match table {
            Some(table) => SessionState::sweep(table, stats, now),
            None => 0,
        }
    }

    // == Inspection ==
    /// Returns current request counters.
    pub async fn stats(&self) -> SessionStats {
        self.state.read().await.stats.clone()
    }

    /// Number of live rows in the cache table.
    pub async fn row_count(&self) -> usize {
        let now = current_timestamp_ms();
        self.state
            .read()
            .await
            .table
            .as_ref()
            .map(|t| t.rows.values().filter(|row| !row.is_expired(now)).count())
            .unwrap_or(0)
    }

    /// Remaining TTL in seconds of a cache row, or None if the row is missing
    /// or was written without a TTL.
    pub async fn ttl_remaining(&self, key: &str) -> Option<u64> {
        let now = current_timestamp_ms();
        let state = self.state.read().await;
        let row = state.table.as_ref()?.rows.get(key)?;
        if row.is_expired(now) {
            return None;
        }
        row.ttl_remaining(now)
    }

    /// Reads a cell of a cache row directly, bypassing statements.
    pub async fn cell(&self, key: &str, column: &str) -> Option<CqlValue> {
        let now = current_timestamp_ms();
        let state = self.state.read().await;
        let row = state.table.as_ref()?.rows.get(key)?;
        if row.is_expired(now) {
            return None;
        }
        row.cells.get(column).cloned()
    }

    fn apply(state: &mut SessionState, shape: Shape, values: Vec<CqlValue>) -> SessionResult<ResultRows> {
        let now = current_timestamp_ms();
        let SessionState { table, stats } = state;

        if shape == Shape::CreateTable {
            stats.writes += 1;
            table.get_or_insert_with(Table::default);
            return Ok(ResultRows::empty());
        }

        let table = table
            .as_mut()
            .ok_or_else(|| MemorySessionError::UnknownTable(schema::TABLE.to_string()))?;

        match shape {
            Shape::Select => {
                stats.reads += 1;
                let [id] = bind(values)?;
                let key = text_key(id)?;
                let rows = match table.live_row(&key, now, stats) {
                    Some(row) => vec![vec![row
                        .cells
                        .get(schema::VALUE_COLUMN)
                        .cloned()
                        .unwrap_or(CqlValue::Null)]],
                    None => Vec::new(),
                };
                return Ok(ResultRows::new(vec![schema::VALUE_COLUMN.to_string()], rows));
            }
            Shape::Insert => {
                let [id, expiration, value, ttl] = bind(values)?;
                let expires_at = ttl_deadline(&ttl, now)?;
                table.upsert(
                    text_key(id)?,
                    [(schema::EXPIRATION_COLUMN, expiration), (schema::VALUE_COLUMN, value)],
                    expires_at,
                    now,
                );
            }
            Shape::Update => {
                let [expiration, value, id] = bind(values)?;
                table.upsert(
                    text_key(id)?,
                    [(schema::EXPIRATION_COLUMN, expiration), (schema::VALUE_COLUMN, value)],
                    None,
                    now,
                );
            }
            Shape::Delete => {
                let [id] = bind(values)?;
                table.rows.remove(&text_key(id)?);
            }
            Shape::CreateTable => {}
        }

        stats.writes += 1;
        let removed = SessionState::sweep(table, stats, now);
        if removed > 0 {
            debug!("Swept {} expired rows", removed);
        }
        Ok(ResultRows::empty())
    }
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

fn bind<const N: usize>(values: Vec<CqlValue>) -> SessionResult<[CqlValue; N]> {
    <[CqlValue; N]>::try_from(values).map_err(|values| MemorySessionError::BindMismatch {
        expected: N,
        actual: values.len(),
    })
}

fn text_key(value: CqlValue) -> SessionResult<String> {
    match value {
        CqlValue::Text(key) => Ok(key),
        _ => Err(MemorySessionError::InvalidValue(schema::ID_COLUMN.to_string())),
    }
}

/// Converts a bound `USING TTL` value into an absolute deadline. Zero means no TTL.
fn ttl_deadline(ttl: &CqlValue, now: u64) -> SessionResult<Option<u64>> {
    match ttl {
        CqlValue::Int(secs) if *secs > 0 => Ok(Some(now + (*secs as u64) * 1000)),
        CqlValue::Int(0) | CqlValue::Null => Ok(None),
        _ => Err(MemorySessionError::InvalidValue("[ttl]".to_string())),
    }
}

#[async_trait]
impl CqlSession for MemorySession {
    type Statement = MemoryStatement;
    type Error = MemorySessionError;

    async fn prepare(&self, cql: &str) -> SessionResult<MemoryStatement> {
        let shape = Shape::recognize(cql)?;

        let mut state = self.state.write().await;
        state.stats.prepared += 1;
        if shape != Shape::CreateTable && state.table.is_none() {
            return Err(MemorySessionError::UnknownTable(schema::TABLE.to_string()));
        }

        let id = self.next_statement.fetch_add(1, Ordering::Relaxed);
        debug!("Prepared statement {} as {:?}", id, shape);

        Ok(MemoryStatement {
            id,
            session: self.id,
            shape,
            markers: cql.matches('?').count(),
        })
    }

    async fn execute(
        &self,
        bound: BoundStatement<'_, MemoryStatement>,
    ) -> SessionResult<ResultRows> {
        let statement = bound.statement;
        if statement.session != self.id {
            return Err(MemorySessionError::UnknownStatement(statement.id));
        }
        if bound.values.len() != statement.markers {
            return Err(MemorySessionError::BindMismatch {
                expected: statement.markers,
                actual: bound.values.len(),
            });
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MemorySessionError::Unavailable(bound.consistency));
        }

        let mut state = self.state.write().await;
        Self::apply(&mut state, statement.shape, bound.values)
    }
}
