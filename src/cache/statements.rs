//! Prepared Statements Module
//!
//! The four cache statements, prepared once per session.

use std::fmt;

use crate::error::{CacheError, Result};
use crate::schema;
use crate::session::CqlSession;

// == Statement Kind ==
/// The statements the cache prepares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    /// Every kind, in preparation order.
    pub const ALL: [StatementKind; 4] = [
        StatementKind::Select,
        StatementKind::Insert,
        StatementKind::Update,
        StatementKind::Delete,
    ];

    pub fn cql(&self) -> &'static str {
        match self {
            StatementKind::Select => schema::SELECT,
            StatementKind::Insert => schema::INSERT,
            StatementKind::Update => schema::UPDATE,
            StatementKind::Delete => schema::DELETE,
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatementKind::Select => "select",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
        };
        f.write_str(name)
    }
}

// == Prepared Statements ==
/// Prepared handles for each [`StatementKind`].
///
/// Built before the cache is handed out and never mutated afterwards, so
/// concurrent operations read it without locking.
#[derive(Debug)]
pub struct PreparedStatements<P> {
    select: P,
    insert: P,
    update: P,
    delete: P,
}

impl<P: Send + Sync> PreparedStatements<P> {
    /// Prepares all statements against `session`, stopping at the first failure.
    pub async fn prepare<S>(session: &S) -> Result<Self>
    where
        S: CqlSession<Statement = P>,
    {
        Ok(Self {
            select: prepare_one(session, StatementKind::Select).await?,
            insert: prepare_one(session, StatementKind::Insert).await?,
            update: prepare_one(session, StatementKind::Update).await?,
            delete: prepare_one(session, StatementKind::Delete).await?,
        })
    }

    pub fn get(&self, kind: StatementKind) -> &P {
        match kind {
            StatementKind::Select => &self.select,
            StatementKind::Insert => &self.insert,
            StatementKind::Update => &self.update,
            StatementKind::Delete => &self.delete,
        }
    }
}

async fn prepare_one<S: CqlSession>(session: &S, kind: StatementKind) -> Result<S::Statement> {
    session
        .prepare(kind.cql())
        .await
        .map_err(|err| CacheError::Preparation {
            statement: kind,
            source: Box::new(err),
        })
}
