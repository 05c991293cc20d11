use crate::error::DbError;
use async_trait::async_trait;
use model::records::row::RowData;
use planner::query::{ast::select::Select, dialect::Dialect};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseKind {
    Postgres,
    Memory,
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseKind::Postgres => write!(f, "postgres"),
            DatabaseKind::Memory => write!(f, "memory"),
        }
    }
}

/// Runs a `SELECT` AST and returns the resulting rows in the order produced
/// by the query.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn fetch(&self, query: &Select) -> Result<Vec<RowData>, DbError>;

    /// Dialect used to render queries for this executor.
    fn dialect(&self) -> &dyn Dialect;

    fn kind(&self) -> DatabaseKind;
}
