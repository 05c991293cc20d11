use crate::{
    adapter::{DatabaseKind, QueryExecutor},
    error::DbError,
    memory::eval::{Evaluator, Tables},
};
use async_trait::async_trait;
use model::records::row::RowData;
use planner::query::{
    ast::select::Select,
    dialect::{self, Dialect},
    renderer::Renderer,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{Level, debug, enabled};

#[derive(Clone, Default)]
pub struct MemoryAdapter {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends rows to `table`, creating it when absent.
    pub async fn insert<I>(&self, table: &str, rows: I)
    where
        I: IntoIterator<Item = RowData>,
    {
        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default().extend(rows);
    }

    /// Removes every row of `table` matching `predicate`; returns how many
    /// were removed.
    pub async fn delete_where<F>(&self, table: &str, predicate: F) -> usize
    where
        F: Fn(&RowData) -> bool,
    {
        let mut tables = self.tables.write().await;
        match tables.get_mut(table) {
            Some(rows) => {
                let before = rows.len();
                rows.retain(|row| !predicate(row));
                before - rows.len()
            }
            None => 0,
        }
    }

    pub async fn rows(&self, table: &str) -> Vec<RowData> {
        let tables = self.tables.read().await;
        tables.get(table).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl QueryExecutor for MemoryAdapter {
    async fn fetch(&self, query: &Select) -> Result<Vec<RowData>, DbError> {
        if enabled!(Level::DEBUG) {
            let (sql, params) = Renderer::render_node(query, self.dialect());
            debug!(%sql, params = params.len(), "Evaluating query in memory");
        }

        let tables = self.tables.read().await;
        Evaluator::new(&tables).run(query)
    }

    fn dialect(&self) -> &dyn Dialect {
        &dialect::Postgres
    }

    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Memory
    }
}
