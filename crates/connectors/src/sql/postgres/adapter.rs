use crate::{
    adapter::{DatabaseKind, QueryExecutor},
    error::{ConnectorError, DbError},
    sql::postgres::{params::PgParamStore, row::to_row_data, utils::connect_client},
};
use async_trait::async_trait;
use model::{core::value::Value, records::row::RowData};
use planner::query::{
    ast::select::Select,
    dialect::{self, Dialect},
    renderer::Renderer,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_postgres::Client;
use tracing::debug;

#[derive(Clone)]
pub struct PgAdapter {
    client: Arc<RwLock<Client>>,
    dialect: dialect::Postgres,
}

impl PgAdapter {
    pub async fn connect(url: &str) -> Result<Self, ConnectorError> {
        let client = Arc::new(RwLock::new(connect_client(url).await?));
        Ok(PgAdapter {
            client,
            dialect: dialect::Postgres,
        })
    }

    pub async fn query_rows(
        &self,
        sql: &str,
        params: Vec<Value>,
        table: &str,
    ) -> Result<Vec<RowData>, DbError> {
        let bindings = PgParamStore::from_values(params);
        let client = self.client.read().await;
        let rows = client.query(sql, &bindings.as_refs()).await?;
        Ok(rows.iter().map(|row| to_row_data(row, table)).collect())
    }
}

#[async_trait]
impl QueryExecutor for PgAdapter {
    async fn fetch(&self, query: &Select) -> Result<Vec<RowData>, DbError> {
        let table = query
            .from
            .as_ref()
            .map(|from| from.table.name.clone())
            .ok_or_else(|| DbError::QueryBuildError("SELECT without FROM".to_string()))?;

        let (sql, params) = Renderer::render_node(query, &self.dialect);
        debug!(%sql, params = params.len(), "Executing query");

        self.query_rows(&sql, params, &table).await
    }

    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Postgres
    }
}
