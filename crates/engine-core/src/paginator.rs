use crate::{
    codec::CursorCodec,
    config::PaginatorConfig,
    error::PaginationError,
    page::{Page, PageRequest},
};
use connectors::adapter::QueryExecutor;
use model::{
    core::value::Value,
    pagination::{
        cursor::{Cursor, CursorDirection},
        order::OrderSpec,
    },
    records::row::RowData,
};
use planner::{
    query::{
        ast::{common::OrderDir, select::Select},
        builder::select::{FromState, SelectBuilder},
        ident,
        keyset::KeysetStrategy,
        value,
    },
    table_ref,
};
use std::sync::Arc;
use tracing::debug;

/// Name of the CTE holding the ids of a backward sub-read.
pub const PREV_CTE: &str = "prev";

/// A fully built page query, ready to run.
#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    select: Select,
    take: i64,
    direction: CursorDirection,
    has_cursor: bool,
}

impl PagePlan {
    pub fn select(&self) -> &Select {
        &self.select
    }

    pub fn take(&self) -> i64 {
        self.take
    }

    pub fn direction(&self) -> CursorDirection {
        self.direction
    }

    /// Rows kept after trimming the over-fetched sentinel.
    fn limit(&self) -> usize {
        usize::try_from(self.take).unwrap_or(usize::MAX)
    }
}

/// Turns a collaborator query plus page parameters into a `PagePlan`.
#[derive(Debug, Clone, Default)]
pub struct PagePlanner {
    codec: CursorCodec,
    config: PaginatorConfig,
}

impl PagePlanner {
    pub fn new(config: PaginatorConfig) -> Self {
        Self {
            codec: CursorCodec::from_config(&config),
            config,
        }
    }

    pub fn codec(&self) -> &CursorCodec {
        &self.codec
    }

    pub fn config(&self) -> &PaginatorConfig {
        &self.config
    }

    /// Validates `take`, decodes the inbound token and builds the read for
    /// the direction the cursor asks for. No cursor reads forward from the
    /// start; an empty token counts as no cursor.
    pub fn plan(
        &self,
        query: SelectBuilder<FromState>,
        order: &OrderSpec,
        request: &PageRequest,
    ) -> Result<PagePlan, PaginationError> {
        let take = validate_take(request.take.unwrap_or(self.config.default_take))?;

        let cursor = match request.cursor.as_deref() {
            Some(token) if !token.is_empty() => Some(self.codec.decode(token)?),
            _ => None,
        };

        match cursor {
            Some(cursor) if cursor.direction() == CursorDirection::Backward => {
                self.plan_backward(query, take, order, &cursor)
            }
            cursor => self.plan_forward(query, take, order, cursor.as_ref()),
        }
    }

    /// `WHERE <keyset predicate> ORDER BY <order>, id ASC LIMIT take + 1`
    pub fn plan_forward(
        &self,
        query: SelectBuilder<FromState>,
        take: i64,
        order: &OrderSpec,
        cursor: Option<&Cursor>,
    ) -> Result<PagePlan, PaginationError> {
        let take = validate_take(take)?;
        let strategy = self.strategy(&query, order);

        let builder = match cursor {
            Some(cursor) => strategy.apply_predicate(query, cursor, CursorDirection::Forward)?,
            None => query,
        };

        let select = strategy
            .apply_ordering(builder, OrderDir::Asc)
            .limit(value(Value::Int(take.saturating_add(1))))
            .build();

        Ok(PagePlan {
            select,
            take,
            direction: CursorDirection::Forward,
            has_cursor: cursor.is_some(),
        })
    }

    /// Reads the `take + 1` rows before the cursor under the inverted order
    /// into a CTE, then returns those rows in natural order.
    pub fn plan_backward(
        &self,
        query: SelectBuilder<FromState>,
        take: i64,
        order: &OrderSpec,
        cursor: &Cursor,
    ) -> Result<PagePlan, PaginationError> {
        let take = validate_take(take)?;
        let limit = value(Value::Int(take.saturating_add(1)));
        let strategy = self.strategy(&query, order);
        let inverted = strategy.inverted();

        let preceding = inverted.apply_predicate(query.clone(), cursor, CursorDirection::Backward)?;
        let preceding = inverted
            .apply_ordering(preceding, OrderDir::Desc)
            .columns(vec![strategy.tiebreaker_ident()])
            .limit(limit.clone())
            .build();

        let preceding_ids = SelectBuilder::new()
            .select(vec![ident(strategy.tiebreaker())])
            .from(table_ref!(PREV_CTE), None)
            .build();

        let outer = query
            .with_cte(PREV_CTE, preceding)
            .and_where(strategy.tiebreaker_ident().in_subquery(preceding_ids));

        let select = strategy
            .apply_ordering(outer, OrderDir::Asc)
            .limit(limit)
            .build();

        Ok(PagePlan {
            select,
            take,
            direction: CursorDirection::Backward,
            has_cursor: true,
        })
    }

    fn strategy(&self, query: &SelectBuilder<FromState>, order: &OrderSpec) -> KeysetStrategy {
        KeysetStrategy::new(order.clone(), &self.config.tiebreaker)
            .qualified(query.source_qualifier())
    }

    fn boundary(
        &self,
        row: &RowData,
        order: &OrderSpec,
        direction: CursorDirection,
    ) -> Result<String, PaginationError> {
        self.codec
            .encode_row(row, order.keys(), direction)
            .ok_or_else(|| PaginationError::MissingTiebreaker {
                column: self.config.tiebreaker.clone(),
            })
    }
}

/// Keyset paginator over a `QueryExecutor`.
///
/// Holds no per-request state; one instance can serve concurrent requests.
pub struct Paginator<E: QueryExecutor + ?Sized> {
    executor: Arc<E>,
    planner: PagePlanner,
}

impl<E: QueryExecutor + ?Sized> Paginator<E> {
    pub fn new(executor: Arc<E>) -> Self {
        Self::with_config(executor, PaginatorConfig::default())
    }

    pub fn with_config(executor: Arc<E>, config: PaginatorConfig) -> Self {
        Self {
            executor,
            planner: PagePlanner::new(config),
        }
    }

    pub fn planner(&self) -> &PagePlanner {
        &self.planner
    }

    pub fn codec(&self) -> &CursorCodec {
        self.planner.codec()
    }

    pub async fn paginate(
        &self,
        query: SelectBuilder<FromState>,
        order: &OrderSpec,
        request: &PageRequest,
    ) -> Result<Page, PaginationError> {
        let plan = self.planner.plan(query, order, request)?;
        self.execute(plan, order).await
    }

    pub async fn forward(
        &self,
        query: SelectBuilder<FromState>,
        take: i64,
        order: &OrderSpec,
        cursor: Option<&Cursor>,
    ) -> Result<Page, PaginationError> {
        let plan = self.planner.plan_forward(query, take, order, cursor)?;
        self.execute(plan, order).await
    }

    pub async fn backward(
        &self,
        query: SelectBuilder<FromState>,
        take: i64,
        order: &OrderSpec,
        cursor: &Cursor,
    ) -> Result<Page, PaginationError> {
        let plan = self.planner.plan_backward(query, take, order, cursor)?;
        self.execute(plan, order).await
    }

    /// Runs `plan` and trims the over-fetched row, deriving the boundary
    /// cursors from the rows that remain.
    pub async fn execute(&self, plan: PagePlan, order: &OrderSpec) -> Result<Page, PaginationError> {
        let mut rows = self.executor.fetch(&plan.select).await?;
        let fetched = rows.len();
        let limit = plan.limit();

        let (next_cursor, prev_cursor) = match plan.direction {
            CursorDirection::Forward => {
                let has_next = rows.len() > limit;
                rows.truncate(limit);

                let next = match rows.last() {
                    Some(last) if has_next => {
                        Some(self.planner.boundary(last, order, CursorDirection::Forward)?)
                    }
                    _ => None,
                };
                let prev = match rows.first() {
                    Some(first) if plan.has_cursor => {
                        Some(self.planner.boundary(first, order, CursorDirection::Backward)?)
                    }
                    _ => None,
                };
                (next, prev)
            }
            CursorDirection::Backward => {
                let has_prev = rows.len() > limit;
                if has_prev {
                    rows.drain(..rows.len() - limit);
                }

                let next = rows
                    .last()
                    .map(|last| self.planner.boundary(last, order, CursorDirection::Forward))
                    .transpose()?;
                let prev = match rows.first() {
                    Some(first) if has_prev => {
                        Some(self.planner.boundary(first, order, CursorDirection::Backward)?)
                    }
                    _ => None,
                };
                (next, prev)
            }
        };

        debug!(
            direction = %plan.direction,
            take = plan.take,
            fetched,
            returned = rows.len(),
            has_next = next_cursor.is_some(),
            has_prev = prev_cursor.is_some(),
            "Fetched page"
        );

        Ok(Page::new(rows, next_cursor, prev_cursor, plan.take))
    }
}

fn validate_take(take: i64) -> Result<i64, PaginationError> {
    if take <= 0 {
        return Err(PaginationError::InvalidPageSize(take));
    }
    Ok(take)
}
