use crate::MAX_PAGES;
use chrono::{DateTime, Duration, TimeZone, Utc};
use connectors::memory::adapter::MemoryAdapter;
use engine_core::{
    error::PaginationError,
    page::{Page, PageRequest},
    paginator::Paginator,
};
use model::{
    core::value::Value,
    pagination::order::{OrderSpec, SortDirection},
    records::row::RowData,
};
use planner::{
    query::{
        ast::expr::Expr,
        builder::select::{FromState, SelectBuilder},
    },
    table_ref,
};
use std::{cmp::Ordering, sync::Arc};

pub const EVENTS_TABLE: &str = "events";

const NAMES: [&str; 5] = ["Keynote", "Workshop", "Meetup", "Panel", "Launch"];

pub fn event(id: i64, name: &str, venue: &str, created_at: DateTime<Utc>) -> RowData {
    RowData::from_pairs(
        EVENTS_TABLE,
        [
            ("id", Value::Int(id)),
            ("name", Value::from(name)),
            ("venue", Value::from(venue)),
            ("created_at", Value::Timestamp(created_at)),
        ],
    )
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
}

/// Events with heavy ties on `created_at` and `name`, so every ordering
/// needs the tie-breaker.
pub fn event_rows(count: i64) -> Vec<RowData> {
    (1..=count)
        .map(|id| {
            let created_at = base_time() + Duration::hours(id % 4);
            let name = NAMES[(id * 7 % 5) as usize];
            let venue = if id % 3 == 0 { "Arena" } else { "Hall" };
            event(id, name, venue, created_at)
        })
        .collect()
}

/// Rows with plain string `created_at` labels such as `t1`, ids counting from 1.
pub fn labelled_rows(labels: &[&str]) -> Vec<RowData> {
    labels
        .iter()
        .zip(1..)
        .map(|(label, id)| {
            RowData::from_pairs(
                EVENTS_TABLE,
                [("id", Value::Int(id)), ("created_at", Value::from(*label))],
            )
        })
        .collect()
}

/// Rows whose `score` is `NULL` where `None` is given.
pub fn scored_rows(scores: &[Option<i64>]) -> Vec<RowData> {
    scores
        .iter()
        .zip(1..)
        .map(|(score, id)| {
            RowData::from_pairs(
                EVENTS_TABLE,
                [
                    ("id", Value::Int(id)),
                    ("score", score.map_or(Value::Null, Value::Int)),
                ],
            )
        })
        .collect()
}

pub async fn seeded(rows: Vec<RowData>) -> (Arc<MemoryAdapter>, Paginator<MemoryAdapter>) {
    let adapter = Arc::new(MemoryAdapter::new());
    adapter.insert(EVENTS_TABLE, rows).await;
    let paginator = Paginator::new(adapter.clone());
    (adapter, paginator)
}

pub fn events_query() -> SelectBuilder<FromState> {
    SelectBuilder::new()
        .select(vec![Expr::Wildcard(None)])
        .from(table_ref!(EVENTS_TABLE), None)
}

pub fn aliased_events_query() -> SelectBuilder<FromState> {
    SelectBuilder::new()
        .select(vec![Expr::Wildcard(None)])
        .from(table_ref!(EVENTS_TABLE), Some("e"))
}

pub fn order(entries: &[(&str, SortDirection)]) -> OrderSpec {
    entries
        .iter()
        .fold(OrderSpec::new(), |spec, (key, direction)| spec.with(*key, *direction))
}

pub fn ids(page: &Page) -> Vec<i64> {
    page.items
        .iter()
        .filter_map(|row| row.get_value("id").as_i64())
        .collect()
}

fn nulls_last(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.compare(b).unwrap_or(Ordering::Equal),
    }
}

/// Ids of `rows` sorted by `order` then ascending id, computed without the
/// engine. `NULL` sorts above every value.
pub fn expected_ids(rows: &[RowData], order: &OrderSpec) -> Vec<i64> {
    let mut sorted: Vec<&RowData> = rows.iter().collect();
    sorted.sort_by(|a, b| {
        order
            .iter()
            .map(|(key, direction)| {
                let ordering = nulls_last(&a.get_value(key), &b.get_value(key));
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            })
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or_else(|| a.get_value("id").compare(&b.get_value("id")).unwrap_or(Ordering::Equal))
    });
    sorted
        .into_iter()
        .filter_map(|row| row.get_value("id").as_i64())
        .collect()
}

/// Follows `next_cursor` from the first page until it runs out.
pub async fn walk_forward<Q>(
    paginator: &Paginator<MemoryAdapter>,
    query: Q,
    order: &OrderSpec,
    take: i64,
) -> Result<Vec<Page>, PaginationError>
where
    Q: Fn() -> SelectBuilder<FromState>,
{
    let mut pages = Vec::new();
    let mut request = PageRequest::first(take);
    for _ in 0..MAX_PAGES {
        let page = paginator.paginate(query(), order, &request).await?;
        let next = page.pagination.next_cursor.clone();
        pages.push(page);
        match next {
            Some(token) => request = PageRequest::at(take, token),
            None => break,
        }
    }
    Ok(pages)
}

/// Follows `prev_cursor` from `token` until it runs out. Pages are returned
/// in the order visited, i.e. last page first.
pub async fn walk_backward<Q>(
    paginator: &Paginator<MemoryAdapter>,
    query: Q,
    order: &OrderSpec,
    take: i64,
    token: String,
) -> Result<Vec<Page>, PaginationError>
where
    Q: Fn() -> SelectBuilder<FromState>,
{
    let mut pages = Vec::new();
    let mut request = PageRequest::at(take, token);
    for _ in 0..MAX_PAGES {
        let page = paginator.paginate(query(), order, &request).await?;
        let prev = page.pagination.prev_cursor.clone();
        pages.push(page);
        match prev {
            Some(token) => request = PageRequest::at(take, token),
            None => break,
        }
    }
    Ok(pages)
}
