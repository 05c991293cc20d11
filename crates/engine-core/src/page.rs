use model::{core::value::Value, records::row::RowData};
use serde::{Deserialize, Serialize, Serializer};

/// Inbound page parameters as they arrive from the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub take: Option<i64>,
    pub cursor: Option<String>,
}

impl PageRequest {
    pub fn new(take: Option<i64>, cursor: Option<String>) -> Self {
        Self { take, cursor }
    }

    pub fn first(take: i64) -> Self {
        Self::new(Some(take), None)
    }

    pub fn at(take: i64, cursor: impl Into<String>) -> Self {
        Self::new(Some(take), Some(cursor.into()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub next_cursor: Option<String>,
    pub prev_cursor: Option<String>,
    pub take: i64,
}

/// One page of rows in natural order plus the cursors around it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    #[serde(serialize_with = "serialize_rows")]
    pub items: Vec<RowData>,
    pub pagination: PaginationMeta,
}

impl Page {
    pub fn new(
        items: Vec<RowData>,
        next_cursor: Option<String>,
        prev_cursor: Option<String>,
        take: i64,
    ) -> Self {
        Self {
            items,
            pagination: PaginationMeta {
                next_cursor,
                prev_cursor,
                take,
            },
        }
    }

    pub fn has_next(&self) -> bool {
        self.pagination.next_cursor.is_some()
    }

    pub fn has_prev(&self) -> bool {
        self.pagination.prev_cursor.is_some()
    }

    /// Values of `column` across the page, in order.
    pub fn column(&self, column: &str) -> Vec<Value> {
        self.items.iter().map(|row| row.get_value(column)).collect()
    }
}

fn serialize_rows<S: Serializer>(rows: &[RowData], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(rows.iter().map(RowData::to_json))
}
