use crate::codec::CursorError;
use connectors::error::DbError;
use planner::query::keyset::KeysetError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaginationError {
    #[error("Malformed cursor: {0}")]
    MalformedCursor(#[from] CursorError),

    #[error("Invalid page size {0}: take must be positive")]
    InvalidPageSize(i64),

    #[error("Cursor was issued for a different ordering, missing keys: {}", missing.join(", "))]
    CursorOrderMismatch { missing: Vec<String> },

    #[error("Row has no integer '{column}' value to build a cursor from")]
    MissingTiebreaker { column: String },

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<KeysetError> for PaginationError {
    fn from(err: KeysetError) -> Self {
        match err {
            KeysetError::MissingKeys(missing) => PaginationError::CursorOrderMismatch { missing },
        }
    }
}

impl PaginationError {
    /// Errors caused by the request itself. These are raised before any
    /// query runs and are never worth retrying.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PaginationError::MalformedCursor(_)
                | PaginationError::InvalidPageSize(_)
                | PaginationError::CursorOrderMismatch { .. }
        )
    }
}
