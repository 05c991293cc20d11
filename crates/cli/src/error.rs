use connectors::error::ConnectorError;
use engine_core::{codec::CursorError, error::PaginationError};
use model::pagination::order::OrderParseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid order: {0}")]
    Order(#[from] OrderParseError),

    #[error("Invalid cursor: {0}")]
    Cursor(#[from] CursorError),

    #[error("Pagination failed: {0}")]
    Pagination(#[from] PaginationError),

    #[error("Connection failed: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Invalid connection format provided: {0}")]
    InvalidConnectionFormat(String),

    #[error("{0} connections can only be planned, not queried")]
    UnsupportedConnectionKind(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
