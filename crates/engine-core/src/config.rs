use serde::{Deserialize, Serialize};

pub const DEFAULT_TAKE: i64 = 10;
pub const DEFAULT_TIEBREAKER: &str = "id";
pub const DEFAULT_MAX_CURSOR_LEN: usize = 8192;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginatorConfig {
    /// Page size used when a request does not carry one.
    pub default_take: i64,

    /// Unique, monotonic column appended to every ordering.
    pub tiebreaker: String,

    /// Longest cursor token accepted before decoding.
    pub max_cursor_len: usize,
}

impl Default for PaginatorConfig {
    fn default() -> Self {
        Self {
            default_take: DEFAULT_TAKE,
            tiebreaker: DEFAULT_TIEBREAKER.to_string(),
            max_cursor_len: DEFAULT_MAX_CURSOR_LEN,
        }
    }
}
