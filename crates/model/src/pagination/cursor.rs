use crate::{core::value::Value, records::row::RowData};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Which side of the boundary row a page request reads.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CursorDirection {
    Forward,
    Backward,
}

impl CursorDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            CursorDirection::Forward => "forward",
            CursorDirection::Backward => "backward",
        }
    }
}

impl FromStr for CursorDirection {
    type Err = ();

    /// Only the exact lowercase tags are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" => Ok(CursorDirection::Forward),
            "backward" => Ok(CursorDirection::Backward),
            _ => Err(()),
        }
    }
}

impl fmt::Display for CursorDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boundary row snapshot carried between page requests.
///
/// The envelope (`id`, `direction`) is fixed; the sort-key values are an
/// ordered list of `(column, value)` pairs taken from the boundary row.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    id: i64,
    direction: CursorDirection,
    keys: Vec<(String, Value)>,
}

impl Cursor {
    pub fn new(id: i64, direction: CursorDirection, keys: Vec<(String, Value)>) -> Self {
        Cursor {
            id,
            direction,
            keys,
        }
    }

    /// Captures `order_keys` and the tie-breaker from a boundary row.
    ///
    /// Returns `None` when the tie-breaker column does not hold an integer.
    /// Columns missing from the row are captured as `Null`.
    pub fn from_row<'a, I>(
        row: &RowData,
        order_keys: I,
        tiebreaker: &str,
        direction: CursorDirection,
    ) -> Option<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let id = match row.get_value(tiebreaker) {
            Value::Int(id) => id,
            _ => return None,
        };

        let keys = order_keys
            .into_iter()
            .map(|key| (key.to_string(), row.get_value(key)))
            .collect();

        Some(Cursor::new(id, direction, keys))
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn direction(&self) -> CursorDirection {
        self.direction
    }

    pub fn keys(&self) -> &[(String, Value)] {
        &self.keys
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.keys
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    /// Keys the caller expects that this cursor does not carry.
    pub fn missing_keys<'a, I>(&self, expected: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        expected
            .into_iter()
            .filter(|key| self.get(key).is_none())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> RowData {
        RowData::from_pairs(
            "events",
            [
                ("id", Value::Int(5)),
                ("created_at", Value::String("2023-01-01".into())),
                ("name", Value::String("Test Item".into())),
                ("extra_field", Value::String("ignored".into())),
            ],
        )
    }

    #[test]
    fn test_from_row_extracts_only_order_keys() {
        let cursor = Cursor::from_row(
            &row(),
            ["created_at", "name"],
            "id",
            CursorDirection::Forward,
        )
        .unwrap();

        assert_eq!(cursor.id(), 5);
        assert_eq!(cursor.direction(), CursorDirection::Forward);
        assert_eq!(cursor.keys().len(), 2);
        assert!(cursor.get("extra_field").is_none());
    }

    #[test]
    fn test_from_row_requires_integer_tiebreaker() {
        let row = RowData::from_pairs("events", [("id", Value::String("x".into()))]);
        assert!(Cursor::from_row(&row, [], "id", CursorDirection::Forward).is_none());
    }

    #[test]
    fn test_missing_keys() {
        let cursor =
            Cursor::from_row(&row(), ["created_at"], "id", CursorDirection::Backward).unwrap();
        assert_eq!(cursor.missing_keys(["created_at", "name"]), vec!["name"]);
    }

    #[test]
    fn test_direction_parse_is_exact() {
        assert_eq!("forward".parse(), Ok(CursorDirection::Forward));
        assert_eq!("backward".parse(), Ok(CursorDirection::Backward));
        assert!("Forward".parse::<CursorDirection>().is_err());
        assert!("sideways".parse::<CursorDirection>().is_err());
    }
}
