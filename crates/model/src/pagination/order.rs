use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderParseError {
    /// An entry was not of the form `field.DIRECTION`.
    #[error("Order entries should look like 'created_at.DESC', got '{0}'")]
    Malformed(String),

    #[error("Order direction should be either 'ASC' or 'DESC', got '{0}'")]
    InvalidDirection(String),

    #[error("Invalid order field name: '{0}'")]
    InvalidIdentifier(String),

    /// The field is syntactically valid but not sortable for this listing.
    #[error("Ordering by '{0}' is not supported")]
    UnknownKey(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn invert(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = OrderParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            _ => Err(OrderParseError::InvalidDirection(s.to_string())),
        }
    }
}

/// Ordered list of sort columns.
///
/// Entry order defines tie-break precedence. The unique tie-breaker column
/// is never stored here; the paginator appends it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderSpec {
    entries: Vec<(String, SortDirection)>,
}

impl OrderSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a key, or updates its direction in place if already present.
    pub fn push(&mut self, key: impl Into<String>, direction: SortDirection) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = direction,
            None => self.entries.push((key, direction)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, direction: SortDirection) -> Self {
        self.push(key, direction);
        self
    }

    /// Parses a comma separated list such as `datetime_start.ASC,name.desc`.
    pub fn parse(input: &str) -> Result<Self, OrderParseError> {
        let mut spec = OrderSpec::new();

        for entry in input.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let parts: Vec<&str> = entry.split('.').collect();
            if parts.len() != 2 {
                return Err(OrderParseError::Malformed(entry.to_string()));
            }

            let (key, direction) = (parts[0].trim(), parts[1].trim());
            if !is_identifier(key) {
                return Err(OrderParseError::InvalidIdentifier(key.to_string()));
            }

            spec.push(key, direction.parse()?);
        }

        Ok(spec)
    }

    /// Rejects keys that are not in `allowed`.
    pub fn restrict_to(self, allowed: &[&str]) -> Result<Self, OrderParseError> {
        if let Some((key, _)) = self
            .entries
            .iter()
            .find(|(key, _)| !allowed.contains(&key.as_str()))
        {
            return Err(OrderParseError::UnknownKey(key.clone()));
        }
        Ok(self)
    }

    /// Falls back to `default` when no keys were requested.
    pub fn or_default(self, default: OrderSpec) -> Self {
        if self.is_empty() { default } else { self }
    }

    /// Same keys, every direction flipped.
    pub fn inverted(&self) -> Self {
        OrderSpec {
            entries: self
                .entries
                .iter()
                .map(|(key, direction)| (key.clone(), direction.invert()))
                .collect(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SortDirection)> {
        self.entries
            .iter()
            .map(|(key, direction)| (key.as_str(), *direction))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl FromStr for OrderSpec {
    type Err = OrderParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderSpec::parse(s)
    }
}

impl fmt::Display for OrderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .entries
            .iter()
            .map(|(key, direction)| format!("{key}.{}", direction.as_str()))
            .collect::<Vec<_>>()
            .join(",");
        f.write_str(&rendered)
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_entry_order() {
        let spec = OrderSpec::parse("datetime_start.ASC, name.desc").unwrap();
        let entries: Vec<_> = spec.iter().collect();
        assert_eq!(
            entries,
            vec![
                ("datetime_start", SortDirection::Asc),
                ("name", SortDirection::Desc)
            ]
        );
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(OrderSpec::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_duplicate_key_updates_direction_in_place() {
        let spec = OrderSpec::parse("a.ASC,b.ASC,a.DESC").unwrap();
        assert_eq!(spec.to_string(), "a.DESC,b.ASC");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            OrderSpec::parse("created_at"),
            Err(OrderParseError::Malformed("created_at".into()))
        );
        assert_eq!(
            OrderSpec::parse("a.b.ASC"),
            Err(OrderParseError::Malformed("a.b.ASC".into()))
        );
        assert_eq!(
            OrderSpec::parse("created_at.UP"),
            Err(OrderParseError::InvalidDirection("UP".into()))
        );
        assert_eq!(
            OrderSpec::parse("1abc.ASC"),
            Err(OrderParseError::InvalidIdentifier("1abc".into()))
        );
        assert_eq!(
            OrderSpec::parse("name; drop table x.ASC"),
            Err(OrderParseError::InvalidIdentifier("name; drop table x".into()))
        );
    }

    #[test]
    fn test_restrict_to_allowed_keys() {
        let allowed = ["created_at", "updated_at"];
        assert!(OrderSpec::parse("created_at.ASC").unwrap().restrict_to(&allowed).is_ok());
        assert_eq!(
            OrderSpec::parse("venue.ASC").unwrap().restrict_to(&allowed),
            Err(OrderParseError::UnknownKey("venue".into()))
        );
    }

    #[test]
    fn test_inverted_and_default() {
        let spec = OrderSpec::new()
            .with("created_at", SortDirection::Asc)
            .with("name", SortDirection::Desc);
        assert_eq!(spec.inverted().to_string(), "created_at.DESC,name.ASC");

        let default = OrderSpec::new().with("datetime_start", SortDirection::Asc);
        assert_eq!(OrderSpec::new().or_default(default.clone()), default);
        assert_eq!(spec.clone().or_default(default), spec);
    }
}
