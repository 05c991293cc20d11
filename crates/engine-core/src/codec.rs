//! Opaque cursor tokens.
//!
//! A token is the URL-safe, unpadded base64 encoding of a compact JSON
//! object: `{"direction": "forward"|"backward", "id": <int>, <key>: <value>...}`.
//! JSON-native values are written as-is; decimals, timestamps, dates, UUIDs and nested
//! JSON are written in their tagged form (`{"Timestamp": "..."}`) so they
//! decode back to the same `Value` variant.

use crate::config::{DEFAULT_MAX_CURSOR_LEN, DEFAULT_TIEBREAKER, PaginatorConfig};
use base64::{
    Engine as _, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use model::{
    core::value::Value,
    pagination::cursor::{Cursor, CursorDirection},
    records::row::RowData,
};
use serde_json::{Map, Value as Json, json};
use thiserror::Error;

const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const ID_FIELD: &str = "id";
const DIRECTION_FIELD: &str = "direction";

/// Variant tags accepted for values JSON cannot represent natively.
const TAGGED_VARIANTS: [&str; 5] = ["Decimal", "Timestamp", "Date", "Uuid", "Json"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    #[error("cursor token is empty")]
    Empty,

    #[error("cursor token is {len} bytes, the limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("cursor token is not valid base64: {0}")]
    Encoding(String),

    #[error("cursor payload is not valid JSON: {0}")]
    Payload(String),

    #[error("cursor payload is not a JSON object")]
    NotAnObject,

    #[error("cursor has no 'id'")]
    MissingId,

    #[error("cursor 'id' is not an integer: {0}")]
    InvalidId(String),

    #[error("cursor has no 'direction'")]
    MissingDirection,

    #[error("cursor 'direction' must be \"forward\" or \"backward\", got {0}")]
    InvalidDirection(String),
}

#[derive(Debug, Clone)]
pub struct CursorCodec {
    tiebreaker: String,
    max_len: usize,
}

impl Default for CursorCodec {
    fn default() -> Self {
        Self::new(DEFAULT_TIEBREAKER, DEFAULT_MAX_CURSOR_LEN)
    }
}

impl CursorCodec {
    pub fn new(tiebreaker: &str, max_len: usize) -> Self {
        Self {
            tiebreaker: tiebreaker.to_string(),
            max_len,
        }
    }

    pub fn from_config(config: &PaginatorConfig) -> Self {
        Self::new(&config.tiebreaker, config.max_cursor_len)
    }

    pub fn tiebreaker(&self) -> &str {
        &self.tiebreaker
    }

    pub fn encode(&self, cursor: &Cursor) -> String {
        let mut payload = Map::new();
        for (key, value) in cursor.keys() {
            payload.insert(key.clone(), value_to_json(value));
        }
        // Envelope fields win over same-named sort keys.
        payload.insert(ID_FIELD.to_string(), Json::from(cursor.id()));
        payload.insert(
            DIRECTION_FIELD.to_string(),
            Json::from(cursor.direction().as_str()),
        );

        TOKEN_ENGINE.encode(Json::Object(payload).to_string())
    }

    /// Encodes the boundary `row` with only `order_keys` and the tie-breaker.
    ///
    /// Returns `None` when the row has no integer tie-breaker value.
    pub fn encode_row<'a, I>(
        &self,
        row: &RowData,
        order_keys: I,
        direction: CursorDirection,
    ) -> Option<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        Cursor::from_row(row, order_keys, &self.tiebreaker, direction)
            .map(|cursor| self.encode(&cursor))
    }

    pub fn decode(&self, token: &str) -> Result<Cursor, CursorError> {
        if token.is_empty() {
            return Err(CursorError::Empty);
        }
        if token.len() > self.max_len {
            return Err(CursorError::TooLong {
                len: token.len(),
                max: self.max_len,
            });
        }

        let bytes = TOKEN_ENGINE
            .decode(token)
            .map_err(|e| CursorError::Encoding(e.to_string()))?;
        let payload: Json =
            serde_json::from_slice(&bytes).map_err(|e| CursorError::Payload(e.to_string()))?;
        let Json::Object(mut fields) = payload else {
            return Err(CursorError::NotAnObject);
        };

        let id = fields.remove(ID_FIELD).ok_or(CursorError::MissingId)?;
        let id = value_from_json(id.clone())
            .as_i64()
            .ok_or_else(|| CursorError::InvalidId(id.to_string()))?;

        let direction = fields
            .remove(DIRECTION_FIELD)
            .ok_or(CursorError::MissingDirection)?;
        let direction = direction
            .as_str()
            .and_then(|tag| tag.parse::<CursorDirection>().ok())
            .ok_or_else(|| CursorError::InvalidDirection(direction.to_string()))?;

        let keys = fields
            .into_iter()
            .map(|(key, value)| (key, value_from_json(value)))
            .collect();

        Ok(Cursor::new(id, direction, keys))
    }
}

fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Int(v) => Json::from(*v),
        Value::Float(v) => serde_json::Number::from_f64(*v).map_or(Json::Null, Json::Number),
        Value::Decimal(v) => json!({ "Decimal": v.to_string() }),
        Value::String(v) => Json::from(v.as_str()),
        Value::Boolean(v) => Json::from(*v),
        Value::Null => Json::Null,
        Value::Timestamp(v) => json!({ "Timestamp": v.to_rfc3339() }),
        Value::Date(v) => json!({ "Date": v.to_string() }),
        Value::Uuid(v) => json!({ "Uuid": v.to_string() }),
        Value::Json(v) => json!({ "Json": v }),
    }
}

fn value_from_json(json: Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(v) => Value::Boolean(v),
        Json::Number(n) => match n.as_i64() {
            Some(v) => Value::Int(v),
            None => n.as_f64().map_or(Value::Null, Value::Float),
        },
        Json::String(v) => Value::String(v),
        Json::Object(fields) if is_tagged(&fields) => {
            let object = Json::Object(fields);
            serde_json::from_value(object.clone()).unwrap_or(Value::Json(object))
        }
        other => Value::Json(other),
    }
}

fn is_tagged(fields: &Map<String, Json>) -> bool {
    fields.len() == 1
        && fields
            .keys()
            .next()
            .is_some_and(|tag| TAGGED_VARIANTS.contains(&tag.as_str()))
}
