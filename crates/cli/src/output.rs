use crate::error::CliError;
use model::{core::value::Value, pagination::cursor::Cursor};
use serde::Serialize;
use serde_json::{Map, json};

#[derive(Debug, Serialize)]
pub struct PlanReport {
    pub dialect: String,
    pub direction: String,
    pub take: i64,
    pub sql: String,
    pub params: Vec<serde_json::Value>,
}

impl PlanReport {
    pub fn new(dialect: String, direction: String, take: i64, sql: String, params: &[Value]) -> Self {
        Self {
            dialect,
            direction,
            take,
            sql,
            params: params.iter().map(Value::to_json).collect(),
        }
    }
}

pub fn cursor_json(cursor: &Cursor) -> serde_json::Value {
    let keys: Map<_, _> = cursor
        .keys()
        .iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect();
    json!({
        "id": cursor.id(),
        "direction": cursor.direction().as_str(),
        "keys": keys,
    })
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
