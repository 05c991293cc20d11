use crate::error::CliError;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use model::core::value::Value;

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect or forge cursor tokens
    Cursor {
        #[command(subcommand)]
        command: CursorCommand,
    },
    /// Print the SQL and parameters a page request would run, without running it
    Plan {
        #[command(flatten)]
        query: QueryArgs,

        /// SQL dialect: "pg" or "mysql"
        #[arg(long, default_value = "pg")]
        dialect: String,
    },
    /// Fetch one page from PostgreSQL and print the JSON envelope
    Page {
        #[arg(long, help = "Connection string, falls back to DATABASE_URL")]
        url: Option<String>,

        #[command(flatten)]
        query: QueryArgs,
    },
}

#[derive(Subcommand)]
pub enum CursorCommand {
    Decode {
        #[arg(help = "Cursor token")]
        token: String,
    },
    Encode {
        #[arg(long, help = "Tie-breaker value of the boundary row")]
        id: i64,

        #[arg(long, default_value = "forward", help = "forward or backward")]
        direction: String,

        /// Sort-key values as `column=value`, in order
        #[arg(long = "key")]
        keys: Vec<String>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    #[arg(long, help = "Table to list")]
    pub table: String,

    #[arg(long)]
    pub schema: Option<String>,

    #[arg(long, help = "Table alias used to qualify columns")]
    pub alias: Option<String>,

    #[arg(long, default_value = "", help = "Sort keys, e.g. created_at.DESC,name.ASC")]
    pub order: String,

    #[arg(long, help = "Page size, falls back to KEYSET_DEFAULT_TAKE")]
    pub take: Option<i64>,

    #[arg(long, help = "Cursor token from a previous page")]
    pub cursor: Option<String>,
}

/// Parses a `column=value` pair. Values are read as integers, floats,
/// booleans or RFC 3339 timestamps where possible, otherwise as strings.
pub fn parse_key(pair: &str) -> Result<(String, Value), CliError> {
    let (key, raw) = pair
        .split_once('=')
        .filter(|(key, _)| !key.trim().is_empty())
        .ok_or_else(|| CliError::InvalidArgument(format!("expected column=value, got '{pair}'")))?;
    Ok((key.trim().to_string(), parse_value(raw)))
}

fn parse_value(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if let Ok(v) = raw.parse::<i64>() {
        return Value::Int(v);
    }
    if let Ok(v) = raw.parse::<f64>() {
        return Value::Float(v);
    }
    if let Ok(v) = raw.parse::<bool>() {
        return Value::Boolean(v);
    }
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Value::Timestamp(ts.with_timezone(&Utc)),
        Err(_) => Value::String(raw.to_string()),
    }
}
