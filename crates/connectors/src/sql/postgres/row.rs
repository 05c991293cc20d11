use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use model::{
    core::value::Value,
    records::row::{FieldValue, RowData},
};
use rust_decimal::Decimal;
use tokio_postgres::{Row, types::Type};
use tracing::warn;
use uuid::Uuid;

pub fn to_row_data(row: &Row, table: &str) -> RowData {
    let field_values = row
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| FieldValue {
            name: column.name().to_string(),
            value: get_value(row, idx, column.type_()),
        })
        .collect();

    RowData::new(table, field_values)
}

/// Reads one column as a `Value`. `None` stands for SQL `NULL` and for
/// column types that have no `Value` counterpart.
fn get_value(row: &Row, idx: usize, ty: &Type) -> Option<Value> {
    match *ty {
        Type::INT2 => try_get::<i16>(row, idx).map(|v| Value::Int(v.into())),
        Type::INT4 => try_get::<i32>(row, idx).map(|v| Value::Int(v.into())),
        Type::INT8 => try_get::<i64>(row, idx).map(Value::Int),
        Type::FLOAT4 => try_get::<f32>(row, idx).map(|v| Value::Float(v.into())),
        Type::FLOAT8 => try_get::<f64>(row, idx).map(Value::Float),
        Type::NUMERIC => try_get::<Decimal>(row, idx)
            .and_then(|v| v.to_string().parse::<BigDecimal>().ok())
            .map(Value::Decimal),
        Type::BOOL => try_get::<bool>(row, idx).map(Value::Boolean),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            try_get::<String>(row, idx).map(Value::String)
        }
        Type::JSON | Type::JSONB => try_get::<serde_json::Value>(row, idx).map(Value::Json),
        Type::UUID => try_get::<Uuid>(row, idx).map(Value::Uuid),
        Type::DATE => try_get::<NaiveDate>(row, idx).map(Value::Date),
        Type::TIMESTAMPTZ => try_get::<DateTime<Utc>>(row, idx).map(Value::Timestamp),
        Type::TIMESTAMP => {
            try_get::<NaiveDateTime>(row, idx).map(|v| Value::Timestamp(v.and_utc()))
        }
        _ => {
            warn!("Unsupported column type: {}", ty.name());
            None
        }
    }
}

fn try_get<'a, T>(row: &'a Row, idx: usize) -> Option<T>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get::<_, Option<T>>(idx).ok().flatten()
}
