use bigdecimal::{BigDecimal, ToPrimitive};
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use model::core::value::Value;
use rust_decimal::Decimal;
use std::error::Error;
use tokio_postgres::types::{IsNull, Json as PgJson, ToSql, Type, to_sql_checked};
use uuid::Uuid;

type BoxError = Box<dyn Error + Sync + Send>;

/// A bound parameter that adapts its wire encoding to the type Postgres
/// inferred for the placeholder.
///
/// Cursor values come back from the token as generic JSON scalars, so an
/// `Int` may have to be sent as `int4` and a `String` as `timestamptz`.
#[derive(Debug, Clone)]
pub struct PgParam(pub Value);

impl ToSql for PgParam {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match &self.0 {
            Value::Int(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 => (*v as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*v).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR => v.to_string().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Float(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::NUMERIC => Decimal::try_from(*v)?.to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Decimal(v) => decimal_to_sql(v, ty, out),
            Value::String(v) => string_to_sql(v, ty, out),
            Value::Boolean(v) => v.to_sql(ty, out),
            Value::Json(v) => PgJson(v).to_sql(ty, out),
            Value::Uuid(v) => v.to_sql(ty, out),
            Value::Date(v) => v.to_sql(ty, out),
            Value::Timestamp(v) => match *ty {
                Type::TIMESTAMP => v.naive_utc().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Null => Ok(IsNull::Yes),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn decimal_to_sql(v: &BigDecimal, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT4 | Type::FLOAT8 | Type::INT2 | Type::INT4 | Type::INT8 => {
            let value = if v.is_integer() {
                v.to_i64().map(Value::Int)
            } else {
                v.to_f64().map(Value::Float)
            };
            let value = value.ok_or_else(|| format!("decimal {v} does not fit {ty}"))?;
            PgParam(value).to_sql(ty, out)
        }
        Type::TEXT | Type::VARCHAR => v.to_string().to_sql(ty, out),
        _ => v.to_string().parse::<Decimal>()?.to_sql(ty, out),
    }
}

fn string_to_sql(v: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::TIMESTAMPTZ => DateTime::parse_from_rfc3339(v)?
            .with_timezone(&Utc)
            .to_sql(ty, out),
        Type::TIMESTAMP => v.parse::<NaiveDateTime>()?.to_sql(ty, out),
        Type::DATE => v.parse::<NaiveDate>()?.to_sql(ty, out),
        Type::UUID => Uuid::parse_str(v)?.to_sql(ty, out),
        Type::INT8 => v.parse::<i64>()?.to_sql(ty, out),
        Type::INT4 => v.parse::<i32>()?.to_sql(ty, out),
        Type::NUMERIC => v.parse::<Decimal>()?.to_sql(ty, out),
        _ => v.to_sql(ty, out),
    }
}

pub struct PgParamStore {
    pub params: Vec<PgParam>,
}

impl PgParamStore {
    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            params: values.into_iter().map(PgParam).collect(),
        }
    }

    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|param| param as &(dyn ToSql + Sync))
            .collect()
    }
}
