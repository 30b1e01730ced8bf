//! Row to JSON conversion.
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies a column (PostgreSQL) or a value (SQLite) into a
//!    logical category
//! 2. Database-specific decoders handle the actual value extraction
//!
//! PostgreSQL columns carry a static type, so classification uses the column's
//! type name. Array columns (`INT4[]`, `TEXT[]`, ...) are classified by their
//! element type and become JSON arrays. SQLite is dynamically typed; a column
//! declared `INTEGER` may hold text, so classification uses the storage class of
//! each individual value.

use crate::models::DatabaseType;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Money,
    Boolean,
    Text,
    Binary,
    Json,
    Uuid,
    Date,
    Time,
    TimeTz,
    Timestamp,
    TimestampTz,
    Interval,
    Oid,
    Network,
    Null,
    Unknown,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let upper = type_name.to_ascii_uppercase();

    match (db, upper.as_str()) {
        (_, "NULL") => TypeCategory::Null,
        (DatabaseType::PostgreSQL, "INT2" | "INT4" | "INT8") => TypeCategory::Integer,
        (DatabaseType::PostgreSQL, "FLOAT4" | "FLOAT8") => TypeCategory::Float,
        (DatabaseType::PostgreSQL, "NUMERIC") => TypeCategory::Decimal,
        (DatabaseType::PostgreSQL, "MONEY") => TypeCategory::Money,
        (DatabaseType::PostgreSQL, "BOOL") => TypeCategory::Boolean,
        (DatabaseType::PostgreSQL, "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" | "CITEXT") => {
            TypeCategory::Text
        }
        (DatabaseType::PostgreSQL, "BYTEA") => TypeCategory::Binary,
        (DatabaseType::PostgreSQL, "JSON" | "JSONB") => TypeCategory::Json,
        (DatabaseType::PostgreSQL, "UUID") => TypeCategory::Uuid,
        (DatabaseType::PostgreSQL, "DATE") => TypeCategory::Date,
        (DatabaseType::PostgreSQL, "TIME") => TypeCategory::Time,
        (DatabaseType::PostgreSQL, "TIMETZ") => TypeCategory::TimeTz,
        (DatabaseType::PostgreSQL, "TIMESTAMP") => TypeCategory::Timestamp,
        (DatabaseType::PostgreSQL, "TIMESTAMPTZ") => TypeCategory::TimestampTz,
        (DatabaseType::PostgreSQL, "INTERVAL") => TypeCategory::Interval,
        // reg* aliases share oid's 4-byte wire format
        (
            DatabaseType::PostgreSQL,
            "OID" | "REGCLASS" | "REGTYPE" | "REGPROC" | "REGPROCEDURE" | "REGOPER"
            | "REGOPERATOR" | "REGNAMESPACE" | "REGROLE" | "REGCONFIG" | "REGDICTIONARY",
        ) => TypeCategory::Oid,
        (DatabaseType::PostgreSQL, "INET" | "CIDR") => TypeCategory::Network,
        // SQLite storage classes
        (DatabaseType::SQLite, "INTEGER" | "INT4" | "INT8") => TypeCategory::Integer,
        (DatabaseType::SQLite, "REAL") => TypeCategory::Float,
        (DatabaseType::SQLite, "TEXT") => TypeCategory::Text,
        (DatabaseType::SQLite, "BLOB") => TypeCategory::Binary,
        (DatabaseType::SQLite, "BOOLEAN") => TypeCategory::Boolean,
        _ => TypeCategory::Unknown,
    }
}

// =============================================================================
// Binary Encoding
// =============================================================================

/// Decode binary data to JSON value: UTF-8 text when valid, base64 otherwise.
pub fn decode_binary_value(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) => JsonValue::String(s.to_string()),
        Err(_) => JsonValue::String(STANDARD.encode(bytes)),
    }
}

fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

/// Render an interval the way PostgreSQL's default `IntervalStyle` prints it,
/// e.g. `1 year 2 mons`, `3 days 04:05:06.5`, `-1 days +01:00:00`.
pub fn format_interval(months: i32, days: i32, microseconds: i64) -> String {
    let mut out = String::new();
    // Set while the previous printed field was negative; a positive field
    // after it gets an explicit `+`.
    let mut after_negative = false;

    for (value, unit) in [
        (i64::from(months / 12), "year"),
        (i64::from(months % 12), "mon"),
        (i64::from(days), "day"),
    ] {
        if value == 0 {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        if after_negative && value > 0 {
            out.push('+');
        }
        let plural = if value == 1 { "" } else { "s" };
        out.push_str(&format!("{value} {unit}{plural}"));
        after_negative = value < 0;
    }

    if out.is_empty() || microseconds != 0 {
        let sign = if microseconds < 0 {
            "-"
        } else if after_negative {
            "+"
        } else {
            ""
        };
        let abs = microseconds.unsigned_abs();
        let hours = abs / 3_600_000_000;
        let minutes = abs / 60_000_000 % 60;
        let seconds = abs / 1_000_000 % 60;
        let fraction = abs % 1_000_000;

        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&format!("{sign}{hours:02}:{minutes:02}:{seconds:02}"));
        if fraction != 0 {
            let digits = format!("{fraction:06}");
            out.push('.');
            out.push_str(digits.trim_end_matches('0'));
        }
    }

    out
}

// =============================================================================
// Row to JSON Trait
// =============================================================================

/// Trait for converting database rows to JSON maps.
pub trait RowToJson {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue>;
}

impl RowToJson for PgRow {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name().to_ascii_uppercase();
                let value = match type_name.strip_suffix("[]") {
                    Some(element) => postgres::decode_array(self, idx, element),
                    None => postgres::decode_column(self, idx, &type_name),
                };
                (col.name().to_string(), value)
            })
            .collect()
    }
}

impl RowToJson for SqliteRow {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let declared = col.type_info().name();
                let value = sqlite::decode_column(self, idx, declared);
                (col.name().to_string(), value)
            })
            .collect()
    }
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod postgres {
    use super::*;
    use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
    use sqlx::postgres::PgHasArrayType;
    use sqlx::postgres::types::{Oid, PgInterval, PgMoney, PgTimeTz};
    use sqlx::types::Decimal;
    use sqlx::types::ipnetwork::IpNetwork;
    use sqlx::{Decode, Postgres, Type};

    /// Decode a scalar column. `type_name` is upper-case.
    pub fn decode_column(row: &PgRow, idx: usize, type_name: &str) -> JsonValue {
        match categorize_type(type_name, DatabaseType::PostgreSQL) {
            TypeCategory::Integer => match type_name {
                "INT2" => decode_with(row, idx, |v: i16| JsonValue::from(v)),
                "INT4" => decode_with(row, idx, |v: i32| JsonValue::from(v)),
                _ => decode_with(row, idx, |v: i64| JsonValue::from(v)),
            },
            TypeCategory::Float => match type_name {
                "FLOAT4" => decode_with(row, idx, |v: f32| float_value(f64::from(v))),
                _ => decode_with(row, idx, float_value),
            },
            TypeCategory::Decimal => decode_with(row, idx, decimal_value),
            TypeCategory::Money => decode_with(row, idx, money_value),
            TypeCategory::Boolean => decode_with(row, idx, JsonValue::Bool),
            TypeCategory::Binary => decode_with(row, idx, |v: Vec<u8>| decode_binary_value(&v)),
            TypeCategory::Json => decode_with(row, idx, |v: JsonValue| v),
            TypeCategory::Uuid => decode_with(row, idx, display_value::<uuid::Uuid>),
            TypeCategory::Date => decode_with(row, idx, display_value::<NaiveDate>),
            TypeCategory::Time => decode_with(row, idx, display_value::<NaiveTime>),
            TypeCategory::TimeTz => {
                decode_with(row, idx, |v: PgTimeTz<NaiveTime, FixedOffset>| {
                    JsonValue::String(format!("{}{}", v.time, v.offset))
                })
            }
            TypeCategory::Timestamp => decode_with(row, idx, display_value::<NaiveDateTime>),
            TypeCategory::TimestampTz => {
                decode_with(row, idx, |v: DateTime<Utc>| JsonValue::String(v.to_rfc3339()))
            }
            TypeCategory::Interval => decode_with(row, idx, interval_value),
            TypeCategory::Oid => decode_oid(row, idx),
            TypeCategory::Network => {
                let is_cidr = type_name == "CIDR";
                decode_with(row, idx, |v: IpNetwork| network_value(v, is_cidr))
            }
            TypeCategory::Null => JsonValue::Null,
            TypeCategory::Text | TypeCategory::Unknown => decode_text(row, idx, type_name),
        }
    }

    /// Decode a one-dimensional array column into a JSON array. `element` is
    /// the upper-case element type name.
    pub fn decode_array(row: &PgRow, idx: usize, element: &str) -> JsonValue {
        match categorize_type(element, DatabaseType::PostgreSQL) {
            TypeCategory::Integer => match element {
                "INT2" => decode_array_with(row, idx, |v: i16| JsonValue::from(v)),
                "INT4" => decode_array_with(row, idx, |v: i32| JsonValue::from(v)),
                _ => decode_array_with(row, idx, |v: i64| JsonValue::from(v)),
            },
            TypeCategory::Float => match element {
                "FLOAT4" => decode_array_with(row, idx, |v: f32| float_value(f64::from(v))),
                _ => decode_array_with(row, idx, float_value),
            },
            TypeCategory::Decimal => decode_array_with(row, idx, decimal_value),
            TypeCategory::Boolean => decode_array_with(row, idx, JsonValue::Bool),
            TypeCategory::Text => decode_array_with(row, idx, JsonValue::String),
            TypeCategory::Uuid => decode_array_with(row, idx, display_value::<uuid::Uuid>),
            TypeCategory::Date => decode_array_with(row, idx, display_value::<NaiveDate>),
            TypeCategory::Time => decode_array_with(row, idx, display_value::<NaiveTime>),
            TypeCategory::Timestamp => {
                decode_array_with(row, idx, display_value::<NaiveDateTime>)
            }
            TypeCategory::TimestampTz => {
                decode_array_with(row, idx, |v: DateTime<Utc>| JsonValue::String(v.to_rfc3339()))
            }
            TypeCategory::Interval => decode_array_with(row, idx, interval_value),
            TypeCategory::Oid if element == "OID" => {
                decode_array_with(row, idx, |v: Oid| JsonValue::from(v.0))
            }
            TypeCategory::Network => {
                let is_cidr = element == "CIDR";
                decode_array_with(row, idx, |v: IpNetwork| network_value(v, is_cidr))
            }
            _ => {
                tracing::debug!(element, "Unsupported array element type, returning null");
                JsonValue::Null
            }
        }
    }

    fn decode_with<T>(row: &PgRow, idx: usize, to_json: impl Fn(T) -> JsonValue) -> JsonValue
    where
        T: for<'r> Decode<'r, Postgres> + Type<Postgres>,
    {
        match row.try_get::<Option<T>, _>(idx) {
            Ok(Some(v)) => to_json(v),
            Ok(None) => JsonValue::Null,
            Err(e) => {
                tracing::debug!(error = %e, "Could not decode column, returning null");
                JsonValue::Null
            }
        }
    }

    fn decode_array_with<T>(
        row: &PgRow,
        idx: usize,
        to_json: impl Fn(T) -> JsonValue,
    ) -> JsonValue
    where
        T: for<'r> Decode<'r, Postgres> + Type<Postgres> + PgHasArrayType,
    {
        match row.try_get::<Option<Vec<Option<T>>>, _>(idx) {
            Ok(Some(items)) => JsonValue::Array(
                items
                    .into_iter()
                    .map(|item| item.map(&to_json).unwrap_or(JsonValue::Null))
                    .collect(),
            ),
            Ok(None) => JsonValue::Null,
            Err(e) => {
                tracing::debug!(error = %e, "Could not decode array column, returning null");
                JsonValue::Null
            }
        }
    }

    /// `oid` itself decodes checked; the reg* aliases have other type oids.
    fn decode_oid(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get_unchecked::<Option<Oid>, _>(idx)
            .ok()
            .flatten()
            .map(|v| JsonValue::from(v.0))
            .unwrap_or(JsonValue::Null)
    }

    fn display_value<T: std::fmt::Display>(v: T) -> JsonValue {
        JsonValue::String(v.to_string())
    }

    /// Exact decimal text, scale preserved (`avg()` keeps its trailing zeros).
    fn decimal_value(v: Decimal) -> JsonValue {
        JsonValue::String(v.to_string())
    }

    fn money_value(v: PgMoney) -> JsonValue {
        decimal_value(v.to_decimal(2))
    }

    fn interval_value(v: PgInterval) -> JsonValue {
        JsonValue::String(format_interval(v.months, v.days, v.microseconds))
    }

    /// `inet` host addresses print without a prefix, as PostgreSQL does.
    pub(super) fn network_value(net: IpNetwork, is_cidr: bool) -> JsonValue {
        let host_prefix = if net.is_ipv4() { 32 } else { 128 };
        if !is_cidr && net.prefix() == host_prefix {
            JsonValue::String(net.ip().to_string())
        } else {
            JsonValue::String(format!("{}/{}", net.ip(), net.prefix()))
        }
    }

    /// Text and text-like types. Domains over text (e.g. information_schema's
    /// `sql_identifier`) and enums fail the checked decode; they are read
    /// unchecked and kept only when the bytes are printable text.
    fn decode_text(row: &PgRow, idx: usize, type_name: &str) -> JsonValue {
        match row.try_get::<Option<String>, _>(idx) {
            Ok(Some(v)) => return JsonValue::String(v),
            Ok(None) => return JsonValue::Null,
            Err(_) => {}
        }
        match row.try_get_unchecked::<Option<String>, _>(idx) {
            Ok(Some(v)) if is_printable(&v) => JsonValue::String(v),
            Ok(Some(_)) => {
                tracing::debug!(type_name, "Unsupported column type, returning null");
                JsonValue::Null
            }
            Ok(None) => JsonValue::Null,
            Err(e) => {
                tracing::debug!(type_name, error = %e, "Unsupported column type, returning null");
                JsonValue::Null
            }
        }
    }

    fn is_printable(s: &str) -> bool {
        !s.chars()
            .any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
    }
}

mod sqlite {
    use super::*;

    /// Decode by the value's storage class; the declared column type only
    /// refines integers declared BOOLEAN and text declared JSON.
    pub fn decode_column(row: &SqliteRow, idx: usize, declared: &str) -> JsonValue {
        let storage = match row.try_get_raw(idx) {
            Ok(raw) if raw.is_null() => return JsonValue::Null,
            Ok(raw) => raw.type_info().name().to_string(),
            Err(e) => {
                tracing::error!("Failed to read SQLite value: {:?}", e);
                return JsonValue::Null;
            }
        };
        let declared = declared.to_ascii_lowercase();

        match categorize_type(&storage, DatabaseType::SQLite) {
            TypeCategory::Integer if declared.contains("bool") => decode_boolean(row, idx),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => decode_boolean(row, idx),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => decode_binary_col(row, idx),
            _ => decode_text(row, idx, &declared),
        }
    }

    fn decode_integer(row: &SqliteRow, idx: usize) -> JsonValue {
        row.try_get_unchecked::<Option<i64>, _>(idx)
            .ok()
            .flatten()
            .map(|v| JsonValue::Number(v.into()))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_boolean(row: &SqliteRow, idx: usize) -> JsonValue {
        row.try_get_unchecked::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(JsonValue::Bool)
            .unwrap_or(JsonValue::Null)
    }

    fn decode_float(row: &SqliteRow, idx: usize) -> JsonValue {
        row.try_get_unchecked::<Option<f64>, _>(idx)
            .ok()
            .flatten()
            .map(float_value)
            .unwrap_or(JsonValue::Null)
    }

    fn decode_binary_col(row: &SqliteRow, idx: usize) -> JsonValue {
        row.try_get_unchecked::<Option<Vec<u8>>, _>(idx)
            .ok()
            .flatten()
            .map(|v| decode_binary_value(&v))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_text(row: &SqliteRow, idx: usize, declared: &str) -> JsonValue {
        if let Ok(Some(v)) = row.try_get_unchecked::<Option<String>, _>(idx) {
            if declared.contains("json") {
                if let Ok(json) = serde_json::from_str::<JsonValue>(&v) {
                    return json;
                }
            }
            return JsonValue::String(v);
        }
        JsonValue::Null
    }
}
