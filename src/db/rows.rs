//! Generic row → JSON conversion for tables whose columns are not modelled.

use serde_json::{Map, Value};
use sqlx::mysql::MySqlRow;
use sqlx::types::chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::{Column, Row, TypeInfo};
use tracing::debug;

/// Converts every column of `row` into a JSON object keyed by column name.
///
/// Integers and floats become numbers, text and `DECIMAL` strings, temporal
/// types their ISO-8601 text, `NULL` null. Columns of any other type are
/// emitted as null.
pub fn row_to_json(row: &MySqlRow) -> Map<String, Value> {
    row.columns()
        .iter()
        .map(|col| (col.name().to_owned(), column_value(row, col.ordinal())))
        .collect()
}

fn column_value(row: &MySqlRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
        return v.map_or(Value::Null, |t| Value::from(t.to_string()));
    }
    if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(idx) {
        return v.map_or(Value::Null, |d| Value::from(d.to_string()));
    }
    if let Ok(v) = row.try_get::<Option<NaiveTime>, _>(idx) {
        return v.map_or(Value::Null, |t| Value::from(t.to_string()));
    }

    let type_name = row.column(idx).type_info().name();
    if type_name == "DECIMAL" {
        // Sent as text on the wire; the type check is what rejects String.
        if let Ok(v) = row.try_get_unchecked::<Option<String>, _>(idx) {
            return v.map_or(Value::Null, Value::from);
        }
    }

    debug!(column = row.column(idx).name(), column_type = type_name, "column type not converted");
    Value::Null
}
