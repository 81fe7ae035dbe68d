use rusqlite::types::Value;
use serde_json::Value as JsonValue;

/// Converts a JSON value into something SQLite can bind.
///
/// Booleans become `0`/`1`, arrays and objects are stored as JSON text.
pub fn json_to_value(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(flag) => Value::Integer(i64::from(*flag)),
        JsonValue::Number(n) => n
            .as_i64()
            .map(Value::Integer)
            .unwrap_or_else(|| Value::Real(n.as_f64().unwrap_or_default())),
        JsonValue::String(text) => Value::Text(text.clone()),
        nested => Value::Text(nested.to_string()),
    }
}
