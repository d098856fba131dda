//! Conversions between Value and serde types.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{Error, Value};

/// Convert a Value to a Rust type via serde.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, Error> {
    let json = value_to_json(value);
    serde_json::from_value(json).map_err(|e| Error::decode(e.to_string()))
}

/// Convert a Rust type to a Value via serde.
pub fn to_value<T: Serialize>(data: &T) -> Result<Value, Error> {
    let json = serde_json::to_value(data).map_err(|e| Error::encode(e.to_string()))?;
    Ok(json_to_value(json))
}

/// Convert our Value to serde_json::Value.
///
/// Dates become RFC 3339 strings; non-finite floats become `null`.
pub fn value_to_json(value: Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(b),
        Value::Integer(i) => serde_json::Value::Number(i.into()),
        Value::Float(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s),
        Value::Date(d) => serde_json::Value::String(d.to_rfc3339()),
        Value::Array(arr) => serde_json::Value::Array(arr.into_iter().map(value_to_json).collect()),
        Value::Map(map) => serde_json::Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, value_to_json(v)))
                .collect(),
        ),
    }
}

/// Convert serde_json::Value to our Value.
pub fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (k, json_to_value(v)))
                .collect(),
        ),
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        json_to_value(json)
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        value_to_json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        name: String,
        age: u32,
        active: bool,
    }

    #[test]
    fn roundtrip_struct() {
        let original = User {
            name: "Joel".to_string(),
            age: 30,
            active: true,
        };

        let value = to_value(&original).unwrap();
        let recovered: User = from_value(value).unwrap();

        assert_eq!(original, recovered);
    }

    #[test]
    fn json_to_value_numbers() {
        let value = json_to_value(serde_json::json!({
            "integer": 42,
            "float": 2.75,
            "negative": -100
        }));

        let map = value.as_map().unwrap();
        assert_eq!(map.get("integer"), Some(&Value::Integer(42)));
        assert_eq!(map.get("negative"), Some(&Value::Integer(-100)));
        assert_eq!(map.get("float"), Some(&Value::Float(2.75)));
    }

    #[test]
    fn value_to_json_nan_becomes_null() {
        assert_eq!(value_to_json(Value::Float(f64::NAN)), serde_json::Value::Null);
    }

    #[test]
    fn dates_serialize_as_rfc3339() {
        let date = chrono::Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        let json = value_to_json(Value::Date(date));
        assert_eq!(json, serde_json::json!("2020-01-02T03:04:05+00:00"));
    }

    #[test]
    fn nested_json_becomes_nested_value() {
        let value: Value = serde_json::json!({"user": {"tags": ["a", "b"]}}).into();
        assert_eq!(
            value.get(&crate::path!("user.tags.1")),
            Some(&Value::from("b"))
        );
    }

    #[test]
    fn from_value_error() {
        let value = Value::String("not a struct".to_string());
        let result: Result<User, _> = from_value(value);
        assert!(matches!(result, Err(Error::Decode { .. })));
    }
}
