//! The Value type - a plain tree-shaped snapshot of state.
//!
//! Values are what scalar reads return, what the tree is imported from and
//! what `raw_state` hands back. They carry no identity: two equal maps are
//! indistinguishable, which is why the engine keeps containers in its own
//! arena and only materializes a `Value` on request.

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::path::as_index;
use crate::{Error, Path};

/// A tree-shaped value.
///
/// # Design Notes
///
/// - Uses `BTreeMap` for deterministic key order
/// - `Date` is an opaque leaf: never descended into, compared by timestamp
/// - Uses `i64` for integers; numbers compare across `Integer`/`Float`
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Absence of a value. Distinct from "property doesn't exist".
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// 64-bit floating point.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Point in time.
    Date(DateTime<Utc>),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// Key-value map with string keys.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Create an empty map.
    pub fn map() -> Self {
        Value::Map(BTreeMap::new())
    }

    /// Create an empty array.
    pub fn array() -> Self {
        Value::Array(Vec::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Whether this value is a container (map or array).
    pub fn is_container(&self) -> bool {
        self.is_map() || self.is_array()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Whether this value would be considered "truthy" as a query result.
    ///
    /// Only non-empty strings count; every other value means "no key".
    pub fn as_resource_key(&self) -> Option<&str> {
        self.as_str().filter(|s| !s.is_empty())
    }

    /// Get a direct child by property name.
    pub fn child(&self, prop: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(prop),
            Value::Array(arr) => arr.get(as_index(prop)?),
            _ => None,
        }
    }

    /// Get a reference to a nested value by path.
    ///
    /// Returns `None` if the path doesn't exist or can't be navigated
    /// (e.g., trying to index into a string).
    pub fn get(&self, path: &Path) -> Option<&Value> {
        let mut current = self;
        for component in path.iter() {
            current = current.child(component)?;
        }
        Some(current)
    }

    /// Look up a nested value, treating `length` on arrays as a property.
    ///
    /// This is the lookup the dependency tracker uses when comparing a
    /// recorded sub-path between two snapshots.
    pub fn lookup(&self, path: &Path) -> Option<Cow<'_, Value>> {
        let mut current = self;
        for (i, component) in path.iter().enumerate() {
            if let Value::Array(arr) = current {
                if component == "length" {
                    let length = Value::Integer(arr.len() as i64);
                    return (i == path.len() - 1).then_some(Cow::Owned(length));
                }
            }
            current = current.child(component)?;
        }
        Some(Cow::Borrowed(current))
    }

    /// Get a mutable reference to a nested value by path.
    pub fn get_mut(&mut self, path: &Path) -> Option<&mut Value> {
        let mut current = self;
        for component in path.iter() {
            current = match current {
                Value::Map(map) => map.get_mut(component)?,
                Value::Array(arr) => arr.get_mut(as_index(component)?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Set a value at a path, creating intermediate maps as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the path traverses through a non-container value
    /// (e.g., trying to set `foo.bar` when `foo` is a string).
    pub fn set(&mut self, path: &Path, value: Value) -> Result<(), Error> {
        let Some((last, parents)) = path.components().split_last() else {
            *self = value;
            return Ok(());
        };

        let mut current = self;
        for component in parents {
            current = match current {
                Value::Map(map) => map.entry(component.clone()).or_insert_with(Value::map),
                Value::Array(arr) => {
                    let index = array_index(component)?;
                    arr.get_mut(index).ok_or_else(|| Error::InvalidPath {
                        message: format!("array index {} out of bounds", index),
                    })?
                }
                _ => {
                    return Err(Error::InvalidPath {
                        message: format!("cannot navigate through non-container at '{}'", component),
                    });
                }
            };
        }

        match current {
            Value::Map(map) => {
                map.insert(last.clone(), value);
                Ok(())
            }
            Value::Array(arr) => {
                let index = array_index(last)?;
                if index < arr.len() {
                    arr[index] = value;
                } else if index == arr.len() {
                    arr.push(value);
                } else {
                    return Err(Error::InvalidPath {
                        message: format!("array index {} out of bounds", index),
                    });
                }
                Ok(())
            }
            _ => Err(Error::InvalidPath {
                message: format!("cannot set child '{}' on non-container value", last),
            }),
        }
    }

    /// Remove a value at a path, returning it if it existed.
    pub fn remove(&mut self, path: &Path) -> Result<Option<Value>, Error> {
        let Some(parent_path) = path.parent() else {
            return Ok(Some(std::mem::take(self)));
        };
        let Some(last) = path.last() else {
            return Ok(None);
        };

        match self.get_mut(&parent_path) {
            Some(Value::Map(map)) => Ok(map.remove(last)),
            Some(Value::Array(arr)) => {
                let index = array_index(last)?;
                if index < arr.len() {
                    Ok(Some(arr.remove(index)))
                } else {
                    Ok(None)
                }
            }
            _ => Ok(None),
        }
    }

    /// Same-value comparison for leaves.
    ///
    /// Numbers compare numerically across `Integer` and `Float`, `NaN` is the
    /// same as `NaN`, and `0.0` is not the same as `-0.0`. Containers are never
    /// the same value as anything: a fresh map assigned over an equal one is
    /// still a new object.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => {
                (a.is_nan() && b.is_nan())
                    || (a == b && a.is_sign_negative() == b.is_sign_negative())
            }
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
                *b == *a as f64 && !(*a == 0 && b.is_sign_negative())
            }
            (Value::Array(_), _) | (Value::Map(_), _) => false,
            (_, Value::Array(_)) | (_, Value::Map(_)) => false,
            (a, b) => a == b,
        }
    }

    /// Like [`Value::same_value`], except that `0.0` and `-0.0` are the same.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) if a == 0.0 && b == 0.0 => true,
            _ => self.same_value(other),
        }
    }
}

fn array_index(component: &str) -> Result<usize, Error> {
    as_index(component).ok_or_else(|| Error::InvalidPath {
        message: format!("invalid array index: {}", component),
    })
}

// Conversion from common types

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Date(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
