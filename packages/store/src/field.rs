//! The input tree: what gets written into a store.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde::Serialize;
use statetree_core::{to_value, Value};

use crate::definition::{Accessor, Action, Query};
use crate::error::Error;
use crate::resource::Pending;

/// A value to be stored: plain data, containers, or definitions.
///
/// Containers are imported into the tree as addressable nodes; every other
/// variant becomes a leaf.
#[derive(Clone, Debug)]
pub enum Field {
    /// Plain data. Maps and arrays inside are imported as containers.
    Value(Value),
    Map(BTreeMap<String, Field>),
    List(Vec<Field>),
    Accessor(Rc<Accessor>),
    Query(Rc<Query>),
    Action(Rc<Action>),
    Deferred(Pending),
    /// A subtree that is frozen as it is imported.
    Frozen(Box<Field>),
}

impl Field {
    /// A map field from `(key, field)` pairs.
    pub fn map<K, F, I>(entries: I) -> Self
    where
        K: Into<String>,
        F: Into<Field>,
        I: IntoIterator<Item = (K, F)>,
    {
        Field::Map(
            entries
                .into_iter()
                .map(|(k, f)| (k.into(), f.into()))
                .collect(),
        )
    }

    /// A list field.
    pub fn list<F, I>(items: I) -> Self
    where
        F: Into<Field>,
        I: IntoIterator<Item = F>,
    {
        Field::List(items.into_iter().map(Into::into).collect())
    }

    /// An empty map.
    pub fn empty_map() -> Self {
        Field::Map(BTreeMap::new())
    }

    /// Any serializable value.
    pub fn serialize<T: Serialize>(data: &T) -> Result<Self, Error> {
        Ok(Field::Value(to_value(data)?))
    }

    /// Mark this subtree as frozen.
    #[must_use]
    pub fn frozen(self) -> Self {
        match self {
            Field::Frozen(_) => self,
            other => Field::Frozen(Box::new(other)),
        }
    }

    /// Whether this field is a map (the only thing that can be merged).
    pub fn is_map(&self) -> bool {
        match self {
            Field::Map(_) => true,
            Field::Value(v) => v.is_map(),
            Field::Frozen(inner) => inner.is_map(),
            _ => false,
        }
    }

    /// Whether this field imports as a container.
    pub fn is_container(&self) -> bool {
        match self {
            Field::Map(_) | Field::List(_) => true,
            Field::Value(v) => v.is_container(),
            Field::Frozen(inner) => inner.is_container(),
            _ => false,
        }
    }

    /// Entries of a map field. Anything else (including a frozen map) is
    /// handed back unchanged.
    pub(crate) fn into_entries(self) -> Result<BTreeMap<String, Field>, Field> {
        match self {
            Field::Map(entries) => Ok(entries),
            Field::Value(Value::Map(map)) => Ok(map
                .into_iter()
                .map(|(k, v)| (k, Field::Value(v)))
                .collect()),
            other => Err(other),
        }
    }

    /// A plain snapshot of this field. Definitions read as `null`; a settled
    /// deferred value reads as its value.
    pub fn to_value(&self) -> Value {
        match self {
            Field::Value(v) => v.clone(),
            Field::Map(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(k, f)| (k.clone(), f.to_value()))
                    .collect(),
            ),
            Field::List(items) => Value::Array(items.iter().map(Field::to_value).collect()),
            Field::Deferred(pending) => match pending.peek() {
                Some(Ok(Some(v))) => v.clone(),
                _ => Value::Null,
            },
            Field::Frozen(inner) => inner.to_value(),
            Field::Accessor(_) | Field::Query(_) | Field::Action(_) => Value::Null,
        }
    }

    /// Every map key in this field, recursively.
    pub(crate) fn keys(&self) -> Vec<&str> {
        let mut keys = Vec::new();
        self.collect_keys(&mut keys);
        keys
    }

    fn collect_keys<'a>(&'a self, keys: &mut Vec<&'a str>) {
        match self {
            Field::Map(entries) => {
                for (k, f) in entries {
                    keys.push(k);
                    f.collect_keys(keys);
                }
            }
            Field::List(items) => items.iter().for_each(|f| f.collect_keys(keys)),
            Field::Frozen(inner) => inner.collect_keys(keys),
            Field::Value(v) => collect_value_keys(v, keys),
            _ => {}
        }
    }
}

fn collect_value_keys<'a>(value: &'a Value, keys: &mut Vec<&'a str>) {
    match value {
        Value::Map(map) => {
            for (k, v) in map {
                keys.push(k);
                collect_value_keys(v, keys);
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_value_keys(v, keys)),
        _ => {}
    }
}

impl Default for Field {
    fn default() -> Self {
        Field::Value(Value::Null)
    }
}

impl From<Value> for Field {
    fn from(v: Value) -> Self {
        Field::Value(v)
    }
}

impl From<serde_json::Value> for Field {
    fn from(v: serde_json::Value) -> Self {
        Field::Value(v.into())
    }
}

impl From<Vec<Field>> for Field {
    fn from(v: Vec<Field>) -> Self {
        Field::List(v)
    }
}

impl From<BTreeMap<String, Field>> for Field {
    fn from(v: BTreeMap<String, Field>) -> Self {
        Field::Map(v)
    }
}

macro_rules! scalar_fields {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Field {
                fn from(v: $ty) -> Self {
                    Field::Value(Value::from(v))
                }
            }
        )*
    };
}

scalar_fields!(bool, i32, i64, u32, usize, f64, String, &str);

impl<T: Into<Field>> From<Option<T>> for Field {
    fn from(v: Option<T>) -> Self {
        v.map_or_else(Field::default, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_builder() {
        let field = Field::map([("count", Field::from(0)), ("name", "Joel".into())]);
        assert!(field.is_map());
        assert_eq!(
            field.to_value(),
            serde_json::json!({"count": 0, "name": "Joel"}).into()
        );
    }

    #[test]
    fn frozen_is_idempotent() {
        let field = Field::from(Value::map()).frozen().frozen();
        match field {
            Field::Frozen(inner) => assert!(matches!(*inner, Field::Value(_))),
            other => panic!("expected frozen, got {:?}", other),
        }
    }

    #[test]
    fn keys_are_collected_recursively() {
        let field = Field::map([
            ("a", Field::from(serde_json::json!({"b": [{"c": 1}]}))),
            ("d", Field::list([Field::map([("e", 1)])])),
        ]);
        let mut keys = field.keys();
        keys.sort_unstable();
        assert_eq!(keys, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn containers_detected_through_values() {
        assert!(Field::from(serde_json::json!([1, 2])).is_container());
        assert!(!Field::from(1).is_container());
        assert!(!Field::from(serde_json::json!([1])).is_map());
    }
}
