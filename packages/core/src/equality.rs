//! Equality strategies for deciding whether a watched value changed.

use crate::Value;

/// Decides whether two optional snapshots of the same location are
/// equivalent. `None` means the location does not exist.
pub trait Equivalence {
    fn equivalent(&self, previous: Option<&Value>, current: Option<&Value>) -> bool;
}

/// The default strategy.
///
/// - primitives: same-value (numbers compare across integer and float,
///   `NaN` equals `NaN`)
/// - dates: equal timestamps
/// - maps and arrays: deep structural equality
#[derive(Clone, Copy, Debug, Default)]
pub struct StructuralEquality;

impl Equivalence for StructuralEquality {
    fn equivalent(&self, previous: Option<&Value>, current: Option<&Value>) -> bool {
        match (previous, current) {
            (None, None) => true,
            (Some(a), Some(b)) => deep_equal(a, b),
            _ => false,
        }
    }
}

impl<F> Equivalence for F
where
    F: Fn(Option<&Value>, Option<&Value>) -> bool,
{
    fn equivalent(&self, previous: Option<&Value>, current: Option<&Value>) -> bool {
        self(previous, current)
    }
}

/// Deep structural equality of two values.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Map(a), Value::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|other| deep_equal(v, other)))
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Date(a), Value::Date(b)) => a.timestamp_millis() == b.timestamp_millis(),
        (a, b) => a.same_value_zero(b),
    }
}
