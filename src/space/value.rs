//! Literal parameter values.
//!
//! A sampled hyperparameter is always one of a small set of basic scalar
//! types. `ParamValue` is the typed form used throughout the engine; the
//! persisted document form uses plain JSON scalars.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A literal value a parameter can take.
///
/// Comparison is numeric across kinds: `Int(7)` equals `Float(7.0)`, matching
/// the loose comparisons configurations are subjected to after a round-trip
/// through a persisted document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean flag
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating-point number
    Float(f64),
    /// String label
    Str(String),
}

impl ParamValue {
    /// Numeric view of this value, if it is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view of this value, if it is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// String view of this value, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// True for `Int` and `Float` values.
    pub fn is_number(&self) -> bool {
        matches!(self, ParamValue::Int(_) | ParamValue::Float(_))
    }

    /// Convert to the JSON scalar used in persisted documents.
    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Bool(b) => Value::Bool(*b),
            ParamValue::Int(v) => Value::from(*v),
            ParamValue::Float(v) => Value::from(*v),
            ParamValue::Str(s) => Value::String(s.clone()),
        }
    }

    /// Read a JSON scalar back into a typed value.
    ///
    /// Returns `None` for nulls, arrays and objects: those are structure, not
    /// parameter literals.
    pub fn from_json(value: &Value) -> Option<ParamValue> {
        match value {
            Value::Bool(b) => Some(ParamValue::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(ParamValue::Int(i))
                } else {
                    n.as_f64().map(ParamValue::Float)
                }
            }
            Value::String(s) => Some(ParamValue::Str(s.clone())),
            _ => None,
        }
    }
}

impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        use ParamValue::*;
        match (self, other) {
            (Bool(a), Bool(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Int(a), Float(b)) | (Float(b), Int(a)) => *a as f64 == *b,
            _ => false,
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cross_kind_numeric_equality() {
        assert_eq!(ParamValue::Int(7), ParamValue::Float(7.0));
        assert_eq!(ParamValue::Float(7.0), ParamValue::Int(7));
        assert_ne!(ParamValue::Int(7), ParamValue::Float(7.5));
        assert_ne!(ParamValue::Int(1), ParamValue::Bool(true));
        assert_ne!(ParamValue::Str("7".into()), ParamValue::Int(7));
    }

    #[test]
    fn test_json_round_trip() {
        for v in [
            ParamValue::Bool(true),
            ParamValue::Int(-3),
            ParamValue::Float(2.25),
            ParamValue::Str("adam".into()),
        ] {
            let back = ParamValue::from_json(&v.to_json()).unwrap();
            assert_eq!(back, v);
        }
    }

    #[test]
    fn test_structure_is_not_a_literal() {
        assert!(ParamValue::from_json(&json!(null)).is_none());
        assert!(ParamValue::from_json(&json!([1, 2])).is_none());
        assert!(ParamValue::from_json(&json!({"a": 1})).is_none());
    }

    #[test]
    fn test_integer_preserved_over_float() {
        let v = ParamValue::from_json(&json!(42)).unwrap();
        assert_eq!(v.as_i64(), Some(42));
        let v = ParamValue::from_json(&json!(42.5)).unwrap();
        assert_eq!(v.as_i64(), None);
        assert_eq!(v.as_f64(), Some(42.5));
    }
}
