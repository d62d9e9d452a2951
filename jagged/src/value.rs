/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Host-side nested values.
//!
//! `Value` is what arrays are built from and what they convert back
//! into. It is untagged, so any serde format yields it directly:
//!
//! ```
//! # use jagged::Value;
//! let v: Value = serde_json::from_str(r#"[{"x": 1.1, "y": [1]}, null]"#).unwrap();
//! assert_eq!(v.to_string(), "[{x: 1.1, y: [1]}, None]");
//! ```

use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

use crate::buffer::Scalar;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    List(Vec<Value>),
    Record(IndexMap<String, Value>),
    /// Tuples serialize as lists, so they never come back as tuples.
    #[serde(skip_deserializing)]
    Tuple(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// A short name for the kind of value, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "None",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::List(_) => "list",
            Value::Record(_) => "dict",
            Value::Tuple(_) => "tuple",
        }
    }

    /// Build a record value from `(key, value)` pairs, keeping their
    /// order.
    pub fn record<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Bool(v) => Value::Bool(v),
            Scalar::UInt8(v) => Value::Int(v as i64),
            Scalar::Int64(v) => Value::Int(v),
            Scalar::Float64(v) => Value::Float(v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, open: &str, items: &[Value], close: &str) -> fmt::Result {
    write!(f, "{}", open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "{}", close)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::List(items) => write_seq(f, "[", items, "]"),
            Value::Tuple(items) => write_seq(f, "(", items, ")"),
            Value::Record(fields) => {
                write!(f, "{{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_json_keeps_field_order() {
        let v: Value = serde_json::from_value(json!({"z": 1, "a": [1.5, null]})).unwrap();
        let Value::Record(fields) = &v else {
            panic!("expected a record, got {:?}", v);
        };
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["z", "a"]);
        assert_eq!(fields["z"], Value::Int(1));
        assert_eq!(
            fields["a"],
            Value::List(vec![Value::Float(1.5), Value::Null])
        );
    }

    #[test]
    fn test_to_json() {
        let v = Value::List(vec![
            Value::record([("x", Value::Float(1.1)), ("y", Value::from(vec![1i64]))]),
            Value::Tuple(vec![Value::Int(1), Value::Bool(false)]),
            Value::Null,
        ]);
        assert_eq!(
            serde_json::to_value(&v).unwrap(),
            json!([{"x": 1.1, "y": [1]}, [1, false], null])
        );
    }

    #[test]
    fn test_display() {
        let v = Value::from(vec![Some(1.1), None, Some(3.0)]);
        assert_eq!(v.to_string(), "[1.1, None, 3.0]");
        let v = Value::Tuple(vec![Value::Int(1), Value::Bool(true)]);
        assert_eq!(v.to_string(), "(1, True)");
    }
}
