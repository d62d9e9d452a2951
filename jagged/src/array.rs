/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! User-facing handles over content trees.
//!
//! An [`Array`] owns a reference to the root of a content tree (its
//! layout). Slicing it with [`Array::get`] runs the whole pipeline:
//! the expression is normalized into canonical items, field selectors
//! are moved to their records' depth, and the items are applied to
//! the tree. The result is an [`Indexed`]: a smaller array, a single
//! record, a scalar, or a missing value.
//!
//! ```
//! # use jagged::{s, Array, Value};
//! let values: Vec<Value> = vec![
//!     Value::record([("x", Value::Float(1.1)), ("y", Value::from(vec![1i64]))]),
//!     Value::record([("x", Value::Float(2.2)), ("y", Value::from(vec![2i64, 2]))]),
//! ];
//! let array = Array::from_values(&values).unwrap();
//! assert_eq!(array.ty().to_string(), r#"2 * {"x": float64, "y": var * int64}"#);
//! let y = array.get(s![.., "y", -1]).unwrap();
//! assert_eq!(y.to_string(), "[1, 2]");
//! ```

use std::fmt;

use tracing::debug;

use crate::broadcast;
use crate::broadcast::Operand;
use crate::buffer::Scalar;
use crate::builder::ArrayBuilder;
use crate::config::Config;
use crate::content::ContentRef;
use crate::content::Element;
use crate::content::Leaf;
use crate::error::ContentError;
use crate::error::SliceError;
use crate::getitem;
use crate::project;
use crate::slice::Where;
use crate::slice::normalize;
use crate::types::ArrayType;
use crate::types::Type;
use crate::value::Value;

/// An array of nested lists, records, options and unions.
#[derive(Clone, Debug)]
pub struct Array {
    layout: ContentRef,
}

impl Array {
    /// Wrap `layout`, validating it if [`Config::global`] asks for it.
    pub fn new(layout: ContentRef) -> Result<Self, ContentError> {
        Self::with_config(layout, Config::global())
    }

    pub fn with_config(layout: ContentRef, config: &Config) -> Result<Self, ContentError> {
        if config.check_valid {
            layout.validate()?;
        }
        Ok(Array { layout })
    }

    /// An array with one entry per value.
    pub fn from_values<'a>(values: impl IntoIterator<Item = &'a Value>) -> Result<Self, ContentError> {
        Self::new(ArrayBuilder::from_values(values)?)
    }

    /// An array from a list value.
    pub fn from_value(value: &Value) -> Result<Self, ContentError> {
        match value {
            Value::List(items) | Value::Tuple(items) => Self::from_values(items),
            Value::Record(_) => Err(ContentError::TypeConversion {
                input: value.kind_name().to_string(),
                reason: "could not convert dict into an Array; try Record".to_string(),
            }),
            other => Err(ContentError::TypeConversion {
                input: other.kind_name().to_string(),
                reason: format!("could not convert {} into an Array", other.kind_name()),
            }),
        }
    }

    pub fn layout(&self) -> &ContentRef {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.layout.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layout.is_empty()
    }

    pub fn ty(&self) -> ArrayType {
        ArrayType {
            length: self.len(),
            element: self.layout.ty(),
        }
    }

    /// Field names of the records in this array.
    pub fn keys(&self) -> Vec<String> {
        self.layout.keys()
    }

    /// Slice the array.
    ///
    /// # Errors
    ///
    /// Any [`SliceError`]: an index out of range, a field that does not
    /// exist, array items separated by a basic item, and so on. The
    /// array is unchanged when slicing fails.
    #[tracing::instrument(level = "debug", skip_all, fields(length = self.len()))]
    pub fn get(&self, at: impl Into<Where>) -> Result<Indexed, SliceError> {
        let items = normalize(&at.into())?;
        debug!(?items, "normalized slice");
        let items = project::resolve(&items, &self.layout.ty())?;
        debug!(?items, "resolved slice");
        Ok(Indexed::from_element(getitem::apply(&self.layout, &items)?))
    }

    /// Select field `key` of every record.
    pub fn field(&self, key: &str) -> Result<Array, SliceError> {
        let keys = self.keys();
        if !keys.iter().any(|k| k == key) {
            return Err(SliceError::FieldNotFound {
                field: key.to_string(),
                available: keys,
            });
        }
        Ok(Array {
            layout: self.layout.getitem_field(key)?,
        })
    }

    /// Select slot `n` of every tuple.
    pub fn slot(&self, n: usize) -> Result<Array, SliceError> {
        self.field(&n.to_string())
    }

    /// Assign a field. Only a field name is a valid target; `what` is
    /// broadcast down to the records.
    pub fn set(&mut self, at: impl Into<Where>, what: impl Into<Operand>) -> Result<(), SliceError> {
        match at.into() {
            Where::Field(key) => {
                self.layout = broadcast::with_field(&self.layout, &key, what.into())?;
                Ok(())
            }
            other => Err(SliceError::AssignmentType {
                target: format!("{:?}", other),
            }),
        }
    }

    /// A new array with field `key` added or replaced.
    pub fn with_field(&self, key: &str, what: impl Into<Operand>) -> Result<Array, SliceError> {
        Ok(Array {
            layout: broadcast::with_field(&self.layout, key, what.into())?,
        })
    }

    /// Apply `f` to every leaf, keeping the structure around it.
    pub fn map_leaves(
        &self,
        f: impl Fn(&Leaf) -> Result<Leaf, SliceError>,
    ) -> Result<Array, SliceError> {
        Ok(Array {
            layout: broadcast::map_leaves(&self.layout, f)?,
        })
    }

    /// Entries from first to last.
    pub fn iter(&self) -> impl Iterator<Item = Result<Indexed, ContentError>> + '_ {
        (0..self.len()).map(|i| Ok(Indexed::from_element(self.layout.element(i)?)))
    }

    pub fn to_value(&self) -> Result<Value, ContentError> {
        Ok(Value::List(self.layout.to_values()?))
    }

    pub fn validate(&self) -> Result<(), ContentError> {
        self.layout.validate()
    }

    /// `<Array [...] type='...'>`
    pub fn repr(&self) -> String {
        format!("<Array {} type='{}'>", self, self.ty())
    }
}

impl fmt::Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match truncated(&self.layout, Config::global().display_limit) {
            Ok(text) => f.write_str(&text),
            Err(e) => write!(f, "<invalid: {}>", e),
        }
    }
}

/// The entries of `content` in brackets, keeping entries from the front
/// and back alternately until `limit` characters are used and eliding
/// the rest with `...`.
fn truncated(content: &ContentRef, limit: usize) -> Result<String, ContentError> {
    const ELLIPSIS: usize = ", ...".len();

    let (mut i, mut j) = (0, content.len());
    let mut front = Vec::new();
    let mut back = Vec::new();
    let mut used = 2;
    let mut from_front = true;
    while i < j {
        let k = if from_front { i } else { j - 1 };
        let text = content.to_value_at(k)?.to_string();
        let reserve = if j - i > 1 { ELLIPSIS } else { 0 };
        let cost = text.len() + if front.is_empty() && back.is_empty() { 0 } else { 2 };
        if used + cost + reserve > limit {
            break;
        }
        used += cost;
        if from_front {
            front.push(text);
            i += 1;
        } else {
            back.push(text);
            j -= 1;
        }
        from_front = !from_front;
    }
    back.reverse();
    let mut parts = front;
    if i < j {
        parts.push("...".to_string());
    }
    parts.extend(back);
    Ok(format!("[{}]", parts.join(", ")))
}

impl From<&Array> for Where {
    fn from(array: &Array) -> Self {
        Where::Content(array.layout.clone())
    }
}

impl From<&Array> for Operand {
    fn from(array: &Array) -> Self {
        Operand::Content(array.layout.clone())
    }
}

impl From<Array> for Operand {
    fn from(array: Array) -> Self {
        Operand::Content(array.layout)
    }
}

/// A single record of an array.
#[derive(Clone, Debug)]
pub struct Record {
    array: Array,
    at: usize,
}

impl Record {
    /// A record from a record value.
    pub fn from_value(value: &Value) -> Result<Self, ContentError> {
        if !matches!(value, Value::Record(_)) {
            return Err(ContentError::TypeConversion {
                input: value.kind_name().to_string(),
                reason: "a Record needs a dict".to_string(),
            });
        }
        Ok(Record {
            array: Array::from_values([value])?,
            at: 0,
        })
    }

    pub fn field(&self, key: &str) -> Result<Indexed, SliceError> {
        let column = self.array.layout.getitem_field(key)?;
        Ok(Indexed::from_element(column.element(self.at)?))
    }

    pub fn keys(&self) -> Vec<String> {
        self.array.keys()
    }

    pub fn ty(&self) -> Type {
        self.array.layout.ty()
    }

    pub fn to_value(&self) -> Result<Value, ContentError> {
        self.array.layout.to_value_at(self.at)
    }

    /// Slice within this record; positional items address its fields'
    /// dimensions.
    pub fn get(&self, at: impl Into<Where>) -> Result<Indexed, SliceError> {
        let parts = match at.into() {
            Where::Tuple(parts) => parts,
            other => vec![other],
        };
        let view = Array {
            layout: self.array.layout.getitem_range(self.at, self.at + 1)?,
        };
        view.get(Where::Tuple(
            std::iter::once(Where::At(0)).chain(parts).collect(),
        ))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_value() {
            Ok(value) => write!(f, "{}", value),
            Err(e) => write!(f, "<invalid: {}>", e),
        }
    }
}

/// The result of slicing an [`Array`].
#[derive(Clone, Debug)]
pub enum Indexed {
    Array(Array),
    Record(Record),
    Scalar(Scalar),
    Missing,
}

impl Indexed {
    fn from_element(element: Element) -> Self {
        match element {
            Element::Array(layout) => Indexed::Array(Array { layout }),
            Element::Record(layout, at) => Indexed::Record(Record {
                array: Array { layout },
                at,
            }),
            Element::Scalar(s) => Indexed::Scalar(s),
            Element::Missing => Indexed::Missing,
        }
    }

    pub fn array(self) -> Option<Array> {
        match self {
            Indexed::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn record(self) -> Option<Record> {
        match self {
            Indexed::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn scalar(&self) -> Option<Scalar> {
        match self {
            Indexed::Scalar(s) => Some(*s),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Indexed::Missing)
    }

    pub fn to_value(&self) -> Result<Value, ContentError> {
        match self {
            Indexed::Array(array) => array.to_value(),
            Indexed::Record(record) => record.to_value(),
            Indexed::Scalar(s) => Ok(Value::from(*s)),
            Indexed::Missing => Ok(Value::Null),
        }
    }
}

impl fmt::Display for Indexed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Indexed::Array(array) => write!(f, "{}", array),
            Indexed::Record(record) => write!(f, "{}", record),
            Indexed::Scalar(s) => write!(f, "{}", s),
            Indexed::Missing => write!(f, "None"),
        }
    }
}
