/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Building arrays from a stream of tokens.
//!
//! An [`ArrayBuilder`] takes primitive tokens (`null`, `boolean`,
//! `integer`, `real`) and structural tokens (`beginlist`/`endlist`,
//! `beginrecord`/`field`/`endrecord`, `begintuple`/`index`/`endtuple`)
//! and infers the type of the array as it goes:
//!
//! - a null anywhere adds an option layer at that depth;
//! - integers followed by reals widen to float64;
//! - tokens that fit no existing shape add a union branch;
//! - a field seen in some records but not others becomes optional.
//!
//! ```
//! # use jagged::ArrayBuilder;
//! let mut b = ArrayBuilder::new();
//! b.beginlist().unwrap();
//! b.integer(1).unwrap();
//! b.real(2.5).unwrap();
//! b.endlist().unwrap();
//! b.null().unwrap();
//! assert_eq!(b.ty().to_string(), "option[var * float64]");
//! assert_eq!(b.snapshot().unwrap().len(), 2);
//! ```

use indexmap::IndexMap;

use crate::content::ContentRef;
use crate::content::Leaf;
use crate::content::ListArray;
use crate::content::OptionArray;
use crate::content::RecordArray;
use crate::content::UnionArray;
use crate::error::ContentError;
use crate::types::RecordType;
use crate::types::Type;
use crate::value::Value;

/// Builds a content tree one token at a time.
///
/// Values are collected per top-level entry and folded into the
/// inferred columns when that entry is complete, so a snapshot only
/// ever sees whole entries. A builder is not meant to be shared
/// between threads while in use.
#[derive(Debug, Default)]
pub struct ArrayBuilder {
    root: Node,
    /// Open lists, tuples and records, innermost last.
    stack: Vec<Frame>,
}

#[derive(Debug)]
enum Frame {
    List(Vec<Value>),
    Tuple {
        slots: Vec<Option<Value>>,
        current: Option<usize>,
    },
    Record {
        fields: IndexMap<String, Value>,
        current: Option<String>,
    },
}

impl Frame {
    fn name(&self) -> &'static str {
        match self {
            Frame::List(_) => "list",
            Frame::Tuple { .. } => "tuple",
            Frame::Record { .. } => "record",
        }
    }
}

impl ArrayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an array with one entry per value.
    pub fn from_values<'a>(
        values: impl IntoIterator<Item = &'a Value>,
    ) -> Result<ContentRef, ContentError> {
        let mut builder = ArrayBuilder::new();
        for value in values {
            builder.append_value(value)?;
        }
        builder.snapshot()
    }

    /// Number of complete top-level entries.
    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The type inferred so far; `unknown` until something is appended.
    pub fn ty(&self) -> Type {
        self.root.ty()
    }

    pub fn null(&mut self) -> Result<(), ContentError> {
        self.push(Value::Null)
    }

    pub fn boolean(&mut self, x: bool) -> Result<(), ContentError> {
        self.push(Value::Bool(x))
    }

    pub fn integer(&mut self, x: i64) -> Result<(), ContentError> {
        self.push(Value::Int(x))
    }

    pub fn real(&mut self, x: f64) -> Result<(), ContentError> {
        self.push(Value::Float(x))
    }

    /// Append a whole value at the current position.
    pub fn append_value(&mut self, value: &Value) -> Result<(), ContentError> {
        self.push(value.clone())
    }

    pub fn beginlist(&mut self) -> Result<(), ContentError> {
        self.check_slot("beginlist")?;
        self.stack.push(Frame::List(Vec::new()));
        Ok(())
    }

    pub fn endlist(&mut self) -> Result<(), ContentError> {
        match self.stack.pop() {
            Some(Frame::List(items)) => self.push(Value::List(items)),
            other => Err(self.unmatched("endlist", other)),
        }
    }

    /// Open a tuple of `numfields` slots.
    pub fn begintuple(&mut self, numfields: usize) -> Result<(), ContentError> {
        self.check_slot("begintuple")?;
        self.stack.push(Frame::Tuple {
            slots: vec![None; numfields],
            current: None,
        });
        Ok(())
    }

    /// Direct the next value into slot `i` of the open tuple.
    pub fn index(&mut self, i: usize) -> Result<(), ContentError> {
        match self.stack.last_mut() {
            Some(Frame::Tuple { slots, current }) if i < slots.len() => {
                *current = Some(i);
                Ok(())
            }
            Some(Frame::Tuple { slots, .. }) => Err(ContentError::builder(format!(
                "index {} of a tuple with {} slots",
                i,
                slots.len()
            ))),
            _ => Err(ContentError::builder("index called outside a tuple")),
        }
    }

    pub fn endtuple(&mut self) -> Result<(), ContentError> {
        match self.stack.pop() {
            Some(Frame::Tuple { slots, current }) => {
                if let Some(i) = slots.iter().position(Option::is_none) {
                    self.stack.push(Frame::Tuple { slots, current });
                    return Err(ContentError::builder(format!(
                        "endtuple with slot {} never filled",
                        i
                    )));
                }
                self.push(Value::Tuple(slots.into_iter().flatten().collect()))
            }
            other => Err(self.unmatched("endtuple", other)),
        }
    }

    pub fn beginrecord(&mut self) -> Result<(), ContentError> {
        self.check_slot("beginrecord")?;
        self.stack.push(Frame::Record {
            fields: IndexMap::new(),
            current: None,
        });
        Ok(())
    }

    /// Direct the next value into field `key` of the open record.
    pub fn field(&mut self, key: &str) -> Result<(), ContentError> {
        match self.stack.last_mut() {
            Some(Frame::Record { current, .. }) => {
                *current = Some(key.to_string());
                Ok(())
            }
            _ => Err(ContentError::builder(format!(
                "field {:?} called outside a record",
                key
            ))),
        }
    }

    pub fn endrecord(&mut self) -> Result<(), ContentError> {
        match self.stack.pop() {
            Some(Frame::Record {
                fields,
                current: Some(key),
            }) => {
                let message = format!("endrecord with field {:?} never filled", key);
                self.stack.push(Frame::Record {
                    fields,
                    current: Some(key),
                });
                Err(ContentError::builder(message))
            }
            Some(Frame::Record { fields, .. }) => self.push(Value::Record(fields)),
            other => Err(self.unmatched("endrecord", other)),
        }
    }

    /// The entries appended so far as content. Open lists, tuples and
    /// records are not included; the builder can keep going.
    pub fn snapshot(&self) -> Result<ContentRef, ContentError> {
        self.root.snapshot()
    }

    fn push(&mut self, value: Value) -> Result<(), ContentError> {
        match self.stack.last_mut() {
            None => self.root.append(&value),
            Some(Frame::List(items)) => {
                items.push(value);
                Ok(())
            }
            Some(Frame::Tuple { slots, current }) => {
                let i = current.take().ok_or_else(|| {
                    ContentError::builder("value in a tuple without an index; call index first")
                })?;
                slots[i] = Some(value);
                Ok(())
            }
            Some(Frame::Record { fields, current }) => {
                let key = current.take().ok_or_else(|| {
                    ContentError::builder("value in a record without a field; call field first")
                })?;
                fields.insert(key, value);
                Ok(())
            }
        }
    }

    fn check_slot(&self, token: &str) -> Result<(), ContentError> {
        match self.stack.last() {
            Some(Frame::Tuple { current: None, .. }) => Err(ContentError::builder(format!(
                "{} in a tuple without an index",
                token
            ))),
            Some(Frame::Record { current: None, .. }) => Err(ContentError::builder(format!(
                "{} in a record without a field",
                token
            ))),
            _ => Ok(()),
        }
    }

    /// Put back a frame popped by a mismatched end token.
    fn unmatched(&mut self, token: &str, popped: Option<Frame>) -> ContentError {
        match popped {
            Some(frame) => {
                let name = frame.name();
                self.stack.push(frame);
                ContentError::builder(format!("{} inside an open {}", token, name))
            }
            None => ContentError::builder(format!("{} with nothing open", token)),
        }
    }
}

/// Inferred columns for the entries appended so far.
#[derive(Debug, Clone, Default)]
enum Node {
    #[default]
    Unknown,
    Bool(Vec<bool>),
    Int(Vec<i64>),
    Float(Vec<f64>),
    List {
        offsets: Vec<usize>,
        content: Box<Node>,
    },
    Record {
        keys: Vec<String>,
        contents: Vec<Node>,
        length: usize,
    },
    Tuple {
        contents: Vec<Node>,
        length: usize,
    },
    Option {
        index: Vec<i64>,
        content: Box<Node>,
    },
    Union {
        tags: Vec<u8>,
        index: Vec<usize>,
        contents: Vec<Node>,
    },
}

impl Node {
    /// An empty node shaped for `value`.
    fn fresh(value: &Value) -> Node {
        match value {
            Value::Null => Node::Unknown,
            Value::Bool(_) => Node::Bool(Vec::new()),
            Value::Int(_) => Node::Int(Vec::new()),
            Value::Float(_) => Node::Float(Vec::new()),
            Value::List(_) => Node::List {
                offsets: vec![0],
                content: Box::default(),
            },
            Value::Record(_) => Node::Record {
                keys: Vec::new(),
                contents: Vec::new(),
                length: 0,
            },
            Value::Tuple(items) => Node::Tuple {
                contents: vec![Node::Unknown; items.len()],
                length: 0,
            },
        }
    }

    fn len(&self) -> usize {
        match self {
            Node::Unknown => 0,
            Node::Bool(v) => v.len(),
            Node::Int(v) => v.len(),
            Node::Float(v) => v.len(),
            Node::List { offsets, .. } => offsets.len() - 1,
            Node::Record { length, .. } | Node::Tuple { length, .. } => *length,
            Node::Option { index, .. } => index.len(),
            Node::Union { tags, .. } => tags.len(),
        }
    }

    /// True if `value` can be appended without adding a union branch.
    fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Node::Unknown, _) => true,
            (Node::Option { content, .. }, v) => v.is_null() || content.accepts(v),
            (Node::Bool(_), Value::Bool(_)) => true,
            (Node::Int(_) | Node::Float(_), Value::Int(_) | Value::Float(_)) => true,
            (Node::List { .. }, Value::List(_)) => true,
            (Node::Record { .. }, Value::Record(_)) => true,
            (Node::Tuple { contents, .. }, Value::Tuple(items)) => contents.len() == items.len(),
            _ => false,
        }
    }

    fn append(&mut self, value: &Value) -> Result<(), ContentError> {
        match self {
            Node::Option { index, content } => {
                if value.is_null() {
                    index.push(-1);
                    return Ok(());
                }
                index.push(content.len() as i64);
                return content.append(value);
            }
            _ if value.is_null() => {
                let old = std::mem::take(self);
                *self = Node::Option {
                    index: (0..old.len() as i64).collect(),
                    content: Box::new(old),
                };
                return self.append(value);
            }
            Node::Unknown => {
                *self = Node::fresh(value);
                return self.append(value);
            }
            Node::Union {
                tags,
                index,
                contents,
            } => {
                let branch = match contents.iter().position(|c| c.accepts(value)) {
                    Some(b) => b,
                    None => {
                        contents.push(Node::fresh(value));
                        contents.len() - 1
                    }
                };
                let tag = u8::try_from(branch)
                    .map_err(|_| ContentError::builder("too many kinds of values for a union"))?;
                tags.push(tag);
                index.push(contents[branch].len());
                return contents[branch].append(value);
            }
            _ if !self.accepts(value) => {
                let old = std::mem::take(self);
                let length = old.len();
                *self = Node::Union {
                    tags: vec![0; length],
                    index: (0..length).collect(),
                    contents: vec![old],
                };
                return self.append(value);
            }
            _ => {}
        }

        if let (Node::Int(ints), Value::Float(_)) = (&*self, value) {
            let widened = ints.iter().map(|&i| i as f64).collect();
            *self = Node::Float(widened);
        }
        match (self, value) {
            (Node::Bool(v), Value::Bool(x)) => v.push(*x),
            (Node::Int(v), Value::Int(x)) => v.push(*x),
            (Node::Float(v), Value::Int(x)) => v.push(*x as f64),
            (Node::Float(v), Value::Float(x)) => v.push(*x),
            (Node::List { offsets, content }, Value::List(items)) => {
                for item in items {
                    content.append(item)?;
                }
                offsets.push(content.len());
            }
            (
                Node::Record {
                    keys,
                    contents,
                    length,
                },
                Value::Record(fields),
            ) => {
                for (key, v) in fields {
                    match keys.iter().position(|k| k == key) {
                        Some(i) => contents[i].append(v)?,
                        None => {
                            // Earlier records lacked this field.
                            let mut column = Node::Unknown;
                            for _ in 0..*length {
                                column.append(&Value::Null)?;
                            }
                            column.append(v)?;
                            keys.push(key.clone());
                            contents.push(column);
                        }
                    }
                }
                for (key, column) in keys.iter().zip(contents.iter_mut()) {
                    if !fields.contains_key(key) {
                        column.append(&Value::Null)?;
                    }
                }
                *length += 1;
            }
            (Node::Tuple { contents, length }, Value::Tuple(items)) => {
                for (column, item) in contents.iter_mut().zip(items) {
                    column.append(item)?;
                }
                *length += 1;
            }
            (node, value) => {
                return Err(ContentError::TypeConversion {
                    input: value.kind_name().to_string(),
                    reason: format!("does not fit a column of {}", node.ty()),
                });
            }
        }
        Ok(())
    }

    fn ty(&self) -> Type {
        match self {
            Node::Unknown => Type::Unknown,
            Node::Bool(_) => Type::Primitive(crate::buffer::PrimitiveKind::Bool),
            Node::Int(_) => Type::Primitive(crate::buffer::PrimitiveKind::Int64),
            Node::Float(_) => Type::Primitive(crate::buffer::PrimitiveKind::Float64),
            Node::List { content, .. } => Type::List(Box::new(content.ty())),
            Node::Record { keys, contents, .. } => Type::Record(RecordType {
                keys: Some(keys.clone()),
                contents: contents.iter().map(Node::ty).collect(),
            }),
            Node::Tuple { contents, .. } => Type::Record(RecordType {
                keys: None,
                contents: contents.iter().map(Node::ty).collect(),
            }),
            Node::Option { content, .. } => content.ty().optional(),
            Node::Union { contents, .. } => Type::Union(contents.iter().map(Node::ty).collect()),
        }
    }

    fn snapshot(&self) -> Result<ContentRef, ContentError> {
        let all = |contents: &[Node]| {
            contents
                .iter()
                .map(Node::snapshot)
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(match self {
            // Nothing to infer from; an empty float64 column.
            Node::Unknown => Leaf::from_vec(Vec::<f64>::new()).into(),
            Node::Bool(v) => Leaf::from_vec(v.clone()).into(),
            Node::Int(v) => Leaf::from_vec(v.clone()).into(),
            Node::Float(v) => Leaf::from_vec(v.clone()).into(),
            Node::List { offsets, content } => {
                ListArray::from_offsets(offsets.clone(), content.snapshot()?)?.into()
            }
            Node::Record {
                keys,
                contents,
                length,
            } => RecordArray::new(all(contents)?, Some(keys.clone()), *length)?.into(),
            Node::Tuple { contents, length } => {
                RecordArray::new(all(contents)?, None, *length)?.into()
            }
            Node::Option { index, content } => {
                OptionArray::indexed(index.clone(), content.snapshot()?)?.into()
            }
            Node::Union {
                tags,
                index,
                contents,
            } => UnionArray::new(tags.clone(), index.clone(), all(contents)?)?.into(),
        })
    }
}
