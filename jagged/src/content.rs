/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! The content tree.
//!
//! A [`Content`] is an immutable node; trees are shared through
//! [`ContentRef`] (`Arc<Content>`). Every operation here returns a new
//! root and reuses unchanged subtrees: taking a range is a view, and
//! gathering entries of a list, option or union node reorders its index
//! arrays without touching the content below.

use std::sync::Arc;

use tracing::trace;

use crate::buffer::Scalar;
use crate::error::ContentError;
use crate::error::SliceError;
use crate::types::Type;
use crate::value::Value;

mod lazy;
mod leaf;
mod list;
mod option;
mod record;
mod union;

pub use lazy::Generator;
pub use lazy::LazyArray;
pub use leaf::Leaf;
pub use list::ListArray;
pub use list::RegularArray;
pub use option::OptionArray;
pub use option::OptionIndex;
pub use record::RecordArray;
pub use union::UnionArray;

/// A shared content node.
pub type ContentRef = Arc<Content>;

#[derive(Clone, Debug)]
pub enum Content {
    Leaf(Leaf),
    Regular(RegularArray),
    List(ListArray),
    Record(RecordArray),
    Option(OptionArray),
    Union(UnionArray),
    Lazy(LazyArray),
}

/// One entry of a content node.
#[derive(Clone, Debug)]
pub enum Element {
    /// A nested list, as content of its own.
    Array(ContentRef),
    /// Entry `at` of a record node.
    Record(ContentRef, usize),
    Scalar(Scalar),
    Missing,
}

impl Content {
    pub fn len(&self) -> usize {
        match self {
            Content::Leaf(c) => c.len(),
            Content::Regular(c) => c.len(),
            Content::List(c) => c.len(),
            Content::Record(c) => c.len(),
            Content::Option(c) => c.len(),
            Content::Union(c) => c.len(),
            Content::Lazy(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Content::Leaf(_) => "Leaf",
            Content::Regular(_) => "RegularArray",
            Content::List(_) => "ListArray",
            Content::Record(_) => "RecordArray",
            Content::Option(_) => "OptionArray",
            Content::Union(_) => "UnionArray",
            Content::Lazy(_) => "LazyArray",
        }
    }

    /// The type of one entry.
    pub fn ty(&self) -> Type {
        match self {
            Content::Leaf(c) => c.ty(),
            Content::Regular(c) => Type::Regular(Box::new(c.content().ty()), c.size()),
            Content::List(c) => Type::List(Box::new(c.content().ty())),
            Content::Record(c) => Type::Record(c.ty()),
            Content::Option(c) => c.content().ty().optional(),
            Content::Union(c) => Type::Union(c.contents().iter().map(|b| b.ty()).collect()),
            Content::Lazy(c) => c.ty().clone(),
        }
    }

    /// Field names of the records in this tree, looking through lists,
    /// options and unions. Empty if there are none.
    pub fn keys(&self) -> Vec<String> {
        match self {
            Content::Record(c) => c.keys(),
            _ => self.ty().reachable_keys().unwrap_or_default(),
        }
    }

    /// Minimum and maximum number of dimensions, counting this node's
    /// own.
    pub fn minmax_depth(&self) -> (usize, usize) {
        let (min, max) = self.ty().minmax_depth();
        (min + 1, max + 1)
    }

    /// The node itself, or the generated content of a lazy node.
    pub fn materialized(self: &Arc<Self>) -> Result<ContentRef, ContentError> {
        match self.as_ref() {
            Content::Lazy(lazy) => lazy.materialize()?.materialized(),
            _ => Ok(self.clone()),
        }
    }

    /// Entry `at`, counting from the end when negative.
    pub fn getitem_at(self: &Arc<Self>, at: i64) -> Result<Element, SliceError> {
        let length = self.len();
        let i = if at < 0 { at + length as i64 } else { at };
        if i < 0 || i >= length as i64 {
            return Err(SliceError::out_of_range(at, length, self.kind_name()));
        }
        Ok(self.element(i as usize)?)
    }

    /// Entry `i`, which must be in bounds.
    pub fn element(self: &Arc<Self>, i: usize) -> Result<Element, ContentError> {
        Ok(match self.as_ref() {
            Content::Leaf(c) if c.ndim() == 1 => c
                .scalar(i)
                .map(Element::Scalar)
                .ok_or_else(|| ContentError::invalid("Leaf", format!("no entry {}", i)))?,
            Content::Leaf(c) => Element::Array(Arc::new(Content::Leaf(c.row(i)?))),
            Content::Regular(c) => Element::Array(c.element(i)?),
            Content::List(c) => Element::Array(c.element(i)?),
            Content::Record(_) => Element::Record(self.clone(), i),
            Content::Option(c) => match c.content_position(i) {
                Some(pos) => c.content().element(pos)?,
                None => Element::Missing,
            },
            Content::Union(c) => {
                let (tag, at) = c.locate(i);
                c.contents()[tag].element(at)?
            }
            Content::Lazy(c) => c.materialize()?.element(i)?,
        })
    }

    /// Entries `start..stop` as a view: buffers and index arrays are
    /// shared, never copied.
    pub fn getitem_range(self: &Arc<Self>, start: usize, stop: usize) -> Result<ContentRef, ContentError> {
        if start == 0 && stop == self.len() {
            return Ok(self.clone());
        }
        if start > stop || stop > self.len() {
            return Err(ContentError::invalid(
                self.kind_name(),
                format!("range {}..{} of length {}", start, stop, self.len()),
            ));
        }
        Ok(Arc::new(match self.as_ref() {
            Content::Leaf(c) => Content::Leaf(c.getitem_range(start, stop)?),
            Content::Regular(c) => Content::Regular(c.getitem_range(start, stop)?),
            Content::List(c) => Content::List(c.getitem_range(start, stop)?),
            Content::Record(c) => Content::Record(c.getitem_range(start, stop)?),
            Content::Option(c) => Content::Option(c.getitem_range(start, stop)?),
            Content::Union(c) => Content::Union(c.getitem_range(start, stop)?),
            Content::Lazy(c) => return c.materialize()?.getitem_range(start, stop),
        }))
    }

    /// Gather entries at `positions`, in order and with repetition.
    pub fn carry(self: &Arc<Self>, positions: &[usize]) -> Result<ContentRef, ContentError> {
        let length = self.len();
        if let Some(&bad) = positions.iter().find(|&&p| p >= length) {
            return Err(ContentError::invalid(
                self.kind_name(),
                format!("carry position {} of length {}", bad, length),
            ));
        }
        Ok(Arc::new(match self.as_ref() {
            Content::Leaf(c) => Content::Leaf(c.carry(positions)?),
            Content::Regular(c) => Content::Regular(c.carry(positions)?),
            Content::List(c) => Content::List(c.carry(positions)?),
            Content::Record(c) => Content::Record(c.carry(positions)?),
            Content::Option(c) => Content::Option(c.carry(positions)?),
            Content::Union(c) => Content::Union(c.carry(positions)?),
            Content::Lazy(c) => return c.materialize()?.carry(positions),
        }))
    }

    /// [`Content::carry`], but a run of consecutive positions becomes a
    /// view instead of a gather.
    pub fn carry_or_view(self: &Arc<Self>, positions: &[usize]) -> Result<ContentRef, ContentError> {
        let Some(&first) = positions.first() else {
            return self.getitem_range(0, 0);
        };
        let consecutive = positions
            .iter()
            .enumerate()
            .all(|(k, &p)| p == first + k);
        if consecutive {
            trace!(
                node = self.kind_name(),
                start = first,
                len = positions.len(),
                "viewing"
            );
            self.getitem_range(first, first + positions.len())
        } else {
            trace!(node = self.kind_name(), len = positions.len(), "gathering");
            self.carry(positions)
        }
    }

    /// Select field `key` of the records in this tree, keeping every
    /// list, option and union layer above them.
    pub fn getitem_field(self: &Arc<Self>, key: &str) -> Result<ContentRef, SliceError> {
        self.project(&|record: &RecordArray| {
            record
                .field(key)
                .cloned()
                .ok_or_else(|| SliceError::FieldNotFound {
                    field: key.to_string(),
                    available: record.keys(),
                })
        })
    }

    /// Select a subset of fields of the records in this tree, in the
    /// given order.
    pub fn getitem_fields(self: &Arc<Self>, keys: &[String]) -> Result<ContentRef, SliceError> {
        self.project(&|record: &RecordArray| {
            let fields = keys
                .iter()
                .map(|key| {
                    record
                        .field(key)
                        .cloned()
                        .ok_or_else(|| SliceError::FieldNotFound {
                            field: key.clone(),
                            available: record.keys(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let keys = if record.is_tuple() {
                None
            } else {
                Some(keys.to_vec())
            };
            Ok(RecordArray::new(fields, keys, record.len())?.into())
        })
    }

    fn project(
        self: &Arc<Self>,
        select: &dyn Fn(&RecordArray) -> Result<ContentRef, SliceError>,
    ) -> Result<ContentRef, SliceError> {
        Ok(match self.as_ref() {
            Content::Record(c) => select(c)?,
            Content::Regular(c) => {
                RegularArray::new(c.content().project(select)?, c.size(), c.len())?.into()
            }
            Content::List(c) => ListArray::new(
                c.starts().clone(),
                c.stops().clone(),
                c.content().project(select)?,
            )?
            .into(),
            Content::Option(c) => {
                OptionArray::new(c.index().clone(), c.content().project(select)?)?.into()
            }
            Content::Union(c) => {
                let contents = c
                    .contents()
                    .iter()
                    .map(|b| b.project(select))
                    .collect::<Result<_, _>>()?;
                UnionArray::new(c.tags().clone(), c.index().clone(), contents)?.into()
            }
            Content::Lazy(c) => c.materialize()?.project(select)?,
            Content::Leaf(c) => {
                return Err(SliceError::mismatch(format!(
                    "cannot select a field from {} values",
                    c.ty()
                )));
            }
        })
    }

    /// Check every node's invariants, recursively. Lazy nodes are only
    /// checked if already generated.
    pub fn validate(&self) -> Result<(), ContentError> {
        match self {
            Content::Leaf(c) => c.validate(),
            Content::Regular(c) => c.validate(),
            Content::List(c) => c.validate(),
            Content::Record(c) => c.validate(),
            Content::Option(c) => c.validate(),
            Content::Union(c) => c.validate(),
            Content::Lazy(c) => c.validate(),
        }
    }

    pub fn to_value_at(self: &Arc<Self>, i: usize) -> Result<Value, ContentError> {
        match self.as_ref() {
            Content::Leaf(c) => c.to_value_at(i),
            Content::Record(c) => c.to_value_at(i),
            _ => self.element(i)?.to_value(),
        }
    }

    /// Every entry as a host value.
    pub fn to_values(self: &Arc<Self>) -> Result<Vec<Value>, ContentError> {
        (0..self.len()).map(|i| self.to_value_at(i)).collect()
    }
}

impl Element {
    pub fn to_value(&self) -> Result<Value, ContentError> {
        Ok(match self {
            Element::Array(content) => Value::List(content.to_values()?),
            Element::Record(content, at) => content.to_value_at(*at)?,
            Element::Scalar(scalar) => Value::from(*scalar),
            Element::Missing => Value::Null,
        })
    }
}

impl From<Leaf> for ContentRef {
    fn from(leaf: Leaf) -> Self {
        Arc::new(Content::Leaf(leaf))
    }
}
