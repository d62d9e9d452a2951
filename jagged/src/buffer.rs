/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Shared backing storage for leaves and node indexes.
//!
//! Every buffer is an `Arc<[T]>`: cloning a buffer, or taking a view
//! of one, bumps a reference count and never copies elements. Copies
//! happen only in [`Buffer::gather`], which materializes a new buffer
//! from arbitrary positions.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

/// The kinds of primitive values a leaf can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Bool,
    UInt8,
    Int64,
    Float64,
}

impl PrimitiveKind {
    /// The kind both `self` and `other` can be losslessly widened to.
    pub fn promote(self, other: PrimitiveKind) -> PrimitiveKind {
        use PrimitiveKind::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Float64, _) | (_, Float64) => Float64,
            (Int64, _) | (_, Int64) => Int64,
            _ => UInt8,
        }
    }

    pub fn is_numeric(self) -> bool {
        self != PrimitiveKind::Bool
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveKind::Bool => write!(f, "bool"),
            PrimitiveKind::UInt8 => write!(f, "uint8"),
            PrimitiveKind::Int64 => write!(f, "int64"),
            PrimitiveKind::Float64 => write!(f, "float64"),
        }
    }
}

/// A single primitive value read out of a leaf.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum Scalar {
    Bool(bool),
    UInt8(u8),
    Int64(i64),
    Float64(f64),
}

impl Scalar {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Scalar::Bool(_) => PrimitiveKind::Bool,
            Scalar::UInt8(_) => PrimitiveKind::UInt8,
            Scalar::Int64(_) => PrimitiveKind::Int64,
            Scalar::Float64(_) => PrimitiveKind::Float64,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Scalar::Bool(b) => b as u8 as f64,
            Scalar::UInt8(v) => v as f64,
            Scalar::Int64(v) => v as f64,
            Scalar::Float64(v) => v,
        }
    }

    /// Integer view of the value; `None` for floats.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Scalar::Bool(b) => Some(b as i64),
            Scalar::UInt8(v) => Some(v as i64),
            Scalar::Int64(v) => Some(v),
            Scalar::Float64(_) => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match *self {
            Scalar::Bool(b) => b,
            Scalar::Float64(v) => v != 0.0,
            other => other.as_i64() != Some(0),
        }
    }

    /// Convert to `kind`, truncating floats when narrowing.
    pub fn cast(&self, kind: PrimitiveKind) -> Scalar {
        match kind {
            PrimitiveKind::Bool => Scalar::Bool(self.is_truthy()),
            PrimitiveKind::UInt8 => Scalar::UInt8(self.as_i64().unwrap_or(self.as_f64() as i64) as u8),
            PrimitiveKind::Int64 => Scalar::Int64(self.as_i64().unwrap_or(self.as_f64() as i64)),
            PrimitiveKind::Float64 => Scalar::Float64(self.as_f64()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(true) => write!(f, "True"),
            Scalar::Bool(false) => write!(f, "False"),
            Scalar::UInt8(v) => write!(f, "{}", v),
            Scalar::Int64(v) => write!(f, "{}", v),
            Scalar::Float64(v) => write!(f, "{:?}", v),
        }
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Scalar::$variant(value)
                }
            }
        )*
    };
}

scalar_from!(bool => Bool, u8 => UInt8, i64 => Int64, f64 => Float64);

/// Rust types that can back a leaf.
pub trait Primitive: Copy + Send + Sync + 'static {
    const KIND: PrimitiveKind;

    fn into_buffer(data: Arc<[Self]>) -> Buffer;
}

macro_rules! primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const KIND: PrimitiveKind = PrimitiveKind::$variant;

                fn into_buffer(data: Arc<[Self]>) -> Buffer {
                    Buffer::$variant(data)
                }
            }
        )*
    };
}

primitive!(bool => Bool, u8 => UInt8, i64 => Int64, f64 => Float64);

/// Typed, reference-counted storage for a leaf.
#[derive(Clone)]
pub enum Buffer {
    Bool(Arc<[bool]>),
    UInt8(Arc<[u8]>),
    Int64(Arc<[i64]>),
    Float64(Arc<[f64]>),
}

/// Run `$body` against the typed storage of a buffer, rewrapping the
/// result in the same variant.
macro_rules! map_buffer {
    ($buffer:expr, $data:ident => $body:expr) => {
        match $buffer {
            Buffer::Bool($data) => Buffer::Bool($body),
            Buffer::UInt8($data) => Buffer::UInt8($body),
            Buffer::Int64($data) => Buffer::Int64($body),
            Buffer::Float64($data) => Buffer::Float64($body),
        }
    };
}

impl Buffer {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Buffer::Bool(_) => PrimitiveKind::Bool,
            Buffer::UInt8(_) => PrimitiveKind::UInt8,
            Buffer::Int64(_) => PrimitiveKind::Int64,
            Buffer::Float64(_) => PrimitiveKind::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Buffer::Bool(data) => data.len(),
            Buffer::UInt8(data) => data.len(),
            Buffer::Int64(data) => data.len(),
            Buffer::Float64(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The value at a raw buffer position.
    pub fn get(&self, pos: usize) -> Option<Scalar> {
        match self {
            Buffer::Bool(data) => data.get(pos).map(|v| Scalar::Bool(*v)),
            Buffer::UInt8(data) => data.get(pos).map(|v| Scalar::UInt8(*v)),
            Buffer::Int64(data) => data.get(pos).map(|v| Scalar::Int64(*v)),
            Buffer::Float64(data) => data.get(pos).map(|v| Scalar::Float64(*v)),
        }
    }

    /// True when both buffers share the same allocation.
    pub fn ptr_eq(&self, other: &Buffer) -> bool {
        match (self, other) {
            (Buffer::Bool(a), Buffer::Bool(b)) => Arc::ptr_eq(a, b),
            (Buffer::UInt8(a), Buffer::UInt8(b)) => Arc::ptr_eq(a, b),
            (Buffer::Int64(a), Buffer::Int64(b)) => Arc::ptr_eq(a, b),
            (Buffer::Float64(a), Buffer::Float64(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Copy the values at `positions` into a new buffer. Every position
    /// must be in bounds.
    pub fn gather(&self, positions: impl IntoIterator<Item = usize>) -> Buffer {
        let positions = positions.into_iter();
        map_buffer!(self, data => positions.map(|p| data[p]).collect())
    }

    /// A buffer of `len` copies of `value`.
    pub fn filled(value: Scalar, len: usize) -> Buffer {
        match value {
            Scalar::Bool(v) => Buffer::Bool(vec![v; len].into()),
            Scalar::UInt8(v) => Buffer::UInt8(vec![v; len].into()),
            Scalar::Int64(v) => Buffer::Int64(vec![v; len].into()),
            Scalar::Float64(v) => Buffer::Float64(vec![v; len].into()),
        }
    }

    /// Build a buffer of `kind`, casting each value.
    pub fn from_scalars(kind: PrimitiveKind, values: impl IntoIterator<Item = Scalar>) -> Buffer {
        let values = values.into_iter().map(|v| v.cast(kind));
        match kind {
            PrimitiveKind::Bool => Buffer::Bool(
                values
                    .map(|v| matches!(v, Scalar::Bool(true)))
                    .collect(),
            ),
            PrimitiveKind::UInt8 => {
                Buffer::UInt8(values.map(|v| v.as_i64().unwrap_or(0) as u8).collect())
            }
            PrimitiveKind::Int64 => {
                Buffer::Int64(values.map(|v| v.as_i64().unwrap_or(0)).collect())
            }
            PrimitiveKind::Float64 => Buffer::Float64(values.map(|v| v.as_f64()).collect()),
        }
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Buffer::Bool(data) => f.debug_tuple("Bool").field(data).finish(),
            Buffer::UInt8(data) => f.debug_tuple("UInt8").field(data).finish(),
            Buffer::Int64(data) => f.debug_tuple("Int64").field(data).finish(),
            Buffer::Float64(data) => f.debug_tuple("Float64").field(data).finish(),
        }
    }
}

impl<T: Primitive> From<Vec<T>> for Buffer {
    fn from(data: Vec<T>) -> Self {
        T::into_buffer(data.into())
    }
}

/// A window onto a shared, immutable index array (list starts and
/// stops, option indexes, union tags). Narrowing the window with
/// [`Index::slice`] shares the allocation.
pub struct Index<T> {
    data: Arc<[T]>,
    start: usize,
    len: usize,
}

impl<T> Index<T> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data[self.start..self.start + self.len]
    }

    /// View `begin..end` of this index. The bounds must lie within the
    /// window.
    pub fn slice(&self, begin: usize, end: usize) -> Self {
        debug_assert!(begin <= end && end <= self.len);
        Index {
            data: Arc::clone(&self.data),
            start: self.start + begin,
            len: end - begin,
        }
    }

    pub fn ptr_eq(&self, other: &Index<T>) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl<T> Clone for Index<T> {
    fn clone(&self) -> Self {
        Index {
            data: Arc::clone(&self.data),
            start: self.start,
            len: self.len,
        }
    }
}

impl<T> Deref for Index<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> From<Vec<T>> for Index<T> {
    fn from(data: Vec<T>) -> Self {
        let len = data.len();
        Index {
            data: data.into(),
            start: 0,
            len,
        }
    }
}

impl<T> FromIterator<T> for Index<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<T>>().into()
    }
}

impl<T: fmt::Debug> fmt::Debug for Index<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<T: PartialEq> PartialEq for Index<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}
