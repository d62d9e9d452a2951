/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Columnar arrays of nested, ragged data, and a generalized slicing
//! engine over them.
//!
//! An [`Array`] is backed by an immutable tree of [`Content`] nodes:
//! flat leaves of primitive values, regular and ragged lists, records
//! and tuples, options marking missing values, unions of several
//! types, and lazily generated nodes. Slicing follows NumPy's rules
//! and extends them to:
//!
//! - ragged dimensions, where integers and ranges apply to each list
//!   against its own length;
//! - field names, which may be written at any position and are moved to
//!   the depth of the records they select from;
//! - arrays with missing values, whose missing positions stay missing;
//! - nested arrays, which select within each list of a ragged
//!   dimension.
//!
//! Slicing never mutates: every result is a new tree that shares
//! whatever it can with the original, and contiguous ranges of a leaf
//! are views over the same buffer.
//!
//! ```
//! use jagged::Array;
//! use jagged::Value;
//! use jagged::s;
//!
//! let values: Vec<Value> = vec![
//!     Value::from(vec![0.0, 1.1, 2.2]),
//!     Value::from(Vec::<f64>::new()),
//!     Value::from(vec![3.3, 4.4]),
//! ];
//! let array = Array::from_values(&values).unwrap();
//! assert_eq!(array.ty().to_string(), "3 * var * float64");
//! assert_eq!(array.get(s![.., 1..]).unwrap().to_string(), "[[1.1, 2.2], [], [4.4]]");
//! ```
//!
//! Slice expressions can also be written as text:
//!
//! ```
//! # use jagged::{Array, Value, Where};
//! # let values = vec![Value::from(vec![1i64, 2, 3])];
//! # let array = Array::from_values(&values).unwrap();
//! let at: Where = "0, ::-1".parse().unwrap();
//! assert_eq!(array.get(at).unwrap().to_string(), "[3, 2, 1]");
//! ```

/// User-facing array, record and slicing result handles.
pub mod array;

/// Applying functions through nested structure.
pub mod broadcast;

/// Shared, typed backing storage.
pub mod buffer;

/// Incremental, type-inferring construction of content trees.
pub mod builder;

/// Library-wide settings.
pub mod config;

/// Content tree nodes.
pub mod content;

mod error;

/// Applying resolved slices to content trees.
pub mod getitem;

/// Strided views over flat buffers.
pub mod layout;

/// Moving field selectors to the depth of their records.
pub mod project;

/// Slice expressions and their canonical form.
pub mod slice;

/// Type descriptors.
pub mod types;

/// Host values.
pub mod value;

pub use array::Array;
pub use array::Indexed;
pub use array::Record;
pub use broadcast::BinaryOp;
pub use broadcast::Operand;
pub use buffer::PrimitiveKind;
pub use buffer::Scalar;
pub use builder::ArrayBuilder;
pub use config::Config;
pub use content::Content;
pub use content::ContentRef;
pub use error::ContentError;
pub use error::SliceError;
pub use slice::Range;
pub use slice::SliceItem;
pub use slice::Where;
pub use types::ArrayType;
pub use types::Type;
pub use value::Value;

/// Property-based generators for randomized test input.
#[cfg(test)]
pub mod strategy;

/// Build a tuple slice expression from its items.
///
/// Each item is anything convertible into a [`Where`]: integers,
/// Rust ranges (`..`, `1..`, `..-1`), field names, vectors of field
/// names, booleans or integers, and [`Where`] values such as
/// [`Where::Ellipsis`].
///
/// ```
/// use jagged::Where;
/// use jagged::s;
///
/// let w = s![2, .., "x", Where::Ellipsis];
/// assert!(matches!(w, Where::Tuple(items) if items.len() == 4));
/// ```
#[macro_export]
macro_rules! s {
    ( $( $item:expr ),* $(,)? ) => {
        $crate::slice::Where::Tuple(vec![ $( $crate::slice::Where::from($item) ),* ])
    };
}
