/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

/// Errors raised while constructing or validating content trees.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ContentError {
    #[error("could not convert {input} into an array: {reason}")]
    TypeConversion { input: String, reason: String },

    #[error("invalid {node}: {reason}")]
    InvalidLayout { node: &'static str, reason: String },

    #[error("builder: {reason}")]
    Builder { reason: String },
}

impl ContentError {
    pub(crate) fn invalid(node: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidLayout {
            node,
            reason: reason.into(),
        }
    }

    pub(crate) fn builder(reason: impl Into<String>) -> Self {
        Self::Builder {
            reason: reason.into(),
        }
    }
}

/// The type of error for slicing and broadcasting operations.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SliceError {
    #[error("out of range: {reason}")]
    OutOfRange { reason: String },

    #[error("slice step cannot be zero")]
    StepZero,

    #[error("dimension mismatch: {reason}")]
    DimensionMismatch { reason: String },

    #[error(
        "cannot mix advanced and basic indexing with a basic index between two advanced indexes"
    )]
    AdvancedIndexingConflict,

    #[error("no field named {field:?} (fields are {available:?})")]
    FieldNotFound {
        field: String,
        available: Vec<String>,
    },

    #[error("cannot broadcast: {reason}")]
    Broadcast { reason: String },

    #[error("only fields may be assigned in-place (by field name), not {target}")]
    AssignmentType { target: String },

    #[error("invalid slice: {reason}")]
    InvalidSlice { reason: String },

    #[error(transparent)]
    ContentError(#[from] ContentError),
}

impl SliceError {
    pub(crate) fn out_of_range(index: i64, length: usize, what: &str) -> Self {
        Self::OutOfRange {
            reason: format!("index {index} in {what} of length {length}"),
        }
    }

    pub(crate) fn too_many_dimensions(node: &str) -> Self {
        Self::OutOfRange {
            reason: format!("too many dimensions in slice, {node} has none left"),
        }
    }

    pub(crate) fn mismatch(reason: impl Into<String>) -> Self {
        Self::DimensionMismatch {
            reason: reason.into(),
        }
    }

    pub(crate) fn broadcast(reason: impl Into<String>) -> Self {
        Self::Broadcast {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_slice(reason: impl Into<String>) -> Self {
        Self::InvalidSlice {
            reason: reason.into(),
        }
    }
}
