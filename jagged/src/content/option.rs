/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::sync::Arc;

use crate::buffer::Index;
use crate::content::Content;
use crate::content::ContentRef;
use crate::error::ContentError;

/// How an [`OptionArray`] marks missing entries.
#[derive(Clone, Debug)]
pub enum OptionIndex {
    /// Entry `i` is `content[index[i]]`, or missing when negative.
    Indexed(Index<i64>),
    /// Entry `i` is `content[i]` when `mask[i] != 0` equals
    /// `valid_when`, missing otherwise.
    ByteMasked { mask: Index<u8>, valid_when: bool },
}

/// Values that may be missing.
#[derive(Clone, Debug)]
pub struct OptionArray {
    index: OptionIndex,
    content: ContentRef,
}

impl OptionArray {
    pub fn new(index: OptionIndex, content: ContentRef) -> Result<Self, ContentError> {
        let available = content.len();
        match &index {
            OptionIndex::Indexed(index) => {
                if let Some((i, &bad)) = index
                    .iter()
                    .enumerate()
                    .find(|&(_, &x)| x >= 0 && x as usize >= available)
                {
                    return Err(ContentError::invalid(
                        "OptionArray",
                        format!("index[{i}] = {bad} beyond content of length {available}"),
                    ));
                }
            }
            OptionIndex::ByteMasked { mask, .. } => {
                if mask.len() > available {
                    return Err(ContentError::invalid(
                        "OptionArray",
                        format!(
                            "mask of length {} over content of length {}",
                            mask.len(),
                            available
                        ),
                    ));
                }
            }
        }
        Ok(OptionArray { index, content })
    }

    pub fn indexed(index: impl Into<Index<i64>>, content: ContentRef) -> Result<Self, ContentError> {
        Self::new(OptionIndex::Indexed(index.into()), content)
    }

    pub fn masked(
        mask: impl Into<Index<u8>>,
        valid_when: bool,
        content: ContentRef,
    ) -> Result<Self, ContentError> {
        Self::new(
            OptionIndex::ByteMasked {
                mask: mask.into(),
                valid_when,
            },
            content,
        )
    }

    pub fn index(&self) -> &OptionIndex {
        &self.index
    }

    pub fn content(&self) -> &ContentRef {
        &self.content
    }

    pub fn len(&self) -> usize {
        match &self.index {
            OptionIndex::Indexed(index) => index.len(),
            OptionIndex::ByteMasked { mask, .. } => mask.len(),
        }
    }

    /// Where entry `i` lives in the content, or `None` if missing.
    pub fn content_position(&self, i: usize) -> Option<usize> {
        match &self.index {
            OptionIndex::Indexed(index) => usize::try_from(index[i]).ok(),
            OptionIndex::ByteMasked { mask, valid_when } => {
                ((mask[i] != 0) == *valid_when).then_some(i)
            }
        }
    }

    /// Split into the content positions of valid entries and an
    /// out-index over them: `outindex[i]` is the rank of entry `i`
    /// among the valid entries, or -1.
    pub fn project(&self) -> (Vec<usize>, Vec<i64>) {
        let mut positions = Vec::new();
        let outindex = (0..self.len())
            .map(|i| match self.content_position(i) {
                Some(pos) => {
                    positions.push(pos);
                    positions.len() as i64 - 1
                }
                None => -1,
            })
            .collect();
        (positions, outindex)
    }

    pub fn getitem_range(&self, start: usize, stop: usize) -> Result<Self, ContentError> {
        match &self.index {
            OptionIndex::Indexed(index) => Self::new(
                OptionIndex::Indexed(index.slice(start, stop)),
                self.content.clone(),
            ),
            OptionIndex::ByteMasked { mask, valid_when } => Self::new(
                OptionIndex::ByteMasked {
                    mask: mask.slice(start, stop),
                    valid_when: *valid_when,
                },
                self.content.getitem_range(start, stop)?,
            ),
        }
    }

    /// Reorder entries. The content is shared; a masked array becomes
    /// an indexed one.
    pub fn carry(&self, positions: &[usize]) -> Result<Self, ContentError> {
        let index: Index<i64> = positions
            .iter()
            .map(|&p| self.content_position(p).map_or(-1, |pos| pos as i64))
            .collect();
        Self::new(OptionIndex::Indexed(index), self.content.clone())
    }

    pub fn validate(&self) -> Result<(), ContentError> {
        Self::new(self.index.clone(), self.content.clone())?;
        self.content.validate()
    }
}

impl From<OptionArray> for ContentRef {
    fn from(array: OptionArray) -> Self {
        Arc::new(Content::Option(array))
    }
}
