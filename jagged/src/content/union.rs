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

/// A tagged choice among branches: entry `i` is
/// `contents[tags[i]][index[i]]`.
#[derive(Clone, Debug)]
pub struct UnionArray {
    tags: Index<u8>,
    index: Index<usize>,
    contents: Vec<ContentRef>,
}

impl UnionArray {
    pub fn new(
        tags: impl Into<Index<u8>>,
        index: impl Into<Index<usize>>,
        contents: Vec<ContentRef>,
    ) -> Result<Self, ContentError> {
        let (tags, index) = (tags.into(), index.into());
        if tags.len() != index.len() {
            return Err(ContentError::invalid(
                "UnionArray",
                format!("{} tags but {} index entries", tags.len(), index.len()),
            ));
        }
        for (i, (&tag, &at)) in tags.iter().zip(index.iter()).enumerate() {
            let Some(branch) = contents.get(tag as usize) else {
                return Err(ContentError::invalid(
                    "UnionArray",
                    format!("tags[{i}] = {tag} with {} branches", contents.len()),
                ));
            };
            if at >= branch.len() {
                return Err(ContentError::invalid(
                    "UnionArray",
                    format!(
                        "index[{i}] = {at} beyond branch {tag} of length {}",
                        branch.len()
                    ),
                ));
            }
        }
        Ok(UnionArray {
            tags,
            index,
            contents,
        })
    }

    pub fn tags(&self) -> &Index<u8> {
        &self.tags
    }

    pub fn index(&self) -> &Index<usize> {
        &self.index
    }

    pub fn contents(&self) -> &[ContentRef] {
        &self.contents
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// The branch and branch position of entry `i`.
    pub fn locate(&self, i: usize) -> (usize, usize) {
        (self.tags[i] as usize, self.index[i])
    }

    /// For each branch, the entries that select it and their positions
    /// in that branch.
    pub fn split(&self) -> Vec<(Vec<usize>, Vec<usize>)> {
        let mut groups = vec![(Vec::new(), Vec::new()); self.contents.len()];
        for i in 0..self.len() {
            let (tag, at) = self.locate(i);
            groups[tag].0.push(i);
            groups[tag].1.push(at);
        }
        groups
    }

    pub fn getitem_range(&self, start: usize, stop: usize) -> Result<Self, ContentError> {
        Ok(UnionArray {
            tags: self.tags.slice(start, stop),
            index: self.index.slice(start, stop),
            contents: self.contents.clone(),
        })
    }

    pub fn carry(&self, positions: &[usize]) -> Result<Self, ContentError> {
        Self::new(
            positions.iter().map(|&p| self.tags[p]).collect::<Index<u8>>(),
            positions.iter().map(|&p| self.index[p]).collect::<Index<usize>>(),
            self.contents.clone(),
        )
    }

    pub fn validate(&self) -> Result<(), ContentError> {
        Self::new(self.tags.clone(), self.index.clone(), self.contents.clone())?;
        self.contents.iter().try_for_each(|c| c.validate())
    }
}

impl From<UnionArray> for ContentRef {
    fn from(array: UnionArray) -> Self {
        Arc::new(Content::Union(array))
    }
}
