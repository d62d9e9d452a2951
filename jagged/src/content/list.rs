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

/// Lists that all have length `size`, laid out back to back in
/// `content`.
#[derive(Clone, Debug)]
pub struct RegularArray {
    content: ContentRef,
    size: usize,
    length: usize,
}

impl RegularArray {
    pub fn new(content: ContentRef, size: usize, length: usize) -> Result<Self, ContentError> {
        if length * size > content.len() {
            return Err(ContentError::invalid(
                "RegularArray",
                format!(
                    "{} lists of size {} need {} elements, content has {}",
                    length,
                    size,
                    length * size,
                    content.len()
                ),
            ));
        }
        Ok(RegularArray {
            content,
            size,
            length,
        })
    }

    /// Chop all of `content` into lists of `size`.
    pub fn from_content(content: ContentRef, size: usize) -> Result<Self, ContentError> {
        if size == 0 {
            return Err(ContentError::invalid(
                "RegularArray",
                "size 0 needs an explicit length",
            ));
        }
        let length = content.len() / size;
        Self::new(content, size, length)
    }

    pub fn content(&self) -> &ContentRef {
        &self.content
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.length
    }

    /// The same lists with explicit bounds.
    pub fn to_list(&self) -> Result<ListArray, ContentError> {
        let starts: Index<usize> = (0..self.length).map(|i| i * self.size).collect();
        let stops: Index<usize> = (0..self.length).map(|i| (i + 1) * self.size).collect();
        ListArray::new(starts, stops, self.content.clone())
    }

    pub fn element(&self, i: usize) -> Result<ContentRef, ContentError> {
        self.content.getitem_range(i * self.size, (i + 1) * self.size)
    }

    pub fn getitem_range(&self, start: usize, stop: usize) -> Result<Self, ContentError> {
        Self::new(
            self.content
                .getitem_range(start * self.size, stop * self.size)?,
            self.size,
            stop - start,
        )
    }

    pub fn carry(&self, positions: &[usize]) -> Result<Self, ContentError> {
        let nextcarry: Vec<usize> = positions
            .iter()
            .flat_map(|&p| p * self.size..(p + 1) * self.size)
            .collect();
        Self::new(
            self.content.carry_or_view(&nextcarry)?,
            self.size,
            positions.len(),
        )
    }

    pub fn validate(&self) -> Result<(), ContentError> {
        Self::new(self.content.clone(), self.size, self.length)?;
        self.content.validate()
    }
}

/// Lists of varying length: list `i` is `content[starts[i]..stops[i]]`.
#[derive(Clone, Debug)]
pub struct ListArray {
    starts: Index<usize>,
    stops: Index<usize>,
    content: ContentRef,
}

impl ListArray {
    pub fn new(
        starts: Index<usize>,
        stops: Index<usize>,
        content: ContentRef,
    ) -> Result<Self, ContentError> {
        if starts.len() != stops.len() {
            return Err(ContentError::invalid(
                "ListArray",
                format!("{} starts but {} stops", starts.len(), stops.len()),
            ));
        }
        let available = content.len();
        for (i, (&start, &stop)) in starts.iter().zip(stops.iter()).enumerate() {
            if stop < start {
                return Err(ContentError::invalid(
                    "ListArray",
                    format!("stops[{i}] = {stop} < starts[{i}] = {start}"),
                ));
            }
            if start != stop && stop > available {
                return Err(ContentError::invalid(
                    "ListArray",
                    format!("stops[{i}] = {stop} beyond content of length {available}"),
                ));
            }
        }
        Ok(ListArray {
            starts,
            stops,
            content,
        })
    }

    /// Lists delimited by consecutive `offsets`. The starts and stops
    /// share the offsets buffer.
    pub fn from_offsets(
        offsets: impl Into<Index<usize>>,
        content: ContentRef,
    ) -> Result<Self, ContentError> {
        let offsets = offsets.into();
        if offsets.is_empty() {
            return Err(ContentError::invalid(
                "ListArray",
                "offsets must have at least one entry",
            ));
        }
        let n = offsets.len() - 1;
        Self::new(offsets.slice(0, n), offsets.slice(1, n + 1), content)
    }

    pub fn starts(&self) -> &Index<usize> {
        &self.starts
    }

    pub fn stops(&self) -> &Index<usize> {
        &self.stops
    }

    pub fn content(&self) -> &ContentRef {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn element(&self, i: usize) -> Result<ContentRef, ContentError> {
        self.content.getitem_range(self.starts[i], self.stops[i])
    }

    pub fn getitem_range(&self, start: usize, stop: usize) -> Result<Self, ContentError> {
        Ok(ListArray {
            starts: self.starts.slice(start, stop),
            stops: self.stops.slice(start, stop),
            content: self.content.clone(),
        })
    }

    /// Reorder lists; the content is shared, not copied.
    pub fn carry(&self, positions: &[usize]) -> Result<Self, ContentError> {
        let starts = positions.iter().map(|&p| self.starts[p]).collect();
        let stops = positions.iter().map(|&p| self.stops[p]).collect();
        Ok(ListArray {
            starts,
            stops,
            content: self.content.clone(),
        })
    }

    pub fn validate(&self) -> Result<(), ContentError> {
        Self::new(self.starts.clone(), self.stops.clone(), self.content.clone())?;
        self.content.validate()
    }
}

impl From<RegularArray> for Content {
    fn from(array: RegularArray) -> Self {
        Content::Regular(array)
    }
}

impl From<ListArray> for Content {
    fn from(array: ListArray) -> Self {
        Content::List(array)
    }
}

impl From<RegularArray> for ContentRef {
    fn from(array: RegularArray) -> Self {
        Arc::new(Content::Regular(array))
    }
}

impl From<ListArray> for ContentRef {
    fn from(array: ListArray) -> Self {
        Arc::new(Content::List(array))
    }
}
