/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::iter::zip;

use serde::Deserialize;
use serde::Serialize;

use crate::error::ContentError;

/// Layout is a compact description of how an n-dimensional leaf maps
/// its coordinates onto the flat positions of a backing buffer. Given
/// an offset, the sizes of each dimension, and the strides for each
/// dimension, a layout computes buffer positions:
///
/// ```text
/// position = offset + ∑ iₖ × strides[k]
/// ```
///
/// Layouts are how leaves are sliced without copying: restricting a
/// dimension only rewrites the offset and that dimension's size, so
/// the new leaf keeps pointing at the same buffer.
///
/// ```
/// # use jagged::layout::Layout;
/// let l = Layout::new_row_major(vec![2, 3]);
/// assert!(l.iter().eq(0..6));
/// let row = l.at(0, 1).unwrap();
/// assert!(row.iter().eq(3..6));
/// ```
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Layout {
    offset: usize,
    sizes: Vec<usize>,
    strides: Vec<usize>,
}

impl Layout {
    /// Create a new Layout with the provided offset, sizes, and
    /// strides. The sizes and strides must describe the same number of
    /// dimensions.
    pub fn new(offset: usize, sizes: Vec<usize>, strides: Vec<usize>) -> Result<Self, ContentError> {
        if sizes.len() != strides.len() {
            return Err(ContentError::invalid(
                "Layout",
                format!(
                    "{} sizes but {} strides",
                    sizes.len(),
                    strides.len()
                ),
            ));
        }
        if sizes.is_empty() {
            return Err(ContentError::invalid("Layout", "a leaf needs at least one dimension"));
        }
        Ok(Layout {
            offset,
            sizes,
            strides,
        })
    }

    /// Create a new layout of the given sizes in row-major order.
    pub fn new_row_major(sizes: impl Into<Vec<usize>>) -> Self {
        let sizes = sizes.into();
        // "flip it and reverse it" --Missy Elliott
        let mut strides: Vec<usize> = sizes.clone();
        let _ = strides.iter_mut().rev().fold(1, |acc, n| {
            let next = *n * acc;
            *n = acc;
            next
        });
        Self {
            offset: 0,
            sizes,
            strides,
        }
    }

    /// The number of dimensions in this layout.
    pub fn num_dim(&self) -> usize {
        self.sizes.len()
    }

    /// This is the offset from which the first value in the layout begins.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The size of each dimension.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// The strides of the layout; that is, the distance between each
    /// element at a given index in the underlying buffer.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// The length of the outermost dimension.
    pub fn length(&self) -> usize {
        self.sizes[0]
    }

    /// The total number of addressed positions.
    pub fn num_elements(&self) -> usize {
        self.sizes.iter().product()
    }

    pub fn is_contiguous(&self) -> bool {
        let mut expected_stride = 1;
        for (stride, size) in zip(self.strides.iter(), self.sizes.iter()).rev() {
            if *stride != expected_stride && *size > 1 {
                return false;
            }
            expected_stride *= *size
        }
        true
    }

    /// The largest buffer position this layout can address, or `None`
    /// if the layout addresses nothing.
    pub fn max_location(&self) -> Option<usize> {
        if self.sizes.contains(&0) {
            return None;
        }
        Some(
            self.offset
                + zip(&self.sizes, &self.strides)
                    .map(|(size, stride)| (size - 1) * stride)
                    .sum::<usize>(),
        )
    }

    /// Select a single index along a dimension, removing that
    /// dimension entirely. The fixed coordinate's contribution
    /// (index × stride) is absorbed into the offset; the remaining
    /// dimensions keep their strides.
    ///
    /// Selecting from the last remaining dimension is refused: leaves
    /// always keep at least one dimension, and a single position is
    /// read with [`Layout::location`] instead.
    pub fn at(&self, dim: usize, index: usize) -> Result<Self, ContentError> {
        if dim >= self.sizes.len() || self.sizes.len() == 1 {
            return Err(ContentError::invalid(
                "Layout",
                format!(
                    "cannot fix dimension {dim} of a {}-dimensional layout",
                    self.num_dim()
                ),
            ));
        }
        if index >= self.sizes[dim] {
            return Err(ContentError::invalid(
                "Layout",
                format!("index {index} out of range {}", self.sizes[dim]),
            ));
        }
        let mut sizes = self.sizes.clone();
        let mut strides = self.strides.clone();
        sizes.remove(dim);
        strides.remove(dim);
        Layout::new(self.offset + index * self.strides[dim], sizes, strides)
    }

    /// Restrict the view to `begin..end` along dimension `dim`:
    /// ```text
    /// offset    += begin × strides[dim]
    /// sizes[dim] = end - begin
    /// ```
    /// Unlike a coordinate selection this never removes the
    /// dimension, and an empty range is allowed.
    pub fn select(&self, dim: usize, begin: usize, end: usize) -> Result<Self, ContentError> {
        if dim >= self.sizes.len() || begin > end || end > self.sizes[dim] {
            return Err(ContentError::invalid(
                "Layout",
                format!("cannot select {begin}..{end} from dimension {dim} of {:?}", self.sizes),
            ));
        }
        let mut sizes = self.sizes.clone();
        sizes[dim] = end - begin;
        Ok(Layout {
            offset: self.offset + begin * self.strides[dim],
            sizes,
            strides: self.strides.clone(),
        })
    }

    /// Collapse all dimensions into one. Only contiguous layouts can be
    /// flattened without copying.
    pub fn flatten(&self) -> Option<Self> {
        if !self.is_contiguous() {
            return None;
        }
        Some(Layout {
            offset: self.offset,
            sizes: vec![self.num_elements()],
            strides: vec![1],
        })
    }

    /// Return the location of the provided coordinates.
    pub fn location(&self, coord: &[usize]) -> usize {
        self.offset
            + coord
                .iter()
                .zip(&self.strides)
                .map(|(pos, stride)| pos * stride)
                .sum::<usize>()
    }

    /// Iterator over the layout's buffer positions, in row-major order.
    pub fn iter(&self) -> LayoutIterator<'_> {
        LayoutIterator {
            layout: self,
            pos: CartesianIterator::new(self.sizes.clone()),
        }
    }
}

impl std::fmt::Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}+{:?}/{:?}",
            self.offset, self.sizes, self.strides
        )
    }
}

pub struct LayoutIterator<'a> {
    layout: &'a Layout,
    pos: CartesianIterator,
}

impl Iterator for LayoutIterator<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        self.pos.next().map(|pos| self.layout.location(&pos))
    }
}

/// Iterates over all coordinate tuples in an N-dimensional space.
///
/// Yields each point in row-major order for the shape defined by
/// `dims`, where each coordinate lies in `[0..dims[i])`.
pub(crate) struct CartesianIterator {
    dims: Vec<usize>,
    index: usize,
    total: usize,
}

impl CartesianIterator {
    pub(crate) fn new(dims: Vec<usize>) -> Self {
        let total = dims.iter().product();
        CartesianIterator {
            dims,
            index: 0,
            total,
        }
    }
}

impl Iterator for CartesianIterator {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.total {
            return None;
        }

        let mut result: Vec<usize> = vec![0; self.dims.len()];
        let mut rest = self.index;
        for (i, dim) in self.dims.iter().enumerate().rev() {
            result[i] = rest % dim;
            rest /= dim;
        }
        self.index += 1;
        Some(result)
    }
}
