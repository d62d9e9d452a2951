/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::sync::Arc;

use crate::buffer::Buffer;
use crate::buffer::Primitive;
use crate::buffer::PrimitiveKind;
use crate::buffer::Scalar;
use crate::content::Content;
use crate::content::RegularArray;
use crate::error::ContentError;
use crate::layout::Layout;
use crate::types::Type;
use crate::value::Value;

/// A run of primitive values: a shared buffer viewed through a strided
/// layout. Leaves with more than one dimension carry regular inner
/// dimensions of their own.
#[derive(Clone, Debug)]
pub struct Leaf {
    buffer: Buffer,
    layout: Layout,
}

impl Leaf {
    /// A leaf viewing `buffer` through `layout`. Every position the
    /// layout addresses must lie within the buffer.
    pub fn new(buffer: Buffer, layout: Layout) -> Result<Self, ContentError> {
        let leaf = Leaf { buffer, layout };
        leaf.validate()?;
        Ok(leaf)
    }

    /// A one-dimensional leaf over all of `data`.
    pub fn from_vec<T: Primitive>(data: Vec<T>) -> Self {
        Self::from_buffer(data.into())
    }

    /// A one-dimensional leaf over all of `buffer`.
    pub fn from_buffer(buffer: Buffer) -> Self {
        let layout = Layout::new_row_major(vec![buffer.len()]);
        Leaf { buffer, layout }
    }

    /// A row-major leaf of the given shape over `buffer`.
    pub fn with_shape(buffer: Buffer, sizes: Vec<usize>) -> Result<Self, ContentError> {
        Self::new(buffer, Layout::new_row_major(sizes))
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.buffer.kind()
    }

    pub fn len(&self) -> usize {
        self.layout.length()
    }

    pub fn ndim(&self) -> usize {
        self.layout.num_dim()
    }

    pub fn ty(&self) -> Type {
        self.layout.sizes()[1..]
            .iter()
            .rev()
            .fold(Type::Primitive(self.kind()), |inner, &size| {
                Type::Regular(Box::new(inner), size)
            })
    }

    /// The value at `i` of a one-dimensional leaf.
    pub fn scalar(&self, i: usize) -> Option<Scalar> {
        if self.ndim() != 1 || i >= self.len() {
            return None;
        }
        self.buffer.get(self.layout.location(&[i]))
    }

    /// Every value in row-major order.
    pub fn scalars(&self) -> impl Iterator<Item = Scalar> + '_ {
        self.layout
            .iter()
            .filter_map(move |pos| self.buffer.get(pos))
    }

    /// Row `i` of a leaf with two or more dimensions, as a view.
    pub fn row(&self, i: usize) -> Result<Leaf, ContentError> {
        Ok(Leaf {
            buffer: self.buffer.clone(),
            layout: self.layout.at(0, i)?,
        })
    }

    /// Entries `start..stop` as a view over the same buffer.
    pub fn getitem_range(&self, start: usize, stop: usize) -> Result<Leaf, ContentError> {
        Ok(Leaf {
            buffer: self.buffer.clone(),
            layout: self.layout.select(0, start, stop)?,
        })
    }

    /// Gather entries at `positions` into a new contiguous buffer.
    pub fn carry(&self, positions: &[usize]) -> Result<Leaf, ContentError> {
        let length = self.len();
        if let Some(&bad) = positions.iter().find(|&&p| p >= length) {
            return Err(ContentError::invalid(
                "Leaf",
                format!("carry position {} in leaf of length {}", bad, length),
            ));
        }
        let locations: Vec<usize> = if self.ndim() == 1 {
            positions
                .iter()
                .map(|&p| self.layout.location(&[p]))
                .collect()
        } else {
            let mut locations = Vec::new();
            for &p in positions {
                locations.extend(self.layout.at(0, p)?.iter());
            }
            locations
        };
        let mut sizes = self.layout.sizes().to_vec();
        sizes[0] = positions.len();
        Ok(Leaf {
            buffer: self.buffer.gather(locations),
            layout: Layout::new_row_major(sizes),
        })
    }

    /// Express the outermost inner dimension as a `RegularArray` over a
    /// leaf with one dimension fewer. Shares the buffer when the two
    /// outer dimensions can be merged, copies otherwise.
    pub fn to_regular(&self) -> Result<RegularArray, ContentError> {
        if self.ndim() < 2 {
            return Err(ContentError::invalid(
                "Leaf",
                "a one-dimensional leaf has no regular dimension",
            ));
        }
        let sizes = self.layout.sizes();
        let strides = self.layout.strides();
        let (length, size) = (sizes[0], sizes[1]);
        let merged = if strides[0] == size * strides[1] || length <= 1 {
            self.clone()
        } else {
            let all: Vec<usize> = (0..length).collect();
            self.carry(&all)?
        };
        let sizes = merged.layout.sizes();
        let strides = merged.layout.strides();
        let mut inner_sizes = vec![sizes[0] * sizes[1]];
        inner_sizes.extend_from_slice(&sizes[2..]);
        let inner_strides = strides[1..].to_vec();
        let inner = Leaf::new(
            merged.buffer.clone(),
            Layout::new(merged.layout.offset(), inner_sizes, inner_strides)?,
        )?;
        RegularArray::new(Arc::new(Content::Leaf(inner)), size, length)
    }

    pub fn to_value_at(&self, i: usize) -> Result<Value, ContentError> {
        if self.ndim() == 1 {
            return self
                .scalar(i)
                .map(Value::from)
                .ok_or_else(|| ContentError::invalid("Leaf", format!("no value at {}", i)));
        }
        let row = self.row(i)?;
        let values = (0..row.len())
            .map(|j| row.to_value_at(j))
            .collect::<Result<_, _>>()?;
        Ok(Value::List(values))
    }

    pub fn validate(&self) -> Result<(), ContentError> {
        if let Some(max) = self.layout.max_location() {
            if max >= self.buffer.len() {
                return Err(ContentError::invalid(
                    "Leaf",
                    format!(
                        "layout {} reaches position {} of a buffer of length {}",
                        self.layout,
                        max,
                        self.buffer.len()
                    ),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_is_a_view() {
        let leaf = Leaf::from_vec(vec![1.1, 2.2, 3.3, 4.4, 5.5]);
        let view = leaf.getitem_range(1, 4).unwrap();
        assert!(view.buffer().ptr_eq(leaf.buffer()));
        assert_eq!(view.len(), 3);
        assert_eq!(view.scalar(0), Some(Scalar::Float64(2.2)));
        assert_eq!(view.scalar(3), None);
    }

    #[test]
    fn test_carry_gathers() {
        let leaf = Leaf::from_vec(vec![0i64, 1, 2, 3, 4, 5]);
        let carried = leaf.carry(&[5, 0, 5]).unwrap();
        assert!(!carried.buffer().ptr_eq(leaf.buffer()));
        assert!(carried.scalars().eq([5i64, 0, 5].map(Scalar::Int64)));
        assert!(leaf.carry(&[6]).is_err());

        let matrix = Leaf::with_shape(Buffer::from(vec![0i64, 1, 2, 3, 4, 5]), vec![3, 2]).unwrap();
        let rows = matrix.carry(&[2, 0]).unwrap();
        assert_eq!(rows.layout().sizes(), &[2, 2]);
        assert!(rows.scalars().eq([4i64, 5, 0, 1].map(Scalar::Int64)));
    }

    #[test]
    fn test_ty() {
        let leaf = Leaf::with_shape(Buffer::from(vec![0i64; 30]), vec![2, 3, 5]).unwrap();
        assert_eq!(leaf.ty().to_string(), "3 * 5 * int64");
        assert_eq!(leaf.len(), 2);
    }

    #[test]
    fn test_to_regular() {
        let leaf = Leaf::with_shape(Buffer::from(vec![0i64, 1, 2, 3, 4, 5]), vec![2, 3]).unwrap();
        let regular = leaf.to_regular().unwrap();
        assert_eq!(regular.size(), 3);
        assert_eq!(regular.len(), 2);
        let Content::Leaf(inner) = regular.content().as_ref() else {
            panic!("expected a leaf");
        };
        assert!(inner.buffer().ptr_eq(leaf.buffer()));
        assert_eq!(inner.len(), 6);

        // A column view cannot merge, so it is copied.
        let column = Leaf::with_shape(Buffer::from(vec![0i64, 1, 2, 3, 4, 5]), vec![2, 3])
            .unwrap();
        let strided = Leaf::new(
            column.buffer().clone(),
            Layout::new(0, vec![3, 1], vec![2, 1]).unwrap(),
        )
        .unwrap();
        let regular = strided.to_regular().unwrap();
        assert_eq!(regular.len(), 3);
        assert_eq!(regular.size(), 1);
    }

    #[test]
    fn test_validate() {
        let bad = Leaf::new(
            Buffer::from(vec![1u8, 2, 3]),
            Layout::new(1, vec![3], vec![1]).unwrap(),
        );
        assert!(bad.is_err());
        assert_eq!(
            Leaf::from_vec(vec![true, false]).to_value_at(1).unwrap(),
            Value::Bool(false)
        );
    }
}
