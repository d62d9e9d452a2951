/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Applying canonical slices to content trees.
//!
//! [`apply`] wraps the content in a single regular list whose one
//! entry is the whole array, and hands the items to `getitem_next`.
//! From there every call has the same shape: `getitem_next(node,
//! items, adv)` applies the items to each entry of `node` and returns
//! a node of the same length. List nodes consume one item per call;
//! records hand the items to each field; options and unions hand them
//! to the entries they hold.
//!
//! `adv` pairs array items with each other the way NumPy does: once
//! an integer array has been applied, later integer arrays select the
//! entry at the same position instead of adding a dimension. `adv[j]`
//! is that position for entry `j`.

use std::borrow::Cow;

use tracing::trace;

use crate::content::Content;
use crate::content::ContentRef;
use crate::content::Element;
use crate::content::ListArray;
use crate::content::OptionArray;
use crate::content::RecordArray;
use crate::content::RegularArray;
use crate::content::UnionArray;
use crate::error::SliceError;
use crate::slice::Range;
use crate::slice::SliceItem;

/// Apply resolved `items` to `content`.
pub fn apply(content: &ContentRef, items: &[SliceItem]) -> Result<Element, SliceError> {
    check_conflicts(items)?;
    for item in items {
        item.check_offsets()?;
    }
    trace!(node = content.kind_name(), ?items, "applying slice");
    let wrapped: ContentRef = RegularArray::new(content.clone(), content.len(), 1)?.into();
    let out = getitem_next(&wrapped, items, None)?;
    Ok(out.element(0)?)
}

/// Reject array items separated by a basic item: `[mask, 0, mask]`
/// has no well-defined meaning once a dimension is ragged.
pub fn check_conflicts(items: &[SliceItem]) -> Result<(), SliceError> {
    let mut seen_advanced = false;
    let mut separated = false;
    for item in items {
        if item.is_advanced() {
            if separated {
                return Err(SliceError::AdvancedIndexingConflict);
            }
            seen_advanced = true;
        } else if item.is_basic() && seen_advanced {
            separated = true;
        }
    }
    Ok(())
}

pub(crate) fn getitem_next(
    node: &ContentRef,
    items: &[SliceItem],
    adv: Option<&[usize]>,
) -> Result<ContentRef, SliceError> {
    let Some((head, tail)) = items.split_first() else {
        return Ok(node.clone());
    };
    match (head, node.as_ref()) {
        (_, Content::Lazy(lazy)) => getitem_next(&lazy.materialize()?, items, adv),
        (SliceItem::NewAxis, _) => {
            Ok(RegularArray::new(getitem_next(node, tail, adv)?, 1, node.len())?.into())
        }
        (SliceItem::Field(key), _) => getitem_next(&node.getitem_field(key)?, tail, adv),
        (SliceItem::Fields(keys), _) => getitem_next(&node.getitem_fields(keys)?, tail, adv),
        (_, Content::Record(record)) => record_next(node, record, head, tail, adv),
        (SliceItem::Ellipsis, _) => ellipsis_next(node, tail, adv),
        (_, Content::Leaf(leaf)) if leaf.ndim() >= 2 => {
            let regular: ContentRef = leaf.to_regular()?.into();
            getitem_next(&regular, items, adv)
        }
        (_, Content::Leaf(_)) => Err(SliceError::too_many_dimensions("Leaf")),
        (_, Content::Regular(array)) => Lists::regular(array).getitem(head, tail, adv),
        (_, Content::List(array)) => Lists::list(array).getitem(head, tail, adv),
        (_, Content::Option(array)) => option_next(array, items, adv),
        (_, Content::Union(array)) => union_next(array, items, adv),
    }
}

/// Expand `...` into as many full ranges as it takes for `tail` to
/// reach the innermost dimensions.
fn ellipsis_next(
    node: &ContentRef,
    tail: &[SliceItem],
    adv: Option<&[usize]>,
) -> Result<ContentRef, SliceError> {
    let (min, max) = node.minmax_depth();
    let (min, max) = (min - 1, max - 1);
    let dims: usize = tail.iter().map(SliceItem::dimlength).sum();
    if tail.is_empty() || (min == dims && max == dims) {
        return getitem_next(node, tail, adv);
    }
    if min == dims || max == dims {
        return Err(SliceError::mismatch(
            "an ellipsis (...) cannot be used on a structure of different depths",
        ));
    }
    if min < dims {
        return getitem_next(node, tail, adv);
    }
    let mut items = vec![SliceItem::Range(Range::full()), SliceItem::Ellipsis];
    items.extend_from_slice(tail);
    getitem_next(node, &items, adv)
}

/// True if `item` selects fields this record has.
fn selects_from(record: &RecordArray, item: &SliceItem) -> bool {
    match item {
        SliceItem::Field(key) => record.field_index(key).is_some(),
        SliceItem::Fields(keys) => keys.iter().all(|k| record.field_index(k).is_some()),
        _ => false,
    }
}

/// `items` with the item at `at` moved to the front.
fn hoisted(items: &[SliceItem], at: usize) -> Vec<SliceItem> {
    let mut out = Vec::with_capacity(items.len());
    out.push(items[at].clone());
    out.extend_from_slice(&items[..at]);
    out.extend_from_slice(&items[at + 1..]);
    out
}

fn record_next(
    node: &ContentRef,
    record: &RecordArray,
    head: &SliceItem,
    tail: &[SliceItem],
    adv: Option<&[usize]>,
) -> Result<ContentRef, SliceError> {
    // Selecting this record's fields commutes with positions applied
    // to every field, so do it first.
    if let Some(at) = tail.iter().position(|item| selects_from(record, item)) {
        let mut items = vec![head.clone()];
        items.extend_from_slice(tail);
        return getitem_next(node, &hoisted(&items, at + 1), adv);
    }
    let items = std::iter::once(head.clone())
        .chain(tail.iter().cloned())
        .collect::<Vec<_>>();
    let fields = record
        .fields()
        .iter()
        .map(|field| getitem_next(field, &items, adv))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(record.with_fields(fields, record.len())?.into())
}

fn option_next(
    array: &OptionArray,
    items: &[SliceItem],
    adv: Option<&[usize]>,
) -> Result<ContentRef, SliceError> {
    let (positions, outindex) = array.project();
    let next = array.content().carry_or_view(&positions)?;
    let nextadv = adv.map(|a| {
        outindex
            .iter()
            .zip(a)
            .filter(|&(&o, _)| o >= 0)
            .map(|(_, &p)| p)
            .collect::<Vec<_>>()
    });
    let inner = getitem_next(&next, items, nextadv.as_deref())?;
    Ok(OptionArray::indexed(outindex, inner)?.into())
}

fn union_next(
    array: &UnionArray,
    items: &[SliceItem],
    adv: Option<&[usize]>,
) -> Result<ContentRef, SliceError> {
    let mut index = vec![0usize; array.len()];
    let mut contents = Vec::with_capacity(array.contents().len());
    for ((entries, positions), branch) in array.split().into_iter().zip(array.contents()) {
        // A branch no entry selects may be too shallow for `items`.
        if entries.is_empty() {
            contents.push(branch.getitem_range(0, 0)?);
            continue;
        }
        for (rank, &i) in entries.iter().enumerate() {
            index[i] = rank;
        }
        let next = branch.carry_or_view(&positions)?;
        let nextadv = adv.map(|a| entries.iter().map(|&i| a[i]).collect::<Vec<_>>());
        contents.push(getitem_next(&next, items, nextadv.as_deref())?);
    }
    Ok(UnionArray::new(array.tags().clone(), index, contents)?.into())
}

/// Resolve a possibly negative position in a list of `length`.
fn resolve_index(at: i64, length: usize) -> Result<usize, SliceError> {
    let i = if at < 0 { at + length as i64 } else { at };
    if i < 0 || i >= length as i64 {
        return Err(SliceError::out_of_range(at, length, "list"));
    }
    Ok(i as usize)
}

/// The lists of a regular or ragged list node, with explicit bounds.
struct Lists<'a> {
    starts: Cow<'a, [usize]>,
    stops: Cow<'a, [usize]>,
    content: &'a ContentRef,
    /// Set for regular lists, whose results stay regular.
    size: Option<usize>,
}

impl<'a> Lists<'a> {
    fn regular(array: &'a RegularArray) -> Self {
        let size = array.size();
        Lists {
            starts: Cow::Owned((0..array.len()).map(|j| j * size).collect()),
            stops: Cow::Owned((0..array.len()).map(|j| (j + 1) * size).collect()),
            content: array.content(),
            size: Some(size),
        }
    }

    fn list(array: &'a ListArray) -> Self {
        Lists {
            starts: Cow::Borrowed(array.starts().as_slice()),
            stops: Cow::Borrowed(array.stops().as_slice()),
            content: array.content(),
            size: None,
        }
    }

    fn len(&self) -> usize {
        self.starts.len()
    }

    fn entry_len(&self, j: usize) -> usize {
        self.stops[j] - self.starts[j]
    }

    fn getitem(
        &self,
        head: &SliceItem,
        tail: &[SliceItem],
        adv: Option<&[usize]>,
    ) -> Result<ContentRef, SliceError> {
        match head {
            SliceItem::At(at) => {
                let positions = (0..self.len())
                    .map(|j| Ok(self.starts[j] + resolve_index(*at, self.entry_len(j))?))
                    .collect::<Result<Vec<_>, SliceError>>()?;
                let next = self.content.carry_or_view(&positions)?;
                getitem_next(&next, tail, adv)
            }
            SliceItem::Range(range) => self.range(range, tail, adv),
            SliceItem::Bools(mask) => {
                if let Some(j) = (0..self.len()).find(|&j| self.entry_len(j) != mask.len()) {
                    return Err(SliceError::OutOfRange {
                        reason: format!(
                            "boolean array of length {} applied to a list of length {}",
                            mask.len(),
                            self.entry_len(j)
                        ),
                    });
                }
                let ix: Vec<i64> = mask
                    .iter()
                    .enumerate()
                    .filter(|&(_, &b)| b)
                    .map(|(i, _)| i as i64)
                    .collect();
                self.indices(&ix, tail, adv)
            }
            SliceItem::Indices(ix) => self.indices(ix, tail, adv),
            SliceItem::Missing(ix) => self.missing(ix, tail, adv),
            SliceItem::Jagged { offsets, content } => self.jagged(offsets, content, tail, adv),
            other => Err(SliceError::invalid_slice(format!(
                "{:?} cannot select from a list",
                other
            ))),
        }
    }

    fn range(
        &self,
        range: &Range,
        tail: &[SliceItem],
        adv: Option<&[usize]>,
    ) -> Result<ContentRef, SliceError> {
        let length = self.len();
        if self.size.is_none() && range.step == 1 && tail.is_empty() {
            // Narrow the bounds; the content stays as it is.
            let mut starts = Vec::with_capacity(length);
            let mut stops = Vec::with_capacity(length);
            for j in 0..length {
                let (start, _, count) = range.resolve(self.entry_len(j))?;
                starts.push(self.starts[j] + start as usize);
                stops.push(self.starts[j] + start as usize + count);
            }
            return Ok(ListArray::new(starts.into(), stops.into(), self.content.clone())?.into());
        }

        let mut offsets = Vec::with_capacity(length + 1);
        offsets.push(0);
        let mut nextcarry = Vec::new();
        let mut nextadv = adv.map(|_| Vec::new());
        for j in 0..length {
            let before = nextcarry.len();
            nextcarry.extend(range.positions(self.entry_len(j))?.map(|p| self.starts[j] + p));
            if let (Some(a), Some(nextadv)) = (adv, nextadv.as_mut()) {
                nextadv.extend(std::iter::repeat(a[j]).take(nextcarry.len() - before));
            }
            offsets.push(nextcarry.len());
        }
        let next = self.content.carry_or_view(&nextcarry)?;
        let inner = getitem_next(&next, tail, nextadv.as_deref())?;
        Ok(match self.size {
            Some(size) => {
                let (_, _, count) = range.resolve(size)?;
                RegularArray::new(inner, count, length)?.into()
            }
            None => ListArray::from_offsets(offsets, inner)?.into(),
        })
    }

    fn indices(
        &self,
        ix: &[i64],
        tail: &[SliceItem],
        adv: Option<&[usize]>,
    ) -> Result<ContentRef, SliceError> {
        let length = self.len();
        match adv {
            None => {
                let mut nextcarry = Vec::with_capacity(length * ix.len());
                for j in 0..length {
                    for &x in ix {
                        nextcarry.push(self.starts[j] + resolve_index(x, self.entry_len(j))?);
                    }
                }
                let nextadv: Vec<usize> = (0..length).flat_map(|_| 0..ix.len()).collect();
                let next = self.content.carry_or_view(&nextcarry)?;
                let inner = getitem_next(&next, tail, Some(&nextadv))?;
                Ok(RegularArray::new(inner, ix.len(), length)?.into())
            }
            Some(a) => {
                let positions = (0..length)
                    .map(|j| {
                        let x = paired(ix, a[j])?;
                        Ok(self.starts[j] + resolve_index(*x, self.entry_len(j))?)
                    })
                    .collect::<Result<Vec<_>, SliceError>>()?;
                let next = self.content.carry_or_view(&positions)?;
                getitem_next(&next, tail, Some(a))
            }
        }
    }

    fn missing(
        &self,
        ix: &[Option<i64>],
        tail: &[SliceItem],
        adv: Option<&[usize]>,
    ) -> Result<ContentRef, SliceError> {
        let length = self.len();
        let mut nextcarry = Vec::new();
        let mut nextadv = Vec::new();
        let mut outindex: Vec<i64> = Vec::new();
        let mut take = |j: usize, k: usize, x: &Option<i64>| -> Result<(), SliceError> {
            match x {
                Some(x) => {
                    outindex.push(nextcarry.len() as i64);
                    nextcarry.push(self.starts[j] + resolve_index(*x, self.entry_len(j))?);
                    nextadv.push(k);
                }
                None => outindex.push(-1),
            }
            Ok(())
        };
        match adv {
            None => {
                for j in 0..length {
                    for (k, x) in ix.iter().enumerate() {
                        take(j, k, x)?;
                    }
                }
            }
            Some(a) => {
                for j in 0..length {
                    take(j, a[j], paired(ix, a[j])?)?;
                }
            }
        }
        let next = self.content.carry_or_view(&nextcarry)?;
        let inner = getitem_next(&next, tail, Some(&nextadv))?;
        let option: ContentRef = OptionArray::indexed(outindex, inner)?.into();
        Ok(match adv {
            None => RegularArray::new(option, ix.len(), length)?.into(),
            Some(_) => option,
        })
    }

    fn jagged(
        &self,
        offsets: &[usize],
        content: &SliceItem,
        tail: &[SliceItem],
        adv: Option<&[usize]>,
    ) -> Result<ContentRef, SliceError> {
        if adv.is_some() {
            return Err(SliceError::invalid_slice(
                "a nested array cannot be paired with other arrays in the same slice",
            ));
        }
        let Some(count) = offsets.len().checked_sub(1) else {
            return Err(SliceError::invalid_slice("a nested array needs offsets"));
        };
        let length = self.len();
        if let Some(j) = (0..length).find(|&j| self.entry_len(j) != count) {
            return Err(SliceError::broadcast(format!(
                "nested array of length {} cannot slice a list of length {}",
                count,
                self.entry_len(j)
            )));
        }
        let slicestarts: Vec<usize> = (0..length)
            .flat_map(|_| offsets[..count].iter().copied())
            .collect();
        let slicestops: Vec<usize> = (0..length)
            .flat_map(|_| offsets[1..].iter().copied())
            .collect();
        match self.size {
            Some(size) => {
                let next = self.content.getitem_range(0, length * size)?;
                let inner = jagged_next(&next, &slicestarts, &slicestops, content, tail)?;
                Ok(RegularArray::new(inner, size, length)?.into())
            }
            None => {
                let mut nextcarry = Vec::new();
                let mut nextoffsets = Vec::with_capacity(length + 1);
                nextoffsets.push(0);
                for j in 0..length {
                    nextcarry.extend(self.starts[j]..self.stops[j]);
                    nextoffsets.push(nextcarry.len());
                }
                let next = self.content.carry_or_view(&nextcarry)?;
                let inner = jagged_next(&next, &slicestarts, &slicestops, content, tail)?;
                Ok(ListArray::from_offsets(nextoffsets, inner)?.into())
            }
        }
    }
}

/// Entry `at` of an array item paired with an earlier one.
fn paired<T>(ix: &[T], at: usize) -> Result<&T, SliceError> {
    ix.get(at).ok_or_else(|| {
        SliceError::broadcast(format!(
            "cannot pair entry {} with an array of length {}",
            at,
            ix.len()
        ))
    })
}

/// Slice entry `i` of `node` by `content[slicestarts[i]..slicestops[i]]`,
/// then apply `tail` inside the selected entries.
fn jagged_next(
    node: &ContentRef,
    slicestarts: &[usize],
    slicestops: &[usize],
    content: &SliceItem,
    tail: &[SliceItem],
) -> Result<ContentRef, SliceError> {
    match node.as_ref() {
        Content::Lazy(lazy) => {
            jagged_next(&lazy.materialize()?, slicestarts, slicestops, content, tail)
        }
        Content::Leaf(leaf) if leaf.ndim() >= 2 => {
            let regular: ContentRef = leaf.to_regular()?.into();
            jagged_next(&regular, slicestarts, slicestops, content, tail)
        }
        Content::Leaf(_) => Err(SliceError::too_many_dimensions("Leaf")),
        Content::Regular(array) => {
            let list: ContentRef = array.to_list()?.into();
            jagged_next(&list, slicestarts, slicestops, content, tail)
        }
        Content::List(array) => jagged_list(array, slicestarts, slicestops, content, tail),
        Content::Option(array) => {
            let (positions, outindex) = array.project();
            let valid = |bounds: &[usize]| -> Vec<usize> {
                bounds
                    .iter()
                    .zip(&outindex)
                    .filter(|&(_, &o)| o >= 0)
                    .map(|(&b, _)| b)
                    .collect()
            };
            let (starts, stops) = (valid(slicestarts), valid(slicestops));
            let next = array.content().carry_or_view(&positions)?;
            let inner = jagged_next(&next, &starts, &stops, content, tail)?;
            Ok(OptionArray::indexed(outindex, inner)?.into())
        }
        Content::Record(record) => {
            if let Some(at) = tail.iter().position(|item| selects_from(record, item)) {
                let projected = match &tail[at] {
                    SliceItem::Field(key) => node.getitem_field(key)?,
                    SliceItem::Fields(keys) => node.getitem_fields(keys)?,
                    _ => node.clone(),
                };
                let rest = hoisted(tail, at);
                return jagged_next(&projected, slicestarts, slicestops, content, &rest[1..]);
            }
            let fields = record
                .fields()
                .iter()
                .map(|field| jagged_next(field, slicestarts, slicestops, content, tail))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(record.with_fields(fields, record.len())?.into())
        }
        Content::Union(array) => {
            let mut index = vec![0usize; array.len()];
            let mut contents = Vec::with_capacity(array.contents().len());
            for ((entries, positions), branch) in array.split().into_iter().zip(array.contents())
            {
                if entries.is_empty() {
                    contents.push(branch.getitem_range(0, 0)?);
                    continue;
                }
                for (rank, &i) in entries.iter().enumerate() {
                    index[i] = rank;
                }
                let starts: Vec<usize> = entries.iter().map(|&i| slicestarts[i]).collect();
                let stops: Vec<usize> = entries.iter().map(|&i| slicestops[i]).collect();
                let next = branch.carry_or_view(&positions)?;
                contents.push(jagged_next(&next, &starts, &stops, content, tail)?);
            }
            Ok(UnionArray::new(array.tags().clone(), index, contents)?.into())
        }
    }
}

fn jagged_list(
    array: &ListArray,
    slicestarts: &[usize],
    slicestops: &[usize],
    content: &SliceItem,
    tail: &[SliceItem],
) -> Result<ContentRef, SliceError> {
    let n = array.len();
    let start = |i: usize| array.starts()[i];
    let len = |i: usize| array.stops()[i] - array.starts()[i];
    let mut nextcarry = Vec::new();
    let mut offsets = Vec::with_capacity(n + 1);
    offsets.push(0);
    match content {
        SliceItem::Bools(mask) => {
            let mut local = Vec::new();
            for i in 0..n {
                let sub = &mask[slicestarts[i]..slicestops[i]];
                if sub.len() != len(i) {
                    return Err(SliceError::OutOfRange {
                        reason: format!(
                            "boolean array of length {} applied to a list of length {}",
                            sub.len(),
                            len(i)
                        ),
                    });
                }
                local.extend(
                    sub.iter()
                        .enumerate()
                        .filter(|&(_, &b)| b)
                        .map(|(k, _)| k as i64),
                );
                offsets.push(local.len());
            }
            jagged_list(
                array,
                &offsets[..n],
                &offsets[1..],
                &SliceItem::Indices(local),
                tail,
            )
        }
        SliceItem::Indices(ix) => {
            for i in 0..n {
                for &x in &ix[slicestarts[i]..slicestops[i]] {
                    nextcarry.push(start(i) + resolve_index(x, len(i))?);
                }
                offsets.push(nextcarry.len());
            }
            let next = array.content().carry_or_view(&nextcarry)?;
            let inner = getitem_next(&next, tail, None)?;
            Ok(ListArray::from_offsets(offsets, inner)?.into())
        }
        SliceItem::Missing(ix) => {
            let mut outindex: Vec<i64> = Vec::new();
            for i in 0..n {
                for x in &ix[slicestarts[i]..slicestops[i]] {
                    match x {
                        Some(x) => {
                            outindex.push(nextcarry.len() as i64);
                            nextcarry.push(start(i) + resolve_index(*x, len(i))?);
                        }
                        None => outindex.push(-1),
                    }
                }
                offsets.push(outindex.len());
            }
            let next = array.content().carry_or_view(&nextcarry)?;
            let inner = getitem_next(&next, tail, None)?;
            let option: ContentRef = OptionArray::indexed(outindex, inner)?.into();
            Ok(ListArray::from_offsets(offsets, option)?.into())
        }
        SliceItem::Jagged {
            offsets: inner_offsets,
            content: inner_content,
        } => {
            let mut nextstarts = Vec::new();
            let mut nextstops = Vec::new();
            for i in 0..n {
                let count = slicestops[i] - slicestarts[i];
                if count != len(i) {
                    return Err(SliceError::broadcast(format!(
                        "nested array of length {} cannot slice a list of length {}",
                        count,
                        len(i)
                    )));
                }
                nextcarry.extend(start(i)..start(i) + len(i));
                offsets.push(nextcarry.len());
                for k in slicestarts[i]..slicestops[i] {
                    nextstarts.push(inner_offsets[k]);
                    nextstops.push(inner_offsets[k + 1]);
                }
            }
            let next = array.content().carry_or_view(&nextcarry)?;
            let inner = jagged_next(&next, &nextstarts, &nextstops, inner_content, tail)?;
            Ok(ListArray::from_offsets(offsets, inner)?.into())
        }
        other => Err(SliceError::invalid_slice(format!(
            "{:?} cannot appear inside a nested array",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::buffer::Buffer;
    use crate::builder::ArrayBuilder;
    use crate::content::LazyArray;
    use crate::content::Leaf;
    use crate::slice::Where;
    use crate::slice::normalize;
    use crate::value::Value;

    fn array(value: serde_json::Value) -> ContentRef {
        let values: Vec<Value> = serde_json::from_value(value).unwrap();
        ArrayBuilder::from_values(&values).unwrap()
    }

    fn get(content: &ContentRef, items: &[SliceItem]) -> Result<serde_json::Value, SliceError> {
        let value = apply(content, items)?.to_value()?;
        Ok(serde_json::to_value(value).unwrap())
    }

    fn mask(value: serde_json::Value) -> SliceItem {
        normalize(&Where::Array(serde_json::from_value(value).unwrap()))
            .unwrap()
            .remove(0)
    }

    fn all() -> SliceItem {
        SliceItem::Range(Range::full())
    }

    fn range(start: Option<i64>, stop: Option<i64>, step: i64) -> SliceItem {
        SliceItem::Range(Range::new(start, stop, step))
    }

    #[test]
    fn test_at() {
        let a = array(json!([1.1, 2.2, 3.3]));
        assert_eq!(get(&a, &[SliceItem::At(-1)]).unwrap(), json!(3.3));
        assert_eq!(get(&a, &[SliceItem::At(0)]).unwrap(), json!(1.1));
        assert!(matches!(
            get(&a, &[SliceItem::At(3)]),
            Err(SliceError::OutOfRange { .. })
        ));
        assert!(matches!(
            get(&a, &[SliceItem::At(0), SliceItem::At(0)]),
            Err(SliceError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_at_per_entry() {
        let a = array(json!([[1, 2, 3], [4, 5]]));
        assert_eq!(get(&a, &[all(), SliceItem::At(-1)]).unwrap(), json!([3, 5]));
        assert_eq!(get(&a, &[all(), SliceItem::At(0)]).unwrap(), json!([1, 4]));
        // The second list is too short.
        assert!(matches!(
            get(&a, &[all(), SliceItem::At(2)]),
            Err(SliceError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_range_per_entry() {
        let a = array(json!([[1, 2, 3], [], [4, 5]]));
        assert_eq!(
            get(&a, &[all(), range(Some(1), None, 1)]).unwrap(),
            json!([[2, 3], [], [5]])
        );
        assert_eq!(
            get(&a, &[range(None, None, -1), range(None, None, -1)]).unwrap(),
            json!([[5, 4], [], [3, 2, 1]])
        );
        assert_eq!(
            get(&a, &[range(Some(-2), None, 1), range(Some(5), Some(9), 1)]).unwrap(),
            json!([[], []])
        );
        assert_eq!(
            get(&a, &[range(None, None, 0)]).unwrap_err(),
            SliceError::StepZero
        );
    }

    #[test]
    fn test_multidimensional_leaf() {
        let leaf = Leaf::with_shape(Buffer::from((0..6i64).collect::<Vec<_>>()), vec![2, 3]).unwrap();
        let a: ContentRef = leaf.into();
        assert_eq!(get(&a, &[all(), SliceItem::At(1)]).unwrap(), json!([1, 4]));
        assert_eq!(
            get(&a, &[SliceItem::At(1), range(None, None, -1)]).unwrap(),
            json!([5, 4, 3])
        );
        assert_eq!(
            get(&a, &[all(), range(Some(1), None, 1)]).unwrap(),
            json!([[1, 2], [4, 5]])
        );
        assert!(matches!(
            get(&a, &[all(), all(), all()]),
            Err(SliceError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_fields() {
        let a = array(json!([
            [{"x": 1.1, "y": [1]}, {"x": 2.2, "y": [2, 2]}],
            [{"x": 3.3, "y": [3, 3, 3]}],
            [{"x": 0.0, "y": []}, {"x": 1.1, "y": [1, 1, 1]}],
        ]));
        let x = SliceItem::Field("x".to_string());
        assert_eq!(
            get(&a, &[SliceItem::At(2), all(), x.clone()]).unwrap(),
            json!([0.0, 1.1])
        );
        assert_eq!(
            get(&a, &[x.clone(), SliceItem::At(2)]).unwrap(),
            json!([0.0, 1.1])
        );
        assert_eq!(
            get(&a, &[all(), SliceItem::At(0), SliceItem::Field("y".to_string())]).unwrap(),
            json!([[1], [3, 3, 3], []])
        );
        assert_eq!(
            get(&a, &[SliceItem::At(0), SliceItem::Fields(vec!["y".to_string()])]).unwrap(),
            json!([{"y": [1]}, {"y": [2, 2]}])
        );
    }

    #[test]
    fn test_positions_then_own_field() {
        let a = array(json!([{"x": [1, 2], "y": [3]}, {"x": [4], "y": []}]));
        assert_eq!(
            get(&a, &[all(), range(None, Some(1), 1), SliceItem::Field("x".to_string())])
                .unwrap(),
            json!([[1], [4]])
        );
    }

    #[test]
    fn test_option_indexing() {
        let a = array(json!([1.1, 2.2, 3.3, 4.4, 5.5, 6.6, 7.7, 8.8, 9.9]));
        assert_eq!(
            get(&a, &[mask(json!([0, 1, null, null, 7, 8]))]).unwrap(),
            json!([1.1, 2.2, null, null, 8.8, 9.9])
        );
        assert_eq!(
            get(&a, &[mask(json!([true, null, false, true, false, false, false, false, false]))]).unwrap(),
            json!([1.1, null, 4.4])
        );
    }

    #[test]
    fn test_missing_per_entry() {
        let a = array(json!([[0, 1, 2], [3, 4, 5]]));
        assert_eq!(
            get(&a, &[all(), mask(json!([2, null]))]).unwrap(),
            json!([[2, null], [5, null]])
        );
    }

    #[test]
    fn test_through_options() {
        let a = array(json!([[1, 2], null, [3]]));
        assert_eq!(
            get(&a, &[all(), SliceItem::At(0)]).unwrap(),
            json!([1, null, 3])
        );
        assert_eq!(
            get(&a, &[all(), range(Some(1), None, 1)]).unwrap(),
            json!([[2], null, []])
        );
    }

    #[test]
    fn test_nested_bools() {
        let a = array(json!([[[0.0, 1.1, 2.2], [], [3.3, 4.4]], [], [[5.5]]]));
        let slice = mask(json!([[[false, true, false], [], [true, false]], [], [[false]]]));
        assert_eq!(
            get(&a, &[slice]).unwrap(),
            json!([[[1.1], [], [3.3]], [], [[]]])
        );
    }

    #[test]
    fn test_nested_indices() {
        let a = array(json!([[1, 2, 3], [], [4, 5]]));
        assert_eq!(
            get(&a, &[mask(json!([[2, 0, 0], [], [-1]]))]).unwrap(),
            json!([[3, 1, 1], [], [5]])
        );
        assert_eq!(
            get(&a, &[mask(json!([[2, null], [], [null]]))]).unwrap(),
            json!([[3, null], [], [null]])
        );
        assert!(matches!(
            get(&a, &[mask(json!([[0], []]))]),
            Err(SliceError::Broadcast { .. })
        ));
    }

    #[test]
    fn test_paired_arrays() {
        let a = array(json!([[0, 1, 2], [3, 4, 5]]));
        assert_eq!(
            get(&a, &[SliceItem::Indices(vec![0, 1]), SliceItem::Indices(vec![2, 0])]).unwrap(),
            json!([2, 3])
        );
        assert_eq!(
            get(&a, &[SliceItem::Indices(vec![1, 0]), all()]).unwrap(),
            json!([[3, 4, 5], [0, 1, 2]])
        );
        assert!(matches!(
            get(&a, &[SliceItem::Indices(vec![0, 1]), SliceItem::Indices(vec![2])]),
            Err(SliceError::Broadcast { .. })
        ));
    }

    #[test]
    fn test_bools_length() {
        let a = array(json!([1, 2, 3]));
        assert_eq!(
            get(&a, &[SliceItem::Bools(vec![true, false, true])]).unwrap(),
            json!([1, 3])
        );
        assert!(matches!(
            get(&a, &[SliceItem::Bools(vec![true])]),
            Err(SliceError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_conflicts() {
        let b = SliceItem::Bools(vec![true]);
        for k in [-1, 0, 3] {
            assert_eq!(
                check_conflicts(&[b.clone(), SliceItem::At(k), b.clone()]),
                Err(SliceError::AdvancedIndexingConflict)
            );
        }
        assert!(check_conflicts(&[b.clone(), b.clone(), SliceItem::At(0)]).is_ok());
        assert!(check_conflicts(&[SliceItem::At(0), b.clone(), b.clone()]).is_ok());
        assert!(
            check_conflicts(&[b.clone(), SliceItem::Field("x".to_string()), b.clone()]).is_ok()
        );
    }

    #[test]
    fn test_newaxis_and_ellipsis() {
        let a = array(json!([1, 2, 3]));
        assert_eq!(get(&a, &[SliceItem::NewAxis]).unwrap(), json!([[1, 2, 3]]));
        assert_eq!(
            get(&a, &[all(), SliceItem::NewAxis]).unwrap(),
            json!([[1], [2], [3]])
        );

        let a = array(json!([[[1, 2], [3]], [[4]]]));
        assert_eq!(
            get(&a, &[SliceItem::Ellipsis, SliceItem::At(0)]).unwrap(),
            json!([[1, 3], [4]])
        );
        assert_eq!(
            get(&a, &[SliceItem::At(0), SliceItem::Ellipsis]).unwrap(),
            json!([[1, 2], [3]])
        );

        let a = array(json!([[1, [2]]]));
        assert!(matches!(
            get(&a, &[SliceItem::Ellipsis, SliceItem::At(0)]),
            Err(SliceError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_union_branches() {
        let ints: ContentRef = ListArray::from_offsets(
            vec![0, 2, 3],
            Leaf::from_vec(vec![1i64, 2, 3]).into(),
        )
        .unwrap()
        .into();
        let floats: ContentRef =
            ListArray::from_offsets(vec![0, 1], Leaf::from_vec(vec![1.5]).into())
                .unwrap()
                .into();
        let a: ContentRef = UnionArray::new(vec![0u8, 1, 0], vec![0usize, 0, 1], vec![ints, floats])
            .unwrap()
            .into();
        assert_eq!(
            get(&a, &[all(), SliceItem::At(0)]).unwrap(),
            json!([1, 1.5, 3])
        );
        assert_eq!(
            get(&a, &[range(Some(1), None, 1), SliceItem::At(-1)]).unwrap(),
            json!([1.5, 3])
        );
    }

    #[test]
    fn test_malformed_nested_items() {
        let a = array(json!([[1, 2], [3]]));
        let jagged = |offsets: Vec<usize>, content: SliceItem| SliceItem::Jagged {
            offsets,
            content: Box::new(content),
        };
        for item in [
            jagged(vec![0, 5, 6], SliceItem::Indices(vec![0])),
            jagged(vec![], SliceItem::Indices(vec![])),
            jagged(vec![1, 1, 1], SliceItem::Indices(vec![])),
            jagged(vec![0, 2, 1], SliceItem::Indices(vec![0])),
            jagged(vec![0, 1, 1], SliceItem::At(0)),
            jagged(
                vec![0, 1, 2],
                jagged(vec![0, 9, 2], SliceItem::Bools(vec![true, false])),
            ),
        ] {
            assert!(
                matches!(get(&a, &[item.clone()]), Err(SliceError::InvalidSlice { .. })),
                "{:?}",
                item
            );
        }
        assert_eq!(
            get(&a, &[jagged(vec![0, 1, 2], SliceItem::Indices(vec![-1, 0]))]).unwrap(),
            json!([[2], [3]])
        );
    }

    #[test]
    fn test_union_of_depths() {
        let a = array(json!([1, [2, 3], 4.5]));
        let Element::Array(second) = apply(&a, &[SliceItem::At(1)]).unwrap() else {
            panic!("expected an array");
        };
        assert_eq!(get(&second, &[SliceItem::At(0)]).unwrap(), json!(2));
        assert_eq!(get(&a, &[SliceItem::At(1), SliceItem::At(0)]).unwrap(), json!(2));
        assert_eq!(
            get(&a, &[range(Some(1), Some(2), 1), SliceItem::At(-1)]).unwrap(),
            json!([3])
        );
        // Only the scalar entries are too shallow.
        assert!(matches!(
            get(&a, &[all(), SliceItem::At(0)]),
            Err(SliceError::OutOfRange { .. })
        ));

        let a = array(json!([[1, 2], 5]));
        let Element::Array(lists) = apply(&a, &[range(Some(0), Some(1), 1)]).unwrap() else {
            panic!("expected an array");
        };
        assert_eq!(
            get(&lists, &[mask(json!([[false, true]]))]).unwrap(),
            json!([[2]])
        );
    }

    #[test]
    fn test_lazy() {
        let lazy = LazyArray::new(
            3,
            Leaf::from_vec(vec![1i64]).ty(),
            || Ok(Leaf::from_vec(vec![1i64, 2, 3]).into()),
        );
        let a: ContentRef = lazy.into();
        assert_eq!(
            get(&a, &[range(Some(1), None, 1)]).unwrap(),
            json!([2, 3])
        );
    }

    #[test]
    fn test_views() {
        let a = array(json!([1.1, 2.2, 3.3, 4.4]));
        let Element::Array(view) = apply(&a, &[range(Some(1), Some(3), 1)]).unwrap() else {
            panic!("expected an array");
        };
        let (Content::Leaf(original), Content::Leaf(view)) = (a.as_ref(), view.as_ref()) else {
            panic!("expected leaves");
        };
        assert!(view.buffer().ptr_eq(original.buffer()));

        let a = array(json!([[1, 2, 3], [4]]));
        let Element::Array(narrowed) = apply(&a, &[all(), range(Some(1), None, 1)]).unwrap() else {
            panic!("expected an array");
        };
        let (Content::List(original), Content::List(narrowed)) = (a.as_ref(), narrowed.as_ref())
        else {
            panic!("expected lists");
        };
        assert!(Arc::ptr_eq(original.content(), narrowed.content()));
    }
}
