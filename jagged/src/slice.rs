/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Slice expressions.
//!
//! A [`Where`] is a slice expression as a caller writes it: an
//! integer, a range, `...`, a new axis, a field name or list of
//! names, an array of booleans or integers (possibly nested, possibly
//! with missing values), or a tuple of these. [`normalize`] turns it
//! into a sequence of canonical [`SliceItem`]s, which is all the rest
//! of the crate looks at.
//!
//! ```
//! # use jagged::s;
//! # use jagged::slice::{normalize, Range, SliceItem};
//! let items = normalize(&s![2, .., "x"]).unwrap();
//! assert_eq!(
//!     items,
//!     vec![
//!         SliceItem::At(2),
//!         SliceItem::Range(Range::full()),
//!         SliceItem::Field("x".to_string()),
//!     ]
//! );
//! ```

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::content::ContentRef;
use crate::error::SliceError;
use crate::value::Value;

/// A parser for slice expressions in their textual form.
pub mod parse;

/// A Python-style slice: `start:stop:step`, where missing bounds
/// default to the ends of the dimension (which ends depends on the
/// sign of `step`) and negative bounds count from the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: i64,
}

impl Range {
    pub fn new(start: Option<i64>, stop: Option<i64>, step: i64) -> Self {
        Range { start, stop, step }
    }

    /// `:`, every entry.
    pub fn full() -> Self {
        Range::new(None, None, 1)
    }

    pub fn is_full(&self) -> bool {
        *self == Range::full()
    }

    /// Clip to a dimension of `length`, returning the first position,
    /// the step, and the number of positions selected. Never fails on
    /// out-of-bounds starts or stops; only a zero step is an error.
    pub fn resolve(&self, length: usize) -> Result<(i64, i64, usize), SliceError> {
        let step = self.step;
        if step == 0 {
            return Err(SliceError::StepZero);
        }
        let length = length as i64;
        let (lower, upper) = if step > 0 { (0, length) } else { (-1, length - 1) };
        let clip = |bound: Option<i64>, default: i64| match bound {
            None => default,
            Some(b) if b < 0 => (b + length).max(lower),
            Some(b) => b.min(upper),
        };
        let start = clip(self.start, if step > 0 { lower } else { upper });
        let stop = clip(self.stop, if step > 0 { upper } else { lower });
        // Wide enough that steps near the i64 limits cannot overflow.
        let (span, stride) = (stop as i128 - start as i128, step as i128);
        let count = if span != 0 && (span > 0) == (stride > 0) {
            (span.abs() + stride.abs() - 1) / stride.abs()
        } else {
            0
        };
        Ok((start, step, count as usize))
    }

    /// The selected positions in a dimension of `length`.
    pub fn positions(&self, length: usize) -> Result<impl Iterator<Item = usize>, SliceError> {
        let (start, step, count) = self.resolve(length)?;
        Ok((0..count as i64).map(move |k| (start + k * step) as usize))
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(start) = self.start {
            write!(f, "{}", start)?;
        }
        write!(f, ":")?;
        if let Some(stop) = self.stop {
            write!(f, "{}", stop)?;
        }
        if self.step != 1 {
            write!(f, ":{}", self.step)?;
        }
        Ok(())
    }
}

/// A slice expression as written by a caller.
#[derive(Debug, Clone)]
pub enum Where {
    At(i64),
    Range(Range),
    Ellipsis,
    NewAxis,
    Field(String),
    Fields(Vec<String>),
    /// A host array of booleans, integers or missing values, possibly
    /// nested.
    Array(Value),
    /// An array given as content, e.g. the result of another
    /// computation.
    Content(ContentRef),
    Tuple(Vec<Where>),
}

// Only unsigned values can exceed `i64`, and those are past any end.
fn wide<T: TryInto<i64>>(i: T) -> i64 {
    i.try_into().unwrap_or(i64::MAX)
}

macro_rules! where_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Where {
                fn from(i: $ty) -> Self {
                    Where::At(wide(i))
                }
            }

            impl From<std::ops::Range<$ty>> for Where {
                fn from(r: std::ops::Range<$ty>) -> Self {
                    Where::Range(Range::new(Some(wide(r.start)), Some(wide(r.end)), 1))
                }
            }

            impl From<std::ops::RangeInclusive<$ty>> for Where {
                fn from(r: std::ops::RangeInclusive<$ty>) -> Self {
                    Where::Range(Range::new(
                        Some(wide(*r.start())),
                        Some(wide(*r.end()).saturating_add(1)),
                        1,
                    ))
                }
            }

            impl From<std::ops::RangeFrom<$ty>> for Where {
                fn from(r: std::ops::RangeFrom<$ty>) -> Self {
                    Where::Range(Range::new(Some(wide(r.start)), None, 1))
                }
            }

            impl From<std::ops::RangeTo<$ty>> for Where {
                fn from(r: std::ops::RangeTo<$ty>) -> Self {
                    Where::Range(Range::new(None, Some(wide(r.end)), 1))
                }
            }

            impl From<Vec<$ty>> for Where {
                fn from(v: Vec<$ty>) -> Self {
                    Where::Array(Value::List(v.into_iter().map(|i| Value::Int(wide(i))).collect()))
                }
            }

            impl From<Vec<Option<$ty>>> for Where {
                fn from(v: Vec<Option<$ty>>) -> Self {
                    Where::Array(Value::List(
                        v.into_iter()
                            .map(|i| i.map_or(Value::Null, |i| Value::Int(wide(i))))
                            .collect(),
                    ))
                }
            }
        )*
    };
}

where_from_int!(i32, i64, isize, usize);

impl From<std::ops::RangeFull> for Where {
    fn from(_: std::ops::RangeFull) -> Self {
        Where::Range(Range::full())
    }
}

impl From<Range> for Where {
    fn from(r: Range) -> Self {
        Where::Range(r)
    }
}

impl From<&str> for Where {
    fn from(s: &str) -> Self {
        Where::Field(s.to_string())
    }
}

impl From<String> for Where {
    fn from(s: String) -> Self {
        Where::Field(s)
    }
}

impl From<Vec<&str>> for Where {
    fn from(v: Vec<&str>) -> Self {
        Where::Fields(v.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for Where {
    fn from(v: Vec<String>) -> Self {
        Where::Fields(v)
    }
}

impl From<Vec<bool>> for Where {
    fn from(v: Vec<bool>) -> Self {
        Where::Array(Value::List(v.into_iter().map(Value::Bool).collect()))
    }
}

impl From<Vec<Option<bool>>> for Where {
    fn from(v: Vec<Option<bool>>) -> Self {
        Where::Array(Value::List(v.into_iter().map(Value::from).collect()))
    }
}

impl From<Value> for Where {
    fn from(v: Value) -> Self {
        match v {
            Value::Int(i) => Where::At(i),
            Value::Null => Where::NewAxis,
            other => Where::Array(other),
        }
    }
}

impl From<ContentRef> for Where {
    fn from(c: ContentRef) -> Self {
        Where::Content(c)
    }
}

impl From<Vec<Where>> for Where {
    fn from(v: Vec<Where>) -> Self {
        Where::Tuple(v)
    }
}

impl std::str::FromStr for Where {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse::parse(s)
    }
}

/// One canonical slice item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SliceItem {
    At(i64),
    Range(Range),
    Ellipsis,
    NewAxis,
    Field(String),
    Fields(Vec<String>),
    Bools(Vec<bool>),
    Indices(Vec<i64>),
    /// Integer positions where `None` produces a missing value.
    Missing(Vec<Option<i64>>),
    /// One sub-slice per entry: sub-slice `i` is
    /// `content[offsets[i]..offsets[i + 1]]`.
    Jagged {
        offsets: Vec<usize>,
        content: Box<SliceItem>,
    },
}

impl SliceItem {
    /// How many dimensions this item addresses.
    pub fn dimlength(&self) -> usize {
        match self {
            SliceItem::At(_)
            | SliceItem::Range(_)
            | SliceItem::Bools(_)
            | SliceItem::Indices(_)
            | SliceItem::Missing(_) => 1,
            SliceItem::Jagged { content, .. } => 1 + content.dimlength(),
            SliceItem::Ellipsis
            | SliceItem::NewAxis
            | SliceItem::Field(_)
            | SliceItem::Fields(_) => 0,
        }
    }

    /// Array items, which select by position and pair with each other.
    pub fn is_advanced(&self) -> bool {
        matches!(
            self,
            SliceItem::Bools(_) | SliceItem::Indices(_) | SliceItem::Missing(_)
        )
    }

    /// Items that separate groups of array items.
    pub fn is_basic(&self) -> bool {
        matches!(
            self,
            SliceItem::At(_) | SliceItem::Range(_) | SliceItem::NewAxis | SliceItem::Ellipsis
        )
    }

    pub fn is_field(&self) -> bool {
        matches!(self, SliceItem::Field(_) | SliceItem::Fields(_))
    }

    /// Number of entries in an array item; zero for the rest.
    pub(crate) fn array_len(&self) -> usize {
        match self {
            SliceItem::Bools(v) => v.len(),
            SliceItem::Indices(v) => v.len(),
            SliceItem::Missing(v) => v.len(),
            SliceItem::Jagged { offsets, .. } => offsets.len().saturating_sub(1),
            _ => 0,
        }
    }

    /// Entries `begin..end` of an array item.
    pub(crate) fn array_slice(&self, begin: usize, end: usize) -> SliceItem {
        match self {
            SliceItem::Bools(v) => SliceItem::Bools(v[begin..end].to_vec()),
            SliceItem::Indices(v) => SliceItem::Indices(v[begin..end].to_vec()),
            SliceItem::Missing(v) => SliceItem::Missing(v[begin..end].to_vec()),
            SliceItem::Jagged { offsets, content } => {
                let base = offsets[begin];
                SliceItem::Jagged {
                    offsets: offsets[begin..=end].iter().map(|o| o - base).collect(),
                    content: Box::new(content.array_slice(base, offsets[end])),
                }
            }
            other => other.clone(),
        }
    }

    /// Check that the offsets of a nested array item start at zero,
    /// never decrease, and end at the length of its content, at every
    /// level. Other items are always well formed.
    pub fn check_offsets(&self) -> Result<(), SliceError> {
        let SliceItem::Jagged { offsets, content } = self else {
            return Ok(());
        };
        if !content.is_advanced() && !matches!(**content, SliceItem::Jagged { .. }) {
            return Err(SliceError::invalid_slice(format!(
                "{:?} cannot appear inside a nested array",
                content
            )));
        }
        match (offsets.first(), offsets.last()) {
            (Some(0), Some(&last)) if last == content.array_len() => {}
            _ => {
                return Err(SliceError::invalid_slice(format!(
                    "nested array offsets {:?} do not span content of length {}",
                    offsets,
                    content.array_len()
                )));
            }
        }
        if offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err(SliceError::invalid_slice(format!(
                "nested array offsets {:?} decrease",
                offsets
            )));
        }
        content.check_offsets()
    }
}

/// Turn a caller's slice expression into canonical items.
pub fn normalize(expr: &Where) -> Result<Vec<SliceItem>, SliceError> {
    let items = match expr {
        Where::Tuple(parts) => parts
            .iter()
            .map(|part| match part {
                Where::Tuple(_) => Err(SliceError::invalid_slice(
                    "tuples cannot be nested inside a slice",
                )),
                part => normalize_item(part),
            })
            .collect::<Result<Vec<_>, _>>()?,
        other => vec![normalize_item(other)?],
    };
    if items
        .iter()
        .filter(|item| matches!(item, SliceItem::Ellipsis))
        .count()
        > 1
    {
        return Err(SliceError::invalid_slice(
            "an index can only have a single ellipsis ('...')",
        ));
    }
    Ok(items)
}

fn normalize_item(item: &Where) -> Result<SliceItem, SliceError> {
    Ok(match item {
        Where::At(i) => SliceItem::At(*i),
        Where::Range(r) if r.step == 0 => return Err(SliceError::StepZero),
        Where::Range(r) => SliceItem::Range(*r),
        Where::Ellipsis => SliceItem::Ellipsis,
        Where::NewAxis => SliceItem::NewAxis,
        Where::Field(key) => SliceItem::Field(key.clone()),
        Where::Fields(keys) => SliceItem::Fields(keys.clone()),
        Where::Array(value) => normalize_value(value)?,
        Where::Content(content) => normalize_value(&Value::List(content.to_values()?))?,
        Where::Tuple(_) => {
            return Err(SliceError::invalid_slice(
                "tuples cannot be nested inside a slice",
            ));
        }
    })
}

fn normalize_value(value: &Value) -> Result<SliceItem, SliceError> {
    match value {
        Value::Null => Ok(SliceItem::NewAxis),
        Value::Int(i) => Ok(SliceItem::At(*i)),
        Value::List(items) => normalize_list(items),
        other => Err(SliceError::invalid_slice(format!(
            "a {} cannot be used as a slice; only integers, ranges, fields, \
             newaxis, ellipsis and arrays of integers or booleans can",
            other.kind_name()
        ))),
    }
}

fn normalize_list(items: &[Value]) -> Result<SliceItem, SliceError> {
    if items.is_empty() {
        return Ok(SliceItem::Indices(Vec::new()));
    }
    if items.iter().any(|v| matches!(v, Value::List(_))) {
        let parts = items
            .iter()
            .map(|item| match item {
                Value::List(sub) => normalize_list(sub),
                Value::Null => Err(SliceError::invalid_slice(
                    "missing values in place of nested lists are not supported in slices",
                )),
                other => Err(SliceError::invalid_slice(format!(
                    "cannot mix nested lists and {} values in a slice",
                    other.kind_name()
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        return jagged(parts);
    }

    let mut bools = Vec::new();
    let mut ints = Vec::new();
    let mut has_null = false;
    for value in items {
        match value {
            Value::Bool(b) => bools.push(*b),
            Value::Int(i) => ints.push(*i),
            Value::Null => has_null = true,
            other => {
                return Err(SliceError::invalid_slice(format!(
                    "arrays used as slices must contain integers or booleans, not {}",
                    other.kind_name()
                )));
            }
        }
    }
    if !bools.is_empty() && !ints.is_empty() {
        return Err(SliceError::invalid_slice(
            "cannot mix booleans and integers in one array",
        ));
    }
    Ok(match (bools.is_empty(), has_null) {
        (false, false) => SliceItem::Bools(bools),
        // Masked booleans select the positions of `true`; a missing
        // mask entry is a missing output.
        (false, true) => SliceItem::Missing(
            items
                .iter()
                .enumerate()
                .filter_map(|(i, v)| match v {
                    Value::Bool(true) => Some(Some(i as i64)),
                    Value::Null => Some(None),
                    _ => None,
                })
                .collect(),
        ),
        (true, false) => SliceItem::Indices(ints),
        (true, true) => SliceItem::Missing(
            items
                .iter()
                .map(|v| match v {
                    Value::Int(i) => Some(*i),
                    _ => None,
                })
                .collect(),
        ),
    })
}

/// What kind of array a normalized sub-list is; `Empty` joins with
/// anything.
#[derive(Debug, Clone, PartialEq)]
enum Kind {
    Empty,
    Bools,
    Indices,
    Missing,
    Jagged(Box<Kind>),
}

fn kind_of(item: &SliceItem) -> Kind {
    if item.array_len() == 0 {
        return Kind::Empty;
    }
    match item {
        SliceItem::Bools(_) => Kind::Bools,
        SliceItem::Missing(_) => Kind::Missing,
        SliceItem::Jagged { content, .. } => Kind::Jagged(Box::new(kind_of(content))),
        _ => Kind::Indices,
    }
}

fn join(a: Kind, b: Kind) -> Result<Kind, SliceError> {
    use Kind::*;
    Ok(match (a, b) {
        (Empty, k) | (k, Empty) => k,
        (Jagged(a), Jagged(b)) => Jagged(Box::new(join(*a, *b)?)),
        (Jagged(_), _) | (_, Jagged(_)) => {
            return Err(SliceError::invalid_slice(
                "nested lists in a slice must all have the same depth",
            ));
        }
        (Bools, Indices) | (Indices, Bools) => {
            return Err(SliceError::invalid_slice(
                "cannot mix booleans and integers in one array",
            ));
        }
        (Missing, _) | (_, Missing) => Missing,
        (a, _) => a,
    })
}

/// Convert an array item to `target`, sub-list by sub-list so that
/// boolean positions stay local to their own sub-list.
fn coerce(item: SliceItem, target: &Kind) -> SliceItem {
    match (item, target) {
        (item, Kind::Empty) => item,
        (item, target) if item.array_len() == 0 => empty(target),
        (SliceItem::Bools(mask), Kind::Missing) => SliceItem::Missing(
            mask.iter()
                .enumerate()
                .filter(|&(_, &b)| b)
                .map(|(i, _)| Some(i as i64))
                .collect(),
        ),
        (SliceItem::Indices(ix), Kind::Missing) => {
            SliceItem::Missing(ix.into_iter().map(Some).collect())
        }
        (jagged @ SliceItem::Jagged { .. }, Kind::Jagged(inner)) => {
            let parts = (0..jagged.array_len())
                .map(|k| coerce(jagged_part(&jagged, k), inner))
                .collect();
            concat(parts, Kind::Jagged(inner.clone()))
        }
        (item, _) => item,
    }
}

fn jagged_part(item: &SliceItem, k: usize) -> SliceItem {
    match item {
        SliceItem::Jagged { offsets, content } => content.array_slice(offsets[k], offsets[k + 1]),
        other => other.clone(),
    }
}

fn empty(kind: &Kind) -> SliceItem {
    match kind {
        Kind::Bools => SliceItem::Bools(Vec::new()),
        Kind::Missing => SliceItem::Missing(Vec::new()),
        Kind::Jagged(inner) => SliceItem::Jagged {
            offsets: vec![0],
            content: Box::new(empty(inner)),
        },
        Kind::Empty | Kind::Indices => SliceItem::Indices(Vec::new()),
    }
}

/// Wrap coerced sub-lists, all of `kind`'s inner kind, into one
/// jagged item.
fn concat(parts: Vec<SliceItem>, kind: Kind) -> SliceItem {
    let inner = match kind {
        Kind::Jagged(inner) => *inner,
        other => other,
    };
    let mut offsets = vec![0];
    let mut content = empty(&inner);
    for part in parts {
        offsets.push(offsets[offsets.len() - 1] + part.array_len());
        append(&mut content, part);
    }
    SliceItem::Jagged {
        offsets,
        content: Box::new(content),
    }
}

fn append(into: &mut SliceItem, part: SliceItem) {
    match (into, part) {
        (SliceItem::Bools(a), SliceItem::Bools(b)) => a.extend(b),
        (SliceItem::Indices(a), SliceItem::Indices(b)) => a.extend(b),
        (SliceItem::Missing(a), SliceItem::Missing(b)) => a.extend(b),
        (
            SliceItem::Jagged { offsets, content },
            SliceItem::Jagged {
                offsets: more,
                content: more_content,
            },
        ) => {
            let base = offsets[offsets.len() - 1];
            offsets.extend(more[1..].iter().map(|o| o + base));
            append(content, *more_content);
        }
        // Empty parts of another kind contribute nothing.
        _ => {}
    }
}

fn jagged(parts: Vec<SliceItem>) -> Result<SliceItem, SliceError> {
    let target = parts
        .iter()
        .map(kind_of)
        .try_fold(Kind::Empty, join)?;
    let parts = parts
        .into_iter()
        .map(|part| coerce(part, &target))
        .collect();
    Ok(concat(parts, Kind::Jagged(Box::new(target))))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::s;

    fn value(v: serde_json::Value) -> Where {
        Where::Array(serde_json::from_value(v).unwrap())
    }

    #[test]
    fn test_range_resolve() {
        // Python: range(10)[slice(...)]
        let r = |start, stop, step| Range::new(start, stop, step);
        let positions = |r: Range, n| r.positions(n).unwrap().collect::<Vec<_>>();
        assert_eq!(positions(r(Some(2), Some(5), 1), 10), vec![2, 3, 4]);
        assert_eq!(positions(r(Some(-3), None, 1), 10), vec![7, 8, 9]);
        assert_eq!(positions(r(None, None, -1), 4), vec![3, 2, 1, 0]);
        assert_eq!(positions(r(None, None, -3), 10), vec![9, 6, 3, 0]);
        assert_eq!(positions(r(Some(8), Some(2), -2), 10), vec![8, 6, 4]);
        assert_eq!(positions(r(Some(5), Some(100), 2), 8), vec![5, 7]);
        assert_eq!(positions(r(Some(-100), Some(2), 1), 8), vec![0, 1]);
        assert_eq!(positions(r(Some(3), Some(1), 1), 8), Vec::<usize>::new());
        assert_eq!(positions(r(None, None, 1), 0), Vec::<usize>::new());
        assert_eq!(positions(r(None, None, -1), 0), Vec::<usize>::new());
        assert!(matches!(
            r(None, None, 0).resolve(3),
            Err(SliceError::StepZero)
        ));
    }

    #[test]
    fn test_range_extreme_steps() {
        let r = |start, stop, step| Range::new(start, stop, step);
        let positions = |r: Range, n| r.positions(n).unwrap().collect::<Vec<_>>();
        assert_eq!(positions(r(Some(0), None, i64::MAX), 3), vec![0]);
        assert_eq!(positions(r(None, None, i64::MAX), 0), Vec::<usize>::new());
        assert_eq!(positions(r(None, None, i64::MIN), 3), vec![2]);
        assert_eq!(positions(r(Some(i64::MIN), Some(i64::MAX), i64::MAX), 5), vec![0]);
        assert_eq!(positions(r(Some(i64::MAX), Some(i64::MIN), i64::MIN), 5), vec![4]);
        assert_eq!(r(None, None, i64::MIN + 1).resolve(10).unwrap(), (9, i64::MIN + 1, 1));
    }

    #[test]
    fn test_range_display() {
        assert_eq!(Range::full().to_string(), ":");
        assert_eq!(Range::new(Some(1), Some(3), 1).to_string(), "1:3");
        assert_eq!(Range::new(None, None, -1).to_string(), "::-1");
    }

    #[test]
    fn test_normalize_basic() {
        assert_eq!(
            normalize(&s![1..3, Where::Ellipsis, -1]).unwrap(),
            vec![
                SliceItem::Range(Range::new(Some(1), Some(3), 1)),
                SliceItem::Ellipsis,
                SliceItem::At(-1),
            ]
        );
        assert_eq!(
            normalize(&Where::from(vec!["x", "y"])).unwrap(),
            vec![SliceItem::Fields(vec!["x".to_string(), "y".to_string()])]
        );
        assert_eq!(
            normalize(&Where::from(Value::Null)).unwrap(),
            vec![SliceItem::NewAxis]
        );
        assert!(matches!(
            normalize(&Where::Range(Range::new(None, None, 0))),
            Err(SliceError::StepZero)
        ));
        assert!(matches!(
            normalize(&s![Where::Ellipsis, 0, Where::Ellipsis]),
            Err(SliceError::InvalidSlice { .. })
        ));
        assert!(matches!(
            normalize(&s![0, s![1, 2]]),
            Err(SliceError::InvalidSlice { .. })
        ));
    }

    #[test]
    fn test_normalize_wide_unsigned() {
        let big = i64::MAX as usize + 1;
        assert_eq!(
            normalize(&Where::from(usize::MAX)).unwrap(),
            vec![SliceItem::At(i64::MAX)]
        );
        assert_eq!(
            normalize(&Where::from(2..big)).unwrap(),
            vec![SliceItem::Range(Range::new(Some(2), Some(i64::MAX), 1))]
        );
        assert_eq!(
            normalize(&Where::from(0..=i64::MAX)).unwrap(),
            vec![SliceItem::Range(Range::new(Some(0), Some(i64::MAX), 1))]
        );
        assert_eq!(
            normalize(&Where::from(vec![Some(big), None])).unwrap(),
            vec![SliceItem::Missing(vec![Some(i64::MAX), None])]
        );
    }

    #[test]
    fn test_normalize_arrays() {
        assert_eq!(
            normalize(&value(json!([true, false]))).unwrap(),
            vec![SliceItem::Bools(vec![true, false])]
        );
        assert_eq!(
            normalize(&value(json!([0, 1, null, null, 7, 8]))).unwrap(),
            vec![SliceItem::Missing(vec![
                Some(0),
                Some(1),
                None,
                None,
                Some(7),
                Some(8)
            ])]
        );
        assert_eq!(
            normalize(&value(json!([true, null, false, true]))).unwrap(),
            vec![SliceItem::Missing(vec![Some(0), None, Some(3)])]
        );
        assert_eq!(
            normalize(&value(json!([]))).unwrap(),
            vec![SliceItem::Indices(vec![])]
        );
        assert!(matches!(
            normalize(&value(json!([true, 1]))),
            Err(SliceError::InvalidSlice { .. })
        ));
        assert!(matches!(
            normalize(&value(json!([1.5]))),
            Err(SliceError::InvalidSlice { .. })
        ));
    }

    #[test]
    fn test_normalize_jagged() {
        assert_eq!(
            normalize(&value(json!([[[false, true, false], [], [true, false]], [], [[false]]])))
                .unwrap(),
            vec![SliceItem::Jagged {
                offsets: vec![0, 3, 3, 4],
                content: Box::new(SliceItem::Jagged {
                    offsets: vec![0, 3, 3, 5, 6],
                    content: Box::new(SliceItem::Bools(vec![
                        false, true, false, true, false, false
                    ])),
                }),
            }]
        );
        // Integer sub-lists gain missing values from a sibling.
        assert_eq!(
            normalize(&value(json!([[0, 1], [], [null]]))).unwrap(),
            vec![SliceItem::Jagged {
                offsets: vec![0, 2, 2, 3],
                content: Box::new(SliceItem::Missing(vec![Some(0), Some(1), None])),
            }]
        );
        // Boolean sub-lists become local positions when a sibling is
        // masked.
        assert_eq!(
            normalize(&value(json!([[true, null], [false, true]]))).unwrap(),
            vec![SliceItem::Jagged {
                offsets: vec![0, 2, 3],
                content: Box::new(SliceItem::Missing(vec![Some(0), None, Some(1)])),
            }]
        );
        assert!(matches!(
            normalize(&value(json!([[1], 2]))),
            Err(SliceError::InvalidSlice { .. })
        ));
        assert!(matches!(
            normalize(&value(json!([[1], [[2]]]))),
            Err(SliceError::InvalidSlice { .. })
        ));
    }

    #[test]
    fn test_dimlength() {
        let items = normalize(&value(json!([[[0]]]))).unwrap();
        assert_eq!(items[0].dimlength(), 3);
        assert_eq!(SliceItem::NewAxis.dimlength(), 0);
        assert!(SliceItem::Missing(vec![]).is_advanced());
        assert!(SliceItem::Ellipsis.is_basic());
        assert!(!SliceItem::Field("x".into()).is_basic());
    }
}
