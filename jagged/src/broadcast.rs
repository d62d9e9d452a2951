/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Applying functions through nested structure.
//!
//! [`broadcast_and_apply`] walks several operands in lockstep, peeling
//! one layer of structure at a time, until a caller-supplied action
//! accepts the operands it has reached. The layers around the action's
//! result are then rebuilt to match the inputs.
//!
//! Operands are aligned down the nesting: a scalar goes everywhere, and
//! an operand that runs out of list dimensions before the others has
//! its entry `i` repeated for every element under position `i` of the
//! deeper operands. Lengths that disagree at any depth are a
//! [`SliceError::Broadcast`].
//!
//! ```text
//! [[1, 2], [], [3]] + [100, 200, 300] = [[101, 102], [], [303]]
//! ```

use std::fmt;

use indexmap::IndexMap;
use itertools::Itertools;
use serde::Deserialize;
use serde::Serialize;
use tracing::trace;

use crate::buffer::Buffer;
use crate::buffer::PrimitiveKind;
use crate::buffer::Scalar;
use crate::content::Content;
use crate::content::ContentRef;
use crate::content::Leaf;
use crate::content::ListArray;
use crate::content::OptionArray;
use crate::content::RecordArray;
use crate::content::RegularArray;
use crate::content::UnionArray;
use crate::error::SliceError;

/// One argument of a broadcast operation.
#[derive(Clone, Debug)]
pub enum Operand {
    Scalar(Scalar),
    Content(ContentRef),
}

impl Operand {
    pub fn content(&self) -> Option<&ContentRef> {
        match self {
            Operand::Content(c) => Some(c),
            Operand::Scalar(_) => None,
        }
    }

    /// Replace a content operand; scalars pass through unchanged.
    fn map_content(
        &self,
        f: impl FnOnce(&ContentRef) -> Result<ContentRef, SliceError>,
    ) -> Result<Operand, SliceError> {
        Ok(match self {
            Operand::Content(c) => Operand::Content(f(c)?),
            Operand::Scalar(s) => Operand::Scalar(*s),
        })
    }
}

impl From<Scalar> for Operand {
    fn from(s: Scalar) -> Self {
        Operand::Scalar(s)
    }
}

impl From<ContentRef> for Operand {
    fn from(c: ContentRef) -> Self {
        Operand::Content(c)
    }
}

impl From<&ContentRef> for Operand {
    fn from(c: &ContentRef) -> Self {
        Operand::Content(c.clone())
    }
}

macro_rules! operand_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Operand {
                fn from(value: $ty) -> Self {
                    Operand::Scalar(Scalar::from(value))
                }
            }
        )*
    };
}

operand_from!(bool, u8, i64, f64);

/// Called at every depth with the operands reached so far. Returning
/// `Ok(None)` asks for one more layer to be peeled.
pub type Action<'a> = dyn Fn(&[Operand]) -> Result<Option<ContentRef>, SliceError> + 'a;

/// Align `inputs` and apply `action` where it accepts them. At least
/// one operand must be content.
pub fn broadcast_and_apply(inputs: &[Operand], action: &Action<'_>) -> Result<ContentRef, SliceError> {
    apply(inputs, action)
}

fn apply(inputs: &[Operand], action: &Action<'_>) -> Result<ContentRef, SliceError> {
    let length = common_length(inputs)?;
    if let Some(out) = action(inputs)? {
        return Ok(out);
    }
    let has = |pred: fn(&Content) -> bool| {
        inputs
            .iter()
            .filter_map(Operand::content)
            .any(|c| pred(c.as_ref()))
    };
    if has(|c| matches!(c, Content::Lazy(_))) {
        let inputs = inputs
            .iter()
            .map(|o| o.map_content(|c| Ok(c.materialized()?)))
            .collect::<Result<Vec<_>, _>>()?;
        return apply(&inputs, action);
    }
    if has(|c| matches!(c, Content::Option(_))) {
        return apply_options(inputs, length, action);
    }
    if has(|c| matches!(c, Content::Union(_))) {
        return apply_unions(inputs, length, action);
    }
    if has(|c| match c {
        Content::Regular(_) | Content::List(_) => true,
        Content::Leaf(leaf) => leaf.ndim() > 1,
        _ => false,
    }) {
        return apply_lists(inputs, length, action);
    }
    if has(|c| matches!(c, Content::Record(_))) {
        return apply_records(inputs, length, action);
    }
    Err(SliceError::broadcast(format!(
        "cannot apply the operation to {}",
        inputs
            .iter()
            .map(|o| match o {
                Operand::Scalar(s) => s.kind().to_string(),
                Operand::Content(c) => c.ty().to_string(),
            })
            .join(", ")
    )))
}

fn common_length(inputs: &[Operand]) -> Result<usize, SliceError> {
    match inputs
        .iter()
        .filter_map(Operand::content)
        .map(|c| c.len())
        .all_equal_value()
    {
        Ok(length) => Ok(length),
        Err(Some((a, b))) => Err(SliceError::broadcast(format!(
            "cannot broadcast arrays of lengths {} and {}",
            a, b
        ))),
        Err(None) => Err(SliceError::broadcast("no array operands")),
    }
}

/// An entry is missing in the output if it is missing in any operand.
fn apply_options(inputs: &[Operand], length: usize, action: &Action<'_>) -> Result<ContentRef, SliceError> {
    let mut valid = vec![true; length];
    for c in inputs.iter().filter_map(Operand::content) {
        if let Content::Option(option) = c.as_ref() {
            for (i, v) in valid.iter_mut().enumerate() {
                *v = *v && option.content_position(i).is_some();
            }
        }
    }
    let positions: Vec<usize> = (0..length).filter(|&i| valid[i]).collect();
    trace!(length, valid = positions.len(), "broadcasting through options");
    let inputs = inputs
        .iter()
        .map(|o| {
            o.map_content(|c| {
                Ok(match c.as_ref() {
                    Content::Option(option) => {
                        let inner: Vec<usize> = positions
                            .iter()
                            .filter_map(|&i| option.content_position(i))
                            .collect();
                        option.content().carry_or_view(&inner)?
                    }
                    _ => c.carry_or_view(&positions)?,
                })
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let out = apply(&inputs, action)?;
    let mut next = 0;
    let index: Vec<i64> = valid
        .iter()
        .map(|&v| {
            if v {
                next += 1;
                next - 1
            } else {
                -1
            }
        })
        .collect();
    Ok(OptionArray::indexed(index, out)?.into())
}

/// Entries are grouped by the combination of branches they select in
/// each union operand; each group becomes one branch of the output.
fn apply_unions(inputs: &[Operand], length: usize, action: &Action<'_>) -> Result<ContentRef, SliceError> {
    if length == 0 {
        let inputs = inputs
            .iter()
            .map(|o| {
                o.map_content(|c| match c.as_ref() {
                    Content::Union(union) => match union.contents().first() {
                        Some(branch) => Ok(branch.getitem_range(0, 0)?),
                        None => Err(SliceError::broadcast("union without branches")),
                    },
                    _ => Ok(c.clone()),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        return apply(&inputs, action);
    }

    let mut groups: IndexMap<Vec<usize>, Vec<usize>> = IndexMap::new();
    for i in 0..length {
        let combination = inputs
            .iter()
            .filter_map(Operand::content)
            .filter_map(|c| match c.as_ref() {
                Content::Union(union) => Some(union.locate(i).0),
                _ => None,
            })
            .collect();
        groups.entry(combination).or_default().push(i);
    }
    trace!(length, groups = groups.len(), "broadcasting through unions");

    let mut tags = vec![0u8; length];
    let mut index = vec![0usize; length];
    let mut branches = Vec::with_capacity(groups.len());
    for (tag, entries) in groups.values().enumerate() {
        let tag = u8::try_from(tag)
            .map_err(|_| SliceError::broadcast("too many combinations of union branches"))?;
        for (k, &i) in entries.iter().enumerate() {
            tags[i] = tag;
            index[i] = k;
        }
        let inputs = inputs
            .iter()
            .map(|o| {
                o.map_content(|c| {
                    Ok(match c.as_ref() {
                        Content::Union(union) => {
                            let branch = union.locate(entries[0]).0;
                            let positions: Vec<usize> =
                                entries.iter().map(|&i| union.locate(i).1).collect();
                            union.contents()[branch].carry_or_view(&positions)?
                        }
                        _ => c.carry_or_view(entries)?,
                    })
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        branches.push(apply(&inputs, action)?);
    }
    Ok(UnionArray::new(tags, index, branches)?.into())
}

/// Positions `0..counts.len()`, each repeated `counts[i]` times.
fn repeated(counts: &[usize]) -> Vec<usize> {
    counts
        .iter()
        .enumerate()
        .flat_map(|(i, &n)| std::iter::repeat(i).take(n))
        .collect()
}

fn apply_lists(inputs: &[Operand], length: usize, action: &Action<'_>) -> Result<ContentRef, SliceError> {
    // Multi-dimensional leaves are regular lists of their rows.
    let inputs = inputs
        .iter()
        .map(|o| {
            o.map_content(|c| match c.as_ref() {
                Content::Leaf(leaf) if leaf.ndim() > 1 => Ok(leaf.to_regular()?.into()),
                _ => Ok(c.clone()),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let contents: Vec<&ContentRef> = inputs.iter().filter_map(Operand::content).collect();

    let reference = contents.iter().find_map(|c| match c.as_ref() {
        Content::List(list) => Some(list),
        _ => None,
    });
    let counts: Vec<usize> = match reference {
        Some(list) => list
            .starts()
            .iter()
            .zip(list.stops().iter())
            .map(|(&start, &stop)| stop - start)
            .collect(),
        None => {
            let size = contents
                .iter()
                .filter_map(|c| match c.as_ref() {
                    Content::Regular(regular) => Some(regular.size()),
                    _ => None,
                })
                .find(|&size| size != 1)
                .unwrap_or(1);
            vec![size; length]
        }
    };
    let regular = reference.is_none();
    trace!(length, regular, "broadcasting through lists");

    let inner = inputs
        .iter()
        .map(|o| {
            o.map_content(|c| {
                Ok(match c.as_ref() {
                    Content::List(list) => {
                        let mut positions = Vec::with_capacity(counts.iter().sum());
                        for (i, (&start, &stop)) in
                            list.starts().iter().zip(list.stops().iter()).enumerate()
                        {
                            if stop - start != counts[i] {
                                return Err(SliceError::broadcast(format!(
                                    "cannot broadcast nested list: entry {} has {} elements and {}",
                                    i,
                                    counts[i],
                                    stop - start
                                )));
                            }
                            positions.extend(start..stop);
                        }
                        list.content().carry_or_view(&positions)?
                    }
                    Content::Regular(regular) if regular.size() == 1 => {
                        regular.content().carry_or_view(&repeated(&counts))?
                    }
                    Content::Regular(regular) => {
                        if let Some(i) = counts.iter().position(|&n| n != regular.size()) {
                            return Err(SliceError::broadcast(format!(
                                "cannot broadcast nested list: entry {} has {} elements and {}",
                                i,
                                counts[i],
                                regular.size()
                            )));
                        }
                        regular
                            .content()
                            .getitem_range(0, length * regular.size())?
                    }
                    // Shallower operands repeat down the nesting.
                    _ => c.carry_or_view(&repeated(&counts))?,
                })
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let out = apply(&inner, action)?;
    if regular {
        let size = counts.first().copied().unwrap_or(1);
        return Ok(RegularArray::new(out, size, length)?.into());
    }
    let offsets: Vec<usize> = std::iter::once(0)
        .chain(counts.iter().scan(0, |total, &n| {
            *total += n;
            Some(*total)
        }))
        .collect();
    Ok(ListArray::from_offsets(offsets, out)?.into())
}

fn apply_records(inputs: &[Operand], length: usize, action: &Action<'_>) -> Result<ContentRef, SliceError> {
    let records: Vec<&RecordArray> = inputs
        .iter()
        .filter_map(Operand::content)
        .filter_map(|c| match c.as_ref() {
            Content::Record(record) => Some(record),
            _ => None,
        })
        .collect();
    let Some(first) = records.first() else {
        return Err(SliceError::broadcast("no records to broadcast"));
    };
    let keys = first.keys();
    for record in &records[1..] {
        let mut theirs = record.keys();
        let mut ours = keys.clone();
        theirs.sort();
        ours.sort();
        if theirs != ours || record.is_tuple() != first.is_tuple() {
            return Err(SliceError::broadcast(format!(
                "cannot broadcast records with fields {:?} and {:?}",
                keys,
                record.keys()
            )));
        }
    }
    let fields = keys
        .iter()
        .map(|key| {
            let inputs = inputs
                .iter()
                .map(|o| {
                    o.map_content(|c| match c.as_ref() {
                        Content::Record(record) => {
                            record
                                .field(key)
                                .cloned()
                                .ok_or_else(|| SliceError::FieldNotFound {
                                    field: key.clone(),
                                    available: record.keys(),
                                })
                        }
                        _ => Ok(c.clone()),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            apply(&inputs, action)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(first.with_fields(fields, length)?.into())
}

/// Replace every leaf of `content` with `f` of it, keeping the structure
/// above. `f` must preserve the length of the leaf.
pub fn map_leaves(
    content: &ContentRef,
    f: impl Fn(&Leaf) -> Result<Leaf, SliceError>,
) -> Result<ContentRef, SliceError> {
    broadcast_and_apply(&[Operand::from(content)], &|inputs| {
        let [Operand::Content(c)] = inputs else {
            return Ok(None);
        };
        let Content::Leaf(leaf) = c.as_ref() else {
            return Ok(None);
        };
        if leaf.ndim() > 1 {
            return Ok(None);
        }
        let mapped = f(leaf)?;
        if mapped.len() != leaf.len() || mapped.ndim() != 1 {
            return Err(SliceError::broadcast(format!(
                "mapped leaf of length {} to length {}",
                leaf.len(),
                mapped.len()
            )));
        }
        Ok(Some(mapped.into()))
    })
}

/// Apply a scalar function position by position across `inputs`. The
/// output kind is the widest kind `f` returns.
pub fn elementwise(
    inputs: &[Operand],
    f: impl Fn(&[Scalar]) -> Scalar,
) -> Result<ContentRef, SliceError> {
    enum Column {
        Values(Vec<Scalar>),
        Repeat(Scalar),
    }

    broadcast_and_apply(inputs, &|inputs| {
        let mut columns = Vec::with_capacity(inputs.len());
        let mut length = 0;
        for o in inputs {
            match o {
                Operand::Scalar(s) => columns.push(Column::Repeat(*s)),
                Operand::Content(c) => match c.as_ref() {
                    Content::Leaf(leaf) if leaf.ndim() == 1 => {
                        length = leaf.len();
                        columns.push(Column::Values(leaf.scalars().collect()));
                    }
                    _ => return Ok(None),
                },
            }
        }
        let mut args = Vec::with_capacity(columns.len());
        let out: Vec<Scalar> = (0..length)
            .map(|i| {
                args.clear();
                args.extend(columns.iter().map(|c| match c {
                    Column::Values(values) => values[i],
                    Column::Repeat(s) => *s,
                }));
                f(&args)
            })
            .collect();
        let kind = match out.iter().map(Scalar::kind).reduce(PrimitiveKind::promote) {
            Some(kind) => kind,
            None => {
                // Nothing computed; ask `f` what it makes of zeros.
                let zeros: Vec<Scalar> = columns
                    .iter()
                    .map(|c| match c {
                        Column::Values(_) => Scalar::Bool(false),
                        Column::Repeat(s) => *s,
                    })
                    .collect();
                f(&zeros).kind()
            }
        };
        Ok(Some(
            Leaf::from_buffer(Buffer::from_scalars(kind, out)).into(),
        ))
    })
}

/// Arithmetic and comparison operators. Integer arithmetic stays in
/// int64 and wraps; anything involving a float, and every division, is
/// float64. Comparisons produce booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn apply(self, a: Scalar, b: Scalar) -> Scalar {
        use std::cmp::Ordering;

        use BinaryOp::*;

        let ints = a.as_i64().zip(b.as_i64());
        let (x, y) = (a.as_f64(), b.as_f64());
        let order = match ints {
            Some((i, j)) => Some(i.cmp(&j)),
            None => x.partial_cmp(&y),
        };
        match (self, ints) {
            (Add, Some((i, j))) => Scalar::Int64(i.wrapping_add(j)),
            (Sub, Some((i, j))) => Scalar::Int64(i.wrapping_sub(j)),
            (Mul, Some((i, j))) => Scalar::Int64(i.wrapping_mul(j)),
            // Takes the sign of the divisor; zero divisors give zero.
            (Rem, Some((_, 0))) => Scalar::Int64(0),
            (Rem, Some((i, j))) => {
                let r = i.wrapping_rem(j);
                Scalar::Int64(if r != 0 && (r < 0) != (j < 0) { r + j } else { r })
            }
            (Add, None) => Scalar::Float64(x + y),
            (Sub, None) => Scalar::Float64(x - y),
            (Mul, None) => Scalar::Float64(x * y),
            (Rem, None) => {
                let r = x % y;
                Scalar::Float64(if r != 0.0 && (r < 0.0) != (y < 0.0) { r + y } else { r })
            }
            (Div, _) => Scalar::Float64(x / y),
            (Eq, _) => Scalar::Bool(order == Some(Ordering::Equal)),
            (Ne, _) => Scalar::Bool(order != Some(Ordering::Equal)),
            (Lt, _) => Scalar::Bool(order == Some(Ordering::Less)),
            (Le, _) => Scalar::Bool(matches!(order, Some(Ordering::Less | Ordering::Equal))),
            (Gt, _) => Scalar::Bool(order == Some(Ordering::Greater)),
            (Ge, _) => Scalar::Bool(matches!(order, Some(Ordering::Greater | Ordering::Equal))),
        }
    }

    /// Broadcast `left` against `right` and apply the operator.
    pub fn broadcast(self, left: &Operand, right: &Operand) -> Result<ContentRef, SliceError> {
        elementwise(&[left.clone(), right.clone()], |args| self.apply(args[0], args[1]))
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        };
        write!(f, "{}", symbol)
    }
}

/// Add or replace field `key` in every record of `base`, broadcasting
/// `what` down to the records' depth.
pub fn with_field(base: &ContentRef, key: &str, what: Operand) -> Result<ContentRef, SliceError> {
    if !base.ty().has_record() {
        return Err(SliceError::broadcast(format!(
            "no records in {}; cannot add field {:?}",
            base.ty(),
            key
        )));
    }
    broadcast_and_apply(&[Operand::from(base), what], &|inputs| {
        let [Operand::Content(c), what] = inputs else {
            return Ok(None);
        };
        let Content::Record(record) = c.as_ref() else {
            return Ok(None);
        };
        let column: ContentRef = match what {
            Operand::Scalar(s) => Leaf::from_buffer(Buffer::filled(*s, record.len())).into(),
            Operand::Content(w) => w.clone(),
        };
        Ok(Some(record.with_field(key, column)?.into()))
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::builder::ArrayBuilder;
    use crate::value::Value;

    fn array(value: serde_json::Value) -> ContentRef {
        let values: Vec<Value> = serde_json::from_value(value).unwrap();
        ArrayBuilder::from_values(&values).unwrap()
    }

    fn json(content: &ContentRef) -> serde_json::Value {
        serde_json::to_value(content.to_values().unwrap()).unwrap()
    }

    fn add(left: impl Into<Operand>, right: impl Into<Operand>) -> Result<ContentRef, SliceError> {
        BinaryOp::Add.broadcast(&left.into(), &right.into())
    }

    #[test]
    fn test_scalars() {
        let out = add(array(json!([[1, 2], [], [3]])), 10i64).unwrap();
        assert_eq!(json(&out), json!([[11, 12], [], [13]]));
        assert_eq!(out.ty().to_string(), "var * int64");

        let out = add(0.5, array(json!([[1, 2], [3]]))).unwrap();
        assert_eq!(json(&out), json!([[1.5, 2.5], [3.5]]));
    }

    #[test]
    fn test_down_the_nesting() {
        let out = add(array(json!([[1, 2], [], [3]])), array(json!([100, 200, 300]))).unwrap();
        assert_eq!(json(&out), json!([[101, 102], [], [303]]));

        let out = add(array(json!([[1, 2], [3]])), array(json!([[10, 20], [30]]))).unwrap();
        assert_eq!(json(&out), json!([[11, 22], [33]]));
    }

    #[test]
    fn test_mismatches() {
        assert!(matches!(
            add(array(json!([[1, 2], [3]])), array(json!([1, 2, 3]))),
            Err(SliceError::Broadcast { .. })
        ));
        assert!(matches!(
            add(array(json!([[1, 2], [3]])), array(json!([[1], [2, 3]]))),
            Err(SliceError::Broadcast { .. })
        ));
        assert!(matches!(
            add(array(json!([{"x": 1}])), array(json!([{"y": 1}]))),
            Err(SliceError::Broadcast { .. })
        ));
    }

    #[test]
    fn test_structure_preserved() {
        let out = BinaryOp::Mul
            .broadcast(&array(json!([1, null, 3])).into(), &2i64.into())
            .unwrap();
        assert_eq!(json(&out), json!([2, null, 6]));
        assert_eq!(out.ty().to_string(), "?int64");

        let out = add(array(json!([{"x": 1, "y": [1.5]}, {"x": 2, "y": []}])), 1i64).unwrap();
        assert_eq!(
            json(&out),
            json!([{"x": 2, "y": [2.5]}, {"x": 3, "y": []}])
        );

        let out = add(array(json!([1, [2, 3], 4])), 1i64).unwrap();
        assert_eq!(json(&out), json!([2, [3, 4], 5]));
    }

    #[test]
    fn test_operators() {
        let (i, f) = (Scalar::Int64, Scalar::Float64);
        assert_eq!(BinaryOp::Rem.apply(i(-7), i(3)), i(2));
        assert_eq!(BinaryOp::Rem.apply(i(7), i(-3)), i(-2));
        assert_eq!(BinaryOp::Rem.apply(i(7), i(0)), i(0));
        assert_eq!(BinaryOp::Rem.apply(f(-7.5), f(2.0)), f(0.5));
        assert_eq!(BinaryOp::Div.apply(i(1), i(2)), f(0.5));
        assert_eq!(BinaryOp::Add.apply(i(1), f(0.5)), f(1.5));
        assert_eq!(BinaryOp::Lt.apply(i(1), f(1.5)), Scalar::Bool(true));
        assert_eq!(BinaryOp::Ne.apply(f(f64::NAN), f(f64::NAN)), Scalar::Bool(true));
        assert_eq!(BinaryOp::Ge.apply(i(2), i(2)), Scalar::Bool(true));

        let out = BinaryOp::Gt
            .broadcast(&array(json!([[1, 5], []])).into(), &2i64.into())
            .unwrap();
        assert_eq!(json(&out), json!([[false, true], []]));
        assert_eq!(out.ty().to_string(), "var * bool");

        let empty = BinaryOp::Lt
            .broadcast(&array(json!([[], []])).into(), &2i64.into())
            .unwrap();
        assert_eq!(empty.ty().to_string(), "var * bool");
    }

    #[test]
    fn test_map_leaves() {
        let content = array(json!([[1.5, -2.0], null, [{"x": 3.0}]]));
        let negated = map_leaves(&content, |leaf| {
            let values = leaf.scalars().map(|s| Scalar::Float64(-s.as_f64()));
            Ok(Leaf::from_buffer(Buffer::from_scalars(leaf.kind(), values)))
        })
        .unwrap();
        assert_eq!(json(&negated), json!([[-1.5, 2.0], null, [{"x": -3.0}]]));

        let shrunk = map_leaves(&content, |leaf| leaf.getitem_range(0, 0).map_err(Into::into));
        assert!(matches!(shrunk, Err(SliceError::Broadcast { .. })));
    }

    #[test]
    fn test_with_field() {
        let base = array(json!([[{"x": 1}, {"x": 2}], [{"x": 3}]]));
        let out = with_field(&base, "z", array(json!([10, 20])).into()).unwrap();
        assert_eq!(
            json(&out),
            json!([[{"x": 1, "z": 10}, {"x": 2, "z": 10}], [{"x": 3, "z": 20}]])
        );

        let out = with_field(&base, "x", Operand::from(0.5)).unwrap();
        assert_eq!(json(&out), json!([[{"x": 0.5}, {"x": 0.5}], [{"x": 0.5}]]));

        assert!(matches!(
            with_field(&array(json!([1, 2])), "z", Operand::from(1i64)),
            Err(SliceError::Broadcast { .. })
        ));
    }
}
