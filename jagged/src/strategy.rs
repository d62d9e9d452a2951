/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Property-based generators for host values and slice ranges.
//!
//! [`gen_values(depth, max_len)`] generates the entries of a ragged
//! array: nested lists of bounded depth, with missing values and
//! records mixed in. All leaves of one generated array share a kind,
//! so converting it to content and back is exact.
//!
//! ```
//! use proptest::prelude::*;
//!
//! use crate::strategy::gen_values;
//!
//! proptest! {
//!     #[test]
//!     fn test_values(values in gen_values(3, 4)) {
//!         // Build an array from `values` and check a property.
//!     }
//! }
//! ```
//!
//! This module is only included in test builds (`#[cfg(test)]`).

use proptest::prelude::*;

use crate::slice::Range;
use crate::value::Value;

/// Leaves of one kind: booleans, integers or floats.
pub fn gen_leaf() -> impl Strategy<Value = BoxedStrategy<Value>> {
    prop_oneof![
        Just(any::<bool>().prop_map(Value::Bool).boxed()),
        Just((-100i64..100).prop_map(Value::Int).boxed()),
        Just(
            (-1000i32..1000)
                .prop_map(|i| Value::Float(i as f64 / 8.0))
                .boxed()
        ),
    ]
}

/// A value of at most `depth` list dimensions over `leaf`, missing
/// about one time in ten.
pub fn gen_nested(leaf: BoxedStrategy<Value>, depth: u32, max_len: usize) -> BoxedStrategy<Value> {
    let inner = leaf.prop_recursive(depth, 64, max_len as u32, move |inner| {
        prop_oneof![
            4 => prop::collection::vec(inner.clone(), 0..=max_len).prop_map(Value::List),
            1 => (inner.clone(), inner)
                .prop_map(|(x, y)| Value::record([("x", x), ("y", y)])),
        ]
    });
    prop_oneof![
        9 => inner,
        1 => Just(Value::Null),
    ]
    .boxed()
}

/// The entries of an array: up to `max_len` values of at most `depth`
/// list dimensions each.
pub fn gen_values(depth: u32, max_len: usize) -> impl Strategy<Value = Vec<Value>> {
    gen_leaf().prop_flat_map(move |leaf| {
        prop::collection::vec(gen_nested(leaf, depth, max_len), 0..=max_len)
    })
}

/// Lists of lists of integers, nested exactly `depth` deep, without
/// missing values.
pub fn gen_regular_depth(depth: u32, max_len: usize) -> BoxedStrategy<Value> {
    if depth == 0 {
        return (-100i64..100).prop_map(Value::Int).boxed();
    }
    prop::collection::vec(gen_regular_depth(depth - 1, max_len), 0..=max_len)
        .prop_map(Value::List)
        .boxed()
}

/// A range item with bounds around `-max_len..=max_len` and a nonzero
/// step.
pub fn gen_range(max_len: usize) -> impl Strategy<Value = Range> {
    let bound = max_len as i64 + 2;
    (
        prop::option::of(-bound..=bound),
        prop::option::of(-bound..=bound),
        prop_oneof![1i64..=3, -3i64..=-1],
    )
        .prop_map(|(start, stop, step)| Range::new(start, stop, step))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ArrayBuilder;
    use crate::getitem::apply;
    use crate::slice::SliceItem;

    /// Python's `len(range(len)[start:stop:step])` positions.
    fn python_slice(length: usize, r: &Range) -> Vec<usize> {
        let n = length as i64;
        let clamp = |i: i64, lo: i64, hi: i64| i.max(lo).min(hi);
        let norm = |i: i64| if i < 0 { i + n } else { i };
        let mut out = Vec::new();
        if r.step > 0 {
            let start = r.start.map_or(0, |s| clamp(norm(s), 0, n));
            let stop = r.stop.map_or(n, |s| clamp(norm(s), 0, n));
            let mut i = start;
            while i < stop {
                out.push(i as usize);
                i += r.step;
            }
        } else {
            let start = r.start.map_or(n - 1, |s| clamp(norm(s), -1, n - 1));
            let stop = r.stop.map_or(-1, |s| clamp(norm(s), -1, n - 1));
            let mut i = start;
            while i > stop {
                out.push(i as usize);
                i += r.step;
            }
        }
        out
    }

    proptest! {
        #[test]
        fn test_round_trip(values in gen_values(3, 4)) {
            let content = ArrayBuilder::from_values(&values).unwrap();
            prop_assert_eq!(content.len(), values.len());
            prop_assert_eq!(content.to_values().unwrap(), values);
        }

        #[test]
        fn test_range_matches_python(values in gen_values(2, 6), r in gen_range(6)) {
            let content = ArrayBuilder::from_values(&values).unwrap();
            let got = apply(&content, &[SliceItem::Range(r)])
                .unwrap()
                .to_value()
                .unwrap();
            let expected: Vec<Value> = python_slice(values.len(), &r)
                .into_iter()
                .map(|i| values[i].clone())
                .collect();
            prop_assert_eq!(got, Value::List(expected));
        }

        #[test]
        fn test_full_range_idempotent(values in gen_values(3, 4)) {
            let content = ArrayBuilder::from_values(&values).unwrap();
            let once = apply(&content, &[SliceItem::Range(Range::full())]).unwrap();
            let once = match once {
                crate::content::Element::Array(c) => c,
                other => panic!("expected an array, got {:?}", other),
            };
            let twice = apply(&once, &[SliceItem::Range(Range::full())])
                .unwrap()
                .to_value()
                .unwrap();
            prop_assert_eq!(twice, Value::List(values));
        }

        #[test]
        fn test_at_per_entry(values in prop::collection::vec(gen_regular_depth(1, 4), 1..5), at in -5i64..5) {
            let content = ArrayBuilder::from_values(&values).unwrap();
            let got = apply(&content, &[SliceItem::Range(Range::full()), SliceItem::At(at)]);
            let expected: Option<Vec<Value>> = values
                .iter()
                .map(|v| match v {
                    Value::List(items) => {
                        let n = items.len() as i64;
                        let i = if at < 0 { at + n } else { at };
                        (0..n).contains(&i).then(|| items[i as usize].clone())
                    }
                    _ => None,
                })
                .collect();
            match expected {
                Some(expected) => prop_assert_eq!(got.unwrap().to_value().unwrap(), Value::List(expected)),
                None => prop_assert!(got.is_err()),
            }
        }
    }
}
