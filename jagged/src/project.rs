/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Moving field selectors to their records.
//!
//! A field selector may be written anywhere in a slice: for an array
//! of type `var * var * {"x": float64, "y": var * int64}`, the slices
//! `[2, :, "x"]`, `[2, "x", :]` and `["x", 2, :]` all mean the same
//! thing. [`resolve`] walks the slice against the array's type and
//! rewrites it so each field selector sits at the depth of the record
//! it selects from, checking along the way that the field exists:
//!
//! - A selector reached while the walk is at a record is emitted in
//!   place, and the walk continues in the selected field's type.
//! - A selector reached above a record (at a list dimension) is held
//!   back until the positional items that follow reach the record.
//! - Held selectors are released before an ellipsis and at the end of
//!   the slice.
//!
//! Selecting a field below a leaf, or one no reachable record has,
//! fails before any content is touched.

use tracing::trace;

use crate::error::SliceError;
use crate::slice::SliceItem;
use crate::types::RecordType;
use crate::types::Type;

/// Rewrite `items`, a slice of an array whose entries have type
/// `element`, so that field selectors apply at their records' depth.
pub fn resolve(items: &[SliceItem], element: &Type) -> Result<Vec<SliceItem>, SliceError> {
    let mut resolver = Resolver {
        cursor: Some(Type::List(Box::new(element.clone()))),
        pending: Vec::new(),
        out: Vec::with_capacity(items.len()),
    };
    for (i, item) in items.iter().enumerate() {
        resolver.step(item, &items[i + 1..])?;
    }
    resolver.flush()?;
    if resolver.out.as_slice() != items {
        trace!(from = ?items, to = ?resolver.out, "moved field selectors");
    }
    Ok(resolver.out)
}

struct Resolver {
    /// The type the next positional item addresses, or `None` once it
    /// can no longer be tracked statically.
    cursor: Option<Type>,
    /// Field selectors waiting for a record.
    pending: Vec<SliceItem>,
    out: Vec<SliceItem>,
}

impl Resolver {
    fn step(&mut self, item: &SliceItem, rest: &[SliceItem]) -> Result<(), SliceError> {
        match item {
            SliceItem::Field(_) | SliceItem::Fields(_) => self.field(item),
            SliceItem::Ellipsis => {
                self.flush()?;
                self.out.push(SliceItem::Ellipsis);
                let dims: usize = rest.iter().map(SliceItem::dimlength).sum();
                self.cursor = self.cursor.take().and_then(|t| match t.minmax_depth() {
                    (min, max) if min == max && min >= dims => descend(t, min - dims),
                    _ => None,
                });
                Ok(())
            }
            SliceItem::NewAxis => {
                self.out.push(SliceItem::NewAxis);
                Ok(())
            }
            positional => {
                self.out.push(positional.clone());
                self.cursor = self
                    .cursor
                    .take()
                    .and_then(|t| descend(t, positional.dimlength()));
                self.release()
            }
        }
    }

    /// The cursor with every held selector applied.
    fn projected(&self) -> Option<Type> {
        self.pending
            .iter()
            .try_fold(self.cursor.clone()?, |t, item| project(&t, item))
    }

    fn field(&mut self, item: &SliceItem) -> Result<(), SliceError> {
        let Some(target) = self.projected() else {
            self.flush()?;
            return self.emit(item.clone());
        };
        match target.unwrap_option() {
            Type::Record(record) => {
                check(item, &record.keys())?;
                self.emit(item.clone())?;
                self.cursor = self.cursor.take().and_then(|t| project(&t, item));
                Ok(())
            }
            Type::Regular(..) | Type::List(_) => {
                let keys = reachable(&target, item)?;
                check(item, &keys)?;
                self.pending.push(item.clone());
                Ok(())
            }
            Type::Union(_) => {
                let keys = reachable(&target, item)?;
                check(item, &keys)?;
                self.flush()?;
                self.emit(item.clone())?;
                self.cursor = None;
                Ok(())
            }
            other => Err(SliceError::mismatch(format!(
                "cannot select {} from {} values",
                describe(item),
                other
            ))),
        }
    }

    /// Emit held selectors while the cursor sits at a record.
    fn release(&mut self) -> Result<(), SliceError> {
        while !self.pending.is_empty() {
            let Some(Type::Record(record)) = self.cursor.as_ref().map(Type::unwrap_option) else {
                break;
            };
            let item = self.pending.remove(0);
            check(&item, &record.keys())?;
            self.cursor = self.cursor.take().and_then(|t| project(&t, &item));
            self.emit(item)?;
        }
        Ok(())
    }

    /// Emit every held selector at the current position.
    fn flush(&mut self) -> Result<(), SliceError> {
        self.release()?;
        for item in std::mem::take(&mut self.pending) {
            self.cursor = self.cursor.take().and_then(|t| project(&t, &item));
            self.emit(item)?;
        }
        Ok(())
    }

    /// Push a field selector, collapsing it into a directly preceding
    /// multi-field selection.
    fn emit(&mut self, item: SliceItem) -> Result<(), SliceError> {
        if let Some(SliceItem::Fields(previous)) = self.out.last() {
            check(&item, previous)?;
            self.out.pop();
        }
        self.out.push(item);
        Ok(())
    }
}

fn names(item: &SliceItem) -> &[String] {
    match item {
        SliceItem::Field(key) => std::slice::from_ref(key),
        SliceItem::Fields(keys) => keys,
        _ => &[],
    }
}

fn describe(item: &SliceItem) -> String {
    match item {
        SliceItem::Field(key) => format!("field {:?}", key),
        other => format!("fields {:?}", names(other)),
    }
}

fn check(item: &SliceItem, available: &[String]) -> Result<(), SliceError> {
    match names(item).iter().find(|k| !available.contains(k)) {
        Some(missing) => Err(SliceError::FieldNotFound {
            field: missing.clone(),
            available: available.to_vec(),
        }),
        None => Ok(()),
    }
}

fn reachable(target: &Type, item: &SliceItem) -> Result<Vec<String>, SliceError> {
    target.reachable_keys().ok_or_else(|| {
        SliceError::mismatch(format!(
            "cannot select {}: no records below {}",
            describe(item),
            target
        ))
    })
}

fn project(t: &Type, item: &SliceItem) -> Option<Type> {
    match item {
        SliceItem::Field(key) => t.project(key),
        SliceItem::Fields(keys) => t.project_fields(keys),
        _ => Some(t.clone()),
    }
}

/// Step `n` list dimensions into `t`. A position applied to a record
/// applies to each of its fields, so records (and unions) are stepped
/// through field by field.
fn descend(t: Type, n: usize) -> Option<Type> {
    (0..n).try_fold(t, |t, _| step_into(&t))
}

fn step_into(t: &Type) -> Option<Type> {
    match t.unwrap_option() {
        Type::Regular(inner, _) | Type::List(inner) => Some((**inner).clone()),
        Type::Record(record) => Some(Type::Record(RecordType {
            keys: record.keys.clone(),
            contents: record
                .contents
                .iter()
                .map(step_into)
                .collect::<Option<_>>()?,
        })),
        Type::Union(contents) => Some(Type::Union(
            contents.iter().map(step_into).collect::<Option<_>>()?,
        )),
        Type::Primitive(_) | Type::Unknown | Type::Option(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::PrimitiveKind;
    use crate::slice::Range;

    fn field(k: &str) -> SliceItem {
        SliceItem::Field(k.to_string())
    }

    fn fields(ks: &[&str]) -> SliceItem {
        SliceItem::Fields(ks.iter().map(|k| k.to_string()).collect())
    }

    fn all() -> SliceItem {
        SliceItem::Range(Range::full())
    }

    // var * {"x": float64, "y": var * int64}
    fn element() -> Type {
        Type::List(Box::new(Type::Record(RecordType {
            keys: Some(vec!["x".to_string(), "y".to_string()]),
            contents: vec![
                Type::Primitive(PrimitiveKind::Float64),
                Type::List(Box::new(Type::Primitive(PrimitiveKind::Int64))),
            ],
        })))
    }

    #[test]
    fn test_commutes_to_record() {
        let expected = vec![SliceItem::At(2), all(), field("x")];
        for items in [
            vec![SliceItem::At(2), all(), field("x")],
            vec![SliceItem::At(2), field("x"), all()],
            vec![field("x"), SliceItem::At(2), all()],
        ] {
            assert_eq!(resolve(&items, &element()).unwrap(), expected);
        }
    }

    #[test]
    fn test_held_until_end() {
        assert_eq!(
            resolve(&[field("y"), SliceItem::At(0)], &element()).unwrap(),
            vec![SliceItem::At(0), field("y")]
        );
        // A field then a position inside it.
        assert_eq!(
            resolve(&[SliceItem::At(0), all(), field("y"), SliceItem::At(0)], &element()).unwrap(),
            vec![SliceItem::At(0), all(), field("y"), SliceItem::At(0)]
        );
    }

    #[test]
    fn test_merge_field_sets() {
        assert_eq!(
            resolve(&[fields(&["x", "y"]), field("y")], &element()).unwrap(),
            vec![field("y")]
        );
        assert_eq!(
            resolve(&[fields(&["x", "y"]), fields(&["x"])], &element()).unwrap(),
            vec![fields(&["x"])]
        );
        assert_eq!(
            resolve(&[fields(&["x"]), field("y")], &element()).unwrap_err(),
            SliceError::FieldNotFound {
                field: "y".to_string(),
                available: vec!["x".to_string()],
            }
        );
    }

    #[test]
    fn test_rejects_missing_fields() {
        assert_eq!(
            resolve(&[field("z")], &element()).unwrap_err(),
            SliceError::FieldNotFound {
                field: "z".to_string(),
                available: vec!["x".to_string(), "y".to_string()],
            }
        );
        assert!(matches!(
            resolve(&[field("x")], &Type::Primitive(PrimitiveKind::Int64)),
            Err(SliceError::DimensionMismatch { .. })
        ));
        // "x" is a float; it has no fields of its own.
        assert!(matches!(
            resolve(&[all(), all(), field("x"), field("y")], &element()),
            Err(SliceError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_ellipsis_releases() {
        assert_eq!(
            resolve(&[field("x"), SliceItem::Ellipsis, SliceItem::At(0)], &element()).unwrap(),
            vec![field("x"), SliceItem::Ellipsis, SliceItem::At(0)]
        );
    }

    #[test]
    fn test_positions_pass_through_records() {
        // {"x": var * int64, "y": var * int64}
        let element = Type::Record(RecordType {
            keys: Some(vec!["x".to_string(), "y".to_string()]),
            contents: vec![
                Type::List(Box::new(Type::Primitive(PrimitiveKind::Int64))),
                Type::List(Box::new(Type::Primitive(PrimitiveKind::Int64))),
            ],
        });
        assert_eq!(
            resolve(&[all(), all(), field("y")], &element).unwrap(),
            vec![all(), all(), field("y")]
        );
        assert_eq!(
            resolve(&[all(), all(), field("z")], &element).unwrap_err(),
            SliceError::FieldNotFound {
                field: "z".to_string(),
                available: vec!["x".to_string(), "y".to_string()],
            }
        );
    }

    #[test]
    fn test_nested_records() {
        // var * {"a": var * {"b": int64}}
        let inner = Type::Record(RecordType {
            keys: Some(vec!["b".to_string()]),
            contents: vec![Type::Primitive(PrimitiveKind::Int64)],
        });
        let element = Type::Record(RecordType {
            keys: Some(vec!["a".to_string()]),
            contents: vec![Type::List(Box::new(inner))],
        });
        assert_eq!(
            resolve(&[field("a"), field("b")], &element).unwrap(),
            vec![field("a"), field("b")]
        );
        assert_eq!(
            resolve(&[field("a"), field("b"), all(), SliceItem::At(1)], &element).unwrap(),
            vec![all(), field("a"), SliceItem::At(1), field("b")]
        );
    }
}
