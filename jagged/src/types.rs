/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Type descriptors for the elements of a content tree.
//!
//! Types print in Datashape form:
//!
//! ```text
//! 3 * var * {"x": float64, "y": var * int64}
//! ```
//!
//! where `var` marks a ragged list dimension, an integer marks a
//! regular one, `?` or `option[...]` marks values that may be
//! missing, and `union[...]` a heterogeneous choice.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::buffer::PrimitiveKind;

/// The type of a single element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Primitive(PrimitiveKind),
    /// Lists that all have the given length.
    Regular(Box<Type>, usize),
    /// Lists of varying length.
    List(Box<Type>),
    Record(RecordType),
    Option(Box<Type>),
    Union(Vec<Type>),
    /// The type of an empty array built without any values.
    Unknown,
}

/// Field types of a record; `keys` is `None` for tuples.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordType {
    pub keys: Option<Vec<String>>,
    pub contents: Vec<Type>,
}

impl RecordType {
    /// Field names, with tuple slots named by position.
    pub fn keys(&self) -> Vec<String> {
        match &self.keys {
            Some(keys) => keys.clone(),
            None => (0..self.contents.len()).map(|i| i.to_string()).collect(),
        }
    }

    pub fn field(&self, key: &str) -> Option<&Type> {
        let pos = match &self.keys {
            Some(keys) => keys.iter().position(|k| k == key)?,
            None => key.parse::<usize>().ok()?,
        };
        self.contents.get(pos)
    }

    pub fn is_tuple(&self) -> bool {
        self.keys.is_none()
    }
}

impl Type {
    /// Wrap in an option layer, unless already optional.
    pub fn optional(self) -> Type {
        match self {
            Type::Option(_) => self,
            other => Type::Option(Box::new(other)),
        }
    }

    /// Strip option layers.
    pub fn unwrap_option(&self) -> &Type {
        match self {
            Type::Option(inner) => inner.unwrap_option(),
            other => other,
        }
    }

    /// The element type of a list type, looking through options.
    pub fn inner(&self) -> Option<&Type> {
        match self.unwrap_option() {
            Type::Regular(inner, _) | Type::List(inner) => Some(inner),
            _ => None,
        }
    }

    /// Minimum and maximum number of list dimensions below this
    /// type. Records and unions take the range over their
    /// children.
    pub fn minmax_depth(&self) -> (usize, usize) {
        match self {
            Type::Primitive(_) | Type::Unknown => (0, 0),
            Type::Regular(inner, _) | Type::List(inner) => {
                let (min, max) = inner.minmax_depth();
                (min + 1, max + 1)
            }
            Type::Option(inner) => inner.minmax_depth(),
            Type::Record(record) => minmax_of(&record.contents),
            Type::Union(contents) => minmax_of(contents),
        }
    }

    /// The type after selecting `key` from every record reachable
    /// through lists, options and unions; `None` if some record lacks
    /// it or no record is reachable.
    pub fn project(&self, key: &str) -> Option<Type> {
        self.project_with(&|record| record.field(key).cloned())
    }

    /// The type after narrowing every reachable record to `keys`.
    pub fn project_fields(&self, keys: &[String]) -> Option<Type> {
        self.project_with(&|record| {
            let contents = keys
                .iter()
                .map(|k| record.field(k).cloned())
                .collect::<Option<Vec<_>>>()?;
            Some(Type::Record(RecordType {
                keys: (!record.is_tuple()).then(|| keys.to_vec()),
                contents,
            }))
        })
    }

    fn project_with(&self, select: &dyn Fn(&RecordType) -> Option<Type>) -> Option<Type> {
        match self {
            Type::Primitive(_) | Type::Unknown => None,
            Type::Record(record) => select(record),
            Type::Regular(inner, size) => {
                Some(Type::Regular(Box::new(inner.project_with(select)?), *size))
            }
            Type::List(inner) => Some(Type::List(Box::new(inner.project_with(select)?))),
            Type::Option(inner) => Some(inner.project_with(select)?.optional()),
            Type::Union(contents) => Some(Type::Union(
                contents
                    .iter()
                    .map(|t| t.project_with(select))
                    .collect::<Option<_>>()?,
            )),
        }
    }

    /// True if a record is reachable through lists, options and
    /// unions.
    pub fn has_record(&self) -> bool {
        self.reachable_keys().is_some()
    }

    /// The union of field names of every record reachable through
    /// lists, options and unions, or `None` if no record is reachable.
    pub fn reachable_keys(&self) -> Option<Vec<String>> {
        match self {
            Type::Primitive(_) | Type::Unknown => None,
            Type::Regular(inner, _) | Type::List(inner) | Type::Option(inner) => {
                inner.reachable_keys()
            }
            Type::Record(record) => Some(record.keys()),
            Type::Union(contents) => {
                let mut found: Option<Vec<String>> = None;
                for keys in contents.iter().filter_map(Type::reachable_keys) {
                    let all = found.get_or_insert_with(Vec::new);
                    for key in keys {
                        if !all.contains(&key) {
                            all.push(key);
                        }
                    }
                }
                found
            }
        }
    }
}

fn minmax_of(types: &[Type]) -> (usize, usize) {
    types
        .iter()
        .map(Type::minmax_depth)
        .reduce(|(amin, amax), (bmin, bmax)| (amin.min(bmin), amax.max(bmax)))
        .unwrap_or((0, 0))
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(kind) => write!(f, "{}", kind),
            Type::Regular(inner, size) => write!(f, "{} * {}", size, inner),
            Type::List(inner) => write!(f, "var * {}", inner),
            Type::Record(record) => write!(f, "{}", record),
            Type::Option(inner) => match **inner {
                Type::Primitive(_) | Type::Unknown => write!(f, "?{}", inner),
                _ => write!(f, "option[{}]", inner),
            },
            Type::Union(contents) => {
                write!(f, "union[")?;
                for (i, t) in contents.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, "]")
            }
            Type::Unknown => write!(f, "unknown"),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.keys {
            Some(keys) => {
                write!(f, "{{")?;
                for (i, (k, t)) in keys.iter().zip(&self.contents).enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {}", k, t)?;
                }
                write!(f, "}}")
            }
            None => {
                write!(f, "(")?;
                for (i, t) in self.contents.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// The type of a whole array: its length and element type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArrayType {
    pub length: usize,
    pub element: Type,
}

impl fmt::Display for ArrayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} * {}", self.length, self.element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prim(kind: PrimitiveKind) -> Type {
        Type::Primitive(kind)
    }

    fn record(keys: &[&str], contents: Vec<Type>) -> Type {
        Type::Record(RecordType {
            keys: Some(keys.iter().map(|k| k.to_string()).collect()),
            contents,
        })
    }

    #[test]
    fn test_datashape() {
        let t = ArrayType {
            length: 3,
            element: Type::List(Box::new(record(
                &["x", "y"],
                vec![
                    prim(PrimitiveKind::Float64),
                    Type::List(Box::new(prim(PrimitiveKind::Int64))),
                ],
            ))),
        };
        assert_eq!(
            t.to_string(),
            r#"3 * var * {"x": float64, "y": var * int64}"#
        );

        let t = Type::Regular(
            Box::new(Type::Regular(Box::new(prim(PrimitiveKind::Int64)), 5)),
            3,
        );
        assert_eq!(t.to_string(), "3 * 5 * int64");

        let t = Type::Union(vec![
            prim(PrimitiveKind::Int64),
            Type::List(Box::new(prim(PrimitiveKind::Int64))),
        ]);
        assert_eq!(t.to_string(), "union[int64, var * int64]");

        assert_eq!(prim(PrimitiveKind::Float64).optional().to_string(), "?float64");
        assert_eq!(
            Type::List(Box::new(prim(PrimitiveKind::Int64)))
                .optional()
                .optional()
                .to_string(),
            "option[var * int64]"
        );

        let t = Type::Record(RecordType {
            keys: None,
            contents: vec![prim(PrimitiveKind::Int64), prim(PrimitiveKind::Float64)],
        });
        assert_eq!(t.to_string(), "(int64, float64)");
    }

    #[test]
    fn test_minmax_depth() {
        let t = record(
            &["x", "y"],
            vec![
                prim(PrimitiveKind::Float64),
                Type::List(Box::new(prim(PrimitiveKind::Int64))),
            ],
        );
        assert_eq!(t.minmax_depth(), (0, 1));
        assert_eq!(Type::List(Box::new(t.clone())).minmax_depth(), (1, 2));
        assert_eq!(
            Type::List(Box::new(t)).optional().minmax_depth(),
            (1, 2)
        );
    }

    #[test]
    fn test_reachable_keys() {
        let t = Type::List(Box::new(Type::Union(vec![
            record(&["a"], vec![prim(PrimitiveKind::Bool)]),
            record(&["a", "b"], vec![prim(PrimitiveKind::Bool), prim(PrimitiveKind::Bool)]),
            prim(PrimitiveKind::Int64),
        ])));
        assert_eq!(
            t.reachable_keys(),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert!(!prim(PrimitiveKind::Int64).has_record());
    }

    #[test]
    fn test_project() {
        let t = Type::List(Box::new(record(
            &["x", "y"],
            vec![
                prim(PrimitiveKind::Float64),
                Type::List(Box::new(prim(PrimitiveKind::Int64))),
            ],
        )));
        assert_eq!(t.project("y").unwrap().to_string(), "var * var * int64");
        assert_eq!(
            t.project_fields(&["y".to_string()]).unwrap().to_string(),
            r#"var * {"y": var * int64}"#
        );
        assert!(t.project("z").is_none());
        assert!(prim(PrimitiveKind::Int64).project("x").is_none());
    }
}
