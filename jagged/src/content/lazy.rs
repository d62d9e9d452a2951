/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt;
use std::sync::Arc;
use std::sync::OnceLock;

use crate::content::Content;
use crate::content::ContentRef;
use crate::error::ContentError;
use crate::types::Type;

/// Produces the content of a [`LazyArray`].
pub type Generator = Arc<dyn Fn() -> Result<ContentRef, ContentError> + Send + Sync>;

/// Content that is generated on first access. Its length and type are
/// declared up front so they can be queried without generating it.
#[derive(Clone)]
pub struct LazyArray {
    length: usize,
    ty: Type,
    generator: Generator,
    cell: Arc<OnceLock<Result<ContentRef, ContentError>>>,
}

impl LazyArray {
    pub fn new(
        length: usize,
        ty: Type,
        generator: impl Fn() -> Result<ContentRef, ContentError> + Send + Sync + 'static,
    ) -> Self {
        LazyArray {
            length,
            ty,
            generator: Arc::new(generator),
            cell: Arc::new(OnceLock::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn is_materialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The generated content. The generator runs at most once; its
    /// result, success or failure, is kept.
    pub fn materialize(&self) -> Result<ContentRef, ContentError> {
        self.cell
            .get_or_init(|| {
                let content = (self.generator)()?;
                tracing::debug!(length = self.length, "materialized lazy array");
                if content.len() != self.length {
                    return Err(ContentError::invalid(
                        "LazyArray",
                        format!(
                            "declared length {} but generated {}",
                            self.length,
                            content.len()
                        ),
                    ));
                }
                Ok(content)
            })
            .clone()
    }

    pub fn validate(&self) -> Result<(), ContentError> {
        if self.is_materialized() {
            self.materialize()?.validate()?;
        }
        Ok(())
    }
}

impl fmt::Debug for LazyArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyArray")
            .field("length", &self.length)
            .field("ty", &self.ty)
            .field("materialized", &self.is_materialized())
            .finish()
    }
}

impl From<LazyArray> for ContentRef {
    fn from(array: LazyArray) -> Self {
        Arc::new(Content::Lazy(array))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::buffer::PrimitiveKind;
    use crate::content::Leaf;

    #[test]
    fn test_generates_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let lazy = LazyArray::new(3, Type::Primitive(PrimitiveKind::Int64), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Content::Leaf(Leaf::from_vec(vec![1i64, 2, 3]))))
        });
        assert_eq!(lazy.len(), 3);
        assert!(!lazy.is_materialized());
        let shared = lazy.clone();
        lazy.materialize().unwrap();
        shared.materialize().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(shared.is_materialized());
    }

    #[test]
    fn test_length_mismatch() {
        let lazy = LazyArray::new(5, Type::Primitive(PrimitiveKind::Int64), || {
            Ok(Arc::new(Content::Leaf(Leaf::from_vec(vec![1i64]))))
        });
        assert!(lazy.materialize().is_err());
        assert!(lazy.validate().is_err());
    }
}
