/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::sync::Arc;

use indexmap::IndexMap;

use crate::content::Content;
use crate::content::ContentRef;
use crate::error::ContentError;
use crate::types::RecordType;
use crate::value::Value;

/// Sibling columns of equal length, addressed by name or, for tuples,
/// by slot number.
#[derive(Clone, Debug)]
pub struct RecordArray {
    fields: Vec<ContentRef>,
    keys: Option<Vec<String>>,
    length: usize,
}

impl RecordArray {
    /// A record of `fields`. `keys` names them; `None` makes a tuple.
    /// Every field must have exactly `length` entries.
    pub fn new(
        fields: Vec<ContentRef>,
        keys: Option<Vec<String>>,
        length: usize,
    ) -> Result<Self, ContentError> {
        if let Some(keys) = &keys {
            if keys.len() != fields.len() {
                return Err(ContentError::invalid(
                    "RecordArray",
                    format!("{} keys for {} fields", keys.len(), fields.len()),
                ));
            }
            if let Some(dup) = keys
                .iter()
                .enumerate()
                .find_map(|(i, k)| keys[..i].contains(k).then_some(k))
            {
                return Err(ContentError::invalid(
                    "RecordArray",
                    format!("duplicate field {:?}", dup),
                ));
            }
        }
        for (i, field) in fields.iter().enumerate() {
            if field.len() != length {
                return Err(ContentError::invalid(
                    "RecordArray",
                    format!(
                        "field {} has length {}, record has length {}",
                        i,
                        field.len(),
                        length
                    ),
                ));
            }
        }
        Ok(RecordArray {
            fields,
            keys,
            length,
        })
    }

    /// Named fields; the length is taken from the first field.
    pub fn from_fields<K: Into<String>>(
        fields: impl IntoIterator<Item = (K, ContentRef)>,
    ) -> Result<Self, ContentError> {
        let (keys, fields): (Vec<String>, Vec<ContentRef>) =
            fields.into_iter().map(|(k, f)| (k.into(), f)).unzip();
        let length = fields.first().map_or(0, |f| f.len());
        Self::new(fields, Some(keys), length)
    }

    pub fn tuple(fields: Vec<ContentRef>) -> Result<Self, ContentError> {
        let length = fields.first().map_or(0, |f| f.len());
        Self::new(fields, None, length)
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn fields(&self) -> &[ContentRef] {
        &self.fields
    }

    pub fn is_tuple(&self) -> bool {
        self.keys.is_none()
    }

    /// Field names, with tuple slots named "0", "1", ...
    pub fn keys(&self) -> Vec<String> {
        match &self.keys {
            Some(keys) => keys.clone(),
            None => (0..self.fields.len()).map(|i| i.to_string()).collect(),
        }
    }

    pub fn field_index(&self, key: &str) -> Option<usize> {
        match &self.keys {
            Some(keys) => keys.iter().position(|k| k == key),
            None => key
                .parse::<usize>()
                .ok()
                .filter(|&i| i < self.fields.len()),
        }
    }

    pub fn field(&self, key: &str) -> Option<&ContentRef> {
        self.field_index(key).map(|i| &self.fields[i])
    }

    pub fn ty(&self) -> RecordType {
        RecordType {
            keys: self.keys.clone(),
            contents: self.fields.iter().map(|f| f.ty()).collect(),
        }
    }

    /// The same keys over new fields of `length`.
    pub fn with_fields(&self, fields: Vec<ContentRef>, length: usize) -> Result<Self, ContentError> {
        Self::new(fields, self.keys.clone(), length)
    }

    /// Replace `key` in place, or append it as a new field. Tuples
    /// become named records when a field is added by name.
    pub fn with_field(&self, key: &str, what: ContentRef) -> Result<Self, ContentError> {
        let mut fields = self.fields.clone();
        let mut keys = self.keys();
        match self.field_index(key) {
            Some(i) => fields[i] = what,
            None => {
                fields.push(what);
                keys.push(key.to_string());
            }
        }
        let keys = if self.is_tuple() && self.field_index(key).is_some() {
            None
        } else {
            Some(keys)
        };
        Self::new(fields, keys, self.length)
    }

    pub fn getitem_range(&self, start: usize, stop: usize) -> Result<Self, ContentError> {
        let fields = self
            .fields
            .iter()
            .map(|f| f.getitem_range(start, stop))
            .collect::<Result<_, _>>()?;
        self.with_fields(fields, stop - start)
    }

    pub fn carry(&self, positions: &[usize]) -> Result<Self, ContentError> {
        let fields = self
            .fields
            .iter()
            .map(|f| f.carry_or_view(positions))
            .collect::<Result<_, _>>()?;
        self.with_fields(fields, positions.len())
    }

    pub fn to_value_at(&self, i: usize) -> Result<Value, ContentError> {
        let values = self
            .fields
            .iter()
            .map(|f| f.to_value_at(i))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(match &self.keys {
            Some(keys) => Value::Record(
                keys.iter().cloned().zip(values).collect::<IndexMap<_, _>>(),
            ),
            None => Value::Tuple(values),
        })
    }

    pub fn validate(&self) -> Result<(), ContentError> {
        Self::new(self.fields.clone(), self.keys.clone(), self.length)?;
        self.fields.iter().try_for_each(|f| f.validate())
    }
}

impl From<RecordArray> for ContentRef {
    fn from(array: RecordArray) -> Self {
        Arc::new(Content::Record(array))
    }
}
