// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 typelib contributors

//! Fluent definitions for compounds and enums, consumed by
//! [`Registry::add_compound`](crate::Registry::add_compound) and
//! [`Registry::add_enum`](crate::Registry::add_enum).

use crate::types::TypeId;

#[derive(Debug, Clone)]
pub(crate) struct FieldSpec {
    pub(crate) name: String,
    pub(crate) ty: TypeId,
    pub(crate) offset: Option<usize>,
}

/// Definition of a compound type.
///
/// Fields added with [`field`](Self::field) are placed after the previous
/// field at their natural alignment, the way a C compiler lays out a struct.
/// [`field_at`](Self::field_at) takes the offset computed by an importer
/// verbatim; overlapping offsets describe unions.
#[derive(Debug, Clone)]
pub struct CompoundBuilder {
    pub(crate) name: String,
    pub(crate) fields: Vec<FieldSpec>,
    pub(crate) size: Option<usize>,
}

impl CompoundBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            size: None,
        }
    }

    /// Append a field at the next naturally aligned offset.
    pub fn field(mut self, name: impl Into<String>, ty: TypeId) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            ty,
            offset: None,
        });
        self
    }

    /// Add a field at an explicit byte offset.
    pub fn field_at(mut self, name: impl Into<String>, ty: TypeId, offset: usize) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            ty,
            offset: Some(offset),
        });
        self
    }

    /// Force the total size (trailing padding included).
    pub fn size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }
}

/// Definition of an enumeration.
#[derive(Debug, Clone)]
pub struct EnumBuilder {
    pub(crate) name: String,
    pub(crate) values: Vec<(String, i64)>,
    /// First symbol whose implicit value did not fit in an `i64`.
    pub(crate) overflow: Option<String>,
}

impl EnumBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
            overflow: None,
        }
    }

    /// Add a symbol with an explicit value.
    pub fn value(mut self, symbol: impl Into<String>, value: i64) -> Self {
        self.values.push((symbol.into(), value));
        self
    }

    /// Add a symbol valued one past the previous one (0 for the first).
    ///
    /// A symbol following `i64::MAX` is recorded and makes
    /// [`Registry::add_enum`](crate::Registry::add_enum) fail.
    pub fn next(mut self, symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        let value = match self.values.last() {
            None => 0,
            Some((_, v)) => v.checked_add(1).unwrap_or_else(|| {
                self.overflow.get_or_insert_with(|| symbol.clone());
                *v
            }),
        };
        self.value(symbol, value)
    }
}
