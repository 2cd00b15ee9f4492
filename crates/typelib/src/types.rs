// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 typelib contributors

//! Type descriptors.
//!
//! Every type lives in a [`Registry`](crate::Registry) arena and refers to
//! the types it is built from through [`TypeId`] handles. Descriptors are
//! immutable once registered.

use crate::container::ContainerKind;
use std::fmt;
use std::sync::Arc;

/// Handle to a type inside the registry that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Position in the registry arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Structural category of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Null,
    Numeric,
    Enum,
    Array,
    Pointer,
    Compound,
    Container,
    Opaque,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Numeric => "numeric",
            Self::Enum => "enum",
            Self::Array => "array",
            Self::Pointer => "pointer",
            Self::Compound => "compound",
            Self::Container => "container",
            Self::Opaque => "opaque",
        };
        f.write_str(name)
    }
}

/// Representation of a numeric type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
    /// Two's complement signed integer.
    SInt,
    /// Unsigned integer.
    UInt,
    /// IEEE 754 floating point.
    Float,
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SInt => "sint",
            Self::UInt => "uint",
            Self::Float => "float",
        })
    }
}

/// Enumeration symbols in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enum {
    values: Vec<(String, i64)>,
}

impl Enum {
    pub(crate) fn new(values: Vec<(String, i64)>) -> Self {
        Self { values }
    }

    /// (symbol, value) pairs in declaration order.
    pub fn values(&self) -> &[(String, i64)] {
        &self.values
    }

    /// Value of a symbol.
    pub fn value(&self, symbol: &str) -> Option<i64> {
        self.values
            .iter()
            .find(|(name, _)| name == symbol)
            .map(|(_, v)| *v)
    }

    /// First symbol declared with `value`.
    pub fn symbol(&self, value: i64) -> Option<&str> {
        self.values
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(name, _)| name.as_str())
    }

    /// Value a freshly initialized field takes: zero when zero is a
    /// declared value, the first declared value otherwise.
    pub fn default_value(&self) -> i64 {
        if self.symbol(0).is_some() {
            return 0;
        }
        self.values.first().map_or(0, |(_, v)| *v)
    }
}

/// Fixed-size array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Array {
    pub element: TypeId,
    pub dimension: usize,
}

/// Pointer to another type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pointer {
    pub target: TypeId,
}

/// Named member of a compound, at a byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    offset: usize,
    ty: TypeId,
}

impl Field {
    pub(crate) fn new(name: impl Into<String>, offset: usize, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            offset,
            ty,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Offset from the start of the compound.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn ty(&self) -> TypeId {
        self.ty
    }
}

/// Record type. Fields are sorted by offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compound {
    fields: Vec<Field>,
}

impl Compound {
    pub(crate) fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Instantiation of a container kind on an element type.
#[derive(Debug, Clone)]
pub struct Container {
    kind: Arc<dyn ContainerKind>,
    element: TypeId,
}

impl Container {
    pub(crate) fn new(kind: Arc<dyn ContainerKind>, element: TypeId) -> Self {
        Self { kind, element }
    }

    /// Runtime operations of this container family.
    pub fn kind(&self) -> &dyn ContainerKind {
        self.kind.as_ref()
    }

    pub fn element(&self) -> TypeId {
        self.element
    }
}

/// Category-specific part of a type.
#[derive(Debug, Clone)]
pub enum TypeKind {
    Null,
    Numeric(NumericKind),
    Enum(Enum),
    Array(Array),
    Pointer(Pointer),
    Compound(Compound),
    Container(Container),
    Opaque,
}

/// A registered type.
#[derive(Debug, Clone)]
pub struct Type {
    id: TypeId,
    name: String,
    size: usize,
    align: usize,
    kind: TypeKind,
}

impl Type {
    pub(crate) fn new(id: TypeId, name: String, size: usize, align: usize, kind: TypeKind) -> Self {
        Self {
            id,
            name,
            size,
            align,
            kind,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Alignment requirement in bytes.
    pub fn alignment(&self) -> usize {
        self.align
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn category(&self) -> Category {
        match self.kind {
            TypeKind::Null => Category::Null,
            TypeKind::Numeric(_) => Category::Numeric,
            TypeKind::Enum(_) => Category::Enum,
            TypeKind::Array(_) => Category::Array,
            TypeKind::Pointer(_) => Category::Pointer,
            TypeKind::Compound(_) => Category::Compound,
            TypeKind::Container(_) => Category::Container,
            TypeKind::Opaque => Category::Opaque,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, TypeKind::Null)
    }

    pub fn as_numeric(&self) -> Option<NumericKind> {
        match self.kind {
            TypeKind::Numeric(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&Enum> {
        match &self.kind {
            TypeKind::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match &self.kind {
            TypeKind::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_pointer(&self) -> Option<&Pointer> {
        match &self.kind {
            TypeKind::Pointer(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_compound(&self) -> Option<&Compound> {
        match &self.kind {
            TypeKind::Compound(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_container(&self) -> Option<&Container> {
        match &self.kind {
            TypeKind::Container(c) => Some(c),
            _ => None,
        }
    }

    /// Field of a compound by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.as_compound()?.field(name)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_default_prefers_zero() {
        let e = Enum::new(vec![("A".into(), 3), ("B".into(), 0)]);
        assert_eq!(e.default_value(), 0);
    }

    #[test]
    fn test_enum_default_falls_back_to_first_value() {
        let e = Enum::new(vec![("TEST".into(), -10), ("OTHER".into(), 4)]);
        assert_eq!(e.default_value(), -10);
        assert_eq!(Enum::new(Vec::new()).default_value(), 0);
    }

    #[test]
    fn test_enum_lookups() {
        let e = Enum::new(vec![("ON".into(), 1), ("OFF".into(), 0), ("ALSO_ON".into(), 1)]);
        assert_eq!(e.value("OFF"), Some(0));
        assert_eq!(e.value("MAYBE"), None);
        assert_eq!(e.symbol(1), Some("ON"));
        assert_eq!(e.symbol(7), None);
    }

    #[test]
    fn test_category_display() {
        assert_eq!(Category::Compound.to_string(), "compound");
        assert_eq!(NumericKind::Float.to_string(), "float");
    }
}
