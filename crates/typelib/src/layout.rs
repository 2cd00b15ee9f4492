// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 typelib contributors

//! Memory layout compiler.
//!
//! Reduces a type to a flat program over a contiguous value buffer:
//!
//! - `Memcpy(n)`: the next `n` bytes can be copied verbatim;
//! - `Array(count)` ... `End`: the enclosed program applies to `count`
//!   consecutive elements;
//! - `Container(id)` ... `End`: the next bytes hold a container of type
//!   `id`, whose elements follow the enclosed program.
//!
//! Adjacent spans are merged, so any type without containers compiles to a
//! single `Memcpy` of its whole size, padding included.

use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::types::{Array, Category, Compound, Container, Enum, NumericKind, Pointer, Type, TypeId};
use crate::visitor::{contains_category, dispatch, TypeVisitor};

/// One instruction of a [`MemoryLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutOp {
    Memcpy(usize),
    Array(usize),
    Container(TypeId),
    End,
}

/// What the compiler may treat as plain bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutOptions {
    /// Copy pointers as opaque `sizeof(pointer)` spans.
    pub accept_pointers: bool,
    /// Copy opaque types as raw spans of their size.
    pub accept_opaques: bool,
}

/// Compiled layout program of one type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MemoryLayout {
    ops: Vec<LayoutOp>,
}

impl MemoryLayout {
    /// Compiles `ty` with the default options (no pointers, no opaques).
    pub fn compile(registry: &Registry, ty: &Type) -> Result<Self> {
        Self::compile_with(registry, ty, LayoutOptions::default())
    }

    /// Compiles `ty`; fails with [`Error::NoLayout`] on types that cannot
    /// be handled generically.
    pub fn compile_with(registry: &Registry, ty: &Type, options: LayoutOptions) -> Result<Self> {
        let layout = compile_type(registry, ty, options)?;
        log::trace!("[layout] {} -> {} ops", ty.name(), layout.ops.len());
        Ok(layout)
    }

    pub fn ops(&self) -> &[LayoutOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// `true` when the whole value is one raw span (or empty).
    pub fn is_memcpy(&self) -> bool {
        matches!(self.ops.as_slice(), [] | [LayoutOp::Memcpy(_)])
    }

    fn push_memcpy(&mut self, size: usize) {
        if size == 0 {
            return;
        }
        if let Some(LayoutOp::Memcpy(last)) = self.ops.last_mut() {
            *last += size;
        } else {
            self.ops.push(LayoutOp::Memcpy(size));
        }
    }

    fn push_block(&mut self, opener: LayoutOp, body: MemoryLayout) {
        self.ops.push(opener);
        self.ops.extend(body.ops);
        self.ops.push(LayoutOp::End);
    }
}

/// Index just past the `End` closing the block whose body starts at `start`.
pub(crate) fn block_end(ops: &[LayoutOp], start: usize) -> usize {
    let mut depth = 0usize;
    for (i, op) in ops.iter().enumerate().skip(start) {
        match op {
            LayoutOp::Array(_) | LayoutOp::Container(_) => depth += 1,
            LayoutOp::End if depth == 0 => return i + 1,
            LayoutOp::End => depth -= 1,
            LayoutOp::Memcpy(_) => {}
        }
    }
    ops.len()
}

fn compile_type(registry: &Registry, ty: &Type, options: LayoutOptions) -> Result<MemoryLayout> {
    let mut compiler = LayoutCompiler {
        registry,
        options,
        layout: MemoryLayout::default(),
    };
    dispatch(&mut compiler, ty)?;
    Ok(compiler.layout)
}

fn no_layout(ty: &Type, reason: &str) -> Error {
    Error::NoLayout {
        type_name: ty.name().to_string(),
        reason: reason.to_string(),
    }
}

struct LayoutCompiler<'r> {
    registry: &'r Registry,
    options: LayoutOptions,
    layout: MemoryLayout,
}

impl<'r> TypeVisitor<'r> for LayoutCompiler<'r> {
    fn registry(&self) -> &'r Registry {
        self.registry
    }

    fn visit_numeric(&mut self, ty: &'r Type, _kind: NumericKind) -> Result<bool> {
        self.layout.push_memcpy(ty.size());
        Ok(true)
    }

    fn visit_enum(&mut self, ty: &'r Type, _def: &'r Enum) -> Result<bool> {
        self.layout.push_memcpy(ty.size());
        Ok(true)
    }

    fn visit_pointer(&mut self, ty: &'r Type, _pointer: &'r Pointer) -> Result<bool> {
        if !self.options.accept_pointers {
            return Err(no_layout(ty, "pointers are not accepted"));
        }
        self.layout.push_memcpy(ty.size());
        Ok(true)
    }

    fn visit_opaque(&mut self, ty: &'r Type) -> Result<bool> {
        if !self.options.accept_opaques {
            return Err(no_layout(ty, "opaque types have no known structure"));
        }
        self.layout.push_memcpy(ty.size());
        Ok(true)
    }

    fn visit_array(&mut self, _ty: &'r Type, array: &'r Array) -> Result<bool> {
        let element = self.registry.get_by_id(array.element);
        let body = compile_type(self.registry, element, self.options)?;
        match body.ops.as_slice() {
            [] => {}
            [LayoutOp::Memcpy(size)] => self.layout.push_memcpy(size * array.dimension),
            _ if array.dimension == 0 => {}
            _ => self.layout.push_block(LayoutOp::Array(array.dimension), body),
        }
        Ok(false)
    }

    fn visit_compound(&mut self, ty: &'r Type, compound: &'r Compound) -> Result<bool> {
        let mut cursor = 0;
        // Byte ranges of emitted fields that own container slots.
        let mut owned: Vec<(usize, usize)> = Vec::new();
        for field in compound.fields() {
            let field_ty = self.registry.get_by_id(field.ty());
            let holds_container = contains_category(self.registry, field_ty, Category::Container);
            let range = (field.offset(), field.offset() + field_ty.size());
            if field.offset() < cursor {
                // Overlaps bytes already covered: only flat members can share
                // them, and never with a container slot.
                if holds_container {
                    return Err(no_layout(
                        ty,
                        &format!("field {} overlaps another field and holds a container", field.name()),
                    ));
                }
                if owned.iter().any(|&(start, end)| range.0 < end && start < range.1) {
                    return Err(no_layout(
                        ty,
                        &format!("field {} overlaps a field holding a container", field.name()),
                    ));
                }
                continue;
            }
            self.layout.push_memcpy(field.offset() - cursor);
            dispatch(self, field_ty)?;
            if holds_container {
                owned.push(range);
            }
            cursor = range.1;
        }
        self.layout.push_memcpy(ty.size().saturating_sub(cursor));
        Ok(false)
    }

    fn visit_container(&mut self, ty: &'r Type, container: &'r Container) -> Result<bool> {
        let element = self.registry.get_by_id(container.element());
        let body = compile_type(self.registry, element, self.options)?;
        self.layout.push_block(LayoutOp::Container(ty.id()), body);
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Abi, CompoundBuilder, EnumBuilder};

    fn registry() -> Registry {
        let mut reg = Registry::with_abi(Abi::LP64);
        reg.add_numeric("/char", NumericKind::SInt, 1).unwrap();
        reg.add_numeric("/int", NumericKind::SInt, 4).unwrap();
        reg.add_numeric("/double", NumericKind::Float, 8).unwrap();
        reg
    }

    #[test]
    fn test_flat_compound_is_one_memcpy() {
        let mut reg = registry();
        let c = reg.build("/char").unwrap();
        let d = reg.build("/double").unwrap();
        let e = reg.add_enum(EnumBuilder::new("/E").value("A", 3)).unwrap();
        let id = reg
            .add_compound(
                CompoundBuilder::new("/Flat")
                    .field("c", c)
                    .field("d", d)
                    .field("e", e),
            )
            .unwrap();
        let ty = reg.get_by_id(id);
        let layout = MemoryLayout::compile(&reg, ty).unwrap();
        assert_eq!(layout.ops(), &[LayoutOp::Memcpy(ty.size())]);
        assert!(layout.is_memcpy());
    }

    #[test]
    fn test_multidimensional_array_is_one_memcpy() {
        let mut reg = registry();
        let id = reg.build("/int[3][4]").unwrap();
        let layout = MemoryLayout::compile(&reg, reg.get_by_id(id)).unwrap();
        assert_eq!(layout.ops(), &[LayoutOp::Memcpy(48)]);
    }

    #[test]
    fn test_single_container_field() {
        let mut reg = registry();
        let i = reg.build("/int").unwrap();
        let v = reg.build("/std/vector</int>").unwrap();
        let d = reg.build("/double").unwrap();
        let id = reg
            .add_compound(
                CompoundBuilder::new("/WithVec")
                    .field("head", i)
                    .field("v", v)
                    .field("tail", d),
            )
            .unwrap();
        let ty = reg.get_by_id(id);
        let v_offset = ty.field("v").unwrap().offset();
        let v_size = reg.get_by_id(v).size();
        let layout = MemoryLayout::compile(&reg, ty).unwrap();
        assert_eq!(
            layout.ops(),
            &[
                LayoutOp::Memcpy(v_offset),
                LayoutOp::Container(v),
                LayoutOp::Memcpy(4),
                LayoutOp::End,
                LayoutOp::Memcpy(ty.size() - v_offset - v_size),
            ]
        );
        assert!(!layout.is_memcpy());
    }

    #[test]
    fn test_array_of_containers_keeps_block() {
        let mut reg = registry();
        let id = reg.build("/std/vector</int>[2]").unwrap();
        let v = reg.build("/std/vector</int>").unwrap();
        let layout = MemoryLayout::compile(&reg, reg.get_by_id(id)).unwrap();
        assert_eq!(
            layout.ops(),
            &[
                LayoutOp::Array(2),
                LayoutOp::Container(v),
                LayoutOp::Memcpy(4),
                LayoutOp::End,
                LayoutOp::End,
            ]
        );
        assert_eq!(block_end(layout.ops(), 1), 5);
        assert_eq!(block_end(layout.ops(), 2), 4);
    }

    #[test]
    fn test_opaque_and_pointer_need_options() {
        let mut reg = registry();
        let o = reg.add_opaque("/Handle", 8).unwrap();
        let p = reg.build("/int*").unwrap();
        let i = reg.build("/int").unwrap();
        let id = reg
            .add_compound(
                CompoundBuilder::new("/Mixed")
                    .field("i", i)
                    .field("h", o)
                    .field("p", p),
            )
            .unwrap();
        let ty = reg.get_by_id(id);

        assert!(matches!(
            MemoryLayout::compile(&reg, reg.get_by_id(o)),
            Err(Error::NoLayout { .. })
        ));
        assert!(matches!(
            MemoryLayout::compile(&reg, ty),
            Err(Error::NoLayout { type_name, .. }) if type_name == "/Handle"
        ));

        let only_pointers = LayoutOptions {
            accept_pointers: true,
            ..LayoutOptions::default()
        };
        assert!(MemoryLayout::compile_with(&reg, ty, only_pointers).is_err());

        let everything = LayoutOptions {
            accept_pointers: true,
            accept_opaques: true,
        };
        let layout = MemoryLayout::compile_with(&reg, ty, everything).unwrap();
        assert_eq!(layout.ops(), &[LayoutOp::Memcpy(ty.size())]);
    }

    #[test]
    fn test_overlapping_fields() {
        let mut reg = registry();
        let i = reg.build("/int").unwrap();
        let d = reg.build("/double").unwrap();
        let v = reg.build("/std/vector</int>").unwrap();
        let union = reg
            .add_compound(
                CompoundBuilder::new("/Union")
                    .field_at("i", i, 0)
                    .field_at("d", d, 0)
                    .size(8),
            )
            .unwrap();
        let layout = MemoryLayout::compile(&reg, reg.get_by_id(union)).unwrap();
        assert_eq!(layout.ops(), &[LayoutOp::Memcpy(8)]);

        let bad = reg
            .add_compound(
                CompoundBuilder::new("/BadUnion")
                    .field_at("d", d, 0)
                    .field_at("v", v, 0),
            )
            .unwrap();
        assert!(matches!(
            MemoryLayout::compile(&reg, reg.get_by_id(bad)),
            Err(Error::NoLayout { .. })
        ));
    }

    #[test]
    fn test_flat_field_over_container_slot_rejected() {
        let mut reg = registry();
        let v = reg.build("/std/vector</int>").unwrap();
        let len = reg.add_numeric("/u64", NumericKind::UInt, 8).unwrap();
        let c = reg.build("/char").unwrap();

        let aliased = reg
            .add_compound(
                CompoundBuilder::new("/AliasedLength")
                    .field_at("v", v, 0)
                    .field_at("len", len, 8)
                    .size(24),
            )
            .unwrap();
        assert!(matches!(
            MemoryLayout::compile(&reg, reg.get_by_id(aliased)),
            Err(Error::NoLayout { type_name, .. }) if type_name == "/AliasedLength"
        ));

        // Containers nested in an emitted field are covered as well.
        let holder = reg
            .add_compound(CompoundBuilder::new("/Holder").field("v", v))
            .unwrap();
        let nested = reg
            .add_compound(
                CompoundBuilder::new("/NestedAlias")
                    .field_at("h", holder, 0)
                    .field_at("tag", c, 4),
            )
            .unwrap();
        assert!(MemoryLayout::compile(&reg, reg.get_by_id(nested)).is_err());

        // Overlaps among flat fields next to a container stay accepted.
        let i = reg.build("/int").unwrap();
        let mixed = reg
            .add_compound(
                CompoundBuilder::new("/FlatUnionThenVec")
                    .field_at("a", i, 0)
                    .field_at("b", c, 0)
                    .field_at("v", v, 8),
            )
            .unwrap();
        let layout = MemoryLayout::compile(&reg, reg.get_by_id(mixed)).unwrap();
        assert_eq!(layout.ops()[0], LayoutOp::Memcpy(8));
    }

    #[test]
    fn test_null_and_empty_arrays() {
        let mut reg = registry();
        let nil = reg.find("/nil").unwrap();
        assert!(MemoryLayout::compile(&reg, nil).unwrap().is_empty());
        let id = reg.build("/std/vector</int>[0]").unwrap();
        assert!(MemoryLayout::compile(&reg, reg.get_by_id(id)).unwrap().is_empty());
    }

    #[test]
    fn test_compilation_is_idempotent() {
        let mut reg = registry();
        let id = reg.build("/std/vector</std/vector</double>>[3]").unwrap();
        let ty = reg.get_by_id(id);
        let a = MemoryLayout::compile(&reg, ty).unwrap();
        let b = MemoryLayout::compile(&reg, ty).unwrap();
        assert_eq!(a, b);
    }
}
