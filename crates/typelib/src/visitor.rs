// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 typelib contributors

//! Double dispatch over type categories.
//!
//! [`dispatch`] picks the `visit_*` handler matching a type's category.
//! Default handlers recurse through the `walk_*` functions, so a visitor
//! overrides only the categories it cares about and can still call the
//! default recursion from its override.
//!
//! Handlers return `Ok(false)` to stop descending into the current subtree
//! (siblings are still visited) and `Err` to abort the whole walk. Pointer
//! and opaque types fail by default.

use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::types::{Array, Category, Compound, Container, Enum, Field, NumericKind, Pointer, Type, TypeKind};

/// Category handlers. `'r` is the lifetime of the registry being walked.
pub trait TypeVisitor<'r> {
    /// Registry the visited types belong to.
    fn registry(&self) -> &'r Registry;

    fn visit_null(&mut self, _ty: &'r Type) -> Result<bool> {
        Ok(true)
    }

    fn visit_numeric(&mut self, _ty: &'r Type, _kind: NumericKind) -> Result<bool> {
        Ok(true)
    }

    fn visit_enum(&mut self, _ty: &'r Type, _def: &'r Enum) -> Result<bool> {
        Ok(true)
    }

    fn visit_array(&mut self, _ty: &'r Type, array: &'r Array) -> Result<bool> {
        walk_array(self, array)
    }

    fn visit_pointer(&mut self, ty: &'r Type, _pointer: &'r Pointer) -> Result<bool> {
        Err(unsupported(ty))
    }

    fn visit_compound(&mut self, ty: &'r Type, compound: &'r Compound) -> Result<bool> {
        walk_compound(self, ty, compound)
    }

    /// Called for each field of a compound, in offset order.
    fn visit_field(&mut self, _compound: &'r Type, field: &'r Field) -> Result<bool> {
        let ty = self.registry().get_by_id(field.ty());
        dispatch(self, ty)
    }

    fn visit_container(&mut self, _ty: &'r Type, container: &'r Container) -> Result<bool> {
        walk_container(self, container)
    }

    fn visit_opaque(&mut self, ty: &'r Type) -> Result<bool> {
        Err(unsupported(ty))
    }
}

/// Calls the handler matching the category of `ty`.
pub fn dispatch<'r, V>(visitor: &mut V, ty: &'r Type) -> Result<bool>
where
    V: TypeVisitor<'r> + ?Sized,
{
    match ty.kind() {
        TypeKind::Null => visitor.visit_null(ty),
        TypeKind::Numeric(kind) => visitor.visit_numeric(ty, *kind),
        TypeKind::Enum(def) => visitor.visit_enum(ty, def),
        TypeKind::Array(array) => visitor.visit_array(ty, array),
        TypeKind::Pointer(pointer) => visitor.visit_pointer(ty, pointer),
        TypeKind::Compound(compound) => visitor.visit_compound(ty, compound),
        TypeKind::Container(container) => visitor.visit_container(ty, container),
        TypeKind::Opaque => visitor.visit_opaque(ty),
    }
}

/// Default array recursion: the element type, once.
pub fn walk_array<'r, V>(visitor: &mut V, array: &'r Array) -> Result<bool>
where
    V: TypeVisitor<'r> + ?Sized,
{
    let element = visitor.registry().get_by_id(array.element);
    dispatch(visitor, element)
}

/// Default compound recursion: every field in offset order.
pub fn walk_compound<'r, V>(visitor: &mut V, ty: &'r Type, compound: &'r Compound) -> Result<bool>
where
    V: TypeVisitor<'r> + ?Sized,
{
    for field in compound.fields() {
        visitor.visit_field(ty, field)?;
    }
    Ok(true)
}

/// Default container recursion: the element type, once.
pub fn walk_container<'r, V>(visitor: &mut V, container: &'r Container) -> Result<bool>
where
    V: TypeVisitor<'r> + ?Sized,
{
    let element = visitor.registry().get_by_id(container.element());
    dispatch(visitor, element)
}

/// Failure reported by the default pointer and opaque handlers.
pub fn unsupported(ty: &Type) -> Error {
    Error::UnsupportedCategory {
        type_name: ty.name().to_string(),
        category: ty.category(),
    }
}

/// Looks for `category` anywhere in `ty`, pointer targets excluded.
struct CategoryFinder<'r> {
    registry: &'r Registry,
    category: Category,
    found: bool,
}

impl<'r> CategoryFinder<'r> {
    fn hit(&mut self, ty: &Type) -> bool {
        self.found |= ty.category() == self.category;
        !self.found
    }
}

impl<'r> TypeVisitor<'r> for CategoryFinder<'r> {
    fn registry(&self) -> &'r Registry {
        self.registry
    }

    fn visit_null(&mut self, ty: &'r Type) -> Result<bool> {
        Ok(self.hit(ty))
    }

    fn visit_numeric(&mut self, ty: &'r Type, _kind: NumericKind) -> Result<bool> {
        Ok(self.hit(ty))
    }

    fn visit_enum(&mut self, ty: &'r Type, _def: &'r Enum) -> Result<bool> {
        Ok(self.hit(ty))
    }

    fn visit_array(&mut self, ty: &'r Type, array: &'r Array) -> Result<bool> {
        if !self.hit(ty) {
            return Ok(false);
        }
        walk_array(self, array)
    }

    fn visit_pointer(&mut self, ty: &'r Type, _pointer: &'r Pointer) -> Result<bool> {
        Ok(self.hit(ty))
    }

    fn visit_compound(&mut self, ty: &'r Type, compound: &'r Compound) -> Result<bool> {
        if !self.hit(ty) {
            return Ok(false);
        }
        walk_compound(self, ty, compound)
    }

    fn visit_field(&mut self, _compound: &'r Type, field: &'r Field) -> Result<bool> {
        if self.found {
            return Ok(false);
        }
        let ty = self.registry.get_by_id(field.ty());
        dispatch(self, ty)
    }

    fn visit_container(&mut self, ty: &'r Type, container: &'r Container) -> Result<bool> {
        if !self.hit(ty) {
            return Ok(false);
        }
        walk_container(self, container)
    }

    fn visit_opaque(&mut self, ty: &'r Type) -> Result<bool> {
        Ok(self.hit(ty))
    }
}

/// Returns `true` if `ty` is, or structurally contains, a type of
/// `category`. Pointers are leaves: their targets are not searched.
pub fn contains_category(registry: &Registry, ty: &Type, category: Category) -> bool {
    let mut finder = CategoryFinder {
        registry,
        category,
        found: false,
    };
    // The finder overrides every failing handler.
    let _ = dispatch(&mut finder, ty);
    finder.found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompoundBuilder, EnumBuilder};

    /// Records visited type names; refuses to descend into `/Skipped`.
    struct Recorder<'r> {
        registry: &'r Registry,
        seen: Vec<String>,
    }

    impl<'r> TypeVisitor<'r> for Recorder<'r> {
        fn registry(&self) -> &'r Registry {
            self.registry
        }

        fn visit_numeric(&mut self, ty: &'r Type, _kind: NumericKind) -> Result<bool> {
            self.seen.push(ty.name().to_string());
            Ok(true)
        }

        fn visit_enum(&mut self, ty: &'r Type, _def: &'r Enum) -> Result<bool> {
            self.seen.push(ty.name().to_string());
            Ok(true)
        }

        fn visit_compound(&mut self, ty: &'r Type, compound: &'r Compound) -> Result<bool> {
            self.seen.push(ty.name().to_string());
            if ty.name() == "/Skipped" {
                return Ok(false);
            }
            walk_compound(self, ty, compound)
        }
    }

    fn sample() -> Registry {
        let mut reg = Registry::new();
        let i = reg.add_numeric("/int", NumericKind::SInt, 4).unwrap();
        let d = reg.add_numeric("/double", NumericKind::Float, 8).unwrap();
        let e = reg.add_enum(EnumBuilder::new("/E").next("A")).unwrap();
        let skipped = reg
            .add_compound(CompoundBuilder::new("/Skipped").field("hidden", d))
            .unwrap();
        let arr = reg.array_of(i, 3).unwrap();
        let vec = reg.container_of("/std/vector", d).unwrap();
        reg.add_compound(
            CompoundBuilder::new("/Outer")
                .field("a", arr)
                .field("s", skipped)
                .field("e", e)
                .field("v", vec),
        )
        .unwrap();
        reg
    }

    #[test]
    fn test_dispatch_visits_in_field_order_and_prunes() {
        let reg = sample();
        let mut rec = Recorder {
            registry: &reg,
            seen: Vec::new(),
        };
        let keep_going = dispatch(&mut rec, reg.find("/Outer").unwrap()).unwrap();
        assert!(keep_going);
        assert_eq!(
            rec.seen,
            vec!["/Outer", "/int", "/Skipped", "/E", "/double"]
        );
    }

    #[test]
    fn test_pointer_and_opaque_fail_by_default() {
        let mut reg = Registry::new();
        let i = reg.add_numeric("/int", NumericKind::SInt, 4).unwrap();
        let p = reg.pointer_to(i).unwrap();
        let o = reg.add_opaque("/Handle", 8).unwrap();
        let mut rec = Recorder {
            registry: &reg,
            seen: Vec::new(),
        };
        let err = dispatch(&mut rec, reg.get_by_id(p)).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedCategory {
                category: Category::Pointer,
                ..
            }
        ));
        let err = dispatch(&mut rec, reg.get_by_id(o)).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedCategory {
                category: Category::Opaque,
                ..
            }
        ));
    }

    #[test]
    fn test_contains_category() {
        let reg = sample();
        let outer = reg.find("/Outer").unwrap();
        assert!(contains_category(&reg, outer, Category::Container));
        assert!(contains_category(&reg, outer, Category::Enum));
        assert!(!contains_category(&reg, outer, Category::Pointer));
        assert!(!contains_category(
            &reg,
            reg.find("/Skipped").unwrap(),
            Category::Container
        ));
    }
}
