// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 typelib contributors

//! Type registry.
//!
//! The registry is the sole owner of its types. Types are stored in an
//! arena and never removed, so a [`TypeId`] handed out by a registry stays
//! valid for that registry's whole life, and a type's children always sit
//! earlier in the arena than the type itself.
//!
//! Names are absolute (`/ns/Name`). Several names may map to the same type
//! (aliases). Relative lookups are resolved from the default namespace
//! outwards, up to the root.

use crate::abi::{checked_align_up, Abi};
use crate::builder::{CompoundBuilder, EnumBuilder};
use crate::container::{ContainerKind, VectorKind};
use crate::error::{Error, Result};
use crate::typename::{self, Modifier};
use crate::types::{Array, Compound, Container, Enum, Field, NumericKind, Pointer, Type, TypeId, TypeKind};
use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};
use std::sync::Arc;

/// Owning catalog of types indexed by name.
#[derive(Debug)]
pub struct Registry {
    types: Vec<Type>,
    names: BTreeMap<String, TypeId>,
    default_namespace: String,
    abi: Abi,
    containers: BTreeMap<String, Arc<dyn ContainerKind>>,
}

impl Registry {
    /// Name of the null type every registry starts with.
    pub const NULL_TYPE: &'static str = "/nil";

    /// Empty registry for the host ABI.
    pub fn new() -> Self {
        Self::with_abi(Abi::host())
    }

    /// Empty registry describing types of the given ABI.
    ///
    /// The registry starts with `/nil` and the `/std/vector` and
    /// `/std/string` container kinds.
    pub fn with_abi(abi: Abi) -> Self {
        let mut registry = Self {
            types: Vec::new(),
            names: BTreeMap::new(),
            default_namespace: typename::ROOT_NAMESPACE.to_string(),
            abi,
            containers: BTreeMap::new(),
        };
        registry.insert(Self::NULL_TYPE.to_string(), 0, 1, TypeKind::Null);
        registry.register_container_kind(Arc::new(VectorKind::default()));
        registry.register_container_kind(Arc::new(VectorKind::new(VectorKind::STD_STRING)));
        registry
    }

    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    /// Number of types (aliases not counted).
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Type behind a handle produced by this registry.
    ///
    /// # Panics
    ///
    /// Panics if `id` comes from another, larger registry.
    pub fn get_by_id(&self, id: TypeId) -> &Type {
        &self.types[id.index()]
    }

    /// Resolves a name to a handle.
    ///
    /// Absolute names are looked up as is. Relative names are tried in the
    /// default namespace, then in each enclosing namespace up to the root.
    pub fn id_of(&self, name: &str) -> Option<TypeId> {
        if typename::is_absolute(name) {
            return self.names.get(name).copied();
        }
        let mut ns = self.default_namespace.as_str();
        loop {
            if let Some(id) = self.names.get(&format!("{}{}", ns, name)) {
                return Some(*id);
            }
            if ns == typename::ROOT_NAMESPACE {
                return None;
            }
            ns = typename::namespace_of(&ns[..ns.len() - 1]);
        }
    }

    /// Looks a type up by (possibly relative) name.
    pub fn get(&self, name: &str) -> Option<&Type> {
        self.id_of(name).map(|id| self.get_by_id(id))
    }

    /// Same as [`get`](Self::get), failing with [`Error::UndefinedType`].
    pub fn find(&self, name: &str) -> Result<&Type> {
        self.get(name)
            .ok_or_else(|| Error::UndefinedType(name.to_string()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.id_of(name).is_some()
    }

    /// Types in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &Type> {
        self.types.iter()
    }

    /// Every (name, type) pair, aliases included, sorted by name.
    pub fn names(&self) -> impl Iterator<Item = (&str, &Type)> {
        self.names
            .iter()
            .map(|(name, id)| (name.as_str(), self.get_by_id(*id)))
    }

    /// Names defined in `ns`; with `recursive`, in its sub-namespaces too.
    pub fn names_in(&self, ns: &str, recursive: bool) -> Vec<&str> {
        let ns = typename::normalize_namespace(ns);
        self.names
            .keys()
            .filter(|name| match typename::relative_name(name, &ns) {
                Some(rest) => recursive || typename::namespace_of(rest).is_empty(),
                None => false,
            })
            .map(String::as_str)
            .collect()
    }

    /// Names other than its own under which a type is registered.
    pub fn aliases_of(&self, ty: &Type) -> Vec<&str> {
        self.names
            .iter()
            .filter(|(name, id)| **id == ty.id() && name.as_str() != ty.name())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Namespaces and aliases
    // -----------------------------------------------------------------------

    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    /// Namespace relative names are resolved from first.
    pub fn set_default_namespace(&mut self, ns: &str) -> Result<()> {
        let ns = typename::normalize_namespace(ns);
        if !typename::is_valid_namespace(&ns, true) {
            return Err(Error::BadNamespace(ns));
        }
        self.default_namespace = ns;
        Ok(())
    }

    /// Registers `new_name` as a second name for the type `name` resolves to.
    pub fn alias(&mut self, name: &str, new_name: &str) -> Result<()> {
        let id = self
            .id_of(name)
            .ok_or_else(|| Error::UndefinedType(name.to_string()))?;
        self.check_new_name(new_name)?;
        log::trace!("[registry] alias {} -> {}", new_name, name);
        self.names.insert(new_name.to_string(), id);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Definitions
    // -----------------------------------------------------------------------

    fn check_new_name(&self, name: &str) -> Result<()> {
        let plain = typename::split_modifiers(name).is_some_and(|(_, mods)| mods.is_empty());
        if !plain || !typename::is_valid_typename(name, true) {
            return Err(Error::BadTypename(name.to_string()));
        }
        if self.names.contains_key(name) {
            return Err(Error::AlreadyDefined(name.to_string()));
        }
        Ok(())
    }

    /// Largest type size a value buffer can be allocated for.
    pub const MAX_TYPE_SIZE: usize = isize::MAX as usize;

    fn check_size(name: &str, size: Option<usize>) -> Result<usize> {
        match size {
            Some(size) if size <= Self::MAX_TYPE_SIZE => Ok(size),
            _ => Err(Error::InvalidDefinition {
                type_name: name.to_string(),
                reason: format!("size exceeds {} bytes", Self::MAX_TYPE_SIZE),
            }),
        }
    }

    fn insert(&mut self, name: String, size: usize, align: usize, kind: TypeKind) -> TypeId {
        let id = TypeId::new(self.types.len());
        log::trace!("[registry] defined {} ({} bytes)", name, size);
        self.names.insert(name.clone(), id);
        self.types.push(Type::new(id, name, size, align, kind));
        id
    }

    /// Defines another null (zero-sized) type.
    pub fn add_null(&mut self, name: &str) -> Result<TypeId> {
        self.check_new_name(name)?;
        Ok(self.insert(name.to_string(), 0, 1, TypeKind::Null))
    }

    /// Defines a numeric type of `size` bytes.
    pub fn add_numeric(&mut self, name: &str, kind: NumericKind, size: usize) -> Result<TypeId> {
        self.check_new_name(name)?;
        Self::check_size(name, Some(size))?;
        let valid = match kind {
            NumericKind::Float => size == 4 || size == 8,
            NumericKind::SInt | NumericKind::UInt => size > 0,
        };
        if !valid {
            return Err(Error::InvalidDefinition {
                type_name: name.to_string(),
                reason: format!("{} of {} bytes", kind, size),
            });
        }
        let align = self.abi.scalar_alignment(size);
        Ok(self.insert(name.to_string(), size, align, TypeKind::Numeric(kind)))
    }

    /// Defines a type of known size and unknown structure.
    pub fn add_opaque(&mut self, name: &str, size: usize) -> Result<TypeId> {
        self.check_new_name(name)?;
        Self::check_size(name, Some(size))?;
        let align = self.abi.scalar_alignment(size);
        Ok(self.insert(name.to_string(), size, align, TypeKind::Opaque))
    }

    /// Defines an enumeration stored on [`Abi::enum_size`] bytes.
    pub fn add_enum(&mut self, def: EnumBuilder) -> Result<TypeId> {
        self.check_new_name(&def.name)?;
        if let Some(symbol) = def.overflow {
            return Err(Error::InvalidDefinition {
                type_name: def.name,
                reason: format!("implicit value of {} overflows", symbol),
            });
        }
        for (i, (symbol, _)) in def.values.iter().enumerate() {
            if def.values[..i].iter().any(|(other, _)| other == symbol) {
                return Err(Error::InvalidDefinition {
                    type_name: def.name,
                    reason: format!("duplicate symbol {}", symbol),
                });
            }
        }
        let size = self.abi.enum_size;
        let align = self.abi.scalar_alignment(size);
        Ok(self.insert(def.name, size, align, TypeKind::Enum(Enum::new(def.values))))
    }

    /// Defines a compound, computing offsets of naturally placed fields.
    pub fn add_compound(&mut self, def: CompoundBuilder) -> Result<TypeId> {
        self.check_new_name(&def.name)?;
        let invalid = |reason: String| Error::InvalidDefinition {
            type_name: def.name.clone(),
            reason,
        };

        let mut fields: Vec<Field> = Vec::with_capacity(def.fields.len());
        let mut end = 0;
        let mut align = 1;
        for spec in &def.fields {
            if fields.iter().any(|f| f.name() == spec.name) {
                return Err(invalid(format!("duplicate field {}", spec.name)));
            }
            let ty = self
                .types
                .get(spec.ty.index())
                .ok_or_else(|| invalid(format!("field {} has a foreign type handle", spec.name)))?;
            let offset = match spec.offset {
                Some(offset) => Some(offset),
                None => checked_align_up(end, ty.alignment()),
            };
            let field_end = offset.and_then(|offset| offset.checked_add(ty.size()));
            let (Some(offset), Some(field_end)) = (offset, field_end) else {
                return Err(invalid(format!("field {} ends past the addressable range", spec.name)));
            };
            end = end.max(field_end);
            align = align.max(ty.alignment());
            fields.push(Field::new(spec.name.clone(), offset, spec.ty));
        }
        fields.sort_by_key(Field::offset);

        let size = match def.size {
            Some(size) if size < end => {
                return Err(invalid(format!("size {} is smaller than its fields ({})", size, end)));
            }
            Some(size) => size,
            None => Self::check_size(&def.name, checked_align_up(end, align))?,
        };
        Self::check_size(&def.name, Some(size))?;
        Ok(self.insert(def.name, size, align, TypeKind::Compound(Compound::new(fields))))
    }

    /// Fixed array of `dimension` elements, created on first use.
    pub fn array_of(&mut self, element: TypeId, dimension: usize) -> Result<TypeId> {
        let elem = self.get_by_id(element);
        let name = typename::array_name(elem.name(), dimension);
        if let Some(id) = self.names.get(&name) {
            return Ok(*id);
        }
        let size = Self::check_size(&name, elem.size().checked_mul(dimension))?;
        let align = elem.alignment();
        let kind = TypeKind::Array(Array { element, dimension });
        Ok(self.insert(name, size, align, kind))
    }

    /// Pointer to `target`, created on first use.
    pub fn pointer_to(&mut self, target: TypeId) -> Result<TypeId> {
        let name = typename::pointer_name(self.get_by_id(target).name());
        if let Some(id) = self.names.get(&name) {
            return Ok(*id);
        }
        let size = self.abi.pointer_size;
        Ok(self.insert(name, size, size, TypeKind::Pointer(Pointer { target })))
    }

    /// Instantiates the container kind `kind` on `element`, on first use.
    pub fn container_of(&mut self, kind: &str, element: TypeId) -> Result<TypeId> {
        let container_kind = self
            .containers
            .get(kind)
            .cloned()
            .ok_or_else(|| Error::UnknownContainer(kind.to_string()))?;
        let elem = self.get_by_id(element);
        let name = typename::container_name(container_kind.name(), elem.name());
        if let Some(id) = self.names.get(&name) {
            return Ok(*id);
        }
        if elem.size() == 0 {
            return Err(Error::InvalidDefinition {
                type_name: name,
                reason: "container elements cannot be zero-sized".into(),
            });
        }
        let (size, align) = (container_kind.size(), container_kind.alignment());
        let kind = TypeKind::Container(Container::new(container_kind, element));
        Ok(self.insert(name, size, align, kind))
    }

    /// Makes a container family available to [`container_of`](Self::container_of)
    /// and [`build`](Self::build). Replaces a kind of the same name.
    pub fn register_container_kind(&mut self, kind: Arc<dyn ContainerKind>) {
        self.containers.insert(kind.name().to_string(), kind);
    }

    pub fn container_kind(&self, name: &str) -> Option<&Arc<dyn ContainerKind>> {
        self.containers.get(name)
    }

    /// Resolves a name, creating the array, pointer and container types its
    /// modifiers and template arguments describe (`/a/type*[10]`,
    /// `/std/vector</int32_t>`).
    pub fn build(&mut self, name: &str) -> Result<TypeId> {
        if let Some(id) = self.id_of(name) {
            return Ok(id);
        }
        let (base, modifiers) =
            typename::split_modifiers(name).ok_or_else(|| Error::BadTypename(name.to_string()))?;
        if modifiers.is_empty() {
            let (template, args) = typename::template_arguments(base)
                .ok_or_else(|| Error::UndefinedType(name.to_string()))?;
            let [element] = args.as_slice() else {
                return Err(Error::BadTypename(name.to_string()));
            };
            let element = self.build(element)?;
            return self.container_of(template, element);
        }

        let mut id = self.build(base)?;
        for modifier in modifiers {
            id = match modifier {
                Modifier::Array(dimension) => self.array_of(id, dimension)?,
                Modifier::Pointer => self.pointer_to(id)?,
            };
        }
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Comparison and merge
    // -----------------------------------------------------------------------

    /// Structural equality of `ty` (from `self`) and `other_ty` (from `other`).
    pub fn is_same(&self, ty: &Type, other: &Registry, other_ty: &Type) -> bool {
        if ty.name() != other_ty.name()
            || ty.size() != other_ty.size()
            || ty.category() != other_ty.category()
        {
            return false;
        }
        match (ty.kind(), other_ty.kind()) {
            (TypeKind::Numeric(a), TypeKind::Numeric(b)) => a == b,
            (TypeKind::Enum(a), TypeKind::Enum(b)) => a == b,
            (TypeKind::Array(a), TypeKind::Array(b)) => {
                a.dimension == b.dimension
                    && self.is_same(
                        self.get_by_id(a.element),
                        other,
                        other.get_by_id(b.element),
                    )
            }
            (TypeKind::Pointer(a), TypeKind::Pointer(b)) => self.is_same(
                self.get_by_id(a.target),
                other,
                other.get_by_id(b.target),
            ),
            (TypeKind::Compound(a), TypeKind::Compound(b)) => {
                a.fields().len() == b.fields().len()
                    && a.fields().iter().zip(b.fields()).all(|(fa, fb)| {
                        fa.name() == fb.name()
                            && fa.offset() == fb.offset()
                            && self.is_same(self.get_by_id(fa.ty()), other, other.get_by_id(fb.ty()))
                    })
            }
            (TypeKind::Container(a), TypeKind::Container(b)) => {
                a.kind().name() == b.kind().name()
                    && self.is_same(
                        self.get_by_id(a.element()),
                        other,
                        other.get_by_id(b.element()),
                    )
            }
            (TypeKind::Null, TypeKind::Null) | (TypeKind::Opaque, TypeKind::Opaque) => true,
            _ => false,
        }
    }

    /// Copies every type and alias of `other` missing from this registry.
    ///
    /// Types present in both must be structurally identical, otherwise
    /// [`Error::DefinitionMismatch`] is returned; types merged before the
    /// conflicting one stay registered.
    pub fn merge(&mut self, other: &Registry) -> Result<()> {
        let mut mapping: HashMap<TypeId, TypeId> = HashMap::with_capacity(other.len());
        let mut added = 0usize;

        // Arena order guarantees children are mapped before their parents.
        for ty in other.iter() {
            if let Some(existing) = self.names.get(ty.name()).copied() {
                if !self.is_same(self.get_by_id(existing), other, ty) {
                    return Err(Error::DefinitionMismatch(ty.name().to_string()));
                }
                mapping.insert(ty.id(), existing);
                continue;
            }
            let id = match ty.kind() {
                TypeKind::Array(a) => self.array_of(mapping[&a.element], a.dimension)?,
                TypeKind::Pointer(p) => self.pointer_to(mapping[&p.target])?,
                TypeKind::Container(c) => self.container_of(c.kind().name(), mapping[&c.element()])?,
                TypeKind::Compound(c) => {
                    let fields = c
                        .fields()
                        .iter()
                        .map(|f| Field::new(f.name(), f.offset(), mapping[&f.ty()]))
                        .collect();
                    let kind = TypeKind::Compound(Compound::new(fields));
                    self.insert(ty.name().to_string(), ty.size(), ty.alignment(), kind)
                }
                kind => self.insert(ty.name().to_string(), ty.size(), ty.alignment(), kind.clone()),
            };
            mapping.insert(ty.id(), id);
            added += 1;
        }

        for (name, ty) in other.names() {
            let target = mapping[&ty.id()];
            match self.names.get(name) {
                Some(existing) if *existing != target => {
                    return Err(Error::DefinitionMismatch(name.to_string()));
                }
                Some(_) => {}
                None => {
                    self.names.insert(name.to_string(), target);
                }
            }
        }
        log::debug!("[registry] merged {} new types ({} total)", added, self.len());
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Dump
    // -----------------------------------------------------------------------

    /// Writes one line per name: name, category, size, and the aliased
    /// type for aliases.
    pub fn dump<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for (name, ty) in self.names() {
            if name == ty.name() {
                writeln!(out, "{:<40} {:<10} {}", name, ty.category(), ty.size())?;
            } else {
                writeln!(out, "{:<40} alias      -> {}", name, ty.name())?;
            }
        }
        Ok(())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
