// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 typelib contributors

//! Owned values.
//!
//! [`Value`] owns a buffer that always holds an initialized value of its
//! type: it is initialized on creation and destroyed on drop, so the raw
//! [`ValueOps`] contracts hold without `unsafe` on the caller side.
//! [`ValueView`] and [`ValueMut`] borrow parts of a value (a field, an
//! array item, a container element).

use crate::container::{ContainerKind, VectorKind};
use crate::error::{Error, Result};
use crate::layout::LayoutOptions;
use crate::registry::Registry;
use crate::types::{Array, Category, Compound, Container, Enum, NumericKind, Pointer, Type, TypeKind};
use crate::value_ops::{decode_int, encode_int, visit_value, ValueOps, ValueView, ValueVisitor};
use crate::visitor::contains_category;
use std::fmt::{self, Write as _};
use std::io::{Read, Write};
use std::mem;
use std::ptr;
use std::slice;

mod sealed {
    pub trait Sealed {}
}

/// Native scalar a numeric value can be read as or assigned from.
///
/// The numeric type must have the same kind and size as the scalar;
/// anything else is a [`Error::BadCast`].
pub trait Scalar: sealed::Sealed + Copy {
    const KIND: NumericKind;
    const NAME: &'static str;

    #[doc(hidden)]
    fn read(bytes: &[u8]) -> Self;

    #[doc(hidden)]
    fn write(self, out: &mut [u8]);
}

macro_rules! impl_scalar {
    ($($t:ty => $kind:ident),* $(,)?) => {$(
        impl sealed::Sealed for $t {}

        impl Scalar for $t {
            const KIND: NumericKind = NumericKind::$kind;
            const NAME: &'static str = stringify!($t);

            fn read(bytes: &[u8]) -> Self {
                let mut raw = [0u8; mem::size_of::<$t>()];
                raw.copy_from_slice(bytes);
                <$t>::from_ne_bytes(raw)
            }

            fn write(self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_ne_bytes());
            }
        }
    )*};
}

impl_scalar!(
    i8 => SInt,
    i16 => SInt,
    i32 => SInt,
    i64 => SInt,
    u8 => UInt,
    u16 => UInt,
    u32 => UInt,
    u64 => UInt,
    f32 => Float,
    f64 => Float,
);

fn bad_cast(ty: &Type, requested: &str) -> Error {
    Error::BadCast {
        type_name: ty.name().to_string(),
        requested: requested.to_string(),
    }
}

fn check_scalar<T: Scalar>(ty: &Type) -> Result<()> {
    if ty.as_numeric() == Some(T::KIND) && ty.size() == mem::size_of::<T>() {
        Ok(())
    } else {
        Err(bad_cast(ty, T::NAME))
    }
}

/// Container kind and element type, for containers of one-byte numerics.
fn string_parts<'r>(registry: &'r Registry, ty: &'r Type) -> Option<(&'r dyn ContainerKind, &'r Type)> {
    let container = ty.as_container()?;
    let element = registry.get_by_id(container.element());
    (element.category() == Category::Numeric && element.size() == 1).then(|| (container.kind(), element))
}

// ---------------------------------------------------------------------------
// Read access
// ---------------------------------------------------------------------------

impl<'r, 'a> ValueView<'r, 'a> {
    /// Reads a numeric value as `T`.
    pub fn get<T: Scalar>(&self) -> Result<T> {
        check_scalar::<T>(self.ty())?;
        Ok(T::read(self.bytes()))
    }

    /// Integer value of an enum.
    pub fn enum_value(&self) -> Result<i64> {
        if self.ty().as_enum().is_none() {
            return Err(bad_cast(self.ty(), "enum"));
        }
        Ok(decode_int(self.bytes(), true))
    }

    /// Symbol of an enum value; `None` when the value is not declared.
    pub fn symbol(&self) -> Result<Option<&'r str>> {
        let def = self.ty().as_enum().ok_or_else(|| bad_cast(self.ty(), "enum"))?;
        Ok(def.symbol(decode_int(self.bytes(), true)))
    }

    /// Contents of a container of characters, decoded lossily as UTF-8.
    pub fn string(&self) -> Result<String> {
        let (kind, element) =
            string_parts(self.registry(), self.ty()).ok_or_else(|| bad_cast(self.ty(), "string"))?;
        // SAFETY: the view holds a live container of one-byte elements.
        let bytes: Vec<u8> = unsafe {
            let slot = self.bytes().as_ptr();
            (0..kind.len(slot, element.size()))
                .map(|i| *kind.element(slot, i, element.size()))
                .collect()
        };
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

// ---------------------------------------------------------------------------
// Write access
// ---------------------------------------------------------------------------

/// Mutable borrow of a live value or of one of its parts.
pub struct ValueMut<'r, 'a> {
    registry: &'r Registry,
    options: LayoutOptions,
    ty: &'r Type,
    bytes: &'a mut [u8],
}

impl<'r, 'a> ValueMut<'r, 'a> {
    /// # Safety
    ///
    /// `bytes` must hold an initialized value of `ty`, which must belong to
    /// `registry`.
    unsafe fn new(registry: &'r Registry, options: LayoutOptions, ty: &'r Type, bytes: &'a mut [u8]) -> Self {
        debug_assert_eq!(bytes.len(), ty.size());
        Self {
            registry,
            options,
            ty,
            bytes,
        }
    }

    pub fn ty(&self) -> &'r Type {
        self.ty
    }

    pub fn view(&self) -> ValueView<'r, '_> {
        // SAFETY: `bytes` holds a live value of `ty`.
        unsafe { ValueView::new(self.registry, self.ty, &*self.bytes) }
    }

    fn reborrow(&mut self, ty: &'r Type, offset: usize) -> ValueMut<'r, '_> {
        let bytes = &mut self.bytes[offset..offset + ty.size()];
        // SAFETY: `ty` describes the part of the live value at `offset`.
        unsafe { ValueMut::new(self.registry, self.options, ty, bytes) }
    }

    fn ops_for(&self, ty: &'r Type) -> Result<ValueOps<'r>> {
        ValueOps::with_options(self.registry, ty, self.options)
    }

    /// Field `name` of a compound.
    pub fn field_mut(&mut self, name: &str) -> Result<ValueMut<'r, '_>> {
        let parent = self.ty;
        let field = parent.field(name).ok_or_else(|| Error::FieldNotFound {
            type_name: parent.name().to_string(),
            field: name.to_string(),
        })?;
        let ty = self.registry.get_by_id(field.ty());
        Ok(self.reborrow(ty, field.offset()))
    }

    /// Item `index` of an array or container.
    pub fn item_mut(&mut self, index: usize) -> Option<ValueMut<'r, '_>> {
        let ty = self.ty;
        match ty.kind() {
            TypeKind::Array(array) if index < array.dimension => {
                let element = self.registry.get_by_id(array.element);
                Some(self.reborrow(element, index * element.size()))
            }
            TypeKind::Container(container) => {
                let element = self.registry.get_by_id(container.element());
                let kind = container.kind();
                let slot = self.bytes.as_mut_ptr();
                // SAFETY: the slot holds a live container; the element storage
                // stays put while `self` is mutably borrowed.
                unsafe {
                    if index >= kind.len(slot, element.size()) {
                        return None;
                    }
                    let ptr = kind.element_mut(slot, index, element.size());
                    let bytes = slice::from_raw_parts_mut(ptr, element.size());
                    Some(ValueMut::new(self.registry, self.options, element, bytes))
                }
            }
            _ => None,
        }
    }

    /// Assigns a numeric value.
    pub fn set<T: Scalar>(&mut self, value: T) -> Result<()> {
        check_scalar::<T>(self.ty)?;
        value.write(self.bytes);
        Ok(())
    }

    /// Assigns an enum by symbol.
    pub fn set_symbol(&mut self, symbol: &str) -> Result<()> {
        let def = self.ty.as_enum().ok_or_else(|| bad_cast(self.ty, "enum"))?;
        let value = def.value(symbol).ok_or_else(|| bad_cast(self.ty, symbol))?;
        self.bytes.copy_from_slice(&encode_int(value, self.ty.size()));
        Ok(())
    }

    /// Assigns an enum by integer value, declared or not.
    pub fn set_enum_value(&mut self, value: i64) -> Result<()> {
        if self.ty.as_enum().is_none() {
            return Err(bad_cast(self.ty, "enum"));
        }
        self.bytes.copy_from_slice(&encode_int(value, self.ty.size()));
        Ok(())
    }

    /// Deep copy of `other`, which must have the same type.
    pub fn assign(&mut self, other: ValueView<'r, '_>) -> Result<()> {
        if !ptr::eq(other.ty(), self.ty) {
            return Err(bad_cast(self.ty, other.ty().name()));
        }
        let ops = self.ops_for(self.ty)?;
        // SAFETY: both buffers hold live values of `ty`.
        unsafe { ops.copy(self.bytes, other.bytes()) };
        Ok(())
    }

    fn container_parts(&self) -> Result<(&'r dyn ContainerKind, &'r Type)> {
        match self.ty.kind() {
            TypeKind::Container(container) => {
                Ok((container.kind(), self.registry.get_by_id(container.element())))
            }
            _ => Err(bad_cast(self.ty, "container")),
        }
    }

    /// Number of items of an array or container.
    pub fn len(&self) -> Option<usize> {
        self.view().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Appends a deep copy of `element`.
    pub fn push(&mut self, element: ValueView<'r, '_>) -> Result<()> {
        let (kind, element_ty) = self.container_parts()?;
        if !ptr::eq(element.ty(), element_ty) {
            return Err(bad_cast(element_ty, element.ty().name()));
        }
        let ops = self.ops_for(element_ty)?;
        let mut scratch = vec![0u8; element_ty.size()];
        ops.init(&mut scratch);
        // SAFETY: `scratch` and `element` hold live values of the element
        // type; the slot holds a live container.
        unsafe {
            ops.copy(&mut scratch, element.bytes());
            kind.push(self.bytes.as_mut_ptr(), &scratch);
        }
        Ok(())
    }

    /// Appends a numeric element.
    pub fn push_scalar<T: Scalar>(&mut self, value: T) -> Result<()> {
        let (kind, element_ty) = self.container_parts()?;
        check_scalar::<T>(element_ty)?;
        let mut raw = vec![0u8; element_ty.size()];
        value.write(&mut raw);
        // SAFETY: the slot holds a live container of `T`-shaped elements.
        unsafe { kind.push(self.bytes.as_mut_ptr(), &raw) };
        Ok(())
    }

    /// Appends an initialized element and returns it for filling in.
    pub fn push_default(&mut self) -> Result<ValueMut<'r, '_>> {
        let (kind, element_ty) = self.container_parts()?;
        let ops = self.ops_for(element_ty)?;
        let mut scratch = vec![0u8; element_ty.size()];
        ops.init(&mut scratch);
        // SAFETY: the slot holds a live container; `scratch` is moved in.
        let len = unsafe {
            kind.push(self.bytes.as_mut_ptr(), &scratch);
            kind.len(self.bytes.as_ptr(), element_ty.size())
        };
        let ty = self.ty;
        self.item_mut(len - 1).ok_or_else(|| bad_cast(ty, "container"))
    }

    /// Removes element `index` and hands it back as an owned value.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> Result<Value<'r>> {
        let (kind, element_ty) = self.container_parts()?;
        let ops = self.ops_for(element_ty)?;
        let slot = self.bytes.as_mut_ptr();
        let mut buffer = vec![0u8; element_ty.size()];
        // SAFETY: the slot holds a live container; the element is moved out
        // bitwise and owned by the returned value.
        unsafe {
            let len = kind.len(slot, element_ty.size());
            assert!(index < len, "removal index {} out of bounds (len {})", index, len);
            kind.remove(slot, index, element_ty.size(), &mut buffer);
        }
        Ok(Value { ops, buffer })
    }

    /// Removes the first element equal to `element`. Returns whether one
    /// was found.
    pub fn erase(&mut self, element: ValueView<'r, '_>) -> Result<bool> {
        let (_, element_ty) = self.container_parts()?;
        if !ptr::eq(element.ty(), element_ty) {
            return Err(bad_cast(element_ty, element.ty().name()));
        }
        let ops = self.ops_for(element_ty)?;
        let view = self.view();
        let found = (0..view.len().unwrap_or(0)).find(|i| {
            // SAFETY: both sides are live values of the element type.
            view.item(*i)
                .is_some_and(|item| unsafe { ops.compare(item.bytes(), element.bytes()) })
        });
        match found {
            Some(index) => {
                self.remove(index)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes every element matching `predicate`. Returns how many were
    /// removed.
    pub fn erase_if<F>(&mut self, mut predicate: F) -> Result<usize>
    where
        F: FnMut(ValueView<'r, '_>) -> bool,
    {
        self.container_parts()?;
        let mut removed = 0;
        let mut index = 0;
        loop {
            let Some(item) = self.view().item(index) else {
                break;
            };
            if predicate(item) {
                self.remove(index)?;
                removed += 1;
            } else {
                index += 1;
            }
        }
        Ok(removed)
    }

    /// Removes every element.
    pub fn clear(&mut self) -> Result<()> {
        self.container_parts()?;
        let ops = self.ops_for(self.ty)?;
        // SAFETY: `bytes` holds a live container; it is reinitialized right
        // after being destroyed.
        unsafe { ops.destroy(self.bytes) };
        ops.init(self.bytes);
        Ok(())
    }

    /// Replaces the contents of a container of characters.
    pub fn set_string(&mut self, text: &str) -> Result<()> {
        let (kind, element) =
            string_parts(self.registry, self.ty).ok_or_else(|| bad_cast(self.ty, "string"))?;
        let slot = self.bytes.as_mut_ptr();
        // SAFETY: the slot holds a live container of one-byte elements,
        // which own nothing.
        unsafe {
            kind.truncate(slot, 0, element.size());
            for byte in text.bytes() {
                kind.push(slot, &[byte]);
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// Owned, always initialized value of a registry type.
pub struct Value<'r> {
    ops: ValueOps<'r>,
    buffer: Vec<u8>,
}

impl<'r> Value<'r> {
    /// Initialized value of `ty` (zeroes, empty containers, enum defaults).
    pub fn new(registry: &'r Registry, ty: &'r Type) -> Result<Self> {
        Ok(Self::with_ops(ValueOps::new(registry, ty)?))
    }

    /// Initialized value of the type `name` resolves to.
    pub fn of(registry: &'r Registry, name: &str) -> Result<Self> {
        Self::new(registry, registry.find(name)?)
    }

    /// Initialized value using already compiled operations.
    pub fn with_ops(ops: ValueOps<'r>) -> Self {
        let mut buffer = vec![0u8; ops.size()];
        ops.init(&mut buffer);
        Self { ops, buffer }
    }

    /// Value taken from raw bytes. Types holding containers cannot be
    /// built this way.
    pub fn from_bytes(registry: &'r Registry, ty: &'r Type, bytes: &[u8]) -> Result<Self> {
        if contains_category(registry, ty, Category::Container) {
            return Err(bad_cast(ty, "raw bytes"));
        }
        if bytes.len() != ty.size() {
            return Err(Error::SizeMismatch {
                expected: ty.size(),
                actual: bytes.len(),
            });
        }
        let ops = ValueOps::new(registry, ty)?;
        Ok(Self {
            ops,
            buffer: bytes.to_vec(),
        })
    }

    pub fn ty(&self) -> &'r Type {
        self.ops.ty()
    }

    pub fn registry(&self) -> &'r Registry {
        self.ops.registry()
    }

    pub fn ops(&self) -> &ValueOps<'r> {
        &self.ops
    }

    /// Raw bytes. Container slots are opaque machine words.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn view(&self) -> ValueView<'r, '_> {
        // SAFETY: the buffer always holds a live value of the type.
        unsafe { ValueView::new(self.ops.registry(), self.ops.ty(), &self.buffer) }
    }

    pub fn view_mut(&mut self) -> ValueMut<'r, '_> {
        let (registry, options, ty) = (self.ops.registry(), self.ops.options(), self.ops.ty());
        // SAFETY: the buffer always holds a live value of the type.
        unsafe { ValueMut::new(registry, options, ty, &mut self.buffer) }
    }

    pub fn field(&self, name: &str) -> Result<ValueView<'r, '_>> {
        self.view().field(name)
    }

    pub fn field_mut(&mut self, name: &str) -> Result<ValueMut<'r, '_>> {
        let (registry, options, ty) = (self.ops.registry(), self.ops.options(), self.ops.ty());
        let field = ty.field(name).ok_or_else(|| Error::FieldNotFound {
            type_name: ty.name().to_string(),
            field: name.to_string(),
        })?;
        let field_ty = registry.get_by_id(field.ty());
        let bytes = &mut self.buffer[field.offset()..field.offset() + field_ty.size()];
        // SAFETY: the field bytes hold a live value of the field type.
        Ok(unsafe { ValueMut::new(registry, options, field_ty, bytes) })
    }

    pub fn get<T: Scalar>(&self) -> Result<T> {
        self.view().get()
    }

    pub fn set<T: Scalar>(&mut self, value: T) -> Result<()> {
        self.view_mut().set(value)
    }

    /// Destroys the current contents and reinitializes.
    pub fn reset(&mut self) {
        // SAFETY: the buffer holds a live value; it is reinitialized at once.
        unsafe { self.ops.destroy(&mut self.buffer) };
        self.ops.init(&mut self.buffer);
    }

    /// Bytes [`dump`](Self::dump) would write.
    pub fn dump_size(&self) -> usize {
        // SAFETY: the buffer always holds a live value of the type.
        unsafe { self.ops.dump_size(&self.buffer) }
    }

    pub fn dump<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        // SAFETY: the buffer always holds a live value of the type.
        unsafe { self.ops.dump(&self.buffer, out) }
    }

    pub fn dump_to_vec(&self) -> Result<Vec<u8>> {
        // SAFETY: the buffer always holds a live value of the type.
        unsafe { self.ops.dump_to_vec(&self.buffer) }
    }

    /// Replaces the contents with a value read from `input`.
    pub fn load<R: Read + ?Sized>(&mut self, input: &mut R) -> Result<()> {
        // SAFETY: the buffer always holds a live value, and `load` leaves
        // a live value behind on failure too.
        unsafe { self.ops.load(&mut self.buffer, input) }
    }

    /// Replaces the contents with `bytes`, which must be consumed entirely.
    pub fn load_from_slice(&mut self, bytes: &[u8]) -> Result<()> {
        // SAFETY: as for `load`.
        unsafe { self.ops.load_from_slice(&mut self.buffer, bytes) }
    }
}

impl Drop for Value<'_> {
    fn drop(&mut self) {
        // SAFETY: the buffer holds a live value and is never used again.
        unsafe { self.ops.destroy(&mut self.buffer) }
    }
}

impl Clone for Value<'_> {
    fn clone(&self) -> Self {
        let mut copy = Self::with_ops(self.ops.clone());
        // SAFETY: both buffers hold live values of the type.
        unsafe { self.ops.copy(&mut copy.buffer, &self.buffer) };
        copy
    }
}

impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.ty(), other.ty())
            // SAFETY: both buffers hold live values of the type.
            && unsafe { self.ops.compare(&self.buffer, &other.buffer) }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.view().fmt(f)
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("ty", &self.ty().name())
            .field("value", &format_args!("{}", self))
            .finish()
    }
}

impl fmt::Display for ValueView<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut printer = Printer { out: String::new() };
        visit_value(&mut printer, *self).map_err(|_| fmt::Error)?;
        f.write_str(&printer.out)
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

/// Renders values as `{ a = 1, v = [1, 2], e = RED, s = "text" }`.
struct Printer {
    out: String,
}

impl Printer {
    fn items<'r>(&mut self, value: ValueView<'r, '_>) -> Result<bool> {
        self.out.push('[');
        for index in 0..value.len().unwrap_or(0) {
            if index > 0 {
                self.out.push_str(", ");
            }
            if let Some(item) = value.item(index) {
                visit_value(self, item)?;
            }
        }
        self.out.push(']');
        Ok(false)
    }
}

impl<'r> ValueVisitor<'r> for Printer {
    fn visit_null(&mut self, _value: ValueView<'r, '_>) -> Result<bool> {
        self.out.push_str("nil");
        Ok(true)
    }

    fn visit_numeric(&mut self, value: ValueView<'r, '_>, kind: NumericKind) -> Result<bool> {
        let bytes = value.bytes();
        if kind != NumericKind::Float && bytes.len() > 8 {
            // Wider than i64: raw hex, most significant byte first.
            self.out.push_str("0x");
            let mut write_byte = |byte: &u8| {
                let _ = write!(self.out, "{:02x}", byte);
            };
            if cfg!(target_endian = "little") {
                bytes.iter().rev().for_each(&mut write_byte);
            } else {
                bytes.iter().for_each(&mut write_byte);
            }
            return Ok(true);
        }
        let _ = match kind {
            NumericKind::Float if bytes.len() == 4 => write!(self.out, "{}", f32::read(bytes)),
            NumericKind::Float => write!(self.out, "{}", f64::read(bytes)),
            NumericKind::SInt => write!(self.out, "{}", decode_int(bytes, true)),
            NumericKind::UInt => write!(self.out, "{}", decode_int(bytes, false) as u64),
        };
        Ok(true)
    }

    fn visit_enum(&mut self, value: ValueView<'r, '_>, def: &'r Enum) -> Result<bool> {
        let raw = decode_int(value.bytes(), true);
        let _ = match def.symbol(raw) {
            Some(symbol) => write!(self.out, "{}", symbol),
            None => write!(self.out, "{}", raw),
        };
        Ok(true)
    }

    fn visit_array(&mut self, value: ValueView<'r, '_>, _array: &'r Array) -> Result<bool> {
        self.items(value)
    }

    fn visit_pointer(&mut self, value: ValueView<'r, '_>, _pointer: &'r Pointer) -> Result<bool> {
        let _ = write!(self.out, "{:#x}", decode_int(value.bytes(), false) as u64);
        Ok(true)
    }

    fn visit_compound(&mut self, value: ValueView<'r, '_>, compound: &'r Compound) -> Result<bool> {
        if compound.fields().is_empty() {
            self.out.push_str("{}");
            return Ok(false);
        }
        self.out.push_str("{ ");
        for (i, field) in compound.fields().iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            let _ = write!(self.out, "{} = ", field.name());
            visit_value(self, value.field(field.name())?)?;
        }
        self.out.push_str(" }");
        Ok(false)
    }

    fn visit_container(&mut self, value: ValueView<'r, '_>, container: &'r Container) -> Result<bool> {
        if container.kind().name() == VectorKind::STD_STRING {
            if let Ok(text) = value.string() {
                let _ = write!(self.out, "{:?}", text);
                return Ok(false);
            }
        }
        self.items(value)
    }

    fn visit_opaque(&mut self, value: ValueView<'r, '_>) -> Result<bool> {
        let _ = write!(self.out, "<{} bytes>", value.bytes().len());
        Ok(true)
    }
}
