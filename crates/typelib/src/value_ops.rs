// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 typelib contributors

//! Generic operations on value buffers.
//!
//! A value of type `T` is a run of `T::size()` bytes laid out the way a C
//! compiler would. [`ValueOps`] interprets the compiled [`MemoryLayout`] of
//! `T` over such buffers: raw spans are handled in one `memcpy`/`memcmp`,
//! and only container slots go through their [`ContainerKind`].
//!
//! Buffers whose length differs from the type size are a programming error
//! and panic.
//!
//! # Serialized form
//!
//! [`ValueOps::dump`] writes every raw span verbatim (padding included, in
//! host byte order) and every container as a little-endian `u64` element
//! count followed by its elements.

use crate::container::ContainerKind;
use crate::error::{Error, Result};
use crate::layout::{block_end, LayoutOp, LayoutOptions, MemoryLayout};
use crate::registry::Registry;
use crate::types::{
    Array, Category, Compound, Container, Enum, Field, NumericKind, Pointer, Type, TypeId, TypeKind,
};
use crate::visitor::{contains_category, dispatch, TypeVisitor};
use std::io::{self, Read, Write};
use std::slice;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Integer helpers
// ---------------------------------------------------------------------------

/// Low `size` bytes of `value`, in host order.
pub(crate) fn encode_int(value: i64, size: usize) -> Vec<u8> {
    let bytes = value.to_ne_bytes();
    let size = size.min(bytes.len());
    if cfg!(target_endian = "little") {
        bytes[..size].to_vec()
    } else {
        bytes[bytes.len() - size..].to_vec()
    }
}

/// Reads a host-order integer of `bytes.len()` (at most 8) bytes.
pub(crate) fn decode_int(bytes: &[u8], signed: bool) -> i64 {
    let size = bytes.len().min(8);
    if size == 0 {
        return 0;
    }
    let mut raw = [0u8; 8];
    if cfg!(target_endian = "little") {
        raw[..size].copy_from_slice(&bytes[..size]);
    } else {
        raw[8 - size..].copy_from_slice(&bytes[..size]);
    }
    let value = u64::from_ne_bytes(raw);
    let shift = 64 - 8 * size as u32;
    if signed {
        ((value << shift) as i64) >> shift
    } else {
        value as i64
    }
}

/// Collects the (offset, bytes) writes turning a zeroed buffer into an
/// initialized one. Container elements are initialized when they are
/// created, so containers are not entered.
struct EnumDefaults<'r> {
    registry: &'r Registry,
    base: usize,
    patches: Vec<(usize, Vec<u8>)>,
}

fn enum_defaults(registry: &Registry, ty: &Type) -> Result<Vec<(usize, Vec<u8>)>> {
    let mut collector = EnumDefaults {
        registry,
        base: 0,
        patches: Vec::new(),
    };
    dispatch(&mut collector, ty)?;
    Ok(collector.patches)
}

impl<'r> TypeVisitor<'r> for EnumDefaults<'r> {
    fn registry(&self) -> &'r Registry {
        self.registry
    }

    fn visit_enum(&mut self, ty: &'r Type, def: &'r Enum) -> Result<bool> {
        self.patches
            .push((self.base, encode_int(def.default_value(), ty.size())));
        Ok(true)
    }

    fn visit_array(&mut self, _ty: &'r Type, array: &'r Array) -> Result<bool> {
        let element = self.registry.get_by_id(array.element);
        if !contains_category(self.registry, element, Category::Enum) {
            return Ok(false);
        }
        let patches = enum_defaults(self.registry, element)?;
        for i in 0..array.dimension {
            let at = self.base + i * element.size();
            self.patches
                .extend(patches.iter().map(|(o, b)| (at + o, b.clone())));
        }
        Ok(false)
    }

    fn visit_field(&mut self, _compound: &'r Type, field: &'r Field) -> Result<bool> {
        let field_ty = self.registry.get_by_id(field.ty());
        let base = self.base;
        self.base = base + field.offset();
        let result = dispatch(self, field_ty);
        self.base = base;
        result
    }

    fn visit_pointer(&mut self, _ty: &'r Type, _pointer: &'r Pointer) -> Result<bool> {
        Ok(false)
    }

    fn visit_container(&mut self, _ty: &'r Type, _container: &'r Container) -> Result<bool> {
        Ok(false)
    }

    fn visit_opaque(&mut self, _ty: &'r Type) -> Result<bool> {
        Ok(false)
    }
}

// ---------------------------------------------------------------------------
// ValueOps
// ---------------------------------------------------------------------------

/// Layout-driven operations on buffers holding values of one type.
#[derive(Debug, Clone)]
pub struct ValueOps<'r> {
    registry: &'r Registry,
    ty: &'r Type,
    layout: Arc<MemoryLayout>,
    init_patches: Arc<Vec<(usize, Vec<u8>)>>,
    options: LayoutOptions,
}

impl<'r> ValueOps<'r> {
    /// Compiles the operations of `ty`; pointers and opaques are rejected.
    pub fn new(registry: &'r Registry, ty: &'r Type) -> Result<Self> {
        Self::with_options(registry, ty, LayoutOptions::default())
    }

    /// Same as [`new`](Self::new) with pointers and opaques optionally
    /// handled as raw bytes.
    pub fn with_options(registry: &'r Registry, ty: &'r Type, options: LayoutOptions) -> Result<Self> {
        let layout = MemoryLayout::compile_with(registry, ty, options)?;
        let init_patches = enum_defaults(registry, ty)?;
        Ok(Self {
            registry,
            ty,
            layout: Arc::new(layout),
            init_patches: Arc::new(init_patches),
            options,
        })
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn ty(&self) -> &'r Type {
        self.ty
    }

    pub fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    /// Options the layout was compiled with.
    pub fn options(&self) -> LayoutOptions {
        self.options
    }

    /// Size of the buffers these operations work on.
    pub fn size(&self) -> usize {
        self.ty.size()
    }

    fn check_len(&self, len: usize) {
        assert_eq!(
            len,
            self.ty.size(),
            "buffer of {} bytes used as a {} value",
            len,
            self.ty.name()
        );
    }

    fn container_at(&self, id: TypeId) -> (&'r dyn ContainerKind, usize) {
        match self.registry.get_by_id(id).kind() {
            TypeKind::Container(container) => {
                let element = self.registry.get_by_id(container.element());
                (container.kind(), element.size())
            }
            _ => unreachable!("container op on non-container type {:?}", id),
        }
    }

    /// Makes `buffer` an initialized value: all bytes zero, containers
    /// empty, enums set to their default value.
    ///
    /// `buffer` is treated as uninitialized; a live value previously held
    /// there is leaked, not destroyed.
    pub fn init(&self, buffer: &mut [u8]) {
        self.zero(buffer);
        for (offset, bytes) in self.init_patches.iter() {
            buffer[*offset..*offset + bytes.len()].copy_from_slice(bytes);
        }
    }

    /// Like [`init`](Self::init), but enums are left at zero.
    pub fn zero(&self, buffer: &mut [u8]) {
        self.check_len(buffer.len());
        buffer.fill(0);
        // SAFETY: the buffer has the type size and the program only visits
        // container slots inside it.
        unsafe { self.zero_block(self.layout.ops(), buffer.as_mut_ptr()) };
    }

    /// Releases everything `buffer` owns. The buffer is uninitialized
    /// afterwards.
    ///
    /// # Safety
    ///
    /// `buffer` must hold an initialized value of this type.
    pub unsafe fn destroy(&self, buffer: &mut [u8]) {
        self.check_len(buffer.len());
        self.destroy_block(self.layout.ops(), buffer.as_mut_ptr());
    }

    /// Deep copy of `src` into `dst`. Containers of `dst` are emptied first.
    ///
    /// # Safety
    ///
    /// Both buffers must hold initialized values of this type.
    pub unsafe fn copy(&self, dst: &mut [u8], src: &[u8]) {
        self.check_len(dst.len());
        self.check_len(src.len());
        self.copy_block(self.layout.ops(), dst.as_mut_ptr(), src.as_ptr());
    }

    /// Deep equality. Raw spans are compared bytewise, padding included.
    ///
    /// # Safety
    ///
    /// Both buffers must hold initialized values of this type.
    pub unsafe fn compare(&self, a: &[u8], b: &[u8]) -> bool {
        self.check_len(a.len());
        self.check_len(b.len());
        self.compare_block(self.layout.ops(), a.as_ptr(), b.as_ptr())
    }

    /// Exact number of bytes [`dump`](Self::dump) writes for `buffer`.
    ///
    /// # Safety
    ///
    /// `buffer` must hold an initialized value of this type.
    pub unsafe fn dump_size(&self, buffer: &[u8]) -> usize {
        self.check_len(buffer.len());
        self.dump_size_block(self.layout.ops(), buffer.as_ptr()).1
    }

    /// Serializes `buffer` to `out`.
    ///
    /// # Safety
    ///
    /// `buffer` must hold an initialized value of this type.
    pub unsafe fn dump<W: Write + ?Sized>(&self, buffer: &[u8], out: &mut W) -> Result<()> {
        self.check_len(buffer.len());
        let mut out = out;
        self.dump_block(self.layout.ops(), buffer.as_ptr(), &mut out)?;
        Ok(())
    }

    /// [`dump`](Self::dump) into a new vector.
    ///
    /// # Safety
    ///
    /// `buffer` must hold an initialized value of this type.
    pub unsafe fn dump_to_vec(&self, buffer: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.dump_size(buffer));
        self.dump(buffer, &mut out)?;
        Ok(out)
    }

    /// Replaces the value in `buffer` with one read from `input`.
    ///
    /// On error the buffer still holds a valid (partially loaded) value.
    ///
    /// # Safety
    ///
    /// `buffer` must hold an initialized value of this type.
    pub unsafe fn load<R: Read + ?Sized>(&self, buffer: &mut [u8], input: &mut R) -> Result<()> {
        self.check_len(buffer.len());
        let mut input = input;
        self.load_block(self.layout.ops(), buffer.as_mut_ptr(), &mut input)?;
        Ok(())
    }

    /// [`load`](Self::load) from a byte slice that must be consumed
    /// entirely.
    ///
    /// # Safety
    ///
    /// `buffer` must hold an initialized value of this type.
    pub unsafe fn load_from_slice(&self, buffer: &mut [u8], bytes: &[u8]) -> Result<()> {
        let mut input = bytes;
        self.load(buffer, &mut input)?;
        if !input.is_empty() {
            return Err(Error::SizeMismatch {
                expected: bytes.len() - input.len(),
                actual: bytes.len(),
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Interpreters. Each walks a block body (no trailing End) and returns the
    // number of buffer bytes it covered.
    // -----------------------------------------------------------------------

    unsafe fn zero_block(&self, ops: &[LayoutOp], base: *mut u8) -> usize {
        let mut offset = 0;
        let mut i = 0;
        while i < ops.len() {
            match ops[i] {
                LayoutOp::Memcpy(size) => {
                    offset += size;
                    i += 1;
                }
                LayoutOp::Array(count) => {
                    let end = block_end(ops, i + 1);
                    for _ in 0..count {
                        offset += self.zero_block(&ops[i + 1..end - 1], base.add(offset));
                    }
                    i = end;
                }
                LayoutOp::Container(id) => {
                    let (kind, _) = self.container_at(id);
                    kind.init(base.add(offset));
                    offset += kind.size();
                    i = block_end(ops, i + 1);
                }
                LayoutOp::End => i += 1,
            }
        }
        offset
    }

    unsafe fn destroy_block(&self, ops: &[LayoutOp], base: *mut u8) -> usize {
        let mut offset = 0;
        let mut i = 0;
        while i < ops.len() {
            match ops[i] {
                LayoutOp::Memcpy(size) => {
                    offset += size;
                    i += 1;
                }
                LayoutOp::Array(count) => {
                    let end = block_end(ops, i + 1);
                    for _ in 0..count {
                        offset += self.destroy_block(&ops[i + 1..end - 1], base.add(offset));
                    }
                    i = end;
                }
                LayoutOp::Container(id) => {
                    let end = block_end(ops, i + 1);
                    let (kind, _) = self.container_at(id);
                    let slot = base.add(offset);
                    self.clear_container(id, &ops[i + 1..end - 1], slot);
                    kind.release(slot);
                    offset += kind.size();
                    i = end;
                }
                LayoutOp::End => i += 1,
            }
        }
        offset
    }

    /// Destroys the elements of a container and empties it.
    unsafe fn clear_container(&self, id: TypeId, body: &[LayoutOp], slot: *mut u8) {
        let (kind, element_size) = self.container_at(id);
        let len = kind.len(slot, element_size);
        if !is_flat(body) {
            for k in 0..len {
                self.destroy_block(body, kind.element_mut(slot, k, element_size));
            }
        }
        kind.truncate(slot, 0, element_size);
    }

    /// Scratch element buffer holding a zeroed value of the body's type.
    unsafe fn scratch_element(&self, body: &[LayoutOp], element_size: usize) -> Vec<u8> {
        let mut element = vec![0u8; element_size];
        self.zero_block(body, element.as_mut_ptr());
        element
    }

    unsafe fn copy_block(&self, ops: &[LayoutOp], dst: *mut u8, src: *const u8) -> usize {
        let mut offset = 0;
        let mut i = 0;
        while i < ops.len() {
            match ops[i] {
                LayoutOp::Memcpy(size) => {
                    std::ptr::copy_nonoverlapping(src.add(offset), dst.add(offset), size);
                    offset += size;
                    i += 1;
                }
                LayoutOp::Array(count) => {
                    let end = block_end(ops, i + 1);
                    for _ in 0..count {
                        offset += self.copy_block(&ops[i + 1..end - 1], dst.add(offset), src.add(offset));
                    }
                    i = end;
                }
                LayoutOp::Container(id) => {
                    let end = block_end(ops, i + 1);
                    let body = &ops[i + 1..end - 1];
                    let (kind, element_size) = self.container_at(id);
                    let (dst_slot, src_slot) = (dst.add(offset), src.add(offset));
                    self.clear_container(id, body, dst_slot);
                    let len = kind.len(src_slot, element_size);
                    for k in 0..len {
                        let from = kind.element(src_slot, k, element_size);
                        if is_flat(body) {
                            kind.push(dst_slot, slice::from_raw_parts(from, element_size));
                        } else {
                            let mut element = self.scratch_element(body, element_size);
                            self.copy_block(body, element.as_mut_ptr(), from);
                            kind.push(dst_slot, &element);
                        }
                    }
                    offset += kind.size();
                    i = end;
                }
                LayoutOp::End => i += 1,
            }
        }
        offset
    }

    unsafe fn compare_block(&self, ops: &[LayoutOp], a: *const u8, b: *const u8) -> bool {
        self.compare_span(ops, a, b).is_some()
    }

    /// Bytes covered when equal, `None` at the first difference.
    unsafe fn compare_span(&self, ops: &[LayoutOp], a: *const u8, b: *const u8) -> Option<usize> {
        let mut offset = 0;
        let mut i = 0;
        while i < ops.len() {
            match ops[i] {
                LayoutOp::Memcpy(size) => {
                    let lhs = slice::from_raw_parts(a.add(offset), size);
                    let rhs = slice::from_raw_parts(b.add(offset), size);
                    if lhs != rhs {
                        return None;
                    }
                    offset += size;
                    i += 1;
                }
                LayoutOp::Array(count) => {
                    let end = block_end(ops, i + 1);
                    for _ in 0..count {
                        offset += self.compare_span(&ops[i + 1..end - 1], a.add(offset), b.add(offset))?;
                    }
                    i = end;
                }
                LayoutOp::Container(id) => {
                    let end = block_end(ops, i + 1);
                    let body = &ops[i + 1..end - 1];
                    let (kind, element_size) = self.container_at(id);
                    let (a_slot, b_slot) = (a.add(offset), b.add(offset));
                    let len = kind.len(a_slot, element_size);
                    if len != kind.len(b_slot, element_size) {
                        return None;
                    }
                    for k in 0..len {
                        let lhs = kind.element(a_slot, k, element_size);
                        let rhs = kind.element(b_slot, k, element_size);
                        if !self.compare_block(body, lhs, rhs) {
                            return None;
                        }
                    }
                    offset += kind.size();
                    i = end;
                }
                LayoutOp::End => i += 1,
            }
        }
        Some(offset)
    }

    /// Returns (buffer bytes covered, serialized bytes).
    unsafe fn dump_size_block(&self, ops: &[LayoutOp], base: *const u8) -> (usize, usize) {
        let (mut offset, mut total) = (0, 0);
        let mut i = 0;
        while i < ops.len() {
            match ops[i] {
                LayoutOp::Memcpy(size) => {
                    offset += size;
                    total += size;
                    i += 1;
                }
                LayoutOp::Array(count) => {
                    let end = block_end(ops, i + 1);
                    for _ in 0..count {
                        let (covered, written) = self.dump_size_block(&ops[i + 1..end - 1], base.add(offset));
                        offset += covered;
                        total += written;
                    }
                    i = end;
                }
                LayoutOp::Container(id) => {
                    let end = block_end(ops, i + 1);
                    let body = &ops[i + 1..end - 1];
                    let (kind, element_size) = self.container_at(id);
                    let slot = base.add(offset);
                    let len = kind.len(slot, element_size);
                    total += 8;
                    if is_flat(body) {
                        total += len * element_size;
                    } else {
                        for k in 0..len {
                            total += self.dump_size_block(body, kind.element(slot, k, element_size)).1;
                        }
                    }
                    offset += kind.size();
                    i = end;
                }
                LayoutOp::End => i += 1,
            }
        }
        (offset, total)
    }

    unsafe fn dump_block(&self, ops: &[LayoutOp], base: *const u8, out: &mut dyn Write) -> io::Result<usize> {
        let mut offset = 0;
        let mut i = 0;
        while i < ops.len() {
            match ops[i] {
                LayoutOp::Memcpy(size) => {
                    out.write_all(slice::from_raw_parts(base.add(offset), size))?;
                    offset += size;
                    i += 1;
                }
                LayoutOp::Array(count) => {
                    let end = block_end(ops, i + 1);
                    for _ in 0..count {
                        offset += self.dump_block(&ops[i + 1..end - 1], base.add(offset), out)?;
                    }
                    i = end;
                }
                LayoutOp::Container(id) => {
                    let end = block_end(ops, i + 1);
                    let body = &ops[i + 1..end - 1];
                    let (kind, element_size) = self.container_at(id);
                    let slot = base.add(offset);
                    let len = kind.len(slot, element_size);
                    out.write_all(&(len as u64).to_le_bytes())?;
                    for k in 0..len {
                        self.dump_block(body, kind.element(slot, k, element_size), out)?;
                    }
                    offset += kind.size();
                    i = end;
                }
                LayoutOp::End => i += 1,
            }
        }
        Ok(offset)
    }

    unsafe fn load_block(&self, ops: &[LayoutOp], base: *mut u8, input: &mut dyn Read) -> io::Result<usize> {
        let mut offset = 0;
        let mut i = 0;
        while i < ops.len() {
            match ops[i] {
                LayoutOp::Memcpy(size) => {
                    input.read_exact(slice::from_raw_parts_mut(base.add(offset), size))?;
                    offset += size;
                    i += 1;
                }
                LayoutOp::Array(count) => {
                    let end = block_end(ops, i + 1);
                    for _ in 0..count {
                        offset += self.load_block(&ops[i + 1..end - 1], base.add(offset), input)?;
                    }
                    i = end;
                }
                LayoutOp::Container(id) => {
                    let end = block_end(ops, i + 1);
                    let body = &ops[i + 1..end - 1];
                    let (kind, element_size) = self.container_at(id);
                    let slot = base.add(offset);
                    self.clear_container(id, body, slot);

                    let mut count = [0u8; 8];
                    input.read_exact(&mut count)?;
                    let count = usize::try_from(u64::from_le_bytes(count)).map_err(|_| {
                        io::Error::new(io::ErrorKind::InvalidData, "container length overflows usize")
                    })?;
                    for _ in 0..count {
                        let mut element = self.scratch_element(body, element_size);
                        if let Err(e) = self.load_block(body, element.as_mut_ptr(), input) {
                            self.destroy_block(body, element.as_mut_ptr());
                            return Err(e);
                        }
                        kind.push(slot, &element);
                    }
                    offset += kind.size();
                    i = end;
                }
                LayoutOp::End => i += 1,
            }
        }
        Ok(offset)
    }
}

/// `true` when a block body is plain bytes.
fn is_flat(body: &[LayoutOp]) -> bool {
    body.iter().all(|op| matches!(op, LayoutOp::Memcpy(_)))
}

// ---------------------------------------------------------------------------
// Value visitor
// ---------------------------------------------------------------------------

/// Borrowed bytes of a live value together with its type.
#[derive(Debug, Clone, Copy)]
pub struct ValueView<'r, 'a> {
    registry: &'r Registry,
    ty: &'r Type,
    bytes: &'a [u8],
}

impl<'r, 'a> ValueView<'r, 'a> {
    /// # Safety
    ///
    /// `bytes` must hold an initialized value of `ty`, which must belong to
    /// `registry`.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is not exactly `ty.size()` long.
    pub unsafe fn new(registry: &'r Registry, ty: &'r Type, bytes: &'a [u8]) -> Self {
        assert_eq!(bytes.len(), ty.size(), "buffer of {} bytes used as a {} value", bytes.len(), ty.name());
        Self { registry, ty, bytes }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn ty(&self) -> &'r Type {
        self.ty
    }

    /// Raw bytes. Container slots are opaque machine words.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// View of a part of this value. `ty` must describe the bytes at `offset`.
    pub(crate) fn sub(&self, ty: &'r Type, offset: usize) -> Self {
        Self {
            registry: self.registry,
            ty,
            bytes: &self.bytes[offset..offset + ty.size()],
        }
    }

    /// Field `name` of a compound.
    pub fn field(&self, name: &str) -> Result<Self> {
        let field = self.ty.field(name).ok_or_else(|| Error::FieldNotFound {
            type_name: self.ty.name().to_string(),
            field: name.to_string(),
        })?;
        Ok(self.sub(self.registry.get_by_id(field.ty()), field.offset()))
    }

    /// Number of items of an array or container; `None` for other categories.
    pub fn len(&self) -> Option<usize> {
        match self.ty.kind() {
            TypeKind::Array(array) => Some(array.dimension),
            TypeKind::Container(container) => {
                let element_size = self.registry.get_by_id(container.element()).size();
                // SAFETY: the view holds a live container of this type.
                Some(unsafe { container.kind().len(self.bytes.as_ptr(), element_size) })
            }
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Item `index` of an array or container.
    pub fn item(&self, index: usize) -> Option<Self> {
        match self.ty.kind() {
            TypeKind::Array(array) if index < array.dimension => {
                let element = self.registry.get_by_id(array.element);
                Some(self.sub(element, index * element.size()))
            }
            TypeKind::Container(container) => {
                let element = self.registry.get_by_id(container.element());
                let kind = container.kind();
                let slot = self.bytes.as_ptr();
                // SAFETY: the view holds a live container; the element
                // storage is not mutated while `self.bytes` is borrowed.
                unsafe {
                    if index >= kind.len(slot, element.size()) {
                        return None;
                    }
                    let ptr = kind.element(slot, index, element.size());
                    let bytes = slice::from_raw_parts(ptr, element.size());
                    Some(Self {
                        registry: self.registry,
                        ty: element,
                        bytes,
                    })
                }
            }
            _ => None,
        }
    }
}

/// Handlers called on the parts of a live value.
///
/// Works like [`TypeVisitor`](crate::TypeVisitor), except that arrays and
/// containers visit each of their items and pointers and opaques are
/// plain leaves.
pub trait ValueVisitor<'r> {
    fn visit_null(&mut self, _value: ValueView<'r, '_>) -> Result<bool> {
        Ok(true)
    }

    fn visit_numeric(&mut self, _value: ValueView<'r, '_>, _kind: NumericKind) -> Result<bool> {
        Ok(true)
    }

    fn visit_enum(&mut self, _value: ValueView<'r, '_>, _def: &'r Enum) -> Result<bool> {
        Ok(true)
    }

    fn visit_array(&mut self, value: ValueView<'r, '_>, _array: &'r Array) -> Result<bool> {
        walk_items(self, value)
    }

    fn visit_pointer(&mut self, _value: ValueView<'r, '_>, _pointer: &'r Pointer) -> Result<bool> {
        Ok(true)
    }

    fn visit_compound(&mut self, value: ValueView<'r, '_>, compound: &'r Compound) -> Result<bool> {
        walk_fields(self, value, compound)
    }

    /// Called for each field of a compound, in offset order.
    fn visit_field(&mut self, _parent: ValueView<'r, '_>, _field: &'r Field, value: ValueView<'r, '_>) -> Result<bool> {
        visit_value(self, value)
    }

    fn visit_container(&mut self, value: ValueView<'r, '_>, _container: &'r Container) -> Result<bool> {
        walk_items(self, value)
    }

    fn visit_opaque(&mut self, _value: ValueView<'r, '_>) -> Result<bool> {
        Ok(true)
    }
}

/// Calls the handler matching the category of the value's type.
pub fn visit_value<'r, V>(visitor: &mut V, value: ValueView<'r, '_>) -> Result<bool>
where
    V: ValueVisitor<'r> + ?Sized,
{
    match value.ty.kind() {
        TypeKind::Null => visitor.visit_null(value),
        TypeKind::Numeric(kind) => visitor.visit_numeric(value, *kind),
        TypeKind::Enum(def) => visitor.visit_enum(value, def),
        TypeKind::Array(array) => visitor.visit_array(value, array),
        TypeKind::Pointer(pointer) => visitor.visit_pointer(value, pointer),
        TypeKind::Compound(compound) => visitor.visit_compound(value, compound),
        TypeKind::Container(container) => visitor.visit_container(value, container),
        TypeKind::Opaque => visitor.visit_opaque(value),
    }
}

/// Default compound recursion: every field in offset order.
pub fn walk_fields<'r, V>(visitor: &mut V, value: ValueView<'r, '_>, compound: &'r Compound) -> Result<bool>
where
    V: ValueVisitor<'r> + ?Sized,
{
    for field in compound.fields() {
        let field_value = value.sub(value.registry.get_by_id(field.ty()), field.offset());
        visitor.visit_field(value, field, field_value)?;
    }
    Ok(true)
}

/// Default array and container recursion: every item in order.
pub fn walk_items<'r, V>(visitor: &mut V, value: ValueView<'r, '_>) -> Result<bool>
where
    V: ValueVisitor<'r> + ?Sized,
{
    let len = value.len().unwrap_or(0);
    for index in 0..len {
        if let Some(item) = value.item(index) {
            visit_value(visitor, item)?;
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Abi, CompoundBuilder, EnumBuilder};

    fn registry() -> Registry {
        let mut reg = Registry::with_abi(Abi::host());
        reg.add_numeric("/int", NumericKind::SInt, 4).unwrap();
        reg.add_numeric("/double", NumericKind::Float, 8).unwrap();
        reg
    }

    /// `{ int a; std::vector<int> v; }`
    fn with_vector(reg: &mut Registry) -> TypeId {
        let i = reg.build("/int").unwrap();
        let v = reg.build("/std/vector</int>").unwrap();
        reg.add_compound(CompoundBuilder::new("/WithVec").field("a", i).field("v", v))
            .unwrap()
    }

    unsafe fn push_ints(reg: &Registry, ty: &Type, buffer: &mut [u8], field: &str, values: &[i32]) {
        let f = ty.field(field).unwrap();
        let container = reg.get_by_id(f.ty()).as_container().unwrap();
        let slot = buffer.as_mut_ptr().add(f.offset());
        for v in values {
            container.kind().push(slot, &v.to_ne_bytes());
        }
    }

    #[test]
    fn test_int_codec() {
        assert_eq!(decode_int(&encode_int(-10, 4), true), -10);
        assert_eq!(decode_int(&encode_int(-1, 2), false), 0xffff);
        assert_eq!(decode_int(&encode_int(300, 1), false), 44);
        assert_eq!(decode_int(&encode_int(i64::MIN, 8), true), i64::MIN);
    }

    #[test]
    fn test_init_sets_enum_defaults() {
        let mut reg = registry();
        let pos = reg.add_enum(EnumBuilder::new("/Pos").value("A", 10).value("B", 20)).unwrap();
        let neg = reg.add_enum(EnumBuilder::new("/Neg").value("X", -10)).unwrap();
        let zero = reg
            .add_enum(EnumBuilder::new("/Zero").value("P", 5).value("Z", 0))
            .unwrap();
        let negs = reg.array_of(neg, 3).unwrap();
        let id = reg
            .add_compound(
                CompoundBuilder::new("/Enums")
                    .field("pos", pos)
                    .field("negs", negs)
                    .field("zero", zero),
            )
            .unwrap();
        let ty = reg.get_by_id(id);
        let ops = ValueOps::new(&reg, ty).unwrap();
        let mut buffer = vec![0xaa; ty.size()];
        ops.init(&mut buffer);

        let read = |name: &str| {
            let f = ty.field(name).unwrap();
            let size = reg.get_by_id(f.ty()).size();
            &buffer[f.offset()..f.offset() + size]
        };
        let es = reg.abi().enum_size;
        assert_eq!(decode_int(read("pos"), true), 10);
        for chunk in read("negs").chunks(es) {
            assert_eq!(decode_int(chunk, true), -10);
        }
        assert_eq!(decode_int(read("zero"), true), 0);

        ops.zero(&mut buffer);
        assert!(buffer.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_copy_compare_destroy_with_containers() {
        let mut reg = registry();
        let id = with_vector(&mut reg);
        let ty = reg.get_by_id(id);
        let ops = ValueOps::new(&reg, ty).unwrap();

        let mut a = vec![0u8; ty.size()];
        let mut b = vec![0u8; ty.size()];
        ops.init(&mut a);
        ops.init(&mut b);
        unsafe {
            assert!(ops.compare(&a, &b));
            push_ints(&reg, ty, &mut a, "v", &[1, 2, 3]);
            assert!(!ops.compare(&a, &b));

            push_ints(&reg, ty, &mut b, "v", &[7]);
            ops.copy(&mut b, &a);
            assert!(ops.compare(&a, &b));

            // The copy is deep.
            push_ints(&reg, ty, &mut a, "v", &[4]);
            assert!(!ops.compare(&a, &b));

            ops.destroy(&mut a);
            ops.destroy(&mut b);
        }
    }

    #[test]
    fn test_nested_containers_copy_and_dump() {
        let mut reg = registry();
        let id = reg.build("/std/vector</std/vector</int>>").unwrap();
        let inner = reg.build("/std/vector</int>").unwrap();
        let ty = reg.get_by_id(id);
        let inner_ty = reg.get_by_id(inner);
        let ops = ValueOps::new(&reg, ty).unwrap();
        let inner_ops = ValueOps::new(&reg, inner_ty).unwrap();
        let outer_kind = ty.as_container().unwrap().kind();
        let inner_kind = inner_ty.as_container().unwrap().kind();

        let mut a = vec![0u8; ty.size()];
        let mut b = vec![0u8; ty.size()];
        ops.init(&mut a);
        ops.init(&mut b);
        unsafe {
            for n in 0..3i32 {
                let mut element = vec![0u8; inner_ty.size()];
                inner_ops.init(&mut element);
                for v in 0..n {
                    inner_kind.push(element.as_mut_ptr(), &v.to_ne_bytes());
                }
                outer_kind.push(a.as_mut_ptr(), &element);
            }
            ops.copy(&mut b, &a);
            assert!(ops.compare(&a, &b));

            // count(3) + [count(0)] + [count(1), 0] + [count(2), 0, 1]
            let expected = 8 + 8 + (8 + 4) + (8 + 8);
            assert_eq!(ops.dump_size(&a), expected);
            let bytes = ops.dump_to_vec(&a).unwrap();
            assert_eq!(bytes.len(), expected);
            assert_eq!(&bytes[..8], &3u64.to_le_bytes());

            let mut c = vec![0u8; ty.size()];
            ops.init(&mut c);
            ops.load_from_slice(&mut c, &bytes).unwrap();
            assert!(ops.compare(&a, &c));

            ops.destroy(&mut a);
            ops.destroy(&mut b);
            ops.destroy(&mut c);
        }
    }

    #[test]
    fn test_dump_format_and_load_errors() {
        let mut reg = registry();
        let id = with_vector(&mut reg);
        let ty = reg.get_by_id(id);
        let ops = ValueOps::new(&reg, ty).unwrap();
        let v_offset = ty.field("v").unwrap().offset();

        let mut value = vec![0u8; ty.size()];
        ops.init(&mut value);
        unsafe {
            value[..4].copy_from_slice(&42i32.to_ne_bytes());
            push_ints(&reg, ty, &mut value, "v", &[1, 2]);
            let bytes = ops.dump_to_vec(&value).unwrap();
            assert_eq!(bytes.len(), v_offset + 8 + 8);
            assert_eq!(&bytes[..4], &42i32.to_ne_bytes());
            assert_eq!(&bytes[v_offset..v_offset + 8], &2u64.to_le_bytes());
            assert_eq!(&bytes[v_offset + 8..v_offset + 12], &1i32.to_ne_bytes());

            let mut loaded = vec![0u8; ty.size()];
            ops.init(&mut loaded);

            let mut trailing = bytes.clone();
            trailing.push(0);
            assert!(matches!(
                ops.load_from_slice(&mut loaded, &trailing),
                Err(Error::SizeMismatch { expected, actual }) if expected == bytes.len() && actual == bytes.len() + 1
            ));

            let truncated = &bytes[..bytes.len() - 2];
            match ops.load_from_slice(&mut loaded, truncated) {
                Err(Error::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
                other => panic!("unexpected result {:?}", other),
            }

            ops.load_from_slice(&mut loaded, &bytes).unwrap();
            assert!(ops.compare(&value, &loaded));

            ops.destroy(&mut value);
            ops.destroy(&mut loaded);
        }
    }

    #[test]
    #[should_panic(expected = "used as a")]
    fn test_size_mismatch_panics() {
        let reg = registry();
        let ty = reg.find("/int").unwrap();
        let ops = ValueOps::new(&reg, ty).unwrap();
        let mut buffer = vec![0u8; 3];
        ops.init(&mut buffer);
    }

    #[test]
    fn test_opaque_rejected_unless_accepted() {
        let mut reg = registry();
        let o = reg.add_opaque("/Blob", 16).unwrap();
        let ty = reg.get_by_id(o);
        assert!(matches!(ValueOps::new(&reg, ty), Err(Error::NoLayout { .. })));
        let options = LayoutOptions {
            accept_opaques: true,
            ..LayoutOptions::default()
        };
        let ops = ValueOps::with_options(&reg, ty, options).unwrap();
        let a = vec![1u8; 16];
        let b = vec![1u8; 16];
        assert!(unsafe { ops.compare(&a, &b) });
    }

    struct Sum {
        total: i64,
        items: usize,
    }

    impl<'r> ValueVisitor<'r> for Sum {
        fn visit_numeric(&mut self, value: ValueView<'r, '_>, _kind: NumericKind) -> Result<bool> {
            self.total += decode_int(value.bytes(), true);
            Ok(true)
        }

        fn visit_container(&mut self, value: ValueView<'r, '_>, _container: &'r Container) -> Result<bool> {
            self.items += value.len().unwrap_or(0);
            walk_items(self, value)
        }
    }

    #[test]
    fn test_value_visitor_walks_items() {
        let mut reg = registry();
        let id = with_vector(&mut reg);
        let ty = reg.get_by_id(id);
        let ops = ValueOps::new(&reg, ty).unwrap();
        let mut value = vec![0u8; ty.size()];
        ops.init(&mut value);
        unsafe {
            value[..4].copy_from_slice(&100i32.to_ne_bytes());
            push_ints(&reg, ty, &mut value, "v", &[1, 2, 3]);
            let mut sum = Sum { total: 0, items: 0 };
            visit_value(&mut sum, ValueView::new(&reg, ty, &value)).unwrap();
            assert_eq!(sum.total, 106);
            assert_eq!(sum.items, 3);

            let view = ValueView::new(&reg, ty, &value);
            let v = view.field("v").unwrap();
            assert_eq!(v.len(), Some(3));
            assert_eq!(decode_int(v.item(2).unwrap().bytes(), true), 3);
            assert!(v.item(3).is_none());
            assert!(view.field("nope").is_err());
            ops.destroy(&mut value);
        }
    }
}
