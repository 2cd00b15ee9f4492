// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 typelib contributors

//! Container kinds.
//!
//! A container is the one category whose storage is not a flat run of
//! fixed offsets: its value is a slot (a few machine words) owning a
//! separately allocated run of elements. The value engine never looks
//! inside a slot itself; it goes through the minimal capability interface
//! below and handles element-level semantics (deep copy, destruction,
//! comparison, serialization) with the element type's own layout.

use std::fmt;
use std::mem::{self, ManuallyDrop};
use std::ops::{Deref, DerefMut};
use std::ptr;

/// Runtime operations of a container family.
///
/// Every method taking a slot pointer requires the slot to hold a container
/// previously written by [`init`](Self::init) of the same kind and not yet
/// [`release`](Self::release)d. Slots may be unaligned. Elements are moved
/// in and out bitwise; running element destructors is the caller's job.
///
/// # Safety
///
/// Implementations must return element pointers valid for `element_size`
/// bytes until the next mutating call on the same slot, and must keep the
/// slot self-contained within [`size`](Self::size) bytes.
pub unsafe trait ContainerKind: fmt::Debug + Send + Sync {
    /// Template name, e.g. `/std/vector`.
    fn name(&self) -> &str;

    /// Bytes occupied by a container value.
    fn size(&self) -> usize;

    /// Alignment of a container value.
    fn alignment(&self) -> usize;

    /// Writes an empty container into uninitialized memory.
    ///
    /// # Safety
    ///
    /// `slot` must be valid for writes of [`size`](Self::size) bytes.
    unsafe fn init(&self, slot: *mut u8);

    /// Number of stored elements.
    ///
    /// # Safety
    ///
    /// See the trait documentation.
    unsafe fn len(&self, slot: *const u8, element_size: usize) -> usize;

    /// Pointer to element `index`.
    ///
    /// # Safety
    ///
    /// See the trait documentation; `index` must be in bounds.
    unsafe fn element(&self, slot: *const u8, index: usize, element_size: usize) -> *const u8;

    /// Mutable pointer to element `index`.
    ///
    /// # Safety
    ///
    /// See the trait documentation; `index` must be in bounds.
    unsafe fn element_mut(&self, slot: *mut u8, index: usize, element_size: usize) -> *mut u8;

    /// Appends an element, taking ownership of its bytes.
    ///
    /// # Safety
    ///
    /// See the trait documentation.
    unsafe fn push(&self, slot: *mut u8, element: &[u8]);

    /// Moves element `index` out into `out`, shifting later elements down.
    ///
    /// # Safety
    ///
    /// See the trait documentation; `index` must be in bounds and `out`
    /// exactly `element_size` bytes long.
    unsafe fn remove(&self, slot: *mut u8, index: usize, element_size: usize, out: &mut [u8]);

    /// Forgets every element past `len` without destroying it.
    ///
    /// # Safety
    ///
    /// See the trait documentation.
    unsafe fn truncate(&self, slot: *mut u8, len: usize, element_size: usize);

    /// Frees the element storage. Elements must already be destroyed.
    ///
    /// # Safety
    ///
    /// See the trait documentation. The slot is uninitialized afterwards.
    unsafe fn release(&self, slot: *mut u8);
}

/// In-slot representation of a vector: a decomposed `Vec<u8>` whose
/// length and capacity are counted in bytes.
#[repr(C)]
#[derive(Clone, Copy)]
struct RawVec {
    ptr: *mut u8,
    len: usize,
    cap: usize,
}

unsafe fn read_raw(slot: *const u8) -> RawVec {
    ptr::read_unaligned(slot.cast::<RawVec>())
}

unsafe fn write_vec(slot: *mut u8, vec: &mut ManuallyDrop<Vec<u8>>) {
    let raw = RawVec {
        ptr: vec.as_mut_ptr(),
        len: vec.len(),
        cap: vec.capacity(),
    };
    ptr::write_unaligned(slot.cast::<RawVec>(), raw);
}

/// Reassembled `Vec` that writes itself back into its slot when dropped,
/// panics included.
struct SlotVec {
    slot: *mut u8,
    vec: ManuallyDrop<Vec<u8>>,
}

impl SlotVec {
    unsafe fn open(slot: *mut u8) -> Self {
        let raw = read_raw(slot);
        Self {
            slot,
            vec: ManuallyDrop::new(Vec::from_raw_parts(raw.ptr, raw.len, raw.cap)),
        }
    }
}

impl Deref for SlotVec {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.vec
    }
}

impl DerefMut for SlotVec {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.vec
    }
}

impl Drop for SlotVec {
    fn drop(&mut self) {
        // SAFETY: `slot` was valid when opened and the vector is handed back
        // to it; ManuallyDrop keeps the allocation alive.
        unsafe { write_vec(self.slot, &mut self.vec) }
    }
}

/// Growable contiguous sequence, the `/std/vector` and `/std/string`
/// families.
#[derive(Debug, Clone)]
pub struct VectorKind {
    name: String,
}

impl VectorKind {
    /// Template name of the built-in vector kind.
    pub const STD_VECTOR: &'static str = "/std/vector";

    /// Template name of the built-in string kind, a vector of characters.
    pub const STD_STRING: &'static str = "/std/string";

    /// Vector kind registered under `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for VectorKind {
    fn default() -> Self {
        Self::new(Self::STD_VECTOR)
    }
}

unsafe impl ContainerKind for VectorKind {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> usize {
        mem::size_of::<RawVec>()
    }

    fn alignment(&self) -> usize {
        mem::align_of::<RawVec>()
    }

    unsafe fn init(&self, slot: *mut u8) {
        write_vec(slot, &mut ManuallyDrop::new(Vec::new()));
    }

    unsafe fn len(&self, slot: *const u8, element_size: usize) -> usize {
        read_raw(slot).len / element_size
    }

    unsafe fn element(&self, slot: *const u8, index: usize, element_size: usize) -> *const u8 {
        let raw = read_raw(slot);
        debug_assert!((index + 1) * element_size <= raw.len);
        raw.ptr.add(index * element_size).cast_const()
    }

    unsafe fn element_mut(&self, slot: *mut u8, index: usize, element_size: usize) -> *mut u8 {
        let raw = read_raw(slot);
        debug_assert!((index + 1) * element_size <= raw.len);
        raw.ptr.add(index * element_size)
    }

    unsafe fn push(&self, slot: *mut u8, element: &[u8]) {
        SlotVec::open(slot).extend_from_slice(element);
    }

    unsafe fn remove(&self, slot: *mut u8, index: usize, element_size: usize, out: &mut [u8]) {
        let mut vec = SlotVec::open(slot);
        let start = index * element_size;
        out.copy_from_slice(&vec[start..start + element_size]);
        vec.drain(start..start + element_size);
    }

    unsafe fn truncate(&self, slot: *mut u8, len: usize, element_size: usize) {
        SlotVec::open(slot).truncate(len * element_size);
    }

    unsafe fn release(&self, slot: *mut u8) {
        let raw = read_raw(slot);
        drop(Vec::from_raw_parts(raw.ptr, raw.len, raw.cap));
        self.init(slot);
    }
}
