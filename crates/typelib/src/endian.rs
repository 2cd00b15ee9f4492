// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 typelib contributors

//! Byte-order conversion.
//!
//! [`EndianSwap::compile`] turns a type into a program over a value buffer;
//! [`EndianSwap::apply`] runs it from an input buffer into a separate output
//! buffer of the same size. Applying the same program twice restores the
//! original bytes.
//!
//! | Op | Effect at the cursor |
//! |----|----------------------|
//! | `Skip(n)` | copy `n` bytes unchanged |
//! | `Byte(i)` | copy input byte `i` of the current element |
//! | `Swap4` / `Swap8` | copy 4 / 8 bytes reversed |
//! | `Array { count, element_size }` ... `End` | run the body once per element |
//!
//! Only flat data can be swapped: pointers, containers and opaque types are
//! rejected, and so are numerics other than 1, 2, 4 or 8 bytes wide.

use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::types::{Array, Compound, Container, Enum, Field, NumericKind, Pointer, Type};
use crate::visitor::{dispatch, TypeVisitor};

/// One instruction of an [`EndianSwap`] program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapOp {
    Skip(usize),
    Byte(usize),
    Swap4,
    Swap8,
    Array { count: usize, element_size: usize },
    End,
}

/// Compiled byte-swap program of one type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EndianSwap {
    ops: Vec<SwapOp>,
    size: usize,
}

fn unsupported(ty: &Type, reason: impl Into<String>) -> Error {
    Error::UnsupportedSwap {
        type_name: ty.name().to_string(),
        reason: reason.into(),
    }
}

/// Builds the swap program of one type. `base` is the offset of the
/// visited type inside the current element (the whole value at top level,
/// one array element inside an `Array` block).
struct SwapCompiler<'r> {
    registry: &'r Registry,
    base: usize,
    ops: Vec<SwapOp>,
}

impl<'r> SwapCompiler<'r> {
    fn compile(registry: &'r Registry, ty: &'r Type) -> Result<Vec<SwapOp>> {
        let mut compiler = Self {
            registry,
            base: 0,
            ops: Vec::new(),
        };
        dispatch(&mut compiler, ty)?;
        Ok(compiler.ops)
    }

    fn push_skip(&mut self, size: usize) {
        if size == 0 {
            return;
        }
        if let Some(SwapOp::Skip(last)) = self.ops.last_mut() {
            *last += size;
        } else {
            self.ops.push(SwapOp::Skip(size));
        }
    }
}

impl<'r> TypeVisitor<'r> for SwapCompiler<'r> {
    fn registry(&self) -> &'r Registry {
        self.registry
    }

    fn visit_numeric(&mut self, ty: &'r Type, _kind: NumericKind) -> Result<bool> {
        match ty.size() {
            1 => self.push_skip(1),
            2 => self.ops.extend([SwapOp::Byte(self.base + 1), SwapOp::Byte(self.base)]),
            4 => self.ops.push(SwapOp::Swap4),
            8 => self.ops.push(SwapOp::Swap8),
            size => return Err(unsupported(ty, format!("no byte swap for {}-byte numerics", size))),
        }
        Ok(true)
    }

    fn visit_enum(&mut self, ty: &'r Type, _def: &'r Enum) -> Result<bool> {
        let base = self.base;
        self.ops.extend((0..ty.size()).rev().map(|i| SwapOp::Byte(base + i)));
        Ok(true)
    }

    fn visit_array(&mut self, _ty: &'r Type, array: &'r Array) -> Result<bool> {
        let element = self.registry.get_by_id(array.element);
        // Byte indices of the body are relative to each element.
        let body = Self::compile(self.registry, element)?;
        match body.as_slice() {
            _ if array.dimension == 0 => {}
            [] => {}
            [SwapOp::Skip(size)] => self.push_skip(size * array.dimension),
            [SwapOp::Array { count, element_size }, .., SwapOp::End]
                if swap_block_end(&body, 1) == body.len() =>
            {
                self.ops.push(SwapOp::Array {
                    count: count * array.dimension,
                    element_size: *element_size,
                });
                self.ops.extend_from_slice(&body[1..]);
            }
            _ => {
                self.ops.push(SwapOp::Array {
                    count: array.dimension,
                    element_size: element.size(),
                });
                self.ops.extend_from_slice(&body);
                self.ops.push(SwapOp::End);
            }
        }
        Ok(false)
    }

    fn visit_compound(&mut self, ty: &'r Type, compound: &'r Compound) -> Result<bool> {
        let mut cursor = 0;
        for field in compound.fields() {
            // Fields overlapping bytes already handled keep the first
            // field's interpretation.
            if field.offset() < cursor {
                continue;
            }
            self.push_skip(field.offset() - cursor);
            self.visit_field(ty, field)?;
            cursor = field.offset() + self.registry.get_by_id(field.ty()).size();
        }
        self.push_skip(ty.size().saturating_sub(cursor));
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

    fn visit_pointer(&mut self, ty: &'r Type, _pointer: &'r Pointer) -> Result<bool> {
        Err(unsupported(ty, "pointers cannot be swapped"))
    }

    fn visit_container(&mut self, ty: &'r Type, _container: &'r Container) -> Result<bool> {
        Err(unsupported(ty, "containers cannot be swapped"))
    }

    fn visit_opaque(&mut self, ty: &'r Type) -> Result<bool> {
        Err(unsupported(ty, "opaque types have no known structure"))
    }
}

/// Index just past the `End` closing the block whose body starts at `start`.
fn swap_block_end(ops: &[SwapOp], start: usize) -> usize {
    let mut depth = 0usize;
    for (i, op) in ops.iter().enumerate().skip(start) {
        match op {
            SwapOp::Array { .. } => depth += 1,
            SwapOp::End if depth == 0 => return i + 1,
            SwapOp::End => depth -= 1,
            _ => {}
        }
    }
    ops.len()
}

impl EndianSwap {
    /// Compiles the swap program of `ty`.
    pub fn compile(registry: &Registry, ty: &Type) -> Result<Self> {
        let ops = SwapCompiler::compile(registry, ty)?;
        log::trace!("[endian] {} -> {} ops", ty.name(), ops.len());
        Ok(Self { ops, size: ty.size() })
    }

    pub fn ops(&self) -> &[SwapOp] {
        &self.ops
    }

    /// Size of the buffers the program runs on.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Writes the byte-swapped `input` into `output`.
    ///
    /// # Panics
    ///
    /// Panics if either buffer is not exactly [`size`](Self::size) long.
    pub fn apply(&self, input: &[u8], output: &mut [u8]) {
        assert_eq!(input.len(), self.size, "swap input of {} bytes, expected {}", input.len(), self.size);
        assert_eq!(output.len(), self.size, "swap output of {} bytes, expected {}", output.len(), self.size);
        let (cursor, _) = self.execute(0, input, output, 0, 0);
        debug_assert_eq!(cursor, self.size);
    }

    /// Swaps `buffer` through a temporary copy.
    pub fn apply_in_place(&self, buffer: &mut [u8]) {
        let input = buffer.to_vec();
        self.apply(&input, buffer);
    }

    /// Host to big-endian: swaps on little-endian hosts, copies otherwise.
    pub fn to_network(&self, input: &[u8], output: &mut [u8]) {
        if cfg!(target_endian = "little") {
            self.apply(input, output);
        } else {
            output.copy_from_slice(input);
        }
    }

    /// Big-endian to host; the inverse of [`to_network`](Self::to_network).
    pub fn from_network(&self, input: &[u8], output: &mut [u8]) {
        self.to_network(input, output);
    }

    /// Runs ops from `start` until the `End` of the current block, with the
    /// element starting at `base`. Returns (cursor, index after `End`).
    fn execute(&self, start: usize, input: &[u8], output: &mut [u8], mut cursor: usize, base: usize) -> (usize, usize) {
        let mut i = start;
        while i < self.ops.len() {
            match self.ops[i] {
                SwapOp::Skip(size) => {
                    output[cursor..cursor + size].copy_from_slice(&input[cursor..cursor + size]);
                    cursor += size;
                }
                SwapOp::Byte(index) => {
                    output[cursor] = input[base + index];
                    cursor += 1;
                }
                SwapOp::Swap4 => {
                    reverse_into(&input[cursor..cursor + 4], &mut output[cursor..cursor + 4]);
                    cursor += 4;
                }
                SwapOp::Swap8 => {
                    reverse_into(&input[cursor..cursor + 8], &mut output[cursor..cursor + 8]);
                    cursor += 8;
                }
                SwapOp::Array { count, element_size } => {
                    let mut after = swap_block_end(&self.ops, i + 1);
                    for _ in 0..count {
                        let element = cursor;
                        (cursor, after) = self.execute(i + 1, input, output, element, element);
                        debug_assert_eq!(cursor, element + element_size);
                    }
                    i = after;
                    continue;
                }
                SwapOp::End => return (cursor, i + 1),
            }
            i += 1;
        }
        (cursor, i)
    }
}

fn reverse_into(input: &[u8], output: &mut [u8]) {
    for (out, byte) in output.iter_mut().zip(input.iter().rev()) {
        *out = *byte;
    }
}
