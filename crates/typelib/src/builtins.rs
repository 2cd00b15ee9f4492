// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 typelib contributors

//! Standard C numeric types.
//!
//! Registers the fixed-width types (`/int8_t` ... `/uint64_t`, `/float`,
//! `/double`) plus the C keyword spellings as aliases sized for the
//! registry's ABI (`/long` is 8 bytes on LP64, 4 on ILP32), and `/std/string`
//! as a name for `/std/string</int8_t>`.

use crate::container::VectorKind;
use crate::error::Result;
use crate::registry::Registry;
use crate::types::NumericKind;

const FIXED_WIDTH: &[(&str, NumericKind, usize)] = &[
    ("/int8_t", NumericKind::SInt, 1),
    ("/uint8_t", NumericKind::UInt, 1),
    ("/int16_t", NumericKind::SInt, 2),
    ("/uint16_t", NumericKind::UInt, 2),
    ("/int32_t", NumericKind::SInt, 4),
    ("/uint32_t", NumericKind::UInt, 4),
    ("/int64_t", NumericKind::SInt, 8),
    ("/uint64_t", NumericKind::UInt, 8),
    ("/float", NumericKind::Float, 4),
    ("/double", NumericKind::Float, 8),
];

/// Name the character string container is registered under.
pub const STRING: &str = "/std/string";

fn fixed_width_name(kind: NumericKind, size: usize) -> String {
    let sign = if kind == NumericKind::UInt { "u" } else { "" };
    format!("/{}int{}_t", sign, size * 8)
}

/// Adds the standard numeric types and their C aliases.
pub fn add_standard_types(registry: &mut Registry) -> Result<()> {
    for (name, kind, size) in FIXED_WIDTH {
        if !registry.has(name) {
            registry.add_numeric(name, *kind, *size)?;
        }
    }

    let long_size = registry.abi().pointer_size;
    let aliases: [(&str, NumericKind, usize); 12] = [
        ("/char", NumericKind::SInt, 1),
        ("/signed char", NumericKind::SInt, 1),
        ("/unsigned char", NumericKind::UInt, 1),
        ("/bool", NumericKind::UInt, 1),
        ("/short", NumericKind::SInt, 2),
        ("/unsigned short", NumericKind::UInt, 2),
        ("/int", NumericKind::SInt, 4),
        ("/unsigned int", NumericKind::UInt, 4),
        ("/long", NumericKind::SInt, long_size),
        ("/unsigned long", NumericKind::UInt, long_size),
        ("/long long", NumericKind::SInt, 8),
        ("/unsigned long long", NumericKind::UInt, 8),
    ];
    for (alias, kind, size) in aliases {
        if !registry.has(alias) {
            registry.alias(&fixed_width_name(kind, size), alias)?;
        }
    }
    if !registry.has(STRING) {
        let char_id = registry.build("/int8_t")?;
        let string = registry.container_of(VectorKind::STD_STRING, char_id)?;
        let string_name = registry.get_by_id(string).name().to_string();
        registry.alias(&string_name, STRING)?;
    }
    log::debug!("[builtins] standard types registered ({} types)", registry.len());
    Ok(())
}

impl Registry {
    /// Registry for the host ABI, seeded with [`add_standard_types`].
    pub fn standard() -> Result<Self> {
        let mut registry = Self::new();
        add_standard_types(&mut registry)?;
        Ok(registry)
    }
}
