// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 typelib contributors

//! # Typelib - runtime type system for C-style memory values
//!
//! Describes types (numerics, enums, arrays, pointers, compounds,
//! containers, opaques) at runtime, and manipulates values laid out in
//! memory according to those descriptions: initialization, copy,
//! comparison, destruction, serialization, display and endian swapping.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use typelib::{CompoundBuilder, Registry, Result, Value};
//!
//! fn main() -> Result<()> {
//!     let mut registry = Registry::standard()?;
//!     let samples = registry.build("/std/vector</double>")?;
//!     let int = registry.build("/int32_t")?;
//!     registry.add_compound(
//!         CompoundBuilder::new("/Reading")
//!             .field("id", int)
//!             .field("samples", samples),
//!     )?;
//!
//!     let mut reading = Value::of(&registry, "/Reading")?;
//!     reading.field_mut("id")?.set(7i32)?;
//!     reading.field_mut("samples")?.push_scalar(1.5f64)?;
//!
//!     let bytes = reading.dump_to_vec()?;
//!     let mut copy = Value::of(&registry, "/Reading")?;
//!     copy.load_from_slice(&bytes)?;
//!     assert_eq!(reading, copy);
//!     println!("{}", copy);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------+
//! |  import: Importers table, YamlImporter, ImportConfig          |
//! +---------------------------------------------------------------+
//! |  Value / ValueMut / ValueView   (safe owned and borrowed)     |
//! +---------------------------------------------------------------+
//! |  ValueOps (layout interpreter)  |  EndianSwap (swap program)  |
//! +---------------------------------------------------------------+
//! |  MemoryLayout compiler          |  TypeVisitor                |
//! +---------------------------------------------------------------+
//! |  Registry: arena of Type, names, aliases, container kinds     |
//! +---------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Registry`] | Owns the types, resolves names and builds derived types |
//! | [`Type`] | Immutable description of one type |
//! | [`MemoryLayout`] | Compiled program describing a value's memory |
//! | [`ValueOps`] | Value operations driven by a layout |
//! | [`Value`] | Owned, initialized value of a registry type |
//! | [`EndianSwap`] | Compiled byte-swap program |
//!
//! ## Features
//!
//! - `yaml-import` (default): [`import::YamlImporter`] and YAML loading of
//!   [`import::ImportConfig`].

pub mod abi;
/// Builders for compound and enum definitions.
pub mod builder;
/// Standard numeric types and their C spellings.
pub mod builtins;
/// Container kinds (`/std/vector`, `/std/string`).
pub mod container;
/// Endian-swap program compiler and executor.
pub mod endian;
pub mod error;
/// Importers and their configuration.
pub mod import;
/// Memory layout compiler.
pub mod layout;
pub mod registry;
/// Type name syntax: namespaces, modifiers and template arguments.
pub mod typename;
pub mod types;
/// Safe value handles (owned values, scalar access, container editing).
pub mod value;
/// Layout-driven value operations and the value visitor.
pub mod value_ops;
/// Category-dispatched type visitor.
pub mod visitor;

#[cfg(test)]
mod tests;

pub use abi::Abi;
pub use builder::{CompoundBuilder, EnumBuilder};
pub use builtins::add_standard_types;
pub use container::{ContainerKind, VectorKind};
pub use endian::{EndianSwap, SwapOp};
pub use error::{Error, Result};
pub use layout::{LayoutOp, LayoutOptions, MemoryLayout};
pub use registry::Registry;
pub use types::{Category, Field, NumericKind, Type, TypeId, TypeKind};
pub use value::{Scalar, Value, ValueMut};
pub use value_ops::{visit_value, ValueOps, ValueView, ValueVisitor};
pub use visitor::{contains_category, dispatch, TypeVisitor};
