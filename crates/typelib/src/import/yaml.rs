// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 typelib contributors

//! YAML type-description importer.
//!
//! # Example YAML
//!
//! ```yaml
//! namespace: /geo
//! types:
//!   - name: Unit
//!     category: enum
//!     values:
//!       - { symbol: METERS }
//!       - { symbol: FEET, value: 10 }
//!   - name: Point
//!     category: compound
//!     fields:
//!       - { name: x, type: /double }
//!       - { name: y, type: /double }
//!       - { name: unit, type: Unit }
//!   - name: Path
//!     category: container
//!     kind: /std/vector
//!     element: Point
//!   - name: Real
//!     category: alias
//!     target: /double
//!   - name: Handle
//!     category: opaque
//!     size: 8
//!   - name: int24
//!     category: numeric
//!     kind: sint
//!     size: 3
//! ```
//!
//! Relative names are defined in the import namespace, taken from the
//! `namespace` configuration key, then `yaml.namespace`, then the
//! document's `namespace`, then the registry's default namespace. Type
//! references go through [`Registry::build`], so `Point[4]` or
//! `/std/vector</int32_t>` work anywhere a type is expected. Entries may
//! refer to types defined later in the same document.

use super::{ImportConfig, Importer};
use crate::builder::{CompoundBuilder, EnumBuilder};
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::typename;
use crate::types::NumericKind;
use serde::Deserialize;
use std::io::Read;

/// Importer registered as `yaml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlImporter;

/// Root YAML document structure.
#[derive(Debug, Deserialize)]
struct YamlTypeDocument {
    #[serde(default)]
    namespace: Option<String>,

    /// Entries are decoded one by one so errors can name them.
    #[serde(default)]
    types: Vec<serde_yaml::Value>,
}

/// One type definition, tagged by `category`.
#[derive(Debug, Deserialize)]
#[serde(tag = "category", rename_all = "lowercase")]
enum YamlType {
    Numeric {
        name: String,
        kind: YamlNumericKind,
        size: usize,
    },
    Enum {
        name: String,
        values: Vec<YamlEnumValue>,
    },
    Compound {
        name: String,
        #[serde(default)]
        size: Option<usize>,
        fields: Vec<YamlField>,
    },
    Opaque {
        name: String,
        size: usize,
    },
    Alias {
        name: String,
        target: String,
    },
    Container {
        name: String,
        kind: String,
        element: String,
    },
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum YamlNumericKind {
    Sint,
    Uint,
    Float,
}

impl From<YamlNumericKind> for NumericKind {
    fn from(kind: YamlNumericKind) -> Self {
        match kind {
            YamlNumericKind::Sint => NumericKind::SInt,
            YamlNumericKind::Uint => NumericKind::UInt,
            YamlNumericKind::Float => NumericKind::Float,
        }
    }
}

/// Enum symbol; without `value` it counts on from the previous symbol.
#[derive(Debug, Deserialize)]
struct YamlEnumValue {
    symbol: String,
    #[serde(default)]
    value: Option<i64>,
}

/// Compound field; without `offset` it is placed at natural alignment.
#[derive(Debug, Deserialize)]
struct YamlField {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    offset: Option<usize>,
}

impl YamlType {
    fn name(&self) -> &str {
        match self {
            Self::Numeric { name, .. }
            | Self::Enum { name, .. }
            | Self::Compound { name, .. }
            | Self::Opaque { name, .. }
            | Self::Alias { name, .. }
            | Self::Container { name, .. } => name,
        }
    }
}

fn entry_error(entry: &str, error: impl ToString) -> Error {
    Error::Import {
        source: entry.to_string(),
        reason: error.to_string(),
    }
}

fn qualify(namespace: &str, name: &str) -> String {
    if typename::is_absolute(name) {
        name.to_string()
    } else {
        format!("{}{}", namespace, name)
    }
}

/// Adds one entry to the registry.
fn define(entry: &YamlType, namespace: &str, registry: &mut Registry) -> Result<()> {
    let name = qualify(namespace, entry.name());
    match entry {
        YamlType::Numeric { kind, size, .. } => {
            registry.add_numeric(&name, (*kind).into(), *size)?;
        }
        YamlType::Enum { values, .. } => {
            let mut def = EnumBuilder::new(name);
            for v in values {
                def = match v.value {
                    Some(value) => def.value(&v.symbol, value),
                    None => def.next(&v.symbol),
                };
            }
            registry.add_enum(def)?;
        }
        YamlType::Compound { size, fields, .. } => {
            let mut def = CompoundBuilder::new(name);
            for field in fields {
                let ty = registry.build(&field.ty)?;
                def = match field.offset {
                    Some(offset) => def.field_at(&field.name, ty, offset),
                    None => def.field(&field.name, ty),
                };
            }
            if let Some(size) = size {
                def = def.size(*size);
            }
            registry.add_compound(def)?;
        }
        YamlType::Opaque { size, .. } => {
            registry.add_opaque(&name, *size)?;
        }
        YamlType::Alias { target, .. } => {
            let target = registry.build(target)?;
            let target_name = registry.get_by_id(target).name().to_string();
            registry.alias(&target_name, &name)?;
        }
        YamlType::Container { kind, element, .. } => {
            let element = registry.build(element)?;
            let container = registry.container_of(kind, element)?;
            let container_name = registry.get_by_id(container).name().to_string();
            registry.alias(&container_name, &name)?;
        }
    }
    Ok(())
}

/// Defines every entry, retrying the ones waiting for types defined later.
fn define_all(entries: Vec<(String, YamlType)>, namespace: &str, registry: &mut Registry) -> Result<usize> {
    let total = entries.len();
    let mut pending = entries;
    while !pending.is_empty() {
        let before = pending.len();
        let mut deferred = Vec::new();
        let mut first_missing = None;
        for (label, entry) in pending {
            match define(&entry, namespace, registry) {
                Ok(()) => {}
                Err(Error::UndefinedType(missing)) => {
                    if first_missing.is_none() {
                        first_missing = Some(entry_error(&label, Error::UndefinedType(missing)));
                    }
                    deferred.push((label, entry));
                }
                Err(e) => return Err(entry_error(&label, e)),
            }
        }
        if deferred.len() == before {
            if let Some(error) = first_missing {
                return Err(error);
            }
        }
        pending = deferred;
    }
    Ok(total)
}

impl YamlImporter {
    /// Imports a YAML document held in memory.
    pub fn load_str(&self, text: &str, config: &ImportConfig, registry: &mut Registry) -> Result<()> {
        let document: YamlTypeDocument =
            serde_yaml::from_str(text).map_err(|e| entry_error("yaml document", e))?;

        let yaml_config = config.subtree("yaml");
        let namespace = config
            .get("namespace")
            .or_else(|| yaml_config.get("namespace"))
            .or(document.namespace.as_deref())
            .unwrap_or(registry.default_namespace());
        let namespace = typename::normalize_namespace(namespace);

        let mut entries = Vec::with_capacity(document.types.len());
        for (index, value) in document.types.into_iter().enumerate() {
            let label = match value.get("name").and_then(serde_yaml::Value::as_str) {
                Some(name) => qualify(&namespace, name),
                None => format!("types[{}]", index),
            };
            let entry: YamlType = serde_yaml::from_value(value).map_err(|e| entry_error(&label, e))?;
            entries.push((label, entry));
        }

        let saved = registry.default_namespace().to_string();
        registry.set_default_namespace(&namespace)?;
        let defined = define_all(entries, &namespace, registry);
        registry.set_default_namespace(&saved)?;
        log::debug!("[import] yaml: {} entries defined in {}", defined.as_ref().unwrap_or(&0), namespace);
        defined.map(|_| ())
    }
}

impl Importer for YamlImporter {
    fn name(&self) -> &str {
        "yaml"
    }

    fn extensions(&self) -> &[&str] {
        &["yaml", "yml"]
    }

    fn load(&self, input: &mut dyn Read, config: &ImportConfig, registry: &mut Registry) -> Result<()> {
        let mut text = String::new();
        input
            .read_to_string(&mut text)
            .map_err(|e| entry_error("yaml document", e))?;
        self.load_str(&text, config, registry)
    }
}
