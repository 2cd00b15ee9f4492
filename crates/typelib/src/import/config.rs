// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 typelib contributors

//! Importer settings.
//!
//! Keys are dotted paths (`yaml.namespace`) and every key holds an ordered
//! list of string values, so list-valued settings such as `include` need no
//! special casing.
//!
//! # Example YAML
//!
//! ```yaml
//! include:
//!   - /usr/share/types
//!   - ./types
//! define: [DEBUG]
//! yaml:
//!   namespace: /geo
//! ```

use std::collections::BTreeMap;

#[cfg(feature = "yaml-import")]
use crate::error::{Error, Result};
#[cfg(feature = "yaml-import")]
use std::path::Path;

/// Hierarchical key/values configuration handed to importers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportConfig {
    values: BTreeMap<String, Vec<String>>,
}

impl ImportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the values of `key` with a single one.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), vec![value.into()]);
    }

    /// Appends a value to `key`.
    pub fn add(&mut self, key: &str, value: impl Into<String>) {
        self.values.entry(key.to_string()).or_default().push(value.into());
    }

    /// First value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Every value of `key`, in insertion order.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Boolean reading of `key` (`true`/`yes`/`on`/`1` and their
    /// negations); `default` when missing or unrecognized.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key).map(str::to_ascii_lowercase).as_deref() {
            Some("true" | "yes" | "on" | "1") => true,
            Some("false" | "no" | "off" | "0") => false,
            _ => default,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Settings below `prefix`, with the prefix stripped
    /// (`subtree("yaml")` turns `yaml.namespace` into `namespace`).
    pub fn subtree(&self, prefix: &str) -> ImportConfig {
        let prefix = format!("{}.", prefix.trim_end_matches('.'));
        let values = self
            .values
            .iter()
            .filter_map(|(key, values)| {
                key.strip_prefix(&prefix)
                    .map(|rest| (rest.to_string(), values.clone()))
            })
            .collect();
        ImportConfig { values }
    }

    /// Overlays `other`: its keys replace the ones of `self`.
    pub fn merge(&mut self, other: &ImportConfig) {
        for (key, values) in &other.values {
            self.values.insert(key.clone(), values.clone());
        }
    }

    /// Parses a YAML mapping; nested mappings become dotted keys and
    /// sequences become value lists.
    #[cfg(feature = "yaml-import")]
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let document: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| Error::Import {
            source: "import configuration".into(),
            reason: e.to_string(),
        })?;
        let mut config = Self::new();
        match document {
            serde_yaml::Value::Null => {}
            serde_yaml::Value::Mapping(_) => flatten("", &document, &mut config)?,
            _ => {
                return Err(Error::Import {
                    source: "import configuration".into(),
                    reason: "top level must be a mapping".into(),
                })
            }
        }
        Ok(config)
    }

    #[cfg(feature = "yaml-import")]
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::Import {
            source: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_yaml_str(&text)
    }
}

#[cfg(feature = "yaml-import")]
fn scalar_text(key: &str, value: &serde_yaml::Value) -> Result<String> {
    match value {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        _ => Err(Error::Import {
            source: "import configuration".into(),
            reason: format!("{}: expected a scalar", key),
        }),
    }
}

#[cfg(feature = "yaml-import")]
fn flatten(prefix: &str, value: &serde_yaml::Value, config: &mut ImportConfig) -> Result<()> {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, child) in map {
                let key = scalar_text(prefix, key)?;
                let path = if prefix.is_empty() {
                    key
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(&path, child, config)?;
            }
        }
        serde_yaml::Value::Sequence(items) => {
            config.values.entry(prefix.to_string()).or_default();
            for item in items {
                config.add(prefix, scalar_text(prefix, item)?);
            }
        }
        serde_yaml::Value::Null => {}
        scalar => config.add(prefix, scalar_text(prefix, scalar)?),
    }
    Ok(())
}
