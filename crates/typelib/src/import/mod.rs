// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 typelib contributors

//! Importers populate a registry from external type descriptions.
//!
//! There is no global importer list: applications build an [`Importers`]
//! table at startup ([`Importers::with_builtins`] covers the formats this
//! crate ships) and register their own importers next to them.
//!
//! # Example
//!
//! ```rust,ignore
//! use typelib::import::{ImportConfig, Importers};
//! use typelib::Registry;
//!
//! let importers = Importers::with_builtins();
//! let mut registry = Registry::standard()?;
//! let mut config = ImportConfig::new();
//! config.add("include", "/usr/share/types");
//! importers.load_file("geometry.yaml", &config, &mut registry)?;
//! ```

mod config;
#[cfg(feature = "yaml-import")]
pub mod yaml;

pub use config::ImportConfig;
#[cfg(feature = "yaml-import")]
pub use yaml::YamlImporter;

use crate::error::{Error, Result};
use crate::registry::Registry;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Configuration key listing directories searched for relative paths.
pub const INCLUDE_KEY: &str = "include";

/// Configuration key listing preprocessor-style symbols. Importers of
/// formats without a preprocessor ignore it.
pub const DEFINE_KEY: &str = "define";

/// Reader of one type-description format.
pub trait Importer {
    /// Name the importer is registered under, e.g. `yaml`.
    fn name(&self) -> &str;

    /// File extensions (without the dot) this importer handles.
    fn extensions(&self) -> &[&str] {
        &[]
    }

    /// Adds the types described by `input` to `registry`.
    fn load(&self, input: &mut dyn Read, config: &ImportConfig, registry: &mut Registry) -> Result<()>;

    /// Opens `path`, looked up in the `include` directories when relative
    /// and not found as is, and calls [`load`](Self::load).
    fn load_file(&self, path: &Path, config: &ImportConfig, registry: &mut Registry) -> Result<()> {
        let resolved = resolve_path(path, config).ok_or_else(|| Error::Import {
            source: path.display().to_string(),
            reason: "file not found".into(),
        })?;
        log::debug!("[import] {} reading {}", self.name(), resolved.display());
        let mut file = File::open(&resolved).map_err(|e| Error::Import {
            source: resolved.display().to_string(),
            reason: e.to_string(),
        })?;
        self.load(&mut file, config, registry)
    }
}

/// Finds `path` as is, or below one of the `include` directories.
pub fn resolve_path(path: &Path, config: &ImportConfig) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    if path.is_absolute() {
        return None;
    }
    config
        .get_all(INCLUDE_KEY)
        .iter()
        .map(|dir| Path::new(dir).join(path))
        .find(|candidate| candidate.is_file())
}

/// Importers by name.
#[derive(Default)]
pub struct Importers {
    table: BTreeMap<String, Box<dyn Importer>>,
}

impl Importers {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding the importers built into this crate.
    pub fn with_builtins() -> Self {
        #[allow(unused_mut)]
        let mut importers = Self::new();
        #[cfg(feature = "yaml-import")]
        importers.register(Box::new(YamlImporter));
        importers
    }

    /// Adds an importer, replacing one registered under the same name.
    pub fn register(&mut self, importer: Box<dyn Importer>) {
        log::debug!("[import] registered importer {}", importer.name());
        self.table.insert(importer.name().to_string(), importer);
    }

    pub fn get(&self, name: &str) -> Result<&dyn Importer> {
        self.table
            .get(name)
            .map(|importer| &**importer)
            .ok_or_else(|| Error::UnknownImporter(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    /// Importer handling the extension of `path`.
    pub fn for_path(&self, path: &Path) -> Result<&dyn Importer> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        self.table
            .values()
            .find(|importer| importer.extensions().contains(&extension))
            .map(|importer| &**importer)
            .ok_or_else(|| Error::UnknownImporter(format!("*.{}", extension)))
    }

    /// Loads a file with the importer matching its extension.
    pub fn load_file(&self, path: impl AsRef<Path>, config: &ImportConfig, registry: &mut Registry) -> Result<()> {
        let path = path.as_ref();
        self.for_path(path)?.load_file(path, config, registry)
    }
}
