// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 typelib contributors

//! Error type shared by the registry, the compilers and the value engine.
//!
//! Structural problems (unknown names, types that cannot be laid out or
//! byte-swapped) are reported here, before any byte of a value is touched.
//! Buffer-size mistakes on the raw value API are contract violations and
//! panic instead.

use crate::types::Category;
use std::fmt;
use std::io;

/// Errors produced by typelib.
#[derive(Debug)]
pub enum Error {
    /// No type of that name is known to the registry.
    UndefinedType(String),
    /// The compound has no field of that name.
    FieldNotFound {
        /// Compound type name.
        type_name: String,
        /// Requested field name.
        field: String,
    },
    /// A type of that name already exists.
    AlreadyDefined(String),
    /// A type of that name exists with a different definition (merge).
    DefinitionMismatch(String),
    /// The string is not a valid type name.
    BadTypename(String),
    /// The string is not a valid namespace.
    BadNamespace(String),
    /// The definition violates a model invariant (field out of bounds,
    /// duplicate symbol, zero-size container element, ...).
    InvalidDefinition {
        /// Name of the type being defined.
        type_name: String,
        /// What is wrong with it.
        reason: String,
    },
    /// A visitor reached a category it does not handle.
    UnsupportedCategory {
        /// Type name.
        type_name: String,
        /// Category of that type.
        category: Category,
    },
    /// The type cannot be reduced to a memcpy/container program.
    NoLayout {
        /// Type name.
        type_name: String,
        /// Why no layout exists.
        reason: String,
    },
    /// The endian-swap compiler cannot handle this type.
    UnsupportedSwap {
        /// Type name.
        type_name: String,
        /// Why it cannot be swapped.
        reason: String,
    },
    /// A raw buffer was interpreted as a native type of the wrong shape.
    BadCast {
        /// Type name of the value.
        type_name: String,
        /// Requested native representation.
        requested: String,
    },
    /// A byte buffer does not have the size of the type.
    SizeMismatch {
        /// Expected byte count.
        expected: usize,
        /// Actual byte count.
        actual: usize,
    },
    /// No container kind of that name is registered.
    UnknownContainer(String),
    /// No importer of that name is registered.
    UnknownImporter(String),
    /// An importer rejected its input.
    Import {
        /// Source being imported (path or entry name).
        source: String,
        /// Importer message.
        reason: String,
    },
    /// I/O failure from a dump/load stream.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UndefinedType(name) => write!(f, "undefined type: {}", name),
            Self::FieldNotFound { type_name, field } => {
                write!(f, "no field '{}' in {}", field, type_name)
            }
            Self::AlreadyDefined(name) => write!(f, "type already defined: {}", name),
            Self::DefinitionMismatch(name) => {
                write!(f, "conflicting definitions for {}", name)
            }
            Self::BadTypename(name) => write!(f, "invalid type name: '{}'", name),
            Self::BadNamespace(ns) => write!(f, "invalid namespace: '{}'", ns),
            Self::InvalidDefinition { type_name, reason } => {
                write!(f, "invalid definition of {}: {}", type_name, reason)
            }
            Self::UnsupportedCategory {
                type_name,
                category,
            } => write!(f, "{} types are not supported here ({})", category, type_name),
            Self::NoLayout { type_name, reason } => {
                write!(f, "no memory layout for {}: {}", type_name, reason)
            }
            Self::UnsupportedSwap { type_name, reason } => {
                write!(f, "cannot byte-swap {}: {}", type_name, reason)
            }
            Self::BadCast {
                type_name,
                requested,
            } => write!(f, "cannot access {} as {}", type_name, requested),
            Self::SizeMismatch { expected, actual } => {
                write!(f, "size mismatch: expected {} bytes, got {}", expected, actual)
            }
            Self::UnknownContainer(name) => write!(f, "unknown container kind: {}", name),
            Self::UnknownImporter(name) => write!(f, "unknown importer: {}", name),
            Self::Import { source, reason } => write!(f, "import of {} failed: {}", source, reason),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_variants() {
        let cases = [
            (
                Error::UndefinedType("/foo".into()),
                "undefined type: /foo",
            ),
            (
                Error::FieldNotFound {
                    type_name: "/Point".into(),
                    field: "z".into(),
                },
                "no field 'z' in /Point",
            ),
            (
                Error::SizeMismatch {
                    expected: 4,
                    actual: 2,
                },
                "size mismatch: expected 4 bytes, got 2",
            ),
            (
                Error::UnsupportedCategory {
                    type_name: "/int*".into(),
                    category: Category::Pointer,
                },
                "pointer types are not supported here (/int*)",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion_keeps_source() {
        let err: Error = io::Error::new(io::ErrorKind::UnexpectedEof, "short read").into();
        assert!(matches!(err, Error::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
