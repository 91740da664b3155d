#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # mitre-xsd
//!
//! XSD model reader for the MITRE catalog schemas.
//!
//! A schema document is read into an arena [`SchemaGraph`] in three passes:
//! every top-level component is declared first, bodies are built second, and
//! named references are linked last. References are kept by name and looked
//! up in per-symbol-space tables, so recursive and self-referential types
//! never need to be inlined.

/// Per-complex-type index of element particles, attributes and wildcards.
pub mod content;
/// Schema node model: kinds, cardinalities, type references.
pub mod model;
/// Three-pass schema reader.
pub mod reader;
/// Arena graph and symbol tables.
pub mod registry;

pub use content::{ContentIndex, Particle};
pub use model::{
    Cardinality, Compositor, Derivation, EnumLiteral, MaxOccurs, NodeId, NodeKind, RefTarget,
    SchemaNode, TypeRef, XsdType,
};
pub use reader::{SchemaReader, read_schema};
pub use registry::{ResolvedType, SchemaGraph};

use std::fmt;
use thiserror::Error;

/// XSD symbol spaces, each with its own name table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SymbolSpace {
    Type,
    Element,
    Group,
    AttributeGroup,
    Attribute,
}

impl fmt::Display for SymbolSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Type => "type",
            Self::Element => "element",
            Self::Group => "group",
            Self::AttributeGroup => "attribute group",
            Self::Attribute => "attribute",
        })
    }
}

/// Errors raised while reading a schema. All of them are fatal for the catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("XML error: {0}")]
    Xml(#[from] mitre_xml::Error),

    #[error("Document root is '{found}', expected xs:schema")]
    NotASchema { found: String },

    #[error("Unresolved {space} reference '{name}' at {location}")]
    UnresolvedReference {
        space: SymbolSpace,
        name: String,
        location: String,
    },

    #[error("Cannot classify '{construct}' inside {context} at {location}")]
    Unclassifiable {
        construct: String,
        context: String,
        location: String,
    },

    #[error("Missing attribute '{attribute}' on xs:{construct} at {location}")]
    MissingAttribute {
        construct: String,
        attribute: String,
        location: String,
    },

    #[error("Invalid occurrence bound '{value}' at {location}")]
    InvalidOccurs { value: String, location: String },

    #[error("Duplicate {space} declaration '{name}'")]
    Duplicate { space: SymbolSpace, name: String },
}

impl Error {
    /// Build an unresolved-reference error
    pub fn unresolved(
        space: SymbolSpace,
        name: impl fmt::Display,
        location: impl fmt::Display,
    ) -> Self {
        Self::UnresolvedReference {
            space,
            name: name.to_string(),
            location: location.to_string(),
        }
    }

    /// Build an unclassifiable-construct error
    pub fn unclassifiable(
        construct: impl fmt::Display,
        context: impl Into<String>,
        location: impl fmt::Display,
    ) -> Self {
        Self::Unclassifiable {
            construct: construct.to_string(),
            context: context.into(),
            location: location.to_string(),
        }
    }

    /// Build a missing-attribute error
    pub fn missing_attribute(
        construct: impl Into<String>,
        attribute: impl Into<String>,
        location: impl fmt::Display,
    ) -> Self {
        Self::MissingAttribute {
            construct: construct.into(),
            attribute: attribute.into(),
            location: location.to_string(),
        }
    }
}

/// Crate-local result type for schema reading.
pub type Result<T> = std::result::Result<T, Error>;
