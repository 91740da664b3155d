#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # mitre-ontology
//!
//! Mutable OWL ontology model: classes, object and datatype properties,
//! individuals, their asserted values, DL-safe rules, and the warnings
//! collected while the ontology was built.
//!
//! Every mutation is an idempotent "ensure": calling it again with the same
//! arguments returns the existing entity. Individuals are keyed by a stable
//! identity key, which is the deduplication contract of the translator.

/// Ontology container and ensure operations.
pub mod model;
/// OWL/XML (`.owx`) writer.
pub mod owx;
/// DL-safe (SWRL) rules.
pub mod rules;
/// Literal values and datatypes.
pub mod value;
/// Recoverable conditions collected during a run.
pub mod warning;

pub use model::{
    AssertOutcome, Ontology, OntologyClass, OntologyIndividual, OntologyProperty, PropertyKind,
    Range, Triple,
};
pub use owx::{to_owx, write_owx};
pub use rules::{Atom, DlSafeRule, Term};
pub use value::{Datatype, Literal, Value};
pub use warning::{Warning, WarningCode};

use thiserror::Error;

/// Errors raised by misuse of the ontology model or while serialising it
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown class '{0}'")]
    UnknownClass(String),

    #[error("Unknown property '{0}'")]
    UnknownProperty(String),

    #[error("Unknown individual '{0}'")]
    UnknownIndividual(String),

    #[error("Property '{name}' already declared with {existing}, requested {requested}")]
    PropertyConflict {
        name: String,
        existing: String,
        requested: String,
    },

    #[error("Property '{property}' expects {expected} values")]
    KindMismatch { property: String, expected: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OWL/XML write error: {0}")]
    Xml(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a property conflict error
    pub fn property_conflict(
        name: impl Into<String>,
        existing: impl std::fmt::Display,
        requested: impl std::fmt::Display,
    ) -> Self {
        Self::PropertyConflict {
            name: name.into(),
            existing: existing.to_string(),
            requested: requested.to_string(),
        }
    }
}

/// Crate-local result type for ontology operations.
pub type Result<T> = std::result::Result<T, Error>;
