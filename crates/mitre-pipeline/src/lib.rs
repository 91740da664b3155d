#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # mitre-pipeline
//!
//! Per-catalog orchestration, configuration and warning policies.
//!
//! A [`CatalogPipeline`] takes the raw bytes of one catalog's schema and
//! data, and runs the whole chain: XML parsing, schema reading, rule
//! inference, materialization and translation. A fatal error only fails the
//! catalog it happened in; [`run_many`] keeps going with the others and
//! collects every outcome into a [`PipelineReport`].

pub mod catalog;
pub mod config;
pub mod pipeline;
pub mod policies;

pub use catalog::Catalog;
pub use config::{CatalogConfig, Config, OutputFormat};
pub use pipeline::{
    CatalogJob, CatalogOutcome, CatalogPipeline, CatalogReport, CatalogStatus, CompiledSchema,
    PipelineReport, run_many,
};
pub use policies::WarningPolicy;

use thiserror::Error;

/// Errors that fail a catalog run
#[derive(Error, Debug)]
pub enum Error {
    #[error("Schema error for {catalog}: {source}")]
    Schema {
        catalog: Catalog,
        #[source]
        source: mitre_xsd::Error,
    },

    #[error("XML error for {catalog} in '{document}': {source}")]
    Xml {
        catalog: Catalog,
        document: String,
        #[source]
        source: mitre_xml::Error,
    },

    #[error("Mapping error for {catalog}: {source}")]
    Mapping {
        catalog: Catalog,
        #[source]
        source: mitre_mapping::Error,
    },

    #[error("Configuration error in '{path}': {message}")]
    Config { path: String, message: String },

    #[error("Policy error for {catalog}: {message}")]
    Policy { catalog: Catalog, message: String },

    #[error("IO error during {operation} for '{path}': {message}")]
    Io {
        operation: String,
        path: String,
        message: String,
    },
}

impl Error {
    pub fn schema(catalog: Catalog, source: mitre_xsd::Error) -> Self {
        Self::Schema { catalog, source }
    }

    pub fn xml(catalog: Catalog, document: impl Into<String>, source: mitre_xml::Error) -> Self {
        Self::Xml {
            catalog,
            document: document.into(),
            source,
        }
    }

    /// Wrap a mapping error; ontology errors travel inside it
    pub fn mapping(catalog: Catalog, source: impl Into<mitre_mapping::Error>) -> Self {
        Self::Mapping {
            catalog,
            source: source.into(),
        }
    }

    /// Create a configuration error for a file
    pub fn config(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn policy(catalog: Catalog, message: impl Into<String>) -> Self {
        Self::Policy {
            catalog,
            message: message.into(),
        }
    }

    /// Create a structured I/O error with operation/path context.
    pub fn io(
        operation: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Catalog the error belongs to, if any
    #[must_use]
    pub fn catalog(&self) -> Option<Catalog> {
        match self {
            Self::Schema { catalog, .. }
            | Self::Xml { catalog, .. }
            | Self::Mapping { catalog, .. }
            | Self::Policy { catalog, .. } => Some(*catalog),
            Self::Config { .. } | Self::Io { .. } => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("io", "<unknown>", e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
