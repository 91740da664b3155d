//! Document representation
#![allow(clippy::must_use_candidate)] // Builder/constructor API intentionally omits pervasive #[must_use].
#![allow(clippy::return_self_not_must_use)] // Fluent builder methods return Self for ergonomics.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Result;
use crate::node::Element;
use crate::parser::parse_element_tree;

/// A parsed XML document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Root element of the document
    pub root: Element,

    /// Source identifier (file path, URL) if known
    pub source: Option<String>,
}

impl Document {
    /// Create a new document with the given root element
    pub fn new(root: Element) -> Self {
        Self { root, source: None }
    }

    /// Parse a document from raw bytes
    pub fn parse(input: &[u8]) -> Result<Self> {
        let root = parse_element_tree(input)?;
        debug!(root = %root.name, bytes = input.len(), "parsed XML document");
        Ok(Self::new(root))
    }

    /// Parse a document from a string
    pub fn parse_str(input: &str) -> Result<Self> {
        Self::parse(input.as_bytes())
    }

    /// Set the source identifier
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Describe where the document came from, for diagnostics
    pub fn source_name(&self) -> &str {
        self.source.as_deref().unwrap_or("<memory>")
    }
}
