#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # mitre-xml
//!
//! Namespace-aware XML tree structures, parser and path cursor.
//!
//! Both sides of the translation work on this tree: the XSD reader walks a
//! parsed schema document, and the instance translator walks a parsed data
//! document. The parser is the only place that touches raw bytes.

/// Document container and parse entry points.
pub mod document;
/// Source positions and the byte-offset to line/column index.
pub mod metadata;
/// In-scope namespace bindings for resolving prefixed names inside values.
pub mod namespace;
/// Core tree node model.
pub mod node;
/// Streaming parser building the tree from `quick-xml` events.
pub mod parser;
/// Cursor with position paths.
pub mod traversal;

/// Primary document type.
pub use document::Document;
/// Position metadata.
pub use metadata::{LineIndex, Position};
/// Namespace scope for prefixed value resolution.
pub use namespace::NamespaceScope;
/// Node primitives.
pub use node::{Attribute, Element, Node, QName};
/// Path cursor.
pub use traversal::Cursor;

use thiserror::Error;

/// Namespace bound to the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
/// Namespace reserved for `xmlns` declarations.
pub const XMLNS_NAMESPACE_URI: &str = "http://www.w3.org/2000/xmlns/";
/// Namespace of XSD components.
pub const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
/// Namespace of XSD instance attributes (`xsi:type`, `xsi:schemaLocation`, ...).
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
/// Namespace of XHTML markup embedded in structured text.
pub const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Errors that can occur when reading XML or serialising markup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("XML syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Unknown namespace prefix '{prefix}' in '{value}'")]
    UnknownPrefix { prefix: String, value: String },

    #[error("Document has no root element")]
    NoRoot,

    #[error("Markup serialization failed: {0}")]
    Write(String),
}

impl Error {
    /// Build a syntax error at a resolved source position.
    pub fn syntax(position: Position, message: impl Into<String>) -> Self {
        Self::Syntax {
            line: position.line,
            column: position.column,
            message: message.into(),
        }
    }
}

/// Crate-local result type for XML operations.
pub type Result<T> = std::result::Result<T, Error>;
