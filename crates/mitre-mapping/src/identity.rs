//! Identity keys of individuals
//!
//! An element with a declared ID is keyed `{prefix}-{id}`. Anything else gets
//! a fallback key `{Class}-{hash}`, where the hash is the first 16 hex digits
//! of a SHA-256 digest chosen by the [`IdentityPolicy`].

use mitre_xml::{Cursor, Element, Node};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Fallback hashing scheme for elements without a declared ID
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityPolicy {
    /// Position path plus text content: every occurrence is its own individual
    #[default]
    PathAndContent,

    /// Class plus canonical structure: identical occurrences merge
    Content,
}

impl IdentityPolicy {
    /// Fallback key of the element under a cursor
    #[must_use]
    pub fn fallback_key(self, class: &str, cursor: &Cursor<'_>) -> String {
        let mut hasher = Sha256::new();
        match self {
            Self::PathAndContent => {
                hasher.update(cursor.position_path().as_bytes());
                hasher.update(b"\n");
                hasher.update(cursor.element().text_content().as_bytes());
            }
            Self::Content => {
                hasher.update(class.as_bytes());
                hasher.update(b"\n");
                let mut canonical = String::new();
                canonicalize(cursor.element(), &mut canonical);
                hasher.update(canonical.as_bytes());
            }
        }
        let digest = hasher.finalize();
        format!("{class}-{}", hex::encode(&digest[..8]))
    }
}

/// Key of an element with a declared ID
#[must_use]
pub fn declared_key(prefix: &str, id: &str) -> String {
    format!("{prefix}-{}", id.trim())
}

/// Order-insensitive rendering of attributes, order-preserving for children
fn canonicalize(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.name.to_string());
    let mut attributes: Vec<_> = element
        .attributes
        .iter()
        .map(|a| (a.name.to_string(), a.value.as_str()))
        .collect();
    attributes.sort();
    for (name, value) in attributes {
        out.push(' ');
        out.push_str(&name);
        out.push('=');
        out.push_str(&value.len().to_string());
        out.push(':');
        out.push_str(value);
    }
    out.push('>');
    for node in &element.nodes {
        match node {
            Node::Element(child) => canonicalize(child, out),
            Node::Text(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    out.push_str(&text.len().to_string());
                    out.push(':');
                    out.push_str(text);
                }
            }
        }
    }
    out.push_str("</>");
}
