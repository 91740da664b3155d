//! Namespace scopes for resolving prefixed names that appear inside values
//!
//! XSD uses QNames as attribute *values* (`type="xs:string"`,
//! `base="cwe:WeaknessType"`). The parser resolves element and attribute
//! names itself, but values have to be resolved against the declarations in
//! scope where they appear.

use crate::node::{Element, QName};
use crate::{Error, Result, XML_NAMESPACE};

/// A stack of namespace declarations
#[derive(Debug, Clone, Default)]
pub struct NamespaceScope {
    frames: Vec<Vec<(Option<String>, String)>>,
}

impl NamespaceScope {
    /// Create an empty scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter an element, bringing its declarations into scope
    pub fn push(&mut self, element: &Element) {
        self.frames.push(element.namespaces.clone());
    }

    /// Leave the innermost element
    pub fn pop(&mut self) {
        self.frames.pop();
    }

    /// Look up the namespace bound to a prefix (`None` = default namespace)
    pub fn lookup(&self, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE);
        }
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter())
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.as_str())
            .filter(|uri| !uri.is_empty())
    }

    /// Resolve a `prefix:local` value; unprefixed values take the default namespace
    pub fn resolve(&self, value: &str) -> Result<QName> {
        let value = value.trim();
        match value.split_once(':') {
            Some((prefix, local)) => {
                let namespace = self.lookup(Some(prefix)).ok_or_else(|| Error::UnknownPrefix {
                    prefix: prefix.to_string(),
                    value: value.to_string(),
                })?;
                Ok(QName::qualified(namespace, local))
            }
            None => Ok(QName::new(self.lookup(None), value)),
        }
    }
}
