//! Per-catalog translation knobs
#![allow(clippy::must_use_candidate)] // Accessor API intentionally omits pervasive #[must_use].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::choice::ChoicePolicy;
use crate::identity::IdentityPolicy;
use crate::naming::NamingPolicy;

/// Catalog-specific adjustments to the generic schema mapping
///
/// Every field has a default, so a YAML override only lists what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationProfile {
    /// Attribute local names holding a declared ID, besides `xs:ID` attributes
    pub id_attributes: Vec<String>,

    /// Attribute local names holding ID references, besides `xs:IDREF(S)`
    pub reference_attributes: Vec<String>,

    /// Attribute or child local names giving an individual its label
    pub label_attributes: Vec<String>,

    /// Class name to identity-key prefix, e.g. `Weakness: CWE`
    pub key_prefixes: BTreeMap<String, String>,

    /// Element or type local name to replacement name
    pub name_overrides: BTreeMap<String, String>,

    /// Complex-type local names whose content is hoisted into the parent
    pub transparent_types: Vec<String>,

    /// Prepended to property names
    pub property_prefix: String,

    /// Dropped from the end of named type names
    pub strip_type_suffix: Option<String>,

    /// Hoist types with a single child element and no attributes
    pub flatten_wrappers: bool,

    /// Fallback identity-key scheme
    pub identity: IdentityPolicy,

    /// Representation of choice groups
    pub choice: ChoicePolicy,
}

impl Default for TranslationProfile {
    fn default() -> Self {
        Self {
            id_attributes: Vec::new(),
            reference_attributes: Vec::new(),
            label_attributes: Vec::new(),
            key_prefixes: BTreeMap::new(),
            name_overrides: BTreeMap::new(),
            transparent_types: Vec::new(),
            property_prefix: String::new(),
            strip_type_suffix: Some("Type".to_string()),
            flatten_wrappers: true,
            identity: IdentityPolicy::default(),
            choice: ChoicePolicy::default(),
        }
    }
}

impl TranslationProfile {
    /// Naming policy derived from this profile
    pub fn naming(&self) -> NamingPolicy {
        NamingPolicy {
            property_prefix: self.property_prefix.clone(),
            strip_type_suffix: self.strip_type_suffix.clone(),
            overrides: self.name_overrides.clone(),
        }
    }

    /// Check whether a named type is hoisted into its parent
    pub fn is_transparent(&self, type_local: &str) -> bool {
        self.transparent_types.iter().any(|t| t == type_local)
    }

    /// Check whether an attribute carries a declared ID
    pub fn is_id_attribute(&self, local: &str) -> bool {
        self.id_attributes.iter().any(|a| a == local)
    }

    /// Check whether an attribute carries an ID reference
    pub fn is_reference_attribute(&self, local: &str) -> bool {
        self.reference_attributes.iter().any(|a| a == local)
    }

    /// Identity-key prefix of a class
    pub fn key_prefix<'a>(&'a self, class: &'a str) -> &'a str {
        self.key_prefixes.get(class).map_or(class, String::as_str)
    }
}
