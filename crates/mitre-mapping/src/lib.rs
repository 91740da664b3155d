#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # mitre-mapping
//!
//! Rule inference and instance translation.
//!
//! [`infer_rules`] walks a [`mitre_xsd::SchemaGraph`] once and assigns one
//! [`Rule`] to every schema node. [`materialize`] turns a rule set into the
//! classes, properties and enumeration individuals of an ontology, and
//! [`Translator`] replays the rules against a data document, creating and
//! merging individuals by identity key.
//!
//! ```ignore
//! let rules = infer_rules(&graph, &profile)?;
//! let mut ontology = Ontology::new(iri);
//! materialize(&rules, &mut ontology)?;
//! let stats = Translator::new(&graph, &rules, &profile).translate(&document, &mut ontology)?;
//! ```

/// Choice-group policy.
pub mod choice;
/// Identity keys of individuals.
pub mod identity;
/// Rule inference over a schema graph.
pub mod inference;
/// Text to typed literal conversion.
pub mod literal;
/// Rule set to ontology schema.
pub mod materialize;
/// OWL naming policy.
pub mod naming;
/// Per-catalog translation knobs.
pub mod profile;
/// Rule types.
pub mod rules;
/// XML instance translator.
pub mod translator;

pub use choice::ChoicePolicy;
pub use identity::IdentityPolicy;
pub use inference::infer_rules;
pub use materialize::materialize;
pub use naming::{NamingPolicy, slugify};
pub use profile::TranslationProfile;
pub use rules::{
    BranchClass, ClassRule, ClassShape, EnumerationRule, LiteralIndividual, PropertyRange,
    PropertyRule, Rule, RuleSet, RuleTarget,
};
pub use translator::{TranslationStats, Translator};

use mitre_ontology::{Warning, WarningCode};
use thiserror::Error;

/// Errors raised while inferring rules or translating a document
///
/// `Schema` and `Ontology` are fatal for the catalog. The other variants are
/// recoverable: they are turned into warnings on the ontology and never
/// returned upward.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Schema error: {0}")]
    Schema(#[from] mitre_xsd::Error),

    #[error("Ontology error: {0}")]
    Ontology(#[from] mitre_ontology::Error),

    #[error("Name '{name}' of {node} is already taken by {holder}")]
    RuleConflict {
        name: String,
        node: String,
        holder: String,
    },

    #[error("Element {element} is not declared by the schema")]
    UnknownElement { element: String },

    #[error("Attribute {attribute} is not declared for {element}")]
    UnknownAttribute { attribute: String, element: String },

    #[error("No individual with ID '{id}' for property '{property}'")]
    DanglingReference { id: String, property: String },

    #[error("Invalid {datatype} literal '{text}'")]
    InvalidLiteral { text: String, datatype: String },

    #[error("No rule for {node}")]
    NoRule { node: String },
}

impl Error {
    /// Build a rule conflict error
    pub fn rule_conflict(
        name: impl Into<String>,
        node: impl Into<String>,
        holder: impl Into<String>,
    ) -> Self {
        Self::RuleConflict {
            name: name.into(),
            node: node.into(),
            holder: holder.into(),
        }
    }

    /// Build an invalid literal error
    pub fn invalid_literal(text: impl Into<String>, datatype: impl std::fmt::Display) -> Self {
        Self::InvalidLiteral {
            text: text.into(),
            datatype: datatype.to_string(),
        }
    }

    /// Warning code of a recoverable error, `None` for fatal ones
    #[must_use]
    pub fn warning_code(&self) -> Option<WarningCode> {
        match self {
            Self::Schema(_) | Self::Ontology(_) => None,
            Self::RuleConflict { .. } => Some(WarningCode::RuleConflict),
            Self::UnknownElement { .. } => Some(WarningCode::UnknownElement),
            Self::UnknownAttribute { .. } => Some(WarningCode::UnknownAttribute),
            Self::DanglingReference { .. } => Some(WarningCode::DanglingReference),
            Self::InvalidLiteral { .. } => Some(WarningCode::InvalidLiteral),
            Self::NoRule { .. } => Some(WarningCode::NoRule),
        }
    }

    /// Downgrade a recoverable error to a warning at a location
    ///
    /// # Errors
    ///
    /// Returns the error itself when it is fatal.
    pub fn into_warning(self, location: impl Into<String>) -> Result<Warning> {
        match self.warning_code() {
            Some(code) => Ok(Warning::new(code, self.to_string()).at(location)),
            None => Err(self),
        }
    }
}

/// Crate-local result type for mapping operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors_become_warnings() {
        let warning = Error::DanglingReference {
            id: "707".into(),
            property: "hasCWEID".into(),
        }
        .into_warning("/Weakness_Catalog[1]")
        .unwrap();
        assert_eq!(warning.code, WarningCode::DanglingReference);
        assert_eq!(warning.location.as_deref(), Some("/Weakness_Catalog[1]"));
        assert!(warning.message.contains("707"));
    }

    #[test]
    fn test_fatal_errors_stay_errors() {
        let error = Error::from(mitre_ontology::Error::UnknownClass("Weakness".into()));
        assert!(error.warning_code().is_none());
        assert!(error.into_warning("here").is_err());
    }
}
