//! Recoverable conditions collected while building an ontology
//!
//! A warning never stops a run; the affected node, element or assertion is
//! skipped and the rest of the catalog is still translated.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningCode {
    /// Two schema nodes want the same OWL name; the later one got no rule
    RuleConflict,
    /// Data element absent from the schema; its subtree was skipped
    UnknownElement,
    /// Data attribute absent from the schema; it was skipped
    UnknownAttribute,
    /// Reference to an ID nobody declared; the assertion was skipped
    DanglingReference,
    /// Functional property overwritten with a different value
    ModelInvariant,
    /// Text not valid for its datatype; the assertion was skipped
    InvalidLiteral,
    /// The same raw ID declared by two different individuals
    DuplicateId,
    /// Schema node without a rule reached during translation
    NoRule,
}

impl WarningCode {
    /// All codes, in summary order
    pub const ALL: [WarningCode; 8] = [
        Self::RuleConflict,
        Self::UnknownElement,
        Self::UnknownAttribute,
        Self::DanglingReference,
        Self::ModelInvariant,
        Self::InvalidLiteral,
        Self::DuplicateId,
        Self::NoRule,
    ];

    /// Stable short name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RuleConflict => "rule-conflict",
            Self::UnknownElement => "unknown-element",
            Self::UnknownAttribute => "unknown-attribute",
            Self::DanglingReference => "dangling-reference",
            Self::ModelInvariant => "model-invariant",
            Self::InvalidLiteral => "invalid-literal",
            Self::DuplicateId => "duplicate-id",
            Self::NoRule => "no-rule",
        }
    }
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recoverable condition with optional location context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub code: WarningCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Warning {
    /// Create a warning without location
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            location: None,
        }
    }

    /// Attach a location (schema position or data path)
    #[must_use]
    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(location) = &self.location {
            write!(f, " at {location}")?;
        }
        Ok(())
    }
}
