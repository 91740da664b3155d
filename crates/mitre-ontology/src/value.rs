//! Literal values and datatypes
#![allow(clippy::must_use_candidate)] // Accessor API intentionally omits pervasive #[must_use].

use serde::{Deserialize, Serialize};
use std::fmt;

const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

/// Datatype of a literal or of a datatype property range
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Datatype {
    String,
    Integer,
    Decimal,
    Double,
    Boolean,
    Date,
    DateTime,
    Time,
    AnyUri,
    XmlLiteral,
}

impl Datatype {
    /// Full datatype IRI
    pub fn iri(self) -> String {
        match self {
            Self::XmlLiteral => format!("{RDF}XMLLiteral"),
            other => format!("{XSD}{}", other.xsd_local()),
        }
    }

    fn xsd_local(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "dateTime",
            Self::Time => "time",
            Self::AnyUri => "anyURI",
            Self::XmlLiteral => "XMLLiteral",
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::XmlLiteral => f.write_str("rdf:XMLLiteral"),
            other => write!(f, "xsd:{}", other.xsd_local()),
        }
    }
}

/// A typed literal in canonical lexical form
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Literal {
    pub lexical: String,
    pub datatype: Datatype,
}

impl Literal {
    /// Create a literal
    pub fn new(lexical: impl Into<String>, datatype: Datatype) -> Self {
        Self {
            lexical: lexical.into(),
            datatype,
        }
    }

    /// Create an `xsd:string` literal
    pub fn string(lexical: impl Into<String>) -> Self {
        Self::new(lexical, Datatype::String)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"^^{}", self.lexical, self.datatype)
    }
}

/// Object of an assertion: a literal or another individual's identity key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    Literal(Literal),
    Individual(String),
}

impl Value {
    /// Individual value by identity key
    pub fn individual(key: impl Into<String>) -> Self {
        Self::Individual(key.into())
    }

    /// Check for a literal
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(literal) => literal.fmt(f),
            Self::Individual(key) => write!(f, "<{key}>"),
        }
    }
}
