//! DL-safe rules over classes and properties of an ontology.
//!
//! A rule has the form `body -> head`, where both sides are conjunctions of
//! atoms. Variables range over named individuals only, which keeps the rule
//! set decidable when combined with the ontology.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Argument of an atom
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Term {
    /// Rule variable, written `?name`
    Variable(String),
    /// Named individual by identity key
    Individual(String),
}

impl Term {
    /// Variable term
    pub fn var(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// Individual term
    pub fn individual(key: impl Into<String>) -> Self {
        Self::Individual(key.into())
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable(name) => write!(f, "?{name}"),
            Self::Individual(key) => write!(f, "<{key}>"),
        }
    }
}

/// One atom of a rule body or head
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Atom {
    /// `Class(x)`
    Class { class: String, argument: Term },
    /// `property(x, y)` with `y` an individual
    ObjectProperty {
        property: String,
        subject: Term,
        object: Term,
    },
    /// `property(x, v)` with `v` a data value
    DataProperty {
        property: String,
        subject: Term,
        object: Term,
    },
}

impl Atom {
    /// Class atom
    pub fn class(class: impl Into<String>, argument: Term) -> Self {
        Self::Class {
            class: class.into(),
            argument,
        }
    }

    /// Object property atom
    pub fn object(property: impl Into<String>, subject: Term, object: Term) -> Self {
        Self::ObjectProperty {
            property: property.into(),
            subject,
            object,
        }
    }

    /// Data property atom
    pub fn data(property: impl Into<String>, subject: Term, object: Term) -> Self {
        Self::DataProperty {
            property: property.into(),
            subject,
            object,
        }
    }

    fn terms(&self) -> Vec<&Term> {
        match self {
            Self::Class { argument, .. } => vec![argument],
            Self::ObjectProperty { subject, object, .. } | Self::DataProperty { subject, object, .. } => {
                vec![subject, object]
            }
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class { class, argument } => write!(f, "{class}({argument})"),
            Self::ObjectProperty {
                property,
                subject,
                object,
            }
            | Self::DataProperty {
                property,
                subject,
                object,
            } => write!(f, "{property}({subject}, {object})"),
        }
    }
}

/// A named DL-safe rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DlSafeRule {
    pub name: String,
    pub body: Vec<Atom>,
    pub head: Vec<Atom>,
}

impl DlSafeRule {
    /// Create a rule
    pub fn new(name: impl Into<String>, body: Vec<Atom>, head: Vec<Atom>) -> Self {
        Self {
            name: name.into(),
            body,
            head,
        }
    }

    fn atoms(&self) -> impl Iterator<Item = &Atom> {
        self.body.iter().chain(self.head.iter())
    }

    /// Classes named by the rule
    pub fn classes(&self) -> BTreeSet<&str> {
        self.atoms()
            .filter_map(|atom| match atom {
                Atom::Class { class, .. } => Some(class.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Properties named by the rule
    pub fn properties(&self) -> BTreeSet<&str> {
        self.atoms()
            .filter_map(|atom| match atom {
                Atom::ObjectProperty { property, .. } | Atom::DataProperty { property, .. } => {
                    Some(property.as_str())
                }
                Atom::Class { .. } => None,
            })
            .collect()
    }

    /// Individuals named by the rule
    pub fn individuals(&self) -> BTreeSet<&str> {
        self.atoms()
            .flat_map(Atom::terms)
            .filter_map(|term| match term {
                Term::Individual(key) => Some(key.as_str()),
                Term::Variable(_) => None,
            })
            .collect()
    }

    /// Head variables that never occur in the body
    pub fn unbound_variables(&self) -> BTreeSet<&str> {
        let bound: BTreeSet<&str> = self
            .body
            .iter()
            .flat_map(Atom::terms)
            .filter_map(|term| match term {
                Term::Variable(name) => Some(name.as_str()),
                Term::Individual(_) => None,
            })
            .collect();
        self.head
            .iter()
            .flat_map(Atom::terms)
            .filter_map(|term| match term {
                Term::Variable(name) if !bound.contains(name.as_str()) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for DlSafeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |atoms: &[Atom]| {
            atoms
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ^ ")
        };
        write!(f, "{}: {} -> {}", self.name, join(&self.body), join(&self.head))
    }
}
