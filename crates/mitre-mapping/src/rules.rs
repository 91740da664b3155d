//! Rule types
//!
//! A rule is pure schema metadata: names, ranges and flags keyed by schema
//! node. It holds nothing from a data document or an ontology, so one rule
//! set serves any number of documents valid against the same schema.
#![allow(clippy::must_use_candidate)] // Accessor API intentionally omits pervasive #[must_use].

use mitre_ontology::{Datatype, Range, Warning};
use mitre_xml::QName;
use mitre_xsd::{Cardinality, NodeId, XsdType};
use serde::Serialize;
use std::collections::BTreeMap;

/// Rule assigned to one schema node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    /// Schema node the rule belongs to
    pub node: NodeId,

    /// OWL name of the construct the rule produces, if any
    pub name: Option<String>,

    /// Occurrence bounds the rule was inferred from
    pub cardinality: Cardinality,

    /// Complex type whose class encloses this node
    pub parent: Option<NodeId>,

    /// What the node becomes
    pub target: RuleTarget,
}

impl Rule {
    /// Class rule, if any
    pub fn class(&self) -> Option<&ClassRule> {
        match &self.target {
            RuleTarget::OwlClass(class) => Some(class),
            _ => None,
        }
    }

    /// Property rule, if any
    pub fn property(&self) -> Option<&PropertyRule> {
        match &self.target {
            RuleTarget::ObjectProperty(property) | RuleTarget::DatatypeProperty(property) => {
                Some(property)
            }
            _ => None,
        }
    }
}

/// Target of a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RuleTarget {
    /// Complex type or nested choice: an OWL class
    OwlClass(ClassRule),
    /// Element or attribute linking to another individual
    ObjectProperty(PropertyRule),
    /// Element or attribute carrying a literal
    DatatypeProperty(PropertyRule),
    /// Enumeration: one named individual per literal
    NamedIndividual(EnumerationRule),
    /// Structural node producing nothing of its own
    Inline,
}

/// Layout of instances of a complex type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClassShape {
    /// Child elements and attributes become properties of an individual
    Structured,
    /// Text content is carried by a synthesized value property
    SimpleContent,
    /// Mixed or wildcard content, kept as an XML literal
    Markup,
    /// Content hoisted into the enclosing individual, no individual of its own
    Wrapper,
}

impl ClassShape {
    /// Check whether instances of the shape become individuals
    pub fn has_individuals(self) -> bool {
        matches!(self, Self::Structured | Self::SimpleContent)
    }
}

/// Branch class of a choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchClass {
    /// Direct child of the choice group
    pub branch: NodeId,
    pub class: String,
}

/// Rule of a complex type or nested choice group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassRule {
    pub class: String,
    pub superclasses: Vec<String>,
    pub is_abstract: bool,
    pub shape: ClassShape,

    /// Attribute holding the declared ID of instances
    pub id_attribute: Option<QName>,

    /// Identity-key prefix of instances with a declared ID
    pub key_prefix: String,

    /// Property carrying the text of simple-content instances
    pub value_property: Option<PropertyRule>,

    /// Branch classes of a choice owned by this class
    pub branches: Vec<BranchClass>,

    pub comment: Option<String>,
}

/// Range of a property rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PropertyRange {
    /// Individuals of a complex type's class, created from the child element
    Class { class: String },
    /// Enumeration individuals, looked up by literal text
    Enumeration { class: String },
    /// Individuals found through the identity-key index
    Reference { many: bool },
    /// Typed literal
    Datatype { datatype: Datatype, source: XsdType },
    /// Inner markup as an `rdf:XMLLiteral`
    Markup,
}

impl PropertyRange {
    /// Ontology range of the property
    pub fn to_range(&self) -> Range {
        match self {
            Self::Class { class } | Self::Enumeration { class } => Range::Class(class.clone()),
            Self::Reference { .. } => Range::Thing,
            Self::Datatype { datatype, .. } => Range::Datatype(*datatype),
            Self::Markup => Range::Datatype(Datatype::XmlLiteral),
        }
    }

    /// Check whether the property links individuals
    pub fn is_object(&self) -> bool {
        matches!(
            self,
            Self::Class { .. } | Self::Enumeration { .. } | Self::Reference { .. }
        )
    }
}

/// Rule of an element or attribute producing a property
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyRule {
    pub property: String,
    /// `None` when the enclosing class is unknown or ambiguous
    pub domain: Option<String>,
    pub range: PropertyRange,
    pub functional: bool,
    pub comment: Option<String>,
}

/// Individual created for one enumeration literal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiteralIndividual {
    pub value: String,
    pub key: String,
    pub comment: Option<String>,
}

/// Rule of an enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumerationRule {
    pub class: String,
    pub literals: Vec<LiteralIndividual>,
}

impl EnumerationRule {
    /// Individual key of a literal
    pub fn key_of(&self, value: &str) -> Option<&str> {
        self.literals
            .iter()
            .find(|l| l.value == value)
            .map(|l| l.key.as_str())
    }
}

/// Rules of a whole schema graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleSet {
    rules: BTreeMap<NodeId, Rule>,
    branch_classes: BTreeMap<NodeId, String>,
    warnings: Vec<Warning>,
}

impl RuleSet {
    pub(crate) fn new(rules: BTreeMap<NodeId, Rule>, warnings: Vec<Warning>) -> Self {
        let mut branch_classes = BTreeMap::new();
        for rule in rules.values() {
            if let Some(class) = rule.class() {
                for branch in &class.branches {
                    branch_classes.insert(branch.branch, branch.class.clone());
                }
            }
        }
        Self {
            rules,
            branch_classes,
            warnings,
        }
    }

    /// Rule of a schema node
    pub fn get(&self, node: NodeId) -> Option<&Rule> {
        self.rules.get(&node)
    }

    /// Rules in node order
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check for an empty rule set
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Class rule of a schema node
    pub fn class_rule(&self, node: NodeId) -> Option<&ClassRule> {
        self.get(node).and_then(Rule::class)
    }

    /// Property rule of a schema node
    pub fn property_rule(&self, node: NodeId) -> Option<&PropertyRule> {
        self.get(node).and_then(Rule::property)
    }

    /// Branch class of a direct child of a choice
    pub fn branch_class(&self, branch: NodeId) -> Option<&str> {
        self.branch_classes.get(&branch).map(String::as_str)
    }

    /// Conflicts found while naming
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// JSON rendering of the rule set
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation fails.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
