//! Ontology container and ensure operations
#![allow(clippy::must_use_candidate)] // Accessor API intentionally omits pervasive #[must_use].

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, warn};

use crate::rules::DlSafeRule;
use crate::value::{Datatype, Value};
use crate::warning::{Warning, WarningCode};
use crate::{Error, Result};

/// An OWL class
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OntologyClass {
    pub name: String,
    pub superclasses: BTreeSet<String>,
    pub is_abstract: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Object or datatype property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Object,
    Datatype,
}

/// Range of a property
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Range {
    Class(String),
    /// Any individual (`owl:Thing`), for links whose target class is unknown
    Thing,
    Datatype(Datatype),
}

impl Range {
    /// Kind of property this range belongs to
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Class(_) | Self::Thing => PropertyKind::Object,
            Self::Datatype(_) => PropertyKind::Datatype,
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(class) => write!(f, "class {class}"),
            Self::Thing => f.write_str("owl:Thing"),
            Self::Datatype(datatype) => write!(f, "datatype {datatype}"),
        }
    }
}

/// An object or datatype property
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OntologyProperty {
    pub name: String,
    /// `None` once two different domains were requested (the domain is `owl:Thing`)
    pub domain: Option<String>,
    pub range: Range,
    pub functional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl OntologyProperty {
    /// Object or datatype
    pub fn kind(&self) -> PropertyKind {
        self.range.kind()
    }
}

/// An individual and its asserted values
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OntologyIndividual {
    pub key: String,
    pub classes: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Property name to values, in assertion order
    pub values: BTreeMap<String, Vec<Value>>,
}

impl OntologyIndividual {
    /// Values asserted for a property
    pub fn values_of(&self, property: &str) -> &[Value] {
        self.values.get(property).map_or(&[], Vec::as_slice)
    }
}

/// One asserted property value, flattened
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: Value,
}

/// Result of an assertion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertOutcome {
    /// A new value was recorded
    Added,
    /// The value was already present
    Unchanged,
    /// A functional property's previous value was replaced
    Overwritten,
}

/// The ontology of one catalog run
#[derive(Debug, Clone, Default, Serialize)]
pub struct Ontology {
    iri: String,
    classes: BTreeMap<String, OntologyClass>,
    properties: BTreeMap<String, OntologyProperty>,
    individuals: BTreeMap<String, OntologyIndividual>,
    /// Raw declared IDs to identity keys
    id_index: BTreeMap<String, String>,
    rules: Vec<DlSafeRule>,
    warnings: Vec<Warning>,
}

impl Ontology {
    /// Create an empty ontology
    pub fn new(iri: impl Into<String>) -> Self {
        Self {
            iri: iri.into(),
            ..Self::default()
        }
    }

    /// Ontology IRI
    pub fn iri(&self) -> &str {
        &self.iri
    }

    /// Create a class if absent and add superclasses to it
    pub fn ensure_class<I, S>(&mut self, name: &str, superclasses: I) -> &mut OntologyClass
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let class = self
            .classes
            .entry(name.to_string())
            .or_insert_with(|| OntologyClass {
                name: name.to_string(),
                superclasses: BTreeSet::new(),
                is_abstract: false,
                comment: None,
            });
        for superclass in superclasses {
            let superclass = superclass.into();
            if superclass != name {
                class.superclasses.insert(superclass);
            }
        }
        class
    }

    /// Create a property if absent
    ///
    /// Requesting an existing name with the same range returns it. A different
    /// domain widens the domain to `owl:Thing`; the property stays functional
    /// only if every request was functional. A different range is a conflict.
    pub fn ensure_property(
        &mut self,
        name: &str,
        domain: Option<&str>,
        range: Range,
        functional: bool,
    ) -> Result<&mut OntologyProperty> {
        if let Some(existing) = self.properties.get(name) {
            if existing.range != range {
                return Err(Error::property_conflict(name, &existing.range, &range));
            }
        }
        let property = self
            .properties
            .entry(name.to_string())
            .and_modify(|p| {
                if p.domain.as_deref() != domain {
                    p.domain = None;
                }
                p.functional &= functional;
            })
            .or_insert_with(|| OntologyProperty {
                name: name.to_string(),
                domain: domain.map(str::to_string),
                range,
                functional,
                comment: None,
            });
        Ok(property)
    }

    /// Create an individual if absent and add it to a class
    pub fn ensure_individual(&mut self, key: &str, class: &str) -> Result<&mut OntologyIndividual> {
        if !self.classes.contains_key(class) {
            return Err(Error::UnknownClass(class.to_string()));
        }
        let individual = self
            .individuals
            .entry(key.to_string())
            .or_insert_with(|| OntologyIndividual {
                key: key.to_string(),
                classes: BTreeSet::new(),
                label: None,
                comment: None,
                values: BTreeMap::new(),
            });
        individual.classes.insert(class.to_string());
        Ok(individual)
    }

    /// Assert a property value on an individual
    ///
    /// Non-functional properties collect distinct values in assertion order.
    /// A functional property keeps the last value; replacing a different value
    /// records a model-invariant warning.
    pub fn assert_value(&mut self, key: &str, property: &str, value: Value) -> Result<AssertOutcome> {
        let definition = self
            .properties
            .get(property)
            .ok_or_else(|| Error::UnknownProperty(property.to_string()))?;
        let expected = definition.kind();
        let functional = definition.functional;
        match (&value, expected) {
            (Value::Literal(_), PropertyKind::Datatype) => {}
            (Value::Individual(target), PropertyKind::Object) => {
                if !self.individuals.contains_key(target) {
                    return Err(Error::UnknownIndividual(target.clone()));
                }
            }
            (_, PropertyKind::Object) => {
                return Err(Error::KindMismatch {
                    property: property.to_string(),
                    expected: "individual".to_string(),
                });
            }
            (_, PropertyKind::Datatype) => {
                return Err(Error::KindMismatch {
                    property: property.to_string(),
                    expected: "literal".to_string(),
                });
            }
        }

        let individual = self
            .individuals
            .get_mut(key)
            .ok_or_else(|| Error::UnknownIndividual(key.to_string()))?;
        let values = individual.values.entry(property.to_string()).or_default();

        if values.contains(&value) {
            return Ok(AssertOutcome::Unchanged);
        }
        if functional && !values.is_empty() {
            let previous = std::mem::replace(values, vec![value.clone()]);
            let message = format!(
                "functional property '{property}' of '{key}' changed from {} to {value}",
                previous.first().map_or_else(String::new, ToString::to_string)
            );
            warn!(%message, "functional property overwritten");
            self.warnings
                .push(Warning::new(WarningCode::ModelInvariant, message).at(key.to_string()));
            return Ok(AssertOutcome::Overwritten);
        }
        values.push(value);
        Ok(AssertOutcome::Added)
    }

    /// Set the `rdfs:label` of an individual if it has none yet
    pub fn label_individual(&mut self, key: &str, label: &str) -> Result<()> {
        let individual = self
            .individuals
            .get_mut(key)
            .ok_or_else(|| Error::UnknownIndividual(key.to_string()))?;
        if individual.label.is_none() {
            individual.label = Some(label.to_string());
        }
        Ok(())
    }

    /// Register a raw declared ID for an identity key
    ///
    /// Returns the key that already owns the ID when it differs.
    pub fn register_id(&mut self, raw_id: &str, key: &str) -> Option<String> {
        match self.id_index.get(raw_id) {
            Some(existing) if existing != key => Some(existing.clone()),
            Some(_) => None,
            None => {
                self.id_index.insert(raw_id.to_string(), key.to_string());
                None
            }
        }
    }

    /// Identity key registered for a raw ID
    pub fn lookup_id(&self, raw_id: &str) -> Option<&str> {
        self.id_index.get(raw_id).map(String::as_str)
    }

    /// Add a DL-safe rule if every class, property and individual it names exists
    pub fn add_rule(&mut self, rule: DlSafeRule) -> Result<()> {
        for class in rule.classes() {
            if !self.classes.contains_key(class) {
                return Err(Error::UnknownClass(class.to_string()));
            }
        }
        for property in rule.properties() {
            if !self.properties.contains_key(property) {
                return Err(Error::UnknownProperty(property.to_string()));
            }
        }
        for individual in rule.individuals() {
            if !self.individuals.contains_key(individual) {
                return Err(Error::UnknownIndividual(individual.to_string()));
            }
        }
        if !self.rules.iter().any(|r| r.name == rule.name) {
            debug!(rule = %rule.name, "added rule");
            self.rules.push(rule);
        }
        Ok(())
    }

    /// Record a warning
    pub fn warn(&mut self, warning: Warning) {
        warn!(code = %warning.code, location = warning.location.as_deref().unwrap_or(""), "{}", warning.message);
        self.warnings.push(warning);
    }

    /// Warnings in the order they were recorded
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Number of warnings per code, only codes that occurred
    pub fn warning_summary(&self) -> BTreeMap<WarningCode, usize> {
        let mut summary = BTreeMap::new();
        for warning in &self.warnings {
            *summary.entry(warning.code).or_insert(0) += 1;
        }
        summary
    }

    /// Look up a class
    pub fn class(&self, name: &str) -> Option<&OntologyClass> {
        self.classes.get(name)
    }

    /// Mutable class access
    pub fn class_mut(&mut self, name: &str) -> Option<&mut OntologyClass> {
        self.classes.get_mut(name)
    }

    /// Look up a property
    pub fn property(&self, name: &str) -> Option<&OntologyProperty> {
        self.properties.get(name)
    }

    /// Mutable property access
    pub fn property_mut(&mut self, name: &str) -> Option<&mut OntologyProperty> {
        self.properties.get_mut(name)
    }

    /// Look up an individual by identity key
    pub fn individual(&self, key: &str) -> Option<&OntologyIndividual> {
        self.individuals.get(key)
    }

    /// Classes sorted by name
    pub fn classes(&self) -> impl Iterator<Item = &OntologyClass> {
        self.classes.values()
    }

    /// Properties sorted by name
    pub fn properties(&self) -> impl Iterator<Item = &OntologyProperty> {
        self.properties.values()
    }

    /// Individuals sorted by identity key
    pub fn individuals(&self) -> impl Iterator<Item = &OntologyIndividual> {
        self.individuals.values()
    }

    /// Individuals that are members of a class
    pub fn individuals_of<'a>(&'a self, class: &'a str) -> impl Iterator<Item = &'a OntologyIndividual> {
        self.individuals.values().filter(move |i| i.classes.contains(class))
    }

    /// Rules in insertion order
    pub fn rules(&self) -> &[DlSafeRule] {
        &self.rules
    }

    /// All asserted values as triples, sorted by subject then predicate
    pub fn triples(&self) -> Vec<Triple> {
        let mut triples = Vec::new();
        for individual in self.individuals.values() {
            for (property, values) in &individual.values {
                for value in values {
                    triples.push(Triple {
                        subject: individual.key.clone(),
                        predicate: property.clone(),
                        object: value.clone(),
                    });
                }
            }
        }
        triples
    }

    /// JSON rendering of the whole model
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
