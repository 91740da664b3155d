//! XML instance translator
//!
//! Replays a rule set against one data document. Elements of classes that
//! produce individuals become individuals keyed by declared ID or by a
//! fallback hash; their attributes and children become property assertions.
//! References are collected during the walk and resolved against the ID
//! index once the whole document has been seen, so forward references work.

use mitre_ontology::{AssertOutcome, Literal, Ontology, Value, Warning, WarningCode};
use mitre_xml::{
    Cursor, Document, Element, Position, QName, XHTML_NAMESPACE, XML_NAMESPACE,
    XMLNS_NAMESPACE_URI, XSI_NAMESPACE,
};
use mitre_xsd::{NodeId, ResolvedType, SchemaGraph};
use serde::Serialize;
use tracing::{debug, info, trace};

use crate::identity::declared_key;
use crate::literal::convert;
use crate::profile::TranslationProfile;
use crate::rules::{ClassRule, PropertyRange, PropertyRule, RuleSet, RuleTarget};
use crate::{Error, Result};

/// Counters of one translation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TranslationStats {
    pub elements_visited: usize,
    pub individuals_created: usize,
    pub assertions: usize,
    pub references_resolved: usize,
    pub references_dangling: usize,
}

/// Translates data documents with a fixed rule set
pub struct Translator<'a> {
    graph: &'a SchemaGraph,
    rules: &'a RuleSet,
    profile: &'a TranslationProfile,
}

/// Reference waiting for the ID index to be complete
#[derive(Debug)]
struct PendingReference {
    subject: String,
    property: String,
    raw_id: String,
    location: String,
}

/// State of one run over one document
struct TranslationContext<'o> {
    ontology: &'o mut Ontology,
    source: String,
    stats: TranslationStats,
    pending: Vec<PendingReference>,
}

impl TranslationContext<'_> {
    fn location(&self, position: Position) -> String {
        format!("{}:{position}", self.source)
    }

    /// Record a recoverable error as a warning, propagate a fatal one
    fn warn(&mut self, error: Error, position: Position) -> Result<()> {
        let warning = error.into_warning(self.location(position))?;
        self.ontology.warn(warning);
        Ok(())
    }

    fn assert(&mut self, subject: &str, property: &str, value: Value) -> Result<()> {
        if self.ontology.property(property).is_none() {
            // Declaration was dropped as a conflict
            return Ok(());
        }
        match self.ontology.assert_value(subject, property, value)? {
            AssertOutcome::Added | AssertOutcome::Overwritten => self.stats.assertions += 1,
            AssertOutcome::Unchanged => {}
        }
        Ok(())
    }
}

/// Text of an element or attribute occurrence
#[derive(Clone, Copy)]
enum Occurrence<'d> {
    Element(&'d Element),
    Attribute(&'d str, Position),
}

impl Occurrence<'_> {
    fn text(&self) -> String {
        match self {
            Self::Element(element) => element.text(),
            Self::Attribute(value, _) => value.trim().to_string(),
        }
    }

    fn position(&self) -> Position {
        match self {
            Self::Element(element) => element.position,
            Self::Attribute(_, position) => *position,
        }
    }
}

fn is_reserved_attribute(name: &QName) -> bool {
    [XMLNS_NAMESPACE_URI, XSI_NAMESPACE, XML_NAMESPACE]
        .iter()
        .any(|ns| name.is_in(ns))
        || name.local == "xmlns"
}

impl<'a> Translator<'a> {
    /// Create a translator for documents valid against `graph`
    pub fn new(
        graph: &'a SchemaGraph,
        rules: &'a RuleSet,
        profile: &'a TranslationProfile,
    ) -> Self {
        Self {
            graph,
            rules,
            profile,
        }
    }

    /// Translate a document into an ontology that already holds the rule set's declarations
    ///
    /// Recoverable problems become warnings on the ontology. Translating the
    /// same document twice leaves the ontology unchanged the second time.
    ///
    /// # Errors
    ///
    /// Returns an ontology error if an assertion violates the ontology model,
    /// which indicates the ontology was not materialized from the same rules.
    pub fn translate(
        &self,
        document: &Document,
        ontology: &mut Ontology,
    ) -> Result<TranslationStats> {
        let mut context = TranslationContext {
            ontology,
            source: document.source_name().to_string(),
            stats: TranslationStats::default(),
            pending: Vec::new(),
        };
        let root = Cursor::new(&document.root);
        context.stats.elements_visited += 1;

        match self.graph.element(&document.root.name) {
            None => {
                let error = Error::UnknownElement {
                    element: document.root.name.to_string(),
                };
                context.warn(error, document.root.position)?;
            }
            Some(declaration) => match self.graph.type_of(declaration) {
                Some(ResolvedType::Complex(ty)) => match self.rules.class_rule(ty) {
                    Some(class) if class.shape.has_individuals() => {
                        self.individual(&mut context, &root, ty, class)?;
                    }
                    Some(_) => self.fill(&mut context, &root, ty, None)?,
                    None => {
                        let error = Error::NoRule {
                            node: self.graph.describe(ty),
                        };
                        context.warn(error, document.root.position)?;
                    }
                },
                _ => debug!(root = %document.root.name, "root element has simple content"),
            },
        }

        self.resolve_references(&mut context)?;
        info!(
            source = %context.source,
            elements = context.stats.elements_visited,
            individuals = context.stats.individuals_created,
            assertions = context.stats.assertions,
            dangling = context.stats.references_dangling,
            "translated document"
        );
        Ok(context.stats)
    }

    /// Create or merge the individual of an element and fill in its content
    fn individual(
        &self,
        context: &mut TranslationContext<'_>,
        cursor: &Cursor<'_>,
        ty: NodeId,
        class: &ClassRule,
    ) -> Result<String> {
        let element = cursor.element();
        let declared = class
            .id_attribute
            .as_ref()
            .and_then(|name| element.attribute_ns(name))
            .map(str::trim)
            .filter(|id| !id.is_empty());
        let key = match declared {
            Some(id) => declared_key(&class.key_prefix, id),
            None => self.profile.identity.fallback_key(&class.class, cursor),
        };

        if context.ontology.individual(&key).is_none() {
            context.stats.individuals_created += 1;
            trace!(%key, class = %class.class, "new individual");
        }
        context.ontology.ensure_individual(&key, &class.class)?;

        if let Some(id) = declared {
            if let Some(existing) = context.ontology.register_id(id, &key) {
                let message = format!("ID '{id}' of '{key}' is already declared by '{existing}'");
                let warning = Warning::new(WarningCode::DuplicateId, message)
                    .at(context.location(element.position));
                context.ontology.warn(warning);
            }
        }

        if let Some(label) = self.label_of(element) {
            context.ontology.label_individual(&key, &label)?;
        }

        if let Some(property) = &class.value_property {
            self.assert_property(context, &key, property, Occurrence::Element(element), ty)?;
        }
        self.fill(context, cursor, ty, Some(&key))?;
        Ok(key)
    }

    fn label_of(&self, element: &Element) -> Option<String> {
        self.profile.label_attributes.iter().find_map(|name| {
            element
                .attribute(name)
                .map(str::to_string)
                .or_else(|| {
                    element
                        .children()
                        .find(|child| child.name.local == *name)
                        .map(Element::text)
                })
                .filter(|label| !label.trim().is_empty())
        })
    }

    /// Translate the attributes and children of an element of type `ty`
    ///
    /// `subject` is the individual receiving the assertions. Content of
    /// hoisted wrapper types is filled into the enclosing individual.
    fn fill(
        &self,
        context: &mut TranslationContext<'_>,
        cursor: &Cursor<'_>,
        ty: NodeId,
        subject: Option<&str>,
    ) -> Result<()> {
        let element = cursor.element();
        let Some(content) = self.graph.content(ty) else {
            return Ok(());
        };

        for attribute in &element.attributes {
            if is_reserved_attribute(&attribute.name) {
                continue;
            }
            let Some(particle) = content.attribute(&attribute.name) else {
                let error = Error::UnknownAttribute {
                    attribute: attribute.name.to_string(),
                    element: element.name.to_string(),
                };
                context.warn(error, element.position)?;
                continue;
            };
            let occurrence = Occurrence::Attribute(&attribute.value, element.position);
            self.apply(context, particle.site, subject, occurrence, None)?;
        }

        for child in cursor.children() {
            context.stats.elements_visited += 1;
            let child_element = child.element();
            let Some(particle) = content.element(&child_element.name) else {
                if content.wildcards.is_empty() {
                    let error = Error::UnknownElement {
                        element: child_element.name.to_string(),
                    };
                    context.warn(error, child_element.position)?;
                }
                continue;
            };
            if let (Some(subject), Some(_)) = (subject, particle.branch) {
                self.add_branch_classes(context, subject, particle.site, ty)?;
            }
            let occurrence = Occurrence::Element(child_element);
            self.apply(context, particle.site, subject, occurrence, Some(&child))?;
        }
        Ok(())
    }

    /// Type the subject with the branch classes of the choices a particle sits in
    fn add_branch_classes(
        &self,
        context: &mut TranslationContext<'_>,
        subject: &str,
        site: NodeId,
        ty: NodeId,
    ) -> Result<()> {
        let mut current = Some(site);
        while let Some(node) = current.filter(|n| *n != ty) {
            if let Some(class) = self.rules.branch_class(node) {
                context.ontology.ensure_individual(subject, class)?;
            }
            current = self.graph.node(node).parent;
        }
        Ok(())
    }

    /// Apply the rule of a use site to one occurrence
    fn apply(
        &self,
        context: &mut TranslationContext<'_>,
        site: NodeId,
        subject: Option<&str>,
        occurrence: Occurrence<'_>,
        cursor: Option<&Cursor<'_>>,
    ) -> Result<()> {
        let Some(rule) = self.rules.get(site) else {
            let error = Error::NoRule {
                node: self.graph.describe(site),
            };
            return context.warn(error, occurrence.position());
        };

        match &rule.target {
            RuleTarget::Inline => {
                // Hoisted wrapper: its content belongs to the subject
                if let (Some(cursor), Some(ResolvedType::Complex(wrapper))) =
                    (cursor, self.graph.type_of(site))
                {
                    self.fill(context, cursor, wrapper, subject)?;
                }
                Ok(())
            }
            RuleTarget::ObjectProperty(property) => {
                self.apply_object(context, site, subject, property, occurrence, cursor)
            }
            RuleTarget::DatatypeProperty(property) => match subject {
                Some(subject) => {
                    self.assert_property(context, subject, property, occurrence, site)
                }
                None => Ok(()),
            },
            RuleTarget::OwlClass(_) | RuleTarget::NamedIndividual(_) => {
                let error = Error::NoRule {
                    node: self.graph.describe(site),
                };
                context.warn(error, occurrence.position())
            }
        }
    }

    fn apply_object(
        &self,
        context: &mut TranslationContext<'_>,
        site: NodeId,
        subject: Option<&str>,
        property: &PropertyRule,
        occurrence: Occurrence<'_>,
        cursor: Option<&Cursor<'_>>,
    ) -> Result<()> {
        match &property.range {
            PropertyRange::Class { .. } => {
                let (Some(cursor), Some(ResolvedType::Complex(ty))) =
                    (cursor, self.graph.type_of(site))
                else {
                    return Ok(());
                };
                let Some(class) = self.rules.class_rule(ty) else {
                    let error = Error::NoRule {
                        node: self.graph.describe(ty),
                    };
                    return context.warn(error, occurrence.position());
                };
                let object = self.individual(context, cursor, ty, class)?;
                if let Some(subject) = subject {
                    context.assert(subject, &property.property, Value::individual(object))?;
                }
                Ok(())
            }
            PropertyRange::Enumeration { .. } => {
                let Some(subject) = subject else {
                    return Ok(());
                };
                let text = occurrence.text();
                let key = self
                    .graph
                    .type_of(site)
                    .and_then(ResolvedType::node)
                    .and_then(|e| self.rules.get(e))
                    .and_then(|rule| match &rule.target {
                        RuleTarget::NamedIndividual(enumeration) => enumeration.key_of(&text),
                        _ => None,
                    });
                match key {
                    Some(key) => {
                        context.assert(subject, &property.property, Value::individual(key))
                    }
                    None if text.is_empty() => Ok(()),
                    None => {
                        let error = Error::invalid_literal(text, "enumeration literal");
                        context.warn(error, occurrence.position())
                    }
                }
            }
            PropertyRange::Reference { many } => {
                let Some(subject) = subject else {
                    return Ok(());
                };
                let text = occurrence.text();
                let ids: Vec<&str> = if *many {
                    text.split_whitespace().collect()
                } else {
                    Some(text.as_str()).filter(|t| !t.is_empty()).into_iter().collect()
                };
                for raw_id in ids {
                    context.pending.push(PendingReference {
                        subject: subject.to_string(),
                        property: property.property.clone(),
                        raw_id: raw_id.to_string(),
                        location: context.location(occurrence.position()),
                    });
                }
                Ok(())
            }
            PropertyRange::Datatype { .. } | PropertyRange::Markup => Ok(()),
        }
    }

    /// Assert a literal-valued property of an occurrence
    fn assert_property(
        &self,
        context: &mut TranslationContext<'_>,
        subject: &str,
        property: &PropertyRule,
        occurrence: Occurrence<'_>,
        site: NodeId,
    ) -> Result<()> {
        let literal = match (&property.range, occurrence) {
            (PropertyRange::Markup, Occurrence::Element(element)) => match element.inner_markup() {
                Ok(inner) => Some(Literal::new(
                    format!(r#"<div xmlns="{XHTML_NAMESPACE}">{inner}</div>"#),
                    mitre_ontology::Datatype::XmlLiteral,
                )),
                Err(e) => {
                    let error = Error::invalid_literal(e.to_string(), "rdf:XMLLiteral");
                    return context.warn(error, element.position);
                }
            },
            (PropertyRange::Datatype { datatype, source }, _) => {
                match convert(&occurrence.text(), *datatype, *source) {
                    Ok(literal) => literal,
                    Err(error) => return context.warn(error, occurrence.position()),
                }
            }
            _ => {
                trace!(node = %site, property = %property.property, "no literal for occurrence");
                None
            }
        };
        match literal {
            Some(literal) => context.assert(subject, &property.property, Value::Literal(literal)),
            None => Ok(()),
        }
    }

    fn resolve_references(&self, context: &mut TranslationContext<'_>) -> Result<()> {
        let pending = std::mem::take(&mut context.pending);
        for reference in pending {
            match context.ontology.lookup_id(&reference.raw_id).map(str::to_string) {
                Some(target) => {
                    let value = Value::individual(target);
                    context.assert(&reference.subject, &reference.property, value)?;
                    context.stats.references_resolved += 1;
                }
                None => {
                    context.stats.references_dangling += 1;
                    let error = Error::DanglingReference {
                        id: reference.raw_id,
                        property: reference.property,
                    };
                    let warning = error.into_warning(reference.location)?;
                    context.ontology.warn(warning);
                }
            }
        }
        Ok(())
    }
}
