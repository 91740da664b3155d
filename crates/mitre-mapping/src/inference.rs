//! Rule inference over a schema graph
//!
//! One pass per concern, in this order:
//!
//! 1. classify every complex type into a [`ClassShape`];
//! 2. name classes, named types before anonymous ones, so that types keep
//!    their plain names;
//! 3. name the union and branch classes of choice groups;
//! 4. build class and enumeration rules;
//! 5. name properties and build element and attribute rules;
//! 6. give every remaining node an inline rule.
//!
//! A name wanted by two nodes with different signatures is qualified with the
//! enclosing class name. If that is taken too, the later node gets no rule and
//! a rule-conflict warning is recorded.

use mitre_ontology::{Range, Warning};
use mitre_xml::QName;
use mitre_xsd::{
    Cardinality, Derivation, EnumLiteral, NodeId, NodeKind, RefTarget, ResolvedType, SchemaGraph,
    SymbolSpace, XsdType,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, trace, warn};

use crate::choice::ChoicePolicy;
use crate::literal::datatype_of;
use crate::naming::{NamingPolicy, slugify};
use crate::profile::TranslationProfile;
use crate::rules::{
    BranchClass, ClassRule, ClassShape, EnumerationRule, LiteralIndividual, PropertyRange,
    PropertyRule, Rule, RuleSet, RuleTarget,
};
use crate::{Error, Result};

/// Infer one rule per schema node
///
/// # Errors
///
/// Returns [`Error::Schema`] when an element or attribute type cannot be
/// resolved. Naming conflicts are not errors; they are collected as warnings
/// on the returned rule set.
pub fn infer_rules(graph: &SchemaGraph, profile: &TranslationProfile) -> Result<RuleSet> {
    let mut inference = Inference::new(graph, profile);
    inference.classify_shapes();
    inference.index_uses()?;
    inference.name_types();
    inference.name_choices();
    inference.type_rules();
    inference.property_rules()?;
    inference.inline_rules();

    info!(
        nodes = graph.len(),
        rules = inference.rules.len(),
        conflicts = inference.warnings.len(),
        "inferred rules"
    );
    Ok(RuleSet::new(inference.rules, inference.warnings))
}

/// What a name is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
enum Signature {
    Class,
    Property(Range),
}

#[derive(Debug, Clone)]
struct Holder {
    node: NodeId,
    signature: Signature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SiteKind {
    Element,
    Attribute,
}

/// Choice groups owned by one class
#[derive(Debug, Default)]
struct ChoiceClasses {
    /// Whole content is one choice: branches subclass the type's class
    whole: Vec<BranchClass>,
    /// Nested choice group to (union class, branches)
    nested: Vec<(NodeId, String, Vec<BranchClass>)>,
}

struct Inference<'g> {
    graph: &'g SchemaGraph,
    profile: &'g TranslationProfile,
    naming: NamingPolicy,
    names: BTreeMap<String, Holder>,
    shapes: BTreeMap<NodeId, ClassShape>,
    class_names: BTreeMap<NodeId, String>,
    choices: BTreeMap<NodeId, ChoiceClasses>,
    /// Complex type to the element sites using it, with their enclosing type
    uses: BTreeMap<NodeId, Vec<(NodeId, Option<NodeId>)>>,
    rules: BTreeMap<NodeId, Rule>,
    warnings: Vec<Warning>,
}

impl<'g> Inference<'g> {
    fn new(graph: &'g SchemaGraph, profile: &'g TranslationProfile) -> Self {
        Self {
            graph,
            profile,
            naming: profile.naming(),
            names: BTreeMap::new(),
            shapes: BTreeMap::new(),
            class_names: BTreeMap::new(),
            choices: BTreeMap::new(),
            uses: BTreeMap::new(),
            rules: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    fn classify_shapes(&mut self) {
        for (id, node) in self.graph.nodes() {
            if node.kind != NodeKind::ComplexType {
                continue;
            }
            let content = self.graph.content(id).cloned().unwrap_or_default();
            let shape = if node.simple_content {
                ClassShape::SimpleContent
            } else if node.mixed || (content.elements.is_empty() && !content.wildcards.is_empty()) {
                ClassShape::Markup
            } else if node.name.as_ref().is_some_and(|n| self.profile.is_transparent(&n.local))
                || (self.profile.flatten_wrappers
                    && !node.is_abstract
                    && content.attributes.is_empty()
                    && content.wildcards.is_empty()
                    && content.elements.len() == 1)
            {
                ClassShape::Wrapper
            } else {
                ClassShape::Structured
            };
            trace!(node = %id, ?shape, "classified complex type");
            self.shapes.insert(id, shape);
        }
    }

    fn site_kind(&self, id: NodeId) -> Option<SiteKind> {
        let node = self.graph.node(id);
        match (node.kind, &node.reference) {
            (NodeKind::Element, _) | (NodeKind::Reference, Some(RefTarget::Element(_))) => {
                Some(SiteKind::Element)
            }
            (NodeKind::Attribute, _) | (NodeKind::Reference, Some(RefTarget::Attribute(_))) => {
                Some(SiteKind::Attribute)
            }
            _ => None,
        }
    }

    fn resolved_type(&self, site: NodeId) -> Result<ResolvedType> {
        self.graph.type_of(site).ok_or_else(|| {
            let node = self.graph.node(site);
            let name = node
                .declared_type
                .as_ref()
                .map_or_else(|| self.graph.describe(site), |t| format!("{t:?}"));
            Error::Schema(mitre_xsd::Error::unresolved(SymbolSpace::Type, name, node.position))
        })
    }

    fn index_uses(&mut self) -> Result<()> {
        for (id, node) in self.graph.nodes() {
            if node.is_top_level() || self.site_kind(id) != Some(SiteKind::Element) {
                continue;
            }
            if let ResolvedType::Complex(ty) = self.resolved_type(id)? {
                let enclosing = self.graph.enclosing_type(id);
                self.uses.entry(ty).or_default().push((id, enclosing));
            }
        }
        Ok(())
    }

    /// Bind a name, returning whether the node may use it
    fn claim(&mut self, name: &str, node: NodeId, signature: &Signature) -> bool {
        match self.names.get(name) {
            None => {
                self.names.insert(
                    name.to_string(),
                    Holder {
                        node,
                        signature: signature.clone(),
                    },
                );
                true
            }
            Some(holder) => {
                holder.node == node
                    || (matches!(signature, Signature::Property(_)) && holder.signature == *signature)
            }
        }
    }

    /// Bind a name, qualifying it with the enclosing class on collision
    fn claim_qualified(
        &mut self,
        name: &str,
        node: NodeId,
        signature: &Signature,
        enclosing: Option<&str>,
    ) -> Option<String> {
        if self.claim(name, node, signature) {
            return Some(name.to_string());
        }
        if let Some(enclosing) = enclosing {
            let qualified = NamingPolicy::qualify(enclosing, name);
            if self.claim(&qualified, node, signature) {
                debug!(name, %qualified, node = %node, "qualified colliding name");
                return Some(qualified);
            }
        }
        self.conflict(name, node);
        None
    }

    fn conflict(&mut self, name: &str, node: NodeId) {
        let holder = self
            .names
            .get(name)
            .map_or_else(String::new, |h| self.graph.describe(h.node));
        let location = self.graph.node(node).position.to_string();
        let error = Error::rule_conflict(name, self.graph.describe(node), holder);
        warn!(%error, "node skipped");
        if let Ok(warning) = error.into_warning(location) {
            self.warnings.push(warning);
        }
    }

    fn enclosing_class(&self, id: NodeId) -> Option<&str> {
        self.graph
            .enclosing_type(id)
            .and_then(|e| self.class_names.get(&e))
            .map(String::as_str)
    }

    fn owner_name(&self, id: NodeId) -> Option<&str> {
        self.graph
            .node(id)
            .parent
            .and_then(|p| self.graph.node(p).name.as_ref())
            .map(|n| n.local.as_str())
    }

    fn base_class_name(&self, id: NodeId) -> String {
        let node = self.graph.node(id);
        match (&node.name, node.kind) {
            (Some(name), _) => self.naming.type_class(&name.local),
            (None, NodeKind::Enumeration) => match self.owner_name(id) {
                Some(owner) => format!("{}Enumeration", self.naming.element_class(owner)),
                None => format!("Enumeration{}", id.0),
            },
            (None, _) => match self.owner_name(id) {
                Some(owner) => self.naming.element_class(owner),
                None => format!("Anonymous{}", id.0),
            },
        }
    }

    fn name_types(&mut self) {
        let graph = self.graph;
        let mut order: Vec<NodeId> = graph
            .nodes()
            .filter(|(_, n)| matches!(n.kind, NodeKind::ComplexType | NodeKind::Enumeration))
            .map(|(id, _)| id)
            .collect();
        order.sort_by_key(|id| (!graph.node(*id).is_top_level(), *id));

        for id in order {
            let name = self.base_class_name(id);
            let materialized = self.shapes.get(&id).is_none_or(|s| s.has_individuals());
            if !materialized {
                // Wrapper and markup types produce no class; their name only qualifies content
                self.class_names.insert(id, name);
                continue;
            }
            let enclosing = self.enclosing_class(id).map(str::to_string);
            if let Some(name) =
                self.claim_qualified(&name, id, &Signature::Class, enclosing.as_deref())
            {
                self.class_names.insert(id, name);
            }
        }
    }

    fn is_attribute_use(&self, id: NodeId) -> bool {
        let node = self.graph.node(id);
        node.kind == NodeKind::Attribute
            || matches!(
                node.reference,
                Some(RefTarget::Attribute(_) | RefTarget::AttributeGroup(_))
            )
    }

    fn choice_groups(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for &child in &self.graph.node(id).children {
            if let NodeKind::Group(_) = self.graph.node(child).kind {
                if self.graph.node(child).kind.is_choice() {
                    out.push(child);
                }
                self.choice_groups(child, out);
            }
        }
    }

    fn branch_label(&self, branch: NodeId, index: usize) -> String {
        let node = self.graph.node(branch);
        match (&node.name, &node.reference, node.kind) {
            (Some(name), _, NodeKind::Element) => self.naming.element_class(&name.local),
            (_, Some(RefTarget::Element(name)), _) => self.naming.element_class(&name.local),
            (_, _, NodeKind::Wildcard) => "Any".to_string(),
            _ => format!("Branch{}", index + 1),
        }
    }

    fn branch_classes(&mut self, choice: NodeId, owner: &str) -> Vec<BranchClass> {
        let mut branches = Vec::new();
        let children = self.graph.node(choice).children.clone();
        for (index, branch) in children.into_iter().enumerate() {
            let label = self.branch_label(branch, index);
            let class = ChoicePolicy::branch_class(owner, &label);
            if self.claim(&class, branch, &Signature::Class) {
                branches.push(BranchClass { branch, class });
            } else {
                self.conflict(&class, branch);
            }
        }
        branches
    }

    fn name_choices(&mut self) {
        if self.profile.choice != ChoicePolicy::Subclass {
            return;
        }
        let types: Vec<(NodeId, String)> = self
            .class_names
            .iter()
            .filter(|(id, _)| self.shapes.get(id).is_some_and(|s| s.has_individuals()))
            .map(|(id, name)| (*id, name.clone()))
            .collect();

        let graph = self.graph;
        for (ty, class) in types {
            let node = graph.node(ty);
            let particles: Vec<NodeId> = node
                .children
                .iter()
                .copied()
                .filter(|c| !self.is_attribute_use(*c) && graph.node(*c).kind.is_group())
                .collect();
            let mut groups = Vec::new();
            self.choice_groups(ty, &mut groups);
            if groups.is_empty() {
                continue;
            }

            let whole = node.derivation != Some(Derivation::Extension)
                && particles.len() == 1
                && particles[0] == groups[0];
            let mut classes = ChoiceClasses::default();
            for (ordinal, group) in groups.into_iter().enumerate() {
                if whole && ordinal == 0 {
                    classes.whole = self.branch_classes(group, &class);
                    continue;
                }
                let union = ChoicePolicy::union_class(&class, ordinal + usize::from(!whole));
                if !self.claim(&union, group, &Signature::Class) {
                    self.conflict(&union, group);
                    continue;
                }
                let branches = self.branch_classes(group, &union);
                classes.nested.push((group, union, branches));
            }
            self.choices.insert(ty, classes);
        }
    }

    fn id_attribute(&self, ty: NodeId) -> Option<QName> {
        let content = self.graph.content(ty)?;
        let declared = content.attributes.iter().find(|(_, particle)| {
            self.graph
                .type_of(particle.declaration)
                .is_some_and(|t| self.graph.simple_base(t) == XsdType::Id)
        });
        if let Some((name, _)) = declared {
            return Some(name.clone());
        }
        self.profile.id_attributes.iter().find_map(|local| {
            content
                .attributes
                .keys()
                .find(|name| &name.local == local)
                .cloned()
        })
    }

    fn type_rules(&mut self) {
        let graph = self.graph;
        for (id, node) in graph.nodes() {
            let Some(class) = self.class_names.get(&id).cloned() else {
                continue;
            };
            let parent = graph.enclosing_type(id);
            let comment = node.documentation.clone();

            if node.kind == NodeKind::Enumeration {
                let literals = literal_individuals(&class, &node.literals);
                self.insert(
                    id,
                    Some(class.clone()),
                    parent,
                    RuleTarget::NamedIndividual(EnumerationRule { class, literals }),
                );
                continue;
            }

            let Some(&shape) = self.shapes.get(&id) else {
                continue;
            };
            let superclasses = node
                .base_type
                .as_ref()
                .and_then(|b| graph.resolve_type(b))
                .and_then(|resolved| match resolved {
                    ResolvedType::Complex(base)
                        if self.shapes.get(&base).is_some_and(|s| s.has_individuals()) =>
                    {
                        self.class_names.get(&base).cloned()
                    }
                    _ => None,
                })
                .into_iter()
                .collect();
            let choices = self.choices.remove(&id).unwrap_or_default();
            let is_abstract = node.is_abstract || !choices.whole.is_empty();

            for (group, union, branches) in choices.nested {
                let rule = ClassRule {
                    class: union.clone(),
                    superclasses: vec![class.clone()],
                    is_abstract: true,
                    shape: ClassShape::Structured,
                    id_attribute: None,
                    key_prefix: union.clone(),
                    value_property: None,
                    branches,
                    comment: graph.node(group).documentation.clone(),
                };
                self.insert(group, Some(union), Some(id), RuleTarget::OwlClass(rule));
            }

            let rule = ClassRule {
                key_prefix: self.profile.key_prefix(&class).to_string(),
                id_attribute: self.id_attribute(id),
                class: class.clone(),
                superclasses,
                is_abstract,
                shape,
                value_property: None,
                branches: choices.whole,
                comment,
            };
            self.insert(id, Some(class), parent, RuleTarget::OwlClass(rule));
        }
    }

    fn value_properties(&mut self) {
        let graph = self.graph;
        let simple: Vec<NodeId> = self
            .shapes
            .iter()
            .filter(|(_, s)| **s == ClassShape::SimpleContent)
            .map(|(id, _)| *id)
            .collect();
        for id in simple {
            let Some(class) = self.class_names.get(&id).cloned() else {
                continue;
            };
            let source = graph.simple_base(ResolvedType::Complex(id));
            let range = PropertyRange::Datatype {
                datatype: datatype_of(source),
                source,
            };
            let signature = Signature::Property(range.to_range());
            let name = self.naming.property("value");
            let Some(property) = self.claim_qualified(&name, id, &signature, Some(&class)) else {
                continue;
            };
            if let Some(RuleTarget::OwlClass(rule)) = self.rules.get_mut(&id).map(|r| &mut r.target) {
                rule.value_property = Some(PropertyRule {
                    property,
                    domain: Some(class),
                    range,
                    functional: true,
                    comment: None,
                });
            }
        }
    }

    /// Element sites using a wrapper type, followed through nested wrappers
    fn wrapper_uses(&self, wrapper: NodeId) -> Vec<(NodeId, Option<NodeId>)> {
        let mut found = Vec::new();
        let mut visited = BTreeSet::new();
        let mut pending = vec![wrapper];
        while let Some(ty) = pending.pop() {
            if !visited.insert(ty) {
                continue;
            }
            for &(site, enclosing) in self.uses.get(&ty).map_or(&[][..], Vec::as_slice) {
                found.push((site, enclosing));
                if let Some(e) = enclosing {
                    if self.shapes.get(&e) == Some(&ClassShape::Wrapper) {
                        pending.push(e);
                    }
                }
            }
        }
        found
    }

    /// Domain of properties hoisted out of a wrapper, if all uses agree
    fn wrapper_domain(&self, wrapper: NodeId) -> Option<String> {
        let owners: BTreeSet<Option<&String>> = self
            .wrapper_uses(wrapper)
            .into_iter()
            .filter(|(_, e)| e.is_none_or(|e| self.shapes.get(&e) != Some(&ClassShape::Wrapper)))
            .map(|(_, e)| e.and_then(|e| self.class_names.get(&e)))
            .collect();
        match owners.into_iter().collect::<Vec<_>>().as_slice() {
            [Some(class)] => Some((*class).clone()),
            _ => None,
        }
    }

    fn wrapper_repeats(&self, wrapper: NodeId) -> bool {
        self.wrapper_uses(wrapper)
            .into_iter()
            .any(|(site, enclosing)| self.effective_cardinality(site, enclosing).is_many())
    }

    fn effective_cardinality(&self, site: NodeId, enclosing: Option<NodeId>) -> Cardinality {
        let graph = self.graph;
        let node = graph.node(site);
        let name = graph
            .declaration(site)
            .and_then(|d| graph.node(d).name.as_ref());
        let particle = match (name, enclosing.and_then(|e| graph.content(e))) {
            (Some(name), Some(content)) => match self.site_kind(site) {
                Some(SiteKind::Attribute) => content.attribute(name),
                _ => content.element(name),
            },
            _ => None,
        };
        particle.map_or(node.cardinality, |p| p.cardinality)
    }

    fn property_rules(&mut self) -> Result<()> {
        self.value_properties();
        let graph = self.graph;
        for (id, node) in graph.nodes() {
            if node.is_top_level() {
                continue;
            }
            let Some(kind) = self.site_kind(id) else {
                continue;
            };
            let enclosing = graph.enclosing_type(id);
            let shape = enclosing.and_then(|e| self.shapes.get(&e).map(|s| (e, *s)));
            let (domain, hoisted_many) = match shape {
                Some((_, ClassShape::Markup)) => continue,
                Some((e, ClassShape::Wrapper)) => (self.wrapper_domain(e), self.wrapper_repeats(e)),
                Some((e, _)) => match self.class_names.get(&e) {
                    Some(class) => (Some(class.clone()), false),
                    // Enclosing type was skipped
                    None => continue,
                },
                None => (None, false),
            };

            let Some(local) = graph
                .declaration(id)
                .and_then(|d| graph.node(d).name.as_ref())
                .map(|n| n.local.clone())
            else {
                continue;
            };
            let cardinality = self.effective_cardinality(id, enclosing);
            let functional = !cardinality.is_many() && !hoisted_many;

            let range = match self.resolved_type(id)? {
                ResolvedType::Complex(ty) => match self.shapes.get(&ty) {
                    Some(ClassShape::Wrapper) => continue,
                    Some(ClassShape::Markup) => PropertyRange::Markup,
                    _ => match self.class_names.get(&ty) {
                        Some(class) => PropertyRange::Class {
                            class: class.clone(),
                        },
                        None => {
                            self.no_rule(id);
                            continue;
                        }
                    },
                },
                ResolvedType::Enumeration(ty) => match self.class_names.get(&ty) {
                    Some(class) => PropertyRange::Enumeration {
                        class: class.clone(),
                    },
                    None => {
                        self.no_rule(id);
                        continue;
                    }
                },
                resolved => match graph.simple_base(resolved) {
                    XsdType::IdRefs => PropertyRange::Reference { many: true },
                    XsdType::IdRef => PropertyRange::Reference { many: false },
                    _ if self.profile.is_reference_attribute(&local) => {
                        PropertyRange::Reference { many: false }
                    }
                    XsdType::AnyType => PropertyRange::Markup,
                    source => PropertyRange::Datatype {
                        datatype: datatype_of(source),
                        source,
                    },
                },
            };
            let functional = functional && !matches!(range, PropertyRange::Reference { many: true });
            let signature = Signature::Property(range.to_range());
            let qualifier = enclosing.and_then(|e| self.class_names.get(&e)).cloned();
            let name = self.naming.property(&local);
            let Some(property) = self.claim_qualified(&name, id, &signature, qualifier.as_deref())
            else {
                continue;
            };

            let object = range.is_object();
            let rule = PropertyRule {
                property: property.clone(),
                domain,
                range,
                functional,
                comment: graph
                    .declaration(id)
                    .and_then(|d| graph.node(d).documentation.clone()),
            };
            trace!(node = %id, %property, ?kind, "property rule");
            let target = if object {
                RuleTarget::ObjectProperty(rule)
            } else {
                RuleTarget::DatatypeProperty(rule)
            };
            self.rules.insert(
                id,
                Rule {
                    node: id,
                    name: Some(property),
                    cardinality,
                    parent: enclosing,
                    target,
                },
            );
        }
        Ok(())
    }

    fn no_rule(&mut self, id: NodeId) {
        let error = Error::NoRule {
            node: format!("{} (its type has no class)", self.graph.describe(id)),
        };
        warn!(%error, "node skipped");
        if let Ok(warning) = error.into_warning(self.graph.node(id).position.to_string()) {
            self.warnings.push(warning);
        }
    }

    fn inline_rules(&mut self) {
        let graph = self.graph;
        for (id, node) in graph.nodes() {
            if self.rules.contains_key(&id) {
                continue;
            }
            let inline = match self.site_kind(id) {
                Some(_) => node.is_top_level() || self.is_hoisted_or_unused(id),
                None => !matches!(node.kind, NodeKind::ComplexType | NodeKind::Enumeration),
            };
            if inline {
                self.insert(id, None, graph.enclosing_type(id), RuleTarget::Inline);
            }
        }
    }

    /// Element typed by a wrapper, or declared where content is never translated
    fn is_hoisted_or_unused(&self, id: NodeId) -> bool {
        let graph = self.graph;
        let wrapper_typed = matches!(
            graph.type_of(id),
            Some(ResolvedType::Complex(ty)) if self.shapes.get(&ty) == Some(&ClassShape::Wrapper)
        );
        let in_markup = graph
            .enclosing_type(id)
            .is_some_and(|e| self.shapes.get(&e) == Some(&ClassShape::Markup));
        wrapper_typed || in_markup
    }

    fn insert(
        &mut self,
        id: NodeId,
        name: Option<String>,
        parent: Option<NodeId>,
        target: RuleTarget,
    ) {
        self.rules.insert(
            id,
            Rule {
                node: id,
                name,
                cardinality: self.graph.node(id).cardinality,
                parent,
                target,
            },
        );
    }
}

/// One individual per distinct literal; slugs that clash get a numeric suffix
fn literal_individuals(class: &str, literals: &[EnumLiteral]) -> Vec<LiteralIndividual> {
    let mut values = BTreeSet::new();
    let mut keys = BTreeSet::new();
    let mut individuals = Vec::new();
    for (index, literal) in literals.iter().enumerate() {
        if !values.insert(literal.value.as_str()) {
            continue;
        }
        let slug = slugify(&literal.value);
        let slug = if slug.is_empty() {
            format!("Value{}", index + 1)
        } else {
            slug
        };
        let mut key = format!("{class}-{slug}");
        let mut ordinal = 2;
        while keys.contains(&key) {
            key = format!("{class}-{slug}{ordinal}");
            ordinal += 1;
        }
        keys.insert(key.clone());
        individuals.push(LiteralIndividual {
            value: literal.value.clone(),
            key,
            comment: literal.documentation.clone(),
        });
    }
    individuals
}

#[cfg(test)]
mod tests {
    use super::*;
    use mitre_ontology::{Datatype, WarningCode};
    use mitre_xsd::SchemaReader;

    const HEADER: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">"#;

    fn infer(body: &str, profile: &TranslationProfile) -> (SchemaGraph, RuleSet) {
        let schema = format!("{HEADER}{body}</xs:schema>");
        let graph = SchemaReader::new().read_bytes(schema.as_bytes()).unwrap();
        let rules = infer_rules(&graph, profile).unwrap();
        (graph, rules)
    }

    fn type_rule<'r>(graph: &SchemaGraph, rules: &'r RuleSet, name: &str) -> &'r ClassRule {
        let id = graph.type_definition(&QName::local(name)).unwrap();
        rules.class_rule(id).unwrap()
    }

    fn particle_rule<'r>(
        graph: &SchemaGraph,
        rules: &'r RuleSet,
        ty: &str,
        element: &str,
    ) -> &'r Rule {
        let id = graph.type_definition(&QName::local(ty)).unwrap();
        let content = graph.content(id).unwrap();
        let particle = content
            .element(&QName::local(element))
            .or_else(|| content.attribute(&QName::local(element)))
            .unwrap();
        rules.get(particle.site).unwrap()
    }

    const WEAKNESS: &str = r#"
        <xs:element name="Weaknesses">
            <xs:complexType><xs:sequence>
                <xs:element name="Weakness" type="Weakness" maxOccurs="unbounded"/>
            </xs:sequence></xs:complexType>
        </xs:element>
        <xs:complexType name="Weakness">
            <xs:sequence>
                <xs:element name="Name" type="xs:string"/>
                <xs:element name="RelatedWeakness" type="xs:IDREF" minOccurs="0" maxOccurs="unbounded"/>
            </xs:sequence>
            <xs:attribute name="id" type="xs:ID" use="required"/>
        </xs:complexType>"#;

    #[test]
    fn test_every_node_gets_one_rule() {
        let (graph, rules) = infer(WEAKNESS, &TranslationProfile::default());
        assert!(rules.warnings().is_empty());
        assert_eq!(rules.len(), graph.len());
        for (id, _) in graph.nodes() {
            assert_eq!(rules.get(id).unwrap().node, id);
        }
    }

    #[test]
    fn test_weakness_rules() {
        let (graph, rules) = infer(WEAKNESS, &TranslationProfile::default());

        let weakness = type_rule(&graph, &rules, "Weakness");
        assert_eq!(weakness.shape, ClassShape::Structured);
        assert_eq!(weakness.id_attribute, Some(QName::local("id")));

        let name = particle_rule(&graph, &rules, "Weakness", "Name");
        let RuleTarget::DatatypeProperty(property) = &name.target else {
            panic!("Name is a datatype property");
        };
        assert_eq!(property.property, "Name");
        assert!(property.functional);
        assert_eq!(property.domain.as_deref(), Some("Weakness"));
        assert_eq!(
            property.range,
            PropertyRange::Datatype {
                datatype: Datatype::String,
                source: XsdType::String
            }
        );

        let related = particle_rule(&graph, &rules, "Weakness", "RelatedWeakness");
        let RuleTarget::ObjectProperty(property) = &related.target else {
            panic!("RelatedWeakness is an object property");
        };
        assert!(!property.functional);
        assert_eq!(property.range, PropertyRange::Reference { many: false });
    }

    #[test]
    fn test_wrapper_root_is_hoisted() {
        let (graph, rules) = infer(WEAKNESS, &TranslationProfile::default());
        let root = graph.element(&QName::local("Weaknesses")).unwrap();
        let Some(ResolvedType::Complex(anonymous)) = graph.type_of(root) else {
            panic!("anonymous root type");
        };
        assert_eq!(rules.class_rule(anonymous).unwrap().shape, ClassShape::Wrapper);

        // Class `Weakness` keeps its name, the element property is qualified
        let content = graph.content(anonymous).unwrap();
        let site = content.element(&QName::local("Weakness")).unwrap().site;
        let rule = rules.property_rule(site).unwrap();
        assert_eq!(rule.property, "Weaknesses_Weakness");
        assert_eq!(rule.domain, None);
        assert!(!rule.functional);
    }

    const PARAMETER: &str = r#"
        <xs:complexType name="Parameter">
            <xs:choice>
                <xs:element name="StringValue" type="xs:string"/>
                <xs:element name="IntValue" type="xs:integer"/>
            </xs:choice>
        </xs:complexType>
        <xs:complexType name="Setting">
            <xs:sequence>
                <xs:element name="Key" type="xs:string"/>
                <xs:choice>
                    <xs:element name="Flag" type="xs:boolean"/>
                    <xs:element name="Level" type="xs:integer"/>
                </xs:choice>
            </xs:sequence>
        </xs:complexType>"#;

    #[test]
    fn test_whole_content_choice_makes_abstract_union() {
        let (graph, rules) = infer(PARAMETER, &TranslationProfile::default());
        let parameter = type_rule(&graph, &rules, "Parameter");
        assert!(parameter.is_abstract);
        let names: Vec<&str> = parameter.branches.iter().map(|b| b.class.as_str()).collect();
        assert_eq!(names, vec!["Parameter_StringValue", "Parameter_IntValue"]);
        for branch in &parameter.branches {
            assert_eq!(rules.branch_class(branch.branch), Some(branch.class.as_str()));
        }
    }

    #[test]
    fn test_nested_choice_gets_union_class() {
        let (graph, rules) = infer(PARAMETER, &TranslationProfile::default());
        let setting = type_rule(&graph, &rules, "Setting");
        assert!(!setting.is_abstract);
        assert!(setting.branches.is_empty());

        let union = rules
            .iter()
            .filter_map(Rule::class)
            .find(|c| c.class == "Setting_Choice")
            .expect("union class");
        assert!(union.is_abstract);
        assert_eq!(union.superclasses, vec!["Setting".to_string()]);
        let names: Vec<&str> = union.branches.iter().map(|b| b.class.as_str()).collect();
        assert_eq!(names, vec!["Setting_Choice_Flag", "Setting_Choice_Level"]);
    }

    #[test]
    fn test_flatten_policy_keeps_plain_properties() {
        let profile = TranslationProfile {
            choice: ChoicePolicy::Flatten,
            ..TranslationProfile::default()
        };
        let (graph, rules) = infer(PARAMETER, &profile);
        let parameter = type_rule(&graph, &rules, "Parameter");
        assert!(!parameter.is_abstract);
        assert!(parameter.branches.is_empty());
        assert!(particle_rule(&graph, &rules, "Parameter", "IntValue").property().is_some());
    }

    #[test]
    fn test_enumeration_individuals() {
        let (graph, rules) = infer(
            r#"
            <xs:simpleType name="RelatedNatureEnumeration">
                <xs:restriction base="xs:string">
                    <xs:enumeration value="ChildOf"/>
                    <xs:enumeration value="CanPrecede"/>
                </xs:restriction>
            </xs:simpleType>
            <xs:complexType name="Related">
                <xs:attribute name="Nature" type="RelatedNatureEnumeration"/>
                <xs:attribute name="Ordinal" type="xs:string"/>
            </xs:complexType>"#,
            &TranslationProfile::default(),
        );
        let id = graph.type_definition(&QName::local("RelatedNatureEnumeration")).unwrap();
        let RuleTarget::NamedIndividual(enumeration) = &rules.get(id).unwrap().target else {
            panic!("enumeration rule");
        };
        assert_eq!(enumeration.key_of("ChildOf"), Some("RelatedNatureEnumeration-ChildOf"));
        assert_eq!(enumeration.key_of("Missing"), None);

        let nature = particle_rule(&graph, &rules, "Related", "Nature");
        assert_eq!(
            nature.property().unwrap().range,
            PropertyRange::Enumeration {
                class: "RelatedNatureEnumeration".into()
            }
        );
        assert!(nature.property().unwrap().functional);
    }

    #[test]
    fn test_clashing_literal_slugs_get_distinct_keys() {
        let (graph, rules) = infer(
            r#"
            <xs:simpleType name="NatureEnumeration">
                <xs:restriction base="xs:string">
                    <xs:enumeration value="Peer Of"/>
                    <xs:enumeration value="PeerOf"/>
                    <xs:enumeration value="Peer-Of"/>
                    <xs:enumeration value="PeerOf"/>
                </xs:restriction>
            </xs:simpleType>"#,
            &TranslationProfile::default(),
        );
        let id = graph.type_definition(&QName::local("NatureEnumeration")).unwrap();
        let RuleTarget::NamedIndividual(enumeration) = &rules.get(id).unwrap().target else {
            panic!("enumeration rule");
        };
        assert_eq!(enumeration.literals.len(), 3);
        assert_eq!(enumeration.key_of("Peer Of"), Some("NatureEnumeration-PeerOf"));
        assert_eq!(enumeration.key_of("PeerOf"), Some("NatureEnumeration-PeerOf2"));
        assert_eq!(enumeration.key_of("Peer-Of"), Some("NatureEnumeration-PeerOf3"));
    }

    #[test]
    fn test_extension_base_becomes_superclass() {
        let (graph, rules) = infer(
            r#"
            <xs:complexType name="BaseType">
                <xs:sequence><xs:element name="A" type="xs:string"/><xs:element name="B" type="xs:string"/></xs:sequence>
            </xs:complexType>
            <xs:complexType name="DerivedType">
                <xs:complexContent><xs:extension base="BaseType">
                    <xs:attribute name="C" type="xs:string"/>
                </xs:extension></xs:complexContent>
            </xs:complexType>"#,
            &TranslationProfile::default(),
        );
        let derived = type_rule(&graph, &rules, "DerivedType");
        assert_eq!(derived.class, "Derived");
        assert_eq!(derived.superclasses, vec!["Base".to_string()]);
    }

    #[test]
    fn test_signature_collision_is_qualified() {
        let (graph, rules) = infer(
            r#"
            <xs:complexType name="A">
                <xs:sequence><xs:element name="Size" type="xs:integer"/><xs:element name="X" type="xs:string"/></xs:sequence>
            </xs:complexType>
            <xs:complexType name="B">
                <xs:sequence><xs:element name="Size" type="xs:string"/><xs:element name="X" type="xs:string"/></xs:sequence>
            </xs:complexType>"#,
            &TranslationProfile::default(),
        );
        assert_eq!(particle_rule(&graph, &rules, "A", "Size").name.as_deref(), Some("Size"));
        assert_eq!(particle_rule(&graph, &rules, "B", "Size").name.as_deref(), Some("B_Size"));
        // Same signature: shared
        assert_eq!(particle_rule(&graph, &rules, "B", "X").name.as_deref(), Some("X"));
    }

    #[test]
    fn test_unresolvable_collision_is_a_warning() {
        let (graph, rules) = infer(
            r#"
            <xs:complexType name="FooType">
                <xs:sequence><xs:element name="A" type="xs:string"/><xs:element name="B" type="xs:string"/></xs:sequence>
            </xs:complexType>
            <xs:complexType name="Foo">
                <xs:sequence><xs:element name="C" type="xs:string"/><xs:element name="D" type="xs:string"/></xs:sequence>
            </xs:complexType>"#,
            &TranslationProfile::default(),
        );
        assert_eq!(rules.warnings().len(), 1);
        assert_eq!(rules.warnings()[0].code, WarningCode::RuleConflict);
        let second = graph.type_definition(&QName::local("Foo")).unwrap();
        assert!(rules.get(second).is_none());
        // Content of the skipped type gets no property rule
        let content = graph.content(second).unwrap();
        assert!(rules.property_rule(content.element(&QName::local("C")).unwrap().site).is_none());
    }

    #[test]
    fn test_transparent_type_is_hoisted_and_repeated() {
        let profile = TranslationProfile {
            transparent_types: vec!["MemberType".into()],
            reference_attributes: vec!["CWE_ID".into()],
            ..TranslationProfile::default()
        };
        let (graph, rules) = infer(
            r#"
            <xs:complexType name="CategoryType">
                <xs:sequence><xs:element name="Has_Member" type="MemberType" maxOccurs="unbounded"/></xs:sequence>
                <xs:attribute name="ID" type="xs:integer"/>
            </xs:complexType>
            <xs:complexType name="MemberType">
                <xs:attribute name="CWE_ID" type="xs:integer"/>
                <xs:attribute name="View_ID" type="xs:integer"/>
            </xs:complexType>"#,
            &profile,
        );
        let member = particle_rule(&graph, &rules, "CategoryType", "Has_Member");
        assert_eq!(member.target, RuleTarget::Inline);

        let cwe_id = particle_rule(&graph, &rules, "MemberType", "CWE_ID");
        let property = cwe_id.property().unwrap();
        assert_eq!(property.domain.as_deref(), Some("Category"));
        assert!(!property.functional);
        assert_eq!(property.range, PropertyRange::Reference { many: false });
    }

    #[test]
    fn test_rules_are_deterministic() {
        let (_, first) = infer(PARAMETER, &TranslationProfile::default());
        let (_, second) = infer(PARAMETER, &TranslationProfile::default());
        assert_eq!(first, second);
        assert_eq!(first.to_json_pretty().unwrap(), second.to_json_pretty().unwrap());
    }
}
