//! Content index of complex types
//!
//! For each complex type the index lists every element that may appear as a
//! child (by qualified name), every attribute, and the wildcards. Group
//! references and attribute group references are expanded, extension bases
//! are inherited, and each particle carries its effective cardinality: its
//! own bounds multiplied by those of the compositors enclosing it.

use mitre_xml::QName;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

use crate::model::{Cardinality, Derivation, MaxOccurs, NodeId, NodeKind, RefTarget};
use crate::registry::{ResolvedType, SchemaGraph};
use crate::{Error, Result, SymbolSpace};

/// An element or attribute that may occur in a complex type's content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Particle {
    /// Node at the use site: a local declaration or a reference
    pub site: NodeId,

    /// Declaration carrying the type (the global declaration for references)
    pub declaration: NodeId,

    /// Effective bounds within the owning type
    pub cardinality: Cardinality,

    /// Direct child of the innermost enclosing choice, if any
    pub branch: Option<NodeId>,
}

/// Index of what may appear inside instances of one complex type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContentIndex {
    /// Child elements by name
    pub elements: BTreeMap<QName, Particle>,

    /// Attributes by name
    pub attributes: BTreeMap<QName, Particle>,

    /// `xs:any` wildcards
    pub wildcards: Vec<NodeId>,
}

impl ContentIndex {
    /// Look up a child element particle
    pub fn element(&self, name: &QName) -> Option<&Particle> {
        self.elements.get(name)
    }

    /// Look up an attribute
    pub fn attribute(&self, name: &QName) -> Option<&Particle> {
        self.attributes.get(name)
    }

    /// Check whether the content has neither elements nor wildcards
    pub fn is_text_only(&self) -> bool {
        self.elements.is_empty() && self.wildcards.is_empty()
    }

    fn add_element(&mut self, name: QName, particle: Particle) {
        match self.elements.get_mut(&name) {
            // Same name twice in one content model: occurrences add up
            Some(existing) => {
                existing.cardinality = Cardinality::new(
                    existing.cardinality.min.saturating_add(particle.cardinality.min),
                    existing.cardinality.max.add(particle.cardinality.max),
                );
            }
            None => {
                self.elements.insert(name, particle);
            }
        }
    }
}

/// Build the content index of every complex type in the graph
pub(crate) fn build_indices(graph: &SchemaGraph) -> Result<BTreeMap<NodeId, ContentIndex>> {
    let mut builder = IndexBuilder {
        graph,
        done: BTreeMap::new(),
        in_progress: BTreeSet::new(),
    };
    for (id, node) in graph.nodes() {
        if node.kind == NodeKind::ComplexType {
            builder.index_of(id)?;
        }
    }
    debug!(types = builder.done.len(), "built content indices");
    Ok(builder.done)
}

struct IndexBuilder<'g> {
    graph: &'g SchemaGraph,
    done: BTreeMap<NodeId, ContentIndex>,
    in_progress: BTreeSet<NodeId>,
}

/// Running multipliers while descending into nested groups
#[derive(Clone, Copy)]
struct Scope {
    min: u32,
    max: MaxOccurs,
    branch: Option<NodeId>,
}

impl IndexBuilder<'_> {
    fn index_of(&mut self, ty: NodeId) -> Result<ContentIndex> {
        if let Some(index) = self.done.get(&ty) {
            return Ok(index.clone());
        }
        if !self.in_progress.insert(ty) {
            // A type deriving from itself, directly or not: stop inheriting here
            trace!(node = %ty, "derivation cycle");
            return Ok(ContentIndex::default());
        }

        let graph = self.graph;
        let node = graph.node(ty);
        let mut index = ContentIndex::default();

        if node.derivation == Some(Derivation::Extension) {
            if let Some(ResolvedType::Complex(base)) =
                node.base_type.as_ref().and_then(|b| graph.resolve_type(b))
            {
                index = self.index_of(base)?;
            }
        }

        let scope = Scope {
            min: 1,
            max: MaxOccurs::Bounded(1),
            branch: None,
        };
        let mut groups = BTreeSet::new();
        let mut attribute_groups = BTreeSet::new();
        for &child in &node.children {
            match graph.node(child).kind {
                NodeKind::Attribute | NodeKind::Reference
                    if self.is_attribute_use(child) =>
                {
                    self.add_attribute_use(&mut index, child, &mut attribute_groups)?;
                }
                NodeKind::Group(_) | NodeKind::Reference => {
                    self.walk_particle(&mut index, child, scope, &mut groups)?;
                }
                _ => {}
            }
        }

        self.in_progress.remove(&ty);
        self.done.insert(ty, index.clone());
        Ok(index)
    }

    fn is_attribute_use(&self, id: NodeId) -> bool {
        let node = self.graph.node(id);
        node.kind == NodeKind::Attribute
            || matches!(
                node.reference,
                Some(RefTarget::Attribute(_) | RefTarget::AttributeGroup(_))
            )
    }

    fn resolve(&self, id: NodeId, space: SymbolSpace, name: &QName) -> Result<NodeId> {
        self.graph
            .lookup(space, name)
            .ok_or_else(|| Error::unresolved(space, name, self.graph.node(id).position))
    }

    fn add_attribute_use(
        &self,
        index: &mut ContentIndex,
        site: NodeId,
        attribute_groups: &mut BTreeSet<NodeId>,
    ) -> Result<()> {
        let graph = self.graph;
        let node = graph.node(site);
        match &node.reference {
            None => {
                if let Some(name) = &node.name {
                    index.attributes.insert(
                        name.clone(),
                        Particle {
                            site,
                            declaration: site,
                            cardinality: node.cardinality,
                            branch: None,
                        },
                    );
                }
            }
            Some(RefTarget::Attribute(name)) => {
                let declaration = self.resolve(site, SymbolSpace::Attribute, name)?;
                index.attributes.insert(
                    name.clone(),
                    Particle {
                        site,
                        declaration,
                        cardinality: node.cardinality,
                        branch: None,
                    },
                );
            }
            Some(RefTarget::AttributeGroup(name)) => {
                let group = self.resolve(site, SymbolSpace::AttributeGroup, name)?;
                if !attribute_groups.insert(group) {
                    return Ok(());
                }
                for &member in &graph.node(group).children {
                    self.add_attribute_use(index, member, attribute_groups)?;
                }
                attribute_groups.remove(&group);
            }
            Some(_) => {}
        }
        Ok(())
    }

    fn walk_particle(
        &self,
        index: &mut ContentIndex,
        site: NodeId,
        scope: Scope,
        groups: &mut BTreeSet<NodeId>,
    ) -> Result<()> {
        let graph = self.graph;
        let node = graph.node(site);
        let min = scope.min.saturating_mul(node.cardinality.min);
        let max = scope.max.multiply(node.cardinality.max);

        match (node.kind, &node.reference) {
            (NodeKind::Element, _) => {
                if let Some(name) = &node.name {
                    index.add_element(
                        name.clone(),
                        Particle {
                            site,
                            declaration: site,
                            cardinality: Cardinality::new(min, max),
                            branch: scope.branch,
                        },
                    );
                }
            }
            (NodeKind::Reference, Some(RefTarget::Element(name))) => {
                let declaration = self.resolve(site, SymbolSpace::Element, name)?;
                index.add_element(
                    name.clone(),
                    Particle {
                        site,
                        declaration,
                        cardinality: Cardinality::new(min, max),
                        branch: scope.branch,
                    },
                );
            }
            (NodeKind::Reference, Some(RefTarget::Group(name))) => {
                let group = self.resolve(site, SymbolSpace::Group, name)?;
                self.walk_group(index, group, Scope { min, max, ..scope }, groups)?;
            }
            (NodeKind::Group(_), _) => {
                self.walk_group(index, site, Scope { min, max, ..scope }, groups)?;
            }
            (NodeKind::Wildcard, _) => index.wildcards.push(site),
            _ => {}
        }
        Ok(())
    }

    /// Walk the particles of a group whose own bounds are already folded into `scope`
    fn walk_group(
        &self,
        index: &mut ContentIndex,
        group: NodeId,
        scope: Scope,
        groups: &mut BTreeSet<NodeId>,
    ) -> Result<()> {
        if !groups.insert(group) {
            trace!(node = %group, "group reference cycle");
            return Ok(());
        }
        let node = self.graph.node(group);
        let is_choice = node.kind.is_choice();
        for &particle in &node.children {
            let inner = Scope {
                // Any branch of a choice may be absent
                min: if is_choice { 0 } else { scope.min },
                max: scope.max,
                branch: if is_choice { Some(particle) } else { scope.branch },
            };
            self.walk_particle(index, particle, inner, groups)?;
        }
        groups.remove(&group);
        Ok(())
    }
}
