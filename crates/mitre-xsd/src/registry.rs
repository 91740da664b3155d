//! Schema graph: node arena plus one name table per symbol space
#![allow(clippy::must_use_candidate)] // Accessor API intentionally omits pervasive #[must_use].

use mitre_xml::QName;
use std::collections::BTreeMap;

use crate::content::ContentIndex;
use crate::model::{NodeId, NodeKind, RefTarget, SchemaNode, TypeRef, XsdType};
use crate::{Error, Result, SymbolSpace};

/// What a type reference ends up pointing at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedType {
    /// Built-in XSD type
    Builtin(XsdType),
    /// User simple type without enumeration facets
    Simple(NodeId),
    /// Simple type restricted to a literal set
    Enumeration(NodeId),
    /// Complex type
    Complex(NodeId),
}

impl ResolvedType {
    /// Node of a user-defined type
    pub fn node(self) -> Option<NodeId> {
        match self {
            Self::Builtin(_) => None,
            Self::Simple(id) | Self::Enumeration(id) | Self::Complex(id) => Some(id),
        }
    }
}

/// The schema graph
///
/// Nodes live in an arena and point at each other by [`NodeId`]. Named
/// references stay symbolic and are looked up here, so cycles between types
/// are harmless.
#[derive(Debug, Clone, Default)]
pub struct SchemaGraph {
    target_namespace: Option<String>,
    nodes: Vec<SchemaNode>,
    top_level: Vec<NodeId>,
    tables: BTreeMap<SymbolSpace, BTreeMap<QName, NodeId>>,
    content: BTreeMap<NodeId, ContentIndex>,
}

impl SchemaGraph {
    /// Create an empty graph for a target namespace
    pub fn new(target_namespace: Option<String>) -> Self {
        Self {
            target_namespace,
            ..Self::default()
        }
    }

    /// Target namespace of the schema
    pub fn target_namespace(&self) -> Option<&str> {
        self.target_namespace.as_deref()
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check for an empty graph
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get a node. Ids are only handed out by this graph, so they are always in range.
    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    /// Get a node if the id is in range
    pub fn get(&self, id: NodeId) -> Option<&SchemaNode> {
        self.nodes.get(id.0)
    }

    /// Iterate over all nodes in allocation order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SchemaNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Top-level components in document order
    pub fn top_level(&self) -> &[NodeId] {
        &self.top_level
    }

    /// Look up a top-level component by symbol space and name
    pub fn lookup(&self, space: SymbolSpace, name: &QName) -> Option<NodeId> {
        self.tables.get(&space).and_then(|table| table.get(name)).copied()
    }

    /// Look up a global element declaration
    pub fn element(&self, name: &QName) -> Option<NodeId> {
        self.lookup(SymbolSpace::Element, name)
    }

    /// Look up a named type
    pub fn type_definition(&self, name: &QName) -> Option<NodeId> {
        self.lookup(SymbolSpace::Type, name)
    }

    /// Content index of a complex type
    pub fn content(&self, complex_type: NodeId) -> Option<&ContentIndex> {
        self.content.get(&complex_type)
    }

    /// Resolve a type reference
    pub fn resolve_type(&self, type_ref: &TypeRef) -> Option<ResolvedType> {
        let id = match type_ref {
            TypeRef::Builtin(ty) => return Some(ResolvedType::Builtin(*ty)),
            TypeRef::Named(name) => self.type_definition(name)?,
            TypeRef::Anonymous(id) => *id,
        };
        match self.get(id)?.kind {
            NodeKind::ComplexType => Some(ResolvedType::Complex(id)),
            NodeKind::Enumeration => Some(ResolvedType::Enumeration(id)),
            NodeKind::SimpleType => Some(ResolvedType::Simple(id)),
            _ => None,
        }
    }

    /// Follow a reference node to the global declaration it names
    pub fn declaration(&self, id: NodeId) -> Option<NodeId> {
        let node = self.get(id)?;
        match &node.reference {
            Some(RefTarget::Element(name)) => self.lookup(SymbolSpace::Element, name),
            Some(RefTarget::Attribute(name)) => self.lookup(SymbolSpace::Attribute, name),
            Some(RefTarget::Group(name)) => self.lookup(SymbolSpace::Group, name),
            Some(RefTarget::AttributeGroup(name)) => self.lookup(SymbolSpace::AttributeGroup, name),
            None => Some(id),
        }
    }

    /// Resolved type of an element or attribute, following references
    pub fn type_of(&self, id: NodeId) -> Option<ResolvedType> {
        let declaration = self.node(self.declaration(id)?);
        match declaration.kind {
            NodeKind::Element => declaration
                .declared_type
                .as_ref()
                .map_or(Some(ResolvedType::Builtin(XsdType::AnyType)), |t| {
                    self.resolve_type(t)
                }),
            NodeKind::Attribute => declaration
                .declared_type
                .as_ref()
                .map_or(Some(ResolvedType::Builtin(XsdType::AnySimpleType)), |t| {
                    self.resolve_type(t)
                }),
            _ => None,
        }
    }

    /// Built-in type underlying a simple type, enumeration, or simple-content complex type
    pub fn simple_base(&self, resolved: ResolvedType) -> XsdType {
        let mut current = resolved;
        // Bounded walk: a derivation chain can't be longer than the graph
        for _ in 0..=self.nodes.len() {
            let next = match current {
                ResolvedType::Builtin(ty) => return ty,
                ResolvedType::Simple(id)
                | ResolvedType::Enumeration(id)
                | ResolvedType::Complex(id) => self
                    .node(id)
                    .base_type
                    .as_ref()
                    .and_then(|base| self.resolve_type(base)),
            };
            match next {
                Some(next) => current = next,
                None => return XsdType::String,
            }
        }
        XsdType::String
    }

    /// Nearest enclosing complex type of a node (the node itself excluded)
    pub fn enclosing_type(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.node(id).parent;
        while let Some(parent) = current {
            if self.node(parent).kind == NodeKind::ComplexType {
                return Some(parent);
            }
            current = self.node(parent).parent;
        }
        None
    }

    /// Top-level component a node is declared in
    pub fn top_level_of(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            current = parent;
        }
        current
    }

    /// Short human-readable description of a node for diagnostics
    pub fn describe(&self, id: NodeId) -> String {
        let node = self.node(id);
        let name = match (&node.name, &node.reference) {
            (Some(name), _) => name.local.clone(),
            (None, Some(target)) => format!("ref {}", target.name().local),
            (None, None) => "(anonymous)".to_string(),
        };
        format!("{:?} '{}' at {}", node.kind, name, node.position)
    }

    pub(crate) fn alloc(&mut self, node: SchemaNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        if node.parent.is_none() {
            self.top_level.push(id);
        }
        self.nodes.push(node);
        id
    }

    pub(crate) fn alloc_child(&mut self, parent: NodeId, mut node: SchemaNode) -> NodeId {
        node.parent = Some(parent);
        let id = self.alloc(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut SchemaNode {
        &mut self.nodes[id.0]
    }

    pub(crate) fn declare(&mut self, space: SymbolSpace, name: QName, id: NodeId) -> Result<()> {
        let table = self.tables.entry(space).or_default();
        if table.contains_key(&name) {
            return Err(Error::Duplicate {
                space,
                name: name.to_string(),
            });
        }
        table.insert(name, id);
        Ok(())
    }

    pub(crate) fn set_content(&mut self, content: BTreeMap<NodeId, ContentIndex>) {
        self.content = content;
    }
}
