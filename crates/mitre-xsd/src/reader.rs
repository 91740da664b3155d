//! Three-pass XSD reader
//!
//! 1. declare: allocate a node for every top-level component and register its
//!    name, so forward and self references can be resolved later;
//! 2. build: fill in bodies (anonymous types, content models, attributes);
//! 3. link: check that every named reference resolves and build the content
//!    index of each complex type.

use mitre_xml::{Document, Element, NamespaceScope, QName, XS_NAMESPACE};
use tracing::{debug, info, trace};

use crate::content::build_indices;
use crate::model::{
    Cardinality, Compositor, Derivation, EnumLiteral, MaxOccurs, NodeId, NodeKind, RefTarget,
    SchemaNode, TypeRef, XsdType,
};
use crate::registry::SchemaGraph;
use crate::{Error, Result, SymbolSpace};

/// Facets that constrain a simple type's value space without changing its kind
const FACETS: &[&str] = &[
    "length",
    "minLength",
    "maxLength",
    "pattern",
    "whiteSpace",
    "minInclusive",
    "maxInclusive",
    "minExclusive",
    "maxExclusive",
    "totalDigits",
    "fractionDigits",
    "assertion",
    "explicitTimezone",
];

/// Read a parsed XSD document into a schema graph
pub fn read_schema(document: &Document) -> Result<SchemaGraph> {
    SchemaReader::default().read(document)
}

/// Reader state: the graph under construction and the namespace scope of the
/// XSD element being read
#[derive(Debug, Default)]
pub struct SchemaReader {
    graph: SchemaGraph,
    scope: NamespaceScope,
    target_namespace: Option<String>,
    elements_qualified: bool,
    attributes_qualified: bool,
}

impl SchemaReader {
    /// Create a reader
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and read raw schema bytes
    pub fn read_bytes(self, input: &[u8]) -> Result<SchemaGraph> {
        let document = Document::parse(input)?;
        self.read(&document)
    }

    /// Read a parsed schema document
    pub fn read(mut self, document: &Document) -> Result<SchemaGraph> {
        let root = &document.root;
        if !is_xs(root, "schema") {
            return Err(Error::NotASchema {
                found: root.name.to_string(),
            });
        }

        self.target_namespace = root.attribute("targetNamespace").map(str::to_string);
        self.elements_qualified = root.attribute("elementFormDefault") == Some("qualified");
        self.attributes_qualified = root.attribute("attributeFormDefault") == Some("qualified");
        self.graph = SchemaGraph::new(self.target_namespace.clone());

        self.scope.push(root);
        let declared = self.declare(root)?;
        debug!(components = declared.len(), source = document.source_name(), "declared top-level components");

        for (id, element) in &declared {
            self.build_top_level(*id, element)?;
        }
        self.scope.pop();

        self.link()?;
        info!(
            nodes = self.graph.len(),
            components = declared.len(),
            target_namespace = self.target_namespace.as_deref().unwrap_or(""),
            "read schema"
        );
        Ok(self.graph)
    }

    // Pass 1

    fn declare<'d>(&mut self, root: &'d Element) -> Result<Vec<(NodeId, &'d Element)>> {
        let mut declared = Vec::new();
        for child in root.children() {
            let local = xs_local(child, "xs:schema")?;
            let (kind, space) = match local {
                "element" => (NodeKind::Element, SymbolSpace::Element),
                "attribute" => (NodeKind::Attribute, SymbolSpace::Attribute),
                "complexType" => (NodeKind::ComplexType, SymbolSpace::Type),
                "simpleType" => (simple_kind(child), SymbolSpace::Type),
                "group" => (NodeKind::Group(named_group_compositor(child)?), SymbolSpace::Group),
                "attributeGroup" => (NodeKind::AttributeGroup, SymbolSpace::AttributeGroup),
                "annotation" | "import" | "include" | "notation" | "defaultOpenContent" => {
                    trace!(construct = local, "skipping top-level construct");
                    continue;
                }
                _ => return Err(Error::unclassifiable(&child.name, "xs:schema", child.position)),
            };

            let local_name = required(child, "name")?;
            let name = QName::new(self.target_namespace.as_deref(), local_name);
            let mut node = SchemaNode::new(kind, Some(name.clone()));
            node.position = child.position;
            node.documentation = documentation(child);
            if kind == NodeKind::Attribute {
                node.cardinality = Cardinality::OPTIONAL;
            }
            let id = self.graph.alloc(node);
            self.graph.declare(space, name, id)?;
            declared.push((id, child));
        }
        Ok(declared)
    }

    // Pass 2

    fn build_top_level(&mut self, id: NodeId, element: &Element) -> Result<()> {
        match self.graph.node(id).kind {
            NodeKind::Element => self.fill_element(id, element),
            NodeKind::Attribute => self.fill_attribute(id, element),
            NodeKind::ComplexType => self.fill_complex_type(id, element),
            NodeKind::SimpleType | NodeKind::Enumeration => self.fill_simple_type(id, element),
            NodeKind::Group(_) => self.fill_named_group(id, element),
            NodeKind::AttributeGroup => self.fill_attribute_group(id, element),
            NodeKind::Reference | NodeKind::Wildcard => Ok(()),
        }
    }

    fn fill_element(&mut self, id: NodeId, element: &Element) -> Result<()> {
        self.scope.push(element);
        {
            let node = self.graph.node_mut(id);
            node.is_abstract = element.attribute("abstract") == Some("true");
        }

        let mut declared_type = match element.attribute("type") {
            Some(value) => Some(self.type_ref(value, element)?),
            None => None,
        };
        for child in element.children() {
            match xs_local(child, "xs:element")? {
                "complexType" if declared_type.is_none() => {
                    let anonymous = self.anonymous(id, NodeKind::ComplexType, child);
                    self.fill_complex_type(anonymous, child)?;
                    declared_type = Some(TypeRef::Anonymous(anonymous));
                }
                "simpleType" if declared_type.is_none() => {
                    let anonymous = self.anonymous(id, simple_kind(child), child);
                    self.fill_simple_type(anonymous, child)?;
                    declared_type = Some(TypeRef::Anonymous(anonymous));
                }
                "annotation" | "key" | "keyref" | "unique" | "alternative" => {}
                _ => return Err(Error::unclassifiable(&child.name, "xs:element", child.position)),
            }
        }

        self.graph.node_mut(id).declared_type =
            Some(declared_type.unwrap_or(TypeRef::Builtin(XsdType::AnyType)));
        self.scope.pop();
        Ok(())
    }

    fn fill_attribute(&mut self, id: NodeId, element: &Element) -> Result<()> {
        self.scope.push(element);
        let mut declared_type = match element.attribute("type") {
            Some(value) => Some(self.type_ref(value, element)?),
            None => None,
        };
        for child in element.children() {
            match xs_local(child, "xs:attribute")? {
                "simpleType" if declared_type.is_none() => {
                    let anonymous = self.anonymous(id, simple_kind(child), child);
                    self.fill_simple_type(anonymous, child)?;
                    declared_type = Some(TypeRef::Anonymous(anonymous));
                }
                "annotation" => {}
                _ => {
                    return Err(Error::unclassifiable(&child.name, "xs:attribute", child.position));
                }
            }
        }
        self.graph.node_mut(id).declared_type =
            Some(declared_type.unwrap_or(TypeRef::Builtin(XsdType::AnySimpleType)));
        self.scope.pop();
        Ok(())
    }

    fn fill_complex_type(&mut self, id: NodeId, element: &Element) -> Result<()> {
        self.scope.push(element);
        {
            let node = self.graph.node_mut(id);
            node.is_abstract = element.attribute("abstract") == Some("true");
            node.mixed = element.attribute("mixed") == Some("true");
        }

        for child in element.children() {
            match xs_local(child, "xs:complexType")? {
                "simpleContent" => {
                    self.graph.node_mut(id).simple_content = true;
                    self.fill_derivation(id, child)?;
                }
                "complexContent" => {
                    if child.attribute("mixed") == Some("true") {
                        self.graph.node_mut(id).mixed = true;
                    }
                    self.fill_derivation(id, child)?;
                }
                _ => self.complex_body_item(id, child, "xs:complexType", false)?,
            }
        }
        self.scope.pop();
        Ok(())
    }

    fn fill_derivation(&mut self, id: NodeId, content: &Element) -> Result<()> {
        self.scope.push(content);
        let simple = self.graph.node(id).simple_content;
        for child in content.children() {
            let derivation = match xs_local(child, "content model")? {
                "annotation" => continue,
                "extension" => Derivation::Extension,
                "restriction" => Derivation::Restriction,
                _ => return Err(Error::unclassifiable(&child.name, "content model", child.position)),
            };
            self.scope.push(child);
            let base = self.type_ref(required(child, "base")?, child)?;
            {
                let node = self.graph.node_mut(id);
                node.base_type = Some(base);
                node.derivation = Some(derivation);
            }
            for item in child.children() {
                self.complex_body_item(id, item, "xs:extension", simple)?;
            }
            self.scope.pop();
        }
        self.scope.pop();
        Ok(())
    }

    /// One child of a complex type body: content model, attribute use, or ignorable item
    fn complex_body_item(
        &mut self,
        owner: NodeId,
        item: &Element,
        context: &str,
        simple_content: bool,
    ) -> Result<()> {
        let local = xs_local(item, context)?;
        match local {
            "sequence" | "choice" | "all" | "group" => {
                self.particle(owner, item, context)?;
            }
            "attribute" => {
                self.attribute_use(owner, item)?;
            }
            "attributeGroup" => {
                let target = self.resolve_value(required(item, "ref")?, item)?;
                self.reference(owner, item, RefTarget::AttributeGroup(target), Cardinality::ONE);
            }
            "annotation" | "anyAttribute" | "assert" | "openContent" => {}
            // Facets and the inline base of a simple-content restriction
            "simpleType" | "enumeration" if simple_content => {}
            _ if simple_content && FACETS.contains(&local) => {}
            _ => return Err(Error::unclassifiable(&item.name, context, item.position)),
        }
        Ok(())
    }

    fn fill_simple_type(&mut self, id: NodeId, element: &Element) -> Result<()> {
        self.scope.push(element);
        for child in element.children() {
            match xs_local(child, "xs:simpleType")? {
                "annotation" => {}
                "restriction" => {
                    self.scope.push(child);
                    let base = match child.attribute("base") {
                        Some(value) => self.type_ref(value, child)?,
                        None => TypeRef::Builtin(XsdType::String),
                    };
                    let mut literals = Vec::new();
                    for facet in child.children() {
                        match xs_local(facet, "xs:restriction")? {
                            "enumeration" => literals.push(EnumLiteral {
                                value: required(facet, "value")?.to_string(),
                                documentation: documentation(facet),
                            }),
                            "annotation" | "simpleType" => {}
                            other if FACETS.contains(&other) => {}
                            _ => {
                                return Err(Error::unclassifiable(
                                    &facet.name,
                                    "xs:restriction",
                                    facet.position,
                                ));
                            }
                        }
                    }
                    let node = self.graph.node_mut(id);
                    node.base_type = Some(base);
                    node.derivation = Some(Derivation::Restriction);
                    node.literals = literals;
                    self.scope.pop();
                }
                // Lists and unions carry their lexical form as a string
                "list" | "union" => {
                    let node = self.graph.node_mut(id);
                    node.base_type = Some(TypeRef::Builtin(XsdType::String));
                }
                _ => return Err(Error::unclassifiable(&child.name, "xs:simpleType", child.position)),
            }
        }
        self.scope.pop();
        Ok(())
    }

    fn fill_named_group(&mut self, id: NodeId, element: &Element) -> Result<()> {
        self.scope.push(element);
        for child in element.children() {
            match xs_local(child, "xs:group")? {
                "sequence" | "choice" | "all" => {
                    self.scope.push(child);
                    if self.graph.node(id).documentation.is_none() {
                        self.graph.node_mut(id).documentation = documentation(child);
                    }
                    for item in child.children() {
                        self.particle(id, item, "xs:group")?;
                    }
                    self.scope.pop();
                }
                "annotation" => {}
                _ => return Err(Error::unclassifiable(&child.name, "xs:group", child.position)),
            }
        }
        self.scope.pop();
        Ok(())
    }

    fn fill_attribute_group(&mut self, id: NodeId, element: &Element) -> Result<()> {
        self.scope.push(element);
        for child in element.children() {
            match xs_local(child, "xs:attributeGroup")? {
                "attribute" => {
                    self.attribute_use(id, child)?;
                }
                "attributeGroup" => {
                    let target = self.resolve_value(required(child, "ref")?, child)?;
                    self.reference(id, child, RefTarget::AttributeGroup(target), Cardinality::ONE);
                }
                "annotation" | "anyAttribute" => {}
                _ => {
                    return Err(Error::unclassifiable(
                        &child.name,
                        "xs:attributeGroup",
                        child.position,
                    ));
                }
            }
        }
        self.scope.pop();
        Ok(())
    }

    /// A particle of a content model; annotations produce no node
    fn particle(&mut self, owner: NodeId, item: &Element, context: &str) -> Result<Option<NodeId>> {
        let id = match xs_local(item, context)? {
            "element" => self.local_element(owner, item)?,
            "sequence" => self.model_group(owner, item, Compositor::Sequence)?,
            "choice" => self.model_group(owner, item, Compositor::Choice)?,
            "all" => self.model_group(owner, item, Compositor::All)?,
            "group" => {
                let target = self.resolve_value(required(item, "ref")?, item)?;
                let cardinality = occurs(item)?;
                self.reference(owner, item, RefTarget::Group(target), cardinality)
            }
            "any" => {
                let mut node = SchemaNode::new(NodeKind::Wildcard, None);
                node.cardinality = occurs(item)?;
                node.wildcard_namespace = item.attribute("namespace").map(str::to_string);
                node.position = item.position;
                self.graph.alloc_child(owner, node)
            }
            "annotation" => return Ok(None),
            _ => return Err(Error::unclassifiable(&item.name, context, item.position)),
        };
        Ok(Some(id))
    }

    fn model_group(&mut self, owner: NodeId, item: &Element, compositor: Compositor) -> Result<NodeId> {
        let mut node = SchemaNode::new(NodeKind::Group(compositor), None);
        node.cardinality = occurs(item)?;
        node.position = item.position;
        node.documentation = documentation(item);
        let id = self.graph.alloc_child(owner, node);

        self.scope.push(item);
        let context = format!("xs:{}", item.name.local);
        for child in item.children() {
            self.particle(id, child, &context)?;
        }
        self.scope.pop();
        Ok(id)
    }

    fn local_element(&mut self, owner: NodeId, item: &Element) -> Result<NodeId> {
        let cardinality = occurs(item)?;
        if let Some(value) = item.attribute("ref") {
            let target = self.resolve_value(value, item)?;
            return Ok(self.reference(owner, item, RefTarget::Element(target), cardinality));
        }

        let qualified = match item.attribute("form") {
            Some(form) => form == "qualified",
            None => self.elements_qualified,
        };
        let name = self.local_name(required(item, "name")?, qualified);
        let mut node = SchemaNode::new(NodeKind::Element, Some(name));
        node.cardinality = cardinality;
        node.position = item.position;
        node.documentation = documentation(item);
        let id = self.graph.alloc_child(owner, node);
        self.fill_element(id, item)?;
        Ok(id)
    }

    fn attribute_use(&mut self, owner: NodeId, item: &Element) -> Result<NodeId> {
        let cardinality = match item.attribute("use") {
            Some("required") => Cardinality::ONE,
            Some("prohibited") => Cardinality::new(0, MaxOccurs::Bounded(0)),
            _ => Cardinality::OPTIONAL,
        };
        if let Some(value) = item.attribute("ref") {
            let target = self.resolve_value(value, item)?;
            return Ok(self.reference(owner, item, RefTarget::Attribute(target), cardinality));
        }

        let qualified = match item.attribute("form") {
            Some(form) => form == "qualified",
            None => self.attributes_qualified,
        };
        let name = self.local_name(required(item, "name")?, qualified);
        let mut node = SchemaNode::new(NodeKind::Attribute, Some(name));
        node.cardinality = cardinality;
        node.position = item.position;
        node.documentation = documentation(item);
        let id = self.graph.alloc_child(owner, node);
        self.fill_attribute(id, item)?;
        Ok(id)
    }

    fn reference(
        &mut self,
        owner: NodeId,
        item: &Element,
        target: RefTarget,
        cardinality: Cardinality,
    ) -> NodeId {
        let mut node = SchemaNode::new(NodeKind::Reference, None);
        node.reference = Some(target);
        node.cardinality = cardinality;
        node.position = item.position;
        node.documentation = documentation(item);
        self.graph.alloc_child(owner, node)
    }

    fn anonymous(&mut self, owner: NodeId, kind: NodeKind, item: &Element) -> NodeId {
        let mut node = SchemaNode::new(kind, None);
        node.position = item.position;
        node.documentation = documentation(item);
        self.graph.alloc_child(owner, node)
    }

    fn local_name(&self, local: &str, qualified: bool) -> QName {
        if qualified {
            QName::new(self.target_namespace.as_deref(), local)
        } else {
            QName::local(local)
        }
    }

    fn resolve_value(&self, value: &str, item: &Element) -> Result<QName> {
        self.scope.resolve(value).map_err(|e| match e {
            mitre_xml::Error::UnknownPrefix { prefix, .. } => Error::unresolved(
                SymbolSpace::Type,
                format!("{value} (prefix '{prefix}' is not bound)"),
                item.position,
            ),
            other => Error::Xml(other),
        })
    }

    fn type_ref(&self, value: &str, item: &Element) -> Result<TypeRef> {
        let name = self.resolve_value(value, item)?;
        if name.is_in(XS_NAMESPACE) {
            return XsdType::from_local(&name.local)
                .map(TypeRef::Builtin)
                .ok_or_else(|| Error::unresolved(SymbolSpace::Type, &name, item.position));
        }
        Ok(TypeRef::Named(name))
    }

    // Pass 3

    fn link(&mut self) -> Result<()> {
        for (id, node) in self.graph.nodes() {
            for type_ref in [&node.declared_type, &node.base_type].into_iter().flatten() {
                if let TypeRef::Named(name) = type_ref {
                    if self.graph.type_definition(name).is_none() {
                        return Err(Error::unresolved(SymbolSpace::Type, name, node.position));
                    }
                }
            }
            if let Some(target) = &node.reference {
                let space = match target {
                    RefTarget::Element(_) => SymbolSpace::Element,
                    RefTarget::Attribute(_) => SymbolSpace::Attribute,
                    RefTarget::Group(_) => SymbolSpace::Group,
                    RefTarget::AttributeGroup(_) => SymbolSpace::AttributeGroup,
                };
                if self.graph.lookup(space, target.name()).is_none() {
                    return Err(Error::unresolved(space, target.name(), node.position));
                }
            }
            trace!(node = %id, kind = ?node.kind, "linked");
        }

        let content = build_indices(&self.graph)?;
        self.graph.set_content(content);
        Ok(())
    }
}

fn is_xs(element: &Element, local: &str) -> bool {
    element.name.is_in(XS_NAMESPACE) && element.name.local == local
}

/// Local name of an XSD element; anything outside the XSD namespace is unclassifiable
fn xs_local<'e>(element: &'e Element, context: &str) -> Result<&'e str> {
    if element.name.is_in(XS_NAMESPACE) {
        Ok(element.name.local.as_str())
    } else {
        Err(Error::unclassifiable(&element.name, context, element.position))
    }
}

fn required<'e>(element: &'e Element, attribute: &str) -> Result<&'e str> {
    element
        .attribute(attribute)
        .ok_or_else(|| Error::missing_attribute(&element.name.local, attribute, element.position))
}

fn occurs(element: &Element) -> Result<Cardinality> {
    let invalid = |value: &str| Error::InvalidOccurs {
        value: value.to_string(),
        location: element.position.to_string(),
    };
    let min = match element.attribute("minOccurs") {
        Some(value) => value.trim().parse::<u32>().map_err(|_| invalid(value))?,
        None => 1,
    };
    let max = match element.attribute("maxOccurs") {
        Some("unbounded") => MaxOccurs::Unbounded,
        Some(value) => MaxOccurs::Bounded(value.trim().parse::<u32>().map_err(|_| invalid(value))?),
        None => MaxOccurs::Bounded(1),
    };
    if let MaxOccurs::Bounded(max) = max {
        if min > max {
            return Err(invalid(&format!("{min}..{max}")));
        }
    }
    Ok(Cardinality::new(min, max))
}

fn simple_kind(simple_type: &Element) -> NodeKind {
    let enumerated = simple_type
        .children()
        .filter(|c| is_xs(c, "restriction"))
        .any(|r| r.children().any(|f| is_xs(f, "enumeration")));
    if enumerated {
        NodeKind::Enumeration
    } else {
        NodeKind::SimpleType
    }
}

fn named_group_compositor(group: &Element) -> Result<Compositor> {
    for child in group.children() {
        if child.name.is_in(XS_NAMESPACE) {
            match child.name.local.as_str() {
                "sequence" => return Ok(Compositor::Sequence),
                "choice" => return Ok(Compositor::Choice),
                "all" => return Ok(Compositor::All),
                _ => {}
            }
        }
    }
    Err(Error::unclassifiable(
        "empty xs:group",
        "xs:schema",
        group.position,
    ))
}

/// Text of `xs:annotation/xs:documentation` children, joined by newlines
fn documentation(element: &Element) -> Option<String> {
    let parts: Vec<String> = element
        .children()
        .filter(|c| is_xs(c, "annotation"))
        .flat_map(Element::children)
        .filter(|c| is_xs(c, "documentation"))
        .map(|d| d.text_content().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}
