//! Schema node model
#![allow(clippy::must_use_candidate)] // Accessor API intentionally omits pervasive #[must_use].

use mitre_xml::{Position, QName};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a node in the schema arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Model group compositor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compositor {
    Sequence,
    Choice,
    All,
}

/// Kind of schema construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    /// `xs:element` declaration
    Element,
    /// `xs:attribute` declaration
    Attribute,
    /// `xs:complexType`
    ComplexType,
    /// `xs:simpleType` without enumeration facets
    SimpleType,
    /// `xs:simpleType` restricted by enumeration facets
    Enumeration,
    /// Model group (`xs:sequence`, `xs:choice`, `xs:all`, or a named `xs:group`)
    Group(Compositor),
    /// Named `xs:attributeGroup`
    AttributeGroup,
    /// `ref=` use of a global element, attribute, group or attribute group
    Reference,
    /// `xs:any`
    Wildcard,
}

impl NodeKind {
    /// Check for a model group of any compositor
    pub fn is_group(self) -> bool {
        matches!(self, Self::Group(_))
    }

    /// Check for a choice group
    pub fn is_choice(self) -> bool {
        matches!(self, Self::Group(Compositor::Choice))
    }
}

/// Upper occurrence bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

impl MaxOccurs {
    /// Product of two bounds, as for a particle nested in a repeated group
    pub fn multiply(self, other: MaxOccurs) -> MaxOccurs {
        match (self, other) {
            (Self::Bounded(0), _) | (_, Self::Bounded(0)) => Self::Bounded(0),
            (Self::Bounded(a), Self::Bounded(b)) => Self::Bounded(a.saturating_mul(b)),
            _ => Self::Unbounded,
        }
    }

    /// Sum of two bounds, as for a name appearing twice in one content model
    pub fn add(self, other: MaxOccurs) -> MaxOccurs {
        match (self, other) {
            (Self::Bounded(a), Self::Bounded(b)) => Self::Bounded(a.saturating_add(b)),
            _ => Self::Unbounded,
        }
    }

    /// Check whether more than one occurrence is allowed
    pub fn is_many(self) -> bool {
        match self {
            Self::Bounded(n) => n > 1,
            Self::Unbounded => true,
        }
    }
}

impl fmt::Display for MaxOccurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(n) => write!(f, "{n}"),
            Self::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// Occurrence bounds of a particle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cardinality {
    pub min: u32,
    pub max: MaxOccurs,
}

impl Cardinality {
    /// Exactly once
    pub const ONE: Cardinality = Cardinality {
        min: 1,
        max: MaxOccurs::Bounded(1),
    };

    /// Zero or one
    pub const OPTIONAL: Cardinality = Cardinality {
        min: 0,
        max: MaxOccurs::Bounded(1),
    };

    /// Create bounds
    pub fn new(min: u32, max: MaxOccurs) -> Self {
        Self { min, max }
    }

    /// Check whether more than one occurrence is allowed
    pub fn is_many(&self) -> bool {
        self.max.is_many()
    }
}

impl Default for Cardinality {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.min, self.max)
    }
}

/// Built-in XSD datatypes, folded to the handful the translator distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum XsdType {
    String,
    Token,
    AnyUri,
    Boolean,
    Decimal,
    Double,
    Integer,
    Date,
    DateTime,
    Time,
    GYear,
    GMonth,
    GDay,
    Id,
    IdRef,
    IdRefs,
    AnySimpleType,
    AnyType,
}

impl XsdType {
    /// Map the local name of a type in the XSD namespace
    pub fn from_local(local: &str) -> Option<XsdType> {
        let ty = match local {
            "string" | "normalizedString" | "language" | "Name" | "NCName" | "QName"
            | "NOTATION" | "NMTOKEN" | "NMTOKENS" | "ENTITY" | "ENTITIES" | "duration"
            | "gYearMonth" | "gMonthDay" | "base64Binary" | "hexBinary" => Self::String,
            "token" => Self::Token,
            "anyURI" => Self::AnyUri,
            "boolean" => Self::Boolean,
            "decimal" => Self::Decimal,
            "float" | "double" => Self::Double,
            "integer" | "int" | "long" | "short" | "byte" | "nonNegativeInteger"
            | "positiveInteger" | "nonPositiveInteger" | "negativeInteger" | "unsignedLong"
            | "unsignedInt" | "unsignedShort" | "unsignedByte" => Self::Integer,
            "date" => Self::Date,
            "dateTime" | "dateTimeStamp" => Self::DateTime,
            "time" => Self::Time,
            "gYear" => Self::GYear,
            "gMonth" => Self::GMonth,
            "gDay" => Self::GDay,
            "ID" => Self::Id,
            "IDREF" => Self::IdRef,
            "IDREFS" => Self::IdRefs,
            "anySimpleType" | "anyAtomicType" => Self::AnySimpleType,
            "anyType" => Self::AnyType,
            _ => return None,
        };
        Some(ty)
    }

    /// Check for `xs:IDREF` or `xs:IDREFS`
    pub fn is_reference(self) -> bool {
        matches!(self, Self::IdRef | Self::IdRefs)
    }
}

/// Reference to the type of an element, attribute or derivation base
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeRef {
    /// Built-in XSD type
    Builtin(XsdType),
    /// Named type, resolved lazily through the type table
    Named(QName),
    /// Anonymous type declared inline; the node is a child of the declaration
    Anonymous(NodeId),
}

/// Derivation method of a type from its base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Derivation {
    Extension,
    Restriction,
}

/// Target of a `ref=` node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RefTarget {
    Element(QName),
    Attribute(QName),
    Group(QName),
    AttributeGroup(QName),
}

impl RefTarget {
    /// Referenced name
    pub fn name(&self) -> &QName {
        match self {
            Self::Element(name)
            | Self::Attribute(name)
            | Self::Group(name)
            | Self::AttributeGroup(name) => name,
        }
    }
}

/// One `xs:enumeration` facet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumLiteral {
    pub value: String,
    pub documentation: Option<String>,
}

/// One XSD construct in the schema graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaNode {
    /// Declared name; `None` for anonymous types, groups, references and wildcards
    pub name: Option<QName>,

    /// Construct kind
    pub kind: NodeKind,

    /// Occurrence bounds at the declaring site
    pub cardinality: Cardinality,

    /// Type of an element or attribute
    pub declared_type: Option<TypeRef>,

    /// Base of a derived type (restriction base, extension base)
    pub base_type: Option<TypeRef>,

    /// How a derived type relates to its base
    pub derivation: Option<Derivation>,

    /// Ordered children: attributes and content model of a type, particles of a group
    pub children: Vec<NodeId>,

    /// Declaring parent; `None` for top-level components
    pub parent: Option<NodeId>,

    /// Target of a reference node
    pub reference: Option<RefTarget>,

    /// Literals of an enumeration
    pub literals: Vec<EnumLiteral>,

    /// `abstract="true"`
    pub is_abstract: bool,

    /// `mixed="true"` on a complex type
    pub mixed: bool,

    /// Complex type with `xs:simpleContent`
    pub simple_content: bool,

    /// Namespace constraint of a wildcard
    pub wildcard_namespace: Option<String>,

    /// Text of `xs:annotation/xs:documentation`
    pub documentation: Option<String>,

    /// Position of the declaring XSD element
    pub position: Position,
}

impl SchemaNode {
    /// Create a node of the given kind with default bounds
    pub fn new(kind: NodeKind, name: Option<QName>) -> Self {
        Self {
            name,
            kind,
            cardinality: Cardinality::ONE,
            declared_type: None,
            base_type: None,
            derivation: None,
            children: Vec::new(),
            parent: None,
            reference: None,
            literals: Vec::new(),
            is_abstract: false,
            mixed: false,
            simple_content: false,
            wildcard_namespace: None,
            documentation: None,
            position: Position::default(),
        }
    }

    /// Local part of the name, or the empty string
    pub fn local_name(&self) -> &str {
        self.name.as_ref().map_or("", |n| n.local.as_str())
    }

    /// Check for a top-level component
    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }
}
