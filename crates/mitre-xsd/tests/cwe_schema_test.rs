//! Integration tests reading the CWE schema fixture in testdata/cwe.

use mitre_xml::{Document, QName};
use mitre_xsd::{Cardinality, MaxOccurs, NodeKind, ResolvedType, SchemaReader, TypeRef, XsdType, read_schema};
use std::fs;
use std::path::PathBuf;

const CWE: &str = "http://cwe.mitre.org/cwe-7";

fn testdata(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../testdata").join(path)
}

fn cwe(local: &str) -> QName {
    QName::qualified(CWE, local)
}

#[test]
fn test_cwe_schema_reads() -> anyhow::Result<()> {
    let bytes = fs::read(testdata("cwe/cwe_schema.xsd"))?;
    let document = Document::parse(&bytes)?.with_source("cwe_schema.xsd");
    let graph = read_schema(&document)?;

    assert_eq!(graph.target_namespace(), Some(CWE));
    let catalog = graph.element(&cwe("Weakness_Catalog")).expect("root element declared");
    let Some(ResolvedType::Complex(catalog_type)) = graph.type_of(catalog) else {
        panic!("catalog root has an anonymous complex type");
    };
    let content = graph.content(catalog_type).expect("content index");
    assert!(content.element(&cwe("Weaknesses")).is_some());
    assert_eq!(
        graph.type_of(content.attribute(&QName::local("Date")).unwrap().site),
        Some(ResolvedType::Builtin(XsdType::Date))
    );

    let weakness = graph.type_definition(&cwe("WeaknessType")).unwrap();
    let weakness_content = graph.content(weakness).unwrap();
    let abstraction = weakness_content.attribute(&QName::local("Abstraction")).unwrap();
    assert!(matches!(
        graph.type_of(abstraction.site),
        Some(ResolvedType::Enumeration(_))
    ));
    let related = weakness_content.element(&cwe("Related_Weaknesses")).unwrap();
    assert_eq!(related.cardinality, Cardinality::OPTIONAL);

    Ok(())
}

#[test]
fn test_reading_is_deterministic() -> anyhow::Result<()> {
    let bytes = fs::read(testdata("cwe/cwe_schema.xsd"))?;
    let first = SchemaReader::new().read_bytes(&bytes)?;
    let second = SchemaReader::new().read_bytes(&bytes)?;

    assert_eq!(first.len(), second.len());
    for ((a_id, a), (b_id, b)) in first.nodes().zip(second.nodes()) {
        assert_eq!(a_id, b_id);
        assert_eq!(a, b);
    }
    Ok(())
}

#[test]
fn test_every_node_but_top_level_has_one_parent() -> anyhow::Result<()> {
    let bytes = fs::read(testdata("cwe/cwe_schema.xsd"))?;
    let graph = SchemaReader::new().read_bytes(&bytes)?;

    for (id, node) in graph.nodes() {
        match node.parent {
            Some(parent) => {
                let count = graph.node(parent).children.iter().filter(|c| **c == id).count();
                assert_eq!(count, 1, "{} listed once by its parent", graph.describe(id));
            }
            None => assert!(graph.top_level().contains(&id)),
        }
    }
    Ok(())
}

#[test]
fn test_structured_text_wildcard() -> anyhow::Result<()> {
    let bytes = fs::read(testdata("cwe/cwe_schema.xsd"))?;
    let graph = SchemaReader::new().read_bytes(&bytes)?;

    let text = graph.type_definition(&cwe("StructuredTextType")).unwrap();
    let node = graph.node(text);
    assert!(node.mixed);
    let content = graph.content(text).unwrap();
    assert_eq!(content.wildcards.len(), 1);
    assert_eq!(graph.node(content.wildcards[0]).kind, NodeKind::Wildcard);
    assert_eq!(
        graph.node(content.wildcards[0]).cardinality.max,
        MaxOccurs::Unbounded
    );
    Ok(())
}

#[test]
fn test_anonymous_element_type() -> anyhow::Result<()> {
    let bytes = fs::read(testdata("cwe/cwe_schema.xsd"))?;
    let graph = SchemaReader::new().read_bytes(&bytes)?;

    let related = graph.type_definition(&cwe("RelatedWeaknessesType")).unwrap();
    let particle = graph.content(related).unwrap().element(&cwe("Related_Weakness")).unwrap();
    let Some(TypeRef::Anonymous(anonymous)) = graph.node(particle.site).declared_type.clone() else {
        panic!("Related_Weakness declares its type inline");
    };
    assert_eq!(graph.node(anonymous).kind, NodeKind::ComplexType);
    assert_eq!(graph.node(anonymous).parent, Some(particle.site));
    Ok(())
}
