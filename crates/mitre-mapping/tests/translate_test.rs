//! End-to-end tests: schema graph to rules to ontology.

use mitre_mapping::{
    IdentityPolicy, TranslationProfile, TranslationStats, Translator, infer_rules, materialize,
};
use mitre_ontology::{Datatype, Literal, Ontology, Range, Triple, Value, WarningCode};
use mitre_xml::Document;
use mitre_xsd::SchemaReader;
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

fn testdata(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../testdata").join(path)
}

/// Build an ontology from a schema and translate documents into it in order
fn translate(
    schema: &[u8],
    documents: &[&str],
    profile: &TranslationProfile,
) -> anyhow::Result<(Ontology, Vec<TranslationStats>)> {
    let graph = SchemaReader::new().read_bytes(schema)?;
    let rules = infer_rules(&graph, profile)?;
    let mut ontology = Ontology::new("https://example.org/test");
    materialize(&rules, &mut ontology)?;
    let translator = Translator::new(&graph, &rules, profile);
    let mut stats = Vec::new();
    for data in documents {
        let document = Document::parse_str(data)?;
        stats.push(translator.translate(&document, &mut ontology)?);
    }
    Ok((ontology, stats))
}

fn triple_set(ontology: &Ontology) -> BTreeSet<Triple> {
    ontology.triples().into_iter().collect()
}

const WEAKNESS_SCHEMA: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
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
    </xs:complexType>
</xs:schema>"#;

const PAIR: &str = r#"<Weaknesses>
    <Weakness id="w1"><Name>A</Name><RelatedWeakness>w2</RelatedWeakness></Weakness>
    <Weakness id="w2"><Name>B</Name></Weakness>
</Weaknesses>"#;

#[test]
fn test_weakness_pair() -> anyhow::Result<()> {
    let (ontology, stats) = translate(
        WEAKNESS_SCHEMA.as_bytes(),
        &[PAIR],
        &TranslationProfile::default(),
    )?;
    assert_eq!(stats[0].individuals_created, 2);
    assert_eq!(ontology.individuals_of("Weakness").count(), 2);

    let name = ontology.property("Name").expect("Name declared");
    assert!(name.functional);
    assert_eq!(name.range, Range::Datatype(Datatype::String));

    let related: Vec<Triple> = ontology
        .triples()
        .into_iter()
        .filter(|t| t.predicate == "RelatedWeakness")
        .collect();
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].subject, "Weakness-w1");
    assert_eq!(related[0].object, Value::individual("Weakness-w2"));

    let first = ontology.individual("Weakness-w1").unwrap();
    assert_eq!(first.values_of("Name"), &[Value::Literal(Literal::string("A"))]);
    assert!(ontology.warnings().is_empty());
    Ok(())
}

#[test]
fn test_dangling_reference_is_a_warning() -> anyhow::Result<()> {
    let data = r#"<Weaknesses><Weakness id="w1"><Name>A</Name><RelatedWeakness>w9</RelatedWeakness></Weakness></Weaknesses>"#;
    let (ontology, stats) = translate(
        WEAKNESS_SCHEMA.as_bytes(),
        &[data],
        &TranslationProfile::default(),
    )?;
    assert_eq!(stats[0].references_dangling, 1);
    assert_eq!(ontology.warnings().len(), 1);
    assert_eq!(ontology.warnings()[0].code, WarningCode::DanglingReference);
    assert!(ontology.warnings()[0].message.contains("w9"));
    assert!(ontology.individual("Weakness-w1").unwrap().values_of("RelatedWeakness").is_empty());
    Ok(())
}

#[test]
fn test_output_is_deterministic() -> anyhow::Result<()> {
    let profile = TranslationProfile::default();
    let (first, _) = translate(WEAKNESS_SCHEMA.as_bytes(), &[PAIR], &profile)?;
    let (second, _) = translate(WEAKNESS_SCHEMA.as_bytes(), &[PAIR], &profile)?;
    assert_eq!(first.to_json_pretty()?, second.to_json_pretty()?);
    assert_eq!(mitre_ontology::to_owx(&first)?, mitre_ontology::to_owx(&second)?);
    Ok(())
}

#[test]
fn test_later_documents_only_add() -> anyhow::Result<()> {
    let more = r#"<Weaknesses><Weakness id="w3"><Name>C</Name><RelatedWeakness>w1</RelatedWeakness></Weakness></Weaknesses>"#;
    let profile = TranslationProfile::default();
    let (before, _) = translate(WEAKNESS_SCHEMA.as_bytes(), &[PAIR], &profile)?;
    let (after, stats) = translate(WEAKNESS_SCHEMA.as_bytes(), &[PAIR, more], &profile)?;

    assert!(triple_set(&before).is_subset(&triple_set(&after)));
    // `w1` is known from the first document
    assert_eq!(stats[1].references_resolved, 1);
    assert_eq!(after.individuals_of("Weakness").count(), 3);
    Ok(())
}

#[test]
fn test_document_order_does_not_matter() -> anyhow::Result<()> {
    let other = r#"<Weaknesses>
        <Weakness id="w3"><Name>C</Name><RelatedWeakness>w2</RelatedWeakness></Weakness>
        <Weakness id="w2"><Name>B</Name></Weakness>
    </Weaknesses>"#;
    let profile = TranslationProfile::default();
    let (forward, _) = translate(WEAKNESS_SCHEMA.as_bytes(), &[PAIR, other], &profile)?;
    let (backward, _) = translate(WEAKNESS_SCHEMA.as_bytes(), &[other, PAIR], &profile)?;
    assert_eq!(triple_set(&forward), triple_set(&backward));
    Ok(())
}

const PARAMETER_SCHEMA: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:element name="Parameters">
        <xs:complexType><xs:sequence>
            <xs:element name="Parameter" type="ParameterType" maxOccurs="unbounded"/>
        </xs:sequence></xs:complexType>
    </xs:element>
    <xs:complexType name="ParameterType">
        <xs:choice>
            <xs:element name="StringValue" type="xs:string"/>
            <xs:element name="IntValue" type="xs:integer"/>
        </xs:choice>
    </xs:complexType>
</xs:schema>"#;

#[test]
fn test_choice_branches_type_individuals() -> anyhow::Result<()> {
    let data = r#"<Parameters>
        <Parameter><StringValue>fast</StringValue></Parameter>
        <Parameter><IntValue>007</IntValue></Parameter>
    </Parameters>"#;
    let (ontology, _) = translate(
        PARAMETER_SCHEMA.as_bytes(),
        &[data],
        &TranslationProfile::default(),
    )?;

    assert!(ontology.class("Parameter").unwrap().is_abstract);
    assert_eq!(ontology.individuals_of("Parameter").count(), 2);
    let strings: Vec<_> = ontology.individuals_of("Parameter_StringValue").collect();
    let ints: Vec<_> = ontology.individuals_of("Parameter_IntValue").collect();
    assert_eq!(strings.len(), 1);
    assert_eq!(ints.len(), 1);
    assert_eq!(
        ints[0].values_of("IntValue"),
        &[Value::Literal(Literal::new("7", Datatype::Integer))]
    );
    Ok(())
}

#[test]
fn test_content_identity_merges_duplicates() -> anyhow::Result<()> {
    let data = r#"<Parameters>
        <Parameter><IntValue>1</IntValue></Parameter>
        <Parameter><IntValue>1</IntValue></Parameter>
        <Parameter><IntValue>2</IntValue></Parameter>
    </Parameters>"#;
    let content = TranslationProfile {
        identity: IdentityPolicy::Content,
        ..TranslationProfile::default()
    };
    let (merged, _) = translate(PARAMETER_SCHEMA.as_bytes(), &[data], &content)?;
    assert_eq!(merged.individuals_of("Parameter").count(), 2);

    let (separate, _) = translate(
        PARAMETER_SCHEMA.as_bytes(),
        &[data],
        &TranslationProfile::default(),
    )?;
    assert_eq!(separate.individuals_of("Parameter").count(), 3);
    Ok(())
}

fn cwe_profile() -> TranslationProfile {
    TranslationProfile {
        id_attributes: vec!["ID".into()],
        reference_attributes: vec!["CWE_ID".into()],
        label_attributes: vec!["Name".into()],
        key_prefixes: [
            ("Weakness".to_string(), "CWE".to_string()),
            ("Category".to_string(), "CWE".to_string()),
        ]
        .into(),
        transparent_types: vec!["MemberType".into(), "RelationshipsType".into()],
        property_prefix: "has".into(),
        ..TranslationProfile::default()
    }
}

#[test]
fn test_cwe_fixture() -> anyhow::Result<()> {
    let schema = fs::read(testdata("cwe/cwe_schema.xsd"))?;
    let data = fs::read_to_string(testdata("cwe/cwe_catalog.xml"))?;
    let (ontology, stats) = translate(&schema, &[&data], &cwe_profile())?;
    let stats = stats[0];

    assert_eq!(stats.references_resolved, 3);
    assert_eq!(stats.references_dangling, 2);
    assert_eq!(ontology.warnings().len(), 2);
    assert!(ontology
        .warnings()
        .iter()
        .all(|w| w.code == WarningCode::DanglingReference));

    let xss = ontology.individual("CWE-79").expect("CWE-79 translated");
    assert!(xss.classes.contains("Weakness"));
    assert!(xss.label.as_deref().unwrap().starts_with("Improper Neutralization of Input"));
    assert_eq!(
        xss.values_of("hasLikelihoodOfExploit"),
        &[Value::individual("LikelihoodEnumeration-High")]
    );
    assert_eq!(
        xss.values_of("hasSubmissionDate"),
        &[Value::Literal(Literal::new("2006-07-19", Datatype::Date))]
    );
    assert_eq!(xss.values_of("hasRelatedWeakness").len(), 2);

    let category = ontology.individual("CWE-1019").expect("category translated");
    assert_eq!(
        category.values_of("hasCWEID"),
        &[Value::individual("CWE-79"), Value::individual("CWE-74")]
    );

    let reference = ontology.property("hasCWEID").unwrap();
    assert_eq!(reference.range, Range::Thing);
    assert!(!reference.functional);
    assert_eq!(ontology.individuals_of("RelatedWeakness").count(), 3);
    assert!(ontology.individual("AbstractionEnumeration-Class").is_some());
    Ok(())
}

fn prefixed() -> TranslationProfile {
    TranslationProfile {
        property_prefix: "has".into(),
        ..TranslationProfile::default()
    }
}

const CATALOG_SCHEMA: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:element name="Catalog">
        <xs:complexType><xs:sequence>
            <xs:element name="Weakness" type="Weakness" maxOccurs="unbounded"/>
            <xs:element name="Category" type="Category" maxOccurs="unbounded"/>
        </xs:sequence></xs:complexType>
    </xs:element>
    <xs:complexType name="Weakness">
        <xs:sequence>
            <xs:element name="Name" type="xs:string"/>
            <xs:element name="Submitted" type="xs:date" minOccurs="0"/>
        </xs:sequence>
        <xs:attribute name="id" type="xs:ID" use="required"/>
    </xs:complexType>
    <xs:complexType name="Category">
        <xs:sequence>
            <xs:element name="Summary" type="xs:string"/>
        </xs:sequence>
        <xs:attribute name="id" type="xs:ID" use="required"/>
    </xs:complexType>
</xs:schema>"#;

#[test]
fn test_id_claimed_by_two_keys_is_a_warning() -> anyhow::Result<()> {
    let data = r#"<Catalog>
        <Weakness id="7"><Name>A</Name></Weakness>
        <Weakness id="8"><Name>B</Name></Weakness>
        <Category id="7"><Summary>C</Summary></Category>
    </Catalog>"#;
    let (ontology, stats) = translate(
        CATALOG_SCHEMA.as_bytes(),
        &[data],
        &prefixed(),
    )?;

    let codes: Vec<WarningCode> = ontology.warnings().iter().map(|w| w.code).collect();
    assert_eq!(codes, vec![WarningCode::DuplicateId]);
    assert!(ontology.warnings()[0].message.contains("'7'"));
    assert!(ontology.warnings()[0].location.is_some());

    // the first claim wins, and both individuals are still translated
    assert_eq!(ontology.lookup_id("7"), Some("Weakness-7"));
    assert!(ontology.individual("Category-7").is_some());
    assert_eq!(
        ontology.individual("Weakness-8").unwrap().values_of("hasName"),
        &[Value::Literal(Literal::string("B"))]
    );
    assert!(stats[0].individuals_created >= 3);
    Ok(())
}

#[test]
fn test_non_ascii_date_is_an_invalid_literal() -> anyhow::Result<()> {
    let data = r#"<Catalog>
        <Weakness id="1"><Name>Überlauf</Name><Submitted>éééééa</Submitted></Weakness>
        <Weakness id="2"><Name>B</Name><Submitted>2006-07-1é</Submitted></Weakness>
        <Weakness id="3"><Name>C</Name><Submitted>2006-07-19</Submitted></Weakness>
        <Category id="4"><Summary>D</Summary></Category>
    </Catalog>"#;
    let (ontology, _) = translate(
        CATALOG_SCHEMA.as_bytes(),
        &[data],
        &prefixed(),
    )?;

    let codes: Vec<WarningCode> = ontology.warnings().iter().map(|w| w.code).collect();
    assert_eq!(codes, vec![WarningCode::InvalidLiteral, WarningCode::InvalidLiteral]);

    let first = ontology.individual("Weakness-1").expect("translation continued");
    assert!(first.values_of("hasSubmitted").is_empty());
    assert_eq!(first.values_of("hasName"), &[Value::Literal(Literal::string("Überlauf"))]);
    assert_eq!(
        ontology.individual("Weakness-3").unwrap().values_of("hasSubmitted"),
        &[Value::Literal(Literal::new("2006-07-19", Datatype::Date))]
    );
    assert!(ontology.individual("Category-4").is_some());
    Ok(())
}

const LINK_SCHEMA: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:element name="Links">
        <xs:complexType><xs:sequence>
            <xs:element name="Link" type="Link" maxOccurs="unbounded"/>
        </xs:sequence></xs:complexType>
    </xs:element>
    <xs:complexType name="Link">
        <xs:attribute name="Nature" type="NatureEnumeration"/>
    </xs:complexType>
    <xs:simpleType name="NatureEnumeration">
        <xs:restriction base="xs:string">
            <xs:enumeration value="Peer Of"/>
            <xs:enumeration value="PeerOf"/>
        </xs:restriction>
    </xs:simpleType>
</xs:schema>"#;

#[test]
fn test_literals_with_equal_slugs_stay_apart() -> anyhow::Result<()> {
    let data = r#"<Links><Link Nature="Peer Of"/><Link Nature="PeerOf"/></Links>"#;
    let (ontology, _) = translate(
        LINK_SCHEMA.as_bytes(),
        &[data],
        &prefixed(),
    )?;
    assert_eq!(ontology.individuals_of("NatureEnumeration").count(), 2);

    let natures: BTreeSet<Value> = ontology
        .individuals_of("Link")
        .flat_map(|link| link.values_of("hasNature").iter().cloned())
        .collect();
    assert_eq!(
        natures,
        BTreeSet::from([
            Value::individual("NatureEnumeration-PeerOf"),
            Value::individual("NatureEnumeration-PeerOf2"),
        ])
    );
    assert!(ontology.warnings().is_empty());
    Ok(())
}
