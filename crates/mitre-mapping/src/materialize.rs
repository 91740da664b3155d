//! Rule set to ontology schema
//!
//! Classes go in first so that properties and enumeration individuals can
//! refer to them. Only shapes that produce individuals become classes.

use mitre_ontology::{Ontology, Warning, WarningCode};
use tracing::{info, warn};

use crate::rules::{PropertyRule, RuleSet, RuleTarget};
use crate::Result;

/// Declare the classes, properties and enumeration individuals of a rule set
///
/// Naming conflicts recorded during inference are copied into the ontology
/// as warnings. A property requested twice with different ranges is skipped
/// with a rule-conflict warning.
///
/// # Errors
///
/// Returns an ontology error if an enumeration individual cannot be created.
pub fn materialize(rules: &RuleSet, ontology: &mut Ontology) -> Result<()> {
    for warning in rules.warnings() {
        ontology.warn(warning.clone());
    }

    for rule in rules.iter() {
        match &rule.target {
            RuleTarget::OwlClass(class) if class.shape.has_individuals() => {
                let declared = ontology.ensure_class(&class.class, &class.superclasses);
                declared.is_abstract |= class.is_abstract;
                if declared.comment.is_none() {
                    declared.comment.clone_from(&class.comment);
                }
                for branch in &class.branches {
                    ontology.ensure_class(&branch.class, [class.class.as_str()]);
                }
            }
            RuleTarget::NamedIndividual(enumeration) => {
                ontology.ensure_class(&enumeration.class, std::iter::empty::<String>());
            }
            _ => {}
        }
    }

    let mut literals = 0;
    for rule in rules.iter() {
        let RuleTarget::NamedIndividual(enumeration) = &rule.target else {
            continue;
        };
        for literal in &enumeration.literals {
            let individual = ontology.ensure_individual(&literal.key, &enumeration.class)?;
            if individual.comment.is_none() {
                individual.comment.clone_from(&literal.comment);
            }
            ontology.label_individual(&literal.key, &literal.value)?;
            literals += 1;
        }
    }

    for rule in rules.iter() {
        match &rule.target {
            RuleTarget::ObjectProperty(property) | RuleTarget::DatatypeProperty(property) => {
                declare(ontology, property);
            }
            RuleTarget::OwlClass(class) => {
                if let Some(property) = &class.value_property {
                    declare(ontology, property);
                }
            }
            _ => {}
        }
    }

    info!(
        classes = ontology.classes().count(),
        properties = ontology.properties().count(),
        literals,
        "materialized rule set"
    );
    Ok(())
}

fn declare(ontology: &mut Ontology, rule: &PropertyRule) {
    match ontology.ensure_property(
        &rule.property,
        rule.domain.as_deref(),
        rule.range.to_range(),
        rule.functional,
    ) {
        Ok(property) => {
            if property.comment.is_none() {
                property.comment.clone_from(&rule.comment);
            }
        }
        Err(error) => {
            warn!(%error, property = %rule.property, "property skipped");
            ontology.warn(Warning::new(WarningCode::RuleConflict, error.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TranslationProfile, infer_rules};
    use mitre_ontology::{PropertyKind, Range};
    use mitre_xsd::SchemaReader;

    fn build(schema: &str) -> Ontology {
        let graph = SchemaReader::new().read_bytes(schema.as_bytes()).unwrap();
        let rules = infer_rules(&graph, &TranslationProfile::default()).unwrap();
        let mut ontology = Ontology::new("https://example.org/test");
        materialize(&rules, &mut ontology).unwrap();
        ontology
    }

    const SCHEMA: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
        <xs:complexType name="ParameterType">
            <xs:choice>
                <xs:element name="StringValue" type="xs:string"/>
                <xs:element name="IntValue" type="xs:integer"/>
            </xs:choice>
            <xs:attribute name="Nature" type="NatureEnumeration"/>
        </xs:complexType>
        <xs:complexType name="NoteType">
            <xs:simpleContent>
                <xs:extension base="xs:string">
                    <xs:attribute name="Type" type="xs:string"/>
                </xs:extension>
            </xs:simpleContent>
        </xs:complexType>
        <xs:simpleType name="NatureEnumeration">
            <xs:restriction base="xs:string">
                <xs:enumeration value="ChildOf"/>
                <xs:enumeration value="Peer Of"/>
            </xs:restriction>
        </xs:simpleType>
    </xs:schema>"#;

    #[test]
    fn test_classes_and_branches() {
        let ontology = build(SCHEMA);
        let parameter = ontology.class("Parameter").unwrap();
        assert!(parameter.is_abstract);
        let branch = ontology.class("Parameter_IntValue").unwrap();
        assert!(branch.superclasses.contains("Parameter"));
        assert!(ontology.class("Note").is_some());
    }

    #[test]
    fn test_enumeration_individuals_are_labelled() {
        let ontology = build(SCHEMA);
        let peer = ontology.individual("NatureEnumeration-PeerOf").unwrap();
        assert!(peer.classes.contains("NatureEnumeration"));
        assert_eq!(peer.label.as_deref(), Some("Peer Of"));
        assert_eq!(ontology.individuals_of("NatureEnumeration").count(), 2);
    }

    #[test]
    fn test_properties() {
        let ontology = build(SCHEMA);
        let nature = ontology.property("Nature").unwrap();
        assert_eq!(nature.kind(), PropertyKind::Object);
        assert_eq!(nature.range, Range::Class("NatureEnumeration".into()));

        let value = ontology.property("Value").unwrap();
        assert_eq!(value.domain.as_deref(), Some("Note"));
        assert!(value.functional);
        assert_eq!(value.kind(), PropertyKind::Datatype);
    }

    #[test]
    fn test_naming_conflicts_become_warnings() {
        let ontology = build(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:complexType name="FooType"><xs:attribute name="A" type="xs:string"/></xs:complexType>
                <xs:complexType name="Foo"><xs:attribute name="B" type="xs:string"/></xs:complexType>
            </xs:schema>"#,
        );
        assert_eq!(ontology.warnings().len(), 1);
        assert_eq!(ontology.warnings()[0].code, WarningCode::RuleConflict);
        assert!(ontology.property("A").is_some());
        assert!(ontology.property("B").is_none());
    }
}
