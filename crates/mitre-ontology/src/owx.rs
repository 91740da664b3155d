//! OWL 2 XML serialisation.
//!
//! Entities are written as `#fragment` IRIs relative to the ontology IRI,
//! in name order, so the same model always serialises to the same bytes.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Write;
use tracing::debug;

use crate::model::{Ontology, PropertyKind, Range};
use crate::rules::{Atom, DlSafeRule, Term};
use crate::value::{Datatype, Literal, Value};
use crate::{Error, Result};

const OWL: &str = "http://www.w3.org/2002/07/owl#";
const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const XML: &str = "http://www.w3.org/XML/1998/namespace";
const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
const RULE_ENABLED: &str = "http://swrl.stanford.edu/ontologies/3.3/swrla.owl#isRuleEnabled";
const VARIABLE_BASE: &str = "urn:swrl:var#";

/// Serialise an ontology as OWL/XML into a string
pub fn to_owx(ontology: &Ontology) -> Result<String> {
    let mut buffer = Vec::new();
    write_owx(ontology, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| Error::Xml(e.to_string()))
}

/// Serialise an ontology as OWL/XML
pub fn write_owx<W: Write>(ontology: &Ontology, write: W) -> Result<()> {
    let mut out = OwxWriter {
        writer: Writer::new_with_indent(write, b' ', 4),
    };
    out.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let iri = ontology.iri();
    let mut root = BytesStart::new("Ontology");
    root.push_attribute(("xmlns", OWL));
    root.push_attribute(("xml:base", iri));
    root.push_attribute(("xmlns:rdf", RDF));
    root.push_attribute(("xmlns:xml", XML));
    root.push_attribute(("xmlns:xsd", XSD));
    root.push_attribute(("xmlns:rdfs", RDFS));
    root.push_attribute(("ontologyIRI", iri));
    out.event(Event::Start(root))?;

    for (name, prefix) in [("", iri), ("owl", OWL), ("rdf", RDF), ("xml", XML), ("xsd", XSD), ("rdfs", RDFS)] {
        out.empty("Prefix", &[("name", name), ("IRI", prefix)])?;
    }

    out.declarations(ontology)?;
    out.class_axioms(ontology)?;
    out.property_axioms(ontology)?;
    out.individual_axioms(ontology)?;
    for rule in ontology.rules() {
        out.rule(rule)?;
    }

    out.end("Ontology")?;
    debug!(iri, "wrote OWL/XML");
    Ok(())
}

/// Percent-encode a name into an IRI fragment
fn fragment(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len() + 1);
    encoded.push('#');
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

struct OwxWriter<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> OwxWriter<W> {
    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::Xml(e.to_string()))
    }

    fn start(&mut self, tag: &str) -> Result<()> {
        self.event(Event::Start(BytesStart::new(tag)))
    }

    fn end(&mut self, tag: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(tag)))
    }

    fn empty(&mut self, tag: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let mut element = BytesStart::new(tag);
        for attribute in attributes {
            element.push_attribute(*attribute);
        }
        self.event(Event::Empty(element))
    }

    fn entity(&mut self, tag: &str, name: &str) -> Result<()> {
        self.empty(tag, &[("IRI", fragment(name).as_str())])
    }

    fn text_element(&mut self, tag: &str, attributes: &[(&str, &str)], text: &str) -> Result<()> {
        let mut element = BytesStart::new(tag);
        for attribute in attributes {
            element.push_attribute(*attribute);
        }
        self.event(Event::Start(element))?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end(tag)
    }

    fn literal(&mut self, literal: &Literal) -> Result<()> {
        let datatype = literal.datatype.iri();
        self.text_element("Literal", &[("datatypeIRI", datatype.as_str())], &literal.lexical)
    }

    fn declaration(&mut self, tag: &str, name: &str) -> Result<()> {
        self.start("Declaration")?;
        self.entity(tag, name)?;
        self.end("Declaration")
    }

    fn declarations(&mut self, ontology: &Ontology) -> Result<()> {
        for class in ontology.classes() {
            self.declaration("Class", &class.name)?;
        }
        for property in ontology.properties() {
            self.declaration(property_tag(property.kind()), &property.name)?;
        }
        for individual in ontology.individuals() {
            self.declaration("NamedIndividual", &individual.key)?;
        }
        Ok(())
    }

    fn class_axioms(&mut self, ontology: &Ontology) -> Result<()> {
        for class in ontology.classes() {
            for superclass in &class.superclasses {
                self.start("SubClassOf")?;
                self.entity("Class", &class.name)?;
                self.entity("Class", superclass)?;
                self.end("SubClassOf")?;
            }
            if let Some(comment) = &class.comment {
                self.annotation_assertion("comment", &class.name, comment)?;
            }
        }
        Ok(())
    }

    fn property_axioms(&mut self, ontology: &Ontology) -> Result<()> {
        for property in ontology.properties() {
            let tag = property_tag(property.kind());
            if property.functional {
                let axiom = match property.kind() {
                    PropertyKind::Object => "FunctionalObjectProperty",
                    PropertyKind::Datatype => "FunctionalDataProperty",
                };
                self.start(axiom)?;
                self.entity(tag, &property.name)?;
                self.end(axiom)?;
            }
            if let Some(domain) = &property.domain {
                let axiom = match property.kind() {
                    PropertyKind::Object => "ObjectPropertyDomain",
                    PropertyKind::Datatype => "DataPropertyDomain",
                };
                self.start(axiom)?;
                self.entity(tag, &property.name)?;
                self.entity("Class", domain)?;
                self.end(axiom)?;
            }
            match &property.range {
                Range::Class(class) => {
                    self.start("ObjectPropertyRange")?;
                    self.entity(tag, &property.name)?;
                    self.entity("Class", class)?;
                    self.end("ObjectPropertyRange")?;
                }
                Range::Thing => {}
                Range::Datatype(datatype) => {
                    self.start("DataPropertyRange")?;
                    self.entity(tag, &property.name)?;
                    self.datatype(*datatype)?;
                    self.end("DataPropertyRange")?;
                }
            }
            if let Some(comment) = &property.comment {
                self.annotation_assertion("comment", &property.name, comment)?;
            }
        }
        Ok(())
    }

    fn datatype(&mut self, datatype: Datatype) -> Result<()> {
        let abbreviated = datatype.to_string();
        self.empty("Datatype", &[("abbreviatedIRI", abbreviated.as_str())])
    }

    fn individual_axioms(&mut self, ontology: &Ontology) -> Result<()> {
        for individual in ontology.individuals() {
            for class in &individual.classes {
                self.start("ClassAssertion")?;
                self.entity("Class", class)?;
                self.entity("NamedIndividual", &individual.key)?;
                self.end("ClassAssertion")?;
            }
            for (property, values) in &individual.values {
                for value in values {
                    match value {
                        Value::Individual(target) => {
                            self.start("ObjectPropertyAssertion")?;
                            self.entity("ObjectProperty", property)?;
                            self.entity("NamedIndividual", &individual.key)?;
                            self.entity("NamedIndividual", target)?;
                            self.end("ObjectPropertyAssertion")?;
                        }
                        Value::Literal(literal) => {
                            self.start("DataPropertyAssertion")?;
                            self.entity("DataProperty", property)?;
                            self.entity("NamedIndividual", &individual.key)?;
                            self.literal(literal)?;
                            self.end("DataPropertyAssertion")?;
                        }
                    }
                }
            }
            if let Some(label) = &individual.label {
                self.annotation_assertion("label", &individual.key, label)?;
            }
            if let Some(comment) = &individual.comment {
                self.annotation_assertion("comment", &individual.key, comment)?;
            }
        }
        Ok(())
    }

    fn annotation_assertion(&mut self, rdfs_property: &str, subject: &str, text: &str) -> Result<()> {
        self.start("AnnotationAssertion")?;
        self.empty("AnnotationProperty", &[("abbreviatedIRI", format!("rdfs:{rdfs_property}").as_str())])?;
        self.text_element("IRI", &[], &fragment(subject))?;
        self.text_element("Literal", &[], text)?;
        self.end("AnnotationAssertion")
    }

    fn rule(&mut self, rule: &DlSafeRule) -> Result<()> {
        self.start("DLSafeRule")?;

        self.start("Annotation")?;
        self.empty("AnnotationProperty", &[("IRI", RULE_ENABLED)])?;
        self.literal(&Literal::new("true", Datatype::Boolean))?;
        self.end("Annotation")?;

        self.start("Annotation")?;
        self.empty("AnnotationProperty", &[("abbreviatedIRI", "rdfs:label")])?;
        self.text_element("Literal", &[], &rule.name)?;
        self.end("Annotation")?;

        self.start("Body")?;
        for atom in &rule.body {
            self.atom(atom)?;
        }
        self.end("Body")?;
        self.start("Head")?;
        for atom in &rule.head {
            self.atom(atom)?;
        }
        self.end("Head")?;

        self.end("DLSafeRule")
    }

    fn atom(&mut self, atom: &Atom) -> Result<()> {
        match atom {
            Atom::Class { class, argument } => {
                self.start("ClassAtom")?;
                self.entity("Class", class)?;
                self.term(argument)?;
                self.end("ClassAtom")
            }
            Atom::ObjectProperty {
                property,
                subject,
                object,
            } => {
                self.start("ObjectPropertyAtom")?;
                self.entity("ObjectProperty", property)?;
                self.term(subject)?;
                self.term(object)?;
                self.end("ObjectPropertyAtom")
            }
            Atom::DataProperty {
                property,
                subject,
                object,
            } => {
                self.start("DataPropertyAtom")?;
                self.entity("DataProperty", property)?;
                self.term(subject)?;
                self.term(object)?;
                self.end("DataPropertyAtom")
            }
        }
    }

    fn term(&mut self, term: &Term) -> Result<()> {
        match term {
            Term::Variable(name) => self.empty("Variable", &[("IRI", format!("{VARIABLE_BASE}{name}").as_str())]),
            Term::Individual(key) => self.entity("NamedIndividual", key),
        }
    }
}

fn property_tag(kind: PropertyKind) -> &'static str {
    match kind {
        PropertyKind::Object => "ObjectProperty",
        PropertyKind::Datatype => "DataProperty",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Ontology {
        let mut ontology = Ontology::new("https://owl.caprica-project.org/cwe");
        ontology.ensure_class("Weakness", Vec::<String>::new()).comment = Some("A weakness".into());
        ontology
            .ensure_property("hasName", Some("Weakness"), Range::Datatype(Datatype::String), true)
            .unwrap();
        ontology
            .ensure_property("relatedTo", Some("Weakness"), Range::Class("Weakness".into()), false)
            .unwrap();
        ontology.ensure_individual("CWE-79", "Weakness").unwrap();
        ontology.ensure_individual("CWE-74", "Weakness").unwrap();
        ontology
            .assert_value("CWE-79", "hasName", Literal::string("Cross-site <Scripting>").into())
            .unwrap();
        ontology
            .assert_value("CWE-79", "relatedTo", Value::individual("CWE-74"))
            .unwrap();
        ontology.label_individual("CWE-79", "Cross-site Scripting").unwrap();
        ontology
    }

    #[test]
    fn test_fragment_encoding() {
        assert_eq!(fragment("CWE-79"), "#CWE-79");
        assert_eq!(fragment("a b/c"), "#a%20b%2Fc");
        assert_eq!(fragment("É"), "#%C3%89");
    }

    #[test]
    fn test_header_and_prefixes() {
        let owx = to_owx(&sample()).unwrap();
        assert!(owx.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(owx.contains("xml:base=\"https://owl.caprica-project.org/cwe\""));
        assert!(owx.contains("ontologyIRI=\"https://owl.caprica-project.org/cwe\""));
        assert!(owx.contains("<Prefix name=\"\" IRI=\"https://owl.caprica-project.org/cwe\"/>"));
        assert!(owx.contains("<Prefix name=\"xsd\" IRI=\"http://www.w3.org/2001/XMLSchema#\"/>"));
        assert!(owx.trim_end().ends_with("</Ontology>"));
    }

    #[test]
    fn test_axioms_are_written() {
        let owx = to_owx(&sample()).unwrap();
        assert!(owx.contains("<Class IRI=\"#Weakness\"/>"));
        assert!(owx.contains("<FunctionalDataProperty>"));
        assert!(owx.contains("<Datatype abbreviatedIRI=\"xsd:string\"/>"));
        assert!(owx.contains("<ObjectPropertyAssertion>"));
        assert!(owx.contains("Cross-site &lt;Scripting&gt;"));
        assert!(owx.contains("<AnnotationProperty abbreviatedIRI=\"rdfs:label\"/>"));
        assert!(owx.contains("<AnnotationProperty abbreviatedIRI=\"rdfs:comment\"/>"));
        assert!(!owx.contains("<FunctionalObjectProperty>"));
    }

    #[test]
    fn test_rule_serialisation() {
        let mut ontology = sample();
        ontology
            .add_rule(DlSafeRule::new(
                "relatedTo",
                vec![Atom::class("Weakness", Term::var("w"))],
                vec![Atom::object("relatedTo", Term::var("w"), Term::individual("CWE-74"))],
            ))
            .unwrap();
        let owx = to_owx(&ontology).unwrap();
        assert!(owx.contains(RULE_ENABLED));
        assert!(owx.contains("<Variable IRI=\"urn:swrl:var#w\"/>"));
        assert!(owx.contains("<ClassAtom>"));
        assert!(owx.contains("<Literal>relatedTo</Literal>"));
    }

    #[test]
    fn test_output_is_deterministic() {
        assert_eq!(to_owx(&sample()).unwrap(), to_owx(&sample()).unwrap());
    }
}
