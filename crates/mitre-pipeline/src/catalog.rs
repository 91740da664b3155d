//! The three MITRE catalogs
//!
//! Each catalog knows where its published schema and data live, how its
//! ontology is named, and which profile adjustments and DL-safe rules apply
//! to it.

use mitre_mapping::TranslationProfile;
use mitre_ontology::{Atom, DlSafeRule, Ontology, Range, Term};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::config::OutputFormat;

const LABEL_ATTRIBUTES: [&str; 5] = ["Name", "name", "Title", "Term", "Entry_Name"];

/// Relationship natures that get their own rule, besides `relatedTo`
const RELATIONS: [&str; 7] = [
    "canAlsoBe",
    "canFollow",
    "canPrecede",
    "childOf",
    "peerOf",
    "requires",
    "startsWith",
];

/// A MITRE catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Catalog {
    /// Common Attack Pattern Enumeration and Classification
    Capec,
    /// Common Vulnerabilities and Exposures
    Cve,
    /// Common Weakness Enumeration
    Cwe,
}

impl Catalog {
    pub const ALL: [Catalog; 3] = [Self::Capec, Self::Cve, Self::Cwe];

    /// Upper-case catalog name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Capec => "CAPEC",
            Self::Cve => "CVE",
            Self::Cwe => "CWE",
        }
    }

    #[must_use]
    pub fn schema_url(self) -> &'static str {
        match self {
            Self::Capec => "https://capec.mitre.org/data/xsd/ap_schema_latest.xsd",
            Self::Cve => "https://cve.mitre.org/schema/cve/cve_1.0.xsd",
            Self::Cwe => "https://cwe.mitre.org/data/xsd/cwe_schema_latest.xsd",
        }
    }

    #[must_use]
    pub fn data_url(self) -> &'static str {
        match self {
            Self::Capec => "https://capec.mitre.org/data/xml/capec_latest.xml",
            Self::Cve => "https://cve.mitre.org/data/downloads/allitems.xml",
            Self::Cwe => "https://cwe.mitre.org/data/xml/cwec_latest.xml.zip",
        }
    }

    /// Ontology IRI
    #[must_use]
    pub fn iri(self) -> String {
        format!(
            "https://owl.caprica-project.org/{}",
            self.name().to_ascii_lowercase()
        )
    }

    /// Output file name, e.g. `CWE.owx`
    #[must_use]
    pub fn file_name(self, format: OutputFormat) -> String {
        format!("{}.{}", self.name(), format.extension())
    }

    /// Class whose individuals are linked by `Related_*` relationships
    #[must_use]
    pub fn related_class(self) -> Option<&'static str> {
        match self {
            Self::Capec => Some("AttackPattern"),
            Self::Cwe => Some("Weakness"),
            Self::Cve => None,
        }
    }

    /// Profile reproducing the published catalog's conventions
    #[must_use]
    pub fn default_profile(self) -> TranslationProfile {
        let prefixed = |classes: &[&str]| {
            classes
                .iter()
                .map(|class| ((*class).to_string(), self.name().to_string()))
                .collect()
        };
        let base = TranslationProfile {
            label_attributes: LABEL_ATTRIBUTES.iter().map(ToString::to_string).collect(),
            property_prefix: "has".to_string(),
            ..TranslationProfile::default()
        };
        match self {
            Self::Capec => TranslationProfile {
                id_attributes: vec!["ID".into()],
                reference_attributes: vec!["CAPEC_ID".into()],
                key_prefixes: prefixed(&["AttackPattern", "Category", "View"]),
                transparent_types: vec!["RelationshipsType".into()],
                ..base
            },
            Self::Cve => TranslationProfile {
                id_attributes: vec!["seq".into()],
                key_prefixes: prefixed(&["Vulnerability"]),
                name_overrides: [("item".to_string(), "Vulnerability".to_string())].into(),
                ..base
            },
            Self::Cwe => TranslationProfile {
                id_attributes: vec!["ID".into()],
                reference_attributes: vec!["CWE_ID".into()],
                key_prefixes: prefixed(&["Weakness", "Category", "View"]),
                transparent_types: vec!["MemberType".into(), "RelationshipsType".into()],
                ..base
            },
        }
    }

    /// Intra-catalog DL-safe rules
    ///
    /// `?s1 hasRelated{Class} ?r` and `?r has{KIND}ID ?s2` give
    /// `?s1 relatedTo ?s2`; each relationship nature narrows that to its own
    /// property through `?r hasNature RelatedNatureEnumeration-{Nature}`.
    #[must_use]
    pub fn rules(self) -> Vec<DlSafeRule> {
        let Some(class) = self.related_class() else {
            return Vec::new();
        };
        let related = format!("hasRelated{class}");
        let reference = format!("has{}ID", self.name());
        let body = || {
            vec![
                Atom::object(&related, Term::var("s1"), Term::var("r")),
                Atom::object(&reference, Term::var("r"), Term::var("s2")),
            ]
        };
        let head = |relation: &str| vec![Atom::object(relation, Term::var("s1"), Term::var("s2"))];

        let mut rules = vec![DlSafeRule::new("relatedTo", body(), head("relatedTo"))];
        for relation in RELATIONS {
            let mut atoms = body();
            atoms.push(Atom::object(
                "hasNature",
                Term::var("r"),
                Term::individual(format!("RelatedNatureEnumeration-{}", capitalize(relation))),
            ));
            rules.push(DlSafeRule::new(relation, atoms, head(relation)));
        }
        rules
    }

    /// Declare the rule head properties and add every applicable rule
    ///
    /// A rule naming a property or nature the schema never produced is
    /// skipped. Returns the number of rules added.
    ///
    /// # Errors
    ///
    /// Returns an ontology error when a relation name is already taken by a
    /// property with a different range.
    pub fn add_rules(self, ontology: &mut Ontology) -> mitre_ontology::Result<usize> {
        let Some(class) = self.related_class() else {
            return Ok(0);
        };
        if ontology.class(class).is_none() {
            debug!(catalog = %self, class, "no related class, rules skipped");
            return Ok(0);
        }

        let mut added = 0;
        for rule in self.rules() {
            if let Some(missing) = missing_entity(ontology, &rule) {
                debug!(rule = %rule.name, missing, "rule skipped");
                continue;
            }
            let range = Range::Class(class.to_string());
            ontology.ensure_property(&rule.name, Some(class), range, false)?;
            match ontology.add_rule(rule) {
                Ok(()) => added += 1,
                Err(error) => debug!(%error, "rule skipped"),
            }
        }
        Ok(added)
    }
}

/// First property or individual of a rule body the ontology lacks
fn missing_entity<'r>(ontology: &Ontology, rule: &'r DlSafeRule) -> Option<&'r str> {
    let properties = rule.properties().into_iter().filter(|p| *p != rule.name);
    properties
        .filter(|p| ontology.property(p).is_none())
        .chain(
            rule.individuals()
                .into_iter()
                .filter(|i| ontology.individual(i).is_none()),
        )
        .next()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Catalog {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown catalog '{s}', expected one of capec, cve, cwe"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_and_locations() {
        assert_eq!(Catalog::Cwe.iri(), "https://owl.caprica-project.org/cwe");
        assert_eq!(Catalog::Capec.file_name(OutputFormat::Owx), "CAPEC.owx");
        assert_eq!(Catalog::Cve.file_name(OutputFormat::Json), "CVE.json");
        assert!(Catalog::Cwe.data_url().ends_with(".zip"));
        assert_eq!("cwe".parse::<Catalog>().unwrap(), Catalog::Cwe);
        assert_eq!("CAPEC".parse::<Catalog>().unwrap(), Catalog::Capec);
        assert!("nvd".parse::<Catalog>().is_err());
    }

    #[test]
    fn test_default_profiles() {
        let cwe = Catalog::Cwe.default_profile();
        assert_eq!(cwe.key_prefix("Weakness"), "CWE");
        assert!(cwe.is_reference_attribute("CWE_ID"));
        assert!(cwe.is_transparent("MemberType"));
        assert!(cwe.label_attributes.contains(&"Entry_Name".to_string()));

        let cve = Catalog::Cve.default_profile();
        assert!(cve.is_id_attribute("seq"));
        assert_eq!(cve.naming().element_class("item"), "Vulnerability");
        assert_eq!(cve.key_prefix("Vulnerability"), "CVE");

        let capec = Catalog::Capec.default_profile();
        assert_eq!(capec.key_prefix("AttackPattern"), "CAPEC");
        assert!(capec.is_transparent("RelationshipsType"));
        assert!(!capec.is_transparent("MemberType"));
    }

    #[test]
    fn test_rules() {
        assert!(Catalog::Cve.rules().is_empty());

        let rules = Catalog::Cwe.rules();
        assert_eq!(rules.len(), 8);
        assert_eq!(rules[0].name, "relatedTo");
        assert!(rules[0].properties().contains("hasRelatedWeakness"));
        assert!(rules[0].properties().contains("hasCWEID"));

        let child = rules.iter().find(|r| r.name == "childOf").unwrap();
        assert!(child.individuals().contains("RelatedNatureEnumeration-ChildOf"));
        assert!(child.unbound_variables().is_empty());

        let capec = Catalog::Capec.rules();
        assert!(capec[0].properties().contains("hasRelatedAttackPattern"));
        assert!(capec[0].properties().contains("hasCAPECID"));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("startsWith"), "StartsWith");
        assert_eq!(capitalize(""), "");
    }
}
