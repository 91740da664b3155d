//! OWL naming policy
//!
//! Schema names such as `Related_Weakness` or `Attack Pattern (Detailed)` are
//! turned into CamelCase slugs: parenthesised text is dropped, punctuation is
//! spelled out (`#` becomes `Sharp`, `+` becomes `Plus`) and the remaining
//! words are capitalised and joined.

use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static PARENTHESES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(.*?\)").expect("valid parentheses pattern"));

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\s*'([^']*?)'").expect("valid quoted text pattern"));

static DELIMITERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[ \u{a0}\n\t,_-]+").expect("valid delimiter pattern"));

/// Spelled-out characters inside quoted text
const INNER_REPLACEMENTS: &[(char, &str)] = &[('/', "Slash"), (':', "Colon")];

/// Spelled-out punctuation, applied in this order
const REPLACEMENTS: &[(char, &str)] = &[
    ('#', "Sharp"),
    ('+', "Plus"),
    ('.', "Dot"),
    ('\\', "Backslash"),
    ('&', "And"),
    ('\'', ""),
    ('/', "Or"),
    (':', ""),
    ('*', "Wildcard"),
    ('=', "Equal"),
    ('"', ""),
    ('%', "Percent"),
    ('<', "Below"),
    ('>', "Above"),
    ('^', ""),
];

fn spell_out(text: &str, replacements: &[(char, &str)]) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match replacements.iter().find(|(from, _)| *from == c) {
            Some((_, word)) => {
                out.push(' ');
                out.push_str(word);
                out.push(' ');
            }
            None => out.push(c),
        }
    }
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// CamelCase slug of a schema name or literal
///
/// Returns an empty string when nothing but punctuation and delimiters remains.
#[must_use]
pub fn slugify(input: &str) -> String {
    let text = PARENTHESES.replace_all(input, "");
    let text = QUOTED.replace_all(&text, |caps: &Captures<'_>| {
        format!(" {} ", spell_out(&caps[1], INNER_REPLACEMENTS))
    });
    let text = spell_out(&text, REPLACEMENTS);
    DELIMITERS
        .split(text.trim())
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect()
}

/// How OWL names are derived from schema names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamingPolicy {
    /// Prepended to every property name, e.g. `has`
    pub property_prefix: String,

    /// Dropped from the end of named type names, e.g. `Type`
    pub strip_type_suffix: Option<String>,

    /// Local name to replacement name, applied before slugging
    pub overrides: BTreeMap<String, String>,
}

impl NamingPolicy {
    fn resolve<'a>(&'a self, local: &'a str) -> &'a str {
        self.overrides.get(local).map_or(local, String::as_str)
    }

    /// Class name of a named complex or simple type
    #[must_use]
    pub fn type_class(&self, local: &str) -> String {
        let local = self.resolve(local);
        let stem = match &self.strip_type_suffix {
            Some(suffix) if local.len() > suffix.len() => {
                local.strip_suffix(suffix.as_str()).unwrap_or(local)
            }
            _ => local,
        };
        slugify(self.resolve(stem))
    }

    /// Class name of an anonymous type declared inside an element or attribute
    #[must_use]
    pub fn element_class(&self, local: &str) -> String {
        slugify(self.resolve(local))
    }

    /// Property name of an element or attribute
    #[must_use]
    pub fn property(&self, local: &str) -> String {
        let slug = slugify(&self.resolve(local).replace('@', ""));
        format!("{}{slug}", self.property_prefix)
    }

    /// Name qualified by its enclosing class
    #[must_use]
    pub fn qualify(enclosing: &str, name: &str) -> String {
        format!("{enclosing}_{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_words() {
        assert_eq!(slugify("Related_Weakness"), "RelatedWeakness");
        assert_eq!(slugify("Attack_Pattern_Catalog"), "AttackPatternCatalog");
        assert_eq!(slugify("childOf"), "ChildOf");
        assert_eq!(slugify("  Weakness\u{a0}Ordinalities , x-y "), "WeaknessOrdinalitiesXY");
    }

    #[test]
    fn test_slugify_drops_parentheses_and_spells_out_punctuation() {
        assert_eq!(slugify("Language (Detailed)"), "Language");
        assert_eq!(slugify("C#"), "CSharp");
        assert_eq!(slugify("C++"), "CPlusPlus");
        assert_eq!(slugify("ASP.NET"), "ASPDotNET");
        assert_eq!(slugify("Input/Output"), "InputOrOutput");
        assert_eq!(slugify("Don't"), "DonT");
        assert_eq!(slugify("a<b>c"), "ABelowBAboveC");
    }

    #[test]
    fn test_slugify_quoted_text() {
        assert_eq!(slugify("Scheme: 'http://x'"), "SchemeHttpColonSlashSlashX");
    }

    #[test]
    fn test_slugify_empty() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify(" - _ "), "");
    }

    #[test]
    fn test_policy_names() {
        let mut policy = NamingPolicy {
            property_prefix: "has".into(),
            strip_type_suffix: Some("Type".into()),
            overrides: BTreeMap::new(),
        };
        policy.overrides.insert("item".into(), "Vulnerability".into());

        assert_eq!(policy.type_class("WeaknessType"), "Weakness");
        assert_eq!(policy.type_class("Type"), "Type");
        assert_eq!(policy.type_class("RelatedNatureEnumeration"), "RelatedNatureEnumeration");
        assert_eq!(policy.element_class("item"), "Vulnerability");
        assert_eq!(policy.property("CWE_ID"), "hasCWEID");
        assert_eq!(policy.property("Related_Weakness"), "hasRelatedWeakness");
        assert_eq!(policy.property("item"), "hasVulnerability");
        assert_eq!(NamingPolicy::qualify("Weakness", "Name"), "Weakness_Name");
    }

    #[test]
    fn test_default_policy_keeps_names() {
        let policy = NamingPolicy::default();
        assert_eq!(policy.property("Name"), "Name");
        assert_eq!(policy.type_class("WeaknessType"), "WeaknessType");
    }
}
