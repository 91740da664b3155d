//! Choice-group policy

use serde::{Deserialize, Serialize};

/// How `xs:choice` groups are represented in the ontology
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChoicePolicy {
    /// One subclass per branch of an abstract union class
    ///
    /// A choice forming the whole content of a type makes that type's class
    /// the union, with branch classes named `{Type}_{Branch}`. A nested choice
    /// gets a synthesized union class `{Type}_Choice` below the type's class.
    #[default]
    Subclass,

    /// Branches are plain properties of the enclosing class
    Flatten,
}

impl ChoicePolicy {
    /// Name of the synthesized union class of the n-th nested choice (from 1)
    #[must_use]
    pub fn union_class(type_class: &str, ordinal: usize) -> String {
        if ordinal <= 1 {
            format!("{type_class}_Choice")
        } else {
            format!("{type_class}_Choice{ordinal}")
        }
    }

    /// Name of a branch class
    #[must_use]
    pub fn branch_class(type_class: &str, branch: &str) -> String {
        format!("{type_class}_{branch}")
    }
}
