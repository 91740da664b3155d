//! Warning policies

use mitre_ontology::{Warning, WarningCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Catalog, Error, Result};

/// What a catalog run does with the warnings it collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningPolicy {
    /// Keep the ontology and report warnings next to it
    #[default]
    Accept,

    /// Fail the catalog if any warning was recorded
    Strict,
}

impl WarningPolicy {
    /// Apply the policy to the warnings of a finished catalog
    ///
    /// # Errors
    ///
    /// Returns [`Error::Policy`] in strict mode when `warnings` is not empty.
    pub fn check(self, catalog: Catalog, warnings: &[Warning]) -> Result<()> {
        if self == Self::Accept || warnings.is_empty() {
            return Ok(());
        }
        let mut counts: BTreeMap<WarningCode, usize> = BTreeMap::new();
        for warning in warnings {
            *counts.entry(warning.code).or_insert(0) += 1;
        }
        let summary = counts
            .iter()
            .map(|(code, count)| format!("{count} {code}"))
            .collect::<Vec<_>>()
            .join(", ");
        Err(Error::policy(
            catalog,
            format!("strict mode rejects {} warning(s): {summary}", warnings.len()),
        ))
    }
}
