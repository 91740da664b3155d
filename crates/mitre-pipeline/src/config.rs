//! YAML run configuration
//!
//! ```yaml
//! output_dir: out
//! format: owx
//! strict: false
//! catalogs:
//!   cwe:
//!     data: ./cwec_v4.14.xml.zip
//!     profile:
//!       identity: content
//! ```
//!
//! Every field is optional. A catalog `profile` is laid over that catalog's
//! default profile key by key, so it only lists what it changes.
#![allow(clippy::must_use_candidate)] // Accessor API intentionally omits pervasive #[must_use].

use mitre_mapping::TranslationProfile;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use crate::{Catalog, Error, Result, WarningPolicy};

/// Serialization of a finished ontology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// OWL 2 XML
    #[default]
    Owx,
    /// JSON dump of the ontology model
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Owx => "owx",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "owx" => Ok(Self::Owx),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown format '{s}', expected owx or json")),
        }
    }
}

/// Per-catalog overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// Schema location, a URL or a path
    pub schema: Option<String>,
    /// Data location, a URL or a path; `.zip` archives are unpacked
    pub data: Option<String>,
    /// Partial [`TranslationProfile`] laid over the catalog default
    pub profile: Option<Value>,
}

/// Run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory receiving `{KIND}.owx` files
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    /// Fail a catalog that produced any warning
    pub strict: bool,
    pub catalogs: BTreeMap<Catalog, CatalogConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            format: OutputFormat::default(),
            strict: false,
            catalogs: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load a configuration file
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the file cannot be read or is not a
    /// valid configuration.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(path.display().to_string(), e.to_string()))?;
        let config = Self::from_yaml_str(&text, &path.display().to_string())?;
        debug!(path = %path.display(), catalogs = config.catalogs.len(), "loaded configuration");
        Ok(config)
    }

    /// Parse configuration text; `origin` names it in errors
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed YAML or unknown fields.
    pub fn from_yaml_str(text: &str, origin: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| Error::config(origin, e.to_string()))
    }

    /// Overrides of one catalog, empty when the file names none
    pub fn catalog(&self, catalog: Catalog) -> CatalogConfig {
        self.catalogs.get(&catalog).cloned().unwrap_or_default()
    }

    pub fn schema_location(&self, catalog: Catalog) -> String {
        self.catalogs
            .get(&catalog)
            .and_then(|c| c.schema.clone())
            .unwrap_or_else(|| catalog.schema_url().to_string())
    }

    pub fn data_location(&self, catalog: Catalog) -> String {
        self.catalogs
            .get(&catalog)
            .and_then(|c| c.data.clone())
            .unwrap_or_else(|| catalog.data_url().to_string())
    }

    /// Default profile of a catalog with the configured override applied
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the override is not a mapping or a
    /// value does not fit its profile field.
    pub fn profile(&self, catalog: Catalog) -> Result<TranslationProfile> {
        let default = catalog.default_profile();
        let Some(changes) = self.catalogs.get(&catalog).and_then(|c| c.profile.as_ref()) else {
            return Ok(default);
        };
        let origin = format!("catalogs.{}.profile", catalog.name().to_ascii_lowercase());
        let Value::Mapping(changes) = changes else {
            return Err(Error::config(origin, "expected a mapping"));
        };

        let mut merged = serde_yaml::to_value(&default)
            .map_err(|e| Error::config(&origin, e.to_string()))?;
        if let Value::Mapping(base) = &mut merged {
            for (key, value) in changes {
                base.insert(key.clone(), value.clone());
            }
        }
        serde_yaml::from_value(merged).map_err(|e| Error::config(origin, e.to_string()))
    }

    pub fn policy(&self) -> WarningPolicy {
        if self.strict {
            WarningPolicy::Strict
        } else {
            WarningPolicy::Accept
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mitre_mapping::IdentityPolicy;

    #[test]
    fn test_empty_config_is_default() {
        let config = Config::from_yaml_str("", "empty.yaml").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.format, OutputFormat::Owx);
        assert_eq!(config.policy(), WarningPolicy::Accept);
        assert_eq!(config.data_location(Catalog::Cwe), Catalog::Cwe.data_url());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_yaml_str(
            r"
output_dir: out
format: json
strict: true
catalogs:
  cwe:
    data: ./cwec.xml.zip
  capec:
    schema: ./ap_schema.xsd
",
            "mitre2owl.yaml",
        )
        .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.policy(), WarningPolicy::Strict);
        assert_eq!(config.data_location(Catalog::Cwe), "./cwec.xml.zip");
        assert_eq!(config.schema_location(Catalog::Cwe), Catalog::Cwe.schema_url());
        assert_eq!(config.schema_location(Catalog::Capec), "./ap_schema.xsd");
        assert!(config.catalog(Catalog::Cve).data.is_none());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let error = Config::from_yaml_str("formats: owx", "bad.yaml").unwrap_err();
        assert!(matches!(error, Error::Config { ref path, .. } if path == "bad.yaml"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let error = Config::load(Path::new("/nonexistent/mitre2owl.yaml")).unwrap_err();
        assert!(matches!(error, Error::Config { .. }));
    }

    #[test]
    fn test_profile_override_keeps_catalog_defaults() {
        let config = Config::from_yaml_str(
            r"
catalogs:
  cwe:
    profile:
      identity: content
      property_prefix: ''
",
            "mitre2owl.yaml",
        )
        .unwrap();
        let profile = config.profile(Catalog::Cwe).unwrap();
        assert_eq!(profile.identity, IdentityPolicy::Content);
        assert_eq!(profile.property_prefix, "");
        assert_eq!(profile.key_prefix("Weakness"), "CWE");
        assert!(profile.is_transparent("MemberType"));

        assert_eq!(
            config.profile(Catalog::Capec).unwrap(),
            Catalog::Capec.default_profile()
        );
    }

    #[test]
    fn test_profile_override_must_be_a_mapping() {
        let config =
            Config::from_yaml_str("catalogs:\n  cve:\n    profile: [seq]\n", "x.yaml").unwrap();
        let error = config.profile(Catalog::Cve).unwrap_err();
        assert!(error.to_string().contains("catalogs.cve.profile"));
    }
}
