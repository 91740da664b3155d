//! Catalog orchestration
//!
//! One catalog run goes schema bytes to [`CompiledSchema`] to a fresh
//! ontology, then translates the data document into it. Nothing is written
//! until the caller asks for it, so a failed catalog leaves no output behind.

use mitre_mapping::{
    RuleSet, TranslationProfile, TranslationStats, Translator, infer_rules, materialize,
};
use mitre_ontology::{Ontology, WarningCode};
use mitre_xml::Document;
use mitre_xsd::{SchemaGraph, SchemaReader};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::{Catalog, Error, OutputFormat, Result, WarningPolicy};

/// Schema graph and inferred rules of one catalog, reusable across documents
#[derive(Debug)]
pub struct CompiledSchema {
    catalog: Catalog,
    profile: TranslationProfile,
    graph: SchemaGraph,
    rules: RuleSet,
}

impl CompiledSchema {
    /// Read a schema and infer its rule set
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] for an unreadable schema and
    /// [`Error::Mapping`] when inference fails.
    pub fn compile(catalog: Catalog, profile: TranslationProfile, schema: &[u8]) -> Result<Self> {
        let started = Instant::now();
        let graph = SchemaReader::new()
            .read_bytes(schema)
            .map_err(|e| Error::schema(catalog, e))?;
        let rules = infer_rules(&graph, &profile).map_err(|e| Error::mapping(catalog, e))?;
        info!(
            %catalog,
            nodes = graph.len(),
            rules = rules.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "compiled schema"
        );
        Ok(Self {
            catalog,
            profile,
            graph,
            rules,
        })
    }

    #[must_use]
    pub fn catalog(&self) -> Catalog {
        self.catalog
    }

    #[must_use]
    pub fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    #[must_use]
    pub fn profile(&self) -> &TranslationProfile {
        &self.profile
    }

    /// Empty ontology holding the schema's classes, properties, enumeration
    /// individuals and the catalog's DL-safe rules
    ///
    /// # Errors
    ///
    /// Returns [`Error::Mapping`] if the rule set cannot be materialized.
    pub fn ontology(&self) -> Result<Ontology> {
        let mut ontology = Ontology::new(self.catalog.iri());
        materialize(&self.rules, &mut ontology).map_err(|e| Error::mapping(self.catalog, e))?;
        let added = self
            .catalog
            .add_rules(&mut ontology)
            .map_err(|e| Error::mapping(self.catalog, e))?;
        debug!(catalog = %self.catalog, rules = added, "added catalog rules");
        Ok(ontology)
    }

    /// Translate one data document into an ontology built from this schema
    ///
    /// # Errors
    ///
    /// Returns [`Error::Mapping`] on a fatal translation error.
    pub fn translate(
        &self,
        document: &Document,
        ontology: &mut Ontology,
    ) -> Result<TranslationStats> {
        Translator::new(&self.graph, &self.rules, &self.profile)
            .translate(document, ontology)
            .map_err(|e| Error::mapping(self.catalog, e))
    }
}

/// A translated catalog
#[derive(Debug)]
pub struct CatalogOutcome {
    pub catalog: Catalog,
    pub ontology: Ontology,
    pub stats: TranslationStats,
    pub duration: Duration,
}

impl CatalogOutcome {
    /// Warning counts per code
    #[must_use]
    pub fn warning_summary(&self) -> BTreeMap<WarningCode, usize> {
        self.ontology.warning_summary()
    }

    /// Serialize the ontology
    ///
    /// # Errors
    ///
    /// Returns [`Error::Mapping`] wrapping the serializer error.
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Owx => mitre_ontology::to_owx(&self.ontology),
            OutputFormat::Json => self.ontology.to_json_pretty(),
        }
        .map_err(|e| Error::mapping(self.catalog, e))
    }

    /// Write `{KIND}.{ext}` into a directory, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the directory or file cannot be written.
    pub fn write_to(&self, dir: &Path, format: OutputFormat) -> Result<PathBuf> {
        fs::create_dir_all(dir).map_err(|e| {
            Error::io("create output directory", dir.display().to_string(), e.to_string())
        })?;
        let path = dir.join(self.catalog.file_name(format));
        let io_error = |e: &dyn std::fmt::Display| {
            Error::io("write ontology", path.display().to_string(), e.to_string())
        };

        let file = File::create(&path).map_err(|e| io_error(&e))?;
        let mut writer = BufWriter::new(file);
        match format {
            OutputFormat::Owx => {
                mitre_ontology::write_owx(&self.ontology, &mut writer).map_err(|e| io_error(&e))?;
            }
            OutputFormat::Json => {
                let json = self
                    .ontology
                    .to_json_pretty()
                    .map_err(|e| Error::mapping(self.catalog, e))?;
                writer.write_all(json.as_bytes()).map_err(|e| io_error(&e))?;
            }
        }
        writer.flush().map_err(|e| io_error(&e))?;
        info!(catalog = %self.catalog, path = %path.display(), "wrote ontology");
        Ok(path)
    }
}

/// Runs one catalog end to end
#[derive(Debug, Clone)]
pub struct CatalogPipeline {
    catalog: Catalog,
    profile: TranslationProfile,
    policy: WarningPolicy,
    source: String,
}

impl CatalogPipeline {
    /// Pipeline with the catalog's default profile, accepting warnings
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            profile: catalog.default_profile(),
            policy: WarningPolicy::default(),
            source: catalog.data_url().to_string(),
        }
    }

    #[must_use]
    pub fn with_profile(mut self, profile: TranslationProfile) -> Self {
        self.profile = profile;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: WarningPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Name of the data document used in warning locations
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    #[must_use]
    pub fn catalog(&self) -> Catalog {
        self.catalog
    }

    /// Compile the schema with this pipeline's profile
    ///
    /// # Errors
    ///
    /// See [`CompiledSchema::compile`].
    pub fn compile(&self, schema: &[u8]) -> Result<CompiledSchema> {
        CompiledSchema::compile(self.catalog, self.profile.clone(), schema)
    }

    /// Translate a catalog from its schema and data bytes
    ///
    /// # Errors
    ///
    /// Returns the first fatal error of the run, or [`Error::Policy`] when
    /// the warning policy rejects the result.
    pub fn run(&self, schema: &[u8], data: &[u8]) -> Result<CatalogOutcome> {
        let started = Instant::now();
        let compiled = self.compile(schema)?;
        let mut ontology = compiled.ontology()?;
        let document = Document::parse(data)
            .map_err(|e| Error::xml(self.catalog, &self.source, e))?
            .with_source(&self.source);
        let stats = compiled.translate(&document, &mut ontology)?;
        self.policy.check(self.catalog, ontology.warnings())?;

        let duration = started.elapsed();
        info!(
            catalog = %self.catalog,
            individuals = stats.individuals_created,
            assertions = stats.assertions,
            warnings = ontology.warnings().len(),
            elapsed_ms = duration.as_millis(),
            "translated catalog"
        );
        Ok(CatalogOutcome {
            catalog: self.catalog,
            ontology,
            stats,
            duration,
        })
    }
}

/// Input of one catalog in a multi-catalog run
#[derive(Debug, Clone)]
pub struct CatalogJob {
    pub pipeline: CatalogPipeline,
    pub schema: Vec<u8>,
    pub data: Vec<u8>,
}

/// Final state of one catalog
#[derive(Debug)]
pub enum CatalogStatus {
    Succeeded(Box<CatalogOutcome>),
    Failed(Error),
}

#[derive(Debug)]
pub struct CatalogReport {
    pub catalog: Catalog,
    pub status: CatalogStatus,
}

/// Outcome of every catalog of a run, in run order
#[derive(Debug, Default)]
pub struct PipelineReport {
    entries: Vec<CatalogReport>,
}

impl PipelineReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the result of a catalog
    pub fn push(&mut self, catalog: Catalog, result: Result<CatalogOutcome>) {
        let status = match result {
            Ok(outcome) => CatalogStatus::Succeeded(Box::new(outcome)),
            Err(error) => {
                warn!(%catalog, %error, "catalog failed");
                CatalogStatus::Failed(error)
            }
        };
        self.entries.push(CatalogReport { catalog, status });
    }

    #[must_use]
    pub fn entries(&self) -> &[CatalogReport] {
        &self.entries
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &CatalogOutcome> {
        self.entries.iter().filter_map(|entry| match &entry.status {
            CatalogStatus::Succeeded(outcome) => Some(outcome.as_ref()),
            CatalogStatus::Failed(_) => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = (Catalog, &Error)> {
        self.entries.iter().filter_map(|entry| match &entry.status {
            CatalogStatus::Failed(error) => Some((entry.catalog, error)),
            CatalogStatus::Succeeded(_) => None,
        })
    }

    /// True when no catalog failed
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Run several catalogs; a failing catalog does not stop the others
pub fn run_many(jobs: impl IntoIterator<Item = CatalogJob>) -> PipelineReport {
    let mut report = PipelineReport::new();
    for job in jobs {
        let catalog = job.pipeline.catalog();
        report.push(catalog, job.pipeline.run(&job.schema, &job.data));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
        <xs:element name="item">
            <xs:complexType>
                <xs:sequence><xs:element name="desc" type="xs:string"/></xs:sequence>
                <xs:attribute name="seq" type="xs:string"/>
                <xs:attribute name="name" type="xs:string"/>
            </xs:complexType>
        </xs:element>
    </xs:schema>"#;

    const DATA: &str = r#"<item seq="1999-0001" name="CVE-1999-0001"><desc>Denial of service.</desc></item>"#;

    #[test]
    fn test_compiled_schema_is_reusable() {
        let compiled = CatalogPipeline::new(Catalog::Cve)
            .compile(SCHEMA.as_bytes())
            .unwrap();
        assert_eq!(compiled.catalog(), Catalog::Cve);
        assert!(!compiled.rules().is_empty());

        let mut ontology = compiled.ontology().unwrap();
        assert_eq!(ontology.iri(), "https://owl.caprica-project.org/cve");
        let document = Document::parse_str(DATA).unwrap();
        compiled.translate(&document, &mut ontology).unwrap();
        compiled.translate(&document, &mut ontology).unwrap();

        let item = ontology.individual("CVE-1999-0001").unwrap();
        assert!(item.classes.contains("Vulnerability"));
        assert_eq!(item.label.as_deref(), Some("CVE-1999-0001"));
        assert_eq!(ontology.individuals_of("Vulnerability").count(), 1);
    }

    #[test]
    fn test_run_reports_stats() {
        let outcome = CatalogPipeline::new(Catalog::Cve)
            .with_source("allitems.xml")
            .run(SCHEMA.as_bytes(), DATA.as_bytes())
            .unwrap();
        assert_eq!(outcome.stats.individuals_created, 1);
        assert!(outcome.warning_summary().is_empty());
        assert!(outcome.render(OutputFormat::Owx).unwrap().contains("CVE-1999-0001"));
    }

    #[test]
    fn test_bad_inputs_fail_with_context() {
        let pipeline =
            CatalogPipeline::new(Catalog::Cwe).with_profile(TranslationProfile::default());
        let schema_error = pipeline.run(b"<notaschema/>", DATA.as_bytes()).unwrap_err();
        assert!(matches!(schema_error, Error::Schema { catalog: Catalog::Cwe, .. }));

        let xml_error = pipeline
            .run(SCHEMA.as_bytes(), b"<item><desc>unclosed</item>")
            .unwrap_err();
        assert!(matches!(xml_error, Error::Xml { catalog: Catalog::Cwe, .. }));
    }

    #[test]
    fn test_run_many_keeps_going_after_a_failure() {
        let jobs = vec![
            CatalogJob {
                pipeline: CatalogPipeline::new(Catalog::Capec),
                schema: b"<broken".to_vec(),
                data: DATA.as_bytes().to_vec(),
            },
            CatalogJob {
                pipeline: CatalogPipeline::new(Catalog::Cve),
                schema: SCHEMA.as_bytes().to_vec(),
                data: DATA.as_bytes().to_vec(),
            },
        ];
        let report = run_many(jobs);
        assert_eq!(report.entries().len(), 2);
        assert!(!report.is_success());
        assert_eq!(report.failed().map(|(c, _)| c).collect::<Vec<_>>(), [Catalog::Capec]);
        assert_eq!(
            report.succeeded().map(|o| o.catalog).collect::<Vec<_>>(),
            [Catalog::Cve]
        );
    }
}
