//! # mitre-cli
//!
//! The `mitre2owl` command: fetches MITRE catalog schemas and data, runs
//! them through the translation pipeline and writes one ontology per
//! catalog.

mod fetch;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use mitre_pipeline::{
    Catalog, CatalogOutcome, CatalogPipeline, CatalogStatus, Config, Error, OutputFormat,
    PipelineReport,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::fetch::Fetcher;

#[derive(Parser)]
#[command(name = "mitre2owl")]
#[command(about = "Translate MITRE CAPEC, CVE and CWE catalogs into OWL ontologies")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug detail
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert catalogs to ontologies
    Convert(ConvertArgs),

    /// Print the rule set inferred from a schema as JSON
    Rules {
        /// Schema location, a URL or a path
        schema: String,

        /// Catalog whose profile is applied
        #[arg(long, default_value = "cwe")]
        catalog: Catalog,
    },
}

#[derive(Args)]
struct ConvertArgs {
    /// Process every catalog
    #[arg(long)]
    all: bool,

    /// Process CAPEC
    #[arg(long)]
    capec: bool,

    /// Process CVE
    #[arg(long)]
    cve: bool,

    /// Process CWE
    #[arg(long)]
    cwe: bool,

    /// CAPEC schema location
    #[arg(long, value_name = "LOC")]
    capec_schema: Option<String>,

    /// CAPEC data location
    #[arg(long, value_name = "LOC")]
    capec_data: Option<String>,

    /// CVE schema location
    #[arg(long, value_name = "LOC")]
    cve_schema: Option<String>,

    /// CVE data location
    #[arg(long, value_name = "LOC")]
    cve_data: Option<String>,

    /// CWE schema location
    #[arg(long, value_name = "LOC")]
    cwe_schema: Option<String>,

    /// CWE data location
    #[arg(long, value_name = "LOC")]
    cwe_data: Option<String>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format (owx or json)
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Fail a catalog that produced warnings
    #[arg(long)]
    strict: bool,
}

impl ConvertArgs {
    fn locations(&self, catalog: Catalog) -> (Option<&String>, Option<&String>) {
        match catalog {
            Catalog::Capec => (self.capec_schema.as_ref(), self.capec_data.as_ref()),
            Catalog::Cve => (self.cve_schema.as_ref(), self.cve_data.as_ref()),
            Catalog::Cwe => (self.cwe_schema.as_ref(), self.cwe_data.as_ref()),
        }
    }

    /// Catalogs to process; a location flag enables its catalog
    fn selected(&self) -> Vec<Catalog> {
        Catalog::ALL
            .into_iter()
            .filter(|&catalog| {
                let flag = match catalog {
                    Catalog::Capec => self.capec,
                    Catalog::Cve => self.cve,
                    Catalog::Cwe => self.cwe,
                };
                let (schema, data) = self.locations(catalog);
                self.all || flag || schema.is_some() || data.is_some()
            })
            .collect()
    }

    /// Lay the command-line flags over the configuration
    fn apply(&self, mut config: Config) -> Config {
        for catalog in Catalog::ALL {
            let (schema, data) = self.locations(catalog);
            if schema.is_none() && data.is_none() {
                continue;
            }
            let entry = config.catalogs.entry(catalog).or_default();
            if let Some(schema) = schema {
                entry.schema = Some(schema.clone());
            }
            if let Some(data) = data {
                entry.data = Some(data.clone());
            }
        }
        if let Some(output) = &self.output {
            config.output_dir.clone_from(output);
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        config.strict |= self.strict;
        config
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Convert(args) => convert(config, &args).await,
        Commands::Rules { schema, catalog } => {
            rules(&config, &schema, catalog).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn convert(config: Config, args: &ConvertArgs) -> anyhow::Result<ExitCode> {
    let catalogs = args.selected();
    if catalogs.is_empty() {
        bail!("At least one of CAPEC, CVE or CWE must be processed");
    }
    let config = args.apply(config);
    let fetcher = Fetcher::new();

    let mut report = PipelineReport::new();
    for catalog in catalogs {
        let result = run_catalog(&fetcher, &config, catalog).await;
        report.push(catalog, result);
    }

    for entry in report.entries() {
        match &entry.status {
            CatalogStatus::Succeeded(outcome) => print_summary(outcome, &config),
            CatalogStatus::Failed(error) => eprintln!("{}: failed: {error}", entry.catalog),
        }
    }
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Fetch, translate and write one catalog
async fn run_catalog(
    fetcher: &Fetcher,
    config: &Config,
    catalog: Catalog,
) -> mitre_pipeline::Result<CatalogOutcome> {
    let schema_location = config.schema_location(catalog);
    let data_location = config.data_location(catalog);
    info!(%catalog, schema = %schema_location, data = %data_location, "processing catalog");

    let (schema, data) = tokio::try_join!(
        fetcher.fetch(&schema_location),
        fetcher.fetch(&data_location)
    )
    .map_err(|e| Error::io("fetch", catalog.name(), format!("{e:#}")))?;

    let outcome = CatalogPipeline::new(catalog)
        .with_profile(config.profile(catalog)?)
        .with_policy(config.policy())
        .with_source(&data_location)
        .run(&schema, &data)?;
    outcome.write_to(&config.output_dir, config.format)?;
    Ok(outcome)
}

fn print_summary(outcome: &CatalogOutcome, config: &Config) {
    let path = config.output_dir.join(outcome.catalog.file_name(config.format));
    let warnings = outcome.ontology.warnings().len();
    println!(
        "{}: {} individuals, {} warnings -> {}",
        outcome.catalog,
        outcome.ontology.individuals().count(),
        warnings,
        path.display()
    );
    for (code, count) in outcome.warning_summary() {
        println!("    {code}: {count}");
    }
}

async fn rules(config: &Config, schema: &str, catalog: Catalog) -> anyhow::Result<()> {
    let bytes = Fetcher::new().fetch(schema).await?;
    let compiled = CatalogPipeline::new(catalog)
        .with_profile(config.profile(catalog)?)
        .compile(&bytes)
        .with_context(|| format!("failed to infer rules from '{schema}'"))?;
    println!("{}", compiled.rules().to_json_pretty()?);
    Ok(())
}
