//! bioclass — label ChEMBL bioactivities for one target.
//!
//! Run with: cargo run -p bioclass-cli -- run --query coronavirus --index 7

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use bioclass_common::run_config::CONFIG_ENV_VAR;
use bioclass_common::{BioclassError, RunConfig};
use bioclass_ingestion::export::{write_labeled_table, write_raw_checkpoint, DirectoryStore, DurableStore};
use bioclass_ingestion::sources::chembl::ChemblClient;
use bioclass_ingestion::workflow::label_target;
use bioclass_ingestion::{BioactivityService, TargetCandidates, TargetResolver};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "bioclass", version, about = "Retrieve and label ChEMBL bioactivity data")]
struct Cli {
    /// TOML or YAML run configuration
    #[arg(long, global = true, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List target candidates for a query
    Targets {
        query: Option<String>,
    },
    /// Fetch, clean, label and write the bioactivity table
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    #[arg(long)]
    query: Option<String>,
    /// Position in the `targets` listing
    #[arg(long)]
    index: Option<usize>,
    #[arg(long)]
    assay_type: Option<String>,
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Copy finished tables here (e.g. a mounted drive)
    #[arg(long)]
    persist_dir: Option<PathBuf>,
    /// Skip the unfiltered checkpoint table
    #[arg(long)]
    no_raw: bool,
}

impl RunArgs {
    fn apply(self, config: &mut RunConfig) {
        if let Some(q) = self.query { config.query.target_query = q; }
        if let Some(i) = self.index { config.query.target_index = Some(i); }
        if let Some(t) = self.assay_type { config.query.assay_type = t; }
        if let Some(d) = self.out_dir { config.output.dir = d; }
        if let Some(p) = self.persist_dir { config.output.persist_dir = Some(p); }
        if self.no_raw { config.output.write_raw_checkpoint = false; }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => RunConfig::load(path).with_context(|| format!("Loading {}", path.display()))?,
        None => RunConfig::default(),
    };

    match cli.command {
        Command::Targets { query } => {
            if let Some(q) = query {
                config.query.target_query = q;
            }
            config.validate()?;
            let service = service(&config)?;
            let candidates = TargetResolver::new(service).search(&config.query.target_query).await?;
            print_candidates(&candidates);
        }
        Command::Run(args) => {
            args.apply(&mut config);
            config.validate()?;
            run(&config).await?;
        }
    }

    Ok(())
}

fn service(config: &RunConfig) -> anyhow::Result<Arc<dyn BioactivityService>> {
    Ok(Arc::new(ChemblClient::from_config(&config.chembl)?))
}

async fn run(config: &RunConfig) -> anyhow::Result<()> {
    let service = service(config)?;
    let query = &config.query.target_query;

    let Some(index) = config.query.target_index else {
        let candidates = TargetResolver::new(service).search(query).await?;
        print_candidates(&candidates);
        return Err(BioclassError::Config(
            "no target index given; pick one from the list above with --index".into(),
        )
        .into());
    };

    let labeled = label_target(service, query, index, &config.query.assay_type).await?;

    std::fs::create_dir_all(&config.output.dir)
        .with_context(|| format!("Creating {}", config.output.dir.display()))?;

    let mut written = Vec::new();
    if config.output.write_raw_checkpoint {
        let raw_path = config.output.raw_path();
        write_raw_checkpoint(&raw_path, &labeled.run.raw)?;
        written.push(raw_path);
    }
    let labeled_path = config.output.labeled_path();
    write_labeled_table(&labeled_path, &labeled.run.report.records)?;
    written.push(labeled_path);

    info!(
        target = %labeled.target.target_chembl_id,
        rows = labeled.run.report.records.len(),
        "Labeled table ready"
    );

    if let Some(dir) = &config.output.persist_dir {
        let store = DirectoryStore::new(dir);
        for table in &written {
            match store.persist(table).await {
                Ok(dest) => info!(destination = %dest.display(), "Copied to durable storage"),
                Err(e) => {
                    warn!(table = %table.display(), error = %e, "Durable storage hand-off failed");
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}

fn print_candidates(candidates: &TargetCandidates) {
    println!("{} candidates for '{}':", candidates.len(), candidates.query);
    for (i, t) in candidates.enumerate() {
        println!(
            "{:>4}  {:<16} {:<48} {:<32} {}",
            i,
            t.target_chembl_id,
            t.pref_name.as_deref().unwrap_or("-"),
            t.organism.as_deref().unwrap_or("-"),
            t.target_type.as_deref().unwrap_or("-"),
        );
    }
}
