//! oncomap — Biomarker mention reconciliation against UMLS and NCIt.
//! Entry point for the command-line binary.

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use oncomap_common::MappingConfig;
use oncomap_ontology::aggregate::{aggregate_mentions, mentions_by_trial, parse_extraction};
use oncomap_ontology::files::{read_frequency_table, write_json};
use oncomap_ontology::sources::{ConceptSource, DisabledSource, NcitClient, UmlsClient};
use oncomap_ontology::{BiomarkerNormaliser, MappingPipeline, MappingSummary, Ontology, PipelineOptions};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "oncomap", version, about = "Map extracted biomarker mentions to UMLS / NCIt concepts")]
struct Cli {
    /// Configuration file (default: ./oncomap.toml or $ONCOMAP_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reconcile a mention → count vocabulary against both thesauri
    Map(MapArgs),
    /// Build a mention → count vocabulary from extraction output
    Aggregate(AggregateArgs),
    /// Print the normalized form of each mention (no network)
    #[command(alias = "normalize")]
    Normalise {
        #[arg(required = true)]
        mentions: Vec<String>,
    },
}

#[derive(Debug, Args)]
struct MapArgs {
    /// Vocabulary JSON: { "<mention>": <count>, ... }
    #[arg(short, long)]
    input: PathBuf,

    #[arg(long)]
    strict_out: Option<PathBuf>,

    #[arg(long)]
    lenient_out: Option<PathBuf>,

    #[arg(long)]
    summary_out: Option<PathBuf>,

    /// Delay between terms in milliseconds
    #[arg(long)]
    pacing_ms: Option<u64>,

    /// Terms in flight at once
    #[arg(long)]
    concurrency: Option<usize>,
}

#[derive(Debug, Args)]
struct AggregateArgs {
    /// Extraction output JSON
    #[arg(short, long)]
    input: PathBuf,

    #[arg(short, long)]
    output: PathBuf,

    /// Also write trial id → mentions, as extracted
    #[arg(long)]
    by_trial: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Logs go to stderr so `normalise` output stays clean on stdout
    let default_filter = if cli.verbose {
        "oncomap_ontology=debug,oncomap_agent=debug,info"
    } else {
        "oncomap_ontology=info,oncomap_agent=info,warn"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let mut config = config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Map(args) => {
            apply_map_args(&mut config, &args);
            run_map(config, &args.input).await
        }
        Command::Aggregate(args) => run_aggregate(&args),
        Command::Normalise { mentions } => {
            let normaliser = BiomarkerNormaliser::with_vocabulary(&config.vocabulary);
            for m in mentions {
                println!("{}\t{}", m, normaliser.normalise(&m));
            }
            Ok(())
        }
    }
}

fn apply_map_args(config: &mut MappingConfig, args: &MapArgs) {
    if let Some(p) = &args.strict_out { config.output.strict_path = p.clone(); }
    if let Some(p) = &args.lenient_out { config.output.lenient_path = p.clone(); }
    if let Some(p) = &args.summary_out { config.output.summary_path = Some(p.clone()); }
    if let Some(ms) = args.pacing_ms { config.pipeline.pacing_ms = ms; }
    if let Some(n) = args.concurrency { config.pipeline.concurrency = n; }
}

async fn run_map(config: MappingConfig, input: &Path) -> anyhow::Result<()> {
    // Configuration and input problems are fatal before any term is searched
    config.validate()?;
    let table = read_frequency_table(input)?;

    let broad: Arc<dyn ConceptSource> = if config.sources.umls.enabled {
        Arc::new(UmlsClient::from_config(&config.sources.umls)?)
    } else {
        warn!("UMLS search disabled in configuration");
        Arc::new(DisabledSource(Ontology::Umls))
    };
    let domain: Arc<dyn ConceptSource> = if config.sources.ncit.enabled {
        Arc::new(NcitClient::from_config(&config.sources.ncit)?)
    } else {
        warn!("NCIt search disabled in configuration");
        Arc::new(DisabledSource(Ontology::Ncit))
    };

    let options = PipelineOptions::from(&config.pipeline);
    info!(
        "Mapping {} mentions (pacing {:?}, concurrency {})",
        table.len(),
        options.pacing,
        options.concurrency
    );
    let pipeline = MappingPipeline::new(
        Arc::new(BiomarkerNormaliser::with_vocabulary(&config.vocabulary)),
        broad,
        domain,
        options,
    );

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing in-flight terms and recording the rest as unmatched");
            let _ = cancel_tx.send(true);
        }
    });

    let run = pipeline.build_mappings_until(&table, cancel_rx).await;

    write_json(&config.output.strict_path, &run.mapping.strict)?;
    write_json(&config.output.lenient_path, &run.mapping.lenient)?;
    info!("✓ Strict mapping saved: {}", config.output.strict_path.display());
    info!("✓ Lenient mapping saved: {}", config.output.lenient_path.display());

    let summary = MappingSummary::from_run(&run);
    info!(
        total = summary.total,
        strict = summary.strict_matched,
        lenient = summary.lenient_matched,
        failures = summary.search_failures,
        "Coverage: strict {:.1}%, lenient {:.1}%",
        summary.strict_coverage() * 100.0,
        summary.lenient_coverage() * 100.0
    );
    if let Some(path) = &config.output.summary_path {
        write_json(path, &summary)?;
    }
    if summary.cancelled {
        warn!("{} mentions were not searched because the run was interrupted", summary.skipped);
    }
    Ok(())
}

fn run_aggregate(args: &AggregateArgs) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&args.input)
        .with_context(|| format!("cannot read extraction output {}", args.input.display()))?;
    let records = parse_extraction(&content)
        .with_context(|| format!("unrecognised extraction output {}", args.input.display()))?;

    let counts = aggregate_mentions(&records);
    info!("{} trials, {} distinct mentions", records.len(), counts.len());
    write_json(&args.output, &counts)?;
    if let Some(path) = &args.by_trial {
        write_json(path, &mentions_by_trial(&records))?;
    }
    Ok(())
}
