//! Biosample environmental enrichment CLI.
//!
//! Looks up weather, marine or soil context for a point or a collection of
//! biosample records and prints the reconciled result as JSON.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use enrich_common::{parse_collection_date, Coordinates, EnrichError};
use enricher::{read_records, EnricherConfig, Enrichers};
use reconciler::{DomainKind, TargetSchema};

#[derive(Parser, Debug)]
#[command(name = "enricher")]
#[command(about = "Environmental enrichment for biosample records")]
struct Args {
    /// YAML configuration file (defaults apply when omitted)
    #[arg(short, long, env = "ENRICHER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Record provider counters and print them in Prometheus format when done
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enrich a single point
    Lookup {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Collection date (YYYY-MM-DD or any accepted collection-date layout)
        #[arg(long)]
        date: String,
        #[arg(long)]
        domain: DomainKind,
        #[arg(long, default_value = "nmdc")]
        schema: TargetSchema,
    },

    /// Enrich every record of a JSON array or JSON Lines file
    Batch {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        domain: DomainKind,
        #[arg(long, default_value = "nmdc")]
        schema: TargetSchema,
        /// Write outcomes here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report per-field coverage before and after enrichment
    Analyze {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        domain: DomainKind,
        /// Label for the collection (e.g. nmdc, gold)
        #[arg(long)]
        source: String,
        #[arg(long, default_value = "nmdc")]
        schema: TargetSchema,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_tracing(&args.log_level, args.log_json)?;

    let metrics = if args.metrics {
        Some(
            PrometheusBuilder::new()
                .install_recorder()
                .context("Failed to install Prometheus recorder")?,
        )
    } else {
        None
    };

    let config = EnricherConfig::load_or_default(args.config.as_deref())?;
    info!(config = ?args.config, "Loaded configuration");

    let enrichers = Enrichers::from_config(&config)?;

    match args.command {
        Command::Lookup {
            lat,
            lon,
            date,
            domain,
            schema,
        } => {
            let location = Coordinates::new(lat, lon)?;
            let date = parse_collection_date(&date).ok_or(EnrichError::InvalidDate(date))?;
            let outcome = enrichers.lookup(domain, &location, date, schema).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Batch {
            input,
            domain,
            schema,
            output,
        } => {
            let records = read_records(&input)?;
            info!(input = ?input, records = records.len(), domain = %domain, "Starting batch");

            let report = enrichers.batch(domain, &records, schema).await?;
            info!(
                total = report.total,
                successful = report.successful,
                failed = report.failed,
                "Batch finished"
            );

            let rendered = serde_json::to_string_pretty(&report.output)?;
            match output {
                Some(path) => {
                    fs::write(&path, rendered).with_context(|| format!("Failed to write output: {:?}", path))?
                }
                None => println!("{}", rendered),
            }
        }
        Command::Analyze {
            input,
            domain,
            source,
            schema,
        } => {
            let records = read_records(&input)?;
            let analysis = enrichers.analyze(domain, &records, &source, schema).await?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
    }

    if let Some(stats) = enrichers.cache_stats().await {
        info!(
            hits = stats.hits,
            misses = stats.misses,
            entries = stats.entries,
            hit_rate = stats.hit_rate(),
            "Response cache"
        );
    }

    if let Some(handle) = metrics {
        print_metrics(&handle);
    }

    Ok(())
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout carries the JSON results.
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn print_metrics(handle: &PrometheusHandle) {
    eprintln!("{}", handle.render());
}
