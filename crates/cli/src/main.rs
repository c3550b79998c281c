//! Cloudsweep CLI
//!
//! Thin command-line front end over the collection and analysis crates:
//! argument parsing, signal handling, and summary printing only.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cloudsweep_analyzer::{Analyzer, ExtractionMap};
use cloudsweep_catalog::{load_catalog, RegistryOverlay, SafetyClassifier};
use cloudsweep_collector::{
    write_account_metadata, write_stats, Collector, CollectorConfig, ReplayApi, RunContext,
};
use cloudsweep_common::RawStore;
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Parser)]
#[command(name = "cloudsweep")]
#[command(version, about = "Read-only cloud inventory collection and maturity analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover and collect every safe operation into a run directory
    #[command(after_help = "EXAMPLES:\n  \
        # Collect from recorded fixtures\n  \
        cloudsweep collect --model aws-model.json --fixtures ./fixtures --run-dir ./runs/today\n\n  \
        # Limit scope and throughput\n  \
        cloudsweep collect --model aws-model.json --fixtures ./fixtures --run-dir ./runs/today \\\n    \
        --services s3,ec2,iam --max-workers 4 --rate-limit 10")]
    Collect {
        /// Path to the capability model JSON
        #[arg(short, long)]
        model: PathBuf,

        /// Registry overlay YAML (denylist, follow-up table)
        #[arg(long)]
        overlay: Option<PathBuf>,

        /// Fixture directory served as the remote API
        #[arg(short, long)]
        fixtures: PathBuf,

        /// Run directory receiving raw records and statistics
        #[arg(short, long)]
        run_dir: PathBuf,

        /// Comma-separated regions to collect
        #[arg(long, value_delimiter = ',', default_value = "us-east-1")]
        regions: Vec<String>,

        /// Account id recorded into metadata
        #[arg(long)]
        account: Option<String>,

        /// Comma-separated service allowlist
        #[arg(long, value_delimiter = ',')]
        services: Option<Vec<String>>,

        /// Comma-separated service denylist
        #[arg(long, value_delimiter = ',')]
        exclude: Option<Vec<String>>,

        /// Worker pool size
        #[arg(long, default_value_t = 8)]
        max_workers: usize,

        /// Pagination cap per operation
        #[arg(long, default_value_t = 100)]
        max_pages: usize,

        /// Follow-up fan-out cap per list result
        #[arg(long, default_value_t = 5)]
        max_followups: usize,

        /// Attempt bound for transient failures
        #[arg(long, default_value_t = 3)]
        max_attempts: u32,

        /// Remote calls per second (unlimited if omitted)
        #[arg(long)]
        rate_limit: Option<f64>,
    },

    /// Analyze a collected run directory offline
    #[command(after_help = "EXAMPLES:\n  \
        cloudsweep analyze --run-dir ./runs/today\n\n  \
        # With a custom resource-count extraction table\n  \
        cloudsweep analyze --run-dir ./runs/today --extraction extraction.yaml")]
    Analyze {
        /// Run directory produced by `collect`
        #[arg(short, long)]
        run_dir: PathBuf,

        /// Extraction table YAML merged over the built-in rules
        #[arg(long)]
        extraction: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Collect {
            model,
            overlay,
            fixtures,
            run_dir,
            regions,
            account,
            services,
            exclude,
            max_workers,
            max_pages,
            max_followups,
            max_attempts,
            rate_limit,
        } => {
            let mut config = CollectorConfig::default()
                .with_max_workers(max_workers)
                .with_max_pages(max_pages)
                .with_max_followups(max_followups)
                .with_max_attempts(max_attempts);
            if let Some(rate) = rate_limit {
                config = config.with_rate_limit(rate);
            }
            if let Some(allow) = services {
                config = config.with_allowlist(allow);
            }
            if let Some(deny) = exclude {
                config = config.with_denylist(deny);
            }
            collect_command(CollectInputs {
                model,
                overlay,
                fixtures,
                run_dir,
                regions,
                account,
                config,
            })
            .await?;
        }
        Commands::Analyze {
            run_dir,
            extraction,
        } => {
            analyze_command(&run_dir, extraction.as_deref())?;
        }
    }
    Ok(())
}

struct CollectInputs {
    model: PathBuf,
    overlay: Option<PathBuf>,
    fixtures: PathBuf,
    run_dir: PathBuf,
    regions: Vec<String>,
    account: Option<String>,
    config: CollectorConfig,
}

async fn collect_command(inputs: CollectInputs) -> Result<()> {
    println!(
        "{} Loading capability model: {}",
        "→".cyan(),
        inputs.model.display()
    );
    let catalog = load_catalog(&inputs.model).context("Failed to load capability model")?;
    println!(
        "{} {} services, {} operations",
        "✓".green(),
        catalog.service_count(),
        catalog.operation_count()
    );

    let classifier = match &inputs.overlay {
        Some(path) => SafetyClassifier::with_overlay(
            RegistryOverlay::load(path).context("Failed to load registry overlay")?,
        ),
        None => SafetyClassifier::new(),
    };

    let store = RawStore::create(&inputs.run_dir).context("Failed to create run directory")?;

    let mut ctx = RunContext::new(inputs.regions);
    ctx.account_id = inputs.account;
    write_account_metadata(&inputs.run_dir, &ctx.account_metadata())
        .context("Failed to write account metadata")?;

    // Ctrl-C stops submission; in-flight tasks drain to a terminal state
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let api = Arc::new(ReplayApi::new(&inputs.fixtures));
    let collector = Collector::new(api, store, inputs.config);
    println!("{} Collecting...", "→".cyan());
    let stats = collector
        .run(&catalog, &classifier, &ctx, shutdown_rx.clone())
        .await
        .context("Collection failed")?;
    write_stats(&inputs.run_dir, &stats).context("Failed to write statistics")?;

    println!("\n{}", "✓ Collection complete!".green().bold());
    println!("  Services:   {}", stats.services_discovered);
    println!("  Executed:   {}", stats.operations_executed);
    println!(
        "  Successful: {}",
        stats.operations_successful.to_string().green()
    );
    println!("  Failed:     {}", stats.operations_failed.to_string().red());
    println!(
        "  Skipped:    {}",
        stats.operations_skipped.to_string().yellow()
    );
    println!("  Elapsed:    {:.2}s", stats.elapsed_seconds);

    // Partial failures are statistics; only a barren cancelled run is fatal
    if *shutdown_rx.borrow() && stats.operations_executed == 0 {
        anyhow::bail!("collection cancelled before any task completed");
    }
    Ok(())
}

fn analyze_command(run_dir: &std::path::Path, extraction: Option<&std::path::Path>) -> Result<()> {
    println!("{} Analyzing run: {}", "→".cyan(), run_dir.display());

    let mut analyzer = Analyzer::new(run_dir.to_path_buf());
    if let Some(path) = extraction {
        analyzer = analyzer
            .with_extraction(ExtractionMap::load(path).context("Failed to load extraction table")?);
    }
    let report = analyzer.analyze().context("Analysis failed")?;

    println!("\n{}", "✓ Analysis complete!".green().bold());
    println!("\n{}", "Inventory:".bold());
    println!("  Services:  {}", report.summary.services_count);
    println!("  Regions:   {}", report.summary.regions_count);
    println!("  Resources: {}", report.summary.total_resources);

    println!("\n{}", "Findings:".bold());
    if report.findings.findings.is_empty() {
        println!("  {}", "none".green());
    }
    for finding in &report.findings.findings {
        let severity = match finding.severity {
            cloudsweep_analyzer::Severity::High => finding.severity.to_string().red().bold(),
            cloudsweep_analyzer::Severity::Medium => finding.severity.to_string().yellow(),
            _ => finding.severity.to_string().normal(),
        };
        println!(
            "  [{severity}] {} {} ({})",
            finding.id.cyan(),
            finding.title,
            finding.domain
        );
    }

    println!("\n{}", "Maturity scores:".bold());
    for domain in &report.scores.domains {
        println!("  {}: {}", domain.domain, domain.score.to_string().bold());
    }
    println!(
        "  {}: {}",
        "Overall".bold(),
        format!("{:.1}", report.scores.overall).bold()
    );

    println!(
        "\nOutputs written under {}",
        run_dir.join("outputs").display()
    );
    Ok(())
}
