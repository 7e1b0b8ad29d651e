//! Run command - execute a reconciliation from a config file.

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::Args;
use console::style;

use conciliar_core::log::{LogLevel, LogSink};
use conciliar_core::models::ReconcileConfig;
use conciliar_core::{render_report, Period, ReconciliationEngine, RunOutcome};

use super::config::resolve_config_path;

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Reference date (YYYY-MM-DD) defining the processing period; defaults
    /// to today
    #[arg(long)]
    reference: Option<String>,

    /// Keep source Excel files even if the config says to delete them
    #[arg(long)]
    keep_originals: bool,

    /// Write a CSV summary of generated files into the output folder
    #[arg(long)]
    summary: bool,

    /// Print the detailed text report after the run
    #[arg(long)]
    report: bool,

    /// Print the full run outcome as JSON
    #[arg(long)]
    json: bool,
}

/// Sink that narrates the run on the console.
struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info => println!("{} {message}", style("ℹ").blue()),
            LogLevel::Success => println!("{} {message}", style("✓").green()),
            LogLevel::Warning => println!("{} {message}", style("⚠").yellow()),
            LogLevel::Error => eprintln!("{} {message}", style("✗").red()),
        }
    }
}

pub async fn run(args: RunArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config_path = resolve_config_path(config_path);
    if !config_path.exists() {
        anyhow::bail!(
            "No config file at {}. Run 'conciliar config init' first.",
            config_path.display()
        );
    }

    let mut config = ReconcileConfig::from_file(&config_path)?;
    if args.keep_originals {
        config.delete_originals = false;
    }

    let reference = match &args.reference {
        Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map_err(|e| anyhow::anyhow!("invalid reference date '{text}': {e}"))?,
        None => Local::now().date_naive(),
    };

    let output_folder = config.output_folder.clone();
    let engine = ReconciliationEngine::new(config, std::sync::Arc::new(ConsoleSink));
    let outcome = engine.run_at(reference);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    if args.report {
        println!();
        println!("{}", render_report(&outcome.stats, Period::of(reference)));
    }

    if args.summary && !outcome.output_files.is_empty() {
        let summary_path = output_folder.join("resumen.csv");
        write_summary(&summary_path, &outcome)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    if let Some(error) = &outcome.error {
        anyhow::bail!("Reconciliation failed: {error}");
    }

    if outcome.stopped_by_user {
        println!("{} Run stopped by user, partial results kept", style("⚠").yellow());
    } else if !outcome.success {
        println!("{} No matches produced this run", style("⚠").yellow());
    }

    Ok(())
}

fn write_summary(path: &PathBuf, outcome: &RunOutcome) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["source", "company", "matches", "manual_reviews", "output"])?;

    for file in &outcome.output_files {
        wtr.write_record([
            file.source.as_str(),
            file.company_name.as_str(),
            &file.matches.to_string(),
            &file.manual_reviews.to_string(),
            &file.output.display().to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
