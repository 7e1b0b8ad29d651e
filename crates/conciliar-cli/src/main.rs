//! CLI application for batch invoice reconciliation.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{config, probe, run};

/// Reconcile Excel loads against per-company XML invoices
#[derive(Parser)]
#[command(name = "conciliar")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full reconciliation
    Run(run::RunArgs),

    /// Manage configuration
    Config(config::ConfigArgs),

    /// Probe plate extraction on a free-text field
    Placa(probe::PlacaArgs),

    /// Probe invoice/guide extraction on a Correos PDF
    Pdf(probe::PdfArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run(args) => run::run(args, cli.config.as_deref()).await,
        Commands::Config(args) => config::run(args, cli.config.as_deref()).await,
        Commands::Placa(args) => probe::placa(args).await,
        Commands::Pdf(args) => probe::pdf(args).await,
    }
}
