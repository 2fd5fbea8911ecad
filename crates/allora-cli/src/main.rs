// crates/allora-cli/src/main.rs
//
// CLI entrypoint for the Allora inference-synthesis engine.
//
// Operates on a local ledger snapshot: create topics, register workers and
// reputers, run worker and reputer rounds from JSON submissions, and
// inspect the resulting bundles, regrets and scores.

mod commands;
mod config;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use commands::register::RegisterCmd;
use commands::topic::TopicCmd;
use commands::Context;
use tracing_subscriber::EnvFilter;

use allora_core::{ActorKind, TopicId};

use crate::config::CliConfig;

/// Allora CLI: inference synthesis over a local ledger.
#[derive(Parser, Debug)]
#[command(
    name = "allora",
    version = "0.1.0",
    about = "Allora inference synthesis: combine worker inferences into regret-weighted network inferences"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "~/.allora/config.toml")]
    config: String,

    /// Ledger snapshot path (overrides `ledger_path` in the config).
    #[arg(long, global = true)]
    ledger: Option<String>,

    /// Print JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Actor kinds accepted on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Inferer,
    Forecaster,
    Reputer,
}

impl From<KindArg> for ActorKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Inferer => ActorKind::Inferer,
            KindArg::Forecaster => ActorKind::Forecaster,
            KindArg::Reputer => ActorKind::Reputer,
        }
    }
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a default config and an empty ledger.
    Init {
        /// Overwrite existing files.
        #[arg(long)]
        force: bool,
    },

    /// Topic management: create, update, show, list.
    #[command(subcommand)]
    Topic(TopicCmd),

    /// Registration: workers, reputers and reputer stake.
    #[command(subcommand)]
    Register(RegisterCmd),

    /// Run the worker round: synthesize the network inference bundle.
    Infer {
        #[arg(long)]
        topic: TopicId,
        /// Block height of the epoch nonce.
        #[arg(long)]
        block: u64,
        /// JSON file holding a list of worker data bundles.
        #[arg(long)]
        submissions: String,
    },

    /// Run the reputer round: aggregate losses and update regrets.
    ReportLosses {
        #[arg(long)]
        topic: TopicId,
        #[arg(long)]
        block: u64,
        /// JSON file holding a list of reputer value bundles.
        #[arg(long)]
        reports: String,
    },

    /// Show the stored regrets of a topic.
    Regrets {
        #[arg(long)]
        topic: TopicId,
    },

    /// Show the stored scores of a topic.
    Scores {
        #[arg(long)]
        topic: TopicId,
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
    },

    /// Show a stored network bundle.
    Bundle {
        #[arg(long)]
        topic: TopicId,
        #[arg(long)]
        block: u64,
        /// Show the network loss bundle instead of the inference bundle.
        #[arg(long)]
        losses: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Config comes first so its log level can seed the filter.
    let loaded = CliConfig::load(&cli.config);
    let log_level = match &loaded {
        Ok(c) => c.log_level.clone(),
        Err(_) => CliConfig::default().log_level,
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)))
        .with_writer(std::io::stderr)
        .init();

    let config = match loaded {
        Ok(c) => {
            tracing::debug!("Loaded configuration from {}", cli.config);
            c
        }
        Err(e) => {
            if !matches!(cli.command, Commands::Init { .. }) {
                tracing::warn!("Could not load config from {}: {}. Using defaults.", cli.config, e);
            }
            CliConfig::default()
        }
    };
    let ctx = Context::new(config, cli.ledger.as_deref(), cli.json);

    match &cli.command {
        Commands::Init { force } => commands::init::run(&ctx, &cli.config, *force)?,
        Commands::Topic(cmd) => commands::topic::run(&ctx, cmd)?,
        Commands::Register(cmd) => commands::register::run(&ctx, cmd)?,
        Commands::Infer { topic, block, submissions } => {
            commands::round::run_infer(&ctx, *topic, *block, submissions)?
        }
        Commands::ReportLosses { topic, block, reports } => {
            commands::round::run_report_losses(&ctx, *topic, *block, reports)?
        }
        Commands::Regrets { topic } => commands::inspect::run_regrets(&ctx, *topic)?,
        Commands::Scores { topic, kind } => {
            commands::inspect::run_scores(&ctx, *topic, kind.map(ActorKind::from))?
        }
        Commands::Bundle { topic, block, losses } => {
            commands::inspect::run_bundle(&ctx, *topic, *block, *losses)?
        }
    }

    Ok(())
}
