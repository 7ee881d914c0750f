//! finguard - portfolio audit ledger CLI
//!
//! Operator tool over the finguard-core library: append audit entries,
//! page through history, verify hash chains, and inspect the store.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use finguard_core::config::FinguardConfig;
use finguard_core::ledger::AuditLedger;
use finguard_core::record::TriggeredBy;
use finguard_core::store::SqliteAuditStore;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

/// finguard - portfolio audit ledger
#[derive(Parser, Debug)]
#[command(name = "finguard")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "finguard.toml")]
    config: PathBuf,

    /// Path to the audit database (overrides config)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append an audit entry to a subject's chain
    Append {
        /// Subject (user/account) whose chain receives the entry
        subject: String,

        /// Action type ("rebalance", "trade", "alert", "config_change", ...)
        #[arg(short, long)]
        action: String,

        /// Free-text summary of the action
        #[arg(short, long)]
        description: String,

        /// Affected asset symbol (repeat for several, order preserved)
        #[arg(long = "asset")]
        assets: Vec<String>,

        /// Origin of the action (`ai_agent`, `user`, `system`, `scheduled`)
        #[arg(short, long, default_value = "user")]
        triggered_by: TriggeredBy,

        /// Confidence score in [0, 1]
        #[arg(long)]
        confidence: Option<f64>,

        /// Free-text explanation of the decision
        #[arg(long)]
        reasoning: Option<String>,

        /// Extra metadata as a JSON object
        #[arg(long)]
        context: Option<String>,

        /// Id of an earlier record this entry corrects
        #[arg(long)]
        corrects: Option<String>,

        /// Output format (`text` or `json`)
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// List a subject's history, most recent first
    Log {
        /// Subject to list
        subject: String,

        /// Maximum number of entries to show
        #[arg(short = 'n', long)]
        limit: Option<u64>,

        /// Only show entries with this action type
        #[arg(short, long)]
        action: Option<String>,

        /// Output format (`text` or `json`)
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Verify a subject's hash chain
    Verify {
        /// Subject to verify
        subject: String,

        /// Output format (`text` or `json`)
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Show store statistics
    Stats {
        /// Output format (`text` or `json`)
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Resolve the store: --db wins, then the config file, then defaults.
    let config = if cli.config.exists() {
        FinguardConfig::from_file(&cli.config)
            .with_context(|| format!("failed to load config {}", cli.config.display()))?
    } else {
        FinguardConfig::default()
    };
    let db_path = cli.db.unwrap_or_else(|| config.ledger.database.clone());

    let store = SqliteAuditStore::open(&db_path)
        .with_context(|| format!("failed to open audit database {}", db_path.display()))?;
    store
        .set_busy_timeout(config.ledger.busy_timeout_ms)
        .context("failed to set busy timeout")?;
    let ledger = AuditLedger::new(store);

    match cli.command {
        Commands::Append {
            subject,
            action,
            description,
            assets,
            triggered_by,
            confidence,
            reasoning,
            context,
            corrects,
            format,
        } => commands::append::run(
            &ledger,
            commands::append::AppendArgs {
                subject,
                action,
                description,
                assets,
                triggered_by,
                confidence,
                reasoning,
                context,
                corrects,
            },
            &format,
        ),
        Commands::Log {
            subject,
            limit,
            action,
            format,
        } => commands::log::run(
            &ledger,
            &subject,
            limit.unwrap_or(config.ledger.default_read_limit),
            action.as_deref(),
            &format,
        ),
        Commands::Verify { subject, format } => {
            let valid = commands::verify::run(&ledger, &subject, &format)?;
            if !valid {
                std::process::exit(1);
            }
            Ok(())
        },
        Commands::Stats { format } => commands::stats::run(&ledger, &format),
    }
}
