//! edgeci CLI
//!
//! Keeps local API proxy sources and the gateway management API in sync:
//! pull remote changes, push local bundles, or re-run tests whenever either
//! side changes.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::{kvm, pull, push, test};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Continuous integration for API proxy bundles
#[derive(Parser)]
#[command(name = "edgeci")]
#[command(author, version, about = "Continuous integration for API proxy bundles", long_about = None)]
pub struct Cli {
    /// Only log warnings and errors
    #[arg(long, short, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export changed proxies into a local directory
    Pull {
        #[command(flatten)]
        target: Target,

        /// Directory receiving one subdirectory per proxy
        #[arg(long, short, default_value = ".")]
        destination: PathBuf,

        /// Keep polling for changes until interrupted
        #[arg(long, short)]
        continuous: bool,

        /// Seconds between polls
        #[arg(long, short, default_value_t = 30)]
        interval: u64,
    },

    /// Import or update local proxies and optionally deploy them
    Push {
        #[command(flatten)]
        target: Target,

        /// Directory containing one subdirectory per proxy
        #[arg(long, short, default_value = ".")]
        source: PathBuf,

        /// Overwrite the latest revision instead of creating a new one
        #[arg(long, short)]
        update: bool,

        /// Environment to deploy the published revision to
        #[arg(long, short)]
        environment: Option<String>,
    },

    /// Pull changed proxies and run a test command after each change
    Test {
        #[command(flatten)]
        target: Target,

        /// Shell command to run
        #[arg(long = "run", short = 'r')]
        command: String,

        /// Directories whose changes re-run the command immediately
        #[arg(long = "watch", short = 'w')]
        watch: Vec<PathBuf>,

        /// Directory receiving one subdirectory per proxy
        #[arg(long, short, default_value = ".")]
        destination: PathBuf,

        /// Seconds between polls
        #[arg(long, short, default_value_t = 60)]
        interval: u64,
    },

    /// Print a key value map entry as JSON
    #[command(name = "getKvm", alias = "get-kvm")]
    GetKvm {
        #[command(flatten)]
        entry: KvmKey,
    },

    /// Insert a key value map entry
    #[command(name = "insertKvm", alias = "insert-kvm")]
    InsertKvm {
        #[command(flatten)]
        entry: KvmKey,

        /// Entry value
        #[arg(long, short = 'v')]
        value: String,
    },
}

/// Organization and proxy selection shared by the sync workflows
#[derive(Args)]
pub struct Target {
    /// Organization name
    #[arg(long, short)]
    pub org: String,

    /// Proxy names, or "all"
    #[arg(long = "proxy", short = 'p', required = true, num_args = 1..)]
    pub proxies: Vec<String>,
}

/// Location of a key value map entry
#[derive(Args)]
pub struct KvmKey {
    /// Organization name
    #[arg(long, short)]
    pub org: String,

    /// Environment name
    #[arg(long, short)]
    pub env: String,

    /// Key value map name
    #[arg(long, short)]
    pub map: String,

    /// Entry key
    #[arg(long, short)]
    pub key: String,
}

fn init_tracing(cli: &Cli) {
    let default_level = if cli.quiet {
        "warn"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Logs go to stderr so command output on stdout stays parseable
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = config::EdgeConfig::load()?;

    match cli.command {
        Commands::Pull {
            target,
            destination,
            continuous,
            interval,
        } => {
            pull::pull(
                &config,
                &target.org,
                &target.proxies,
                destination,
                continuous,
                Duration::from_secs(interval),
            )
            .await?;
        }
        Commands::Push {
            target,
            source,
            update,
            environment,
        } => {
            push::push(
                &config,
                &target.org,
                &target.proxies,
                source,
                update,
                environment,
            )
            .await?;
        }
        Commands::Test {
            target,
            command,
            watch,
            destination,
            interval,
        } => {
            test::test(
                &config,
                &target.org,
                &target.proxies,
                destination,
                command,
                watch,
                Duration::from_secs(interval),
            )
            .await?;
        }
        Commands::GetKvm { entry } => {
            kvm::get_entry(&config, &entry.org, &entry.env, &entry.map, &entry.key).await?;
        }
        Commands::InsertKvm { entry, value } => {
            kvm::insert_entry(
                &config,
                &entry.org,
                &entry.env,
                &entry.map,
                &entry.key,
                &value,
            )
            .await?;
        }
    }

    Ok(())
}
