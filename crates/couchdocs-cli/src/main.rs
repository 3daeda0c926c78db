//! couchdocs CLI - keep design documents in a directory
//!
//! This is the main entry point for users interacting with couchdocs.
//! It provides commands for pushing a project directory to a database
//! (once or continuously) and dumping a database back to disk.

use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use couchdocs_store::{DumpMode, StoreConfig};
use couchdocs_watcher::WatchConfig;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "couchdocs")]
#[command(author = "couchdocs Contributors")]
#[command(version, disable_version_flag = true)]
#[command(about = "Sync CouchDB design documents with a directory tree", long_about = None)]
struct Cli {
    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,

    /// Enable verbose output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Settings {
    /// Request timeout in seconds
    #[arg(long, global = true, env = "COUCHDOCS_TIMEOUT", default_value = "30")]
    timeout: u64,

    /// Milliseconds between two watch batches
    #[arg(long, global = true, env = "COUCHDOCS_INTERVAL", default_value = "1000")]
    interval: u64,

    /// Don't fetch attachments when dumping
    #[arg(long, global = true)]
    no_attachments: bool,
}

impl Settings {
    fn store(&self) -> StoreConfig {
        StoreConfig {
            timeout_secs: self.timeout,
            attachments: !self.no_attachments,
        }
    }

    fn watch(&self) -> WatchConfig {
        WatchConfig {
            interval_ms: self.interval,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Push a directory to a database
    Push {
        /// Database URL
        #[arg(env = "COUCHDOCS_URL")]
        url: String,

        /// Project directory (defaults to current directory)
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Delete and recreate the database first
        #[arg(short = 'R', long)]
        destructive: bool,

        /// Keep pushing changes until interrupted
        #[arg(short, long)]
        watch: bool,
    },

    /// Write a database's documents into a directory
    Dump {
        /// Database URL
        #[arg(env = "COUCHDOCS_URL")]
        url: String,

        /// Target directory, which must exist (defaults to current directory)
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Only dump design documents
        #[arg(short, long, conflicts_with = "data")]
        design: bool,

        /// Only dump data documents
        #[arg(short = 'D', long)]
        data: bool,
    },

    /// Deprecated, use `push <url> <dir>`
    Load {
        /// Project directory
        dir: PathBuf,

        /// Database URL
        url: String,
    },
}

fn dump_mode(design: bool, data: bool) -> DumpMode {
    match (design, data) {
        (true, _) => DumpMode::DesignOnly,
        (_, true) => DumpMode::DataOnly,
        _ => DumpMode::All,
    }
}

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let store_config = cli.settings.store();
    let result = match cli.command {
        Commands::Push {
            url,
            dir,
            destructive,
            watch,
        } => {
            let watch_config = watch.then(|| cli.settings.watch());
            commands::push(&url, &dir, destructive, watch_config, &store_config)
        }
        Commands::Dump {
            url,
            dir,
            design,
            data,
        } => commands::dump(&url, &dir, dump_mode(design, data), &store_config),
        Commands::Load { dir, url } => commands::load(&dir, &url, &store_config),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
