//! Satchel - session persistence admin CLI.
//!
//! Administrative surface over the durable session store. Currently one
//! command: `gc`, which purges expired session records and reports the
//! deleted count.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use satchel_store::{SessionRepository, SqliteRecordStore, StoreConfig};

/// Satchel - session persistence admin CLI
#[derive(Parser)]
#[command(name = "satchel")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the session database
    #[arg(long, global = true, env = "SATCHEL_DB", default_value = "satchel.db")]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Purge expired session records
    Gc {
        /// Override the record lifetime in seconds (default: 86400)
        #[arg(long)]
        max_lifetime: Option<i64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "satchel=debug,satchel_store=debug,info"
    } else {
        "satchel=info,satchel_store=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Gc { max_lifetime } => {
            let mut config = StoreConfig::default();
            if let Some(secs) = max_lifetime {
                config = config.with_max_lifetime(secs);
            }

            let store = SqliteRecordStore::open(&cli.db, config.clone())
                .with_context(|| format!("failed to open session store at {}", cli.db.display()))?;
            let repo = SessionRepository::new(Arc::new(store), config.clone());

            let deleted = repo
                .gc(config.max_lifetime_secs)
                .context("gc sweep failed")?;
            println!("deleted {deleted} expired session(s)");
        }
    }

    Ok(())
}
