//! CLI module for Machado Oráculo
//!
//! Provides subcommands:
//! - `chat`: interactive question loop (default)
//! - `index`: download the book and build the vector index

pub mod chat;
pub mod index;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging::{self, LoggingGuard};

/// Machado Oráculo - ask questions about Dom Casmurro
#[derive(Debug, Parser)]
#[command(name = "machado-oraculo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub verbosity: Verbosity,

    /// Also write per-turn audit events to `audit.jsonl`
    #[arg(long, global = true)]
    pub audit: bool,

    /// Session id to resume or start (letters, digits and dashes)
    #[arg(long, global = true)]
    pub session: Option<String>,

    /// Extra configuration file layered over `config/default`
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Console log level; the configured level applies when none is given
#[derive(Debug, Clone, Copy, Default, Args)]
#[group(multiple = false)]
pub struct Verbosity {
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[arg(short, long, global = true)]
    pub info: bool,

    #[arg(short, long, global = true)]
    pub warning: bool,

    #[arg(short, long, global = true)]
    pub error: bool,
}

impl Verbosity {
    pub fn level(&self) -> Option<&'static str> {
        if self.debug {
            Some("debug")
        } else if self.info {
            Some("info")
        } else if self.warning {
            Some("warn")
        } else if self.error {
            Some("error")
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, Subcommand)]
pub enum Command {
    /// Ask questions interactively (default)
    #[default]
    Chat,

    /// Download the book and build the vector index
    Index(index::IndexArgs),
}

/// Load configuration with CLI overrides and install the subscriber
pub(crate) fn bootstrap(cli: &Cli) -> anyhow::Result<(AppConfig, LoggingGuard)> {
    dotenvy::dotenv().ok();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(level) = cli.verbosity.level() {
        config.logging.level = level.to_string();
    }

    let guard = logging::init_logging(&config.logging, cli.audit)?;
    Ok((config, guard))
}
