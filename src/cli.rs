//! Command-line interface definitions for logaudit.
//!
//! This module defines all CLI arguments, subcommands, and options using the
//! clap derive API. Global options cover verbosity and error formatting;
//! subcommands map onto the audit pipeline stages.
//!
//! # Example
//!
//! ```bash
//! # Full pipeline: diff check, reload missing lines, then dedup
//! logaudit -c logaudit.toml run
//!
//! # Diff-only pass
//! logaudit -c logaudit.toml check
//!
//! # Verbose mode for debugging
//! logaudit -v -c logaudit.toml dedup
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Audit and repair tool for a log document store.
///
/// logaudit compares the documents stored in a search backend against the
/// canonical log files on disk, writes per-partition diff artifacts for
/// missing lines, replays them to the ingester, and removes duplicate
/// documents by content fingerprint.
#[derive(Debug, Parser)]
#[command(name = "logaudit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Emit errors as machine-readable JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Path to the TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE", env = "LOGAUDIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for logaudit.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the full pipeline: check, reload missing lines, then dedup
    Run,
    /// Diff the store against the canonical logs and write diff artifacts
    Check,
    /// Remove duplicate documents from the store
    Dedup,
    /// Replay previously written diff artifacts to the ingester
    Reload,
}

impl Cli {
    /// The configuration path, which every subcommand requires.
    ///
    /// # Errors
    ///
    /// Returns an error when neither `--config` nor `LOGAUDIT_CONFIG` was
    /// given.
    pub fn config_path(&self) -> anyhow::Result<&PathBuf> {
        self.config
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no configuration file given (use --config <FILE>)"))
    }
}
