//! Command-line argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Manifest read when `--manifest` is not given
pub const DEFAULT_MANIFEST: &str = "ferry.json";

/// Ferry transfer handlers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Handler manifest (JSON)
    #[arg(short, long, default_value = DEFAULT_MANIFEST)]
    pub manifest: PathBuf,

    /// Enable debug logging (shows every prepare/finalize call)
    #[arg(long, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// What to do with the registered handlers
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List registered handlers
    List,

    /// Run a read transfer
    Read {
        /// Transfer ID
        id: u32,

        /// Write the data here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a write transfer
    Write {
        /// Transfer ID
        id: u32,

        /// Take the data from here instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}
