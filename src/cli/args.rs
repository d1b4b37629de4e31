//! CLI argument definitions using clap
//!
//! Commands:
//! - aerodata compile-update
//! - aerodata cursor encode|decode
//! - aerodata project [--policy <path>]
//! - aerodata reconstruct --aggregate <path>
//!
//! Every command reads one JSON document from stdin.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// aerodata - single-table data access toolkit
#[derive(Parser, Debug)]
#[command(name = "aerodata")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (logging settings)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a change-set object into an update statement
    CompileUpdate,

    /// Convert between native pagination keys and opaque cursors
    Cursor {
        #[command(subcommand)]
        action: CursorAction,
    },

    /// Project one record through a field policy
    Project {
        /// JSON policy file (defaults, rename, omit, also_omit, transform)
        #[arg(long)]
        policy: Option<PathBuf>,
    },

    /// Fold a list of records into an aggregate
    Reconstruct {
        /// JSON aggregate definition (root, cardinality, mappers, delimiter, strict)
        #[arg(long)]
        aggregate: PathBuf,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorAction {
    /// Native key object -> cursor string
    Encode,
    /// Cursor string -> native key object
    Decode,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
