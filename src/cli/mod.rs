// CLI Layer
// ユーザー入力の受付とコマンドルーティング

pub mod command_context;
pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// 出力フォーマット
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output (default)
    #[default]
    Text,
    /// Structured JSON output
    Json,
}

/// Metamorph - Database Migration CLI
///
/// Declarative schema reconciliation and versioned migrations.
#[derive(Parser, Debug)]
#[command(name = "metamorph")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Database migration tool with declarative schema reconciliation")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text or json)
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply migrations up to the target version (default: latest)
    Up {
        /// Target version
        #[arg(long)]
        target: Option<String>,

        /// Restrict execution to the named tables
        #[arg(long = "table", value_name = "TABLE")]
        tables: Vec<String>,

        /// Restrict execution to tables matching a prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Environment name
        #[arg(short, long, default_value = "development")]
        env: String,
    },

    /// Roll back migrations down to the target version
    Down {
        /// Target version
        #[arg(long)]
        target: String,

        /// Restrict execution to the named tables
        #[arg(long = "table", value_name = "TABLE")]
        tables: Vec<String>,

        /// Restrict execution to tables matching a prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Environment name
        #[arg(short, long, default_value = "development")]
        env: String,
    },

    /// Show discovered versions and their applied state
    Status {
        /// Environment name
        #[arg(short, long, default_value = "development")]
        env: String,
    },

    /// Reserve a new migration version directory
    Generate {
        /// Explicit version (default: maximum discovered + 1)
        #[arg(long)]
        version: Option<String>,

        /// Scaffold unit files for the named tables
        #[arg(long = "table", value_name = "TABLE")]
        tables: Vec<String>,

        /// Reuse an existing version directory
        #[arg(long)]
        force: bool,
    },
}
