//! CLI - Command-line argument parsing
//!
//! Defines the CLI structure using clap.
//! Keeps argument parsing separate from execution logic.

use clap::{ArgAction, Args, Parser, Subcommand};
use fleetgrade_common::RecordField;
use std::path::PathBuf;

/// Fleetgrade - hardware report grading for desktop fleets
#[derive(Parser, Debug)]
#[command(name = "fleetgradectl")]
#[command(about = "Grade AIDA64 hardware reports into replace / upgrade / healthy", long_about = None)]
#[command(version = fleetgrade_common::VERSION)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Config file (overrides ./fleetgrade.toml and the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process every report in a directory, store and export the results
    Scan(ScanArgs),

    /// Re-export the stored records
    Export(ExportArgs),

    /// Correct one field of a stored record
    Set(SetArgs),

    /// List stored records
    List(ListArgs),

    /// Extract and classify a single report, print it as JSON
    Show(ShowArgs),

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Report directory (defaults to settings.reports_directory)
    pub dir: Option<PathBuf>,

    /// Main export file; sibling files are named after its stem
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Database file
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Store results but write no export files
    #[arg(long)]
    pub no_export: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub db: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SetArgs {
    /// Report file name, e.g. PC-042.htm
    pub file: String,

    /// Column name (cpu_socket) or spreadsheet title ("CPU socket")
    pub field: RecordField,

    pub value: String,

    #[arg(long)]
    pub db: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Only this category (1 replace, 2 upgrade, 3 healthy)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=3))]
    pub category: Option<u8>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,

    #[arg(long)]
    pub db: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Path to a report file
    pub file: PathBuf,
}

/// Config subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Write the default configuration
    Init {
        /// Target file (defaults to ./fleetgrade.toml)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}
