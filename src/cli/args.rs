//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    check::CheckArgs, completions::CompletionsArgs, config::ConfigCommands, cred::CredCommands,
    group::GroupCommands, host::HostCommands, init::InitArgs,
};

#[derive(Parser)]
#[command(name = "sshinv")]
#[command(author, version, about = "SSH host inventory")]
#[command(long_about = "Manage SSH credentials, hosts and host groups stored as plain YAML files.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Inventory directory (default: the user config directory)
    #[arg(long, global = true, env = "SSHINV_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize an inventory directory
    Init(InitArgs),

    /// Credential management
    #[command(subcommand)]
    Cred(CredCommands),

    /// Host management
    #[command(subcommand)]
    Host(HostCommands),

    /// Group management
    #[command(subcommand)]
    Group(GroupCommands),

    /// Check every inventory file for syntax and reference errors
    Check(CheckArgs),

    /// Show inventory counts
    Stats,

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (pretty for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just IDs, one per line
    Id,
}
