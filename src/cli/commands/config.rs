//! `sshinv config` command - Configuration management

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::load_config;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::encode;

/// Keys accepted by `config set`
const KEYS: &[&str] = &[
    "data_dir",
    "theme",
    "language",
    "default_ssh_port",
    "ssh_timeout",
];

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration values
    Show(ShowArgs),

    /// Set a configuration value
    Set(SetArgs),

    /// Show the path of the configuration file
    Path,

    /// List all configuration keys
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Configuration key (e.g., theme, default_ssh_port)
    pub key: String,

    /// Value to set
    pub value: String,
}

pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args, global),
        ConfigCommands::Set(args) => run_set(args, global),
        ConfigCommands::Path => {
            println!("{}", load_config(global)?.path().display());
            Ok(())
        }
        ConfigCommands::Keys => {
            for key in KEYS {
                println!("{}", key);
            }
            Ok(())
        }
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;

    if let Some(key) = args.key {
        let value = match key.as_str() {
            "data_dir" => config.data_dir().display().to_string(),
            "theme" => config.theme.clone(),
            "language" => config.language.clone(),
            "default_ssh_port" => config.default_ssh_port.to_string(),
            "ssh_timeout" => config.ssh_timeout.to_string(),
            other => return Err(miette::miette!("Unknown config key '{}'", other)),
        };
        println!("{}", value);
        return Ok(());
    }

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&config).into_diagnostic()?);
        }
        OutputFormat::Yaml => print!("{}", encode(&config)?),
        _ => {
            println!("{}", style("Configuration").bold());
            println!("  data_dir:         {}", style(config.data_dir().display()).cyan());
            println!("  theme:            {}", config.theme);
            println!("  language:         {}", config.language);
            println!("  default_ssh_port: {}", config.default_ssh_port);
            println!("  ssh_timeout:      {}s", config.ssh_timeout);
            if !global.quiet {
                println!();
                println!("  {}", style(config.path().display()).dim());
            }
        }
    }
    Ok(())
}

fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    let mut config = load_config(global)?;
    config.set_field(&args.key, &args.value)?;

    if !global.quiet {
        println!(
            "{} Set {} = {}",
            style("✓").green(),
            style(&args.key).cyan(),
            style(&args.value).yellow()
        );
    }
    Ok(())
}
