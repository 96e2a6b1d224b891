//! `sshinv stats` command - Inventory counts

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::open_manager;
use crate::cli::{GlobalOpts, OutputFormat};

pub fn run(global: &GlobalOpts) -> Result<()> {
    let (manager, _) = open_manager(global)?;
    let stats = manager.stats();

    match global.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats).into_diagnostic()?),
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&stats).into_diagnostic()?),
        _ => {
            println!("{}", style("Inventory").bold());
            println!("  Credentials: {}", style(stats.credentials).cyan());
            println!("  Hosts:       {}", style(stats.hosts).cyan());
            println!("  Groups:      {}", style(stats.groups).cyan());
            if !global.quiet {
                println!();
                println!(
                    "  {}",
                    style(manager.repository().base_dir().display()).dim()
                );
            }
        }
    }
    Ok(())
}
