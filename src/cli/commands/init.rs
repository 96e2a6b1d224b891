//! `sshinv init` command - Initialize an inventory directory

use console::style;
use miette::Result;

use crate::cli::helpers::load_config;
use crate::cli::GlobalOpts;
use crate::core::{Config, Repository};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config.yaml with defaults
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs, global: &GlobalOpts) -> Result<()> {
    let mut config = load_config(global)?;

    if args.force {
        config.update(|editor| {
            let defaults = Config::default();
            editor.set_data_dir(defaults.data_dir);
            editor.set_theme(defaults.theme);
            editor.set_language(defaults.language);
            editor.set_default_ssh_port(defaults.default_ssh_port)?;
            editor.set_ssh_timeout(defaults.ssh_timeout)
        })?;
    }

    let data_dir = global.data_dir.clone().unwrap_or_else(|| config.data_dir());
    let repo = Repository::open(&data_dir)?;

    if !global.quiet {
        println!(
            "{} Initialized inventory at {}",
            style("✓").green(),
            style(repo.base_dir().display()).cyan()
        );
        println!("   {}", style(config.path().display()).dim());
        println!();
        println!("Next steps:");
        println!("  sshinv cred new --name admin --user root --key ~/.ssh/id_ed25519");
        println!("  sshinv host new --name web --address 10.0.0.1 --credential <ID>");
    }

    Ok(())
}
