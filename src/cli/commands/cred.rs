//! `sshinv cred` command - Credential management

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::{open_manager, or_dash};
use crate::cli::output::{print_entity, print_list, rule, Column, Listing};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Entity;
use crate::core::identity::generate_id;
use crate::entities::{AuthMethod, Credential};

#[derive(Subcommand, Debug)]
pub enum CredCommands {
    /// List credentials
    List,

    /// Show a credential's details
    Show(ShowArgs),

    /// Create a new credential
    New(NewArgs),

    /// Remove a credential no host uses
    Rm(RmArgs),
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Credential ID
    pub id: String,

    /// Print secrets instead of masking them
    #[arg(long)]
    pub reveal: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Credential ID (default: generated)
    #[arg(long)]
    pub id: Option<String>,

    /// Display name
    #[arg(long, short = 'n')]
    pub name: String,

    /// Login user
    #[arg(long, short = 'u')]
    pub user: String,

    /// Private key path
    #[arg(long, short = 'k')]
    pub key: Option<String>,

    /// Password
    #[arg(long, short = 'p')]
    pub password: Option<String>,

    /// Private key passphrase
    #[arg(long)]
    pub passphrase: Option<String>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct RmArgs {
    /// Credential ID
    pub id: String,
}

/// Run a credential subcommand
pub fn run(cmd: CredCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CredCommands::List => run_list(global),
        CredCommands::Show(args) => run_show(args, global),
        CredCommands::New(args) => run_new(args, global),
        CredCommands::Rm(args) => run_rm(args, global),
    }
}

fn auth_label(cred: &Credential) -> &'static str {
    match cred.auth_method() {
        AuthMethod::Key => "key",
        AuthMethod::Password => "password",
    }
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let (manager, _) = open_manager(global)?;
    let creds = manager.list_credentials();

    let mut listing = Listing::new(
        "credential",
        vec![
            Column::new("ID", 28),
            Column::new("NAME", 20),
            Column::new("USER", 14),
            Column::new("AUTH", 9),
            Column::new("HOSTS", 6),
        ],
    );
    for cred in &creds {
        let users = manager.find_hosts_by_credential(&cred.id).len();
        listing.push(
            &cred.id,
            vec![
                cred.id.clone(),
                cred.name.clone(),
                cred.user.clone(),
                auth_label(cred).to_string(),
                users.to_string(),
            ],
        );
    }

    // secrets never leave through structured list output
    let masked: Vec<Credential> = creds.iter().map(masked).collect();
    print_list(&masked, &listing, global.format, global.quiet)
}

fn masked(cred: &Credential) -> Credential {
    let mut cred = cred.clone();
    if !cred.password.is_empty() {
        cred.password = "********".to_string();
    }
    if !cred.passphrase.is_empty() {
        cred.passphrase = "********".to_string();
    }
    cred
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (manager, _) = open_manager(global)?;
    let cred = manager.get_credential(&args.id)?;
    let cred = if args.reveal { cred } else { masked(&cred) };
    let hosts = manager.find_hosts_by_credential(&args.id);

    print_entity(&cred, global.format, |cred| {
        println!("{}", rule());
        println!("{}: {}", style("ID").bold(), style(&cred.id).cyan());
        println!("{}: {}", style("Name").bold(), style(&cred.name).yellow());
        println!("{}: {}", style("User").bold(), cred.user);
        println!("{}: {}", style("Auth").bold(), auth_label(cred));
        if !cred.key_path.is_empty() {
            println!("{}: {}", style("Key").bold(), cred.key_path);
        }
        if !cred.password.is_empty() {
            println!("{}: {}", style("Password").bold(), cred.password);
        }
        if !cred.passphrase.is_empty() {
            println!("{}: {}", style("Passphrase").bold(), cred.passphrase);
        }
        println!("{}", rule());

        if !cred.description.is_empty() {
            println!();
            println!("{}", cred.description);
        }

        println!();
        println!("{} ({}):", style("Used by").bold(), hosts.len());
        for host in &hosts {
            println!("  • {} {}", style(&host.id).cyan(), or_dash(&host.name));
        }
    })
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (manager, _) = open_manager(global)?;

    let id = args.id.unwrap_or_else(generate_id);
    let mut cred = Credential::new(id, args.name, args.user);
    if let Some(key) = args.key {
        cred = cred.with_key(key);
    }
    if let Some(password) = args.password {
        cred = cred.with_password(password);
    }
    cred.passphrase = args.passphrase.unwrap_or_default();
    cred.description = args.description.unwrap_or_default();

    manager.add_credential(cred.clone())?;

    if global.format == OutputFormat::Id {
        println!("{}", cred.id);
    } else if !global.quiet {
        println!(
            "{} Created credential {}",
            style("✓").green(),
            style(&cred.id).cyan()
        );
        println!(
            "   {}",
            style(manager.repository().base_dir().join(cred.file_name()).display()).dim()
        );
    }
    Ok(())
}

fn run_rm(args: RmArgs, global: &GlobalOpts) -> Result<()> {
    let (manager, _) = open_manager(global)?;
    manager.remove_credential(&args.id)?;

    if !global.quiet {
        println!(
            "{} Removed credential {}",
            style("✓").green(),
            style(&args.id).cyan()
        );
    }
    Ok(())
}
