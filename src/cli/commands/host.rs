//! `sshinv host` command - Host management

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{open_manager, or_dash, parse_key_value};
use crate::cli::output::{print_entity, print_list, rule, Column, Listing};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Entity;
use crate::core::identity::generate_id;
use crate::entities::Host;

#[derive(Subcommand, Debug)]
pub enum HostCommands {
    /// List hosts with filtering
    List(ListArgs),

    /// Show a host's details
    Show(ShowArgs),

    /// Create a new host
    New(NewArgs),

    /// Change fields of an existing host
    Edit(EditArgs),

    /// Remove a host (and drop it from every group)
    Rm(RmArgs),

    /// Show the credential a host authenticates with
    Cred(CredArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only hosts carrying this tag
    #[arg(long, short = 't')]
    pub tag: Option<String>,

    /// Only hosts referencing this credential
    #[arg(long, short = 'c')]
    pub credential: Option<String>,

    /// Only hosts in this group
    #[arg(long, short = 'g')]
    pub group: Option<String>,

    /// With --group, include hosts of descendant groups
    #[arg(long, short = 'r', requires = "group")]
    pub recursive: bool,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Host ID
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Host ID (default: generated)
    #[arg(long)]
    pub id: Option<String>,

    /// Display name
    #[arg(long, short = 'n')]
    pub name: String,

    /// Hostname or IP address
    #[arg(long, short = 'a')]
    pub address: String,

    /// SSH port (default: from config)
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Shared credential ID
    #[arg(long, short = 'c')]
    pub credential: Option<String>,

    /// Inline login user
    #[arg(long, short = 'u')]
    pub user: Option<String>,

    /// Inline private key path
    #[arg(long, short = 'k')]
    pub key: Option<String>,

    /// Inline password
    #[arg(long)]
    pub password: Option<String>,

    /// Tag (repeatable)
    #[arg(long = "tag", short = 't')]
    pub tags: Vec<String>,

    /// Variable as KEY=VALUE (repeatable)
    #[arg(long = "var", value_parser = parse_key_value)]
    pub vars: Vec<(String, String)>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Host ID
    pub id: String,

    #[arg(long, short = 'n')]
    pub name: Option<String>,

    #[arg(long, short = 'a')]
    pub address: Option<String>,

    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Reference a shared credential
    #[arg(long, short = 'c', conflicts_with = "no_credential")]
    pub credential: Option<String>,

    /// Drop the credential reference (inline auth must then be set)
    #[arg(long)]
    pub no_credential: bool,

    #[arg(long, short = 'u')]
    pub user: Option<String>,

    #[arg(long, short = 'k')]
    pub key: Option<String>,

    #[arg(long)]
    pub password: Option<String>,

    /// Tag to add (repeatable)
    #[arg(long = "add-tag")]
    pub add_tags: Vec<String>,

    /// Tag to remove (repeatable)
    #[arg(long = "remove-tag")]
    pub remove_tags: Vec<String>,

    /// Variable as KEY=VALUE (repeatable)
    #[arg(long = "var", value_parser = parse_key_value)]
    pub vars: Vec<(String, String)>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct RmArgs {
    /// Host ID
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct CredArgs {
    /// Host ID
    pub id: String,
}

/// Run a host subcommand
pub fn run(cmd: HostCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        HostCommands::List(args) => run_list(args, global),
        HostCommands::Show(args) => run_show(args, global),
        HostCommands::New(args) => run_new(args, global),
        HostCommands::Edit(args) => run_edit(args, global),
        HostCommands::Rm(args) => run_rm(args, global),
        HostCommands::Cred(args) => run_cred(args, global),
    }
}

fn auth_summary(host: &Host) -> String {
    match host.credential_ref() {
        Some(cred) => format!("cred:{}", cred),
        None => format!("inline:{}", host.user),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (manager, _) = open_manager(global)?;

    let mut hosts = match &args.group {
        Some(group) if args.recursive => manager.get_all_hosts_in_group(group)?,
        Some(group) => manager.get_hosts_by_group(group)?,
        None => manager.list_hosts(),
    };

    if let Some(tag) = &args.tag {
        hosts.retain(|h| h.has_tag(tag));
    }
    if let Some(cred) = &args.credential {
        hosts.retain(|h| h.credential_ref() == Some(cred.as_str()));
    }

    if args.count {
        println!("{}", hosts.len());
        return Ok(());
    }

    let mut listing = Listing::new(
        "host",
        vec![
            Column::new("ID", 28),
            Column::new("NAME", 18),
            Column::new("ADDRESS", 24),
            Column::new("AUTH", 20),
            Column::new("TAGS", 20),
        ],
    );
    for host in &hosts {
        listing.push(
            &host.id,
            vec![
                host.id.clone(),
                host.name.clone(),
                host.ssh_address(),
                auth_summary(host),
                or_dash(&host.tags.join(",")),
            ],
        );
    }

    print_list(&hosts, &listing, global.format, global.quiet)
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (manager, _) = open_manager(global)?;
    let host = manager.get_host(&args.id)?;
    let groups = manager.find_groups_by_host(&args.id);

    print_entity(&host, global.format, |host| {
        println!("{}", rule());
        println!("{}: {}", style("ID").bold(), style(&host.id).cyan());
        println!("{}: {}", style("Name").bold(), style(&host.name).yellow());
        println!("{}: {}", style("Address").bold(), host.ssh_address());
        match host.credential_ref() {
            Some(cred) => println!("{}: {}", style("Credential").bold(), style(cred).cyan()),
            None => {
                println!("{}: {} (inline)", style("User").bold(), host.user);
                if !host.key_path.is_empty() {
                    println!("{}: {}", style("Key").bold(), host.key_path);
                }
            }
        }
        println!("{}: {}", style("Status").bold(), host.status);
        println!("{}", rule());

        if !host.description.is_empty() {
            println!();
            println!("{}", host.description);
        }

        if !host.tags.is_empty() {
            println!();
            println!("{}: {}", style("Tags").bold(), host.tags.join(", "));
        }

        if !host.vars.is_empty() {
            println!();
            println!("{}:", style("Vars").bold());
            for (k, v) in &host.vars {
                println!("  {} = {}", k, v);
            }
        }

        if !groups.is_empty() {
            println!();
            let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
            println!("{}: {}", style("Groups").bold(), names.join(", "));
        }
    })
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (manager, config) = open_manager(global)?;

    let id = args.id.unwrap_or_else(generate_id);
    let mut host = Host::new(id, args.name, args.address);
    host.port = args.port.unwrap_or(config.default_ssh_port);
    host.credential_id = args.credential;
    host.user = args.user.unwrap_or_default();
    host.key_path = args.key.unwrap_or_default();
    host.password = args.password.unwrap_or_default();
    host.description = args.description.unwrap_or_default();
    for tag in args.tags {
        host.add_tag(tag);
    }
    for (k, v) in args.vars {
        host.set_var(k, v);
    }

    manager.add_host(host.clone())?;

    if global.format == OutputFormat::Id {
        println!("{}", host.id);
    } else if !global.quiet {
        println!(
            "{} Created host {}",
            style("✓").green(),
            style(&host.id).cyan()
        );
        println!(
            "   {}",
            style(manager.repository().base_dir().join(host.file_name()).display()).dim()
        );
        println!("   Address: {}", style(host.ssh_address()).yellow());
    }
    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let (manager, _) = open_manager(global)?;
    let mut host = manager.get_host(&args.id)?;

    if let Some(name) = args.name {
        host.name = name;
    }
    if let Some(address) = args.address {
        host.address = address;
    }
    if let Some(port) = args.port {
        host.port = port;
    }
    if args.no_credential {
        host.credential_id = None;
    }
    if let Some(cred) = args.credential {
        host.credential_id = Some(cred);
    }
    if let Some(user) = args.user {
        host.user = user;
    }
    if let Some(key) = args.key {
        host.key_path = key;
    }
    if let Some(password) = args.password {
        host.password = password;
    }
    if let Some(description) = args.description {
        host.description = description;
    }
    for tag in &args.remove_tags {
        host.remove_tag(tag);
    }
    for tag in args.add_tags {
        host.add_tag(tag);
    }
    for (k, v) in args.vars {
        host.set_var(k, v);
    }

    manager.update_host(host)?;

    if !global.quiet {
        println!(
            "{} Updated host {}",
            style("✓").green(),
            style(&args.id).cyan()
        );
    }
    Ok(())
}

fn run_rm(args: RmArgs, global: &GlobalOpts) -> Result<()> {
    let (manager, _) = open_manager(global)?;
    let groups = manager.find_groups_by_host(&args.id);
    manager.remove_host(&args.id)?;

    if !global.quiet {
        println!(
            "{} Removed host {}",
            style("✓").green(),
            style(&args.id).cyan()
        );
        for group in &groups {
            println!("   Dropped from group {}", style(&group.name).yellow());
        }
    }
    Ok(())
}

fn run_cred(args: CredArgs, global: &GlobalOpts) -> Result<()> {
    let (manager, _) = open_manager(global)?;
    let cred = manager.get_host_credential(&args.id)?;

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&cred).into_diagnostic()?);
        }
        OutputFormat::Id => println!("{}", cred.id),
        _ => {
            println!("{}: {}", style("Credential").bold(), style(&cred.id).cyan());
            println!("{}: {}", style("Name").bold(), cred.name);
            println!("{}: {}", style("User").bold(), cred.user);
            if !cred.key_path.is_empty() {
                println!("{}: {}", style("Key").bold(), cred.key_path);
            }
            if !cred.password.is_empty() {
                println!("{}: ********", style("Password").bold());
            }
        }
    }
    Ok(())
}
