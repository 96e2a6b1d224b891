//! `sshinv group` command - Group management

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::{open_manager, or_dash, parse_key_value};
use crate::cli::output::{print_entity, print_list, rule, Column, Listing};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::entities::{Group, Host};

#[derive(Subcommand, Debug)]
pub enum GroupCommands {
    /// List groups
    List,

    /// Show a group's details
    Show(ShowArgs),

    /// Create a new group
    New(NewArgs),

    /// Remove a group that is not a child of another group
    Rm(NameArgs),

    /// Add a host to a group
    AddHost(AddHostArgs),

    /// Make one group a child of another
    AddChild(AddChildArgs),

    /// List the hosts of a group
    Hosts(HostsArgs),
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Group name
    pub name: String,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Group name
    pub name: String,

    /// Member host ID (repeatable)
    #[arg(long = "host")]
    pub hosts: Vec<String>,

    /// Child group name (repeatable)
    #[arg(long = "child")]
    pub children: Vec<String>,

    /// Variable as KEY=VALUE (repeatable)
    #[arg(long = "var", value_parser = parse_key_value)]
    pub vars: Vec<(String, String)>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct NameArgs {
    /// Group name
    pub name: String,
}

#[derive(clap::Args, Debug)]
pub struct AddHostArgs {
    /// Group name
    pub group: String,

    /// Host ID
    pub host: String,
}

#[derive(clap::Args, Debug)]
pub struct AddChildArgs {
    /// Parent group name
    pub group: String,

    /// Child group name
    pub child: String,
}

#[derive(clap::Args, Debug)]
pub struct HostsArgs {
    /// Group name
    pub name: String,

    /// Include hosts of descendant groups
    #[arg(long, short = 'r')]
    pub recursive: bool,
}

/// Run a group subcommand
pub fn run(cmd: GroupCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        GroupCommands::List => run_list(global),
        GroupCommands::Show(args) => run_show(args, global),
        GroupCommands::New(args) => run_new(args, global),
        GroupCommands::Rm(args) => run_rm(args, global),
        GroupCommands::AddHost(args) => run_add_host(args, global),
        GroupCommands::AddChild(args) => run_add_child(args, global),
        GroupCommands::Hosts(args) => run_hosts(args, global),
    }
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let (manager, _) = open_manager(global)?;
    let groups = manager.list_groups();

    let mut listing = Listing::new(
        "group",
        vec![
            Column::new("NAME", 20),
            Column::new("HOSTS", 6),
            Column::new("CHILDREN", 24),
            Column::new("DESCRIPTION", 30),
        ],
    );
    for group in &groups {
        listing.push(
            &group.name,
            vec![
                group.name.clone(),
                group.host_count().to_string(),
                or_dash(&group.child_group_names.join(",")),
                or_dash(&group.description),
            ],
        );
    }

    print_list(&groups, &listing, global.format, global.quiet)
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (manager, _) = open_manager(global)?;
    let group = manager.get_group(&args.name)?;
    let hosts = manager.get_hosts_by_group(&args.name)?;

    print_entity(&group, global.format, |group| {
        println!("{}", rule());
        println!("{}: {}", style("Name").bold(), style(&group.name).cyan());
        if !group.description.is_empty() {
            println!("{}: {}", style("Description").bold(), group.description);
        }
        println!("{}", rule());

        println!();
        println!("{} ({}):", style("Hosts").bold(), hosts.len());
        for host in &hosts {
            println!(
                "  • {} {} {}",
                style(&host.id).cyan(),
                host.name,
                style(host.ssh_address()).dim()
            );
        }

        if !group.child_group_names.is_empty() {
            println!();
            println!(
                "{}: {}",
                style("Child groups").bold(),
                group.child_group_names.join(", ")
            );
        }

        if !group.vars.is_empty() {
            println!();
            println!("{}:", style("Vars").bold());
            for (k, v) in &group.vars {
                println!("  {} = {}", k, v);
            }
        }
    })
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (manager, _) = open_manager(global)?;

    let mut group = Group::new(args.name);
    group.description = args.description.unwrap_or_default();
    for host in args.hosts {
        group.add_host(host);
    }
    for child in args.children {
        group.add_child_group(child);
    }
    for (k, v) in args.vars {
        group.set_var(k, v);
    }

    manager.add_group(group.clone())?;

    if global.format == OutputFormat::Id {
        println!("{}", group.name);
    } else if !global.quiet {
        println!(
            "{} Created group {}",
            style("✓").green(),
            style(&group.name).cyan()
        );
    }
    Ok(())
}

fn run_rm(args: NameArgs, global: &GlobalOpts) -> Result<()> {
    let (manager, _) = open_manager(global)?;
    manager.remove_group(&args.name)?;

    if !global.quiet {
        println!(
            "{} Removed group {}",
            style("✓").green(),
            style(&args.name).cyan()
        );
    }
    Ok(())
}

fn run_add_host(args: AddHostArgs, global: &GlobalOpts) -> Result<()> {
    let (manager, _) = open_manager(global)?;
    let mut group = manager.get_group(&args.group)?;

    if group.has_host(&args.host) {
        if !global.quiet {
            println!(
                "Host {} is already in group {}",
                style(&args.host).cyan(),
                style(&args.group).cyan()
            );
        }
        return Ok(());
    }

    group.add_host(args.host.clone());
    manager.update_group(group)?;

    if !global.quiet {
        println!(
            "{} Added host {} to group {}",
            style("✓").green(),
            style(&args.host).cyan(),
            style(&args.group).cyan()
        );
    }
    Ok(())
}

fn run_add_child(args: AddChildArgs, global: &GlobalOpts) -> Result<()> {
    let (manager, _) = open_manager(global)?;
    let mut group = manager.get_group(&args.group)?;

    if !group.has_child_group(&args.child) {
        group.add_child_group(args.child.clone());
        manager.update_group(group)?;
    }

    if !global.quiet {
        println!(
            "{} Group {} is a child of {}",
            style("✓").green(),
            style(&args.child).cyan(),
            style(&args.group).cyan()
        );
    }
    Ok(())
}

fn run_hosts(args: HostsArgs, global: &GlobalOpts) -> Result<()> {
    let (manager, _) = open_manager(global)?;

    let hosts: Vec<Host> = if args.recursive {
        manager.get_all_hosts_in_group(&args.name)?
    } else {
        manager.get_hosts_by_group(&args.name)?
    };

    let mut listing = Listing::new(
        "host",
        vec![
            Column::new("ID", 28),
            Column::new("NAME", 18),
            Column::new("ADDRESS", 24),
        ],
    );
    for host in &hosts {
        listing.push(
            &host.id,
            vec![host.id.clone(), host.name.clone(), host.ssh_address()],
        );
    }

    print_list(&hosts, &listing, global.format, global.quiet)
}
