//! `sshinv check` command - Validate every inventory file

use console::style;
use miette::Result;
use std::fs;
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::cli::helpers::load_config;
use crate::cli::GlobalOpts;
use crate::core::config::CONFIG_FILE;
use crate::core::loader::load_entities_from_file;
use crate::core::repository::is_yaml_file;
use crate::core::Manager;
use crate::yaml::check_syntax;

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Continue checking after the first failing file
    #[arg(long, short = 'k')]
    pub keep_going: bool,

    /// Only show the summary
    #[arg(long, short = 's')]
    pub summary: bool,
}

#[derive(Default)]
struct CheckStats {
    files_checked: usize,
    files_failed: usize,
    entities: usize,
}

pub fn run(args: CheckArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let manager = Manager::open(global.data_dir.as_deref(), &config)?;
    let data_dir = manager.repository().base_dir().to_path_buf();

    let mut stats = CheckStats::default();
    let show_files = !args.summary && !global.quiet;

    for path in inventory_files(&data_dir) {
        stats.files_checked += 1;
        let display = path.strip_prefix(&data_dir).unwrap_or(&path).display().to_string();

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                stats.files_failed += 1;
                println!("{} {} - {}", style("✗").red(), display, e);
                if !args.keep_going {
                    break;
                }
                continue;
            }
        };

        // syntax first, so the report can point at the broken line
        if let Err(e) = check_syntax(&content, &display) {
            stats.files_failed += 1;
            if !args.summary {
                println!("{} {} - syntax error", style("✗").red(), display);
                println!("{:?}", miette::Report::new(e));
            }
            if !args.keep_going {
                break;
            }
            continue;
        }

        match load_entities_from_file(&path) {
            Ok(entities) => {
                stats.entities += entities.len();
                if show_files {
                    println!("{} {}", style("✓").green(), display);
                }
            }
            Err(e) => {
                stats.files_failed += 1;
                if !args.summary {
                    println!("{} {}", style("✗").red(), display);
                    println!("{:?}", miette::Report::new(e));
                }
                if !args.keep_going {
                    break;
                }
            }
        }
    }

    // references are only meaningful once every file loads
    let references = if stats.files_failed == 0 {
        manager.load_all().map(|_| ())
    } else {
        Ok(())
    };

    if !global.quiet {
        println!();
        println!("{}", style("─".repeat(60)).dim());
        println!("{}", style("Check Summary").bold());
        println!("{}", style("─".repeat(60)).dim());
        println!("  Files checked:  {}", style(stats.files_checked).cyan());
        println!("  Files failed:   {}", style(stats.files_failed).red());
        println!("  Entities:       {}", style(stats.entities).cyan());
        println!();
    }

    if stats.files_failed > 0 {
        return Err(miette::miette!(
            "Check failed: {} file(s) have errors",
            stats.files_failed
        ));
    }
    references?;

    if !global.quiet {
        println!("{} All files passed!", style("✓").green().bold());
    }
    Ok(())
}

/// Inventory files below `dir`, sorted, excluding the config file
fn inventory_files(dir: &std::path::Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name() != CONFIG_FILE)
        .map(|e| e.into_path())
        .filter(|p| is_yaml_file(p))
        .collect()
}
