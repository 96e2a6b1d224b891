//! Output rendering shared by the list and show commands

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{escape_csv, truncate_str};
use crate::cli::OutputFormat;
use crate::core::entity::{encode, Entity};

/// A list column: header text and padded width in TSV output
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub header: &'static str,
    pub width: usize,
}

impl Column {
    pub const fn new(header: &'static str, width: usize) -> Self {
        Self { header, width }
    }
}

/// Tabular view of a list of entities
pub struct Listing {
    noun: &'static str,
    columns: Vec<Column>,
    rows: Vec<(String, Vec<String>)>,
}

impl Listing {
    pub fn new(noun: &'static str, columns: Vec<Column>) -> Self {
        Self {
            noun,
            columns,
            rows: Vec::new(),
        }
    }

    /// Add a row; `id` is what `--format id` prints
    pub fn push(&mut self, id: impl Into<String>, cells: Vec<String>) {
        self.rows.push((id.into(), cells));
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_markdown(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(self.columns.iter().map(|c| c.header.to_string()));
        for (_, cells) in &self.rows {
            builder.push_record(cells.iter().cloned());
        }
        builder.build().with(Style::markdown()).to_string()
    }

    pub fn to_csv(&self) -> String {
        let mut out = self
            .columns
            .iter()
            .map(|c| c.header.to_lowercase())
            .collect::<Vec<_>>()
            .join(",");
        out.push('\n');
        for (_, cells) in &self.rows {
            let line: Vec<String> = cells.iter().map(|c| escape_csv(c)).collect();
            out.push_str(&line.join(","));
            out.push('\n');
        }
        out
    }

    fn print_tsv(&self, quiet: bool) {
        let header: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{:<width$}", style(c.header).bold(), width = c.width))
            .collect();
        println!("{}", header.join(" "));
        let rule: usize = self.columns.iter().map(|c| c.width + 1).sum();
        println!("{}", "-".repeat(rule.saturating_sub(1)));

        for (_, cells) in &self.rows {
            let row: Vec<String> = cells
                .iter()
                .zip(&self.columns)
                .map(|(cell, col)| {
                    format!(
                        "{:<width$}",
                        truncate_str(cell, col.width.saturating_sub(2)),
                        width = col.width
                    )
                })
                .collect();
            println!("{}", row.join(" "));
        }

        if !quiet {
            println!();
            println!("{} {}(s) found.", style(self.rows.len()).cyan(), self.noun);
        }
    }
}

/// Print a list of entities in the requested format
///
/// `Auto` means TSV. JSON and YAML serialize the entities themselves rather
/// than the table.
pub fn print_list<T: Serialize>(
    items: &[T],
    listing: &Listing,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(items).into_diagnostic()?);
        }
        OutputFormat::Csv => print!("{}", listing.to_csv()),
        OutputFormat::Md => println!("{}", listing.to_markdown()),
        OutputFormat::Id => {
            for (id, _) in &listing.rows {
                println!("{}", id);
            }
        }
        OutputFormat::Auto | OutputFormat::Tsv => {
            if listing.is_empty() {
                if !quiet {
                    println!("No {}s found.", listing.noun);
                }
                return Ok(());
            }
            listing.print_tsv(quiet);
        }
    }
    Ok(())
}

/// Print one entity; `pretty` renders the human-readable view
///
/// YAML output is the exact document that would be stored on disk.
pub fn print_entity<T: Entity>(entity: &T, format: OutputFormat, pretty: impl FnOnce(&T)) -> Result<()> {
    match format {
        OutputFormat::Yaml => print!("{}", encode(entity)?),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(entity).into_diagnostic()?);
        }
        OutputFormat::Id => println!("{}", entity.key()),
        _ => pretty(entity),
    }
    Ok(())
}

/// Horizontal rule used around detail views
pub fn rule() -> String {
    style("─".repeat(60)).dim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Listing {
        let mut listing = Listing::new(
            "host",
            vec![Column::new("ID", 10), Column::new("ADDRESS", 20)],
        );
        listing.push("web", vec!["web".to_string(), "10.0.0.1:22".to_string()]);
        listing.push("db", vec!["db".to_string(), "a, b".to_string()]);
        listing
    }

    #[test]
    fn test_csv_escapes_cells() {
        let csv = sample().to_csv();
        assert!(csv.starts_with("id,address\n"));
        assert!(csv.contains("db,\"a, b\""));
    }

    #[test]
    fn test_markdown_table() {
        let md = sample().to_markdown();
        assert!(md.contains("| ID"));
        assert!(md.contains("10.0.0.1:22"));
        assert_eq!(sample().len(), 2);
    }
}
