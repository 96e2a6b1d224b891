//! Shared helper functions for CLI commands

use miette::Result;

use crate::cli::GlobalOpts;
use crate::core::config::default_base_dir;
use crate::core::{Config, Manager};

/// Load the configuration that applies to this invocation
///
/// With `--data-dir` the configuration lives in that directory; otherwise the
/// user config directory is used.
pub fn load_config(global: &GlobalOpts) -> Result<Config> {
    let base = global.data_dir.clone().unwrap_or_else(default_base_dir);
    Ok(Config::load_from(&base)?)
}

/// Open the inventory and load every entity in it
pub fn open_manager(global: &GlobalOpts) -> Result<(Manager, Config)> {
    let config = load_config(global)?;
    let manager = Manager::open(global.data_dir.as_deref(), &config)?;
    manager.load_all()?;
    Ok((manager, config))
}

/// Truncate a string to max_len, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Escape a string for CSV output
///
/// Handles commas, quotes, and newlines according to RFC 4180.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Parse a `key=value` pair from the command line
pub fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

/// Show "-" for empty values in tables
pub fn or_dash(s: &str) -> String {
    if s.is_empty() {
        "-".to_string()
    } else {
        s.to_string()
    }
}
