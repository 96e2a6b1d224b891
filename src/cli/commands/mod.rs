//! CLI command implementations

pub mod check;
pub mod completions;
pub mod config;
pub mod cred;
pub mod group;
pub mod host;
pub mod init;
pub mod stats;
