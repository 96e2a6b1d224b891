//! sshinv: SSH host inventory
//!
//! Credentials, hosts and host groups stored as type-tagged YAML documents,
//! managed in memory with referential integrity between them.

pub mod cli;
pub mod core;
pub mod entities;
pub mod yaml;
