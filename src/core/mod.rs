//! Core module - storage, loading and the inventory manager

pub mod config;
pub mod entity;
pub mod error;
pub mod identity;
pub mod loader;
pub mod manager;
pub mod repository;

pub use config::Config;
pub use entity::{Document, Entity};
pub use error::{Error, ErrorKind, Result};
pub use identity::{DocumentType, IdParseError};
pub use loader::AnyEntity;
pub use manager::{InventoryStats, Manager};
pub use repository::Repository;
