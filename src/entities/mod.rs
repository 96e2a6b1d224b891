//! Entity type definitions
//!
//! The inventory holds three related entity kinds:
//!
//! - [`Credential`] - Shared SSH authentication material
//! - [`Host`] - A remote server, referencing a credential or carrying inline auth
//! - [`Group`] - Host membership plus a child-group hierarchy

pub mod credential;
pub mod group;
pub mod host;

pub use credential::{AuthMethod, Credential};
pub use group::Group;
pub use host::{Host, HostStatus};
