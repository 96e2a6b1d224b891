//! YAML helpers shared by the CLI

pub mod diagnostics;

pub use diagnostics::{check_syntax, YamlSyntaxError};
