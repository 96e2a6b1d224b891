//! Document type tags and entity identities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ulid::Ulid;

/// Document type discriminator stored in the `type` field of every document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// Remote host reachable over SSH
    Host,
    /// Named collection of hosts and child groups
    Group,
    /// Shared authentication material
    Credential,
    /// Application configuration singleton
    Config,
}

impl DocumentType {
    /// Get the string representation of the tag
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Host => "host",
            DocumentType::Group => "group",
            DocumentType::Credential => "credential",
            DocumentType::Config => "config",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "host" => Ok(DocumentType::Host),
            "group" => Ok(DocumentType::Group),
            "credential" => Ok(DocumentType::Credential),
            "config" => Ok(DocumentType::Config),
            _ => Err(IdParseError::UnknownType(s.to_string())),
        }
    }
}

/// Generate a fresh identifier for a new entity
///
/// Identifiers are lowercase ULIDs, so they sort by creation time and are
/// safe to embed in file names.
pub fn generate_id() -> String {
    Ulid::new().to_string().to_lowercase()
}

/// Check that a key can be embedded in a file name
pub fn check_file_safe(key: &str) -> Result<(), IdParseError> {
    if key.contains('/') || key.contains('\\') || key == "." || key == ".." {
        return Err(IdParseError::UnsafeKey(key.to_string()));
    }
    if key.chars().any(|c| c.is_control()) {
        return Err(IdParseError::UnsafeKey(key.to_string()));
    }
    Ok(())
}

/// File name used to persist an entity of the given type
pub fn entity_file_name(doc_type: DocumentType, key: &str) -> String {
    match doc_type {
        DocumentType::Config => "config.yaml".to_string(),
        other => format!("{}-{}.yaml", other, key),
    }
}

/// Errors that can occur when parsing tags or keys
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error("unknown document type: '{0}'")]
    UnknownType(String),

    #[error("'{0}' cannot be used as an identifier (no path separators or control characters)")]
    UnsafeKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_roundtrip() {
        for t in [
            DocumentType::Host,
            DocumentType::Group,
            DocumentType::Credential,
            DocumentType::Config,
        ] {
            let parsed: DocumentType = t.as_str().parse().unwrap();
            assert_eq!(t, parsed);
        }
    }

    #[test]
    fn test_document_type_parse_is_case_insensitive() {
        assert_eq!("Host".parse::<DocumentType>().unwrap(), DocumentType::Host);
        assert_eq!(" GROUP ".parse::<DocumentType>().unwrap(), DocumentType::Group);
        assert!("server".parse::<DocumentType>().is_err());
    }

    #[test]
    fn test_document_type_serializes_lowercase() {
        let yaml = serde_yml::to_string(&DocumentType::Credential).unwrap();
        assert_eq!(yaml.trim(), "credential");
    }

    #[test]
    fn test_generate_id_is_unique_and_file_safe() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 26);
        assert!(check_file_safe(&a).is_ok());
        assert_eq!(a, a.to_lowercase());
    }

    #[test]
    fn test_check_file_safe_rejects_separators() {
        assert!(check_file_safe("web-1").is_ok());
        assert!(check_file_safe("../etc").is_err());
        assert!(check_file_safe("a\\b").is_err());
        assert!(check_file_safe("..").is_err());
    }

    #[test]
    fn test_entity_file_name() {
        assert_eq!(entity_file_name(DocumentType::Host, "web1"), "host-web1.yaml");
        assert_eq!(entity_file_name(DocumentType::Config, "ignored"), "config.yaml");
    }
}
