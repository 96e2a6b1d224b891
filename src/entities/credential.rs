//! Credential entity type

use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::error::{Error, Result};
use crate::core::identity::DocumentType;

/// How a credential authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Key,
    Password,
}

impl std::fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMethod::Key => write!(f, "key"),
            AuthMethod::Password => write!(f, "password"),
        }
    }
}

/// SSH authentication material that can be shared by many hosts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Unique identifier
    #[serde(default)]
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Remote login user
    #[serde(default)]
    pub user: String,

    /// Path to a private key file
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key_path: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,

    /// Passphrase unlocking `key_path`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub passphrase: String,
}

impl Entity for Credential {
    const TYPE: DocumentType = DocumentType::Credential;

    fn key(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Err(Error::invalid(Self::TYPE, &self.id, reason));

        if self.id.is_empty() {
            return invalid("id cannot be empty");
        }
        self.check_key()?;
        if self.name.is_empty() {
            return invalid("name cannot be empty");
        }
        if self.user.is_empty() {
            return invalid("user cannot be empty");
        }
        if self.key_path.is_empty() && self.password.is_empty() {
            return invalid("must have either key_path or password");
        }
        Ok(())
    }
}

impl Credential {
    /// Create a credential with no authentication material yet
    pub fn new(id: impl Into<String>, name: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            user: user.into(),
            ..Default::default()
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn with_key(mut self, key_path: impl Into<String>) -> Self {
        self.key_path = key_path.into();
        self
    }

    /// Key-based when a key path is set, password otherwise
    pub fn auth_method(&self) -> AuthMethod {
        if self.key_path.is_empty() {
            AuthMethod::Password
        } else {
            AuthMethod::Key
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::{decode_as, encode};
    use crate::core::error::ErrorKind;
    use std::path::Path;

    #[test]
    fn test_credential_roundtrip() {
        let mut cred = Credential::new("cred1", "Admin key", "admin").with_key("~/.ssh/id_ed25519");
        cred.description = "shared admin key".to_string();
        cred.passphrase = "hunter2".to_string();

        let yaml = encode(&cred).unwrap();
        let (_, parsed) = decode_as::<Credential>(&yaml, Path::new("c.yaml")).unwrap();
        assert_eq!(cred, parsed);
    }

    #[test]
    fn test_credential_requires_secret() {
        let cred = Credential::new("cred1", "Admin", "admin");
        let err = cred.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("key_path or password"));

        assert!(cred.clone().with_password("x").validate().is_ok());
        assert!(cred.with_key("/k").validate().is_ok());
    }

    #[test]
    fn test_credential_required_fields() {
        assert!(Credential::new("", "n", "u").with_password("x").validate().is_err());
        assert!(Credential::new("c", "", "u").with_password("x").validate().is_err());
        assert!(Credential::new("c", "n", "").with_password("x").validate().is_err());
        assert!(Credential::new("a/b", "n", "u").with_password("x").validate().is_err());
    }

    #[test]
    fn test_auth_method() {
        let cred = Credential::new("c", "n", "u").with_password("x");
        assert_eq!(cred.auth_method(), AuthMethod::Password);
        assert_eq!(cred.with_key("/k").auth_method(), AuthMethod::Key);
    }

    #[test]
    fn test_empty_optionals_are_not_serialized() {
        let cred = Credential::new("c", "n", "u").with_password("x");
        let yaml = encode(&cred).unwrap();
        assert!(!yaml.contains("key_path"));
        assert!(!yaml.contains("passphrase"));
        assert!(yaml.contains("type: credential"));
    }
}
