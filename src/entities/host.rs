//! Host entity type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::entity::Entity;
use crate::core::error::{Error, Result};
use crate::core::identity::DocumentType;

/// Default SSH port for new hosts
pub const DEFAULT_PORT: u16 = 22;

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Reachability of a host, tracked at runtime only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostStatus {
    #[default]
    Unknown,
    Online,
    Offline,
    Connecting,
}

impl std::fmt::Display for HostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostStatus::Unknown => write!(f, "Unknown"),
            HostStatus::Online => write!(f, "Online"),
            HostStatus::Offline => write!(f, "Offline"),
            HostStatus::Connecting => write!(f, "Connecting"),
        }
    }
}

impl std::str::FromStr for HostStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unknown" => Ok(HostStatus::Unknown),
            "online" => Ok(HostStatus::Online),
            "offline" => Ok(HostStatus::Offline),
            "connecting" => Ok(HostStatus::Connecting),
            _ => Err(format!("Unknown host status: {}", s)),
        }
    }
}

/// A remote server accessible via SSH
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    /// Unique identifier
    #[serde(default)]
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Hostname or IP address
    #[serde(default)]
    pub address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared credential reference (preferred over inline auth)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_id: Option<String>,

    /// Inline login user, used when no credential is referenced
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key_path: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,

    /// Tags for filtering, unique and in insertion order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Free-form variables
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: BTreeMap<String, String>,

    #[serde(skip)]
    pub status: HostStatus,

    /// When the host was last seen reachable
    #[serde(skip)]
    pub last_seen: Option<DateTime<Utc>>,
}

impl PartialEq for Host {
    /// Runtime state is not part of a host's value
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.description == other.description
            && self.address == other.address
            && self.port == other.port
            && self.credential_id == other.credential_id
            && self.user == other.user
            && self.key_path == other.key_path
            && self.password == other.password
            && self.tags == other.tags
            && self.vars == other.vars
    }
}

impl Eq for Host {}

impl Entity for Host {
    const TYPE: DocumentType = DocumentType::Host;

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
        let invalid = |reason: String| Err(Error::invalid(Self::TYPE, &self.id, reason));

        if self.id.is_empty() {
            return invalid("id cannot be empty".into());
        }
        self.check_key()?;
        if self.name.is_empty() {
            return invalid("name cannot be empty".into());
        }
        if self.address.is_empty() {
            return invalid("address cannot be empty".into());
        }
        if self.port == 0 {
            return invalid(format!("invalid port {}", self.port));
        }
        if !self.uses_credential() && self.user.is_empty() {
            return invalid("must have either credential_id or user".into());
        }
        for (i, tag) in self.tags.iter().enumerate() {
            if self.tags[..i].contains(tag) {
                return invalid(format!("duplicate tag '{}'", tag));
            }
        }
        Ok(())
    }
}

impl Host {
    /// Create a host on the default port with no authentication yet
    pub fn new(id: impl Into<String>, name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            address: address.into(),
            port: DEFAULT_PORT,
            credential_id: None,
            user: String::new(),
            key_path: String::new(),
            password: String::new(),
            tags: Vec::new(),
            vars: BTreeMap::new(),
            status: HostStatus::Unknown,
            last_seen: None,
        }
    }

    /// Create a host that authenticates through a shared credential
    pub fn with_credential(
        id: impl Into<String>,
        name: impl Into<String>,
        address: impl Into<String>,
        credential_id: impl Into<String>,
    ) -> Self {
        let mut host = Self::new(id, name, address);
        host.credential_id = Some(credential_id.into());
        host
    }

    /// True when a non-empty credential reference is set
    pub fn uses_credential(&self) -> bool {
        self.credential_id.as_deref().is_some_and(|c| !c.is_empty())
    }

    /// The referenced credential id, if any
    pub fn credential_ref(&self) -> Option<&str> {
        self.credential_id.as_deref().filter(|c| !c.is_empty())
    }

    /// Address in `address:port` form
    pub fn ssh_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Add a tag unless already present
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.has_tag(&tag) {
            self.tags.push(tag);
        }
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.retain(|t| t != tag);
    }

    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn set_var(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::{decode_as, encode};
    use crate::core::error::ErrorKind;
    use std::path::Path;

    fn inline_host() -> Host {
        let mut host = Host::new("web1", "Web 1", "10.0.0.1");
        host.user = "deploy".to_string();
        host
    }

    #[test]
    fn test_host_roundtrip() {
        let mut host = Host::with_credential("web1", "Web 1", "10.0.0.1", "cred1");
        host.description = "frontend".to_string();
        host.port = 2222;
        host.add_tag("prod");
        host.add_tag("web");
        host.set_var("region", "eu-west");

        let yaml = encode(&host).unwrap();
        let (_, parsed) = decode_as::<Host>(&yaml, Path::new("h.yaml")).unwrap();
        assert_eq!(host, parsed);
        assert_eq!(parsed.tags, vec!["prod", "web"]);
    }

    #[test]
    fn test_runtime_state_not_persisted() {
        let mut host = inline_host();
        host.status = HostStatus::Online;
        host.last_seen = Some(Utc::now());

        let yaml = encode(&host).unwrap();
        assert!(!yaml.contains("status"));
        assert!(!yaml.contains("last_seen"));

        let (_, parsed) = decode_as::<Host>(&yaml, Path::new("h.yaml")).unwrap();
        assert_eq!(parsed.status, HostStatus::Unknown);
        assert!(parsed.last_seen.is_none());
    }

    #[test]
    fn test_port_defaults_when_missing() {
        let src = "type: host\nid: h\nname: h\naddress: a\nuser: u\n";
        let (_, host) = decode_as::<Host>(src, Path::new("h.yaml")).unwrap();
        assert_eq!(host.port, 22);
    }

    #[test]
    fn test_host_validation() {
        assert!(inline_host().validate().is_ok());

        let mut no_auth = inline_host();
        no_auth.user.clear();
        let err = no_auth.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("credential_id or user"));

        let mut bad_port = inline_host();
        bad_port.port = 0;
        assert!(bad_port.validate().is_err());

        let mut no_address = inline_host();
        no_address.address.clear();
        assert!(no_address.validate().is_err());

        let mut empty_ref = inline_host();
        empty_ref.user.clear();
        empty_ref.credential_id = Some(String::new());
        assert!(empty_ref.validate().is_err());
    }

    #[test]
    fn test_duplicate_tags_rejected() {
        let mut host = inline_host();
        host.tags = vec!["a".into(), "b".into(), "a".into()];
        assert!(host.validate().is_err());
    }

    #[test]
    fn test_tags_are_unique_and_ordered() {
        let mut host = inline_host();
        host.add_tag("b");
        host.add_tag("a");
        host.add_tag("b");
        assert_eq!(host.tags, vec!["b", "a"]);

        host.remove_tag("b");
        assert_eq!(host.tags, vec!["a"]);
        assert!(!host.has_tag("b"));
    }

    #[test]
    fn test_ssh_address() {
        let mut host = inline_host();
        host.port = 2200;
        assert_eq!(host.ssh_address(), "10.0.0.1:2200");
    }

    #[test]
    fn test_vars() {
        let mut host = inline_host();
        host.set_var("env", "prod");
        host.set_var("env", "staging");
        assert_eq!(host.var("env"), Some("staging"));
        assert_eq!(host.var("missing"), None);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("online".parse::<HostStatus>().unwrap(), HostStatus::Online);
        assert_eq!(HostStatus::Connecting.to_string(), "Connecting");
        assert!("up".parse::<HostStatus>().is_err());
    }
}
