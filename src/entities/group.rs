//! Group entity type

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::entity::Entity;
use crate::core::error::{Error, Result};
use crate::core::identity::DocumentType;

/// A named collection of hosts and child groups
///
/// Groups are keyed by name. The child hierarchy is not required to be
/// acyclic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Member host ids, unique and in insertion order
    #[serde(default)]
    pub host_ids: Vec<String>,

    /// Child group names, unique and in insertion order
    #[serde(default, rename = "child_groups", skip_serializing_if = "Vec::is_empty")]
    pub child_group_names: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: BTreeMap<String, String>,
}

impl Entity for Group {
    const TYPE: DocumentType = DocumentType::Group;

    fn key(&self) -> &str {
        &self.name
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::invalid(Self::TYPE, "", "name cannot be empty"));
        }
        self.check_key()?;
        if let Some(dup) = first_duplicate(&self.host_ids) {
            return Err(Error::invalid(
                Self::TYPE,
                &self.name,
                format!("host '{}' listed more than once", dup),
            ));
        }
        if let Some(dup) = first_duplicate(&self.child_group_names) {
            return Err(Error::invalid(
                Self::TYPE,
                &self.name,
                format!("child group '{}' listed more than once", dup),
            ));
        }
        Ok(())
    }
}

fn first_duplicate(items: &[String]) -> Option<&str> {
    items
        .iter()
        .enumerate()
        .find(|(i, item)| items[..*i].contains(item))
        .map(|(_, item)| item.as_str())
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn has_host(&self, host_id: &str) -> bool {
        self.host_ids.iter().any(|h| h == host_id)
    }

    /// Add a host id unless already a member
    pub fn add_host(&mut self, host_id: impl Into<String>) {
        let host_id = host_id.into();
        if !self.has_host(&host_id) {
            self.host_ids.push(host_id);
        }
    }

    /// Remove a host id; returns whether it was a member
    pub fn remove_host(&mut self, host_id: &str) -> bool {
        let before = self.host_ids.len();
        self.host_ids.retain(|h| h != host_id);
        self.host_ids.len() != before
    }

    pub fn has_child_group(&self, name: &str) -> bool {
        self.child_group_names.iter().any(|g| g == name)
    }

    /// Add a child group unless already present
    pub fn add_child_group(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.has_child_group(&name) {
            self.child_group_names.push(name);
        }
    }

    pub fn remove_child_group(&mut self, name: &str) -> bool {
        let before = self.child_group_names.len();
        self.child_group_names.retain(|g| g != name);
        self.child_group_names.len() != before
    }

    /// Number of direct member hosts (child groups not included)
    pub fn host_count(&self) -> usize {
        self.host_ids.len()
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
    use std::path::Path;

    #[test]
    fn test_group_roundtrip() {
        let mut group = Group::new("web");
        group.description = "web tier".to_string();
        group.add_host("web1");
        group.add_host("web2");
        group.add_child_group("web-canary");
        group.set_var("lb", "haproxy");

        let yaml = encode(&group).unwrap();
        assert!(yaml.contains("child_groups:"));
        let (_, parsed) = decode_as::<Group>(&yaml, Path::new("g.yaml")).unwrap();
        assert_eq!(group, parsed);
    }

    #[test]
    fn test_membership_is_deduplicated() {
        let mut group = Group::new("g");
        group.add_host("h1");
        group.add_host("h2");
        group.add_host("h1");
        assert_eq!(group.host_ids, vec!["h1", "h2"]);
        assert_eq!(group.host_count(), 2);

        assert!(group.remove_host("h1"));
        assert!(!group.remove_host("h1"));
        assert_eq!(group.host_ids, vec!["h2"]);
    }

    #[test]
    fn test_child_groups() {
        let mut group = Group::new("parent");
        group.add_child_group("a");
        group.add_child_group("a");
        assert!(group.has_child_group("a"));
        assert_eq!(group.child_group_names.len(), 1);
        assert!(group.remove_child_group("a"));
        assert!(!group.has_child_group("a"));
    }

    #[test]
    fn test_group_validation() {
        assert!(Group::new("").validate().is_err());
        assert!(Group::new("ok").validate().is_ok());

        let mut dup = Group::new("dup");
        dup.host_ids = vec!["h1".into(), "h1".into()];
        assert!(dup.validate().is_err());
    }

    #[test]
    fn test_empty_host_list_still_written() {
        let yaml = encode(&Group::new("empty")).unwrap();
        assert!(yaml.contains("host_ids: []"));
        assert!(!yaml.contains("child_groups"));
    }
}
