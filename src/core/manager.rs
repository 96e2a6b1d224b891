//! Inventory manager
//!
//! Owns the credential, host and group collections and keeps them
//! referentially consistent with each other and with the files on disk.
//!
//! All three collections live in one [`Inventory`] behind one lock, so every
//! read sees the collections consistent with each other. Mutations persist
//! through the [`Repository`] while the manager lock is held and only touch
//! the in-memory maps once the write succeeded. Lock order is always
//! manager first, repository second.
//!
//! Entities created here get their own `<type>-<key>.yaml` file. Entities
//! loaded from a multi-document file, or from a file under another name, are
//! written back into that same file.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::config::Config;
use crate::core::entity::Entity;
use crate::core::error::{Error, Result};
use crate::core::identity::{entity_file_name, DocumentType};
use crate::core::loader::{load_partitioned, Loaded};
use crate::core::repository::Repository;
use crate::entities::{Credential, Group, Host, HostStatus};

/// Counts of each collection at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct InventoryStats {
    pub credentials: usize,
    pub hosts: usize,
    pub groups: usize,
}

/// Files, relative to the base directory, of entities not stored in their own file
type Origins = HashMap<(DocumentType, String), PathBuf>;

/// The three collections, always observed and mutated together
#[derive(Debug, Default, Clone)]
struct Inventory {
    credentials: BTreeMap<String, Credential>,
    hosts: BTreeMap<String, Host>,
    groups: BTreeMap<String, Group>,
    origins: Origins,
}

impl Inventory {
    /// First dangling reference, if any
    fn validate_relationships(&self) -> Result<()> {
        for host in self.hosts.values() {
            self.check_host_refs(host)?;
        }
        for group in self.groups.values() {
            self.check_group_refs(group)?;
        }
        Ok(())
    }

    fn check_host_refs(&self, host: &Host) -> Result<()> {
        if let Some(cred) = host.credential_ref() {
            if !self.credentials.contains_key(cred) {
                return Err(Error::DanglingReference {
                    kind: DocumentType::Host,
                    key: host.id.clone(),
                    target_kind: DocumentType::Credential,
                    target: cred.to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_group_refs(&self, group: &Group) -> Result<()> {
        if let Some(missing) = group
            .host_ids
            .iter()
            .find(|id| !self.hosts.contains_key(id.as_str()))
        {
            return Err(Error::DanglingReference {
                kind: DocumentType::Group,
                key: group.name.clone(),
                target_kind: DocumentType::Host,
                target: missing.clone(),
            });
        }
        if let Some(missing) = group
            .child_group_names
            .iter()
            .find(|name| !self.groups.contains_key(name.as_str()) && **name != group.name)
        {
            return Err(Error::DanglingReference {
                kind: DocumentType::Group,
                key: group.name.clone(),
                target_kind: DocumentType::Group,
                target: missing.clone(),
            });
        }
        Ok(())
    }

    fn stats(&self) -> InventoryStats {
        InventoryStats {
            credentials: self.credentials.len(),
            hosts: self.hosts.len(),
            groups: self.groups.len(),
        }
    }
}

/// Coordinates CRUD and queries over credentials, hosts and groups
#[derive(Debug)]
pub struct Manager {
    repo: Arc<Repository>,
    inventory: RwLock<Inventory>,
}

impl Manager {
    /// Create an empty manager persisting through `repo`
    pub fn new(repo: Arc<Repository>) -> Self {
        Self {
            repo,
            inventory: RwLock::new(Inventory::default()),
        }
    }

    /// Open the repository at `data_dir`, or at the configured data
    /// directory when none is given
    pub fn open(data_dir: Option<&Path>, config: &Config) -> Result<Self> {
        let dir = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => config.data_dir(),
        };
        Ok(Self::new(Arc::new(Repository::open(dir)?)))
    }

    pub fn repository(&self) -> &Arc<Repository> {
        &self.repo
    }

    /// Load every entity from the data directory
    ///
    /// Credentials are registered first, then hosts, then groups. The loaded
    /// set replaces the current collections only if all references resolve;
    /// otherwise the current collections are left untouched.
    pub fn load_all(&self) -> Result<InventoryStats> {
        let mut inventory = self.inventory.write();

        let base = self.repo.base_dir();
        let loaded = load_partitioned(base)?;
        let mut staged = Inventory::default();

        for cred in loaded.credentials {
            insert_loaded(&mut staged.credentials, &mut staged.origins, base, cred);
        }
        for host in loaded.hosts {
            insert_loaded(&mut staged.hosts, &mut staged.origins, base, host);
        }
        for group in loaded.groups {
            insert_loaded(&mut staged.groups, &mut staged.origins, base, group);
        }

        staged.validate_relationships()?;

        let stats = staged.stats();
        *inventory = staged;
        tracing::info!(
            "Loaded {} credential(s), {} host(s), {} group(s) from {}",
            stats.credentials,
            stats.hosts,
            stats.groups,
            self.repo.base_dir().display()
        );
        Ok(stats)
    }

    /// Check that every cross-entity reference resolves
    ///
    /// Returns the first violation found.
    pub fn validate_relationships(&self) -> Result<()> {
        self.inventory.read().validate_relationships()
    }

    // ===== Credentials =====

    pub fn add_credential(&self, cred: Credential) -> Result<()> {
        cred.validate()?;
        let mut inv = self.inventory.write();
        if inv.credentials.contains_key(&cred.id) {
            return Err(already_exists(&cred));
        }
        self.persist(&inv.origins, &cred)?;
        tracing::debug!("Added credential {}", cred.id);
        inv.credentials.insert(cred.id.clone(), cred);
        Ok(())
    }

    pub fn get_credential(&self, id: &str) -> Result<Credential> {
        self.inventory
            .read()
            .credentials
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(DocumentType::Credential, id))
    }

    pub fn update_credential(&self, cred: Credential) -> Result<()> {
        cred.validate()?;
        let mut inv = self.inventory.write();
        if !inv.credentials.contains_key(&cred.id) {
            return Err(Error::not_found(DocumentType::Credential, &cred.id));
        }
        self.persist(&inv.origins, &cred)?;
        tracing::debug!("Updated credential {}", cred.id);
        inv.credentials.insert(cred.id.clone(), cred);
        Ok(())
    }

    /// Remove a credential no host references
    pub fn remove_credential(&self, id: &str) -> Result<()> {
        let mut inv = self.inventory.write();

        if let Some(user) = inv.hosts.values().find(|h| h.credential_ref() == Some(id)) {
            return Err(Error::InUse {
                kind: DocumentType::Credential,
                key: id.to_string(),
                user_kind: DocumentType::Host,
                user: user.id.clone(),
            });
        }

        if !inv.credentials.contains_key(id) {
            return Err(Error::not_found(DocumentType::Credential, id));
        }
        self.erase(&mut inv.origins, DocumentType::Credential, id)?;
        inv.credentials.remove(id);
        tracing::debug!("Removed credential {}", id);
        Ok(())
    }

    pub fn list_credentials(&self) -> Vec<Credential> {
        self.inventory.read().credentials.values().cloned().collect()
    }

    // ===== Hosts =====

    pub fn add_host(&self, host: Host) -> Result<()> {
        host.validate()?;
        let mut inv = self.inventory.write();
        if inv.hosts.contains_key(&host.id) {
            return Err(already_exists(&host));
        }
        inv.check_host_refs(&host)?;
        self.persist(&inv.origins, &host)?;
        tracing::debug!("Added host {}", host.id);
        inv.hosts.insert(host.id.clone(), host);
        Ok(())
    }

    pub fn get_host(&self, id: &str) -> Result<Host> {
        self.inventory
            .read()
            .hosts
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(DocumentType::Host, id))
    }

    /// Replace a host; its runtime status is kept
    pub fn update_host(&self, mut host: Host) -> Result<()> {
        host.validate()?;
        let mut inv = self.inventory.write();
        let current = inv
            .hosts
            .get(&host.id)
            .ok_or_else(|| Error::not_found(DocumentType::Host, &host.id))?;
        host.status = current.status;
        host.last_seen = current.last_seen;

        inv.check_host_refs(&host)?;
        self.persist(&inv.origins, &host)?;
        tracing::debug!("Updated host {}", host.id);
        inv.hosts.insert(host.id.clone(), host);
        Ok(())
    }

    /// Remove a host, dropping it from every group first
    ///
    /// Changed groups are re-saved one by one. A group that fails to save is
    /// logged and still updated in memory; it does not stop the removal.
    pub fn remove_host(&self, id: &str) -> Result<()> {
        let mut guard = self.inventory.write();
        let inv = &mut *guard;

        if !inv.hosts.contains_key(id) {
            return Err(Error::not_found(DocumentType::Host, id));
        }

        for group in inv.groups.values_mut() {
            if group.remove_host(id) {
                if let Err(e) = self.persist(&inv.origins, &*group) {
                    tracing::warn!(
                        "Failed to save group {} after removing host {}: {}",
                        group.name,
                        id,
                        e
                    );
                }
            }
        }

        self.erase(&mut inv.origins, DocumentType::Host, id)?;
        inv.hosts.remove(id);
        tracing::debug!("Removed host {}", id);
        Ok(())
    }

    pub fn list_hosts(&self) -> Vec<Host> {
        self.inventory.read().hosts.values().cloned().collect()
    }

    /// Record the runtime reachability of a host (never persisted)
    pub fn set_host_status(&self, id: &str, status: HostStatus) -> Result<()> {
        let mut inv = self.inventory.write();
        let host = inv
            .hosts
            .get_mut(id)
            .ok_or_else(|| Error::not_found(DocumentType::Host, id))?;
        host.status = status;
        if status == HostStatus::Online {
            host.last_seen = Some(Utc::now());
        }
        Ok(())
    }

    // ===== Groups =====

    pub fn add_group(&self, group: Group) -> Result<()> {
        group.validate()?;
        let mut inv = self.inventory.write();
        if inv.groups.contains_key(&group.name) {
            return Err(already_exists(&group));
        }
        inv.check_group_refs(&group)?;
        self.persist(&inv.origins, &group)?;
        tracing::debug!("Added group {}", group.name);
        inv.groups.insert(group.name.clone(), group);
        Ok(())
    }

    pub fn get_group(&self, name: &str) -> Result<Group> {
        self.inventory
            .read()
            .groups
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found(DocumentType::Group, name))
    }

    pub fn update_group(&self, group: Group) -> Result<()> {
        group.validate()?;
        let mut inv = self.inventory.write();
        if !inv.groups.contains_key(&group.name) {
            return Err(Error::not_found(DocumentType::Group, &group.name));
        }
        inv.check_group_refs(&group)?;
        self.persist(&inv.origins, &group)?;
        tracing::debug!("Updated group {}", group.name);
        inv.groups.insert(group.name.clone(), group);
        Ok(())
    }

    /// Remove a group that no other group lists as a child
    pub fn remove_group(&self, name: &str) -> Result<()> {
        let mut inv = self.inventory.write();

        if let Some(parent) = inv
            .groups
            .values()
            .find(|g| g.name != name && g.has_child_group(name))
        {
            return Err(Error::InUse {
                kind: DocumentType::Group,
                key: name.to_string(),
                user_kind: DocumentType::Group,
                user: parent.name.clone(),
            });
        }

        if !inv.groups.contains_key(name) {
            return Err(Error::not_found(DocumentType::Group, name));
        }
        self.erase(&mut inv.origins, DocumentType::Group, name)?;
        inv.groups.remove(name);
        tracing::debug!("Removed group {}", name);
        Ok(())
    }

    pub fn list_groups(&self) -> Vec<Group> {
        self.inventory.read().groups.values().cloned().collect()
    }

    // ===== Queries =====

    /// Direct member hosts of a group, in membership order
    pub fn get_hosts_by_group(&self, name: &str) -> Result<Vec<Host>> {
        let inv = self.inventory.read();
        let group = inv
            .groups
            .get(name)
            .ok_or_else(|| Error::not_found(DocumentType::Group, name))?;

        Ok(group
            .host_ids
            .iter()
            .filter_map(|id| inv.hosts.get(id).cloned())
            .collect())
    }

    /// Hosts of a group and all of its descendants, each host once
    ///
    /// Groups already visited are skipped, so a cyclic hierarchy terminates.
    /// Hosts are returned in depth-first discovery order.
    pub fn get_all_hosts_in_group(&self, name: &str) -> Result<Vec<Host>> {
        let inv = self.inventory.read();
        if !inv.groups.contains_key(name) {
            return Err(Error::not_found(DocumentType::Group, name));
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut seen_hosts: HashSet<&str> = HashSet::new();
        let mut hosts = Vec::new();
        let mut stack = vec![name];

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                tracing::debug!("Group {} already visited, skipping", current);
                continue;
            }
            let Some(group) = inv.groups.get(current) else {
                continue;
            };

            for id in &group.host_ids {
                if let Some(host) = inv.hosts.get(id) {
                    if seen_hosts.insert(id.as_str()) {
                        hosts.push(host.clone());
                    }
                }
            }
            // reversed so children are visited in listed order
            for child in group.child_group_names.iter().rev() {
                stack.push(child.as_str());
            }
        }

        Ok(hosts)
    }

    pub fn find_hosts_by_tag(&self, tag: &str) -> Vec<Host> {
        self.inventory
            .read()
            .hosts
            .values()
            .filter(|h| h.has_tag(tag))
            .cloned()
            .collect()
    }

    pub fn find_hosts_by_credential(&self, credential_id: &str) -> Vec<Host> {
        self.inventory
            .read()
            .hosts
            .values()
            .filter(|h| h.credential_ref() == Some(credential_id))
            .cloned()
            .collect()
    }

    /// Groups that list the host as a direct member
    pub fn find_groups_by_host(&self, host_id: &str) -> Vec<Group> {
        self.inventory
            .read()
            .groups
            .values()
            .filter(|g| g.has_host(host_id))
            .cloned()
            .collect()
    }

    /// The credential a host authenticates with
    ///
    /// A referenced credential is returned as stored. Otherwise a transient
    /// credential is built from the host's inline fields; it is never
    /// persisted and its id is `inline-<host id>`.
    pub fn get_host_credential(&self, host_id: &str) -> Result<Credential> {
        let inv = self.inventory.read();
        let host = inv
            .hosts
            .get(host_id)
            .ok_or_else(|| Error::not_found(DocumentType::Host, host_id))?;

        if let Some(cred_id) = host.credential_ref() {
            return inv
                .credentials
                .get(cred_id)
                .cloned()
                .ok_or_else(|| Error::not_found(DocumentType::Credential, cred_id));
        }

        if host.user.is_empty() {
            return Err(Error::invalid(
                DocumentType::Host,
                host_id,
                "no credential reference or inline user",
            ));
        }

        Ok(Credential {
            id: format!("inline-{}", host.id),
            name: format!("Inline auth for {}", host.name),
            description: String::new(),
            user: host.user.clone(),
            key_path: host.key_path.clone(),
            password: host.password.clone(),
            passphrase: String::new(),
        })
    }

    pub fn stats(&self) -> InventoryStats {
        self.inventory.read().stats()
    }

    /// Write an entity to its own file, or back into the file it was loaded from
    fn persist<T: Entity>(&self, origins: &Origins, entity: &T) -> Result<()> {
        match origins.get(&(T::TYPE, entity.key().to_string())) {
            Some(path) => self.repo.put_document(path, entity),
            None => self.repo.write(&entity.file_name(), entity),
        }
    }

    /// Remove an entity from disk, wherever it is stored
    fn erase(&self, origins: &mut Origins, doc_type: DocumentType, key: &str) -> Result<()> {
        let origin = (doc_type, key.to_string());
        match origins.get(&origin) {
            Some(path) => self.repo.remove_document(path, doc_type, key)?,
            None => self.repo.delete(&entity_file_name(doc_type, key))?,
        }
        origins.remove(&origin);
        Ok(())
    }
}

fn already_exists<T: Entity>(entity: &T) -> Error {
    Error::AlreadyExists {
        kind: T::TYPE,
        key: entity.key().to_string(),
    }
}

/// Insert a freshly loaded entity; a later duplicate key replaces the earlier one
///
/// The source file is remembered unless it is the entity's own
/// `<type>-<key>.yaml` holding nothing else.
fn insert_loaded<T: Entity>(
    map: &mut BTreeMap<String, T>,
    origins: &mut Origins,
    base_dir: &Path,
    loaded: Loaded<T>,
) {
    let Loaded {
        entity,
        path,
        shared,
    } = loaded;
    let key = entity.key().to_string();
    let relative = path.strip_prefix(base_dir).unwrap_or(&path).to_path_buf();

    if shared || relative != Path::new(&entity.file_name()) {
        tracing::debug!("{} {} is stored in {}", T::TYPE, key, relative.display());
        origins.insert((T::TYPE, key.clone()), relative);
    } else {
        origins.remove(&(T::TYPE, key.clone()));
    }

    if map.insert(key.clone(), entity).is_some() {
        tracing::warn!("Duplicate {} {} found while loading; keeping the last one", T::TYPE, key);
    }
}
