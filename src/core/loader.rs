//! Entity loading utilities
//!
//! Turns raw file contents into validated entities. A file may hold several
//! documents separated by `---` lines; each one is decoded by its `type` tag
//! and validated before it is returned.

use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::core::config::CONFIG_FILE;
use crate::core::entity::{decode_document, Document};
use crate::core::error::{Error, Result};
use crate::core::identity::DocumentType;
use crate::core::repository::is_yaml_file;
use crate::entities::{Credential, Group, Host};

/// An inventory entity of any kind
#[derive(Debug, Clone)]
pub enum AnyEntity {
    Credential(Credential),
    Host(Host),
    Group(Group),
}

/// Decode and validate a single document
///
/// Configuration documents are not inventory entities and are rejected.
pub fn load_entity(source: &str, path: &Path) -> Result<AnyEntity> {
    let document = decode_document(source, path)?;
    document.validate()?;

    match document {
        Document::Credential(c) => Ok(AnyEntity::Credential(c)),
        Document::Host(h) => Ok(AnyEntity::Host(h)),
        Document::Group(g) => Ok(AnyEntity::Group(g)),
        Document::Config(_) => Err(Error::UnknownType {
            path: path.to_path_buf(),
            found: Some(DocumentType::Config.to_string()),
        }),
    }
}

/// Split file contents into documents
///
/// Any line starting with `---` separates documents, including one on the
/// very first line. Blank segments are dropped.
pub fn split_documents(content: &str) -> Vec<String> {
    let mut documents = Vec::new();
    let mut current = String::new();

    for line in content.lines() {
        if line.starts_with("---") {
            documents.push(std::mem::take(&mut current));
            continue;
        }
        current.push_str(line);
        current.push('\n');
    }
    documents.push(current);

    documents
        .into_iter()
        .filter(|doc| !doc.trim().is_empty())
        .collect()
}

/// Load every document in a file
///
/// A single bad document fails the whole file.
pub fn load_entities_from_file(path: &Path) -> Result<Vec<AnyEntity>> {
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;

    let documents = split_documents(&content);
    let multiple = documents.len() > 1;

    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            load_entity(doc, path).map_err(|e| {
                if multiple {
                    Error::InDocument {
                        index: i + 1,
                        path: path.to_path_buf(),
                        source: Box::new(e),
                    }
                } else {
                    e
                }
            })
        })
        .collect()
}

/// Recursively load all entities below a directory
///
/// Skips directories, non-YAML files and the configuration file. A file that
/// fails to load is logged and skipped; the scan continues. A missing
/// directory yields no entities.
pub fn load_all_entities_from_dir(dir: &Path) -> Result<Vec<AnyEntity>> {
    Ok(load_files_from_dir(dir)?
        .into_iter()
        .flat_map(|(_, entities)| entities)
        .collect())
}

/// Like [`load_all_entities_from_dir`], grouped by the file each entity came from
pub fn load_files_from_dir(dir: &Path) -> Result<Vec<(PathBuf, Vec<AnyEntity>)>> {
    let mut files = Vec::new();

    if !dir.exists() {
        return Ok(files);
    }

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !is_yaml_file(path) || entry.file_name() == CONFIG_FILE {
            continue;
        }

        match load_entities_from_file(path) {
            Ok(loaded) => files.push((path.to_path_buf(), loaded)),
            Err(e) => tracing::warn!("Failed to load {}: {}", path.display(), e),
        }
    }

    Ok(files)
}

/// An entity together with the file it was read from
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub entity: T,
    pub path: PathBuf,
    /// The file holds other documents as well
    pub shared: bool,
}

/// All entities below `dir`, split by kind in walk order
#[derive(Debug, Default)]
pub struct LoadedEntities {
    pub credentials: Vec<Loaded<Credential>>,
    pub hosts: Vec<Loaded<Host>>,
    pub groups: Vec<Loaded<Group>>,
}

/// Load a directory and partition the result by entity kind
pub fn load_partitioned(dir: &Path) -> Result<LoadedEntities> {
    let mut loaded = LoadedEntities::default();
    for (path, entities) in load_files_from_dir(dir)? {
        let shared = entities.len() > 1;
        for entity in entities {
            let path = path.clone();
            match entity {
                AnyEntity::Credential(entity) => {
                    loaded.credentials.push(Loaded { entity, path, shared })
                }
                AnyEntity::Host(entity) => loaded.hosts.push(Loaded { entity, path, shared }),
                AnyEntity::Group(entity) => loaded.groups.push(Loaded { entity, path, shared }),
            }
        }
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use std::fs;
    use tempfile::tempdir;

    const CRED: &str = "type: credential\nid: cred1\nname: admin\nuser: admin\npassword: x\n";
    const HOST: &str = "type: host\nid: host1\nname: web\naddress: 10.0.0.1\ncredential_id: cred1\n";

    #[test]
    fn test_split_documents() {
        let docs = split_documents("a: 1\n---\nb: 2\n---\n\n");
        assert_eq!(docs, vec!["a: 1\n", "b: 2\n"]);
    }

    #[test]
    fn test_split_handles_leading_separator() {
        let docs = split_documents("---\na: 1\n--- \nb: 2\n");
        assert_eq!(docs, vec!["a: 1\n", "b: 2\n"]);
    }

    #[test]
    fn test_split_single_document() {
        assert_eq!(split_documents(CRED), vec![CRED]);
        assert!(split_documents("   \n\n").is_empty());
    }

    #[test]
    fn test_load_entity_validates() {
        let bad = "type: credential\nid: cred1\nname: admin\nuser: admin\n";
        let err = load_entity(bad, Path::new("c.yaml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert!(matches!(
            load_entity(CRED, Path::new("c.yaml")).unwrap(),
            AnyEntity::Credential(_)
        ));
    }

    #[test]
    fn test_load_entity_rejects_config() {
        let err = load_entity("type: config\ntheme: dark\n", Path::new("x.yaml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownType);
    }

    #[test]
    fn test_load_entities_from_multi_document_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("all.yaml");
        fs::write(&path, format!("{}---\n{}", CRED, HOST)).unwrap();

        let entities = load_entities_from_file(&path).unwrap();
        assert_eq!(entities.len(), 2);
        assert!(matches!(entities[0], AnyEntity::Credential(_)));
        assert!(matches!(entities[1], AnyEntity::Host(_)));
    }

    #[test]
    fn test_one_bad_document_fails_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("mixed.yaml");
        fs::write(&path, format!("{}---\nid: untagged\n", CRED)).unwrap();
        let err = load_entities_from_file(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownType);
        assert!(err.to_string().starts_with("document 2 in"));
    }

    #[test]
    fn test_load_dir_skips_bad_files_and_config() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("credential-cred1.yaml"), CRED).unwrap();
        fs::write(tmp.path().join("broken.yaml"), "type: host\nport: [\n").unwrap();
        fs::write(tmp.path().join("config.yaml"), "type: config\n").unwrap();
        fs::write(tmp.path().join("readme.md"), "# hi").unwrap();
        fs::create_dir(tmp.path().join("site-a")).unwrap();
        fs::write(tmp.path().join("site-a/host-host1.yml"), HOST).unwrap();

        let entities = load_all_entities_from_dir(tmp.path()).unwrap();
        assert_eq!(entities.len(), 2);

        let loaded = load_partitioned(tmp.path()).unwrap();
        assert_eq!(loaded.credentials.len(), 1);
        assert_eq!(loaded.hosts.len(), 1);
        assert!(loaded.groups.is_empty());
        assert_eq!(loaded.hosts[0].path, tmp.path().join("site-a/host-host1.yml"));
        assert!(!loaded.hosts[0].shared);
    }

    #[test]
    fn test_load_partitioned_marks_shared_files() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("all.yaml"), format!("{}---\n{}", CRED, HOST)).unwrap();

        let files = load_files_from_dir(tmp.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].1.len(), 2);

        let loaded = load_partitioned(tmp.path()).unwrap();
        assert!(loaded.credentials[0].shared);
        assert!(loaded.hosts[0].shared);
        assert_eq!(loaded.hosts[0].path, tmp.path().join("all.yaml"));
        assert_eq!(loaded.hosts[0].entity.id, "host1");
    }

    #[test]
    fn test_load_dir_missing_is_empty() {
        let entities = load_all_entities_from_dir(Path::new("/nonexistent/path")).unwrap();
        assert!(entities.is_empty());
    }
}
