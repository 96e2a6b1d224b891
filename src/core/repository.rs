//! File-backed document repository
//!
//! Documents normally live in their own file directly under the base
//! directory. Files holding several `---` separated documents can be edited
//! one document at a time. A single reader/writer lock guards filesystem
//! access: writes and deletes are exclusive, reads run concurrently.

use parking_lot::RwLock;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use crate::core::entity::{decode_as, decode_document, encode, peek_type, Document, Entity};
use crate::core::error::{Error, Result};
use crate::core::identity::DocumentType;
use crate::core::loader::split_documents;

/// Reads and writes type-tagged YAML documents under one base directory
#[derive(Debug)]
pub struct Repository {
    base_dir: PathBuf,
    lock: RwLock<()>,
}

impl Repository {
    /// Open a repository, creating the base directory if needed
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        if base_dir.as_os_str().is_empty() {
            return Err(Error::io(
                &base_dir,
                std::io::Error::new(IoErrorKind::InvalidInput, "base directory cannot be empty"),
            ));
        }
        fs::create_dir_all(&base_dir).map_err(|e| Error::io(&base_dir, e))?;
        tracing::debug!("Opened repository at {}", base_dir.display());
        Ok(Self {
            base_dir,
            lock: RwLock::new(()),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path(&self, filename: impl AsRef<Path>) -> PathBuf {
        self.base_dir.join(filename)
    }

    /// Serialize an entity with its type tag and overwrite `filename`
    pub fn write<T: Entity>(&self, filename: &str, entity: &T) -> Result<()> {
        let yaml = encode(entity)?;
        self.write_raw(filename, &yaml)
    }

    /// Write an already decoded document of any shape
    pub fn write_document(&self, filename: &str, document: &Document) -> Result<()> {
        let yaml = document.encode()?;
        self.write_raw(filename, &yaml)
    }

    fn write_raw(&self, filename: &str, contents: &str) -> Result<()> {
        let _guard = self.lock.write();
        let path = self.path(filename);
        fs::write(&path, contents).map_err(|e| Error::io(&path, e))?;
        tracing::debug!("Wrote {}", path.display());
        Ok(())
    }

    fn read_raw(&self, filename: &str) -> Result<(PathBuf, String)> {
        let path = self.path(filename);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok((path, contents)),
            Err(e) if e.kind() == IoErrorKind::NotFound => Err(Error::FileNotFound { path }),
            Err(e) => Err(Error::io(&path, e)),
        }
    }

    /// Read a file, resolving its shape from the `type` tag
    pub fn read(&self, filename: &str) -> Result<Document> {
        let _guard = self.lock.read();
        let (path, contents) = self.read_raw(filename)?;
        decode_document(&contents, &path)
    }

    /// Read a file into a caller-chosen shape, returning the discovered tag
    ///
    /// Fails with `TagMismatch` if the file holds a different document type.
    pub fn read_as<T: Entity>(&self, filename: &str) -> Result<(DocumentType, T)> {
        let _guard = self.lock.read();
        let (path, contents) = self.read_raw(filename)?;
        decode_as(&contents, &path)
    }

    /// Read only the type tag of a file
    pub fn read_type(&self, filename: &str) -> Result<DocumentType> {
        let _guard = self.lock.read();
        let (path, contents) = self.read_raw(filename)?;
        peek_type(&contents, &path)
    }

    /// Remove a file; removing a missing file is not an error
    pub fn delete(&self, filename: &str) -> Result<()> {
        let _guard = self.lock.write();
        let path = self.path(filename);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!("Deleted {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(&path, e)),
        }
    }

    /// Store an entity inside a possibly multi-document file
    ///
    /// The document with the same type and key is replaced in place and the
    /// other documents are kept as written. The entity is appended when no
    /// document matches; a missing file is created.
    pub fn put_document<T: Entity>(&self, filename: impl AsRef<Path>, entity: &T) -> Result<()> {
        let mut yaml = Some(encode(entity)?);
        let _guard = self.lock.write();
        let path = self.path(filename);

        let mut documents = Vec::new();
        for doc in read_documents(&path)? {
            if holds(&doc, &path, T::TYPE, entity.key()) {
                // a second copy of the same key is dropped
                documents.extend(yaml.take());
            } else {
                documents.push(doc);
            }
        }
        documents.extend(yaml);

        write_documents(&path, &documents)
    }

    /// Drop one document from a possibly multi-document file
    ///
    /// The file is deleted once no document is left. A missing file or a
    /// file without a matching document is left alone.
    pub fn remove_document(
        &self,
        filename: impl AsRef<Path>,
        doc_type: DocumentType,
        key: &str,
    ) -> Result<()> {
        let _guard = self.lock.write();
        let path = self.path(filename);

        let documents = read_documents(&path)?;
        let total = documents.len();
        let kept: Vec<String> = documents
            .into_iter()
            .filter(|doc| !holds(doc, &path, doc_type, key))
            .collect();

        if kept.len() == total {
            return Ok(());
        }
        if kept.is_empty() {
            fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
            tracing::debug!("Deleted {}", path.display());
            return Ok(());
        }
        write_documents(&path, &kept)
    }

    pub fn exists(&self, filename: &str) -> bool {
        let _guard = self.lock.read();
        self.path(filename).is_file()
    }

    /// All YAML files directly under the base directory, sorted by name
    pub fn list(&self) -> Result<Vec<String>> {
        let _guard = self.lock.read();

        let entries = match fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(&self.base_dir, e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&self.base_dir, e))?;
            let path = entry.path();
            if path.is_file() && is_yaml_file(&path) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    files.push(name.to_string());
                }
            }
        }
        files.sort();
        Ok(files)
    }

    /// Files whose `type` tag equals `doc_type`
    ///
    /// Each candidate is re-read on every call. Files that cannot be read or
    /// whose tag cannot be parsed are skipped. The listing and the per-file
    /// reads take the lock separately, so the result is not an atomic
    /// snapshot under concurrent writes.
    pub fn list_by_type(&self, doc_type: DocumentType) -> Result<Vec<String>> {
        let files = self.list()?;
        Ok(files
            .into_iter()
            .filter(|name| matches!(self.read_type(name), Ok(t) if t == doc_type))
            .collect())
    }
}

fn read_documents(path: &Path) -> Result<Vec<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(split_documents(&contents)),
        Err(e) if e.kind() == IoErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(Error::io(path, e)),
    }
}

fn write_documents(path: &Path, documents: &[String]) -> Result<()> {
    let mut contents = String::new();
    for (i, doc) in documents.iter().enumerate() {
        if i > 0 {
            contents.push_str("---\n");
        }
        contents.push_str(doc);
        if !doc.ends_with('\n') {
            contents.push('\n');
        }
    }
    fs::write(path, contents).map_err(|e| Error::io(path, e))?;
    tracing::debug!("Wrote {} document(s) to {}", documents.len(), path.display());
    Ok(())
}

/// Whether a document decodes to the entity `doc_type`/`key`
fn holds(doc: &str, path: &Path, doc_type: DocumentType, key: &str) -> bool {
    matches!(decode_document(doc, path), Ok(d) if d.doc_type() == doc_type && d.key() == key)
}

/// Whether a path has a `.yaml` or `.yml` extension
pub fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == "yaml" || e == "yml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::error::ErrorKind;
    use crate::core::loader::split_documents;
    use crate::entities::{Credential, Group, Host};
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};

    fn setup() -> (Repository, TempDir) {
        let tmp = tempdir().unwrap();
        let repo = Repository::open(tmp.path()).unwrap();
        (repo, tmp)
    }

    fn sample_host() -> Host {
        let mut host = Host::with_credential("host1", "server1", "192.168.1.10", "cred1");
        host.add_tag("prod");
        host.set_var("rack", "r1");
        host
    }

    #[test]
    fn test_open_creates_directory() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("nested/data");
        let repo = Repository::open(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(repo.base_dir(), dir);
    }

    #[test]
    fn test_open_rejects_empty_path() {
        assert!(Repository::open("").is_err());
    }

    #[test]
    fn test_write_produces_tagged_yaml() {
        let (repo, tmp) = setup();
        repo.write("host1.yaml", &sample_host()).unwrap();

        let contents = fs::read_to_string(tmp.path().join("host1.yaml")).unwrap();
        assert!(contents.contains("type: host"));
        assert!(contents.contains("name: server1"));
        assert!(contents.contains("id: host1"));
    }

    #[test]
    fn test_roundtrip_every_kind() {
        let (repo, tmp) = setup();

        let host = sample_host();
        let mut group = Group::new("webservers");
        group.add_host("host1");
        group.add_child_group("canary");
        let cred = Credential::new("cred1", "admin-key", "admin").with_key("/keys/admin");
        let config = Config::load_from(tmp.path()).unwrap();

        repo.write("h.yaml", &host).unwrap();
        repo.write("g.yaml", &group).unwrap();
        repo.write("c.yaml", &cred).unwrap();
        repo.write("config.yaml", &config).unwrap();

        match repo.read("h.yaml").unwrap() {
            Document::Host(h) => assert_eq!(h, host),
            other => panic!("expected host, got {}", other.doc_type()),
        }
        match repo.read("g.yaml").unwrap() {
            Document::Group(g) => assert_eq!(g, group),
            other => panic!("expected group, got {}", other.doc_type()),
        }
        match repo.read("c.yaml").unwrap() {
            Document::Credential(c) => assert_eq!(c, cred),
            other => panic!("expected credential, got {}", other.doc_type()),
        }
        match repo.read("config.yaml").unwrap() {
            Document::Config(c) => {
                assert_eq!(c.theme, config.theme);
                assert_eq!(c.ssh_timeout, config.ssh_timeout);
            }
            other => panic!("expected config, got {}", other.doc_type()),
        }
    }

    #[test]
    fn test_write_document_copies_any_shape() {
        let (repo, _tmp) = setup();
        repo.write("host-host1.yaml", &sample_host()).unwrap();

        let document = repo.read("host-host1.yaml").unwrap();
        repo.write_document("copy.yaml", &document).unwrap();

        assert_eq!(repo.read_type("copy.yaml").unwrap(), DocumentType::Host);
        let (_, copy) = repo.read_as::<Host>("copy.yaml").unwrap();
        assert_eq!(copy, sample_host());
    }

    #[test]
    fn test_read_missing_type_is_unknown_type() {
        let (repo, tmp) = setup();
        fs::write(tmp.path().join("bare.yaml"), "id: x\nname: y\n").unwrap();
        let err = repo.read("bare.yaml").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownType);
    }

    #[test]
    fn test_read_unrecognized_type() {
        let (repo, tmp) = setup();
        fs::write(tmp.path().join("odd.yaml"), "type: router\nid: x\n").unwrap();
        let err = repo.read("odd.yaml").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownType);
    }

    #[test]
    fn test_read_missing_file_is_not_found() {
        let (repo, _tmp) = setup();
        let err = repo.read("nope.yaml").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_read_malformed_yaml_is_parse_error() {
        let (repo, tmp) = setup();
        fs::write(tmp.path().join("bad.yaml"), "type: host\nport: [unclosed\n").unwrap();
        let err = repo.read("bad.yaml").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_read_as_checks_tag() {
        let (repo, _tmp) = setup();
        repo.write("h.yaml", &sample_host()).unwrap();

        let (tag, host) = repo.read_as::<Host>("h.yaml").unwrap();
        assert_eq!(tag, DocumentType::Host);
        assert_eq!(host.id, "host1");

        let err = repo.read_as::<Group>("h.yaml").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TagMismatch);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (repo, _tmp) = setup();
        repo.write("h.yaml", &sample_host()).unwrap();
        assert!(repo.exists("h.yaml"));

        repo.delete("h.yaml").unwrap();
        assert!(!repo.exists("h.yaml"));
        repo.delete("h.yaml").unwrap();
    }

    const TWO_HOSTS: &str = "# lab hosts\ntype: host\nid: a\nname: a\naddress: x\nuser: u\n---\ntype: host\nid: b\nname: b\naddress: y\nuser: u\n";

    #[test]
    fn test_put_document_replaces_in_place() {
        let (repo, tmp) = setup();
        fs::create_dir(tmp.path().join("lab")).unwrap();
        let file = tmp.path().join("lab/hosts.yaml");
        fs::write(&file, TWO_HOSTS).unwrap();

        let mut b = Host::new("b", "b", "NEW");
        b.user = "u".to_string();
        repo.put_document("lab/hosts.yaml", &b).unwrap();

        let contents = fs::read_to_string(&file).unwrap();
        let docs = split_documents(&contents);
        assert_eq!(docs.len(), 2);
        assert!(docs[0].starts_with("# lab hosts"));
        assert!(docs[0].contains("address: x"));
        assert!(docs[1].contains("address: NEW"));
        assert!(!tmp.path().join("host-b.yaml").exists());

        // no matching document: appended
        repo.put_document("lab/hosts.yaml", &Host::new("c", "c", "z"))
            .unwrap();
        let contents = fs::read_to_string(&file).unwrap();
        assert_eq!(split_documents(&contents).len(), 3);
    }

    #[test]
    fn test_remove_document_keeps_the_rest() {
        let (repo, tmp) = setup();
        let file = tmp.path().join("hosts.yaml");
        fs::write(&file, TWO_HOSTS).unwrap();

        repo.remove_document("hosts.yaml", DocumentType::Host, "a")
            .unwrap();
        let contents = fs::read_to_string(&file).unwrap();
        assert!(!contents.contains("id: a"));
        assert!(contents.contains("id: b"));

        // other type with the same key is not touched
        repo.remove_document("hosts.yaml", DocumentType::Group, "b")
            .unwrap();
        assert!(file.exists());

        repo.remove_document("hosts.yaml", DocumentType::Host, "b")
            .unwrap();
        assert!(!file.exists());
        repo.remove_document("hosts.yaml", DocumentType::Host, "b")
            .unwrap();
    }

    #[test]
    fn test_list_skips_directories_and_other_files() {
        let (repo, tmp) = setup();
        repo.write("a.yaml", &sample_host()).unwrap();
        fs::write(tmp.path().join("b.yml"), "type: group\nname: g\n").unwrap();
        fs::write(tmp.path().join("notes.txt"), "hello").unwrap();
        fs::create_dir(tmp.path().join("dir.yaml")).unwrap();

        assert_eq!(repo.list().unwrap(), vec!["a.yaml", "b.yml"]);
    }

    #[test]
    fn test_list_by_type_filters_and_skips_invalid() {
        let (repo, tmp) = setup();
        repo.write("h1.yaml", &sample_host()).unwrap();
        repo.write("h2.yaml", &Host::new("h2", "h2", "10.0.0.2")).unwrap();
        repo.write("g.yaml", &Group::new("g")).unwrap();
        fs::write(tmp.path().join("broken.yaml"), "type: host\nport: [unclosed\n").unwrap();
        fs::write(tmp.path().join("untagged.yaml"), "id: h3\n").unwrap();

        assert_eq!(
            repo.list_by_type(DocumentType::Host).unwrap(),
            vec!["h1.yaml", "h2.yaml"]
        );
        assert_eq!(repo.list_by_type(DocumentType::Group).unwrap(), vec!["g.yaml"]);
        assert!(repo.list_by_type(DocumentType::Credential).unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_readers_and_writers() {
        let (repo, _tmp) = setup();
        let repo = Arc::new(repo);
        repo.write("h.yaml", &sample_host()).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let repo = Arc::clone(&repo);
                std::thread::spawn(move || {
                    for _ in 0..20 {
                        if i % 2 == 0 {
                            repo.write("h.yaml", &sample_host()).unwrap();
                        } else {
                            // writes are exclusive, so a reader never sees a partial file
                            assert!(matches!(repo.read("h.yaml").unwrap(), Document::Host(_)));
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
