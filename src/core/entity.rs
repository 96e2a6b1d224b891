//! Entity trait and the tagged document union
//!
//! Every file in the data directory holds one or more documents whose
//! `type` field selects the concrete shape. Decoding always happens in two
//! steps: the tag is read first ([`peek_type`]), then the body is decoded
//! into the shape the tag names ([`decode_document`]).

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::Path;

use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::identity::{check_file_safe, entity_file_name, DocumentType};
use crate::entities::{Credential, Group, Host};

/// Common trait for all documents stored in the data directory
pub trait Entity: Serialize + DeserializeOwned + Clone {
    /// The document type tag written to the `type` field
    const TYPE: DocumentType;

    /// Unique key within the entity's collection (id, or name for groups)
    fn key(&self) -> &str;

    /// Human readable name
    fn name(&self) -> &str;

    /// Free-form description
    fn description(&self) -> &str;

    /// Check the entity's own invariants
    fn validate(&self) -> Result<()>;

    /// File name the entity is persisted under
    fn file_name(&self) -> String {
        entity_file_name(Self::TYPE, self.key())
    }

    /// Reject keys that cannot be used as part of a file name
    fn check_key(&self) -> Result<()> {
        check_file_safe(self.key()).map_err(|e| Error::unsafe_key(Self::TYPE, e))
    }
}

/// Serializes an entity with its `type` tag as the first field
#[derive(Serialize)]
pub struct Tagged<'a, T: Serialize> {
    #[serde(rename = "type")]
    doc_type: DocumentType,
    #[serde(flatten)]
    body: &'a T,
}

impl<'a, T: Entity> Tagged<'a, T> {
    pub fn new(body: &'a T) -> Self {
        Self {
            doc_type: T::TYPE,
            body,
        }
    }
}

/// Encode an entity as a tagged YAML document
pub fn encode<T: Entity>(entity: &T) -> Result<String> {
    serde_yml::to_string(&Tagged::new(entity)).map_err(|source| Error::Encode {
        kind: T::TYPE,
        key: entity.key().to_string(),
        source,
    })
}

/// A fully decoded document of any known shape
#[derive(Debug, Clone)]
pub enum Document {
    Host(Host),
    Group(Group),
    Credential(Credential),
    Config(Config),
}

impl Document {
    /// The type tag of this document
    pub fn doc_type(&self) -> DocumentType {
        match self {
            Document::Host(_) => DocumentType::Host,
            Document::Group(_) => DocumentType::Group,
            Document::Credential(_) => DocumentType::Credential,
            Document::Config(_) => DocumentType::Config,
        }
    }

    /// Key of the underlying entity
    pub fn key(&self) -> &str {
        match self {
            Document::Host(h) => h.key(),
            Document::Group(g) => g.key(),
            Document::Credential(c) => c.key(),
            Document::Config(c) => c.key(),
        }
    }

    /// Validate the underlying entity
    pub fn validate(&self) -> Result<()> {
        match self {
            Document::Host(h) => h.validate(),
            Document::Group(g) => g.validate(),
            Document::Credential(c) => c.validate(),
            Document::Config(c) => c.validate(),
        }
    }

    /// Encode back into a tagged YAML document
    pub fn encode(&self) -> Result<String> {
        match self {
            Document::Host(h) => encode(h),
            Document::Group(g) => encode(g),
            Document::Credential(c) => encode(c),
            Document::Config(c) => encode(c),
        }
    }
}

#[derive(Deserialize)]
struct Header {
    #[serde(rename = "type", default)]
    doc_type: Option<serde_yml::Value>,
}

/// Extract only the `type` tag of a document
///
/// `path` is used for error context only.
pub fn peek_type(source: &str, path: &Path) -> Result<DocumentType> {
    let header: Header = serde_yml::from_str(source).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let raw = match header.doc_type {
        Some(serde_yml::Value::String(s)) => s,
        Some(other) => {
            return Err(Error::UnknownType {
                path: path.to_path_buf(),
                found: serde_yml::to_string(&other)
                    .ok()
                    .map(|s| s.trim().to_string()),
            })
        }
        None => {
            return Err(Error::UnknownType {
                path: path.to_path_buf(),
                found: None,
            })
        }
    };

    raw.parse().map_err(|_| Error::UnknownType {
        path: path.to_path_buf(),
        found: Some(raw.clone()),
    })
}

/// Decode the body of a document into a specific shape
fn decode_body<T: Entity>(source: &str, path: &Path) -> Result<T> {
    serde_yml::from_str(source).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Decode a document whose shape is chosen by its `type` tag
pub fn decode_document(source: &str, path: &Path) -> Result<Document> {
    let doc = match peek_type(source, path)? {
        DocumentType::Host => Document::Host(decode_body(source, path)?),
        DocumentType::Group => Document::Group(decode_body(source, path)?),
        DocumentType::Credential => Document::Credential(decode_body(source, path)?),
        DocumentType::Config => Document::Config(decode_body(source, path)?),
    };
    Ok(doc)
}

/// Decode a document into a caller-chosen shape
///
/// The tag must match the shape; a mismatch is an error rather than a
/// silent reinterpretation of the fields.
pub fn decode_as<T: Entity>(source: &str, path: &Path) -> Result<(DocumentType, T)> {
    let found = peek_type(source, path)?;
    if found != T::TYPE {
        return Err(Error::TagMismatch {
            path: path.to_path_buf(),
            expected: T::TYPE,
            found,
        });
    }
    Ok((found, decode_body(source, path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    fn p() -> &'static Path {
        Path::new("test.yaml")
    }

    #[test]
    fn test_peek_type_reads_tag_only() {
        let src = "type: host\nid: web1\nport: not-a-number\n";
        assert_eq!(peek_type(src, p()).unwrap(), DocumentType::Host);
    }

    #[test]
    fn test_peek_type_missing_tag() {
        let err = peek_type("id: web1\nname: web\n", p()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownType);
    }

    #[test]
    fn test_peek_type_unknown_tag() {
        let err = peek_type("type: server\n", p()).unwrap_err();
        match err {
            Error::UnknownType { found, .. } => assert_eq!(found.as_deref(), Some("server")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_peek_type_non_string_tag() {
        let err = peek_type("type: 42\n", p()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownType);
    }

    #[test]
    fn test_decode_document_dispatches_on_tag() {
        let src = "type: credential\nid: c1\nname: admin\nuser: root\npassword: x\n";
        match decode_document(src, p()).unwrap() {
            Document::Credential(c) => {
                assert_eq!(c.id, "c1");
                assert_eq!(c.user, "root");
            }
            other => panic!("expected credential, got {:?}", other.doc_type()),
        }
    }

    #[test]
    fn test_decode_as_rejects_mismatched_shape() {
        let src = "type: group\nname: prod\n";
        let err = decode_as::<Host>(src, p()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TagMismatch);

        let (tag, group) = decode_as::<Group>(src, p()).unwrap();
        assert_eq!(tag, DocumentType::Group);
        assert_eq!(group.name, "prod");
    }

    #[test]
    fn test_encode_puts_type_first() {
        let host = Host::new("web1", "Web 1", "10.0.0.1");
        let yaml = encode(&host).unwrap();
        assert!(yaml.starts_with("type: host\n"));
        assert!(yaml.contains("id: web1"));
    }
}
