//! Inventory error types

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::identity::{DocumentType, IdParseError};

/// Broad category of an [`Error`], used by callers to decide how to react
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    Validation,
    ReferentialIntegrity,
    UnknownType,
    TagMismatch,
    Parse,
    Io,
}

/// Errors produced by the repository, loader and inventory manager
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("{kind} {key} not found")]
    #[diagnostic(code(sshinv::inventory::not_found))]
    NotFound { kind: DocumentType, key: String },

    #[error("file not found: {}", .path.display())]
    #[diagnostic(code(sshinv::storage::not_found))]
    FileNotFound { path: PathBuf },

    #[error("{kind} {key} already exists")]
    #[diagnostic(
        code(sshinv::inventory::exists),
        help("use the update operation to modify an existing entry")
    )]
    AlreadyExists { kind: DocumentType, key: String },

    #[error("invalid {kind} {key}: {reason}")]
    #[diagnostic(code(sshinv::inventory::invalid))]
    Validation {
        kind: DocumentType,
        key: String,
        reason: String,
    },

    #[error("{kind} {key} references non-existent {target_kind}: {target}")]
    #[diagnostic(code(sshinv::inventory::dangling))]
    DanglingReference {
        kind: DocumentType,
        key: String,
        target_kind: DocumentType,
        target: String,
    },

    #[error("{kind} {key} is in use by {user_kind} {user}")]
    #[diagnostic(
        code(sshinv::inventory::in_use),
        help("remove the reference to it first")
    )]
    InUse {
        kind: DocumentType,
        key: String,
        user_kind: DocumentType,
        user: String,
    },

    #[error("{}: missing or unknown document type{}", .path.display(), type_suffix(.found))]
    #[diagnostic(
        code(sshinv::document::unknown_type),
        help("every document needs a `type:` field set to host, group, credential or config")
    )]
    UnknownType { path: PathBuf, found: Option<String> },

    #[error("{}: expected a {expected} document but found {found}", .path.display())]
    #[diagnostic(code(sshinv::document::tag_mismatch))]
    TagMismatch {
        path: PathBuf,
        expected: DocumentType,
        found: DocumentType,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    #[diagnostic(code(sshinv::yaml::parse))]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yml::Error,
    },

    #[error("failed to encode {kind} {key}: {source}")]
    #[diagnostic(code(sshinv::yaml::encode))]
    Encode {
        kind: DocumentType,
        key: String,
        #[source]
        source: serde_yml::Error,
    },

    #[error("IO error on {}: {source}", .path.display())]
    #[diagnostic(code(sshinv::storage::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("document {index} in {}: {source}", .path.display())]
    #[diagnostic(code(sshinv::document::in_file))]
    InDocument {
        index: usize,
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("failed to walk directory: {0}")]
    #[diagnostic(code(sshinv::storage::walk))]
    Walk(#[from] walkdir::Error),
}

impl Error {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } | Error::FileNotFound { .. } => ErrorKind::NotFound,
            Error::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::DanglingReference { .. } | Error::InUse { .. } => {
                ErrorKind::ReferentialIntegrity
            }
            Error::UnknownType { .. } => ErrorKind::UnknownType,
            Error::TagMismatch { .. } => ErrorKind::TagMismatch,
            Error::Parse { .. } | Error::Encode { .. } => ErrorKind::Parse,
            Error::Io { .. } | Error::Walk(_) => ErrorKind::Io,
            Error::InDocument { source, .. } => source.kind(),
        }
    }

    pub(crate) fn not_found(kind: DocumentType, key: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub(crate) fn invalid(
        kind: DocumentType,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::Validation {
            kind,
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unsafe_key(kind: DocumentType, err: IdParseError) -> Self {
        let key = match &err {
            IdParseError::UnsafeKey(k) | IdParseError::UnknownType(k) => k.clone(),
        };
        Error::invalid(kind, key, err.to_string())
    }
}

fn type_suffix(found: &Option<String>) -> String {
    match found {
        Some(t) => format!(" '{}'", t),
        None => String::new(),
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
