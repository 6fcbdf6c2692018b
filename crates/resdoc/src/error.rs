//! Error types for resdoc operations.

use crate::Path;
use thiserror::Error;

/// Result type alias for resdoc operations.
pub type ResdocResult<T> = Result<T, ResdocError>;

/// Errors that can occur while mapping records to and from resource documents.
///
/// Configuration errors (`NoPrimaryField`, `DuplicateRelationName`) point at a
/// record declaration that can never work. Shape errors (`MissingData`,
/// `InvalidDocument`, `KindMismatch`) describe a malformed document. Value errors
/// carry the path of the offending field.
#[derive(Debug, Error)]
pub enum ResdocError {
    /// The record type declares no primary identifier field.
    #[error("no primary field declared on {record}")]
    NoPrimaryField {
        /// Rust type name of the record.
        record: &'static str,
    },

    /// Two relationship fields of one record publish the same name.
    #[error("relationship name already used: {name}")]
    DuplicateRelationName {
        /// The repeated relationship name.
        name: String,
    },

    /// The identifier could not be rendered or parsed.
    #[error("invalid id for {kind}: {message}")]
    InvalidId {
        /// Resource kind whose identifier failed.
        kind: String,
        /// Description of what went wrong.
        message: String,
    },

    /// The document's resource kind does not match the target record.
    #[error("resource type does not match model type: expected {expected}, found {found}")]
    KindMismatch {
        /// Kind declared by the target record.
        expected: &'static str,
        /// Kind found in the document.
        found: String,
    },

    /// The document has no `data` member.
    #[error("invalid data structure: missing data")]
    MissingData,

    /// The document does not have the expected shape.
    #[error("invalid data structure: {message}")]
    InvalidDocument {
        /// Description of what went wrong.
        message: String,
    },

    /// A decoded value has the wrong JSON kind for its target field.
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        /// The field path where the mismatch occurred.
        path: Path,
        /// The expected JSON kind.
        expected: &'static str,
        /// The JSON kind found.
        found: &'static str,
    },

    /// A decoded value has the right JSON kind but cannot be represented.
    #[error("invalid value at {path}: {message}")]
    InvalidValue {
        /// The field path of the value.
        path: Path,
        /// Description of what went wrong.
        message: String,
    },

    /// A patch path does not resolve to a patchable field.
    #[error("path not found: {path}")]
    PathNotFound {
        /// The path that was not found.
        path: Path,
    },

    /// A patch operation has no path.
    #[error("invalid patch operation - empty path")]
    EmptyPath,

    /// A patch operation has no `op`.
    #[error("invalid patch operation - empty op")]
    EmptyOp,

    /// An `add` patch targets a field that is not a sequence.
    #[error("invalid patch operation - target field is not a slice at {path}")]
    NotASlice {
        /// The targeted field.
        path: Path,
    },

    /// A to-many relationship was patched with something other than a list.
    #[error("invalid patch operation - to-many relationship requires a list of ids at {path}")]
    SliceValueRequired {
        /// The targeted field.
        path: Path,
    },

    /// A shared related record is mutably borrowed while being marshaled.
    #[error("related {kind} record is already mutably borrowed")]
    Borrowed {
        /// Kind of the related record.
        kind: &'static str,
    },

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ResdocError {
    /// Create a type mismatch error at the root path.
    #[inline]
    pub fn type_mismatch(expected: &'static str, found: &serde_json::Value) -> Self {
        ResdocError::TypeMismatch {
            path: Path::root(),
            expected,
            found: value_type_name(found),
        }
    }

    /// Create an invalid value error at the root path.
    #[inline]
    pub fn invalid_value(message: impl Into<String>) -> Self {
        ResdocError::InvalidValue {
            path: Path::root(),
            message: message.into(),
        }
    }

    /// Create an invalid id error.
    #[inline]
    pub fn invalid_id(kind: impl Into<String>, message: impl Into<String>) -> Self {
        ResdocError::InvalidId {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create an invalid document error.
    #[inline]
    pub fn invalid_document(message: impl Into<String>) -> Self {
        ResdocError::InvalidDocument {
            message: message.into(),
        }
    }

    /// Create a path not found error.
    #[inline]
    pub fn path_not_found(path: Path) -> Self {
        ResdocError::PathNotFound { path }
    }

    /// Add a path prefix to this error.
    ///
    /// Used while a decode unwinds through nested fields: an error raised at
    /// `city` inside the attribute `address` becomes `address.city`.
    pub fn with_prefix(self, prefix: &Path) -> Self {
        match self {
            ResdocError::TypeMismatch {
                path,
                expected,
                found,
            } => ResdocError::TypeMismatch {
                path: path.under(prefix),
                expected,
                found,
            },
            ResdocError::InvalidValue { path, message } => ResdocError::InvalidValue {
                path: path.under(prefix),
                message,
            },
            ResdocError::PathNotFound { path } => ResdocError::PathNotFound {
                path: path.under(prefix),
            },
            ResdocError::NotASlice { path } => ResdocError::NotASlice {
                path: path.under(prefix),
            },
            ResdocError::SliceValueRequired { path } => ResdocError::SliceValueRequired {
                path: path.under(prefix),
            },
            other => other,
        }
    }

    /// The field path this error refers to, if it carries one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ResdocError::TypeMismatch { path, .. }
            | ResdocError::InvalidValue { path, .. }
            | ResdocError::PathNotFound { path }
            | ResdocError::NotASlice { path }
            | ResdocError::SliceValueRequired { path } => Some(path),
            _ => None,
        }
    }
}

/// Get the type name of a JSON value.
#[inline]
pub fn value_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
