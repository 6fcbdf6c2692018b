//! Transport-level error payload: `{"errors": [...]}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One problem reported to a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// Identifier of this occurrence of the problem.
    pub id: String,
    /// HTTP status code.
    pub status: u16,
    /// Application-specific error code.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,
    /// Short summary of the problem.
    pub title: String,
    /// Explanation specific to this occurrence.
    pub detail: String,
    /// References to the source of the error (`pointer`, `parameter`, `header`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Map<String, Value>>,
    /// Non-standard meta information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
    /// Links (`about`, `type`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Map<String, Value>>,
}

impl ErrorObject {
    /// Create an error object with a status, title and detail.
    pub fn new(status: u16, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status,
            title: title.into(),
            detail: detail.into(),
            ..Default::default()
        }
    }

    /// Point the error at a member of the request document.
    pub fn with_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.source
            .get_or_insert_with(Map::new)
            .insert("pointer".to_owned(), Value::String(pointer.into()));
        self
    }
}

impl fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {} {} {}", self.status, self.title, self.detail)
    }
}

impl std::error::Error for ErrorObject {}

/// The top-level error document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorsPayload {
    /// Reported problems.
    pub errors: Vec<ErrorObject>,
}

/// Encode a list of error objects as an error document.
pub fn marshal_errors(errors: Vec<ErrorObject>) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(&ErrorsPayload { errors })
}
