//! Error objects of an `errors` document.

use serde::{Deserialize, Serialize};

/// One entry of a document's `errors` array.
///
/// ```json
/// { "status": "400", "code": "invalid_sort", "title": "unknown sort key", "detail": "..." }
/// ```
///
/// `status` is a string, as JSON:API requires.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Machine-readable error code. See [`codes`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Short human-readable summary.
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorObject {
    /// An error with an HTTP status and a title.
    pub fn new(status: u16, title: impl Into<String>) -> Self {
        Self {
            status: Some(status.to_string()),
            code: None,
            title: title.into(),
            detail: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Error codes emitted by the serializer.
///
/// | `code` | HTTP status |
/// |--------|------------|
/// | `invalid_parameter` | 400 |
/// | `invalid_sort` | 400 |
/// | `invalid_filter` | 400 |
/// | `internal_error` | 500 |
pub mod codes {
    pub const INVALID_PARAMETER: &str = "invalid_parameter";
    pub const INVALID_SORT: &str = "invalid_sort";
    pub const INVALID_FILTER: &str = "invalid_filter";
    pub const INTERNAL_ERROR: &str = "internal_error";
}
