//! Errors handed to the serializer and their `errors` document form.

use std::error::Error as StdError;
use std::fmt;

use graphdoc_document::error::codes;
use graphdoc_document::ErrorObject;
use thiserror::Error;

use crate::query::QueryError;

/// An error object produced by the host framework, e.g. a rejected request
/// that never reached a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostError {
    pub status: u16,
    pub message: String,
    pub detail: Option<String>,
}

impl HostError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.message)
    }
}

impl StdError for HostError {}

/// A payload that is itself a failure. Always becomes an `errors` document.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// A raised error from application code.
    #[error("{0}")]
    Exception(#[source] Box<dyn StdError + Send + Sync>),

    /// An error object from the host framework, keeping its own status.
    #[error("host error: {0}")]
    Host(HostError),
}

impl UpstreamError {
    pub fn exception(error: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        UpstreamError::Exception(error.into())
    }

    /// The error objects reported for this failure.
    pub fn to_error_objects(&self) -> Vec<ErrorObject> {
        match self {
            UpstreamError::Exception(error) => {
                let mut object = ErrorObject::new(500, error.to_string()).with_code(codes::INTERNAL_ERROR);
                let chain = source_chain(&**error);
                if !chain.is_empty() {
                    object = object.with_detail(chain.join(": "));
                }
                vec![object]
            }
            UpstreamError::Host(host) => {
                let object = ErrorObject::new(host.status, host.message.clone());
                vec![match &host.detail {
                    Some(detail) => object.with_detail(detail.clone()),
                    None => object,
                }]
            }
        }
    }
}

impl From<HostError> for UpstreamError {
    fn from(error: HostError) -> Self {
        UpstreamError::Host(error)
    }
}

/// The `400` error object for a rejected client query.
pub fn query_error_object(error: &QueryError) -> ErrorObject {
    ErrorObject::new(400, error.title())
        .with_code(error.code())
        .with_detail(error.to_string())
}

fn source_chain(error: &(dyn StdError + 'static)) -> Vec<String> {
    let mut chain = Vec::new();
    let mut next = error.source();
    while let Some(cause) = next {
        chain.push(cause.to_string());
        next = cause.source();
    }
    chain
}

// --- tests -------------------------------------------------------------------
