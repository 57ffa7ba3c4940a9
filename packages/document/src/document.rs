//! The top-level compound document.

use serde::{Deserialize, Serialize};

use crate::error::ErrorObject;
use crate::links::Links;
use crate::resource::ResourceObject;

/// Primary data of a successful document: one resource or a sequence.
///
/// Serialises untagged, so a single resource is a JSON object and a
/// collection is a JSON array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PrimaryData {
    Single(Box<ResourceObject>),
    Collection(Vec<ResourceObject>),
}

impl PrimaryData {
    /// Number of primary resources (1 for a single resource).
    pub fn len(&self) -> usize {
        match self {
            PrimaryData::Single(_) => 1,
            PrimaryData::Collection(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the primary resources regardless of cardinality.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceObject> {
        let slice: &[ResourceObject] = match self {
            PrimaryData::Single(resource) => std::slice::from_ref(resource.as_ref()),
            PrimaryData::Collection(items) => items,
        };
        slice.iter()
    }
}

/// A compound document.
///
/// `data` and `errors` are mutually exclusive: documents built through
/// [`Document::with_data`] never carry errors, and documents built through
/// [`Document::with_errors`] serialise `data` as an explicit `null`.
///
/// # Example
///
/// ```json
/// {
///   "data": [ { "type": "person", "id": "1", ... } ],
///   "included": [ { "type": "company", "id": "7", ... } ],
///   "links": { "self": "http://example.com/api/people?page=1", "prev": "..." }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Primary data. Always serialised, `null` for error documents.
    pub data: Option<PrimaryData>,

    /// Related resources inlined once each, keyed by `(type, id)`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<ResourceObject>,

    pub links: Links,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorObject>,
}

impl Document {
    /// A successful document carrying primary data and related resources.
    pub fn with_data(data: PrimaryData, included: Vec<ResourceObject>, links: Links) -> Self {
        Self {
            data: Some(data),
            included,
            links,
            errors: Vec::new(),
        }
    }

    /// An error document. `errors` should be non-empty.
    pub fn with_errors(errors: Vec<ErrorObject>, links: Links) -> Self {
        Self {
            data: None,
            included: Vec::new(),
            links,
            errors,
        }
    }

    /// `true` if this document reports errors instead of data.
    pub fn is_error(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The HTTP status a handler should answer with: the first error's
    /// status for error documents, `200` otherwise.
    pub fn status(&self) -> u16 {
        self.errors
            .first()
            .and_then(|e| e.status.as_deref())
            .and_then(|s| s.parse().ok())
            .unwrap_or(200)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
