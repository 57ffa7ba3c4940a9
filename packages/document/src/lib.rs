//! Wire-format types for graphdoc compound documents.
//!
//! This crate encodes the JSON:API subset produced by the `graphdoc`
//! serializer as plain serde types, plus the raw query-parameter surface a
//! request handler hands to the engine. It contains no engine logic.
//!
//! # Top-level shape
//!
//! | Key | Type | Present |
//! |-----|------|---------|
//! | `data` | [`PrimaryData`] or `null` | always; `null` in error documents |
//! | `included` | `[`[`ResourceObject`]`]` | only when non-empty |
//! | `links` | [`Links`] | always (`self` at minimum) |
//! | `errors` | `[`[`ErrorObject`]`]` | only in error documents |

pub mod document;
pub mod error;
pub mod links;
pub mod query;
pub mod resource;

pub use document::{Document, PrimaryData};
pub use error::ErrorObject;
pub use links::{Links, RelationshipLinks, ResourceLinks};
pub use query::QueryParams;
pub use resource::{Linkage, RelationshipObject, ResourceIdentifier, ResourceObject};
