//! Resource objects, identifiers and relationship linkage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::links::{RelationshipLinks, ResourceLinks};

/// The `(type, id)` pair that uniquely identifies a resource in a document.
///
/// ```json
/// { "type": "company", "id": "7" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub type_name: String,
    pub id: String,
}

impl ResourceIdentifier {
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.into(),
        }
    }
}

/// Resource linkage of a relationship.
///
/// A to-one relationship serialises as an identifier object or `null`; a
/// to-many relationship serialises as an array of identifiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Linkage {
    ToMany(Vec<ResourceIdentifier>),
    ToOne(Option<ResourceIdentifier>),
}

impl Linkage {
    /// Identifiers referenced by this linkage, in order.
    pub fn identifiers(&self) -> Vec<&ResourceIdentifier> {
        match self {
            Linkage::ToOne(id) => id.iter().collect(),
            Linkage::ToMany(ids) => ids.iter().collect(),
        }
    }
}

/// A single relationship entry of a resource object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationshipObject {
    #[serde(default, skip_serializing_if = "RelationshipLinks::is_empty")]
    pub links: RelationshipLinks,
    pub data: Linkage,
}

/// A serialized domain entity.
///
/// `attributes` keeps declaration order on the wire; `relationships` is
/// keyed by relationship name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceObject {
    #[serde(rename = "type")]
    pub type_name: String,

    pub id: String,

    #[serde(default)]
    pub attributes: Map<String, Value>,

    #[serde(default)]
    pub relationships: BTreeMap<String, RelationshipObject>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<ResourceLinks>,
}

impl ResourceObject {
    /// A resource with no attributes, relationships or links.
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.into(),
            attributes: Map::new(),
            relationships: BTreeMap::new(),
            links: None,
        }
    }

    /// The identifier of this resource.
    pub fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier::new(self.type_name.clone(), self.id.clone())
    }
}
