//! Link objects at document, resource and relationship level.

use serde::{Deserialize, Serialize};

/// Top-level document links.
///
/// `self` is always present. The pagination links are present only when
/// the serializer knows the corresponding page exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Links {
    #[serde(rename = "self")]
    pub self_link: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
}

impl Links {
    /// Links carrying only `self`.
    pub fn new(self_link: impl Into<String>) -> Self {
        Self {
            self_link: self_link.into(),
            ..Self::default()
        }
    }

    /// `true` if any of `first`, `next` or `prev` is set.
    pub fn has_pagination(&self) -> bool {
        self.first.is_some() || self.next.is_some() || self.prev.is_some()
    }
}

/// Links of a resource object: its canonical `self` URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceLinks {
    #[serde(rename = "self")]
    pub self_link: String,
}

/// Links of a relationship object.
///
/// `related` is `None` when the configured path builder declines to build a
/// link, in which case the key is omitted entirely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RelationshipLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related: Option<String>,
}

impl RelationshipLinks {
    pub fn is_empty(&self) -> bool {
        self.related.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn self_only_links() {
        let links = Links::new("http://example.com/api/people");
        assert!(!links.has_pagination());
        assert_eq!(
            serde_json::to_value(&links).unwrap(),
            json!({ "self": "http://example.com/api/people" })
        );
    }

    #[test]
    fn pagination_links_serialise_when_set() {
        let links = Links {
            self_link: "http://example.com/api/people?page=1".into(),
            first: Some("http://example.com/api/people?page=0".into()),
            next: Some("http://example.com/api/people?page=2".into()),
            prev: Some("http://example.com/api/people?page=0".into()),
        };
        let json = serde_json::to_value(&links).unwrap();
        assert_eq!(json["next"], "http://example.com/api/people?page=2");
        assert_eq!(json["prev"], "http://example.com/api/people?page=0");
        assert!(links.has_pagination());
    }
}
