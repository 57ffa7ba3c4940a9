//! URL path building strategies.
//!
//! A [`UrlPathBuilder`] turns a resource descriptor plus ids into the path
//! component of resource and relationship links. The serializer joins the
//! result to the origin of the request URL. Id segments are
//! percent-encoded, and an empty id yields no path at all. Two strategies
//! ship:
//!
//! | Strategy | Relationship path |
//! |----------|-------------------|
//! | [`DefaultUrlPathBuilder`] | `{prefix}/{resource}/{id}/{relationship}` |
//! | [`CanonicalUrlPathBuilder`] | `{prefix}/{related}/{related_id}`, or none without a related id |

use crate::schema::{RelationshipDescriptor, ResourceDescriptor};

/// Builds the paths used in `links` members.
pub trait UrlPathBuilder: Send + Sync {
    /// The canonical path of a single resource, e.g. `/api/people/1`.
    /// Returning `None` omits the resource's `self` link.
    fn build_canonical_path(&self, resource: &ResourceDescriptor, id: &str) -> Option<String>;

    /// The path of `relationship` on the resource `id`.
    ///
    /// `related` is the relationship's target descriptor and `related_id`
    /// the target's id when the relationship points at exactly one known
    /// resource. Returning `None` omits the link.
    fn build_relationship_path(
        &self,
        resource: &ResourceDescriptor,
        id: &str,
        relationship: &RelationshipDescriptor,
        related: &ResourceDescriptor,
        related_id: Option<&str>,
    ) -> Option<String>;
}

/// Relationship-aware paths under an optional prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultUrlPathBuilder {
    prefix: String,
}

impl DefaultUrlPathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend `prefix` (e.g. `/api` or `api/v1`) to every path.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl UrlPathBuilder for DefaultUrlPathBuilder {
    fn build_canonical_path(&self, resource: &ResourceDescriptor, id: &str) -> Option<String> {
        if id.is_empty() {
            return None;
        }
        Some(format!(
            "{}/{}",
            collection_path(&self.prefix, resource.url_path()),
            urlencoding::encode(id)
        ))
    }

    fn build_relationship_path(
        &self,
        resource: &ResourceDescriptor,
        id: &str,
        relationship: &RelationshipDescriptor,
        _related: &ResourceDescriptor,
        _related_id: Option<&str>,
    ) -> Option<String> {
        let canonical = self.build_canonical_path(resource, id)?;
        Some(format!("{canonical}/{}", urlencoding::encode(relationship.name())))
    }
}

/// Always links to the related resource's own canonical path.
///
/// Without a related id there is no such path: the collection of every
/// resource of the related type is not the collection related to this
/// parent, so the link is omitted rather than pointing there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalUrlPathBuilder {
    inner: DefaultUrlPathBuilder,
}

impl CanonicalUrlPathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            inner: DefaultUrlPathBuilder::with_prefix(prefix),
        }
    }
}

impl UrlPathBuilder for CanonicalUrlPathBuilder {
    fn build_canonical_path(&self, resource: &ResourceDescriptor, id: &str) -> Option<String> {
        self.inner.build_canonical_path(resource, id)
    }

    fn build_relationship_path(
        &self,
        _resource: &ResourceDescriptor,
        _id: &str,
        _relationship: &RelationshipDescriptor,
        related: &ResourceDescriptor,
        related_id: Option<&str>,
    ) -> Option<String> {
        self.build_canonical_path(related, related_id?)
    }
}

/// `/{prefix}/{url_path}` with slashes normalized and no trailing `/`.
/// Empty when both are empty.
fn collection_path(prefix: &str, url_path: &str) -> String {
    let mut path = String::new();
    for segment in [prefix, url_path] {
        let trimmed = segment.trim_matches('/');
        if !trimmed.is_empty() {
            path.push('/');
            path.push_str(trimmed);
        }
    }
    path
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SchemaRegistry;
    use crate::schema::{Resource, ResourceBuilder};
    use std::sync::Arc;

    struct Person {
        id: String,
        employer: Option<Company>,
    }

    struct Company {
        id: String,
    }

    impl Resource for Person {
        fn describe(r: &mut ResourceBuilder<Self>) {
            r.type_name("person").url_path("people").id(|p| p.id.clone());
            r.to_one("employer", |p| p.employer.as_ref());
        }
    }

    impl Resource for Company {
        fn describe(r: &mut ResourceBuilder<Self>) {
            r.type_name("company").url_path("/companies/").id(|c| c.id.clone());
        }
    }

    fn descriptors() -> (Arc<ResourceDescriptor>, Arc<ResourceDescriptor>) {
        let registry = SchemaRegistry::new();
        let person = registry.describe::<Person>().unwrap();
        let company = registry.describe::<Company>().unwrap();
        (person, company)
    }

    #[test]
    fn default_canonical_and_relationship_paths() {
        let (person, company) = descriptors();
        let builder = DefaultUrlPathBuilder::with_prefix("/api/");
        let employer = person.relationship("employer").unwrap();

        assert_eq!(
            builder.build_canonical_path(&person, "1").as_deref(),
            Some("/api/people/1")
        );
        assert_eq!(
            builder.build_relationship_path(&person, "1", employer, &company, Some("7")),
            Some("/api/people/1/employer".to_string())
        );
        // The default strategy does not depend on the related id.
        assert_eq!(
            builder.build_relationship_path(&person, "1", employer, &company, None),
            Some("/api/people/1/employer".to_string())
        );
    }

    #[test]
    fn canonical_strategy_points_at_related_resource() {
        let (person, company) = descriptors();
        let builder = CanonicalUrlPathBuilder::with_prefix("api");
        let employer = person.relationship("employer").unwrap();

        assert_eq!(
            builder.build_relationship_path(&person, "1", employer, &company, Some("7")),
            Some("/api/companies/7".to_string())
        );
    }

    #[test]
    fn canonical_strategy_omits_link_without_related_id() {
        let (person, company) = descriptors();
        let builder = CanonicalUrlPathBuilder::new();
        let employer = person.relationship("employer").unwrap();

        assert_eq!(
            builder.build_relationship_path(&person, "1", employer, &company, None),
            None
        );
        assert_eq!(
            builder.build_relationship_path(&person, "1", employer, &company, Some("")),
            None
        );
    }

    #[test]
    fn paths_without_prefix() {
        let (person, _) = descriptors();
        assert_eq!(
            DefaultUrlPathBuilder::new().build_canonical_path(&person, "42").as_deref(),
            Some("/people/42")
        );
        assert_eq!(collection_path("", "/"), "");
    }

    #[test]
    fn ids_are_percent_encoded() {
        let (person, company) = descriptors();
        let employer = person.relationship("employer").unwrap();
        let default = DefaultUrlPathBuilder::with_prefix("api");

        assert_eq!(
            default.build_canonical_path(&person, "a b/c?d").as_deref(),
            Some("/api/people/a%20b%2Fc%3Fd")
        );
        assert_eq!(
            default
                .build_relationship_path(&person, "a b/c?d", employer, &company, None)
                .as_deref(),
            Some("/api/people/a%20b%2Fc%3Fd/employer")
        );
        assert_eq!(
            CanonicalUrlPathBuilder::new()
                .build_relationship_path(&person, "1", employer, &company, Some("x#y"))
                .as_deref(),
            Some("/companies/x%23y")
        );
    }

    #[test]
    fn empty_id_has_no_path() {
        let (person, company) = descriptors();
        let employer = person.relationship("employer").unwrap();
        let default = DefaultUrlPathBuilder::new();

        assert_eq!(default.build_canonical_path(&person, ""), None);
        assert_eq!(
            default.build_relationship_path(&person, "", employer, &company, Some("7")),
            None
        );
    }
}
