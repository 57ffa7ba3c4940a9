//! The resource graph serializer.
//!
//! [`Serializer::serialize`] turns a [`Payload`] into a compound
//! [`Document`]:
//!
//! | Payload | Document |
//! |---------|----------|
//! | [`Payload::Single`] | `data` is one resource; `links.self` only |
//! | [`Payload::Collection`] | query applied, `data` is an array; paging links when paginating |
//! | [`Payload::Error`] | `data: null`, `errors` from the upstream failure |
//!
//! A rejected client query yields a `400` error document rather than an
//! `Err`. `Err` is reserved for caller mistakes: a missing or relative
//! request URL, or a malformed resource declaration.

pub mod errors;
pub mod url;
mod walker;

use std::any::Any;
use std::sync::Arc;

use graphdoc_document::{Document, Links, PrimaryData, QueryParams};
use thiserror::Error;

use crate::convert::{AttributeConverter, ConverterChain, RegistrationPolicy};
use crate::options::SerializerOptions;
use crate::paths::{DefaultUrlPathBuilder, UrlPathBuilder};
use crate::query::{LazyQuery, QueryContext, QueryError, QueryInterpreter, Source};
use crate::registry::SchemaRegistry;
use crate::schema::{Resource, ResourceDescriptor, SchemaError};

pub use errors::{query_error_object, HostError, UpstreamError};
pub use url::RequestUrl;

use walker::GraphWalker;

/// Errors returned to the caller instead of a document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializeError {
    #[error("missing required argument `{0}`")]
    MissingArgument(&'static str),

    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// What a request handler hands to the serializer.
#[derive(Debug)]
pub enum Payload<T> {
    Single(T),
    Collection(Source<T>),
    Error(UpstreamError),
}

impl<T> Payload<T> {
    pub fn single(item: T) -> Self {
        Payload::Single(item)
    }

    /// A raised error from application code.
    pub fn exception(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Payload::Error(UpstreamError::exception(error))
    }

    pub fn host_error(error: HostError) -> Self {
        Payload::Error(UpstreamError::Host(error))
    }
}

impl<T> From<Vec<T>> for Payload<T> {
    fn from(items: Vec<T>) -> Self {
        Payload::Collection(Source::sequence(items))
    }
}

impl<T> From<Source<T>> for Payload<T> {
    fn from(source: Source<T>) -> Self {
        Payload::Collection(source)
    }
}

impl<T: 'static> From<LazyQuery<T>> for Payload<T> {
    fn from(query: LazyQuery<T>) -> Self {
        Payload::Collection(Source::deferred(query))
    }
}

impl<T> From<UpstreamError> for Payload<T> {
    fn from(error: UpstreamError) -> Self {
        Payload::Error(error)
    }
}

/// Serializes payloads into compound documents.
///
/// Holds no per-request state: one instance may serve concurrent requests.
#[derive(Clone)]
pub struct Serializer {
    options: SerializerOptions,
    converters: ConverterChain,
    paths: Arc<dyn UrlPathBuilder>,
    registry: Arc<SchemaRegistry>,
}

impl Serializer {
    /// A serializer using the default path builder and the global registry.
    pub fn new(options: SerializerOptions) -> Self {
        Self {
            options,
            converters: ConverterChain::new(),
            paths: Arc::new(DefaultUrlPathBuilder::new()),
            registry: SchemaRegistry::global(),
        }
    }

    pub fn with_path_builder(mut self, paths: impl UrlPathBuilder + 'static) -> Self {
        self.paths = Arc::new(paths);
        self
    }

    pub fn with_registry(mut self, registry: Arc<SchemaRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Add a converter to the chain according to `policy`.
    pub fn register_converter(
        &mut self,
        converter: impl AttributeConverter + 'static,
        policy: RegistrationPolicy,
    ) -> &mut Self {
        self.converters.register(converter, policy);
        self
    }

    pub fn options(&self) -> &SerializerOptions {
        &self.options
    }

    pub fn converters(&self) -> &ConverterChain {
        &self.converters
    }

    /// Serialize `payload` for the request at `url`.
    ///
    /// `url` must be the absolute request URL; its query component supplies
    /// client query parameters and its origin prefixes every link.
    pub fn serialize<T: Resource>(
        &self,
        payload: impl Into<Payload<T>>,
        url: &str,
    ) -> Result<Document, SerializeError> {
        let url = RequestUrl::parse(url)?;
        match payload.into() {
            Payload::Error(error) => Ok(self.error_document(&error, &url)),
            Payload::Single(item) => self.serialize_single(item, &url),
            Payload::Collection(source) => self.serialize_collection(source, &url),
        }
    }

    /// Serialize an upstream failure for the request at `url`.
    pub fn serialize_error(
        &self,
        error: impl Into<UpstreamError>,
        url: &str,
    ) -> Result<Document, SerializeError> {
        let url = RequestUrl::parse(url)?;
        Ok(self.error_document(&error.into(), &url))
    }

    fn serialize_single<T: Resource>(
        &self,
        item: T,
        url: &RequestUrl<'_>,
    ) -> Result<Document, SerializeError> {
        let (descriptor, context) = match self.prepare::<T>(url)? {
            Ok(prepared) => prepared,
            Err(rejected) => return Ok(rejected),
        };
        let mut walker = self.walker(&context, url);
        let resource = walker.single(&descriptor, &item)?;
        Ok(Document::with_data(
            PrimaryData::Single(Box::new(resource)),
            walker.into_included(),
            Links::new(url.as_str()),
        ))
    }

    fn serialize_collection<T: Resource>(
        &self,
        source: Source<T>,
        url: &RequestUrl<'_>,
    ) -> Result<Document, SerializeError> {
        let (descriptor, context) = match self.prepare::<T>(url)? {
            Ok(prepared) => prepared,
            Err(rejected) => return Ok(rejected),
        };
        let items = match QueryInterpreter::new(&context, &descriptor).apply(source) {
            Ok(items) => items,
            Err(error) => return Ok(rejected_query(&error, url)),
        };

        let erased: Vec<&dyn Any> = items.iter().map(|i| i as &dyn Any).collect();
        let mut walker = self.walker(&context, url);
        let resources = walker.collection(&descriptor, &erased)?;
        Ok(Document::with_data(
            PrimaryData::Collection(resources),
            walker.into_included(),
            collection_links(&context, url, items.len()),
        ))
    }

    /// Resolve the descriptor graph of `T` and read the request's query.
    /// A rejected query comes back as the inner `Err`, already rendered as
    /// an error document.
    fn prepare<T: Resource>(
        &self,
        url: &RequestUrl<'_>,
    ) -> Result<Result<(Arc<ResourceDescriptor>, QueryContext), Document>, SerializeError> {
        let descriptor = self.registry.describe_graph::<T>()?;
        tracing::debug!(
            resource = %descriptor.type_name(),
            url = %url.as_str(),
            "serializing payload"
        );
        let params = QueryParams::from_query_string(url.query());
        Ok(
            match QueryContext::from_params(&params, &self.options, &descriptor) {
                Ok(context) => Ok((descriptor, context)),
                Err(error) => Err(rejected_query(&error, url)),
            },
        )
    }

    fn walker<'s>(&'s self, context: &'s QueryContext, url: &'s RequestUrl<'s>) -> GraphWalker<'s> {
        GraphWalker::new(
            &self.registry,
            self.paths.as_ref(),
            &self.converters,
            context,
            url,
        )
    }

    fn error_document(&self, error: &UpstreamError, url: &RequestUrl<'_>) -> Document {
        tracing::warn!(url = %url.as_str(), "serializing upstream error: {error}");
        Document::with_errors(error.to_error_objects(), Links::new(url.as_str()))
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new(SerializerOptions::default())
    }
}

impl std::fmt::Debug for Serializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Serializer")
            .field("options", &self.options)
            .field("converters", &self.converters)
            .finish_non_exhaustive()
    }
}

fn rejected_query(error: &QueryError, url: &RequestUrl<'_>) -> Document {
    tracing::debug!(url = %url.as_str(), "rejecting client query: {error}");
    Document::with_errors(vec![query_error_object(error)], Links::new(url.as_str()))
}

/// `self`, plus `first`/`next` when the page just produced was full and
/// `prev` when it was not the first. A full last page still gets `next`.
fn collection_links(context: &QueryContext, url: &RequestUrl<'_>, returned: usize) -> Links {
    let mut links = Links::new(url.as_str());
    if !context.is_paginated() {
        return links;
    }
    let page = context.page();
    if returned == context.per_page() {
        links.first = Some(url.with_page(0));
        links.next = Some(url.with_page(page.saturating_add(1)));
    }
    if page > 0 {
        links.prev = Some(url.with_page(page - 1));
    }
    links
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::CanonicalUrlPathBuilder;
    use crate::schema::ResourceBuilder;
    use graphdoc_document::Linkage;
    use serde_json::json;

    const URL: &str = "http://example.com/api/people";

    #[derive(Debug, Clone)]
    struct Person {
        id: u32,
        name: &'static str,
        employer: Option<Company>,
        friends: Vec<Person>,
    }

    #[derive(Debug, Clone)]
    struct Company {
        id: u32,
        name: &'static str,
    }

    impl Resource for Person {
        fn describe(r: &mut ResourceBuilder<Self>) {
            r.type_name("person").url_path("people").id(|p| p.id);
            r.attribute("name", |p| p.name);
            r.to_one("employer", |p| p.employer.as_ref());
            r.to_many("friends", |p| p.friends.iter().collect());
        }
    }

    impl Resource for Company {
        fn describe(r: &mut ResourceBuilder<Self>) {
            r.type_name("company").url_path("companies").id(|c| c.id);
            r.attribute("name", |c| c.name);
        }
    }

    fn acme() -> Company {
        Company { id: 7, name: "Acme" }
    }

    fn person(id: u32, employer: Option<Company>) -> Person {
        Person {
            id,
            name: "Ada",
            employer,
            friends: Vec::new(),
        }
    }

    fn serializer(options: SerializerOptions) -> Serializer {
        Serializer::new(options).with_registry(Arc::new(SchemaRegistry::new()))
    }

    #[test]
    fn single_resource_document() {
        let doc = serializer(SerializerOptions::default())
            .serialize(Payload::single(person(1, Some(acme()))), URL)
            .unwrap();
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["data"]["type"], "person");
        assert_eq!(json["data"]["id"], "1");
        assert_eq!(json["data"]["attributes"], json!({ "name": "Ada" }));
        assert_eq!(json["data"]["links"]["self"], "http://example.com/people/1");
        assert_eq!(
            json["data"]["relationships"]["employer"],
            json!({
                "links": { "related": "http://example.com/people/1/employer" },
                "data": { "type": "company", "id": "7" }
            })
        );
        assert_eq!(json["data"]["relationships"]["friends"]["data"], json!([]));
        assert_eq!(json["included"][0]["id"], "7");
        assert_eq!(json["links"], json!({ "self": URL }));
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn missing_or_relative_url_is_an_argument_error() {
        let s = serializer(SerializerOptions::default());
        assert_eq!(
            s.serialize(Payload::single(person(1, None)), "").unwrap_err(),
            SerializeError::MissingArgument("url")
        );
        assert!(matches!(
            s.serialize(Payload::single(person(1, None)), "/api/people"),
            Err(SerializeError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn empty_collection_has_empty_data_array() {
        let doc = serializer(SerializerOptions::paginated(5))
            .serialize(Vec::<Person>::new(), URL)
            .unwrap();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["data"], json!([]));
        assert_eq!(json["links"], json!({ "self": URL }));
    }

    #[test]
    fn absent_to_one_is_null_linkage() {
        let doc = serializer(SerializerOptions::default())
            .serialize(Payload::single(person(1, None)), URL)
            .unwrap();
        let Some(PrimaryData::Single(resource)) = &doc.data else {
            panic!("expected a single resource");
        };
        assert_eq!(resource.relationships["employer"].data, Linkage::ToOne(None));
        assert!(doc.included.is_empty());
    }

    #[test]
    fn canonical_builder_omits_links_without_related_id() {
        let doc = serializer(SerializerOptions::default())
            .with_path_builder(CanonicalUrlPathBuilder::new())
            .serialize(Payload::single(person(1, None)), URL)
            .unwrap();
        let json = serde_json::to_value(&doc).unwrap();
        let relationships = &json["data"]["relationships"];
        assert!(relationships["employer"].get("links").is_none());
        assert!(relationships["friends"].get("links").is_none());
    }

    #[test]
    fn primary_resources_are_not_repeated_in_included() {
        let mut first = person(1, None);
        first.friends = vec![person(2, None), person(3, None)];
        let second = person(2, None);

        let doc = serializer(SerializerOptions::default())
            .serialize(vec![first, second], URL)
            .unwrap();
        let included: Vec<_> = doc.included.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(included, vec!["3"]);
    }

    #[test]
    fn rejected_sort_becomes_client_error_document() {
        let options = SerializerOptions::paginated(5).with_user_query(true);
        let doc = serializer(options)
            .serialize(vec![person(1, None)], "http://example.com/api/people?sort=-height")
            .unwrap();
        assert!(doc.data.is_none());
        assert_eq!(doc.status(), 400);
        assert_eq!(doc.errors[0].code.as_deref(), Some("invalid_sort"));
    }

    #[test]
    fn sparse_fieldsets_restrict_members() {
        let options = SerializerOptions::default().with_user_query(true);
        let doc = serializer(options)
            .serialize(
                Payload::single(person(1, Some(acme()))),
                "http://example.com/api/people/1?fields[person]=employer",
            )
            .unwrap();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["data"]["attributes"], json!({}));
        assert!(json["data"]["relationships"].get("friends").is_none());
        assert_eq!(json["included"][0]["attributes"]["name"], "Acme");
    }

    #[test]
    fn serialize_error_shortcut() {
        let doc = serializer(SerializerOptions::default())
            .serialize_error(HostError::new(503, "unavailable"), URL)
            .unwrap();
        assert_eq!(doc.status(), 503);
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json["data"].is_null());
    }

    #[test]
    fn page_links() {
        let paginated = QueryContext::new().paginated(2, 5);
        let url = RequestUrl::parse("http://example.com/people?page=2").unwrap();

        let full = collection_links(&paginated, &url, 5);
        assert_eq!(full.first.as_deref(), Some("http://example.com/people?page=0"));
        assert_eq!(full.next.as_deref(), Some("http://example.com/people?page=3"));
        assert_eq!(full.prev.as_deref(), Some("http://example.com/people?page=1"));

        let short = collection_links(&paginated, &url, 4);
        assert_eq!(short.first, None);
        assert_eq!(short.next, None);
        assert!(short.prev.is_some());

        let unpaged = collection_links(&QueryContext::new(), &url, 10);
        assert!(!unpaged.has_pagination());
    }
}
