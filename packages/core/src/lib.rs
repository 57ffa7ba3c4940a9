//! Serializes domain object graphs into JSON:API compound documents.
//!
//! Domain types describe their wire shape once by implementing
//! [`Resource`]. A [`Serializer`] then turns single objects, collections and
//! upstream failures into [`Document`]s, applying client sorting, filtering
//! and pagination to collections on the way.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`schema`] | [`Resource`] declarations and the type-erased [`ResourceDescriptor`] |
//! | [`registry`] | Process-wide, race-safe cache of descriptors |
//! | [`paths`] | [`UrlPathBuilder`] strategies for `links` members |
//! | [`query`] | Query context parsing and the [`QueryInterpreter`] over [`Source`]s |
//! | [`convert`] | Attribute converters and their [`RegistrationPolicy`] |
//! | [`options`] | [`SerializerOptions`], optionally read from the environment |
//! | [`serialize`] | The [`Serializer`] and its [`Payload`] |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use graphdoc::{Resource, ResourceBuilder, Serializer, SerializerOptions};
//!
//! struct Person { id: u32, name: String }
//!
//! impl Resource for Person {
//!     fn describe(r: &mut ResourceBuilder<Self>) {
//!         r.type_name("person").url_path("people").id(|p| p.id);
//!         r.attribute("name", |p| p.name.clone());
//!     }
//! }
//!
//! let serializer = Serializer::new(SerializerOptions::paginated(10).with_user_query(true));
//! let people = vec![Person { id: 1, name: "Ada".into() }];
//! let doc = serializer.serialize(people, "http://example.com/api/people?sort=-name")?;
//! let json = serde_json::to_string_pretty(&doc)?;
//! ```

pub mod convert;
pub mod options;
pub mod paths;
pub mod query;
pub mod registry;
pub mod schema;
pub mod serialize;

pub use convert::{
    AttributeConverter, AttributeTarget, ConverterChain, EnumNameConverter, FnConverter,
    RegistrationPolicy,
};
pub use options::{ConfigError, SerializerOptions};
pub use paths::{CanonicalUrlPathBuilder, DefaultUrlPathBuilder, UrlPathBuilder};
pub use query::{
    DeferredQuery, FilterExpr, LazyQuery, OrderExpr, QueryContext, QueryError, QueryInterpreter,
    SortDirection, SortKey, Source,
};
pub use registry::SchemaRegistry;
pub use schema::{
    Inclusion, RelationshipKind, Resource, ResourceBuilder, ResourceDescriptor, SchemaError,
};
pub use serialize::{HostError, Payload, RequestUrl, SerializeError, Serializer, UpstreamError};

pub use graphdoc_document::{Document, ErrorObject, Links, PrimaryData, QueryParams};
