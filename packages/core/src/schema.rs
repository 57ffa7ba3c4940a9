//! Resource schema descriptors.
//!
//! A domain type becomes serializable by implementing [`Resource`] and
//! declaring its wire shape through a typed [`ResourceBuilder`]. The builder
//! type-erases every accessor so that the serializer can walk heterogeneous
//! object graphs through one [`ResourceDescriptor`] type.
//!
//! Relationship targets are *not* described when the owning descriptor is
//! built. A [`RelationshipDescriptor`] only remembers how to ask the
//! [`SchemaRegistry`] for the target on demand, so mutually referential types
//! (a person works for a company whose employees are people) never recurse
//! during construction.
//!
//! ```rust,ignore
//! impl Resource for Person {
//!     fn describe(r: &mut ResourceBuilder<Self>) {
//!         r.type_name("person").url_path("people").id(|p| p.id.clone());
//!         r.attribute("age", |p| p.age);
//!         r.to_one("job", |p| p.job.as_ref());
//!         r.to_many("friends", |p| p.friends.iter().collect()).linkage_only();
//!     }
//! }
//! ```

use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::registry::SchemaRegistry;

/// Names JSON:API reserves on resource objects.
const RESERVED_NAMES: [&str; 2] = ["id", "type"];

/// Errors raised while building or resolving a resource descriptor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("resource {rust_type} declares no type name")]
    MissingTypeName { rust_type: &'static str },

    #[error("resource `{resource}` declares no id accessor")]
    MissingId { resource: String },

    #[error("resource `{resource}` declares `{name}` more than once")]
    DuplicateName { resource: String, name: String },

    #[error("resource `{resource}` uses reserved member name `{name}`")]
    ReservedName { resource: String, name: String },

    #[error("relationship `{resource}.{relationship}` has no resolvable target: {source}")]
    UnresolvedRelationship {
        resource: String,
        relationship: String,
        #[source]
        source: Box<SchemaError>,
    },
}

/// A domain type that can be serialized as a resource.
pub trait Resource: Send + Sync + Sized + 'static {
    /// Declare the resource's type name, id, attributes and relationships.
    fn describe(resource: &mut ResourceBuilder<Self>);
}

// ---------------------------------------------------------------------------
// Erased accessors
// ---------------------------------------------------------------------------

type IdFn = dyn Fn(&dyn Any) -> Option<String> + Send + Sync;
type ValueFn = dyn Fn(&dyn Any) -> Value + Send + Sync;
type RelatedFn = dyn for<'a> Fn(&'a dyn Any) -> Vec<&'a dyn Any> + Send + Sync;
type ResolveFn = fn(&SchemaRegistry) -> Result<Arc<ResourceDescriptor>, SchemaError>;

fn erase_related<F>(f: F) -> Arc<RelatedFn>
where
    F: for<'a> Fn(&'a dyn Any) -> Vec<&'a dyn Any> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A compiled accessor for a sortable or filterable property: either the
/// resource id or one of its attributes.
///
/// This is what query sources receive instead of a property name to look up
/// at runtime.
#[derive(Clone)]
pub enum PropertyAccessor {
    Id(Arc<IdFn>),
    Attribute(Arc<ValueFn>),
}

impl PropertyAccessor {
    /// The property's value on `item`. Ids are returned as JSON strings.
    pub fn value_of(&self, item: &dyn Any) -> Value {
        match self {
            PropertyAccessor::Id(f) => f(item).map(Value::String).unwrap_or(Value::Null),
            PropertyAccessor::Attribute(f) => f(item),
        }
    }
}

impl fmt::Debug for PropertyAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyAccessor::Id(_) => f.write_str("PropertyAccessor::Id"),
            PropertyAccessor::Attribute(_) => f.write_str("PropertyAccessor::Attribute"),
        }
    }
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// One exposed attribute: its wire name and accessor.
#[derive(Clone)]
pub struct AttributeDescriptor {
    name: String,
    accessor: Arc<ValueFn>,
}

impl AttributeDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The attribute's JSON value on `item`, before any converter runs.
    pub fn value_of(&self, item: &dyn Any) -> Value {
        (self.accessor)(item)
    }
}

impl fmt::Debug for AttributeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Cardinality of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipKind {
    ToOne,
    ToMany,
}

/// Whether related resources are inlined into `included`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Inclusion {
    /// Targets are serialized in full and added to `included` once each.
    #[default]
    Eager,
    /// Only identifiers and links are emitted.
    LinkageOnly,
}

/// One declared relationship.
///
/// The target descriptor is resolved lazily through the registry; see
/// [`RelationshipDescriptor::related`].
#[derive(Clone)]
pub struct RelationshipDescriptor {
    name: String,
    kind: RelationshipKind,
    inclusion: Inclusion,
    related_type: TypeId,
    related_rust_type: &'static str,
    resolve: ResolveFn,
    accessor: Arc<RelatedFn>,
}

impl RelationshipDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> RelationshipKind {
        self.kind
    }

    pub fn is_collection(&self) -> bool {
        self.kind == RelationshipKind::ToMany
    }

    pub fn inclusion(&self) -> Inclusion {
        self.inclusion
    }

    /// `TypeId` of the target domain type.
    pub fn related_type(&self) -> TypeId {
        self.related_type
    }

    /// Resolve the target descriptor through `registry`, building it on
    /// first use.
    pub fn related(&self, registry: &SchemaRegistry) -> Result<Arc<ResourceDescriptor>, SchemaError> {
        (self.resolve)(registry)
    }

    /// The related objects reachable from `item`; empty for an absent
    /// to-one target.
    pub fn related_objects<'a>(&self, item: &'a dyn Any) -> Vec<&'a dyn Any> {
        (self.accessor)(item)
    }
}

impl fmt::Debug for RelationshipDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationshipDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("inclusion", &self.inclusion)
            .field("related", &self.related_rust_type)
            .finish_non_exhaustive()
    }
}

/// The immutable wire schema of one domain type.
///
/// Built once per type by [`SchemaRegistry::describe`] and shared behind an
/// `Arc` for the rest of the process.
pub struct ResourceDescriptor {
    type_name: String,
    url_path: String,
    rust_type: &'static str,
    id: Arc<IdFn>,
    attributes: Vec<AttributeDescriptor>,
    relationships: Vec<RelationshipDescriptor>,
}

impl ResourceDescriptor {
    /// The JSON:API `type` member.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Path segment used by URL path builders, e.g. `people`.
    pub fn url_path(&self) -> &str {
        &self.url_path
    }

    /// `std::any::type_name` of the described Rust type.
    pub fn rust_type(&self) -> &'static str {
        self.rust_type
    }

    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    pub fn relationships(&self) -> &[RelationshipDescriptor] {
        &self.relationships
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipDescriptor> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// The identifier of `item`. `None` only if `item` is not an instance
    /// of the described type.
    pub fn id_of(&self, item: &dyn Any) -> Option<String> {
        (self.id)(item)
    }

    /// Accessor for `id` or an attribute name; `None` for anything else.
    pub fn property(&self, name: &str) -> Option<PropertyAccessor> {
        if name == "id" {
            return Some(PropertyAccessor::Id(Arc::clone(&self.id)));
        }
        self.attribute(name)
            .map(|a| PropertyAccessor::Attribute(Arc::clone(&a.accessor)))
    }

    pub fn id_accessor(&self) -> PropertyAccessor {
        PropertyAccessor::Id(Arc::clone(&self.id))
    }
}

impl fmt::Debug for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("type_name", &self.type_name)
            .field("url_path", &self.url_path)
            .field("rust_type", &self.rust_type)
            .field("attributes", &self.attributes)
            .field("relationships", &self.relationships)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Typed declaration surface handed to [`Resource::describe`].
pub struct ResourceBuilder<T> {
    type_name: Option<String>,
    url_path: Option<String>,
    id: Option<Arc<IdFn>>,
    attributes: Vec<AttributeDescriptor>,
    relationships: Vec<RelationshipDescriptor>,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Resource> ResourceBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            type_name: None,
            url_path: None,
            id: None,
            attributes: Vec::new(),
            relationships: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// The JSON:API `type` member, e.g. `person`.
    pub fn type_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.type_name = Some(name.into());
        self
    }

    /// Path segment for generated URLs. Defaults to the type name.
    pub fn url_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.url_path = Some(path.into());
        self
    }

    /// The identifier accessor.
    pub fn id<F, I>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&T) -> I + Send + Sync + 'static,
        I: ToString,
    {
        let accessor: Arc<IdFn> = Arc::new(move |item: &dyn Any| {
            item.downcast_ref::<T>().map(|t| f(t).to_string())
        });
        self.id = Some(accessor);
        self
    }

    /// An exposed attribute. The accessor's result is converted to JSON with
    /// `serde_json`; a value that fails to serialize becomes `null`.
    pub fn attribute<F, V>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&T) -> V + Send + Sync + 'static,
        V: Serialize,
    {
        let name = name.into();
        let wire_name = name.clone();
        let accessor: Arc<ValueFn> = Arc::new(move |item: &dyn Any| {
            let Some(t) = item.downcast_ref::<T>() else {
                return Value::Null;
            };
            serde_json::to_value(f(t)).unwrap_or_else(|e| {
                tracing::warn!(attribute = %wire_name, "attribute failed to serialize: {e}");
                Value::Null
            })
        });
        self.attributes.push(AttributeDescriptor { name, accessor });
        self
    }

    /// A to-one relationship. Returns a handle to adjust its inclusion.
    pub fn to_one<R, F>(&mut self, name: impl Into<String>, f: F) -> RelationshipOptions<'_>
    where
        R: Resource,
        F: for<'a> Fn(&'a T) -> Option<&'a R> + Send + Sync + 'static,
    {
        let accessor = erase_related(move |item| match item.downcast_ref::<T>() {
            Some(t) => f(t).into_iter().map(|r| r as &dyn Any).collect(),
            None => Vec::new(),
        });
        self.push_relationship::<R>(name.into(), RelationshipKind::ToOne, accessor)
    }

    /// A to-many relationship. Returns a handle to adjust its inclusion.
    pub fn to_many<R, F>(&mut self, name: impl Into<String>, f: F) -> RelationshipOptions<'_>
    where
        R: Resource,
        F: for<'a> Fn(&'a T) -> Vec<&'a R> + Send + Sync + 'static,
    {
        let accessor = erase_related(move |item| match item.downcast_ref::<T>() {
            Some(t) => f(t).into_iter().map(|r| r as &dyn Any).collect(),
            None => Vec::new(),
        });
        self.push_relationship::<R>(name.into(), RelationshipKind::ToMany, accessor)
    }

    fn push_relationship<R: Resource>(
        &mut self,
        name: String,
        kind: RelationshipKind,
        accessor: Arc<RelatedFn>,
    ) -> RelationshipOptions<'_> {
        self.relationships.push(RelationshipDescriptor {
            name,
            kind,
            inclusion: Inclusion::default(),
            related_type: TypeId::of::<R>(),
            related_rust_type: std::any::type_name::<R>(),
            resolve: SchemaRegistry::describe::<R>,
            accessor,
        });
        let index = self.relationships.len() - 1;
        RelationshipOptions {
            relationship: &mut self.relationships[index],
        }
    }

    /// Validate the declaration and freeze it into a descriptor.
    pub(crate) fn build(self) -> Result<ResourceDescriptor, SchemaError> {
        let rust_type = std::any::type_name::<T>();
        let type_name = self
            .type_name
            .filter(|n| !n.trim().is_empty())
            .ok_or(SchemaError::MissingTypeName { rust_type })?;
        let id = self.id.ok_or_else(|| SchemaError::MissingId {
            resource: type_name.clone(),
        })?;

        let mut seen = HashSet::new();
        let names = self
            .attributes
            .iter()
            .map(|a| a.name.as_str())
            .chain(self.relationships.iter().map(|r| r.name.as_str()));
        for name in names {
            if RESERVED_NAMES.contains(&name) {
                return Err(SchemaError::ReservedName {
                    resource: type_name,
                    name: name.to_string(),
                });
            }
            if !seen.insert(name) {
                return Err(SchemaError::DuplicateName {
                    resource: type_name,
                    name: name.to_string(),
                });
            }
        }

        let url_path = self
            .url_path
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| type_name.clone());

        Ok(ResourceDescriptor {
            type_name,
            url_path,
            rust_type,
            id,
            attributes: self.attributes,
            relationships: self.relationships,
        })
    }
}

/// Returned by [`ResourceBuilder::to_one`] and [`ResourceBuilder::to_many`].
pub struct RelationshipOptions<'b> {
    relationship: &'b mut RelationshipDescriptor,
}

impl RelationshipOptions<'_> {
    /// Emit identifiers and links only; never inline targets in `included`.
    pub fn linkage_only(self) {
        self.relationship.inclusion = Inclusion::LinkageOnly;
    }
}

// --- tests -------------------------------------------------------------------
