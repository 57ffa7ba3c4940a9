//! Walks domain objects through their descriptors into resource objects.
//!
//! Inclusion is one level deep: relationships of primary resources add their
//! targets to `included`, relationships of included resources only carry
//! linkage. A resource that is part of primary data is never repeated in
//! `included`, and every other resource appears there at most once.

use std::any::Any;
use std::collections::HashSet;

use graphdoc_document::{
    Linkage, RelationshipLinks, RelationshipObject, ResourceIdentifier, ResourceLinks,
    ResourceObject,
};

use crate::convert::{AttributeTarget, ConverterChain};
use crate::paths::UrlPathBuilder;
use crate::query::QueryContext;
use crate::registry::SchemaRegistry;
use crate::schema::{Inclusion, RelationshipKind, ResourceDescriptor};
use crate::serialize::url::RequestUrl;
use crate::serialize::SerializeError;

pub(crate) struct GraphWalker<'s> {
    registry: &'s SchemaRegistry,
    paths: &'s dyn UrlPathBuilder,
    converters: &'s ConverterChain,
    context: &'s QueryContext,
    url: &'s RequestUrl<'s>,
    primary: HashSet<ResourceIdentifier>,
    seen: HashSet<ResourceIdentifier>,
    included: Vec<ResourceObject>,
}

impl<'s> GraphWalker<'s> {
    pub(crate) fn new(
        registry: &'s SchemaRegistry,
        paths: &'s dyn UrlPathBuilder,
        converters: &'s ConverterChain,
        context: &'s QueryContext,
        url: &'s RequestUrl<'s>,
    ) -> Self {
        Self {
            registry,
            paths,
            converters,
            context,
            url,
            primary: HashSet::new(),
            seen: HashSet::new(),
            included: Vec::new(),
        }
    }

    /// Serialize one object as primary data.
    pub(crate) fn single(
        &mut self,
        descriptor: &ResourceDescriptor,
        item: &dyn Any,
    ) -> Result<ResourceObject, SerializeError> {
        let id = identify(descriptor, item)?;
        self.primary
            .insert(ResourceIdentifier::new(descriptor.type_name(), id));
        self.resource(descriptor, item, true)
    }

    /// Serialize `items` as primary data, collecting related resources.
    ///
    /// Every primary identifier is recorded before any relationship is
    /// walked, so a primary resource referenced by an earlier one is not
    /// pulled into `included`.
    pub(crate) fn collection(
        &mut self,
        descriptor: &ResourceDescriptor,
        items: &[&dyn Any],
    ) -> Result<Vec<ResourceObject>, SerializeError> {
        for item in items {
            let id = identify(descriptor, *item)?;
            self.primary
                .insert(ResourceIdentifier::new(descriptor.type_name(), id));
        }
        items
            .iter()
            .map(|item| self.resource(descriptor, *item, true))
            .collect()
    }

    /// Related resources gathered so far, in discovery order.
    pub(crate) fn into_included(self) -> Vec<ResourceObject> {
        self.included
    }

    fn resource(
        &mut self,
        descriptor: &ResourceDescriptor,
        item: &dyn Any,
        include_related: bool,
    ) -> Result<ResourceObject, SerializeError> {
        let type_name = descriptor.type_name();
        let id = identify(descriptor, item)?;
        let mut object = ResourceObject::new(type_name, id.clone());

        for attribute in descriptor.attributes() {
            if !self.context.includes_field(type_name, attribute.name()) {
                continue;
            }
            let target = AttributeTarget {
                resource: type_name,
                attribute: attribute.name(),
            };
            let value = self.converters.convert(&target, attribute.value_of(item));
            object.attributes.insert(attribute.name().to_string(), value);
        }

        for relationship in descriptor.relationships() {
            if !self.context.includes_field(type_name, relationship.name()) {
                continue;
            }
            let related = relationship.related(self.registry)?;
            let targets = relationship.related_objects(item);

            let mut identifiers = Vec::with_capacity(targets.len());
            for target in &targets {
                let related_id = identify(&related, *target)?;
                identifiers.push(ResourceIdentifier::new(related.type_name(), related_id));
            }

            let (data, related_id) = match relationship.kind() {
                RelationshipKind::ToOne => {
                    let first = identifiers.into_iter().next();
                    let related_id = first.as_ref().map(|i| i.id.clone());
                    (Linkage::ToOne(first), related_id)
                }
                RelationshipKind::ToMany => (Linkage::ToMany(identifiers), None),
            };

            let link = self.paths.build_relationship_path(
                descriptor,
                &id,
                relationship,
                &related,
                related_id.as_deref(),
            );
            object.relationships.insert(
                relationship.name().to_string(),
                RelationshipObject {
                    links: RelationshipLinks {
                        related: link.map(|path| self.url.absolute(&path)),
                    },
                    data,
                },
            );

            if include_related && relationship.inclusion() == Inclusion::Eager {
                for target in targets {
                    let key = ResourceIdentifier::new(related.type_name(), identify(&related, target)?);
                    if self.primary.contains(&key) || !self.seen.insert(key) {
                        continue;
                    }
                    let resource = self.resource(&related, target, false)?;
                    self.included.push(resource);
                }
            }
        }

        object.links = self
            .paths
            .build_canonical_path(descriptor, &id)
            .map(|path| ResourceLinks {
                self_link: self.url.absolute(&path),
            });
        Ok(object)
    }
}

fn identify(descriptor: &ResourceDescriptor, item: &dyn Any) -> Result<String, SerializeError> {
    descriptor
        .id_of(item)
        .ok_or_else(|| SerializeError::InvalidArgument {
            name: "payload",
            reason: format!("object is not a `{}`", descriptor.rust_type()),
        })
}
