//! Process-wide cache of resource descriptors.
//!
//! # Lifecycle
//!
//! Descriptors are built on first request for a type and never change or
//! leave the cache afterwards. Population is safe to race: the declaration
//! is built outside the lock (user code never runs while the lock is held),
//! then inserted only if no other thread got there first. The loser's copy
//! is discarded and every caller receives the same `Arc`.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use crate::schema::{Resource, ResourceBuilder, ResourceDescriptor, SchemaError};

static GLOBAL: LazyLock<Arc<SchemaRegistry>> = LazyLock::new(|| Arc::new(SchemaRegistry::new()));

/// A write-once cache of [`ResourceDescriptor`]s keyed by type identity.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    descriptors: RwLock<HashMap<TypeId, Arc<ResourceDescriptor>>>,
}

impl SchemaRegistry {
    /// An empty registry. Most callers want [`SchemaRegistry::global`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every serializer that is not given its own.
    pub fn global() -> Arc<SchemaRegistry> {
        Arc::clone(&GLOBAL)
    }

    /// The descriptor for `T`, building and caching it on first use.
    ///
    /// A declaration that fails validation is not cached; every call
    /// reports the same [`SchemaError`].
    pub fn describe<T: Resource>(&self) -> Result<Arc<ResourceDescriptor>, SchemaError> {
        let key = TypeId::of::<T>();
        if let Some(existing) = self.read().get(&key) {
            return Ok(Arc::clone(existing));
        }

        let mut builder = ResourceBuilder::<T>::new();
        T::describe(&mut builder);
        let built = Arc::new(builder.build()?);

        let mut descriptors = self
            .descriptors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let stored = descriptors.entry(key).or_insert_with(|| Arc::clone(&built));
        if Arc::ptr_eq(stored, &built) {
            tracing::debug!(
                resource = %built.type_name(),
                rust_type = built.rust_type(),
                "built resource descriptor"
            );
        } else {
            tracing::trace!(
                resource = %built.type_name(),
                "discarding descriptor built concurrently"
            );
        }
        Ok(Arc::clone(stored))
    }

    /// The descriptor for `T` after resolving every descriptor reachable
    /// through its relationships.
    ///
    /// Surfaces schema errors anywhere in the graph before a document is
    /// produced. Cycles are followed once.
    pub fn describe_graph<T: Resource>(&self) -> Result<Arc<ResourceDescriptor>, SchemaError> {
        let root = self.describe::<T>()?;
        let mut visited = HashSet::from([TypeId::of::<T>()]);
        let mut pending = vec![Arc::clone(&root)];

        while let Some(descriptor) = pending.pop() {
            for relationship in descriptor.relationships() {
                if !visited.insert(relationship.related_type()) {
                    continue;
                }
                let related = relationship.related(self).map_err(|e| {
                    SchemaError::UnresolvedRelationship {
                        resource: descriptor.type_name().to_string(),
                        relationship: relationship.name().to_string(),
                        source: Box::new(e),
                    }
                })?;
                pending.push(related);
            }
        }
        Ok(root)
    }

    /// `true` if a descriptor for `T` has already been built.
    pub fn contains<T: Resource>(&self) -> bool {
        self.read().contains_key(&TypeId::of::<T>())
    }

    /// Number of cached descriptors.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // Only complete descriptors are ever inserted, so a poisoned lock still
    // guards a consistent map.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<TypeId, Arc<ResourceDescriptor>>> {
        self.descriptors.read().unwrap_or_else(PoisonError::into_inner)
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ResourceBuilder;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    struct Author {
        name: String,
        books: Vec<Book>,
    }

    struct Book {
        isbn: String,
        author: Option<Box<Author>>,
    }

    impl Resource for Author {
        fn describe(r: &mut ResourceBuilder<Self>) {
            r.type_name("author").url_path("authors").id(|a| a.name.clone());
            r.to_many("books", |a| a.books.iter().collect());
        }
    }

    impl Resource for Book {
        fn describe(r: &mut ResourceBuilder<Self>) {
            r.type_name("book").url_path("books").id(|b| b.isbn.clone());
            r.to_one("author", |b| b.author.as_deref());
        }
    }

    #[test]
    fn describe_is_memoized() {
        let registry = SchemaRegistry::new();
        let a = registry.describe::<Author>().unwrap();
        let b = registry.describe::<Author>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn relationship_targets_resolve_lazily() {
        let registry = SchemaRegistry::new();
        let author = registry.describe::<Author>().unwrap();
        assert!(!registry.contains::<Book>());

        let book = author.relationship("books").unwrap().related(&registry).unwrap();
        assert_eq!(book.type_name(), "book");
        assert!(registry.contains::<Book>());

        let back = book.relationship("author").unwrap().related(&registry).unwrap();
        assert!(Arc::ptr_eq(&back, &author));
    }

    #[test]
    fn describe_graph_follows_cycles_once() {
        let registry = SchemaRegistry::new();
        let root = registry.describe_graph::<Book>().unwrap();
        assert_eq!(root.type_name(), "book");
        assert_eq!(registry.len(), 2);
    }

    static BUILDS: AtomicUsize = AtomicUsize::new(0);

    struct Counted;
    impl Resource for Counted {
        fn describe(r: &mut ResourceBuilder<Self>) {
            BUILDS.fetch_add(1, Ordering::SeqCst);
            r.type_name("counted").id(|_| "1");
        }
    }

    #[test]
    fn concurrent_population_yields_one_descriptor() {
        let registry = Arc::new(SchemaRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.describe::<Counted>().unwrap())
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for d in &results[1..] {
            assert!(Arc::ptr_eq(d, &results[0]));
        }
        assert_eq!(registry.len(), 1);
        assert!(BUILDS.load(Ordering::SeqCst) >= 1);
    }

    struct Broken;
    impl Resource for Broken {
        fn describe(r: &mut ResourceBuilder<Self>) {
            r.id(|_| "1");
        }
    }

    struct PointsAtBroken {
        target: Broken,
    }
    impl Resource for PointsAtBroken {
        fn describe(r: &mut ResourceBuilder<Self>) {
            r.type_name("pointer").id(|_| "1");
            r.to_one("target", |p| Some(&p.target));
        }
    }

    #[test]
    fn unresolvable_target_is_a_schema_error() {
        let registry = SchemaRegistry::new();
        // The owning descriptor itself is fine...
        assert!(registry.describe::<PointsAtBroken>().is_ok());
        // ...but resolving the graph is not.
        let err = registry.describe_graph::<PointsAtBroken>().unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnresolvedRelationship { ref relationship, .. } if relationship == "target"
        ));
        assert!(!registry.contains::<Broken>());
    }
}
