//! Applies a [`QueryContext`] to a [`Source`].
//!
//! # Ordering rules
//!
//! | Sort requested | Paginating | Source ordered | Applied ordering |
//! |----------------|------------|----------------|------------------|
//! | yes | any | any | requested keys, then `id` ascending unless `id` is a key |
//! | no | yes | no | `id` ascending |
//! | no | yes | yes | none (source order kept) |
//! | no | no | any | none |
//!
//! Paging an unordered source would make page boundaries arbitrary, so a
//! stable order is forced before skip/take. Ordering is stable, so equal
//! keys keep their source order.

use crate::query::source::{sort_by_terms, FilterExpr, OrderExpr, Source};
use crate::query::{QueryContext, QueryError, SortDirection};
use crate::schema::{Resource, ResourceDescriptor};

/// Applies one request's query to sources of one resource type.
#[derive(Debug, Clone, Copy)]
pub struct QueryInterpreter<'q> {
    context: &'q QueryContext,
    descriptor: &'q ResourceDescriptor,
}

impl<'q> QueryInterpreter<'q> {
    pub fn new(context: &'q QueryContext, descriptor: &'q ResourceDescriptor) -> Self {
        Self {
            context,
            descriptor,
        }
    }

    /// The ordering terms to apply to a source whose ordered-ness is
    /// `source_ordered`. Empty means "keep the source order".
    pub fn ordering(&self, source_ordered: bool) -> Result<Vec<OrderExpr>, QueryError> {
        let keys = self.context.sort();
        if keys.is_empty() {
            if self.context.is_paginated() && !source_ordered {
                return Ok(vec![self.id_ascending()]);
            }
            return Ok(Vec::new());
        }

        let mut terms = Vec::with_capacity(keys.len() + 1);
        for key in keys {
            let accessor = self.descriptor.property(&key.property).ok_or_else(|| {
                QueryError::UnknownSortKey {
                    resource: self.descriptor.type_name().to_string(),
                    key: key.property.clone(),
                }
            })?;
            terms.push(OrderExpr::new(key.property.clone(), key.direction, accessor));
        }
        if !keys.iter().any(|k| k.property == "id") {
            terms.push(self.id_ascending());
        }
        Ok(terms)
    }

    /// The filter expressions to apply, in request order.
    pub fn filters(&self) -> Result<Vec<FilterExpr>, QueryError> {
        self.context
            .filters()
            .iter()
            .map(|clause| {
                let accessor = self.descriptor.property(&clause.property).ok_or_else(|| {
                    QueryError::UnknownFilterProperty {
                        resource: self.descriptor.type_name().to_string(),
                        property: clause.property.clone(),
                    }
                })?;
                Ok(FilterExpr::new(
                    clause.property.clone(),
                    clause.value.clone(),
                    accessor,
                ))
            })
            .collect()
    }

    /// Filter, order and slice `source`, then materialize the result.
    ///
    /// Deferred sources receive every operation as a deferred call, in
    /// the order filter, order, skip, take, and are executed once.
    pub fn apply<T: Resource>(&self, source: Source<T>) -> Result<Vec<T>, QueryError> {
        let filters = self.filters()?;
        let ordering = self.ordering(source.is_ordered())?;
        let window = self.context.window();

        match source {
            Source::Sequence { mut items, .. } => {
                tracing::debug!(
                    resource = %self.descriptor.type_name(),
                    strategy = "in-memory",
                    items = items.len(),
                    filters = filters.len(),
                    order_terms = ordering.len(),
                    ?window,
                    "applying query"
                );
                if !filters.is_empty() {
                    items.retain(|item| filters.iter().all(|f| f.matches(item)));
                }
                sort_by_terms(&mut items, &ordering);
                if let Some((skip, take)) = window {
                    items = items.into_iter().skip(skip).take(take).collect();
                }
                Ok(items)
            }
            Source::Deferred(mut query) => {
                tracing::debug!(
                    resource = %self.descriptor.type_name(),
                    strategy = "deferred",
                    filters = filters.len(),
                    order_terms = ordering.len(),
                    ?window,
                    "applying query"
                );
                for filter in &filters {
                    query.filter(filter);
                }
                if !ordering.is_empty() {
                    query.order_by(&ordering);
                }
                if let Some((skip, take)) = window {
                    query.skip(skip);
                    query.take(take);
                }
                Ok(query.execute())
            }
        }
    }

    fn id_ascending(&self) -> OrderExpr {
        OrderExpr::new("id", SortDirection::Ascending, self.descriptor.id_accessor())
    }
}

// --- tests -------------------------------------------------------------------
