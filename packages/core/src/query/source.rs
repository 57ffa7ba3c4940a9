//! Collection sources the interpreter can apply a query to.
//!
//! A [`Source`] is either a materialized sequence, which the interpreter
//! sorts and slices in memory, or a [`DeferredQuery`], which receives the
//! same operations as native deferred calls and only evaluates them when
//! executed. Both produce the same items in the same order.

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;

use serde_json::Value;

use crate::query::ordering::{compare_values, render_value};
use crate::query::SortDirection;
use crate::schema::PropertyAccessor;

/// One ordering term: a property name, its direction, and the compiled
/// accessor that reads it.
///
/// Backing stores that translate queries use `property`; in-memory
/// evaluation uses [`sort_by_terms`].
#[derive(Debug, Clone)]
pub struct OrderExpr {
    pub property: String,
    pub direction: SortDirection,
    accessor: PropertyAccessor,
}

impl OrderExpr {
    pub fn new(property: impl Into<String>, direction: SortDirection, accessor: PropertyAccessor) -> Self {
        Self {
            property: property.into(),
            direction,
            accessor,
        }
    }

    /// The value `item` is ordered by under this term.
    pub fn key_of(&self, item: &dyn Any) -> Value {
        self.accessor.value_of(item)
    }

    fn compare_keys(&self, a: &Value, b: &Value) -> Ordering {
        let ordering = compare_values(a, b);
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Stable sort of `items` by `terms`, later terms breaking ties.
///
/// Each item's keys are read once up front rather than on every comparison.
pub fn sort_by_terms<T: 'static>(items: &mut Vec<T>, terms: &[OrderExpr]) {
    if terms.is_empty() {
        return;
    }
    let mut keyed: Vec<(Vec<Value>, T)> = items
        .drain(..)
        .map(|item| {
            let keys = terms.iter().map(|term| term.key_of(&item)).collect();
            (keys, item)
        })
        .collect();
    keyed.sort_by(|(a, _), (b, _)| {
        terms
            .iter()
            .zip(a.iter().zip(b))
            .map(|(term, (a, b))| term.compare_keys(a, b))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    items.extend(keyed.into_iter().map(|(_, item)| item));
}

/// An equality filter on one property.
#[derive(Debug, Clone)]
pub struct FilterExpr {
    pub property: String,
    pub value: String,
    accessor: PropertyAccessor,
}

impl FilterExpr {
    pub fn new(property: impl Into<String>, value: impl Into<String>, accessor: PropertyAccessor) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            accessor,
        }
    }

    /// `true` if the property's rendered value equals the filter value.
    pub fn matches(&self, item: &dyn Any) -> bool {
        render_value(&self.accessor.value_of(item)) == self.value
    }
}

/// A query source that accepts ordering, filtering and slicing as deferred
/// operations, typically translated into a backing store's native query.
///
/// Operations arrive in the order they must take effect: filters, then one
/// ordering, then skip, then take.
pub trait DeferredQuery<T> {
    /// `true` if results already come back in a deterministic order.
    fn is_ordered(&self) -> bool;

    fn filter(&mut self, filter: &FilterExpr);

    /// Order by `terms`, the first term being the primary key.
    fn order_by(&mut self, terms: &[OrderExpr]);

    fn skip(&mut self, count: usize);

    fn take(&mut self, count: usize);

    /// Evaluate the accumulated query.
    fn execute(self: Box<Self>) -> Vec<T>;
}

/// A collection handed to the interpreter.
pub enum Source<T> {
    /// An in-memory sequence. `ordered` marks a sequence whose order is
    /// already deterministic and must be kept when no sort is requested.
    Sequence { items: Vec<T>, ordered: bool },
    Deferred(Box<dyn DeferredQuery<T>>),
}

impl<T> Source<T> {
    /// A materialized sequence without a meaningful order.
    pub fn sequence(items: Vec<T>) -> Self {
        Source::Sequence {
            items,
            ordered: false,
        }
    }

    /// A materialized sequence whose current order is deterministic.
    pub fn ordered_sequence(items: Vec<T>) -> Self {
        Source::Sequence {
            items,
            ordered: true,
        }
    }

    pub fn deferred(query: impl DeferredQuery<T> + 'static) -> Self {
        Source::Deferred(Box::new(query))
    }

    pub fn is_ordered(&self) -> bool {
        match self {
            Source::Sequence { ordered, .. } => *ordered,
            Source::Deferred(query) => query.is_ordered(),
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Source::Deferred(_))
    }
}

impl<T> From<Vec<T>> for Source<T> {
    fn from(items: Vec<T>) -> Self {
        Source::sequence(items)
    }
}

impl<T: 'static> From<LazyQuery<T>> for Source<T> {
    fn from(query: LazyQuery<T>) -> Self {
        Source::deferred(query)
    }
}

impl<T> fmt::Debug for Source<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Sequence { items, ordered } => f
                .debug_struct("Sequence")
                .field("len", &items.len())
                .field("ordered", ordered)
                .finish(),
            Source::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

// ---------------------------------------------------------------------------
// LazyQuery
// ---------------------------------------------------------------------------

/// A recorded deferred operation.
#[derive(Debug, Clone)]
pub enum QueryOp {
    Filter(FilterExpr),
    OrderBy(Vec<OrderExpr>),
    Skip(usize),
    Take(usize),
}

/// An in-memory [`DeferredQuery`]: records operations and evaluates them
/// in order only when executed.
#[derive(Debug)]
pub struct LazyQuery<T> {
    items: Vec<T>,
    ordered: bool,
    plan: Vec<QueryOp>,
}

impl<T> LazyQuery<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            ordered: false,
            plan: Vec::new(),
        }
    }

    /// A query over items whose current order is deterministic.
    pub fn ordered(items: Vec<T>) -> Self {
        Self {
            ordered: true,
            ..Self::new(items)
        }
    }

    /// Operations recorded so far.
    pub fn plan(&self) -> &[QueryOp] {
        &self.plan
    }
}

impl<T: 'static> DeferredQuery<T> for LazyQuery<T> {
    fn is_ordered(&self) -> bool {
        self.ordered || self.plan.iter().any(|op| matches!(op, QueryOp::OrderBy(_)))
    }

    fn filter(&mut self, filter: &FilterExpr) {
        self.plan.push(QueryOp::Filter(filter.clone()));
    }

    fn order_by(&mut self, terms: &[OrderExpr]) {
        self.plan.push(QueryOp::OrderBy(terms.to_vec()));
    }

    fn skip(&mut self, count: usize) {
        self.plan.push(QueryOp::Skip(count));
    }

    fn take(&mut self, count: usize) {
        self.plan.push(QueryOp::Take(count));
    }

    fn execute(self: Box<Self>) -> Vec<T> {
        let LazyQuery { mut items, plan, .. } = *self;
        for op in plan {
            match op {
                QueryOp::Filter(filter) => items.retain(|item| filter.matches(item)),
                QueryOp::OrderBy(terms) => sort_by_terms(&mut items, &terms),
                QueryOp::Skip(count) => {
                    items.drain(..count.min(items.len()));
                }
                QueryOp::Take(count) => items.truncate(count),
            }
        }
        items
    }
}

// --- tests -------------------------------------------------------------------
