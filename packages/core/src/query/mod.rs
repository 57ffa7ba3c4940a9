//! Client query interpretation: sorting, filtering and pagination.
//!
//! A [`QueryContext`] is parsed once per request from raw [`QueryParams`]
//! and the serializer options, then handed to a [`QueryInterpreter`] which
//! applies it to a [`Source`] of domain objects.
//!
//! Invalid input fails fast with a [`QueryError`] instead of silently
//! falling back to defaults.

pub mod interpreter;
pub mod ordering;
pub mod source;

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use graphdoc_document::error::codes;
use graphdoc_document::QueryParams;
use regex::Regex;
use thiserror::Error;

use crate::options::SerializerOptions;
use crate::schema::ResourceDescriptor;

pub use interpreter::QueryInterpreter;
pub use source::{DeferredQuery, FilterExpr, LazyQuery, OrderExpr, QueryOp, Source};

/// Errors raised while interpreting a client query. These are the client's
/// fault and become `400` error documents.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("query parameter `{name}` has invalid value {value:?}: {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: &'static str,
    },

    #[error("resource `{resource}` has no property `{key}` to sort by")]
    UnknownSortKey { resource: String, key: String },

    #[error("resource `{resource}` has no property `{property}` to filter on")]
    UnknownFilterProperty { resource: String, property: String },
}

impl QueryError {
    /// The machine-readable code reported in the error document.
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::InvalidParameter { .. } => codes::INVALID_PARAMETER,
            QueryError::UnknownSortKey { .. } => codes::INVALID_SORT,
            QueryError::UnknownFilterProperty { .. } => codes::INVALID_FILTER,
        }
    }

    /// Short summary used as the error object's title.
    pub fn title(&self) -> &'static str {
        match self {
            QueryError::InvalidParameter { .. } => "invalid query parameter",
            QueryError::UnknownSortKey { .. } => "unknown sort key",
            QueryError::UnknownFilterProperty { .. } => "unknown filter property",
        }
    }
}

/// Direction of one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// One `[+|-]property` entry of the `sort` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub property: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn ascending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: SortDirection::Descending,
        }
    }

    pub fn is_descending(&self) -> bool {
        self.direction == SortDirection::Descending
    }
}

/// Formats the key in `sort` parameter syntax, e.g. `-age`.
impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            SortDirection::Ascending => write!(f, "+{}", self.property),
            SortDirection::Descending => write!(f, "-{}", self.property),
        }
    }
}

/// One `filter[property]=value` equality clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterClause {
    pub property: String,
    pub value: String,
}

/// The immutable per-request query: page window, sort keys, filters and
/// sparse fieldsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryContext {
    page: usize,
    per_page: usize,
    paginate: bool,
    sort: Vec<SortKey>,
    filters: Vec<FilterClause>,
    fields: HashMap<String, Vec<String>>,
}

impl Default for QueryContext {
    fn default() -> Self {
        Self {
            page: 0,
            per_page: SerializerOptions::DEFAULT_ITEMS_PER_PAGE,
            paginate: false,
            sort: Vec::new(),
            filters: Vec::new(),
            fields: HashMap::new(),
        }
    }
}

impl QueryContext {
    /// A context that neither paginates, sorts, nor filters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request page `page` (zero-based) of `per_page` items. A `per_page`
    /// of zero is raised to one.
    pub fn paginated(mut self, page: usize, per_page: usize) -> Self {
        self.paginate = true;
        self.page = page;
        self.per_page = per_page.max(1);
        self
    }

    pub fn sorted_by(mut self, keys: impl IntoIterator<Item = SortKey>) -> Self {
        self.sort = keys.into_iter().collect();
        self
    }

    pub fn filtered_by(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(FilterClause {
            property: property.into(),
            value: value.into(),
        });
        self
    }

    /// Build the context for one request.
    ///
    /// `page` and `per_page` are read whenever `options.paginate` is set.
    /// Sort, filter and sparse fieldset parameters are ignored unless
    /// `options.allow_user_query` is set, and their properties are checked
    /// against `descriptor`.
    pub fn from_params(
        params: &QueryParams,
        options: &SerializerOptions,
        descriptor: &ResourceDescriptor,
    ) -> Result<Self, QueryError> {
        let mut context = Self {
            per_page: options.items_per_page.max(1),
            paginate: options.paginate,
            ..Self::default()
        };
        // Paging links point back here with `page` rewritten, so the page
        // is read whenever pagination is on.
        if options.paginate {
            if let Some(raw) = &params.page {
                context.page = parse_count("page", raw, 0)?;
            }
            if let Some(raw) = &params.per_page {
                context.per_page = parse_count("per_page", raw, 1)?;
            }
        }

        if !options.allow_user_query {
            return Ok(context);
        }

        if let Some(raw) = &params.sort {
            context.sort = parse_sort(raw, descriptor)?;
        }

        for (property, value) in &params.filters {
            check_property_name("filter", property)?;
            if descriptor.property(property).is_none() {
                return Err(QueryError::UnknownFilterProperty {
                    resource: descriptor.type_name().to_string(),
                    property: property.clone(),
                });
            }
            context.filters.push(FilterClause {
                property: property.clone(),
                value: value.clone(),
            });
        }

        for (type_name, list) in &params.fields {
            let mut names = Vec::new();
            for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                check_property_name("fields", name)?;
                names.push(name.to_string());
            }
            context.fields.insert(type_name.clone(), names);
        }

        Ok(context)
    }

    /// Zero-based page number.
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    pub fn is_paginated(&self) -> bool {
        self.paginate
    }

    pub fn sort(&self) -> &[SortKey] {
        &self.sort
    }

    pub fn filters(&self) -> &[FilterClause] {
        &self.filters
    }

    /// `(skip, take)` when paginating. Skip saturates instead of overflowing.
    pub fn window(&self) -> Option<(usize, usize)> {
        self.paginate
            .then(|| (self.page.saturating_mul(self.per_page), self.per_page))
    }

    /// Whether member `name` of resources of `type_name` should be emitted
    /// under the requested sparse fieldsets.
    pub fn includes_field(&self, type_name: &str, name: &str) -> bool {
        self.fields
            .get(type_name)
            .map_or(true, |names| names.iter().any(|n| n == name))
    }
}

// --- helpers -----------------------------------------------------------------

/// `^[A-Za-z_][A-Za-z0-9_-]*$`
static PROPERTY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_\-]*$").expect("invalid property name regex")
});

fn check_property_name(parameter: &str, name: &str) -> Result<(), QueryError> {
    if PROPERTY_RE.is_match(name) {
        Ok(())
    } else {
        Err(QueryError::InvalidParameter {
            name: parameter.to_string(),
            value: name.to_string(),
            reason: "not a valid property name",
        })
    }
}

fn parse_count(name: &str, raw: &str, min: usize) -> Result<usize, QueryError> {
    let invalid = |reason| QueryError::InvalidParameter {
        name: name.to_string(),
        value: raw.to_string(),
        reason,
    };
    let n: usize = raw
        .trim()
        .parse()
        .map_err(|_| invalid("expected a non-negative integer"))?;
    if n < min {
        return Err(invalid("value is below the minimum"));
    }
    Ok(n)
}

/// Parse `+age,-id`. A leading space is accepted as `+`, since form
/// decoders turn a literal `+` into a space.
fn parse_sort(raw: &str, descriptor: &ResourceDescriptor) -> Result<Vec<SortKey>, QueryError> {
    let mut keys = Vec::new();
    for segment in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let key = match segment.strip_prefix('-') {
            Some(property) => SortKey::descending(property.trim()),
            None => SortKey::ascending(segment.trim_start_matches('+').trim()),
        };
        check_property_name("sort", &key.property)?;
        if descriptor.property(&key.property).is_none() {
            return Err(QueryError::UnknownSortKey {
                resource: descriptor.type_name().to_string(),
                key: key.property,
            });
        }
        keys.push(key);
    }
    Ok(keys)
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
        age: u32,
    }

    impl Resource for Person {
        fn describe(r: &mut ResourceBuilder<Self>) {
            r.type_name("person").id(|p| p.id.clone());
            r.attribute("age", |p| p.age);
            r.attribute("first-name", |_| "Ada");
        }
    }

    fn descriptor() -> Arc<ResourceDescriptor> {
        SchemaRegistry::new().describe::<Person>().unwrap()
    }

    fn open_options() -> SerializerOptions {
        SerializerOptions {
            paginate: true,
            items_per_page: 5,
            allow_user_query: true,
        }
    }

    fn parse(query: &str, options: &SerializerOptions) -> Result<QueryContext, QueryError> {
        QueryContext::from_params(&QueryParams::from_query_string(query), options, &descriptor())
    }

    #[test]
    fn parses_sort_keys_in_order() {
        let ctx = parse("sort=+age,-id", &open_options()).unwrap();
        assert_eq!(
            ctx.sort(),
            &[SortKey::ascending("age"), SortKey::descending("id")]
        );
    }

    #[test]
    fn space_prefix_counts_as_ascending() {
        let ctx = parse("sort=%20age, -first-name,", &open_options()).unwrap();
        assert_eq!(
            ctx.sort(),
            &[SortKey::ascending("age"), SortKey::descending("first-name")]
        );
    }

    #[test]
    fn unknown_sort_key_fails() {
        let err = parse("sort=-height", &open_options()).unwrap_err();
        assert_eq!(
            err,
            QueryError::UnknownSortKey {
                resource: "person".into(),
                key: "height".into()
            }
        );
        assert_eq!(err.code(), codes::INVALID_SORT);
    }

    #[test]
    fn malformed_sort_key_fails() {
        let err = parse("sort=ag$e", &open_options()).unwrap_err();
        assert!(matches!(err, QueryError::InvalidParameter { .. }));
    }

    #[test]
    fn non_numeric_page_fails() {
        let err = parse("page=two", &open_options()).unwrap_err();
        assert!(matches!(err, QueryError::InvalidParameter { ref name, .. } if name == "page"));
        assert!(matches!(
            parse("per_page=0", &open_options()),
            Err(QueryError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn page_window_uses_request_values() {
        let ctx = parse("page=3&per_page=7", &open_options()).unwrap();
        assert_eq!(ctx.page(), 3);
        assert_eq!(ctx.per_page(), 7);
        assert_eq!(ctx.window(), Some((21, 7)));
    }

    #[test]
    fn defaults_come_from_options() {
        let ctx = parse("", &open_options()).unwrap();
        assert_eq!(ctx.page(), 0);
        assert_eq!(ctx.per_page(), 5);
        assert!(ctx.is_paginated());
        assert!(ctx.sort().is_empty());
    }

    #[test]
    fn client_query_ignored_when_not_allowed() {
        let options = SerializerOptions {
            allow_user_query: false,
            ..open_options()
        };
        // Invalid sort and filter input is ignored entirely.
        let ctx = parse("page=2&sort=-height&filter[nope]=1&fields[person]=age", &options).unwrap();
        assert_eq!(ctx.window(), Some((10, 5)));
        assert!(ctx.sort().is_empty());
        assert!(ctx.filters().is_empty());
        assert!(ctx.includes_field("person", "first-name"));
    }

    #[test]
    fn page_read_without_client_query() {
        let options = SerializerOptions::paginated(5);
        let ctx = parse("page=3&per_page=4", &options).unwrap();
        assert_eq!(ctx.window(), Some((12, 4)));
        assert!(matches!(
            parse("page=x", &options),
            Err(QueryError::InvalidParameter { ref name, .. }) if name == "page"
        ));
    }

    #[test]
    fn page_ignored_without_pagination() {
        let options = SerializerOptions {
            paginate: false,
            ..open_options()
        };
        let ctx = parse("page=oops&sort=age", &options).unwrap();
        assert_eq!(ctx.window(), None);
        assert_eq!(ctx.sort(), &[SortKey::ascending("age")]);
    }

    #[test]
    fn filters_are_checked_against_the_descriptor() {
        let ctx = parse("filter[age]=30", &open_options()).unwrap();
        assert_eq!(ctx.filters().len(), 1);
        assert!(matches!(
            parse("filter[height]=3", &open_options()),
            Err(QueryError::UnknownFilterProperty { .. })
        ));
    }

    #[test]
    fn sparse_fieldsets() {
        let ctx = parse("fields[person]=age", &open_options()).unwrap();
        assert!(ctx.includes_field("person", "age"));
        assert!(!ctx.includes_field("person", "first-name"));
        assert!(ctx.includes_field("company", "name"));
    }

    #[test]
    fn saturating_window() {
        let ctx = QueryContext::new().paginated(usize::MAX, 10);
        assert_eq!(ctx.window(), Some((usize::MAX, 10)));
    }

    #[test]
    fn sort_key_display() {
        assert_eq!(SortKey::descending("age").to_string(), "-age");
        assert_eq!(SortKey::ascending("id").to_string(), "+id");
    }
}
