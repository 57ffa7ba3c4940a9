//! Per-serializer options, populated directly or from environment variables.

use thiserror::Error;

/// Errors raised while reading options from the environment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{variable} must be `true` or `false`, got {value:?}")]
    InvalidBool { variable: &'static str, value: String },

    #[error("{variable} must be a positive integer, got {value:?}")]
    InvalidCount { variable: &'static str, value: String },
}

/// Options controlling how collections are shaped before serialization.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `GRAPHDOC_PAGINATE` | `false` | Paginate collections and emit paging links |
/// | `GRAPHDOC_ITEMS_PER_PAGE` | `10` | Page size when the client does not ask for one |
/// | `GRAPHDOC_ALLOW_USER_QUERY` | `false` | Honor client `page`, `per_page`, `sort`, `filter` and `fields` |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializerOptions {
    /// Apply skip/take to collections and emit `first`/`next`/`prev` links.
    pub paginate: bool,

    /// Page size used unless the client overrides it. Ignored when
    /// `paginate` is false.
    pub items_per_page: usize,

    /// When false, every client-supplied query parameter is ignored and the
    /// endpoint owner alone decides the shape of the response.
    pub allow_user_query: bool,
}

impl SerializerOptions {
    pub const DEFAULT_ITEMS_PER_PAGE: usize = 10;

    pub const PAGINATE_VAR: &'static str = "GRAPHDOC_PAGINATE";
    pub const ITEMS_PER_PAGE_VAR: &'static str = "GRAPHDOC_ITEMS_PER_PAGE";
    pub const ALLOW_USER_QUERY_VAR: &'static str = "GRAPHDOC_ALLOW_USER_QUERY";

    /// Paginated options with `items_per_page` items per page.
    pub fn paginated(items_per_page: usize) -> Self {
        Self {
            paginate: true,
            items_per_page,
            ..Self::default()
        }
    }

    pub fn with_user_query(mut self, allow: bool) -> Self {
        self.allow_user_query = allow;
        self
    }

    /// Populate options from environment variables, applying defaults where
    /// absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Populate options from `lookup`, which maps a variable name to its
    /// value. Malformed values are rejected rather than defaulted.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let paginate = match lookup(Self::PAGINATE_VAR) {
            Some(v) => parse_bool(Self::PAGINATE_VAR, &v)?,
            None => defaults.paginate,
        };
        let items_per_page = match lookup(Self::ITEMS_PER_PAGE_VAR) {
            Some(v) => parse_count(Self::ITEMS_PER_PAGE_VAR, &v)?,
            None => defaults.items_per_page,
        };
        let allow_user_query = match lookup(Self::ALLOW_USER_QUERY_VAR) {
            Some(v) => parse_bool(Self::ALLOW_USER_QUERY_VAR, &v)?,
            None => defaults.allow_user_query,
        };

        Ok(Self {
            paginate,
            items_per_page,
            allow_user_query,
        })
    }
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            paginate: false,
            items_per_page: Self::DEFAULT_ITEMS_PER_PAGE,
            allow_user_query: false,
        }
    }
}

fn parse_bool(variable: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            variable,
            value: raw.to_string(),
        }),
    }
}

fn parse_count(variable: &'static str, raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidCount {
            variable,
            value: raw.to_string(),
        }),
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let options = SerializerOptions::default();
        assert!(!options.paginate);
        assert_eq!(options.items_per_page, 10);
        assert!(!options.allow_user_query);
        assert_eq!(SerializerOptions::from_lookup(|_| None).unwrap(), options);
    }

    #[test]
    fn reads_every_variable() {
        let options = SerializerOptions::from_lookup(lookup(&[
            ("GRAPHDOC_PAGINATE", "true"),
            ("GRAPHDOC_ITEMS_PER_PAGE", " 25 "),
            ("GRAPHDOC_ALLOW_USER_QUERY", "1"),
        ]))
        .unwrap();
        assert_eq!(
            options,
            SerializerOptions::paginated(25).with_user_query(true)
        );
    }

    #[test]
    fn rejects_malformed_values() {
        assert_eq!(
            SerializerOptions::from_lookup(lookup(&[("GRAPHDOC_PAGINATE", "yes")])),
            Err(ConfigError::InvalidBool {
                variable: "GRAPHDOC_PAGINATE",
                value: "yes".into()
            })
        );
        assert!(matches!(
            SerializerOptions::from_lookup(lookup(&[("GRAPHDOC_ITEMS_PER_PAGE", "0")])),
            Err(ConfigError::InvalidCount { .. })
        ));
        assert!(matches!(
            SerializerOptions::from_lookup(lookup(&[("GRAPHDOC_ITEMS_PER_PAGE", "-3")])),
            Err(ConfigError::InvalidCount { .. })
        ));
    }
}
