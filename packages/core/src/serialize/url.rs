//! The request URL every link in a document is derived from.

use std::sync::LazyLock;

use regex::Regex;

use crate::serialize::SerializeError;

/// `scheme://authority` at the start of an absolute URL.
static ORIGIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://[^/?#\s]+").expect("invalid origin regex")
});

/// An absolute request URL split into the parts link building needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUrl<'u> {
    raw: &'u str,
    origin: &'u str,
    path: &'u str,
    query: &'u str,
}

impl<'u> RequestUrl<'u> {
    /// Parse `raw`, which must be an absolute URL such as
    /// `http://example.com/api/people?page=1`.
    pub fn parse(raw: &'u str) -> Result<Self, SerializeError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SerializeError::MissingArgument("url"));
        }
        let origin = ORIGIN_RE
            .find(trimmed)
            .ok_or_else(|| SerializeError::InvalidArgument {
                name: "url",
                reason: format!("{trimmed:?} is not an absolute URL"),
            })?
            .as_str();

        let rest = &trimmed[origin.len()..];
        let rest = rest.split('#').next().unwrap_or_default();
        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));

        Ok(Self {
            raw: trimmed,
            origin,
            path,
            query,
        })
    }

    /// The URL exactly as given, minus surrounding whitespace.
    pub fn as_str(&self) -> &'u str {
        self.raw
    }

    /// `scheme://authority`, which generated paths are joined to.
    pub fn origin(&self) -> &'u str {
        self.origin
    }

    pub fn path(&self) -> &'u str {
        self.path
    }

    /// The query component without the leading `?`.
    pub fn query(&self) -> &'u str {
        self.query
    }

    /// An absolute URL for a generated path.
    pub fn absolute(&self, path: &str) -> String {
        format!("{}{}", self.origin, path)
    }

    /// This URL with its page number set to `page`. Other parameters are
    /// kept in place; the page parameter is appended if absent.
    pub fn with_page(&self, page: usize) -> String {
        let mut pairs: Vec<String> = Vec::new();
        let mut replaced = false;
        for pair in self.query.split('&').filter(|p| !p.is_empty()) {
            let raw_key = pair.split_once('=').map_or(pair, |(k, _)| k);
            if is_page_key(raw_key) {
                if !replaced {
                    pairs.push(format!("{raw_key}={page}"));
                    replaced = true;
                }
                continue;
            }
            pairs.push(pair.to_string());
        }
        if !replaced {
            pairs.push(format!("page={page}"));
        }
        format!("{}{}?{}", self.origin, self.path, pairs.join("&"))
    }
}

fn is_page_key(raw_key: &str) -> bool {
    let key = urlencoding::decode(raw_key).map_or_else(|_| raw_key.into(), |k| k);
    key == "page" || key == "page[number]"
}

// --- tests -------------------------------------------------------------------
