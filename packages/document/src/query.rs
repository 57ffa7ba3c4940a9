//! Raw query parameters of a request.

/// Query parameters the serializer understands, still as raw strings.
///
/// Values are kept unparsed so that the engine can reject malformed input
/// (a non-numeric `page`, say) instead of silently falling back to a
/// default. Unrecognised parameters are ignored.
///
/// | Parameter | Field |
/// |-----------|-------|
/// | `page`, `page[number]` | [`page`](Self::page) |
/// | `per_page`, `page[size]` | [`per_page`](Self::per_page) |
/// | `sort` | [`sort`](Self::sort) |
/// | `filter[<property>]` | [`filters`](Self::filters) |
/// | `fields[<type>]` | [`fields`](Self::fields) |
///
/// Decoding uses percent-decoding only; a literal `+` stays a `+` so that
/// `sort=+age` keeps its ascending marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub sort: Option<String>,

    /// `(property, value)` pairs in request order.
    pub filters: Vec<(String, String)>,

    /// `(type, comma-separated field list)` pairs in request order.
    pub fields: Vec<(String, String)>,
}

impl QueryParams {
    /// Parse the query component of a URL (everything after `?`, without
    /// the fragment). Accepts an empty string.
    pub fn from_query_string(query: &str) -> Self {
        let mut params = Self::default();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode(raw_key);
            let value = decode(raw_value);

            match key.as_str() {
                "page" | "page[number]" => params.page = Some(value),
                "per_page" | "page[size]" => params.per_page = Some(value),
                "sort" => params.sort = Some(value),
                _ => {
                    if let Some(property) = bracketed(&key, "filter") {
                        params.filters.push((property.to_string(), value));
                    } else if let Some(type_name) = bracketed(&key, "fields") {
                        params.fields.push((type_name.to_string(), value));
                    }
                }
            }
        }
        params
    }

    /// Parse the query parameters out of a full URL.
    pub fn from_url(url: &str) -> Self {
        let without_fragment = url.split('#').next().unwrap_or_default();
        match without_fragment.split_once('?') {
            Some((_, query)) => Self::from_query_string(query),
            None => Self::default(),
        }
    }

    /// `true` if the request carried none of the recognised parameters.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// --- helpers -----------------------------------------------------------------

fn decode(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

/// `filter[age]` with family `filter` yields `age`.
fn bracketed<'a>(key: &'a str, family: &str) -> Option<&'a str> {
    key.strip_prefix(family)?
        .strip_prefix('[')?
        .strip_suffix(']')
        .filter(|inner| !inner.is_empty())
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pagination_and_sort() {
        let q = QueryParams::from_query_string("page=2&per_page=5&sort=+age,-id");
        assert_eq!(q.page.as_deref(), Some("2"));
        assert_eq!(q.per_page.as_deref(), Some("5"));
        assert_eq!(q.sort.as_deref(), Some("+age,-id"));
    }

    #[test]
    fn jsonapi_page_aliases() {
        let q = QueryParams::from_query_string("page%5Bnumber%5D=3&page[size]=20");
        assert_eq!(q.page.as_deref(), Some("3"));
        assert_eq!(q.per_page.as_deref(), Some("20"));
    }

    #[test]
    fn percent_encoded_plus_and_comma() {
        let q = QueryParams::from_query_string("sort=%2Bage%2C-name");
        assert_eq!(q.sort.as_deref(), Some("+age,-name"));
    }

    #[test]
    fn filters_and_fields_keep_request_order() {
        let q = QueryParams::from_query_string(
            "filter[age]=30&fields[person]=first-name,age&filter[last-name]=Smith",
        );
        assert_eq!(
            q.filters,
            vec![
                ("age".to_string(), "30".to_string()),
                ("last-name".to_string(), "Smith".to_string())
            ]
        );
        assert_eq!(
            q.fields,
            vec![("person".to_string(), "first-name,age".to_string())]
        );
    }

    #[test]
    fn unknown_and_malformed_parameters_are_ignored() {
        let q = QueryParams::from_query_string("&&include=job&filter[]=x&fields=y");
        assert!(q.is_empty());
    }

    #[test]
    fn from_url_strips_path_and_fragment() {
        let q = QueryParams::from_url("http://example.com/api/people?page=1#top");
        assert_eq!(q.page.as_deref(), Some("1"));
        assert!(QueryParams::from_url("http://example.com/api/people").is_empty());
    }

    #[test]
    fn value_less_parameter_is_empty_string() {
        let q = QueryParams::from_query_string("page");
        assert_eq!(q.page.as_deref(), Some(""));
    }
}
