//! Offset pagination.
//!
//! Handlers receive a [`Page`] built from the `start` (default 0) and `size`
//! (default 10) query strings. Paged responses link to the neighbouring
//! pages through `previousHref`/`nextHref`.

use crate::HttpRequest;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_START: i64 = 0;
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Location used to render page links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PageUri {
    scheme: String,
    host: String,
    port: u16,
    path: String,
    query: String,
}

/// A page that starts at `start` and is `size` items long.
///
/// ```
/// use catpaw_core::Page;
///
/// let page = Page::new(20, 10);
/// assert_eq!(page.next(), Page::new(30, 10));
/// assert_eq!(page.previous(), Page::new(10, 10));
/// assert_eq!(Page::new(3, 10).previous(), Page::new(0, 10));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub start: i64,
    pub size: i64,
    #[serde(skip)]
    uri: Option<PageUri>,
}

impl PartialEq for Page {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.size == other.size
    }
}

impl Page {
    /// Create a page; a negative start or size is clamped to 0.
    pub fn new(start: i64, size: i64) -> Self {
        Self {
            start: start.max(0),
            size: size.max(0),
            uri: None,
        }
    }

    /// First page of `size` items.
    pub fn of(size: i64) -> Self {
        Self::new(0, size)
    }

    /// Build from the `start` and `size` query strings of a request.
    pub fn from_request(request: &HttpRequest) -> Self {
        let queries = crate::query::parse_query_string(&request.query);
        let read = |key: &str, default: i64| {
            queries
                .get(key)
                .and_then(|v| {
                    v.as_i64()
                        .or_else(|| v.as_f64().map(|f| f as i64))
                        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
                })
                .unwrap_or(default)
        };
        Self::new(read("start", DEFAULT_PAGE_START), read("size", DEFAULT_PAGE_SIZE))
            .with_request(request)
    }

    /// Remember where the request came from so links can be rendered.
    pub fn with_request(mut self, request: &HttpRequest) -> Self {
        let host = request.host();
        let (host, port) = match host.rsplit_once(':') {
            Some((h, p)) if !h.ends_with(']') || h.starts_with('[') => match p.parse::<u16>() {
                Ok(port) => (h.to_string(), port),
                Err(_) => (host.to_string(), 80),
            },
            _ => (host.to_string(), 80),
        };
        let scheme = request
            .header("x-forwarded-proto")
            .unwrap_or("http")
            .to_string();

        self.uri = Some(PageUri {
            scheme,
            host,
            port,
            path: request.path.clone(),
            query: request.query.clone(),
        });
        self
    }

    pub fn next(&self) -> Self {
        Self {
            start: self.start.saturating_add(self.size),
            size: self.size,
            uri: self.uri.clone(),
        }
    }

    pub fn previous(&self) -> Self {
        Self {
            start: self.start.saturating_sub(self.size).max(0),
            size: self.size,
            uri: self.uri.clone(),
        }
    }

    /// Link to the next page.
    pub fn next_link(&self) -> String {
        self.link(&self.next())
    }

    /// Link to the previous page.
    pub fn previous_link(&self) -> String {
        self.link(&self.previous())
    }

    fn link(&self, target: &Page) -> String {
        let uri = self.uri.clone().unwrap_or_else(|| PageUri {
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            port: 80,
            ..Default::default()
        });

        let mut pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(&uri.query).unwrap_or_default();
        pairs.retain(|(key, _)| key != "start" && key != "size");
        pairs.push(("start".to_string(), target.start.to_string()));
        pairs.push(("size".to_string(), target.size.to_string()));
        let query = serde_urlencoded::to_string(&pairs).unwrap_or_default();

        format!(
            "{}://{}:{}{}?{}",
            uri.scheme, uri.host, uri.port, uri.path, query
        )
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_START, DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_request() {
        let request = HttpRequest::new("GET", "/items");
        let page = Page::from_request(&request);
        assert_eq!(page, Page::new(0, 10));
    }

    #[test]
    fn test_from_request_query() {
        let request = HttpRequest::new("GET", "/items?start=3&size=3");
        assert_eq!(Page::from_request(&request), Page::new(3, 3));
    }

    #[test]
    fn test_links_keep_other_queries() {
        let request = HttpRequest::new("GET", "/items?name=cat&start=10&size=5")
            .with_header("Host", "example.com:8080");
        let page = Page::from_request(&request);

        assert_eq!(
            page.next_link(),
            "http://example.com:8080/items?name=cat&start=15&size=5"
        );
        assert_eq!(
            page.previous_link(),
            "http://example.com:8080/items?name=cat&start=5&size=5"
        );
    }

    #[test]
    fn test_host_without_port() {
        let request = HttpRequest::new("GET", "/a").with_header("Host", "example.com");
        let page = Page::new(0, 2).with_request(&request);
        assert_eq!(page.next_link(), "http://example.com:80/a?start=2&size=2");
    }

    #[test]
    fn test_neighbours_saturate() {
        let last = Page::new(i64::MAX, 10);
        assert_eq!(last.next().start, i64::MAX);
        assert_eq!(last.previous().start, i64::MAX - 10);
        assert_eq!(Page::new(0, i64::MAX).previous().start, 0);
    }

    #[test]
    fn test_negative_size_is_clamped() {
        assert_eq!(Page::new(-4, -2), Page::new(0, 0));
        let request = HttpRequest::new("GET", "/items?size=-5");
        assert_eq!(Page::from_request(&request).size, 0);
    }

    #[test]
    fn test_serializes_start_and_size() {
        let json = serde_json::to_value(Page::new(4, 2)).unwrap();
        assert_eq!(json, serde_json::json!({"start": 4, "size": 2}));
    }
}
