// HTTP request and response types

use crate::cookie::Cookie;
use crate::error::{Error, Result};
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;

/// Streamed response body chunks.
pub type BodyStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// HTTP request wrapper
///
/// `path` never contains the query string; the raw query lives in `query`.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Create a request from a method and a request target (`/path?query`).
    pub fn new(method: impl Into<String>, target: impl AsRef<str>) -> Self {
        let target = target.as_ref();
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        Self {
            method: method.into().to_ascii_uppercase(),
            path: path.to_string(),
            query: query.to_string(),
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Decoded request cookies.
    pub fn cookies(&self) -> HashMap<String, String> {
        self.header("cookie")
            .map(Cookie::parse_request_header)
            .unwrap_or_default()
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies().remove(name)
    }

    /// `Host` header, `localhost` when missing.
    pub fn host(&self) -> &str {
        self.header("host").unwrap_or("localhost")
    }

    /// Path plus query, as received.
    pub fn uri(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }

    /// Body as UTF-8 text, lossy.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the request body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| Error::Deserialization(e.to_string()))
    }
}

/// Response payload: nothing, a buffered body or a stream of chunks.
pub enum ResponseBody {
    Empty,
    Full(Bytes),
    Stream(BodyStream),
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Empty => f.write_str("Empty"),
            ResponseBody::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            ResponseBody::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// HTTP response wrapper
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub cookies: Vec<Cookie>,
    pub body: ResponseBody,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            cookies: Vec::new(),
            body: ResponseBody::Empty,
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn bad_request() -> Self {
        Self::new(400)
    }

    pub fn not_found() -> Self {
        Self::new(404)
    }

    pub fn internal_server_error() -> Self {
        Self::new(500)
    }

    /// 302 redirect to `location`.
    pub fn found(location: impl Into<String>) -> Self {
        Self::new(302).with_header("Location", location)
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = ResponseBody::Full(body.into());
        self
    }

    /// Plain text body with a `text/plain` content type.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        let text: String = text.into();
        self.with_header("Content-Type", "text/plain")
            .with_body(text)
    }

    pub fn with_json<T: Serialize>(self, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(self
            .with_header("Content-Type", "application/json")
            .with_body(body))
    }

    pub fn with_stream(mut self, stream: BodyStream) -> Self {
        self.body = ResponseBody::Stream(stream);
        self
    }

    /// Set a header, replacing any existing header with the same name.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(key, value);
        self
    }

    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(&key));
        self.headers.insert(key, value.into());
    }

    pub fn with_cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.iter().find(|c| c.key == name)
    }

    /// Buffered body bytes; `None` for streamed bodies.
    pub fn body_bytes(&self) -> Option<&[u8]> {
        match &self.body {
            ResponseBody::Empty => Some(<&[u8]>::default()),
            ResponseBody::Full(bytes) => Some(bytes.as_ref()),
            ResponseBody::Stream(_) => None,
        }
    }

    /// Buffered body as lossy UTF-8; empty for streamed bodies.
    pub fn text(&self) -> String {
        self.body_bytes()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default()
    }

    /// Drain the body, collecting streamed chunks.
    pub async fn into_bytes(self) -> Result<Bytes> {
        match self.body {
            ResponseBody::Empty => Ok(Bytes::new()),
            ResponseBody::Full(bytes) => Ok(bytes),
            ResponseBody::Stream(mut stream) => {
                let mut buffer = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buffer.extend_from_slice(&chunk?);
                }
                Ok(buffer.freeze())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_splits_query() {
        let request = HttpRequest::new("get", "/users/1?start=0&size=5");
        assert_eq!(request.method, "GET");
        assert_eq!(request.path, "/users/1");
        assert_eq!(request.query, "start=0&size=5");
        assert_eq!(request.uri(), "/users/1?start=0&size=5");
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let request = HttpRequest::new("GET", "/").with_header("Content-Type", "text/plain");
        assert_eq!(request.content_type(), Some("text/plain"));

        let response = HttpResponse::ok()
            .with_header("content-type", "a")
            .with_header("Content-Type", "b");
        assert_eq!(response.headers.len(), 1);
        assert_eq!(response.header("CONTENT-TYPE"), Some("b"));
    }

    #[test]
    fn test_request_cookie() {
        let request = HttpRequest::new("GET", "/").with_header("Cookie", "session-id=xyz");
        assert_eq!(request.cookie("session-id").as_deref(), Some("xyz"));
        assert_eq!(request.cookie("other"), None);
    }

    #[tokio::test]
    async fn test_stream_body_collects() {
        let chunks = futures_util::stream::iter(vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ]);
        let response = HttpResponse::ok().with_stream(Box::pin(chunks));
        assert!(response.body_bytes().is_none());
        assert_eq!(response.into_bytes().await.unwrap(), "hello world");
    }
}
