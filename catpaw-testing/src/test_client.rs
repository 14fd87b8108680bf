// In-process HTTP client

use bytes::Bytes;
use catpaw_core::{Cookie, HttpRequest, HttpResponse, RequestHandler};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;

/// Client sending requests straight to a [`RequestHandler`].
///
/// Cookies set by responses are kept and sent back with later requests,
/// so sessions survive between calls like they do in a browser.
#[derive(Debug, Clone)]
pub struct TestClient {
    handler: RequestHandler,
    cookies: Arc<Mutex<HashMap<String, String>>>,
}

impl TestClient {
    pub fn new(handler: RequestHandler) -> Self {
        Self {
            handler,
            cookies: Arc::default(),
        }
    }

    pub async fn get(&self, target: &str) -> TestResponse {
        self.send(TestRequestBuilder::new("GET", target)).await
    }

    pub async fn delete(&self, target: &str) -> TestResponse {
        self.send(TestRequestBuilder::new("DELETE", target)).await
    }

    pub async fn post(&self, target: &str, body: impl Into<Vec<u8>>) -> TestResponse {
        self.send(TestRequestBuilder::new("POST", target).body(body)).await
    }

    pub async fn put(&self, target: &str, body: impl Into<Vec<u8>>) -> TestResponse {
        self.send(TestRequestBuilder::new("PUT", target).body(body)).await
    }

    pub async fn patch(&self, target: &str, body: impl Into<Vec<u8>>) -> TestResponse {
        self.send(TestRequestBuilder::new("PATCH", target).body(body)).await
    }

    /// POST `value` as JSON.
    pub async fn post_json<T: Serialize>(&self, target: &str, value: &T) -> TestResponse {
        self.send(TestRequestBuilder::new("POST", target).json(value)).await
    }

    pub async fn send(&self, request: TestRequestBuilder) -> TestResponse {
        let mut request = request.build();
        let jar = self.cookie_header();
        if !jar.is_empty() && request.header("cookie").is_none() {
            request.headers.insert("Cookie".to_string(), jar);
        }

        let response = TestResponse::collect(self.handler.handle(request).await).await;
        {
            let mut cookies = self.cookies.lock();
            for cookie in &response.cookies {
                cookies.insert(cookie.key.clone(), cookie.value.clone());
            }
        }
        response
    }

    /// Cookie value kept from earlier responses.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.lock().get(name).cloned()
    }

    pub fn clear_cookies(&self) {
        self.cookies.lock().clear();
    }

    fn cookie_header(&self) -> String {
        let cookies = self.cookies.lock();
        let mut pairs: Vec<String> = cookies.iter().map(|(k, v)| format!("{k}={v}")).collect();
        pairs.sort();
        pairs.join("; ")
    }
}

/// Builder for test requests
#[derive(Debug, Clone)]
pub struct TestRequestBuilder {
    method: String,
    target: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    query: Vec<(String, String)>,
}

impl TestRequestBuilder {
    pub fn new(method: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            target: target.into(),
            headers: Vec::new(),
            body: Vec::new(),
            query: Vec::new(),
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// JSON body with its content type. A value that does not serialize
    /// leaves the body empty.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        self.body = serde_json::to_vec(value).unwrap_or_default();
        self.header("Content-Type", "application/json")
    }

    /// Urlencoded form body with its content type.
    pub fn form<T: Serialize>(mut self, value: &T) -> Self {
        self.body = serde_urlencoded::to_string(value)
            .map(String::into_bytes)
            .unwrap_or_default();
        self.header("Content-Type", "application/x-www-form-urlencoded")
    }

    /// Add a query parameter, encoded.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn build(self) -> HttpRequest {
        let mut target = self.target;
        if !self.query.is_empty() {
            let encoded = serde_urlencoded::to_string(&self.query).unwrap_or_default();
            target.push(if target.contains('?') { '&' } else { '?' });
            target.push_str(&encoded);
        }

        let mut request = HttpRequest::new(self.method, target).with_body(self.body);
        for (key, value) in self.headers {
            request = request.with_header(key, value);
        }
        request
    }
}

/// Response with its body fully read.
#[derive(Debug, Clone)]
pub struct TestResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub cookies: Vec<Cookie>,
    pub body: Bytes,
}

impl TestResponse {
    /// Read the whole body of `response`, streamed or not.
    pub async fn collect(response: HttpResponse) -> Self {
        let status = response.status;
        let headers = response.headers.clone();
        let cookies = response.cookies.clone();
        let body = response.into_bytes().await.unwrap_or_default();
        Self {
            status,
            headers,
            cookies,
            body,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
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

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, String> {
        serde_json::from_slice(&self.body).map_err(|e| format!("Deserialization error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = TestRequestBuilder::new("GET", "/cats?color=black")
            .header("Authorization", "Bearer token")
            .query("name", "tom & jerry")
            .build();

        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/cats");
        assert_eq!(req.query, "color=black&name=tom+%26+jerry");
        assert_eq!(req.header("authorization"), Some("Bearer token"));
    }

    #[test]
    fn test_json_body() {
        let req = TestRequestBuilder::new("POST", "/cats")
            .json(&serde_json::json!({ "name": "Tom" }))
            .build();
        assert_eq!(req.content_type(), Some("application/json"));
        assert_eq!(req.body, br#"{"name":"Tom"}"#);
    }
}
