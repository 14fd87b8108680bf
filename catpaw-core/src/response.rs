//! Handler responses.
//!
//! Handlers return a [`Response`], either a [`SuccessResponseModifier`] or an
//! [`ErrorResponseModifier`]. Neither is an HTTP response yet: the invoker
//! may still attach cookies, switch to the structured shape declared by the
//! route, or pick a content type from the request `Accept` header. Rendering
//! happens last, in [`Response::render`].
//!
//! ```
//! use catpaw_core::response::{failure, success};
//! use serde_json::json;
//!
//! let created = success(json!({"id": 1})).with_status(201).as_json();
//! assert_eq!(created.message(), "Created");
//!
//! let missing = failure("", 404).item().as_json();
//! let response = missing.render().unwrap();
//! assert_eq!(response.text(), r#"{"message":"Not Found","status":404}"#);
//! ```

use crate::content_negotiation::{
    APPLICATION_JSON, APPLICATION_XML, Accepts, MediaType, TEXT_PLAIN, TEXT_XML,
    negotiate_media_type,
};
use crate::cookie::Cookie;
use crate::error::{Error, Result, reason_phrase};
use crate::http::{BodyStream, HttpResponse};
use crate::page::Page;
use crate::query::value_to_string;
use serde::Serialize;
use serde_json::{Map, Value, json};

fn is_json(content_type: &str) -> bool {
    content_type.starts_with(APPLICATION_JSON)
}

fn is_xml(content_type: &str) -> bool {
    content_type.starts_with(APPLICATION_XML) || content_type.starts_with(TEXT_XML)
}

pub struct SuccessResponseModifier {
    data: Value,
    stream: Option<BodyStream>,
    serialization_error: Option<String>,
    status: u16,
    message: Option<String>,
    headers: Vec<(String, String)>,
    cookies: Vec<Cookie>,
    content_type: Option<String>,
    page: Option<Page>,
    structured: bool,
}

impl std::fmt::Debug for SuccessResponseModifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuccessResponseModifier")
            .field("data", &self.data)
            .field("stream", &self.stream.is_some())
            .field("status", &self.status)
            .field("message", &self.message())
            .field("content_type", &self.content_type)
            .field("page", &self.page)
            .field("structured", &self.structured)
            .finish()
    }
}

impl SuccessResponseModifier {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            stream: None,
            serialization_error: None,
            status: 200,
            message: None,
            headers: Vec::new(),
            cookies: Vec::new(),
            content_type: None,
            page: None,
            structured: false,
        }
    }

    /// Stream the body as it is produced.
    pub fn stream(stream: BodyStream) -> Self {
        let mut modifier = Self::new(Value::Null);
        modifier.stream = Some(stream);
        modifier
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Replace the reason phrase carried by structured payloads.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn with_cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    pub fn as_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn as_json(self) -> Self {
        self.as_type(APPLICATION_JSON)
    }

    pub fn as_xml(self) -> Self {
        self.as_type(APPLICATION_XML)
    }

    pub fn as_text(self) -> Self {
        self.as_type(TEXT_PLAIN)
    }

    /// Wrap the data as `{type: "item", data, message, status}`.
    pub fn item(mut self) -> Self {
        self.structured = true;
        self
    }

    /// Wrap the data as a page with links to its neighbours.
    pub fn page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self.structured = true;
        self
    }

    pub fn with_structure(mut self, structured: bool) -> Self {
        self.structured = structured;
        self
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn message(&self) -> &str {
        self.message
            .as_deref()
            .unwrap_or_else(|| reason_phrase(self.status))
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self.data, Value::Object(_) | Value::Array(_))
    }

    pub fn is_page(&self) -> bool {
        self.page.is_some()
    }

    pub fn is_structured(&self) -> bool {
        self.structured
    }

    /// Payload sent for JSON and XML content types.
    pub fn payload(&self) -> Value {
        if !self.structured {
            return self.data.clone();
        }

        match &self.page {
            Some(page) => {
                let data = match &self.data {
                    Value::Array(_) => self.data.clone(),
                    other => Value::Array(vec![other.clone()]),
                };
                json!({
                    "type": "page",
                    "previousHref": page.previous_link(),
                    "nextHref": page.next_link(),
                    "previous": page.previous(),
                    "next": page.next(),
                    "data": data,
                    "message": self.message(),
                    "status": self.status,
                })
            }
            None => json!({
                "type": "item",
                "data": self.data,
                "message": self.message(),
                "status": self.status,
            }),
        }
    }

    /// Content type used when none was set explicitly.
    fn negotiated_type(&self, accepts: Option<&Accepts>) -> String {
        let candidates = if self.is_primitive() && !self.structured {
            [MediaType::plain_text(), MediaType::json(), MediaType::xml()]
        } else {
            [MediaType::json(), MediaType::xml(), MediaType::plain_text()]
        };
        accepts
            .and_then(|accepts| negotiate_media_type(accepts, &candidates))
            .unwrap_or(&candidates[0])
            .mime_type()
    }

    pub fn render(mut self, accepts: Option<&Accepts>) -> Result<HttpResponse> {
        if let Some(error) = self.serialization_error.take() {
            return Err(Error::Serialization(error));
        }

        let content_type = match &self.content_type {
            Some(content_type) => content_type.clone(),
            None => self.negotiated_type(accepts),
        };

        let mut response = HttpResponse::new(self.status);

        response = match self.stream.take() {
            Some(stream) => response.with_stream(stream),
            None if is_json(&content_type) => {
                let payload = self.payload();
                let body = serde_json::to_vec(&payload)
                    .map_err(|e| Error::Serialization(e.to_string()))?;
                response.with_body(body)
            }
            None if is_xml(&content_type) => response.with_body(crate::xml::to_xml(&self.payload())),
            None => {
                let text = if self.structured || !self.is_primitive() {
                    self.payload().to_string()
                } else {
                    value_to_string(&self.data)
                };
                response.with_body(text)
            }
        };

        response.set_header("Content-Type", content_type);
        for (key, value) in self.headers {
            response.set_header(key, value);
        }
        response.cookies.extend(self.cookies);
        Ok(response)
    }
}

#[derive(Debug, Clone)]
pub struct ErrorResponseModifier {
    status: u16,
    message: String,
    headers: Vec<(String, String)>,
    cookies: Vec<Cookie>,
    content_type: String,
    item: bool,
}

impl ErrorResponseModifier {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            headers: Vec::new(),
            cookies: Vec::new(),
            content_type: TEXT_PLAIN.to_string(),
            item: false,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn with_cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    pub fn as_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn as_json(self) -> Self {
        self.as_type(APPLICATION_JSON)
    }

    pub fn as_xml(self) -> Self {
        self.as_type(APPLICATION_XML)
    }

    pub fn as_text(self) -> Self {
        self.as_type(TEXT_PLAIN)
    }

    /// Encode JSON and XML bodies as `{message, status}`.
    pub fn item(mut self) -> Self {
        self.item = true;
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    fn payload(&self) -> Value {
        if self.item {
            let mut item = Map::new();
            item.insert("message".into(), Value::String(self.message.clone()));
            item.insert("status".into(), Value::from(self.status));
            Value::Object(item)
        } else {
            Value::String(self.message.clone())
        }
    }

    pub fn render(self) -> Result<HttpResponse> {
        let body = if is_json(&self.content_type) {
            serde_json::to_string(&self.payload()).map_err(|e| Error::Serialization(e.to_string()))?
        } else if is_xml(&self.content_type) {
            crate::xml::to_xml(&self.payload())
        } else {
            self.message.clone()
        };

        let mut response = HttpResponse::new(self.status).with_body(body);
        response.set_header("Content-Type", self.content_type);
        for (key, value) in self.headers {
            response.set_header(key, value);
        }
        response.cookies.extend(self.cookies);
        Ok(response)
    }
}

/// What a handler returns.
#[derive(Debug)]
pub enum Response {
    Success(SuccessResponseModifier),
    Error(ErrorResponseModifier),
}

impl Response {
    pub fn status(&self) -> u16 {
        match self {
            Response::Success(s) => s.status(),
            Response::Error(e) => e.status(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }

    pub fn with_header(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match self {
            Response::Success(s) => Response::Success(s.with_header(key, value)),
            Response::Error(e) => Response::Error(e.with_header(key, value)),
        }
    }

    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let header = (key.into(), value.into());
        match self {
            Response::Success(s) => s.headers.push(header),
            Response::Error(e) => e.headers.push(header),
        }
    }

    pub fn with_cookie(self, cookie: Cookie) -> Self {
        match self {
            Response::Success(s) => Response::Success(s.with_cookie(cookie)),
            Response::Error(e) => Response::Error(e.with_cookie(cookie)),
        }
    }

    /// Render into an HTTP response, negotiating the content type of
    /// successful responses that have none.
    pub fn render(self, accepts: Option<&Accepts>) -> Result<HttpResponse> {
        match self {
            Response::Success(s) => s.render(accepts),
            Response::Error(e) => e.render(),
        }
    }
}

impl From<SuccessResponseModifier> for Response {
    fn from(value: SuccessResponseModifier) -> Self {
        Response::Success(value)
    }
}

impl From<ErrorResponseModifier> for Response {
    fn from(value: ErrorResponseModifier) -> Self {
        Response::Error(value)
    }
}

impl From<Error> for Response {
    fn from(error: Error) -> Self {
        let status = error.status_code();
        Response::Error(ErrorResponseModifier::new(status, error.to_string()))
    }
}

/// Successful response carrying `data`, 200 OK.
pub fn success<T: Serialize>(data: T) -> SuccessResponseModifier {
    match serde_json::to_value(data) {
        Ok(value) => SuccessResponseModifier::new(value),
        Err(e) => {
            let mut modifier = SuccessResponseModifier::new(Value::Null);
            modifier.serialization_error = Some(e.to_string());
            modifier
        }
    }
}

/// Failed response; an empty `message` becomes the reason phrase.
pub fn failure(message: impl Into<String>, status: u16) -> ErrorResponseModifier {
    let message = message.into();
    let message = if message.is_empty() {
        reason_phrase(status).to_string()
    } else {
        message
    };
    ErrorResponseModifier::new(status, message)
}

/// 500 with the reason phrase.
pub fn internal_server_error() -> ErrorResponseModifier {
    failure("", 500)
}

pub fn bad_request(message: impl Into<String>) -> ErrorResponseModifier {
    failure(message, 400)
}

/// 302 to `to`.
pub fn redirect(to: impl Into<String>) -> SuccessResponseModifier {
    SuccessResponseModifier::new(Value::Null)
        .with_status(302)
        .with_header("Location", to)
}
