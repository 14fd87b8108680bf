//! Request body parsing.
//!
//! [`BodyParser`] turns a raw body into a JSON value according to its
//! content type; [`Body`] is the per-request view handlers receive.

use crate::error::{Error, Result};
use crate::HttpRequest;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

/// Default upper bound on a parsed body, 10 GiB.
pub const DEFAULT_BODY_SIZE_LIMIT: u64 = 10 * 1024 * 1024 * 1024;

/// A file received through `multipart/form-data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFile {
    pub field_name: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub contents: Bytes,
}

impl FormFile {
    pub fn size(&self) -> usize {
        self.contents.len()
    }

    /// Write the contents to `path`.
    pub async fn save_as(&self, path: impl AsRef<Path>) -> Result<()> {
        tokio::fs::write(path, &self.contents).await?;
        Ok(())
    }

    fn describe(&self) -> Value {
        serde_json::json!({
            "fileName": self.file_name,
            "contentType": self.content_type,
            "size": self.size(),
        })
    }
}

/// Fields and files of a multipart body.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub files: Vec<FormFile>,
}

impl FormData {
    pub fn file(&self, field_name: &str) -> Option<&FormFile> {
        self.files.iter().find(|f| f.field_name == field_name)
    }
}

pub struct BodyParser;

impl BodyParser {
    /// Parse `body` according to `content_type`.
    ///
    /// Form and multipart bodies become objects of strings; multipart files
    /// are described by `fileName`, `contentType` and `size`. Unknown content
    /// types give an empty object.
    pub async fn parse(body: &[u8], content_type: &str) -> Result<Value> {
        let content_type = content_type.trim();
        if content_type.is_empty() {
            return Err(Error::MissingContentType);
        }

        let essence = content_type.to_ascii_lowercase();
        if essence.starts_with("application/x-www-form-urlencoded") {
            Self::parse_urlencoded(body)
        } else if essence.starts_with("application/json") {
            if body.is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_slice(body).map_err(|e| Error::Deserialization(e.to_string()))
        } else if essence.starts_with("multipart/") {
            let form = Self::parse_multipart(body, content_type).await?;
            let mut object: Map<String, Value> = form
                .fields
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            for file in &form.files {
                object.insert(file.field_name.clone(), file.describe());
            }
            Ok(Value::Object(object))
        } else {
            tracing::debug!(content_type, "No parser for content type, body ignored");
            Ok(Value::Object(Map::new()))
        }
    }

    fn parse_urlencoded(body: &[u8]) -> Result<Value> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
            .map_err(|e| Error::Deserialization(e.to_string()))?;
        Ok(Value::Object(
            pairs.into_iter().map(|(k, v)| (k, Value::String(v))).collect(),
        ))
    }

    /// Split a `multipart/form-data` body into fields and files.
    pub async fn parse_multipart(body: &[u8], content_type: &str) -> Result<FormData> {
        let boundary =
            multer::parse_boundary(content_type).map_err(|e| Error::BadRequest(e.to_string()))?;
        let bytes = Bytes::copy_from_slice(body);
        let stream = futures_util::stream::once(async move { Ok::<Bytes, std::io::Error>(bytes) });
        let mut multipart = multer::Multipart::new(stream, boundary);

        let mut form = FormData::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| Error::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(|m| m.to_string());
                    let contents = field
                        .bytes()
                        .await
                        .map_err(|e| Error::BadRequest(e.to_string()))?;
                    form.files.push(FormFile {
                        field_name: name,
                        file_name,
                        content_type,
                        contents,
                    });
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| Error::BadRequest(e.to_string()))?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }
}

/// The body of the current request.
#[derive(Debug, Clone)]
pub struct Body {
    bytes: Bytes,
    content_type: String,
    size_limit: u64,
}

impl Body {
    pub fn new(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
            size_limit: DEFAULT_BODY_SIZE_LIMIT,
        }
    }

    pub fn from_request(request: &HttpRequest) -> Self {
        Self::new(
            request.body.clone(),
            request.content_type().unwrap_or_default(),
        )
    }

    pub fn with_size_limit(mut self, size_limit: u64) -> Self {
        self.size_limit = size_limit;
        self
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    fn checked(&self) -> Result<&[u8]> {
        if self.bytes.len() as u64 > self.size_limit {
            return Err(Error::BadRequest(format!(
                "Body exceeds the size limit of {} bytes.",
                self.size_limit
            )));
        }
        Ok(&self.bytes)
    }

    pub fn text(&self) -> Result<String> {
        Ok(String::from_utf8_lossy(self.checked()?).into_owned())
    }

    /// Numeric body truncated to an integer.
    pub fn int(&self) -> Result<i64> {
        let text = self.text()?;
        numeric(&text)
            .map(|(int, float)| int.unwrap_or(float.trunc() as i64))
            .ok_or_else(|| {
                Error::BadRequest(format!(
                    "Body was expected to be numeric (int), but non numeric value has been provided instead:{text}"
                ))
            })
    }

    pub fn float(&self) -> Result<f64> {
        let text = self.text()?;
        numeric(&text).map(|(_, float)| float).ok_or_else(|| {
            Error::BadRequest(format!(
                "Body was expected to be numeric (float), but non numeric value has been provided instead:{text}"
            ))
        })
    }

    /// `1`, `true`, `on` and `yes` are true, anything else false.
    pub fn bool(&self) -> Result<bool> {
        Ok(crate::query::truthy(&self.text()?))
    }

    /// Parse according to the content type.
    pub async fn parse(&self) -> Result<Value> {
        BodyParser::parse(self.checked()?, &self.content_type).await
    }

    /// Parse and deserialize into `T`.
    pub async fn parse_as<T: DeserializeOwned>(&self) -> Result<T> {
        let value = self.parse().await?;
        serde_json::from_value(value).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Fields and files of a multipart body.
    pub async fn form(&self) -> Result<FormData> {
        BodyParser::parse_multipart(self.checked()?, &self.content_type).await
    }
}

/// `(exact integer, float value)` of a numeric string.
pub(crate) fn numeric(text: &str) -> Option<(Option<i64>, f64)> {
    let trimmed = text.trim();
    let float = trimmed.parse::<f64>().ok().filter(|f| f.is_finite())?;
    Some((trimmed.parse::<i64>().ok(), float))
}
