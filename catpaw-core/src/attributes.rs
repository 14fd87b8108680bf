//! Parameter and route attributes.
//!
//! Parameter attributes implement [`ParameterAttribute`] and rewrite the
//! value of the parameter they are attached to while dependencies are
//! resolved. Route hooks implement [`OnRequest`] or [`OnResponse`].
//! [`Consumes`] and [`Produces`] describe the content types of a route.

use crate::content_negotiation::{APPLICATION_JSON, APPLICATION_XML, TEXT_PLAIN, TEXT_XML};
use crate::dependencies::{Argument, DependenciesOptions, Parameter, ParameterKind};
use crate::error::{Error, Result};
use crate::http::HttpRequest;
use crate::query::{truthy, value_to_string};
use crate::response::Response;
use async_trait::async_trait;
use serde_json::Value;
use std::any::Any;

/// Rewrites a parameter value while dependencies are resolved.
#[async_trait]
pub trait ParameterAttribute: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Validate the declaration when the route is registered.
    fn on_route_mount(&self, _route_key: &str, _parameter: &Parameter) -> Result<()> {
        Ok(())
    }

    async fn on_parameter_mount(
        &self,
        parameter: &Parameter,
        value: &mut Argument,
        options: &DependenciesOptions,
    ) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

/// Runs before the handler.
#[async_trait]
pub trait OnRequest: Send + Sync {
    async fn on_request(&self, request: &HttpRequest) -> Result<()>;
}

/// Runs after the handler and may rewrite its response.
#[async_trait]
pub trait OnResponse: Send + Sync {
    async fn on_response(&self, request: &HttpRequest, response: &mut Response) -> Result<()>;
}

/// Path parameter, optionally with its own validation pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Param {
    pattern: Option<String>,
}

impl Param {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pattern(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
        }
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }
}

#[async_trait]
impl ParameterAttribute for Param {
    fn name(&self) -> &'static str {
        "Param"
    }

    fn on_route_mount(&self, route_key: &str, parameter: &Parameter) -> Result<()> {
        if let ParameterKind::Dependency { .. } = parameter.kind {
            return Err(Error::DependencyInjection(format!(
                "Path parameter `{}` of \"{route_key}\" must be a bool, int, float or string.",
                parameter.name
            )));
        }
        Ok(())
    }

    async fn on_parameter_mount(
        &self,
        parameter: &Parameter,
        value: &mut Argument,
        options: &DependenciesOptions,
    ) -> Result<()> {
        let context = options.require_context("path parameter")?;
        let Some(raw) = context.path_parameters.get(&parameter.name) else {
            return Ok(());
        };

        *value = path_value(raw, parameter)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Convert a raw path segment to the kind of `parameter`.
pub(crate) fn path_value(raw: &str, parameter: &Parameter) -> Result<Argument> {
    let invalid = || Error::BadRequest(format!("Invalid value `{raw}` for parameter `{}`.", parameter.name));
    Ok(match parameter.kind {
        ParameterKind::Bool => Argument::Bool(truthy(raw)),
        ParameterKind::Int => raw
            .trim_start_matches('+')
            .parse()
            .map(Argument::Int)
            .map_err(|_| invalid())?,
        ParameterKind::Float => raw.parse().map(Argument::Float).map_err(|_| invalid())?,
        _ => Argument::String(raw.to_string()),
    })
}

/// Query string parameter, keyed by the parameter name unless a key is given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    key: Option<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
        }
    }

    /// Query string key read for `parameter`.
    pub fn key_for<'a>(&'a self, parameter: &'a Parameter) -> &'a str {
        self.key.as_deref().unwrap_or(&parameter.name)
    }
}

#[async_trait]
impl ParameterAttribute for Query {
    fn name(&self) -> &'static str {
        "Query"
    }

    fn on_route_mount(&self, route_key: &str, parameter: &Parameter) -> Result<()> {
        if !parameter.is_optional() {
            return Err(Error::InvalidQueryParameter(format!(
                "Handler \"{route_key}\" specifies a request query string parameter `{}` that is not nullable. \
                 Any request query string parameter MUST be nullable or at least provide a default value.",
                self.key_for(parameter)
            )));
        }
        Ok(())
    }

    async fn on_parameter_mount(
        &self,
        parameter: &Parameter,
        value: &mut Argument,
        options: &DependenciesOptions,
    ) -> Result<()> {
        let context = options.require_context("query")?;
        let key = self.key_for(parameter);

        let Some(raw) = context.request_queries.get(key) else {
            if !parameter.nullable {
                *value = match &parameter.default {
                    Some(default) => default.clone(),
                    None => zero_value(parameter.kind),
                };
            }
            return Ok(());
        };

        let text = value_to_string(raw);
        let not_numeric = || {
            Error::BadRequest(format!(
                "Query {key} was expected to be numeric, but non numeric value has been provided instead:{text}."
            ))
        };

        *value = match parameter.kind {
            ParameterKind::Int => {
                let (int, float) = crate::body_parser::numeric(&text).ok_or_else(not_numeric)?;
                Argument::Int(int.unwrap_or(float.trunc() as i64))
            }
            ParameterKind::Float => {
                let (_, float) = crate::body_parser::numeric(&text).ok_or_else(not_numeric)?;
                Argument::Float(float)
            }
            ParameterKind::Bool => Argument::Bool(match raw {
                Value::Bool(b) => *b,
                _ => truthy(&text),
            }),
            ParameterKind::Value => Argument::Json(raw.clone()),
            _ => Argument::String(text),
        };
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn zero_value(kind: ParameterKind) -> Argument {
    match kind {
        ParameterKind::Bool => Argument::Bool(false),
        ParameterKind::Int => Argument::Int(0),
        ParameterKind::Float => Argument::Float(0.0),
        ParameterKind::String => Argument::String(String::new()),
        _ => Argument::Null,
    }
}

/// Request header, keyed by the parameter name unless a key is given.
///
/// `Value` parameters receive the comma separated entries as a list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    key: Option<String>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
        }
    }

    pub fn key_for<'a>(&'a self, parameter: &'a Parameter) -> &'a str {
        self.key.as_deref().unwrap_or(&parameter.name)
    }
}

#[async_trait]
impl ParameterAttribute for Header {
    fn name(&self) -> &'static str {
        "Header"
    }

    async fn on_parameter_mount(
        &self,
        parameter: &Parameter,
        value: &mut Argument,
        options: &DependenciesOptions,
    ) -> Result<()> {
        let context = options.require_context("header")?;
        let raw = context
            .request
            .header(self.key_for(parameter))
            .unwrap_or_default()
            .trim();

        *value = match parameter.kind {
            ParameterKind::Bool => Argument::Bool(!raw.is_empty() && raw != "0"),
            ParameterKind::Int => Argument::Int(leading_int(raw)),
            ParameterKind::Float => Argument::Float(raw.parse().unwrap_or(0.0)),
            ParameterKind::Value => Argument::Json(Value::Array(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| Value::String(s.to_string()))
                    .collect(),
            )),
            _ => Argument::String(raw.to_string()),
        };
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Integer prefix of `raw`, 0 when there is none.
fn leading_int(raw: &str) -> i64 {
    let end = raw
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(raw.len());
    raw[..end].parse().unwrap_or(0)
}

/// Request body.
///
/// Primitive parameters read the raw body, `Value` parameters the body
/// parsed according to its content type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body;

#[async_trait]
impl ParameterAttribute for Body {
    fn name(&self) -> &'static str {
        "Body"
    }

    async fn on_parameter_mount(
        &self,
        parameter: &Parameter,
        value: &mut Argument,
        options: &DependenciesOptions,
    ) -> Result<()> {
        let context = options.require_context("body")?;
        let body = crate::body_parser::Body::from_request(&context.request);

        *value = match parameter.kind {
            ParameterKind::String => Argument::String(body.text()?),
            ParameterKind::Int => Argument::Int(body.int()?),
            ParameterKind::Float => Argument::Float(body.float()?),
            ParameterKind::Bool => Argument::Bool(body.bool()?),
            ParameterKind::Value => Argument::Json(body.parse().await?),
            ParameterKind::Dependency { type_name, .. } => {
                return Err(Error::DependencyInjection(format!(
                    "Body parameter `{}` cannot be of type {type_name}; declare it as a value and deserialize it.",
                    parameter.name
                )));
            }
        };
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The session of the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionAttr;

#[async_trait]
impl ParameterAttribute for SessionAttr {
    fn name(&self) -> &'static str {
        "Session"
    }

    async fn on_parameter_mount(
        &self,
        _parameter: &Parameter,
        value: &mut Argument,
        options: &DependenciesOptions,
    ) -> Result<()> {
        let context = options.require_context("session")?;
        let session = context.session.clone().ok_or_else(|| {
            Error::DependencyInjection("No session store is configured.".to_string())
        })?;
        *value = Argument::Dependency(session);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Content types a route accepts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Consumes {
    pub content_types: Vec<String>,
    /// Schema of the body, for API descriptions.
    pub schema: Option<Value>,
    pub example: Option<Value>,
}

impl Consumes {
    pub fn new<I, S>(content_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            content_types: content_types.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn json() -> Self {
        Self::new([APPLICATION_JSON])
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_example(mut self, example: Value) -> Self {
        self.example = Some(example);
        self
    }

    /// Whether a request with `content_type` is acceptable.
    pub fn accepts(&self, content_type: &str) -> bool {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        self.content_types.is_empty()
            || self
                .content_types
                .iter()
                .any(|ct| ct.eq_ignore_ascii_case(essence) || ct == "*/*")
    }
}

/// Shape of a produced body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// The data as returned by the handler.
    Raw,
    /// `{type: "item", data, message, status}`
    Item,
    /// `{type: "page", previousHref, nextHref, previous, next, data, message, status}`
    Page,
    /// `{message, status}`
    Error,
}

/// A response a route may produce.
#[derive(Debug, Clone, PartialEq)]
pub struct Produces {
    pub status: u16,
    pub content_types: Vec<String>,
    pub shape: ResponseShape,
    pub schema: Option<Value>,
    pub example: Option<Value>,
    pub description: Option<String>,
}

impl Produces {
    /// JSON and XML content types are structured as items, others are raw.
    pub fn new<I, S>(content_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let content_types: Vec<String> = content_types.into_iter().map(Into::into).collect();
        let shape = if content_types.iter().any(|ct| is_structured_type(ct)) {
            ResponseShape::Item
        } else {
            ResponseShape::Raw
        };
        Self {
            status: 200,
            content_types,
            shape,
            schema: None,
            example: None,
            description: None,
        }
    }

    pub fn json() -> Self {
        Self::new([APPLICATION_JSON])
    }

    pub fn xml() -> Self {
        Self::new([APPLICATION_XML])
    }

    pub fn text() -> Self {
        Self::new([TEXT_PLAIN])
    }

    pub fn page<I, S>(content_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(content_types).with_shape(ResponseShape::Page)
    }

    pub fn error(status: u16, content_type: impl Into<String>) -> Self {
        Self::new([content_type.into()])
            .with_status(status)
            .with_shape(ResponseShape::Error)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_shape(mut self, shape: ResponseShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_example(mut self, example: Value) -> Self {
        self.example = Some(example);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Successful responses wrapped in an item or page.
    pub fn is_structured(&self) -> bool {
        matches!(self.shape, ResponseShape::Item | ResponseShape::Page)
    }
}

fn is_structured_type(content_type: &str) -> bool {
    [APPLICATION_JSON, APPLICATION_XML, TEXT_XML]
        .iter()
        .any(|ct| content_type.starts_with(ct))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_registration_requires_optional() {
        let query = Query::new();
        let required = Parameter::int("start");
        assert!(matches!(
            query.on_route_mount("GET:/", &required),
            Err(Error::InvalidQueryParameter(_))
        ));
        assert!(query.on_route_mount("GET:/", &Parameter::int("start").with_default(0i64)).is_ok());
        assert!(query.on_route_mount("GET:/", &Parameter::int("start").nullable()).is_ok());
    }

    #[test]
    fn test_leading_int() {
        assert_eq!(leading_int("42abc"), 42);
        assert_eq!(leading_int("-7"), -7);
        assert_eq!(leading_int("abc"), 0);
        assert_eq!(leading_int(""), 0);
    }

    #[test]
    fn test_consumes_accepts() {
        let consumes = Consumes::json();
        assert!(consumes.accepts("application/json; charset=utf-8"));
        assert!(!consumes.accepts("text/plain"));
        assert!(Consumes::default().accepts("anything/else"));
    }

    #[test]
    fn test_produces_shapes() {
        assert!(Produces::json().is_structured());
        assert!(!Produces::text().is_structured());
        assert_eq!(Produces::page(["application/json"]).shape, ResponseShape::Page);
        assert_eq!(Produces::error(404, "text/plain").status, 404);
    }
}
