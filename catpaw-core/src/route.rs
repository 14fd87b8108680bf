// Route definitions

use crate::attributes::{Consumes, OnRequest, OnResponse, Produces};
use crate::dependencies::{Arguments, Parameter};
use crate::error::Result;
use crate::response::Response;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future returned by a route handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Response>> + Send>>;

/// A route handler function type
pub type HandlerFn = Arc<dyn Fn(Arguments) -> HandlerFuture + Send + Sync>;

/// Route definition with handler and declared parameters
#[derive(Clone)]
pub struct Route {
    pub method: String,
    pub path: String,
    pub handler: HandlerFn,
    pub parameters: Vec<Parameter>,
    pub on_request: Vec<Arc<dyn OnRequest>>,
    pub on_response: Vec<Arc<dyn OnResponse>>,
    pub consumes: Option<Consumes>,
    pub produces: Vec<Produces>,
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub operation_id: Option<String>,
    pub ignore_open_api: bool,
    pub ignore_describe: bool,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("parameters", &self.parameters)
            .field("consumes", &self.consumes)
            .field("produces", &self.produces)
            .field("tags", &self.tags)
            .finish()
    }
}

impl Route {
    /// Start building a route.
    pub fn builder(method: impl Into<String>, path: impl Into<String>) -> RouteBuilder {
        RouteBuilder::new(method, path)
    }

    pub fn get(path: impl Into<String>) -> RouteBuilder {
        RouteBuilder::new("GET", path)
    }

    pub fn post(path: impl Into<String>) -> RouteBuilder {
        RouteBuilder::new("POST", path)
    }

    pub fn put(path: impl Into<String>) -> RouteBuilder {
        RouteBuilder::new("PUT", path)
    }

    pub fn patch(path: impl Into<String>) -> RouteBuilder {
        RouteBuilder::new("PATCH", path)
    }

    pub fn delete(path: impl Into<String>) -> RouteBuilder {
        RouteBuilder::new("DELETE", path)
    }

    /// `"METHOD:path"`, the cache key of the route.
    pub fn key(&self) -> String {
        format!("{}:{}", self.method, self.path)
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Whether any `Produces` entry asks for structured item/page bodies.
    pub fn is_structured(&self) -> bool {
        self.produces.iter().any(Produces::is_structured)
    }

    /// Same route under a different path.
    pub fn with_path(&self, path: impl Into<String>) -> Self {
        let mut route = self.clone();
        route.path = path.into();
        route
    }
}

/// Fluent construction of a [`Route`].
///
/// ```
/// use catpaw_core::{Parameter, Param, Route, success};
///
/// let route = Route::get("/users/{id}")
///     .parameter(Parameter::int("id").with_attribute(Param::new()))
///     .tag("users")
///     .handler(|args| async move {
///         let id: i64 = args.get("id")?;
///         Ok(success(id))
///     });
/// assert_eq!(route.key(), "GET:/users/{id}");
/// ```
pub struct RouteBuilder {
    method: String,
    path: String,
    parameters: Vec<Parameter>,
    on_request: Vec<Arc<dyn OnRequest>>,
    on_response: Vec<Arc<dyn OnResponse>>,
    consumes: Option<Consumes>,
    produces: Vec<Produces>,
    tags: Vec<String>,
    summary: Option<String>,
    description: Option<String>,
    operation_id: Option<String>,
    ignore_open_api: bool,
    ignore_describe: bool,
}

impl RouteBuilder {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            path: path.into(),
            parameters: Vec::new(),
            on_request: Vec::new(),
            on_response: Vec::new(),
            consumes: None,
            produces: Vec::new(),
            tags: Vec::new(),
            summary: None,
            description: None,
            operation_id: None,
            ignore_open_api: false,
            ignore_describe: false,
        }
    }

    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn parameters(mut self, parameters: impl IntoIterator<Item = Parameter>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    pub fn on_request(mut self, hook: impl OnRequest + 'static) -> Self {
        self.on_request.push(Arc::new(hook));
        self
    }

    pub fn on_response(mut self, hook: impl OnResponse + 'static) -> Self {
        self.on_response.push(Arc::new(hook));
        self
    }

    pub fn consumes(mut self, consumes: Consumes) -> Self {
        self.consumes = Some(consumes);
        self
    }

    pub fn produces(mut self, produces: Produces) -> Self {
        self.produces.push(produces);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    pub fn ignore_open_api(mut self) -> Self {
        self.ignore_open_api = true;
        self
    }

    pub fn ignore_describe(mut self) -> Self {
        self.ignore_describe = true;
        self
    }

    /// Finish the route with an async handler.
    pub fn handler<F, Fut, R>(self, handler: F) -> Route
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
        R: Into<Response> + Send + 'static,
    {
        let handler: HandlerFn = Arc::new(move |arguments| {
            let future = handler(arguments);
            Box::pin(async move { future.await.map(Into::into) })
        });
        self.handler_fn(handler)
    }

    pub fn handler_fn(self, handler: HandlerFn) -> Route {
        Route {
            method: self.method,
            path: self.path,
            handler,
            parameters: self.parameters,
            on_request: self.on_request,
            on_response: self.on_response,
            consumes: self.consumes,
            produces: self.produces,
            tags: self.tags,
            summary: self.summary,
            description: self.description,
            operation_id: self.operation_id,
            ignore_open_api: self.ignore_open_api,
            ignore_describe: self.ignore_describe,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::success;

    #[tokio::test]
    async fn test_builder_and_handler() {
        let route = Route::post("/echo")
            .parameter(Parameter::string("name"))
            .produces(Produces::json())
            .summary("Echo a name")
            .handler(|args| async move {
                let name: String = args.get("name")?;
                Ok(success(format!("hello {name}")))
            });

        assert_eq!(route.method, "POST");
        assert_eq!(route.key(), "POST:/echo");
        assert!(route.is_structured());
        assert!(route.parameter("name").is_some());

        let response = (route.handler)(Arguments::new().with("name", "cat")).await.unwrap();
        assert_eq!(response.status(), 200);
    }

    #[test]
    fn test_method_is_uppercased() {
        let route = RouteBuilder::new("get", "/").handler(|_| async { Ok(success("ok")) });
        assert_eq!(route.method, "GET");
        assert_eq!(route.with_path("/home").key(), "GET:/home");
    }
}
