//! Serving the document over HTTP

use crate::spec::OpenApiSpec;
use catpaw_core::{Accepts, Parameter, Route, success};
use std::sync::Arc;

/// A `GET` route answering with `spec`.
///
/// JSON by default, YAML when the client asks for `application/yaml`.
/// The route itself is left out of generated documents.
///
/// ```
/// use catpaw_core::*;
/// use catpaw_openapi::{OpenApiBuilder, document_route};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let mut router = Router::new();
/// let spec = OpenApiBuilder::new("Cats", "1.0.0").build();
/// router.add_handler(document_route("/openapi", spec)).unwrap();
///
/// let handler = RequestHandler::new(RouteResolver::new(Arc::new(router), Invoker::new(Container::new())));
/// let response = handler.handle(HttpRequest::new("GET", "/openapi")).await;
/// assert!(response.text().contains("\"title\":\"Cats\""));
/// # });
/// ```
pub fn document_route(path: impl Into<String>, spec: OpenApiSpec) -> Route {
    let spec = Arc::new(spec);
    Route::get(path)
        .parameter(Parameter::of::<Accepts>("accepts"))
        .ignore_open_api()
        .ignore_describe()
        .handler(move |args| {
            let spec = spec.clone();
            async move {
                let accepts: Arc<Accepts> = args.get("accepts")?;
                let wants_yaml = accepts
                    .entries()
                    .iter()
                    .any(|entry| entry.contains("yaml"));
                if wants_yaml {
                    return Ok(success(spec.to_yaml()?).as_type("application/yaml"));
                }
                Ok(success(spec.to_value()?).as_json())
            }
        })
}
