// Top level request dispatch

use crate::error::{Error, reason_phrase};
use crate::file_server::FileServer;
use crate::http::{HttpRequest, HttpResponse};
use crate::logging::error;
use crate::route_resolver::RouteResolver;
use std::sync::Arc;

/// Dispatches a request to the routes, then to the file server.
///
/// Never fails: errors are logged and answered with `500`.
///
/// ```
/// use catpaw_core::*;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let mut router = Router::new();
/// router
///     .add_handler(Route::get("/ping").handler(|_| async { Ok(success("pong")) }))
///     .unwrap();
/// let handler = RequestHandler::new(RouteResolver::new(Arc::new(router), Invoker::new(Container::new())));
///
/// assert_eq!(handler.handle(HttpRequest::new("GET", "/ping")).await.text(), "pong");
/// assert_eq!(handler.handle(HttpRequest::new("GET", "/nope")).await.status, 404);
/// # });
/// ```
#[derive(Clone)]
pub struct RequestHandler {
    resolver: RouteResolver,
    file_server: Option<Arc<dyn FileServer>>,
    expose_errors: bool,
}

impl std::fmt::Debug for RequestHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandler")
            .field("resolver", &self.resolver)
            .field("file_server", &self.file_server.is_some())
            .field("expose_errors", &self.expose_errors)
            .finish()
    }
}

impl RequestHandler {
    pub fn new(resolver: RouteResolver) -> Self {
        Self {
            resolver,
            file_server: None,
            expose_errors: false,
        }
    }

    pub fn with_file_server(mut self, file_server: Arc<dyn FileServer>) -> Self {
        self.file_server = Some(file_server);
        self
    }

    /// Append error details to `500` responses.
    pub fn with_expose_errors(mut self, expose_errors: bool) -> Self {
        self.expose_errors = expose_errors;
        self
    }

    pub fn resolver(&self) -> &RouteResolver {
        &self.resolver
    }

    pub async fn handle(&self, request: HttpRequest) -> HttpResponse {
        let request = Arc::new(request);
        let method = request.method.clone();
        let path = request.path.clone();

        match self.dispatch(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(method = %method, path = %path, error = %e, "Request failed");
                self.internal_server_error(&e)
            }
        }
    }

    async fn dispatch(&self, request: Arc<HttpRequest>) -> crate::error::Result<HttpResponse> {
        if let Some(response) = self.resolver.resolve(request.clone()).await? {
            return Ok(response);
        }
        match &self.file_server {
            Some(file_server) => file_server.serve(&request).await,
            None => crate::response::failure("", 404).render(),
        }
    }

    fn internal_server_error(&self, error: &Error) -> HttpResponse {
        let mut message = reason_phrase(500).to_string();
        if self.expose_errors {
            message.push('\n');
            message.push_str(&error.to_string());
        }
        HttpResponse::internal_server_error().with_text(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;
    use crate::invoker::Invoker;
    use crate::response::success;
    use crate::route::Route;
    use crate::router::Router;

    fn handler(expose_errors: bool) -> RequestHandler {
        let mut router = Router::new();
        router
            .add_handler(Route::get("/hello").handler(|_| async { Ok(success("hi")) }))
            .unwrap();
        router
            .add_handler(
                Route::get("/boom")
                    .handler(|_| async { Err::<crate::response::Response, _>(Error::Handler("kaboom".into())) }),
            )
            .unwrap();
        let resolver = RouteResolver::new(Arc::new(router), Invoker::new(Container::new()));
        RequestHandler::new(resolver).with_expose_errors(expose_errors)
    }

    #[tokio::test]
    async fn test_routes_and_not_found() {
        let handler = handler(false);
        assert_eq!(handler.handle(HttpRequest::new("GET", "/hello")).await.text(), "hi");
        let missing = handler.handle(HttpRequest::new("GET", "/missing")).await;
        assert_eq!(missing.status, 404);
        assert_eq!(missing.text(), "Not Found");
    }

    #[tokio::test]
    async fn test_errors_become_500() {
        let response = handler(false).handle(HttpRequest::new("GET", "/boom")).await;
        assert_eq!(response.status, 500);
        assert_eq!(response.text(), "Internal Server Error");

        let response = handler(true).handle(HttpRequest::new("GET", "/boom")).await;
        assert!(response.text().contains("kaboom"));
    }
}
