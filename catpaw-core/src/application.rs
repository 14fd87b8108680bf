// Server bootstrap and HTTP accept loop

use crate::container::Container;
use crate::error::{Error, Result};
use crate::file_server::{FileServer, SimpleFileServer, SpaFileServer};
use crate::http::{HttpRequest, HttpResponse, ResponseBody};
use crate::invoker::Invoker;
use crate::logging::{debug, error, info, warn};
use crate::request_handler::RequestHandler;
use crate::route::Route;
use crate::route_resolver::RouteResolver;
use crate::router::{Controller, Router};
use bytes::Bytes;
use catpaw_session::SessionStore;
use futures_util::TryStreamExt;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, LengthLimitError, Limited, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::header::SET_COOKIE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::StatusCode;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, watch};

pub const DEFAULT_INTERFACE: &str = "127.0.0.1:8080";
pub const DEFAULT_MAX_CONNECTIONS: usize = 1024;
pub const DEFAULT_MAX_BODY_SIZE: u64 = crate::body_parser::DEFAULT_BODY_SIZE_LIMIT;
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

type HyperBody = UnsyncBoxBody<Bytes, std::io::Error>;

/// Server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address to listen on, `host:port`.
    pub interface: String,
    /// Prefix of the API routes; SPA fallbacks never apply below it.
    pub api_prefix: String,
    /// Directory of static files; `None` disables file serving.
    pub statics_location: Option<PathBuf>,
    /// Serve `index.html` for unknown non-API paths.
    pub spa: bool,
    pub max_connections: usize,
    /// Largest accepted request body, in bytes.
    pub max_body_size: u64,
    /// Append error details to `500` responses.
    pub expose_errors: bool,
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            interface: DEFAULT_INTERFACE.to_string(),
            api_prefix: "/".to_string(),
            statics_location: None,
            spa: false,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            expose_errors: false,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = interface.into();
        self
    }

    pub fn with_api_prefix(mut self, api_prefix: impl Into<String>) -> Self {
        self.api_prefix = api_prefix.into();
        self
    }

    pub fn with_statics_location(mut self, statics_location: impl Into<PathBuf>) -> Self {
        self.statics_location = Some(statics_location.into());
        self
    }

    pub fn with_spa(mut self, spa: bool) -> Self {
        self.spa = spa;
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    pub fn with_max_body_size(mut self, max_body_size: u64) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    pub fn with_expose_errors(mut self, expose_errors: bool) -> Self {
        self.expose_errors = expose_errors;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Stops a running server.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`shutdown`](Self::shutdown) has been called.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

/// The application server: routes, container, sessions and static files.
pub struct Server {
    config: ServerConfig,
    container: Container,
    router: Router,
    session_store: Option<Arc<dyn SessionStore>>,
    file_server: Option<Arc<dyn FileServer>>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            container: Container::new(),
            router: Router::new(),
            session_store: None,
            file_server: None,
        }
    }

    pub fn with_container(mut self, container: Container) -> Self {
        self.container = container;
        self
    }

    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Replace the file server derived from the configuration.
    pub fn with_file_server(mut self, file_server: Arc<dyn FileServer>) -> Self {
        self.file_server = Some(file_server);
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    pub fn add_handler(&mut self, route: Route) -> Result<&mut Self> {
        self.router.add_handler(route)?;
        Ok(self)
    }

    pub fn add_controller<C: Controller + ?Sized>(&mut self, controller: &C) -> Result<&mut Self> {
        self.router.add_controller(controller)?;
        Ok(self)
    }

    /// Request handler over the routes registered so far.
    pub fn request_handler(&self) -> RequestHandler {
        let mut invoker = Invoker::new(self.container.clone());
        if let Some(store) = &self.session_store {
            invoker = invoker.with_session_store(store.clone());
        }

        let resolver = RouteResolver::new(Arc::new(self.router.clone()), invoker);
        let mut handler = RequestHandler::new(resolver).with_expose_errors(self.config.expose_errors);

        let file_server = self.file_server.clone().or_else(|| {
            let www = self.config.statics_location.clone()?;
            let server: Arc<dyn FileServer> = if self.config.spa {
                Arc::new(SpaFileServer::new(Some(www), self.config.api_prefix.clone()))
            } else {
                Arc::new(SimpleFileServer::new(Some(www)))
            };
            Some(server)
        });
        if let Some(file_server) = file_server {
            handler = handler.with_file_server(file_server);
        }
        handler
    }

    /// Listen on the configured interface until Ctrl-C.
    pub async fn start(self) -> Result<()> {
        let shutdown = ShutdownHandle::new();
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl-C, shutting down");
                trigger.shutdown();
            }
        });
        self.start_with_shutdown(shutdown).await
    }

    pub async fn start_with_shutdown(self, shutdown: ShutdownHandle) -> Result<()> {
        let listener = TcpListener::bind(&self.config.interface).await?;
        self.serve(listener, shutdown).await
    }

    /// Accept connections on `listener` until `shutdown` fires, then wait
    /// for open connections up to the configured timeout.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownHandle) -> Result<()> {
        let address = listener.local_addr()?;
        info!(address = %address, routes = self.router.len(), "Server listening");
        for route in self.router.describe() {
            info!(route = %route, "Serving route");
        }

        let handler = Arc::new(self.request_handler());
        let max_body_size = usize::try_from(self.config.max_body_size).unwrap_or(usize::MAX);
        let permits = Arc::new(Semaphore::new(self.config.max_connections.max(1)));
        let graceful = GracefulShutdown::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, remote) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!(error = %e, "Failed to accept connection");
                            continue;
                        }
                    };
                    let permit = permits
                        .clone()
                        .acquire_owned()
                        .await
                        .map_err(|e| Error::Server(e.to_string()))?;

                    let handler = handler.clone();
                    let service = service_fn(move |request| {
                        let handler = handler.clone();
                        async move { Ok::<_, Infallible>(handle(request, &handler, max_body_size).await) }
                    });
                    let connection = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
                    let connection = graceful.watch(connection);

                    tokio::spawn(async move {
                        if let Err(e) = connection.await {
                            debug!(remote = %remote, error = %e, "Connection closed with error");
                        }
                        drop(permit);
                    });
                }
                _ = shutdown.wait() => {
                    info!("Server stopped accepting connections");
                    break;
                }
            }
        }

        drop(listener);
        tokio::select! {
            _ = graceful.shutdown() => info!("All connections closed"),
            _ = tokio::time::sleep(self.config.shutdown_timeout) => {
                warn!(timeout = ?self.config.shutdown_timeout, "Timed out waiting for connections to close");
            }
        }
        Ok(())
    }
}

async fn handle(request: hyper::Request<Incoming>, handler: &RequestHandler, max_body_size: usize) -> hyper::Response<HyperBody> {
    let started = Instant::now();
    let request = match from_hyper(request, max_body_size).await {
        Ok(request) => request,
        Err(status) => {
            let mut response = hyper::Response::new(full(Bytes::from(status.canonical_reason().unwrap_or_default())));
            *response.status_mut() = status;
            return response;
        }
    };

    let method = request.method.clone();
    let path = request.path.clone();
    let response = handler.handle(request).await;
    debug!(
        method = %method,
        path = %path,
        status = response.status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Request handled"
    );
    into_hyper(response)
}

async fn from_hyper(request: hyper::Request<Incoming>, max_body_size: usize) -> std::result::Result<HttpRequest, StatusCode> {
    let (parts, body) = request.into_parts();
    let target = parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let mut converted = HttpRequest::new(parts.method.as_str(), target);

    for (name, value) in &parts.headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        let separator = if name == hyper::header::COOKIE { "; " } else { ", " };
        converted
            .headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(separator);
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    let body = Limited::new(body, max_body_size).collect().await.map_err(|e| {
        if e.downcast_ref::<LengthLimitError>().is_some() {
            StatusCode::PAYLOAD_TOO_LARGE
        } else {
            StatusCode::BAD_REQUEST
        }
    })?;
    converted.body = body.to_bytes().to_vec();
    Ok(converted)
}

fn into_hyper(response: HttpResponse) -> hyper::Response<HyperBody> {
    let mut builder = hyper::Response::builder().status(response.status);
    for (key, value) in &response.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    for cookie in &response.cookies {
        builder = builder.header(SET_COOKIE, cookie.to_header_value());
    }

    let body = match response.body {
        ResponseBody::Empty => empty(),
        ResponseBody::Full(bytes) => full(bytes),
        ResponseBody::Stream(stream) => StreamBody::new(stream.map_ok(Frame::data)).boxed_unsync(),
    };

    builder.body(body).unwrap_or_else(|e| {
        error!(error = %e, "Invalid response");
        let mut response = hyper::Response::new(empty());
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}

fn empty() -> HyperBody {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed_unsync()
}

fn full(bytes: Bytes) -> HyperBody {
    Full::new(bytes).map_err(|never| match never {}).boxed_unsync()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::success;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.interface, "127.0.0.1:8080");
        assert_eq!(config.api_prefix, "/");
        assert!(config.statics_location.is_none());
        assert!(!config.expose_errors);
    }

    #[tokio::test]
    async fn test_shutdown_handle() {
        let handle = ShutdownHandle::new();
        assert!(!handle.is_shutdown());
        let waiter = handle.clone();
        let task = tokio::spawn(async move { waiter.wait().await });
        handle.shutdown();
        task.await.unwrap();
        assert!(handle.is_shutdown());
    }

    #[tokio::test]
    async fn test_serves_over_tcp() {
        let mut server = Server::new(ServerConfig::default().with_shutdown_timeout(Duration::from_secs(1)));
        server
            .add_handler(Route::get("/hello").handler(|_| async { Ok(success("hi")) }))
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let shutdown = ShutdownHandle::new();
        let running = tokio::spawn(server.serve(listener, shutdown.clone()));

        let mut stream = tokio::net::TcpStream::connect(address).await.unwrap();
        stream
            .write_all(b"GET /hello HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();

        assert!(raw.starts_with("HTTP/1.1 200 OK"));
        assert!(raw.ends_with("hi"));

        shutdown.shutdown();
        running.await.unwrap().unwrap();
    }
}
