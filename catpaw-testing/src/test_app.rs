// Test application builder

use crate::TestClient;
use catpaw_core::{
    Container, Controller, Error, FileServer, Provider, RequestHandler, Result, Route, Router,
    Server, ServerConfig,
};
use catpaw_session::{MemorySessionStore, SessionStore};
use std::sync::Arc;

/// Application assembled for a test, served in process.
pub struct TestApp {
    server: Server,
    handler: RequestHandler,
}

impl TestApp {
    /// Test application over an already configured server.
    pub fn from_server(server: Server) -> Self {
        let handler = server.request_handler();
        Self { server, handler }
    }

    pub fn container(&self) -> &Container {
        self.server.container()
    }

    pub fn router(&self) -> &Router {
        self.server.router()
    }

    pub fn handler(&self) -> &RequestHandler {
        &self.handler
    }

    /// New client with an empty cookie jar.
    pub fn client(&self) -> TestClient {
        TestClient::new(self.handler.clone())
    }
}

/// Builder for test applications
pub struct TestAppBuilder {
    config: ServerConfig,
    container: Container,
    router: Router,
    session_store: Option<Arc<dyn SessionStore>>,
    file_server: Option<Arc<dyn FileServer>>,
    error: Option<Error>,
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            container: Container::new(),
            router: Router::new(),
            session_store: None,
            file_server: None,
            error: None,
        }
    }

    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a provider
    pub fn register<T: Provider>(self, provider: T) -> Self {
        self.container.register(provider);
        self
    }

    pub fn with_container(mut self, container: Container) -> Self {
        self.container = container;
        self
    }

    pub fn with_router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    /// Add a route. A registration error is reported by [`build`](Self::build).
    pub fn add_handler(mut self, route: Route) -> Self {
        if let Err(e) = self.router.add_handler(route) {
            self.error.get_or_insert(e);
        }
        self
    }

    pub fn add_controller<C: Controller + ?Sized>(mut self, controller: &C) -> Self {
        if let Err(e) = self.router.add_controller(controller) {
            self.error.get_or_insert(e);
        }
        self
    }

    /// Keep sessions in memory.
    pub fn with_sessions(self) -> Self {
        self.with_session_store(Arc::new(MemorySessionStore::default()))
    }

    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    pub fn with_file_server(mut self, file_server: Arc<dyn FileServer>) -> Self {
        self.file_server = Some(file_server);
        self
    }

    pub fn build(self) -> Result<TestApp> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let mut server = Server::new(self.config).with_container(self.container);
        *server.router_mut() = self.router;
        if let Some(store) = self.session_store {
            server = server.with_session_store(store);
        }
        if let Some(file_server) = self.file_server {
            server = server.with_file_server(file_server);
        }
        Ok(TestApp::from_server(server))
    }
}
