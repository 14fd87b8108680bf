// CatPaw - dependency injection and HTTP routing for Rust
//
// Handlers declare their parameters; the framework fills them from the
// request, the session and the service container, then renders whatever
// the handler returns.

// Re-export core functionality
pub use catpaw_core::*;

pub use catpaw_session as session_store;

// Hooks and attributes are async traits
pub use async_trait::async_trait;

// Re-export optional crates
#[cfg(feature = "config")]
pub use catpaw_config;

#[cfg(feature = "openapi")]
pub use catpaw_openapi;

#[cfg(feature = "testing")]
pub use catpaw_testing;

// Prelude for common imports
pub mod prelude {
    pub use crate::async_trait;
    pub use crate::logging::{LogConfig, LogFormat, LogLevel, debug, error, info, warn};
    pub use crate::{
        Accepts,
        Argument,
        Arguments,
        Consumes,
        Container,
        Controller,
        Error,
        Filter,
        Header,
        HttpRequest,
        HttpResponse,
        Order,
        Page,
        Param,
        Parameter,
        Produces,
        Provider,
        Query,
        RequestContext,
        RequestHandler,
        Response,
        Route,
        Router,
        Server,
        ServerConfig,
        SessionAttr,
        SessionHandle,
        ShutdownHandle,
        failure,
        success,
    };
    pub use catpaw_session::{MemorySessionStore, SessionConfig, SessionStore};

    #[cfg(feature = "config")]
    pub use catpaw_config::{ConfigManager, ConfigServiceBuilder, EnvironmentService};
}
