//! OpenAPI 3 documents for CatPaw applications
//!
//! The document is built from the routes of a [`Router`](catpaw_core::Router):
//! path placeholders, `Query` and `Header` parameters, pages, `Consumes`
//! bodies and `Produces` responses all end up in it.
//!
//! ```
//! use catpaw_core::{Param, Parameter, Produces, Route, Router, success};
//! use catpaw_openapi::OpenApiBuilder;
//!
//! let mut router = Router::new();
//! router
//!     .add_handler(
//!         Route::get("/cats/{id}")
//!             .parameter(Parameter::int("id").with_attribute(Param::new()))
//!             .produces(Produces::json())
//!             .summary("Find a cat")
//!             .handler(|_| async { Ok(success("Tom")) }),
//!     )
//!     .unwrap();
//!
//! let spec = OpenApiBuilder::from_router(&router).title("Cats").build();
//! let operation = spec.operation("get", "/cats/{id}").unwrap();
//! assert_eq!(operation.summary.as_deref(), Some("Find a cat"));
//! assert!(spec.to_json().unwrap().contains("\"operationId\": \"getCatsId\""));
//! ```

pub mod builder;
pub mod error;
pub mod schema;
pub mod serve;
pub mod spec;

pub use builder::*;
pub use error::{OpenApiError, Result};
pub use serve::document_route;
pub use spec::*;

impl OpenApiSpec {
    /// Pretty printed JSON document.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| OpenApiError::Serialization(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| OpenApiError::Serialization(e.to_string()))
    }

    pub fn to_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| OpenApiError::Serialization(e.to_string()))
    }
}
