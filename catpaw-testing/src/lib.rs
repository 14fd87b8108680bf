//! Testing utilities for CatPaw applications.
//!
//! Requests go straight to the application's
//! [`RequestHandler`](catpaw_core::RequestHandler), no socket involved.
//! The [`TestClient`] keeps cookies between calls, so session state
//! carries over like it would in a browser.
//!
//! ```
//! use catpaw_core::{Route, success};
//! use catpaw_testing::*;
//!
//! # tokio_test::block_on(async {
//! let app = TestAppBuilder::new()
//!     .add_handler(Route::get("/hello").handler(|_| async { Ok(success("Hello!")) }))
//!     .build()
//!     .unwrap();
//!
//! let response = app.client().get("/hello").await;
//! assert_status(&response, 200);
//! assert_eq!(response.text(), "Hello!");
//! # });
//! ```

mod assertions;
mod test_app;
mod test_client;

pub use assertions::{
    assert_body_contains, assert_client_error, assert_cookie, assert_header, assert_json,
    assert_json_content_type, assert_server_error, assert_status, assert_success,
};
pub use test_app::{TestApp, TestAppBuilder};
pub use test_client::{TestClient, TestRequestBuilder, TestResponse};
