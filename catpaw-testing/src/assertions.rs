// Test assertions for HTTP responses

use crate::TestResponse;
use serde::de::DeserializeOwned;

/// Assert that a response has a specific status code
pub fn assert_status(response: &TestResponse, expected: u16) {
    assert_eq!(
        response.status, expected,
        "Expected status {}, got {}. Body: {}",
        expected,
        response.status,
        response.text()
    );
}

/// Assert that the body deserializes to `expected`
pub fn assert_json<T>(response: &TestResponse, expected: &T)
where
    T: DeserializeOwned + PartialEq + std::fmt::Debug,
{
    let actual: T = response
        .json()
        .unwrap_or_else(|e| panic!("{e}. Body: {}", response.text()));
    assert_eq!(actual, *expected, "JSON bodies do not match");
}

/// Assert that a response has a specific header
pub fn assert_header(response: &TestResponse, key: &str, expected: &str) {
    let actual = response.header(key);
    assert_eq!(
        actual,
        Some(expected),
        "Expected header '{}' to be '{}', got {:?}",
        key,
        expected,
        actual
    );
}

/// Assert that a response body contains a string
pub fn assert_body_contains(response: &TestResponse, expected: &str) {
    let body = response.text();
    assert!(
        body.contains(expected),
        "Expected body to contain '{}', but it didn't. Body: {}",
        expected,
        body
    );
}

/// Assert that a response is successful (2xx status)
pub fn assert_success(response: &TestResponse) {
    assert!(
        (200..300).contains(&response.status),
        "Expected successful status (2xx), got {}",
        response.status
    );
}

/// Assert that a response is a client error (4xx status)
pub fn assert_client_error(response: &TestResponse) {
    assert!(
        (400..500).contains(&response.status),
        "Expected client error status (4xx), got {}",
        response.status
    );
}

/// Assert that a response is a server error (5xx status)
pub fn assert_server_error(response: &TestResponse) {
    assert!(
        (500..600).contains(&response.status),
        "Expected server error status (5xx), got {}",
        response.status
    );
}

/// Assert that a response is JSON
pub fn assert_json_content_type(response: &TestResponse) {
    let content_type = response.header("Content-Type").unwrap_or_default();
    assert!(
        content_type.starts_with("application/json"),
        "Expected JSON content type, got '{}'",
        content_type
    );
}

/// Assert that a response set a cookie named `name`
pub fn assert_cookie(response: &TestResponse, name: &str) {
    assert!(
        response.cookie(name).is_some(),
        "Expected cookie '{}' to be set, got {:?}",
        name,
        response.cookies.iter().map(|c| c.key.as_str()).collect::<Vec<_>>()
    );
}
