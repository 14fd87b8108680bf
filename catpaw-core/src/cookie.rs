// Request and response cookies

use std::collections::HashMap;
use std::fmt;
use std::time::SystemTime;

/// A cookie sent with `Set-Cookie`.
///
/// Keys and values are percent-encoded when rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub key: String,
    pub value: String,
    pub expires: Option<SystemTime>,
    pub path: Option<String>,
    pub secure: bool,
    pub http_only: bool,
}

impl Cookie {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            expires: None,
            path: None,
            secure: false,
            http_only: false,
        }
    }

    pub fn with_expires(mut self, expires: SystemTime) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    /// Render the `Set-Cookie` header value.
    pub fn to_header_value(&self) -> String {
        let mut header = format!(
            "{}={}",
            urlencoding::encode(&self.key),
            urlencoding::encode(&self.value)
        );
        if let Some(expires) = self.expires {
            header.push_str("; Expires=");
            header.push_str(&httpdate::fmt_http_date(expires));
        }
        if let Some(path) = &self.path {
            header.push_str("; Path=");
            header.push_str(path);
        }
        if self.secure {
            header.push_str("; Secure");
        }
        if self.http_only {
            header.push_str("; HttpOnly");
        }
        header
    }

    /// Parse a request `Cookie` header into decoded key/value pairs.
    ///
    /// ```
    /// use catpaw_core::Cookie;
    ///
    /// let cookies = Cookie::parse_request_header("session-id=abc; theme=dark%20blue");
    /// assert_eq!(cookies.get("session-id").map(String::as_str), Some("abc"));
    /// assert_eq!(cookies.get("theme").map(String::as_str), Some("dark blue"));
    /// ```
    pub fn parse_request_header(header: &str) -> HashMap<String, String> {
        header
            .split(';')
            .filter_map(|pair| {
                let (key, value) = pair.trim().split_once('=')?;
                let key = urlencoding::decode(key.trim()).ok()?.into_owned();
                let value = urlencoding::decode(value.trim().trim_matches('"'))
                    .ok()?
                    .into_owned();
                (!key.is_empty()).then_some((key, value))
            })
            .collect()
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_header_value() {
        let cookie = Cookie::new("session-id", "a b")
            .with_expires(UNIX_EPOCH + Duration::from_secs(784111777))
            .secure()
            .http_only();
        assert_eq!(
            cookie.to_header_value(),
            "session-id=a%20b; Expires=Sun, 06 Nov 1994 08:49:37 GMT; Secure; HttpOnly"
        );
    }

    #[test]
    fn test_plain_cookie() {
        assert_eq!(Cookie::new("k", "v").to_string(), "k=v");
    }

    #[test]
    fn test_parse_ignores_malformed_pairs() {
        let cookies = Cookie::parse_request_header("a=1; broken; =x; b=2");
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies["b"], "2");
    }
}
