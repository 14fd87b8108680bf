// Route method and path derived from a route file location

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

static FILE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(.*)[./]([^./]*)$").ok());

/// Method and path of a route file.
///
/// The file stem names the method and the directories leading to it name the
/// path, so `api/users/{id}/get.rs` under root `api` and prefix `/v1` is
/// `GET /v1/users/{id}`. A trailing `index` directory is dropped.
///
/// ```
/// use catpaw_core::Symbolics;
///
/// let symbolics =
///     Symbolics::from_root_and_prefix_and_file_name("./api", "/v1", "./api/users/{id}/get.rs").unwrap();
/// assert_eq!(symbolics.method, "GET");
/// assert_eq!(symbolics.path, "/v1/users/{id}");
///
/// let index = Symbolics::from_root_and_prefix_and_file_name("api", "", "api/index/post.rs").unwrap();
/// assert_eq!((index.method.as_str(), index.path.as_str()), ("POST", "/"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbolics {
    pub method: String,
    pub path: String,
}

impl Symbolics {
    pub fn from_root_and_prefix_and_file_name(root: &str, prefix: &str, file_name: &str) -> Result<Self> {
        let file_name = file_name.replace('\\', "/");
        let root = root.replace('\\', "/");

        let relative = match file_name.find(root.as_str()) {
            Some(offset) if !root.is_empty() => &file_name[offset + root.len()..],
            _ => file_name.as_str(),
        };
        let relative = relative.strip_suffix(".rs").unwrap_or(relative);
        let relative = format!("/{}", relative.trim_start_matches(['.', '/']));

        let pattern = FILE_PATTERN
            .as_ref()
            .ok_or_else(|| Error::Internal("Symbolic path pattern failed to compile".into()))?;
        let captures = pattern
            .captures(&relative)
            .ok_or_else(|| Error::InvalidRoutePath(format!("Invalid symbolic path for file `{file_name}`.")))?;

        let directory = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        let method = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
        if method.is_empty() {
            return Err(Error::InvalidRoutePath(format!(
                "Invalid symbolic path for file `{file_name}`."
            )));
        }

        let mut path = format!("{prefix}{directory}");
        while path.starts_with("//") {
            path.remove(0);
        }
        if let Some(stripped) = path.strip_suffix("/index") {
            path = stripped.to_string();
        }
        if path == "index" {
            path.clear();
        }
        if !path.starts_with('/') {
            path.insert(0, '/');
        }

        Ok(Self {
            method: method.to_ascii_uppercase(),
            path,
        })
    }
}
