//! Static file serving.
//!
//! [`SimpleFileServer`] maps request paths onto a statics directory and
//! answers 404 for anything missing. [`SpaFileServer`] serves `index.html`
//! instead, so client side routers can own every non-API path.

use crate::byte_range::ByteRangeService;
use crate::error::Result;
use crate::http::{HttpRequest, HttpResponse};
use crate::logging::{debug, trace};
use crate::mime::{find_content_type, is_attachment};
use crate::response::failure;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio_util::io::ReaderStream;

pub const DEFAULT_FALLBACK: &str = "index.html";

/// Serves requests the routes did not handle.
#[async_trait]
pub trait FileServer: Send + Sync {
    async fn serve(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Files from a statics location, 404 when missing.
#[derive(Debug, Clone)]
pub struct SimpleFileServer {
    www: Option<PathBuf>,
    fallback: String,
}

impl SimpleFileServer {
    pub fn new(www: Option<PathBuf>) -> Self {
        Self {
            www,
            fallback: DEFAULT_FALLBACK.to_string(),
        }
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    pub fn www(&self) -> Option<&Path> {
        self.www.as_deref()
    }

    /// Serve `request`; with `spa_api_prefix` set, non-API paths that name a
    /// directory or a missing file serve the fallback file instead.
    async fn serve_with(&self, request: &HttpRequest, spa_api_prefix: Option<&str>) -> Result<HttpResponse> {
        let path = urlencoding::decode(&request.path)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| request.path.clone());

        let Some(www) = &self.www else {
            return not_found();
        };
        if path.contains("../") {
            debug!(path = %path, "Rejected path traversal");
            return not_found();
        }

        let mut file_name = www.join(path.trim_start_matches('/'));
        if let Some(api_prefix) = spa_api_prefix
            && !within_prefix(&path, api_prefix)
            && (is_dir(&file_name).await || !is_file(&file_name).await)
        {
            file_name = www.join(&self.fallback);
        }
        trace!(path = %path, file = %file_name.display(), "Serving static file");

        if is_dir(&file_name).await {
            if path.ends_with('/') && is_file(&file_name.join(&self.fallback)).await {
                return Ok(HttpResponse::found(format!("{path}{}", self.fallback)));
            }
            if is_file(&file_name.join(&self.fallback)).await {
                return Ok(HttpResponse::found(format!("{path}/{}", self.fallback)));
            }
        }

        if !is_file(&file_name).await {
            return not_found();
        }

        let display_name = file_name.to_string_lossy().into_owned();
        let attachment = is_attachment(&display_name);

        if let Some(range) = request.header("Range") {
            match ByteRangeService::file(&file_name, range).await {
                Ok(response) => return Ok(with_attachment(response, attachment, &path)),
                Err(e) => debug!(error = %e, "Falling back to full file response"),
            }
        }

        let file = tokio::fs::File::open(&file_name).await?;
        let size = file.metadata().await?.len();
        let response = HttpResponse::ok()
            .with_header("Accept-Ranges", "bytes")
            .with_header("Content-Type", find_content_type(&display_name))
            .with_header("Content-Length", size.to_string())
            .with_stream(Box::pin(ReaderStream::new(file)));
        Ok(with_attachment(response, attachment, &path))
    }
}

#[async_trait]
impl FileServer for SimpleFileServer {
    async fn serve(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.serve_with(request, None).await
    }
}

/// Single page application server.
///
/// Paths under `api_prefix` behave like [`SimpleFileServer`]; any other path
/// naming a directory or a missing file serves `index.html`. An empty or `/`
/// prefix reserves nothing for the API.
#[derive(Debug, Clone)]
pub struct SpaFileServer {
    inner: SimpleFileServer,
    api_prefix: String,
}

impl SpaFileServer {
    pub fn new(www: Option<PathBuf>, api_prefix: impl Into<String>) -> Self {
        Self {
            inner: SimpleFileServer::new(www),
            api_prefix: api_prefix.into(),
        }
    }
}

#[async_trait]
impl FileServer for SpaFileServer {
    async fn serve(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.inner
            .serve_with(request, Some(&self.api_prefix))
            .await
    }
}

/// Whether `path` lies under `prefix`, compared on whole segments.
fn within_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return false;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn not_found() -> Result<HttpResponse> {
    failure("", 404).render()
}

fn with_attachment(response: HttpResponse, attachment: bool, path: &str) -> HttpResponse {
    if !attachment {
        return response;
    }
    let base_name = path.rsplit('/').next().unwrap_or(path);
    let escaped = base_name.replace('\\', "\\\\").replace('"', "\\\"");
    response
        .with_header("Content-Disposition", format!("attachment; filename=\"{escaped}\""))
        .with_header("Content-Type", "application/octet-stream")
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn statics() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        std::fs::write(dir.path().join("style.css"), "body{}").unwrap();
        std::fs::write(dir.path().join("data.zip"), "PK").unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs").join("index.html"), "docs").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_serves_file() {
        let dir = statics();
        let server = SimpleFileServer::new(Some(dir.path().to_path_buf()));
        let response = server.serve(&HttpRequest::new("GET", "/style.css")).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.header("Content-Type"), Some("text/css"));
        assert_eq!(response.header("Content-Length"), Some("6"));
        assert_eq!(response.header("Accept-Ranges"), Some("bytes"));
        assert_eq!(&response.into_bytes().await.unwrap()[..], b"body{}");
    }

    #[tokio::test]
    async fn test_directory_redirects_to_index() {
        let dir = statics();
        let server = SimpleFileServer::new(Some(dir.path().to_path_buf()));

        let response = server.serve(&HttpRequest::new("GET", "/docs")).await.unwrap();
        assert_eq!(response.status, 302);
        assert_eq!(response.header("Location"), Some("/docs/index.html"));

        let response = server.serve(&HttpRequest::new("GET", "/docs/")).await.unwrap();
        assert_eq!(response.header("Location"), Some("/docs/index.html"));
    }

    #[tokio::test]
    async fn test_missing_and_traversal_are_not_found() {
        let dir = statics();
        let server = SimpleFileServer::new(Some(dir.path().to_path_buf()));
        assert_eq!(server.serve(&HttpRequest::new("GET", "/nope.js")).await.unwrap().status, 404);
        assert_eq!(server.serve(&HttpRequest::new("GET", "/docs/../../etc/passwd")).await.unwrap().status, 404);
        assert_eq!(
            SimpleFileServer::new(None).serve(&HttpRequest::new("GET", "/style.css")).await.unwrap().status,
            404
        );
    }

    #[tokio::test]
    async fn test_attachment_headers() {
        let dir = statics();
        let server = SimpleFileServer::new(Some(dir.path().to_path_buf()));
        let response = server.serve(&HttpRequest::new("GET", "/data.zip")).await.unwrap();
        assert_eq!(
            response.header("Content-Disposition"),
            Some("attachment; filename=\"data.zip\"")
        );
        assert_eq!(response.header("Content-Type"), Some("application/octet-stream"));
    }

    #[tokio::test]
    async fn test_range_request() {
        let dir = statics();
        let server = SimpleFileServer::new(Some(dir.path().to_path_buf()));
        let request = HttpRequest::new("GET", "/style.css").with_header("Range", "bytes=0-3");
        let response = server.serve(&request).await.unwrap();
        assert_eq!(response.status, 206);
        assert_eq!(&response.into_bytes().await.unwrap()[..], b"body");
    }

    #[tokio::test]
    async fn test_spa_serves_index_for_unknown_paths() {
        let dir = statics();
        let server = SpaFileServer::new(Some(dir.path().to_path_buf()), "/api");

        let response = server.serve(&HttpRequest::new("GET", "/settings/profile")).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(&response.into_bytes().await.unwrap()[..], b"<h1>home</h1>");

        let response = server.serve(&HttpRequest::new("GET", "/api/missing")).await.unwrap();
        assert_eq!(response.status, 404);

        let response = server.serve(&HttpRequest::new("GET", "/apiary")).await.unwrap();
        assert_eq!(&response.into_bytes().await.unwrap()[..], b"<h1>home</h1>");
    }

    #[tokio::test]
    async fn test_spa_with_default_prefix() {
        let dir = statics();
        let prefix = crate::application::ServerConfig::default().api_prefix;
        let server = SpaFileServer::new(Some(dir.path().to_path_buf()), prefix);

        let response = server.serve(&HttpRequest::new("GET", "/about")).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(&response.into_bytes().await.unwrap()[..], b"<h1>home</h1>");

        let response = server.serve(&HttpRequest::new("GET", "/style.css")).await.unwrap();
        assert_eq!(&response.into_bytes().await.unwrap()[..], b"body{}");
    }

    #[test]
    fn test_within_prefix() {
        assert!(within_prefix("/api", "/api"));
        assert!(within_prefix("/api/cats", "/api/"));
        assert!(!within_prefix("/apiary", "/api"));
        assert!(!within_prefix("/about", "/"));
        assert!(!within_prefix("/about", ""));
    }
}
