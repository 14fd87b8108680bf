// Request to route resolution

use crate::error::Result;
use crate::http::{HttpRequest, HttpResponse};
use crate::invoker::Invoker;
use crate::logging::{debug, trace};
use crate::path_resolver::PathResolverCache;
use crate::request_context::RequestContext;
use crate::router::Router;
use std::sync::Arc;

/// Matches requests against the registered routes and invokes the winner.
#[derive(Debug, Clone)]
pub struct RouteResolver {
    router: Arc<Router>,
    cache: PathResolverCache,
    invoker: Invoker,
}

impl RouteResolver {
    pub fn new(router: Arc<Router>, invoker: Invoker) -> Self {
        Self {
            router,
            cache: PathResolverCache::new(),
            invoker,
        }
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    /// Find the route matching `request`.
    ///
    /// When the decoded path matches nothing, the same path with its
    /// trailing slash removed (or added) is tried once.
    pub fn find_context(&self, request: Arc<HttpRequest>) -> Result<Option<RequestContext>> {
        let path = urlencoding::decode(&request.path)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| request.path.clone());

        if let Some(context) = self.match_path(&request, &path)? {
            return Ok(Some(context));
        }

        let alternative = match path.strip_suffix('/') {
            Some(stripped) if !stripped.is_empty() => stripped.to_string(),
            Some(_) => return Ok(None),
            None => format!("{path}/"),
        };
        trace!(path = %path, alternative = %alternative, "Trying trailing slash variant");
        self.match_path(&request, &alternative)
    }

    fn match_path(&self, request: &Arc<HttpRequest>, path: &str) -> Result<Option<RequestContext>> {
        for route in self.router.routes_for(&request.method) {
            let resolver = self
                .cache
                .get_or_compile(&route.method, &route.path, &route.parameters)?;
            if let Some(found) = resolver.find_matching_path_parameters(path) {
                debug!(route = %route.key(), path, "Route matched");
                let context = RequestContext::new(route.clone(), request.clone())
                    .with_path_parameters(found.parameters)
                    .with_bad_request_entries(found.bad_request_entries);
                return Ok(Some(context));
            }
        }
        Ok(None)
    }

    /// Resolve and invoke; `None` when no route matches.
    pub async fn resolve(&self, request: impl Into<Arc<HttpRequest>>) -> Result<Option<HttpResponse>> {
        let Some(context) = self.find_context(request.into())? else {
            return Ok(None);
        };
        self.invoker.invoke(context).await.map(Some)
    }

    /// Number of compiled path resolvers.
    pub fn cached_resolvers(&self) -> usize {
        self.cache.len()
    }
}
