// The resolved match of a request against a route

use crate::http::HttpRequest;
use crate::route::Route;
use crate::session::SessionHandle;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct RequestContext {
    /// `"METHOD:path"` of the matched route.
    pub key: String,
    pub route: Arc<Route>,
    pub request: Arc<HttpRequest>,
    pub path_parameters: HashMap<String, String>,
    pub request_queries: HashMap<String, Value>,
    pub bad_request_entries: Vec<String>,
    pub session: Option<Arc<SessionHandle>>,
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("key", &self.key)
            .field("path_parameters", &self.path_parameters)
            .field("request_queries", &self.request_queries)
            .field("bad_request_entries", &self.bad_request_entries)
            .finish()
    }
}

impl RequestContext {
    pub fn new(route: Arc<Route>, request: Arc<HttpRequest>) -> Self {
        let request_queries = crate::query::parse_query_string(&request.query);
        Self {
            key: route.key(),
            route,
            request,
            path_parameters: HashMap::new(),
            request_queries,
            bad_request_entries: Vec::new(),
            session: None,
        }
    }

    pub fn with_path_parameters(mut self, path_parameters: HashMap<String, String>) -> Self {
        self.path_parameters = path_parameters;
        self
    }

    pub fn with_bad_request_entries(mut self, entries: Vec<String>) -> Self {
        self.bad_request_entries = entries;
        self
    }

    pub fn with_session(mut self, session: Arc<SessionHandle>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn path_parameter(&self, name: &str) -> Option<&str> {
        self.path_parameters.get(name).map(String::as_str)
    }

    pub fn query(&self, name: &str) -> Option<&Value> {
        self.request_queries.get(name)
    }

    pub fn is_bad_request(&self) -> bool {
        !self.bad_request_entries.is_empty()
    }
}
