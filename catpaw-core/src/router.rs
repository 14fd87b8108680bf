// Route registry

use crate::error::{Error, Result};
use crate::logging::{debug, info};
use crate::route::Route;
use crate::symbolics::Symbolics;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A group of routes sharing a base path.
pub trait Controller: Send + Sync {
    fn base_path(&self) -> &str;

    fn routes(&self) -> Vec<Route>;
}

/// Router for managing registered routes
///
/// Routes are kept in registration order and indexed by `"METHOD:path"`.
#[derive(Debug, Default, Clone)]
pub struct Router {
    routes: Vec<Arc<Route>>,
    index: HashMap<String, usize>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route.
    pub fn add_handler(&mut self, route: Route) -> Result<&mut Self> {
        if !route.path.starts_with('/') {
            return Err(Error::InvalidRoutePath(format!(
                "Handler paths must start with `/`, received `{}` instead.",
                route.path
            )));
        }

        let key = route.key();
        if self.index.contains_key(&key) {
            return Err(Error::RouteAlreadyExists(format!(
                "Trying to overwrite existing route at \"{key}\"."
            )));
        }

        let mut names = HashSet::new();
        for parameter in &route.parameters {
            if !names.insert(parameter.name.as_str()) {
                return Err(Error::DuplicateParameter {
                    route: key,
                    name: parameter.name.clone(),
                });
            }
            for attribute in &parameter.attributes {
                attribute.on_route_mount(&key, parameter)?;
            }
        }

        debug!(route = %key, parameters = route.parameters.len(), "Route registered");
        self.index.insert(key, self.routes.len());
        self.routes.push(Arc::new(route));
        Ok(self)
    }

    /// Register `route` and return the router, for chained setup.
    pub fn with_handler(mut self, route: Route) -> Result<Self> {
        self.add_handler(route)?;
        Ok(self)
    }

    /// Serve the route at `original` under `alias` too.
    pub fn add_handler_alias(&mut self, method: &str, original: &str, alias: &str) -> Result<&mut Self> {
        let method = method.to_ascii_uppercase();
        let route = self.find_route(&method, original).ok_or_else(|| {
            Error::RouteNotFound(format!(
                "Trying to create alias \"{alias}\" for route \"{method}:{original}\", but the original route was not found."
            ))
        })?;
        let aliased = route.with_path(alias);
        self.add_handler(aliased)
    }

    /// Register every route of a controller under its base path.
    pub fn add_controller<C: Controller + ?Sized>(&mut self, controller: &C) -> Result<&mut Self> {
        let base_path = controller.base_path();
        let routes = controller.routes();
        info!(base_path, routes = routes.len(), "Mounting controller");

        for route in routes {
            let path = join_paths(base_path, &route.path);
            self.add_handler(route.with_path(path))?;
        }
        Ok(self)
    }

    /// Register `route` at the method and path derived from a route file.
    ///
    /// The method and path declared on `route` are replaced.
    pub fn add_handler_from_file(
        &mut self,
        root: &str,
        prefix: &str,
        file_name: &str,
        mut route: Route,
    ) -> Result<&mut Self> {
        let symbolics = Symbolics::from_root_and_prefix_and_file_name(root, prefix, file_name)?;
        route.method = symbolics.method;
        route.path = symbolics.path;
        self.add_handler(route)
    }

    pub fn find_route(&self, method: &str, path: &str) -> Option<&Arc<Route>> {
        let key = format!("{}:{path}", method.to_ascii_uppercase());
        self.index.get(&key).and_then(|&i| self.routes.get(i))
    }

    pub fn routes_for<'a>(&'a self, method: &'a str) -> impl Iterator<Item = &'a Arc<Route>> + 'a {
        self.routes
            .iter()
            .filter(move |route| route.method.eq_ignore_ascii_case(method))
    }

    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    /// `METHOD path` of every route that is not hidden with `ignore_describe`.
    pub fn describe(&self) -> Vec<String> {
        self.routes
            .iter()
            .filter(|route| !route.ignore_describe)
            .map(|route| format!("{} {}", route.method, route.path))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Join a base path and a route path with exactly one `/` between them.
pub fn join_paths(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    match (base.is_empty(), path.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{path}"),
        (false, true) if base.starts_with('/') => base.to_string(),
        (false, true) => format!("/{base}"),
        (false, false) if base.starts_with('/') => format!("{base}/{path}"),
        (false, false) => format!("/{base}/{path}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Query;
    use crate::dependencies::Parameter;
    use crate::response::success;

    fn route(method: &str, path: &str) -> Route {
        Route::builder(method, path).handler(|_| async { Ok(success("ok")) })
    }

    #[test]
    fn test_describe_skips_hidden_routes() {
        let mut router = Router::new();
        router.add_handler(route("GET", "/cats")).unwrap();
        router
            .add_handler(
                Route::builder("GET", "/internal")
                    .ignore_describe()
                    .handler(|_| async { Ok(success("ok")) }),
            )
            .unwrap();
        router.add_handler(route("post", "/cats")).unwrap();

        assert_eq!(router.describe(), ["GET /cats", "POST /cats"]);
    }

    struct Users;

    impl Controller for Users {
        fn base_path(&self) -> &str {
            "/users"
        }

        fn routes(&self) -> Vec<Route> {
            vec![route("GET", "/"), route("GET", "/{id}")]
        }
    }

    #[test]
    fn test_registration_order_and_lookup() {
        let mut router = Router::new();
        router.add_handler(route("GET", "/b")).unwrap();
        router.add_handler(route("POST", "/a")).unwrap();
        router.add_handler(route("GET", "/a")).unwrap();

        let keys: Vec<_> = router.routes().iter().map(|r| r.key()).collect();
        assert_eq!(keys, ["GET:/b", "POST:/a", "GET:/a"]);
        assert!(router.find_route("get", "/a").is_some());
        assert_eq!(router.routes_for("GET").count(), 2);
    }

    #[test]
    fn test_rejects_invalid_and_duplicate_routes() {
        let mut router = Router::new();
        assert!(matches!(
            router.add_handler(route("GET", "about")),
            Err(Error::InvalidRoutePath(_))
        ));

        router.add_handler(route("GET", "/about")).unwrap();
        assert!(matches!(
            router.add_handler(route("GET", "/about")),
            Err(Error::RouteAlreadyExists(_))
        ));
    }

    #[test]
    fn test_rejects_duplicate_parameter_names() {
        let duplicated = Route::get("/{id}")
            .parameter(Parameter::int("id"))
            .parameter(Parameter::string("id"))
            .handler(|_| async { Ok(success("ok")) });
        let error = Router::new().add_handler(duplicated).map(|_| ()).unwrap_err();
        assert!(matches!(error, Error::DuplicateParameter { ref name, .. } if name == "id"));
    }

    #[test]
    fn test_query_parameter_must_be_optional() {
        let required = Route::get("/search")
            .parameter(Parameter::string("q").with_attribute(Query::new()))
            .handler(|_| async { Ok(success("ok")) });
        assert!(matches!(
            Router::new().add_handler(required).map(|_| ()),
            Err(Error::InvalidQueryParameter(_))
        ));

        let optional = Route::get("/search")
            .parameter(Parameter::string("q").with_default("").with_attribute(Query::new()))
            .handler(|_| async { Ok(success("ok")) });
        assert!(Router::new().add_handler(optional).is_ok());
    }

    #[test]
    fn test_alias_and_controller() {
        let mut router = Router::new();
        router.add_controller(&Users).unwrap();
        assert!(router.find_route("GET", "/users").is_some());
        assert!(router.find_route("GET", "/users/{id}").is_some());

        router.add_handler_alias("GET", "/users", "/people").unwrap();
        assert!(router.find_route("GET", "/people").is_some());
        assert!(matches!(
            router.add_handler_alias("GET", "/missing", "/x").map(|_| ()),
            Err(Error::RouteNotFound(_))
        ));
    }

    #[test]
    fn test_handler_from_file() {
        let mut router = Router::new();
        router
            .add_handler_from_file("routes", "/api", "routes/cats/{name}/put.rs", route("GET", "/"))
            .unwrap();
        assert!(router.find_route("PUT", "/api/cats/{name}").is_some());
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/users", "/"), "/users");
        assert_eq!(join_paths("/users/", "/{id}"), "/users/{id}");
        assert_eq!(join_paths("", ""), "/");
        assert_eq!(join_paths("api", "x"), "/api/x");
    }
}
