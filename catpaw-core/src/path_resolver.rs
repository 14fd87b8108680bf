//! Symbolic path matching.
//!
//! A symbolic path such as `/users/{id}/posts/{slug}` is compiled once per
//! route into a [`PathResolver`]. Matching happens in two steps: every
//! placeholder captures `([^/]*)`, then each captured value is validated
//! against the pattern of its parameter. A value that fails validation does
//! not prevent the match; it is reported as a bad request entry so the
//! client gets a 400 instead of a 404.

use crate::attributes::Param;
use crate::dependencies::{Parameter, ParameterKind};
use crate::error::{Error, Result};
use crate::logging::{debug, trace};
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

pub const INT_PATTERN: &str = r"[-+]?[0-9]+";
pub const FLOAT_PATTERN: &str = r"[-+]?[0-9]+\.[0-9]+";
pub const STRING_PATTERN: &str = r"[^/]*";
pub const BOOL_PATTERN: &str = r"(0|1|no?|y(es)?|false|true)";

static PLACEHOLDER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\{([^{}]+)\}").ok());

/// Validation rule of one path parameter.
#[derive(Debug, Clone)]
pub struct MatchingPathConfiguration {
    pub name: String,
    pub kind: ParameterKind,
    pub pattern: String,
    validator: Regex,
}

impl MatchingPathConfiguration {
    pub fn new(name: impl Into<String>, kind: ParameterKind, pattern: Option<&str>) -> Result<Self> {
        let pattern = pattern
            .map(str::to_string)
            .unwrap_or_else(|| default_pattern(kind).to_string());
        let validator = Regex::new(&format!("^(?:{pattern})$"))?;
        Ok(Self {
            name: name.into(),
            kind,
            pattern,
            validator,
        })
    }

    pub fn validate(&self, value: &str) -> bool {
        self.validator.is_match(value)
    }
}

/// Default validation pattern of a parameter kind.
pub fn default_pattern(kind: ParameterKind) -> &'static str {
    match kind {
        ParameterKind::Int => INT_PATTERN,
        ParameterKind::Float => FLOAT_PATTERN,
        ParameterKind::Bool => BOOL_PATTERN,
        _ => STRING_PATTERN,
    }
}

/// Names of the `{placeholders}` of a symbolic path, in order.
pub fn placeholders(symbolic_path: &str) -> Vec<String> {
    PLACEHOLDER
        .as_ref()
        .map(|re| {
            re.captures_iter(symbolic_path)
                .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// Result of matching a request path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMatch {
    pub parameters: HashMap<String, String>,
    pub bad_request_entries: Vec<String>,
}

/// Compiled matcher for one symbolic path.
#[derive(Debug, Clone)]
pub struct PathResolver {
    symbolic_path: String,
    matcher: Regex,
    configurations: Vec<MatchingPathConfiguration>,
}

impl PathResolver {
    /// Compile `symbolic_path`; placeholders take their rules from the
    /// parameter with the same name, or match any string.
    pub fn for_route(symbolic_path: &str, parameters: &[Parameter]) -> Result<Self> {
        let mut configurations = Vec::new();
        let mut pattern = String::from("^");
        let mut last = 0;

        let placeholder = PLACEHOLDER
            .as_ref()
            .ok_or_else(|| Error::Internal("Placeholder pattern failed to compile".into()))?;

        for captures in placeholder.captures_iter(symbolic_path) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            pattern.push_str(&regex::escape(&symbolic_path[last..whole.start()]));
            pattern.push_str("([^/]*)");
            last = whole.end();

            let name = name.as_str();
            let configuration = match parameters.iter().find(|p| p.name == name) {
                Some(parameter) => MatchingPathConfiguration::new(
                    name,
                    parameter.kind,
                    parameter.attribute::<Param>().and_then(Param::pattern),
                )?,
                None => MatchingPathConfiguration::new(name, ParameterKind::String, None)?,
            };
            configurations.push(configuration);
        }
        pattern.push_str(&regex::escape(&symbolic_path[last..]));
        pattern.push('$');

        trace!(path = symbolic_path, pattern = %pattern, "Compiled path resolver");

        Ok(Self {
            symbolic_path: symbolic_path.to_string(),
            matcher: Regex::new(&pattern)?,
            configurations,
        })
    }

    pub fn symbolic_path(&self) -> &str {
        &self.symbolic_path
    }

    pub fn configurations(&self) -> &[MatchingPathConfiguration] {
        &self.configurations
    }

    /// `None` when `path` does not have the shape of the template.
    pub fn find_matching_path_parameters(&self, path: &str) -> Option<PathMatch> {
        let captures = self.matcher.captures(path)?;
        let mut result = PathMatch::default();

        for (index, configuration) in self.configurations.iter().enumerate() {
            let value = captures
                .get(index + 1)
                .map(|m| m.as_str())
                .unwrap_or_default();
            if !configuration.validate(value) {
                result.bad_request_entries.push(format!(
                    "Invalid value `{value}` for parameter `{}` which is expected to match pattern `{}`.",
                    configuration.name, configuration.pattern
                ));
            }
            result
                .parameters
                .insert(configuration.name.clone(), value.to_string());
        }

        Some(result)
    }
}

/// One compiled resolver per `"METHOD:path"`.
#[derive(Debug, Clone, Default)]
pub struct PathResolverCache {
    resolvers: Arc<RwLock<HashMap<String, Arc<PathResolver>>>>,
}

impl PathResolverCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compile(
        &self,
        method: &str,
        symbolic_path: &str,
        parameters: &[Parameter],
    ) -> Result<Arc<PathResolver>> {
        let key = format!("{method}:{symbolic_path}");
        if let Some(resolver) = self.resolvers.read().get(&key) {
            return Ok(resolver.clone());
        }

        let resolver = Arc::new(PathResolver::for_route(symbolic_path, parameters)?);
        let mut resolvers = self.resolvers.write();
        let resolver = resolvers.entry(key).or_insert(resolver).clone();
        debug!(method, path = symbolic_path, cached = resolvers.len(), "Path resolver cached");
        Ok(resolver)
    }

    pub fn len(&self) -> usize {
        self.resolvers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.resolvers.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_path() {
        let resolver = PathResolver::for_route("/about/team", &[]).unwrap();
        assert_eq!(
            resolver.find_matching_path_parameters("/about/team"),
            Some(PathMatch::default())
        );
        assert!(resolver.find_matching_path_parameters("/about").is_none());
        assert!(resolver.find_matching_path_parameters("/about/team/x").is_none());
    }

    #[test]
    fn test_static_segments_are_escaped() {
        let resolver = PathResolver::for_route("/file.json", &[]).unwrap();
        assert!(resolver.find_matching_path_parameters("/file.json").is_some());
        assert!(resolver.find_matching_path_parameters("/fileXjson").is_none());
    }

    #[test]
    fn test_typed_parameters() {
        let parameters = [
            Parameter::int("id").with_attribute(Param::new()),
            Parameter::bool("active"),
        ];
        let resolver = PathResolver::for_route("/users/{id}/{active}", &parameters).unwrap();

        let found = resolver.find_matching_path_parameters("/users/42/yes").unwrap();
        assert!(found.bad_request_entries.is_empty());
        assert_eq!(found.parameters["id"], "42");
        assert_eq!(found.parameters["active"], "yes");
    }

    #[test]
    fn test_invalid_value_is_reported() {
        let parameters = [Parameter::int("id")];
        let resolver = PathResolver::for_route("/users/{id}", &parameters).unwrap();

        let found = resolver.find_matching_path_parameters("/users/abc").unwrap();
        assert_eq!(found.parameters["id"], "abc");
        assert_eq!(
            found.bad_request_entries,
            ["Invalid value `abc` for parameter `id` which is expected to match pattern `[-+]?[0-9]+`."]
        );
    }

    #[test]
    fn test_custom_pattern() {
        let parameters = [Parameter::string("code").with_attribute(Param::with_pattern("[A-Z]{3}"))];
        let resolver = PathResolver::for_route("/codes/{code}", &parameters).unwrap();
        assert!(resolver.find_matching_path_parameters("/codes/ABC").unwrap().bad_request_entries.is_empty());
        assert_eq!(
            resolver.find_matching_path_parameters("/codes/abcd").unwrap().bad_request_entries.len(),
            1
        );
    }

    #[test]
    fn test_undeclared_placeholder_is_string() {
        let resolver = PathResolver::for_route("/{a}-{b}", &[]).unwrap();
        let found = resolver.find_matching_path_parameters("/x-y").unwrap();
        assert_eq!(found.parameters["a"], "x");
        assert_eq!(found.parameters["b"], "y");
        assert_eq!(placeholders("/{a}-{b}"), ["a", "b"]);
    }

    #[test]
    fn test_cache_compiles_once() {
        let cache = PathResolverCache::new();
        let a = cache.get_or_compile("GET", "/a/{id}", &[]).unwrap();
        let b = cache.get_or_compile("GET", "/a/{id}", &[]).unwrap();
        cache.get_or_compile("POST", "/a/{id}", &[]).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
    }
}
