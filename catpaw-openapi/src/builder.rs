//! Builds OpenAPI documents from registered routes

use crate::schema::{error_schema, item_schema, kind_schema, page_schema};
use crate::spec::*;
use catpaw_core::path_resolver::placeholders;
use catpaw_core::{
    Header, Page, Param, ParameterKind, Produces, Query, ResponseShape, Route, Router,
    reason_phrase,
};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::debug;

/// Builder for OpenAPI documents
#[derive(Debug, Clone)]
pub struct OpenApiBuilder {
    spec: OpenApiSpec,
}

impl Default for OpenApiBuilder {
    fn default() -> Self {
        Self::new("OpenAPI", "0.0.1")
    }
}

impl OpenApiBuilder {
    /// Create a new OpenAPI builder
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            spec: OpenApiSpec {
                openapi: OPENAPI_VERSION.to_string(),
                info: Info {
                    title: title.into(),
                    version: version.into(),
                    description: None,
                },
                servers: Vec::new(),
                paths: BTreeMap::new(),
                components: Components::default(),
                tags: Vec::new(),
            },
        }
    }

    /// Document every route of `router`.
    pub fn from_router(router: &Router) -> Self {
        Self::default().routes(router)
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.spec.info.title = title.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.spec.info.version = version.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.spec.info.description = Some(description.into());
        self
    }

    pub fn server(mut self, url: impl Into<String>, description: Option<String>) -> Self {
        self.spec.servers.push(Server {
            url: url.into(),
            description,
        });
        self
    }

    /// Add a tag, or describe an existing one.
    pub fn tag(mut self, name: impl Into<String>, description: Option<String>) -> Self {
        let name = name.into();
        match self.spec.tags.iter_mut().find(|t| t.name == name) {
            Some(tag) => tag.description = description,
            None => self.spec.tags.push(Tag { name, description }),
        }
        self
    }

    /// Add a schema component
    pub fn schema(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.spec.components.schemas.insert(name.into(), schema);
        self
    }

    pub fn routes(self, router: &Router) -> Self {
        router
            .routes()
            .iter()
            .fold(self, |builder, route| builder.route(route))
    }

    /// Document one route. Routes marked `ignore_open_api` are skipped.
    pub fn route(mut self, route: &Route) -> Self {
        if route.ignore_open_api {
            debug!(method = %route.method, path = %route.path, "Route excluded from OpenAPI");
            return self;
        }

        for tag in &route.tags {
            if !self.spec.tags.iter().any(|t| &t.name == tag) {
                self.spec.tags.push(Tag {
                    name: tag.clone(),
                    description: None,
                });
            }
        }

        let operation = operation(route);
        self.spec
            .paths
            .entry(route.path.clone())
            .or_default()
            .insert(&route.method, operation);
        self
    }

    /// Build the OpenAPI document
    pub fn build(self) -> OpenApiSpec {
        self.spec
    }
}

fn operation(route: &Route) -> Operation {
    let request_body = route.consumes.as_ref().map(|consumes| RequestBody {
        content: consumes
            .content_types
            .iter()
            .map(|content_type| {
                let media = MediaType {
                    schema: consumes.schema.clone(),
                    example: consumes.example.clone(),
                };
                (content_type.clone(), media)
            })
            .collect(),
        required: true,
    });

    Operation {
        tags: route.tags.clone(),
        summary: route.summary.clone(),
        description: route.description.clone(),
        operation_id: route
            .operation_id
            .clone()
            .unwrap_or_else(|| operation_id(&route.method, &route.path)),
        parameters: parameters(route),
        request_body,
        responses: responses(&route.produces),
    }
}

fn parameters(route: &Route) -> Vec<Parameter> {
    let mut result = Vec::new();

    for name in placeholders(&route.path) {
        let declared = route.parameter(&name);
        let mut schema = declared.map_or_else(|| json!({ "type": "string" }), |p| kind_schema(p.kind));
        if let Some(pattern) = declared
            .and_then(|p| p.attribute::<Param>())
            .and_then(Param::pattern)
        {
            schema["pattern"] = Value::String(pattern.to_string());
        }
        result.push(Parameter {
            name,
            location: ParameterLocation::Path,
            description: None,
            required: true,
            schema,
        });
    }

    for parameter in &route.parameters {
        if let Some(query) = parameter.attribute::<Query>() {
            result.push(Parameter {
                name: query.key_for(parameter).to_string(),
                location: ParameterLocation::Query,
                description: None,
                required: false,
                schema: with_default(kind_schema(parameter.kind), parameter),
            });
        } else if let Some(header) = parameter.attribute::<Header>() {
            result.push(Parameter {
                name: header.key_for(parameter).to_string(),
                location: ParameterLocation::Header,
                description: None,
                required: !parameter.is_optional(),
                schema: with_default(kind_schema(parameter.kind), parameter),
            });
        } else if parameter.kind == ParameterKind::of::<Page>() {
            for (name, description) in [("start", "Index of the first item."), ("size", "Number of items.")] {
                result.push(Parameter {
                    name: name.to_string(),
                    location: ParameterLocation::Query,
                    description: Some(description.to_string()),
                    required: false,
                    schema: json!({ "type": "integer", "format": "int64" }),
                });
            }
        }
    }

    result
}

fn with_default(mut schema: Value, parameter: &catpaw_core::Parameter) -> Value {
    if let Some(default) = parameter.default.as_ref().and_then(|d| d.to_json()) {
        schema["default"] = default;
    }
    schema
}

fn responses(produces: &[Produces]) -> BTreeMap<String, Response> {
    if produces.is_empty() {
        let mut responses = BTreeMap::new();
        responses.insert(
            "200".to_string(),
            Response {
                description: reason_phrase(200).to_string(),
                content: BTreeMap::new(),
            },
        );
        return responses;
    }

    let mut responses: BTreeMap<String, Response> = BTreeMap::new();
    for entry in produces {
        let schema = match entry.shape {
            ResponseShape::Raw => entry.schema.clone(),
            ResponseShape::Item => Some(item_schema(entry.schema.clone())),
            ResponseShape::Page => Some(page_schema(entry.schema.clone())),
            ResponseShape::Error => Some(error_schema()),
        };

        let response = responses
            .entry(entry.status.to_string())
            .or_insert_with(|| Response {
                description: entry
                    .description
                    .clone()
                    .unwrap_or_else(|| reason_phrase(entry.status).to_string()),
                content: BTreeMap::new(),
            });
        for content_type in &entry.content_types {
            response.content.insert(
                content_type.clone(),
                MediaType {
                    schema: schema.clone(),
                    example: entry.example.clone(),
                },
            );
        }
    }
    responses
}

/// `GET /cats/{id}/tags` becomes `getCatsIdTags`.
pub fn operation_id(method: &str, path: &str) -> String {
    let mut id = method.to_lowercase();
    for word in path
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            id.push(first.to_ascii_uppercase());
            id.push_str(chars.as_str());
        }
    }
    id
}
