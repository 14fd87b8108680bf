//! Integration tests for catpaw-openapi

use catpaw_core::*;
use catpaw_openapi::{OpenApiBuilder, ParameterLocation, document_route};
use serde_json::{Value, json};
use std::sync::Arc;

struct CatsController;

impl Controller for CatsController {
    fn base_path(&self) -> &str {
        "/cats"
    }

    fn routes(&self) -> Vec<Route> {
        vec![
            Route::get("/")
                .parameter(Parameter::of::<Page>("page"))
                .parameter(Parameter::of::<Filter>("filter"))
                .produces(Produces::page(["application/json"]).with_schema(json!({ "type": "string" })))
                .tag("cats")
                .handler(|_| async { Ok(success(Vec::<String>::new())) }),
            Route::post("/")
                .parameter(Parameter::value("cat").with_attribute(attributes::Body))
                .parameter(Parameter::string("token").with_attribute(Header::with_key("x-token")))
                .consumes(Consumes::json().with_schema(json!({ "type": "object" })))
                .produces(Produces::json().with_status(201))
                .produces(Produces::error(400, "text/plain").with_description("Invalid cat"))
                .tag("cats")
                .summary("Create a cat")
                .handler(|_| async { Ok(success("created").with_status(201)) }),
        ]
    }
}

fn router() -> Router {
    let mut router = Router::new();
    router.add_controller(&CatsController).unwrap();
    router
}

#[test]
fn test_document_from_router() {
    let spec = OpenApiBuilder::from_router(&router())
        .title("Cats")
        .version("1.0.0")
        .tag("cats", Some("Everything about cats".into()))
        .build();

    assert_eq!(spec.openapi, "3.0.3");
    assert_eq!(spec.operation_count(), 2);
    assert_eq!(spec.tags.len(), 1);
    assert_eq!(spec.tags[0].description.as_deref(), Some("Everything about cats"));

    let list = spec.operation("get", "/cats").unwrap();
    assert!(list.parameter("start", ParameterLocation::Query).is_some());
    assert!(list.parameter("size", ParameterLocation::Query).is_some());
    let page = list.responses["200"].content["application/json"].schema.as_ref().unwrap();
    assert_eq!(page["properties"]["data"]["items"], json!({ "type": "string" }));

    let create = spec.operation("post", "/cats").unwrap();
    assert_eq!(create.operation_id, "postCats");
    let token = create.parameter("x-token", ParameterLocation::Header).unwrap();
    assert!(token.required);
    assert!(create.request_body.as_ref().unwrap().content.contains_key("application/json"));
    assert_eq!(create.responses["400"].description, "Invalid cat");
    assert!(create.responses.contains_key("201"));
}

#[test]
fn test_json_and_yaml_output() {
    let spec = OpenApiBuilder::from_router(&router()).build();

    let json: Value = serde_json::from_str(&spec.to_json().unwrap()).unwrap();
    assert_eq!(json["info"]["title"], "OpenAPI");
    assert_eq!(json["paths"]["/cats"]["post"]["summary"], "Create a cat");
    assert!(json["paths"]["/cats"]["post"]["requestBody"]["required"].as_bool().unwrap());

    let yaml = spec.to_yaml().unwrap();
    assert!(yaml.contains("operationId: getCats"));
}

#[tokio::test]
async fn test_document_route_serves_the_spec() {
    let mut router = router();
    let spec = OpenApiBuilder::from_router(&router).build();
    router.add_handler(document_route("/openapi", spec)).unwrap();

    let rebuilt = OpenApiBuilder::from_router(&router).build();
    assert_eq!(rebuilt.operation_count(), 2);

    let handler = RequestHandler::new(RouteResolver::new(Arc::new(router), Invoker::new(Container::new())));
    let response = handler.handle(HttpRequest::new("GET", "/openapi")).await;
    assert_eq!(response.header("Content-Type"), Some("application/json"));
    let body: Value = serde_json::from_str(&response.text()).unwrap();
    assert!(body["paths"]["/cats"]["get"].is_object());

    let request = HttpRequest::new("GET", "/openapi").with_header("Accept", "application/yaml");
    let response = handler.handle(request).await;
    assert!(response.text().starts_with("openapi: 3.0.3"));
}
