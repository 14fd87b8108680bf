// Tests for route registration and request resolution

use catpaw_core::*;
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
                .produces(Produces::page(["application/json"]))
                .handler(|args| async move {
                    let page: Arc<Page> = args.get("page")?;
                    let cats: Vec<String> = (page.start..page.start + page.size)
                        .map(|i| format!("cat-{i}"))
                        .collect();
                    Ok(success(cats).page((*page).clone()))
                }),
            Route::get("/{id}")
                .parameter(Parameter::int("id").with_attribute(Param::new()))
                .produces(Produces::json())
                .handler(|args| async move {
                    let id: i64 = args.get("id")?;
                    Ok(success(json!({ "id": id, "name": "Tom" })))
                }),
            Route::get("/{id}/tag/{code}")
                .parameter(Parameter::int("id"))
                .parameter(Parameter::string("code").with_attribute(Param::with_pattern("[a-z]{2}")))
                .handler(|args| async move {
                    let id: i64 = args.get("id")?;
                    let code: String = args.get("code")?;
                    Ok(success(format!("{id}/{code}")))
                }),
        ]
    }
}

fn handler() -> RequestHandler {
    let mut router = Router::new();
    router.add_controller(&CatsController).unwrap();
    router
        .add_handler(
            Route::get("/search")
                .parameter(Parameter::string("q").with_default("").with_attribute(Query::new()))
                .parameter(Parameter::int("limit").with_default(10i64).with_attribute(Query::new()))
                .parameter(Parameter::bool("exact").nullable().with_attribute(Query::new()))
                .handler(|args| async move {
                    let q: String = args.get("q")?;
                    let limit: i64 = args.get("limit")?;
                    let exact: Option<bool> = args.get("exact")?;
                    Ok(success(json!({ "q": q, "limit": limit, "exact": exact })).as_json())
                }),
        )
        .unwrap();
    router
        .add_handler(
            Route::get("/agent")
                .parameter(Parameter::string("user_agent").with_attribute(Header::with_key("user-agent")))
                .handler(|args| async move {
                    let agent: String = args.get("user_agent")?;
                    Ok(success(agent))
                }),
        )
        .unwrap();
    router
        .add_handler(
            Route::get("/pages")
                .parameter(Parameter::of::<Page>("page"))
                .produces(Produces::page(["application/json"]))
                .handler(|args| async move {
                    let page: Arc<Page> = args.get("page")?;
                    Ok(success(Vec::<String>::new()).page((*page).clone()))
                }),
        )
        .unwrap();
    router.add_handler_alias("GET", "/cats/{id}", "/kittens/{id}").unwrap();

    let resolver = RouteResolver::new(Arc::new(router), Invoker::new(Container::new()));
    RequestHandler::new(resolver)
}

fn json_body(response: &HttpResponse) -> Value {
    serde_json::from_str(&response.text()).unwrap()
}

#[tokio::test]
async fn test_controller_item_route() {
    let response = handler().handle(HttpRequest::new("GET", "/cats/3")).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.header("Content-Type"), Some("application/json"));
    let body = json_body(&response);
    assert_eq!(body["type"], "item");
    assert_eq!(body["data"]["id"], 3);
    assert_eq!(body["status"], 200);
    assert_eq!(body["message"], "OK");
}

#[tokio::test]
async fn test_alias_serves_the_same_handler() {
    let response = handler().handle(HttpRequest::new("GET", "/kittens/8")).await;
    assert_eq!(json_body(&response)["data"]["id"], 8);
}

#[tokio::test]
async fn test_page_route_links_neighbours() {
    let request = HttpRequest::new("GET", "/cats?start=4&size=2").with_header("Host", "localhost:8080");
    let response = handler().handle(request).await;

    let body = json_body(&response);
    assert_eq!(body["type"], "page");
    assert_eq!(body["data"], json!(["cat-4", "cat-5"]));
    assert_eq!(body["next"], json!({ "start": 6, "size": 2 }));
    assert_eq!(body["previous"], json!({ "start": 2, "size": 2 }));
    assert_eq!(body["nextHref"], "http://localhost:8080/cats?start=6&size=2");
}

#[tokio::test]
async fn test_trailing_slash_variant_matches() {
    let request = HttpRequest::new("GET", "/agent/").with_header("User-Agent", "cat");
    let response = handler().handle(request).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.text(), "cat");
}

#[tokio::test]
async fn test_path_validation_errors() {
    let handler = handler();

    let response = handler.handle(HttpRequest::new("GET", "/cats/tom")).await;
    assert_eq!(response.status, 400);
    assert_eq!(
        response.text(),
        "Invalid value `tom` for parameter `id` which is expected to match pattern `[-+]?[0-9]+`."
    );

    let response = handler.handle(HttpRequest::new("GET", "/cats/tom/tag/xyz")).await;
    assert_eq!(response.status, 400);
    assert_eq!(response.text().lines().count(), 2);

    let response = handler.handle(HttpRequest::new("GET", "/cats/1/tag/ab")).await;
    assert_eq!(response.text(), "1/ab");
}

#[tokio::test]
async fn test_query_parameters() {
    let handler = handler();

    let response = handler.handle(HttpRequest::new("GET", "/search?q=black%20cat&limit=5&exact")).await;
    assert_eq!(json_body(&response), json!({ "q": "black cat", "limit": 5, "exact": true }));

    let response = handler.handle(HttpRequest::new("GET", "/search")).await;
    assert_eq!(json_body(&response), json!({ "q": "", "limit": 10, "exact": null }));

    let response = handler.handle(HttpRequest::new("GET", "/search?limit=many")).await;
    assert_eq!(response.status, 400);
}

#[tokio::test]
async fn test_query_text_is_kept_verbatim() {
    let handler = handler();

    let response = handler.handle(HttpRequest::new("GET", "/search?q=007")).await;
    assert_eq!(json_body(&response)["q"], "007");

    let response = handler.handle(HttpRequest::new("GET", "/search?q=1.50&limit=007")).await;
    let body = json_body(&response);
    assert_eq!(body["q"], "1.50");
    assert_eq!(body["limit"], 7);
}

#[tokio::test]
async fn test_page_links_saturate_at_the_bounds() {
    let request = HttpRequest::new("GET", "/pages?start=9223372036854775807&size=10");
    let response = handler().handle(request).await;

    assert_eq!(response.status, 200);
    let body = json_body(&response);
    assert_eq!(body["next"]["start"], i64::MAX);
    assert_eq!(body["previous"]["start"], i64::MAX - 10);

    let response = handler().handle(HttpRequest::new("GET", "/pages?start=5&size=-3")).await;
    let body = json_body(&response);
    assert_eq!(body["next"], json!({ "start": 5, "size": 0 }));
}

#[tokio::test]
async fn test_header_parameter() {
    let request = HttpRequest::new("GET", "/agent").with_header("User-Agent", "curl/8.0");
    let response = handler().handle(request).await;
    assert_eq!(response.text(), "curl/8.0");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let response = handler().handle(HttpRequest::new("DELETE", "/cats/1")).await;
    assert_eq!(response.status, 404);
}

#[test]
fn test_routes_keep_registration_order() {
    let keys: Vec<String> = handler().resolver().router().routes().iter().map(|r| r.key()).collect();
    assert_eq!(
        keys,
        [
            "GET:/cats",
            "GET:/cats/{id}",
            "GET:/cats/{id}/tag/{code}",
            "GET:/search",
            "GET:/agent",
            "GET:/pages",
            "GET:/kittens/{id}",
        ]
    );
}
