// Tests for dependency injection into route handlers

use catpaw_core::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Database {
    url: String,
}
impl Provider for Database {}

struct UserRepository {
    database: Arc<Database>,
}
impl Provider for UserRepository {}

struct RequestCounter(usize);
impl Provider for RequestCounter {}

struct Mailer;
impl Provider for Mailer {}

fn container() -> Container {
    let container = Container::new();
    container.register(Database {
        url: "sqlite::memory:".into(),
    });
    container.provide_singleton(|c| {
        Ok(UserRepository {
            database: c.resolve::<Database>()?,
        })
    });

    let built = Arc::new(AtomicUsize::new(0));
    container.provide_transient(move |_| Ok(RequestCounter(built.fetch_add(1, Ordering::SeqCst))));
    container
}

fn handler(container: Container, route: Route) -> RequestHandler {
    let mut router = Router::new();
    router.add_handler(route).unwrap();
    RequestHandler::new(RouteResolver::new(Arc::new(router), Invoker::new(container)))
}

#[test]
fn test_singleton_factory_resolves_its_dependencies() {
    let container = container();

    let first = container.resolve::<UserRepository>().unwrap();
    let second = container.resolve::<UserRepository>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.database.url, "sqlite::memory:");
}

#[test]
fn test_transient_factory_builds_every_time() {
    let container = container();
    assert_eq!(container.resolve::<RequestCounter>().unwrap().0, 0);
    assert_eq!(container.resolve::<RequestCounter>().unwrap().0, 1);
}

#[test]
fn test_missing_provider() {
    let container = container();
    assert!(!container.has::<Mailer>());
    assert!(matches!(container.resolve::<Mailer>(), Err(Error::ProviderNotFound(_))));
}

#[test]
fn test_alias_resolution() {
    let container = container();
    container.alias::<Database>("db");

    let instance = container.resolve_by_name("db").unwrap();
    let database = instance.downcast::<Database>().unwrap();
    assert_eq!(database.url, "sqlite::memory:");
    assert!(container.resolve_by_name("cache").is_err());
}

#[tokio::test]
async fn test_handler_receives_services() {
    let route = Route::get("/users/{id}")
        .parameter(Parameter::of::<UserRepository>("users"))
        .parameter(Parameter::of::<RequestCounter>("counter"))
        .parameter(Parameter::int("id"))
        .handler(|args| async move {
            let users: Arc<UserRepository> = args.get("users")?;
            let counter: Arc<RequestCounter> = args.get("counter")?;
            let id: i64 = args.get("id")?;
            Ok(success(format!("{} #{} user {id}", users.database.url, counter.0)))
        });
    let handler = handler(container(), route);

    let first = handler.handle(HttpRequest::new("GET", "/users/5")).await;
    assert_eq!(first.text(), "sqlite::memory: #0 user 5");
    let second = handler.handle(HttpRequest::new("GET", "/users/6")).await;
    assert_eq!(second.text(), "sqlite::memory: #1 user 6");
}

#[tokio::test]
async fn test_nullable_dependency_without_provider() {
    let route = Route::get("/mail")
        .parameter(Parameter::of::<Mailer>("mailer").nullable())
        .handler(|args| async move {
            let mailer: Option<Arc<Mailer>> = args.get("mailer")?;
            Ok(success(mailer.is_some()))
        });

    let response = handler(container(), route).handle(HttpRequest::new("GET", "/mail")).await;
    assert_eq!(response.text(), "false");
}

#[tokio::test]
async fn test_missing_dependency_is_a_server_error() {
    let route = Route::get("/mail")
        .parameter(Parameter::of::<Mailer>("mailer"))
        .handler(|_| async { Ok(success("sent")) });

    let response = handler(container(), route).handle(HttpRequest::new("GET", "/mail")).await;
    assert_eq!(response.status, 500);
}

#[tokio::test]
async fn test_request_scoped_types_are_injected() {
    let route = Route::get("/inspect")
        .parameter(Parameter::of::<HttpRequest>("request"))
        .parameter(Parameter::of::<Accepts>("accepts"))
        .parameter(Parameter::of::<Filter>("filter"))
        .parameter(Parameter::of::<RequestContext>("context"))
        .handler(|args| async move {
            let request: Arc<HttpRequest> = args.get("request")?;
            let accepts: Arc<Accepts> = args.get("accepts")?;
            let filter: Arc<Filter> = args.get("filter")?;
            let context: Arc<RequestContext> = args.get("context")?;
            Ok(success(format!(
                "{} {} {} {}",
                request.method,
                accepts.json(),
                filter,
                context.key
            )))
        });

    let request = HttpRequest::new("GET", "/inspect?name=tom&age=>3").with_header("Accept", "application/json");
    let response = handler(container(), route).handle(request).await;
    assert_eq!(response.status, 200);
    assert_eq!(
        serde_json::from_str::<String>(&response.text()).unwrap(),
        "GET true name = :name and age > :age GET:/inspect"
    );
}
