//! Integration tests for catpaw-config

use catpaw_config::*;
use catpaw_core::{
    Container, HttpRequest, Invoker, Parameter, RequestHandler, Route, RouteResolver, Router,
    success,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[test]
fn test_builder_layers_sources() {
    let dir = tempfile::tempdir().unwrap();
    let dotenv = dir.path().join(".env");
    let toml = dir.path().join("app.toml");
    let json = dir.path().join("overrides.json");
    fs::write(&dotenv, "APP_NAME=paws\n").unwrap();
    fs::write(&toml, "[server]\ninterface = \"0.0.0.0:80\"\nspa = false\n").unwrap();
    fs::write(&json, r#"{"server": {"spa": true}}"#).unwrap();

    let service = ConfigService::builder()
        .load_dotenv(Some(dotenv))
        .add_path(&toml)
        .add_file(&json, FileFormat::Json)
        .build()
        .unwrap();

    assert_eq!(service.get_string("APP_NAME").unwrap(), "paws");
    assert_eq!(service.get_string("server.interface").unwrap(), "0.0.0.0:80");
    assert!(service.get_bool("server.spa").unwrap());
}

#[test]
fn test_builder_reports_missing_files() {
    let result = ConfigService::builder()
        .add_path(PathBuf::from("/nonexistent/catpaw/env.yaml"))
        .build();
    assert!(matches!(result, Err(ConfigError::LoadError(_))));
}

#[test]
fn test_environment_file_to_server_config() {
    let dir = tempfile::tempdir().unwrap();
    let ini = dir.path().join("env.ini");
    fs::write(
        &ini,
        "name = paws\n\n[server]\ninterface = 127.0.0.1:9090\nwww = ./public\nspa = on\nexpose_errors = 1\n",
    )
    .unwrap();

    let environment = EnvironmentService::default();
    environment
        .load_first(&[dir.path().join(".env"), ini])
        .unwrap();

    let config = server_config(environment.manager()).unwrap();
    assert_eq!(config.interface, "127.0.0.1:9090");
    assert_eq!(config.statics_location, Some(PathBuf::from("./public")));
    assert!(config.spa);
    assert!(config.expose_errors);
}

#[test]
fn test_config_error_display() {
    let err = ConfigError::EnvironmentNotFound(vec!["env.ini".into(), ".env".into()]);
    assert_eq!(err.to_string(), "No environment file found, tried: env.ini, .env");
}

#[tokio::test]
async fn test_env_attribute_injects_values() {
    let manager = ConfigManager::new();
    manager.set("server.www", "./public").unwrap();
    manager.set("cats.limit", "12").unwrap();

    let container = Container::new();
    container.register(manager);

    let route = Route::get("/settings")
        .parameter(Parameter::string("www").with_attribute(Env::new("server.www")))
        .parameter(Parameter::int("limit").with_attribute(Env::new("cats.limit")))
        .parameter(
            Parameter::string("missing")
                .with_default("fallback")
                .with_attribute(Env::new("cats.missing")),
        )
        .handler(|args| async move {
            let www: String = args.get("www")?;
            let limit: i64 = args.get("limit")?;
            let missing: String = args.get("missing")?;
            Ok(success(format!("{www} {} {missing}", limit + 1)))
        });

    let mut router = Router::new();
    router.add_handler(route).unwrap();
    let handler = RequestHandler::new(RouteResolver::new(Arc::new(router), Invoker::new(container)));

    let response = handler.handle(HttpRequest::new("GET", "/settings")).await;
    assert_eq!(response.text(), "./public 13 fallback");
}
