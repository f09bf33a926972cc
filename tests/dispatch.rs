//! In-process dispatch tests: requests go through `App::handle` without a socket.

use comet::http::middleware::X_REQUEST_ID;
use comet::routing::RegistrationError;
use comet::{ApiServer, Payload, Request, Response, Scope, ServerConfig};
use serde_json::{json, Value};

mod common;

use common::{bearer, fixture, OrdersController, User, ADMIN_TOKEN, USER_TOKEN};

fn body(response: &Response) -> Value {
    match &response.payload {
        Payload::Json(value) => value.clone(),
        other => panic!("expected JSON payload, got {other:?}"),
    }
}

#[tokio::test]
async fn test_get_user_by_id_binds_path_param() {
    let app = fixture(ServerConfig::default()).server.build();

    let response = app.handle(Request::new("GET", "/users/7")).await;
    assert_eq!(response.status, 200);
    let user: User = serde_json::from_value(body(&response)).unwrap();
    assert_eq!(user, User { id: 7, name: "linus".into() });
}

#[tokio::test]
async fn test_list_users_is_exact_get_route() {
    let fx = fixture(ServerConfig::default());
    let table = fx.server.route_table();
    let list = table
        .iter()
        .find(|row| row.handler == "ListUsers")
        .expect("ListUsers routed");
    assert_eq!((list.method, list.path.as_str()), ("GET", "/users"));

    let app = fx.server.build();
    let response = app.handle(Request::new("GET", "/users")).await;
    assert_eq!(response.status, 200);
    assert_eq!(body(&response).as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_route_table_lists_every_mapped_method() {
    let fx = fixture(ServerConfig::default());
    let routes: Vec<(String, String, String)> = fx
        .server
        .route_table()
        .into_iter()
        .filter(|row| row.controller == "UsersController")
        .map(|row| (row.method.to_string(), row.path, row.handler))
        .collect();

    for expected in [
        ("GET", "/users", "ListUsers"),
        ("POST", "/users", "PostUser"),
        ("GET", "/users/me", "GetMe"),
        ("GET", "/users/:id", "GetUserByID"),
        ("DELETE", "/users/:id", "DeleteUserByID"),
    ] {
        let expected = (expected.0.to_string(), expected.1.to_string(), expected.2.to_string());
        assert!(routes.contains(&expected), "missing {expected:?} in {routes:?}");
    }
    assert!(routes.iter().all(|(_, _, handler)| handler != "Validate"));
}

#[tokio::test]
async fn test_not_found_never_builds_a_controller() {
    let fx = fixture(ServerConfig::default());
    let built_at_startup = fx.built();
    let counter = fx.user_controllers.clone();
    let app = fx.server.build();

    for (method, path) in [
        ("GET", "/unknown/1"),
        ("GET", "/users/7/extra"),
        ("PUT", "/users/7"),
        ("GET", "/"),
        ("GET", ""),
    ] {
        let response = app.handle(Request::new(method, path)).await;
        assert_eq!(response.status, 404, "{method} {path}");
    }
    assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), built_at_startup);

    app.handle(Request::new("GET", "/users/1")).await;
    assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), built_at_startup + 1);
}

#[tokio::test]
async fn test_exact_route_beats_parameterized() {
    let app = fixture(ServerConfig::default()).server.build();

    let response = app.handle(bearer(Request::new("GET", "/users/me"), USER_TOKEN)).await;
    assert_eq!(response.status, 200);
    assert_eq!(body(&response), json!({ "user_id": "2" }));

    let response = app.handle(Request::new("GET", "/orders/recent")).await;
    assert_eq!(body(&response)["handler"], "GetRecent");
}

#[tokio::test]
async fn test_first_declared_parameterized_route_wins() {
    let app = fixture(ServerConfig::default()).server.build();

    let response = app.handle(Request::new("GET", "/orders/5")).await;
    assert_eq!(body(&response), json!({ "handler": "GetByID", "id": "5" }));
}

#[tokio::test]
async fn test_wildcard_policy_effects_visible_to_handler_policy() {
    let app = fixture(ServerConfig::default()).server.build();

    let response = app.handle(bearer(Request::new("GET", "/audit/trail"), USER_TOKEN)).await;
    assert_eq!(response.status, 200);
    assert_eq!(
        body(&response),
        json!({ "user_id": "2", "request_id": "stamped:2" })
    );

    let response = app.handle(Request::new("GET", "/audit/trail")).await;
    assert_eq!(response.status, 401);
}

#[tokio::test]
async fn test_require_role_guards_delete() {
    let fx = fixture(ServerConfig::default());
    let store = fx.store.clone();
    let app = fx.server.build();

    let denied = app.handle(bearer(Request::new("DELETE", "/users/7"), USER_TOKEN)).await;
    assert_eq!(denied.status, 401);
    assert!(store.get(7).is_some());

    let anonymous = app.handle(Request::new("DELETE", "/users/7")).await;
    assert_eq!(anonymous.status, 401);

    let allowed = app.handle(bearer(Request::new("DELETE", "/users/7"), ADMIN_TOKEN)).await;
    assert_eq!(allowed.status, 200);
    assert_eq!(body(&allowed), json!(7));
    assert!(store.get(7).is_none());

    let gone = app.handle(Request::new("GET", "/users/7")).await;
    assert_eq!(gone.status, 404);
}

#[tokio::test]
async fn test_post_user_reads_json_body() {
    let app = fixture(ServerConfig::default()).server.build();

    let created = app
        .handle(Request::new("POST", "/users").with_body(r#"{"name":"barbara"}"#))
        .await;
    assert_eq!(created.status, 200);
    assert_eq!(body(&created)["name"], "barbara");

    let rejected = app.handle(Request::new("POST", "/users").with_body("not json")).await;
    assert_eq!(rejected.status, 400);
}

#[tokio::test]
async fn test_invalid_param_is_handler_bad_request() {
    let app = fixture(ServerConfig::default()).server.build();
    let response = app.handle(Request::new("GET", "/users/abc")).await;
    assert_eq!(response.status, 400);
}

#[tokio::test]
async fn test_panic_is_recovered_and_server_keeps_serving() {
    let app = fixture(ServerConfig::default()).server.build();

    let (boom, fine) = tokio::join!(
        app.handle(Request::new("GET", "/panics/boom")),
        app.handle(Request::new("GET", "/users/1")),
    );
    assert_eq!(boom.status, 500);
    assert_eq!(fine.status, 200);
}

#[tokio::test]
async fn test_request_id_echoed() {
    let app = fixture(ServerConfig::default()).server.build();

    let response = app
        .handle(Request::new("GET", "/nowhere").with_header("X-Request-ID", "req-42"))
        .await;
    assert_eq!(response.status, 404);
    assert_eq!(response.header(X_REQUEST_ID), Some("req-42"));
}

#[test]
fn test_strict_base_paths_rejects_shared_segment() {
    let mut config = ServerConfig::default();
    config.routing.strict_base_paths = true;
    let mut server = ApiServer::new(config);

    server.map_controller(|_: &Scope| Ok(OrdersController)).unwrap();
    let err = server
        .map_controller(|_: &Scope| Ok(OrdersController))
        .err()
        .expect("second controller on /orders rejected");
    assert!(matches!(err, RegistrationError::DuplicateController { .. }));
}

#[test]
fn test_unresolvable_dependency_aborts_registration() {
    let mut server = ApiServer::new(ServerConfig::default());
    let result = server.map_controller(|scope: &Scope| {
        scope.resolve::<std::sync::Arc<common::UserStore>>()?;
        Ok(OrdersController)
    });
    assert!(matches!(result, Err(RegistrationError::Instantiate { .. })));
    assert!(server.route_table().is_empty());
}
