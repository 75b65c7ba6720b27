mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use retail_api::routes::{app_router, build_app};
use retail_api::web::shutdown;
use tower::ServiceExt;

#[tokio::test]
async fn test_status_endpoint_success() {
    let app = common::spawn_app().await;

    let response = app.server.get("/v1/status").await;

    response.assert_status_ok();
    let json = response.json::<serde_json::Value>();
    assert_eq!(json["status"], "OK");
}

#[tokio::test]
async fn test_status_trailing_slash() {
    let (state, _user) = common::create_test_state("keys", "k1").await;
    let (signal, _rx) = shutdown::channel();
    let router = app_router(build_app(&state, signal, None));

    let response = router
        .oneshot(Request::get("/v1/status/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_echoed_or_generated() {
    let app = common::spawn_app().await;

    let response = app
        .server
        .get("/v1/status")
        .add_header("x-request-id", "req-42")
        .await;
    assert_eq!(response.header("x-request-id"), "req-42");

    let response = app.server.get("/v1/status").await;
    let generated = response.header("x-request-id");
    assert!(uuid::Uuid::parse_str(generated.to_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_testauth_requires_bearer() {
    let app = common::spawn_app().await;

    let response = app.server.get("/v1/testauth").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.header("www-authenticate"), "Bearer");
    let json = response.json::<serde_json::Value>();
    assert_eq!(json["error"]["code"], "unauthorized");
    assert_eq!(
        json["error"]["message"],
        "expected authorization header format: Bearer <token>"
    );
}

#[tokio::test]
async fn test_testauth_rejects_garbage_token() {
    let app = common::spawn_app().await;

    let response = app
        .server
        .get("/v1/testauth")
        .add_header("Authorization", "Bearer not-a-token")
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_testauth_forbidden_for_user_role() {
    let app = common::spawn_app().await;
    let token = common::fetch_token(&app.server, common::USER_BASIC).await;

    let response = app
        .server
        .get("/v1/testauth")
        .add_header("Authorization", common::bearer(&token))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let json = response.json::<serde_json::Value>();
    assert_eq!(json["error"]["code"], "forbidden");
    let message = json["error"]["message"].as_str().unwrap();
    assert!(message.starts_with("you are not authorized for that action"));
}

#[tokio::test]
async fn test_testauth_admin_success() {
    let app = common::spawn_app().await;
    let token = common::fetch_token(&app.server, common::ADMIN_BASIC).await;

    let response = app
        .server
        .get("/v1/testauth")
        .add_header("Authorization", common::bearer(&token))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<serde_json::Value>()["status"], "OK");
}

#[tokio::test]
async fn test_unknown_route_not_found() {
    let app = common::spawn_app().await;

    app.server.get("/v1/nothing-here").await.assert_status_not_found();
}
