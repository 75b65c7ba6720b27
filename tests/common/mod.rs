#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use axum_test::TestServer;
use chrono::Utc;
use retail_api::auth::Role;
use retail_api::config::Config;
use retail_api::domain::entities::{NewUser, User};
use retail_api::routes::build_app;
use retail_api::server::build_state;
use retail_api::state::AppState;
use retail_api::web::shutdown::{self, ShutdownReceiver};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const USER_EMAIL: &str = "user@example.com";
pub const PASSWORD: &str = "gophers";

/// `admin@example.com:gophers`
pub const ADMIN_BASIC: &str = "Basic YWRtaW5AZXhhbXBsZS5jb206Z29waGVycw==";
/// `user@example.com:gophers`
pub const USER_BASIC: &str = "Basic dXNlckBleGFtcGxlLmNvbTpnb3BoZXJz";
/// `admin@example.com:wrong`
pub const WRONG_PASSWORD_BASIC: &str = "Basic YWRtaW5AZXhhbXBsZS5jb206d3Jvbmc=";
/// `nobody@example.com:gophers`
pub const UNKNOWN_BASIC: &str = "Basic bm9ib2R5QGV4YW1wbGUuY29tOmdvcGhlcnM=";

pub fn fixtures(dir: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(dir)
}

pub fn test_config(keys: &str, active_kid: &str) -> Config {
    Config {
        listen_addr: "127.0.0.1:0".to_string(),
        log_level: "info".to_string(),
        log_format: "text".to_string(),
        shutdown_timeout: Duration::from_secs(1),
        request_timeout: None,
        keys_folder: fixtures(keys),
        active_kid: active_kid.to_string(),
        issuer: "retail-api".to_string(),
        token_ttl: Duration::from_secs(3600),
        admin_email: Some(ADMIN_EMAIL.to_string()),
        admin_password: Some(PASSWORD.to_string()),
    }
}

/// State over the `keys` fixture folder with the admin seeded and a plain
/// `USER` account added.
pub async fn create_test_state(keys: &str, active_kid: &str) -> (AppState, User) {
    let state = build_state(&test_config(keys, active_kid)).await.unwrap();
    let user = state
        .users
        .create(
            NewUser {
                name: "Plain User".to_string(),
                email: USER_EMAIL.to_string(),
                roles: [Role::User].into_iter().collect(),
                password: PASSWORD.to_string(),
            },
            Utc::now(),
        )
        .await
        .unwrap();

    (state, user)
}

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub user: User,
    pub shutdown: ShutdownReceiver,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_keys("keys", "k1").await
}

pub async fn spawn_app_with_keys(keys: &str, active_kid: &str) -> TestApp {
    let (state, user) = create_test_state(keys, active_kid).await;
    let (signal, shutdown) = shutdown::channel();
    let app = build_app(&state, signal, None);

    TestApp {
        server: TestServer::new(app.into_router()).unwrap(),
        state,
        user,
        shutdown,
    }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Fetches a token through `GET /v1/users/token`.
pub async fn fetch_token(server: &TestServer, basic: &str) -> String {
    let response = server
        .get("/v1/users/token")
        .add_header("Authorization", basic)
        .await;
    response.assert_status_ok();

    let json = response.json::<serde_json::Value>();
    json["token"].as_str().unwrap().to_string()
}
