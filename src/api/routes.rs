//! API route configuration.

use std::future::Future;
use std::sync::Arc;

use axum::{extract::Request, routing::MethodFilter};

use crate::api::handlers::{status, users};
use crate::api::middleware::{Authenticate, Authorize};
use crate::auth::Role;
use crate::state::AppState;
use crate::web::{App, BoxedMiddleware, Context, Handler, HandlerResult};

const VERSION: &str = "v1";

/// Binds `state` to a handler taking it as first argument.
pub fn with_state<F, Fut>(state: &AppState, f: F) -> impl Handler
where
    F: Fn(AppState, Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    let state = state.clone();
    move |ctx: Context, req: Request| f(state.clone(), ctx, req)
}

/// Registers all `/v1` routes.
///
/// # Endpoints
///
/// - `GET    /v1/status`              - Liveness (public)
/// - `GET    /v1/testauth`            - Token check (ADMIN)
/// - `GET    /v1/users/token`         - Basic credentials to token (public)
/// - `GET    /v1/users/{page}/{rows}` - Paged user list (ADMIN)
/// - `GET    /v1/users/{id}`          - User by id (admin or self)
/// - `POST   /v1/users`               - Create user (ADMIN)
/// - `PUT    /v1/users/{id}`          - Update user (admin or self)
/// - `DELETE /v1/users/{id}`          - Delete user (admin or self)
pub fn register(app: &mut App, state: &AppState) {
    let authn: BoxedMiddleware = Arc::new(Authenticate::new(state.authenticator.clone()));
    let admin: BoxedMiddleware = Arc::new(Authorize::new([Role::Admin]));

    app.handle(MethodFilter::GET, VERSION, "/status", status::status, vec![]);
    app.handle(
        MethodFilter::GET,
        VERSION,
        "/testauth",
        status::test_auth,
        vec![authn.clone(), admin.clone()],
    );

    app.handle(
        MethodFilter::GET,
        VERSION,
        "/users/token",
        with_state(state, users::token),
        vec![],
    );
    app.handle(
        MethodFilter::GET,
        VERSION,
        "/users/{page}/{rows}",
        with_state(state, users::query),
        vec![authn.clone(), admin.clone()],
    );
    app.handle(
        MethodFilter::GET,
        VERSION,
        "/users/{id}",
        with_state(state, users::query_by_id),
        vec![authn.clone()],
    );
    app.handle(
        MethodFilter::POST,
        VERSION,
        "/users",
        with_state(state, users::create),
        vec![authn.clone(), admin],
    );
    app.handle(
        MethodFilter::PUT,
        VERSION,
        "/users/{id}",
        with_state(state, users::update),
        vec![authn.clone()],
    );
    app.handle(
        MethodFilter::DELETE,
        VERSION,
        "/users/{id}",
        with_state(state, users::delete),
        vec![authn],
    );
}
