//! Handlers for user management and token issuing.

use axum::{
    extract::{FromRequestParts, Request},
    http::StatusCode,
};
use axum_auth::AuthBasic;

use crate::api::dto::status::TokenResponse;
use crate::api::dto::user::{NewUserRequest, UpdateUserRequest};
use crate::auth::Claims;
use crate::error::AppError;
use crate::state::AppState;
use crate::web::{Context, HandlerResult, decode, respond};

fn claims(ctx: &Context) -> Result<&Claims, AppError> {
    ctx.claims()
        .ok_or_else(|| AppError::internal("no claims in context"))
}

fn id_param(ctx: &Context) -> &str {
    ctx.param("id").unwrap_or_default()
}

/// Parses a 1-based positive path parameter.
fn positive_param(ctx: &Context, name: &str) -> Result<usize, AppError> {
    let raw = ctx.param(name).unwrap_or_default();
    raw.parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| AppError::bad_request(format!("invalid {name} format [{raw}]")))
}

/// Exchanges Basic credentials for a signed token.
///
/// # Endpoint
///
/// `GET /v1/users/token`
///
/// # Response
///
/// ```json
/// { "token": "eyJhbGciOiJSUzI1NiIsImtpZCI6..." }
/// ```
///
/// # Errors
///
/// - **401 Unauthorized**: Missing Basic credentials or wrong password
/// - **404 Not Found**: Unknown email
/// - **500**: Signing key lost; the server shuts down
pub async fn token(state: AppState, ctx: Context, req: Request) -> HandlerResult {
    let (mut parts, _body) = req.into_parts();

    let AuthBasic((email, password)) = AuthBasic::from_request_parts(&mut parts, &())
        .await
        .map_err(|_| AppError::unauthorized("must provide email and password in Basic auth"))?;
    let password = password.unwrap_or_default();

    let token = ctx
        .run(state.users.token(&email, &password, ctx.values().now))
        .await??;

    respond(&ctx, TokenResponse { token }, StatusCode::OK)
}

/// Lists users, `rows` per page, ordered by id.
///
/// # Endpoint
///
/// `GET /v1/users/{page}/{rows}`
///
/// # Errors
///
/// - **400 Bad Request**: `page` or `rows` is not a positive integer
pub async fn query(state: AppState, ctx: Context, _req: Request) -> HandlerResult {
    let page = positive_param(&ctx, "page")?;
    let rows = positive_param(&ctx, "rows")?;

    let users = ctx.run(state.users.query(page, rows)).await??;

    respond(&ctx, users, StatusCode::OK)
}

/// `GET /v1/users/{id}`; admins may read any user, others only themselves.
pub async fn query_by_id(state: AppState, ctx: Context, _req: Request) -> HandlerResult {
    let claims = claims(&ctx)?;

    let user = ctx
        .run(state.users.query_by_id(claims, id_param(&ctx)))
        .await??;

    respond(&ctx, user, StatusCode::OK)
}

/// Creates a user.
///
/// # Endpoint
///
/// `POST /v1/users`
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Jane",
///   "email": "jane@example.com",
///   "roles": ["USER"],
///   "password": "gophers",
///   "password_confirm": "gophers"
/// }
/// ```
///
/// # Errors
///
/// - **400 Bad Request**: Malformed body or field validation failure
/// - **409 Conflict**: Email already in use
pub async fn create(state: AppState, ctx: Context, req: Request) -> HandlerResult {
    let body: NewUserRequest = decode(req).await?;

    let user = ctx
        .run(state.users.create(body.into(), ctx.values().now))
        .await??;

    respond(&ctx, user, StatusCode::CREATED)
}

/// `PUT /v1/users/{id}`; partial update, answered with `204 No Content`.
///
/// Only admins may change roles.
pub async fn update(state: AppState, ctx: Context, req: Request) -> HandlerResult {
    let body: UpdateUserRequest = decode(req).await?;
    let claims = claims(&ctx)?;

    ctx.run(
        state
            .users
            .update(claims, id_param(&ctx), body.into(), ctx.values().now),
    )
    .await??;

    respond(&ctx, (), StatusCode::NO_CONTENT)
}

/// `DELETE /v1/users/{id}`, answered with `204 No Content`.
pub async fn delete(state: AppState, ctx: Context, _req: Request) -> HandlerResult {
    let claims = claims(&ctx)?;

    ctx.run(state.users.delete(claims, id_param(&ctx))).await??;

    respond(&ctx, (), StatusCode::NO_CONTENT)
}
