//! Liveness and authentication check endpoints.

use axum::{extract::Request, http::StatusCode};

use crate::api::dto::status::StatusResponse;
use crate::web::{Context, HandlerResult, respond};

/// `GET /v1/status`
///
/// ```json
/// { "status": "OK" }
/// ```
pub async fn status(ctx: Context, _req: Request) -> HandlerResult {
    respond(&ctx, StatusResponse::ok(), StatusCode::OK)
}

/// `GET /v1/testauth`
///
/// Same body as [`status`]; registered behind authentication and the
/// `ADMIN` role so clients can check a token.
pub async fn test_auth(ctx: Context, _req: Request) -> HandlerResult {
    respond(&ctx, StatusResponse::ok(), StatusCode::OK)
}
