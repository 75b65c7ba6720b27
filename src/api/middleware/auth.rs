//! Bearer token authentication and role authorization middleware.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Request};
use axum_auth::AuthBearer;
use tracing::debug;

use crate::auth::{Authenticator, Role};
use crate::error::AppError;
use crate::web::{BoxedHandler, Context, Middleware};

/// Validates the bearer token and attaches its claims to the context.
///
/// # Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Errors
///
/// Returns `401 Unauthorized` without calling the inner handler if:
/// - Authorization header is missing or not a bearer credential
/// - Token is malformed, expired, signed by an unknown kid or has a bad signature
#[derive(Clone)]
pub struct Authenticate {
    authenticator: Arc<Authenticator>,
}

impl Authenticate {
    pub fn new(authenticator: Arc<Authenticator>) -> Self {
        Self { authenticator }
    }
}

impl Middleware for Authenticate {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        let authenticator = self.authenticator.clone();
        Arc::new(move |ctx: Context, req: Request| {
            let next = next.clone();
            let authenticator = authenticator.clone();
            async move {
                let (mut parts, body) = req.into_parts();

                let AuthBearer(token) = AuthBearer::from_request_parts(&mut parts, &())
                    .await
                    .map_err(|_| {
                        AppError::unauthorized(
                            "expected authorization header format: Bearer <token>",
                        )
                    })?;

                let claims = authenticator.validate_token(&token).map_err(|e| {
                    debug!(trace_id = %ctx.trace_id(), error = %e, "token rejected");
                    AppError::unauthorized(e.to_string())
                })?;

                let req = Request::from_parts(parts, body);
                next.call(ctx.with_claims(claims), req).await
            }
        })
    }
}

/// Requires the authenticated claims to hold at least one of `roles`.
///
/// Must be registered after [`Authenticate`]; a missing claim set is a route
/// configuration bug and is answered as an internal error.
#[derive(Debug, Clone)]
pub struct Authorize {
    roles: Vec<Role>,
}

impl Authorize {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            roles: roles.into_iter().collect(),
        }
    }
}

impl Middleware for Authorize {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        let roles = Arc::new(self.roles.clone());
        Arc::new(move |ctx: Context, req: Request| {
            let next = next.clone();
            let roles = roles.clone();
            async move {
                let Some(claims) = ctx.claims() else {
                    return Err(AppError::internal(
                        "authorize: claims missing from context",
                    ));
                };

                if !claims.authorized(&roles) {
                    let held: Vec<&str> = claims.roles.iter().map(Role::as_str).collect();
                    let required: Vec<&str> = roles.iter().map(Role::as_str).collect();
                    return Err(AppError::forbidden(format!(
                        "you are not authorized for that action, claims{held:?} roles{required:?}"
                    )));
                }

                next.call(ctx, req).await
            }
        })
    }
}
