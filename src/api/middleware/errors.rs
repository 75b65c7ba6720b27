//! Error translation middleware.

use std::sync::Arc;

use axum::extract::Request;
use tracing::{error, warn};

use crate::web::{BoxedHandler, Context, Middleware, respond_error};

/// Turns every error returned by the inner chain into a client response.
///
/// The final status is recorded in the request values and the full error is
/// logged with the trace id. Only a shutdown error is returned outward, after
/// its response status has been recorded, so the router can escalate it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Errors;

impl Middleware for Errors {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(move |ctx: Context, req: Request| {
            let next = next.clone();
            async move {
                let err = match next.call(ctx.clone(), req).await {
                    Ok(response) => return Ok(response),
                    Err(err) => err,
                };

                let status = err.status();
                if status.is_server_error() {
                    error!(
                        trace_id = %ctx.trace_id(),
                        status = status.as_u16(),
                        error = %err,
                        "request failed"
                    );
                } else {
                    warn!(
                        trace_id = %ctx.trace_id(),
                        status = status.as_u16(),
                        error = %err,
                        "request rejected"
                    );
                }

                let response = respond_error(&ctx, &err);

                if err.is_shutdown() {
                    return Err(err);
                }

                Ok(response)
            }
        })
    }
}
