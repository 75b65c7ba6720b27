//! Request start/completion logging.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request};
use tracing::info;

use crate::web::{BoxedHandler, Context, Middleware};

/// Logs `request started` and `request completed` for every request.
///
/// # Example Logs
///
/// ```text
/// INFO request started trace_id=4f0c.. method=GET path=/v1/users/1 remote_addr=127.0.0.1:50412
/// INFO request completed trace_id=4f0c.. method=GET path=/v1/users/1 status=200 elapsed_ms=3
/// ```
///
/// The completion status is read from the request values, so this
/// middleware must sit outside the errors middleware to see error statuses.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logger;

impl Middleware for Logger {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(move |ctx: Context, req: Request| {
            let next = next.clone();
            async move {
                let method = req.method().clone();
                let path = req.uri().path().to_string();
                let remote_addr = req
                    .extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.to_string())
                    .unwrap_or_else(|| "-".to_string());

                info!(
                    trace_id = %ctx.trace_id(),
                    %method,
                    %path,
                    %remote_addr,
                    "request started"
                );

                let result = next.call(ctx.clone(), req).await;

                let values = ctx.values();
                info!(
                    trace_id = %values.trace_id,
                    %method,
                    %path,
                    %remote_addr,
                    status = values.status_code(),
                    elapsed_ms = values.elapsed().as_millis() as u64,
                    "request completed"
                );

                result
            }
        })
    }
}
