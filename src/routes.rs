//! Top-level application assembly.
//!
//! # Middleware
//!
//! Every route runs through, outermost first:
//!
//! 1. **Logger** - Request start/completion logs
//! 2. **Errors** - Error to response translation
//! 3. **Metrics** - Request, error and in-flight counters
//! 4. **Panics** - Panic recovery
//!
//! followed by the route's own authentication/authorization middleware.
//! Trailing slashes are trimmed before routing.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

use crate::api;
use crate::api::middleware::{Errors, Logger, Panics, RequestMetrics};
use crate::state::AppState;
use crate::web::{App, BoxedMiddleware, ShutdownSignal};

/// Builds the app with the process-wide middleware and all API routes.
pub fn build_app(
    state: &AppState,
    shutdown: ShutdownSignal,
    request_timeout: Option<Duration>,
) -> App {
    let mw: Vec<BoxedMiddleware> = vec![
        Arc::new(Logger),
        Arc::new(Errors),
        Arc::new(RequestMetrics::new(state.metrics.clone())),
        Arc::new(Panics::new(state.metrics.clone())),
    ];

    let mut app = App::new(shutdown, mw).with_request_timeout(request_timeout);
    api::routes::register(&mut app, state);
    app
}

/// Wraps the app router for serving.
pub fn app_router(app: App) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(app.into_router())
}
