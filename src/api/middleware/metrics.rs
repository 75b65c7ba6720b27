//! Request counting middleware.

use std::sync::Arc;

use axum::extract::Request;

use crate::metrics::Metrics;
use crate::web::{BoxedHandler, Context, Middleware};

/// Counts requests and errors and tracks in-flight requests.
///
/// Sits inside the errors middleware so it still sees the inner error, and
/// outside panic recovery so recovered panics count as errors.
#[derive(Debug, Clone)]
pub struct RequestMetrics {
    metrics: Arc<Metrics>,
}

impl RequestMetrics {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }
}

impl Middleware for RequestMetrics {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        let metrics = self.metrics.clone();
        Arc::new(move |ctx: Context, req: Request| {
            let next = next.clone();
            let metrics = metrics.clone();
            async move {
                let _active = metrics.track_active();

                let result = next.call(ctx, req).await;

                metrics.add_request();
                if result.is_err() {
                    metrics.add_error();
                }

                result
            }
        })
    }
}
