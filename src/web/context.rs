//! Request-scoped state threaded through the middleware chain.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::auth::Claims;
use crate::error::AppError;

/// Values created once per request by the router.
#[derive(Debug)]
pub struct Values {
    pub trace_id: String,
    /// Wall-clock time the request was received.
    pub now: DateTime<Utc>,
    started: Instant,
    status_code: AtomicU16,
}

impl Values {
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            now: Utc::now(),
            started: Instant::now(),
            status_code: AtomicU16::new(0),
        }
    }

    /// Final response status, `0` until a response has been written.
    pub fn status_code(&self) -> u16 {
        self.status_code.load(Ordering::Relaxed)
    }

    pub fn set_status_code(&self, status: StatusCode) {
        self.status_code.store(status.as_u16(), Ordering::Relaxed);
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub(crate) fn started(&self) -> Instant {
        self.started
    }
}

/// Per-request context passed by value down the chain.
///
/// Cloning is cheap; all clones of one request's context share the same
/// [`Values`]. Middleware that adds data (e.g. claims) passes a new context to
/// the inner handler instead of mutating the caller's.
#[derive(Debug, Clone)]
pub struct Context {
    values: Arc<Values>,
    params: Arc<HashMap<String, String>>,
    claims: Option<Arc<Claims>>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    pub fn new(
        values: Values,
        params: HashMap<String, String>,
        cancel: CancellationToken,
        timeout: Option<Duration>,
    ) -> Self {
        // A deadline too far out to represent is treated as none.
        let deadline = timeout.and_then(|t| values.started().checked_add(t));

        Self {
            values: Arc::new(values),
            params: Arc::new(params),
            claims: None,
            cancel,
            deadline,
        }
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn trace_id(&self) -> &str {
        &self.values.trace_id
    }

    /// Path parameter by name, as declared in the route pattern.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_deref()
    }

    pub fn with_claims(mut self, claims: Claims) -> Self {
        self.claims = Some(Arc::new(claims));
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Runs `fut` until it completes, the request is cancelled, or the
    /// request deadline passes.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::RequestCancelled`] when cancellation wins.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = T>,
    {
        let deadline = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AppError::RequestCancelled),
            _ = deadline => Err(AppError::RequestCancelled),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn ctx(timeout: Option<Duration>) -> (Context, CancellationToken) {
        let token = CancellationToken::new();
        let mut params = HashMap::new();
        params.insert("id".to_string(), "42".to_string());
        (
            Context::new(Values::new("trace-1"), params, token.clone(), timeout),
            token,
        )
    }

    #[test]
    fn test_status_placeholder() {
        let (ctx, _) = ctx(None);
        assert_eq!(ctx.values().status_code(), 0);

        let clone = ctx.clone();
        clone.values().set_status_code(StatusCode::CREATED);
        assert_eq!(ctx.values().status_code(), 201);
    }

    #[test]
    fn test_params_and_claims() {
        let (ctx, _) = ctx(None);
        assert_eq!(ctx.param("id"), Some("42"));
        assert_eq!(ctx.param("missing"), None);
        assert!(ctx.claims().is_none());

        let claims = Claims::new("iss", "sub", Utc::now(), chrono::Duration::hours(1), [Role::User]);
        let with = ctx.clone().with_claims(claims.clone());
        assert_eq!(with.claims(), Some(&claims));
        assert!(ctx.claims().is_none());
        assert_eq!(with.trace_id(), "trace-1");
    }

    #[tokio::test]
    async fn test_run_completes() {
        let (ctx, _) = ctx(None);
        assert_eq!(ctx.run(async { 7 }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_run_cancelled() {
        let (ctx, token) = ctx(None);
        token.cancel();

        let result = ctx.run(std::future::pending::<()>()).await;
        assert!(matches!(result, Err(AppError::RequestCancelled)));
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_unrepresentable_timeout_means_no_deadline() {
        let (ctx, _) = ctx(Some(Duration::from_secs(u64::MAX)));

        assert!(!ctx.is_cancelled());
        assert_eq!(ctx.run(async { 7 }).await.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_deadline() {
        let (ctx, _) = ctx(Some(Duration::from_millis(50)));

        let result = ctx
            .run(tokio::time::sleep(Duration::from_secs(10)))
            .await;
        assert!(matches!(result, Err(AppError::RequestCancelled)));
    }
}
