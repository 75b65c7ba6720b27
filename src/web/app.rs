//! Router that binds method + path to a middleware-wrapped handler.
//!
//! Handlers and middleware use this crate's own signature rather than axum's
//! extractor model so that every request flows through the same ordered
//! chain with an explicit [`Context`]:
//!
//! ```text
//! App middleware (outermost first) -> route middleware -> handler
//! ```
//!
//! Route matching, path parameters and method filtering are delegated to the
//! wrapped [`axum::Router`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{FromRequestParts, Path, Request},
    http::{HeaderName, HeaderValue},
    response::Response,
    routing::{MethodFilter, on},
};
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use super::context::{Context, Values};
use super::respond::respond_error;
use super::shutdown::ShutdownSignal;
use crate::error::AppError;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

pub type HandlerResult = Result<Response, AppError>;

/// A request handler: `(context, request) -> response | error`.
///
/// Implemented for any `Fn(Context, Request) -> impl Future<Output = HandlerResult>`.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: Context, req: Request) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, ctx: Context, req: Request) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self)(ctx, req))
    }
}

pub type BoxedHandler = Arc<dyn Handler>;

/// Wraps a handler and returns an equivalent handler with added behavior.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

pub type BoxedMiddleware = Arc<dyn Middleware>;

/// Folds `mw` around `handler`; the first middleware ends up outermost.
pub fn wrap_middleware(mw: &[BoxedMiddleware], handler: BoxedHandler) -> BoxedHandler {
    mw.iter().rev().fold(handler, |next, m| m.wrap(next))
}

/// The application router.
pub struct App {
    router: Router,
    shutdown: ShutdownSignal,
    mw: Vec<BoxedMiddleware>,
    cancel: CancellationToken,
    request_timeout: Option<Duration>,
}

impl App {
    /// Creates an app whose routes are all wrapped by `mw`, first element outermost.
    pub fn new(shutdown: ShutdownSignal, mw: Vec<BoxedMiddleware>) -> Self {
        Self {
            router: Router::new(),
            shutdown,
            mw,
            cancel: CancellationToken::new(),
            request_timeout: None,
        }
    }

    /// Per-request deadline observed by [`Context::run`].
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Parent token of every request's cancellation token. Cancelling it
    /// cancels all in-flight requests.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Registers `handler` for `method` at `/{group}{path}`.
    ///
    /// `mw` is applied innermost (closest to the handler), then the app-wide
    /// middleware. Paths use axum syntax for parameters (`/users/{id}`).
    ///
    /// # Panics
    ///
    /// Panics if the same method and path are registered twice.
    pub fn handle<H>(
        &mut self,
        method: MethodFilter,
        group: &str,
        path: &str,
        handler: H,
        mw: Vec<BoxedMiddleware>,
    ) where
        H: Handler,
    {
        let handler = wrap_middleware(&mw, Arc::new(handler));
        let handler = wrap_middleware(&self.mw, handler);

        let shutdown = self.shutdown.clone();
        let cancel = self.cancel.clone();
        let timeout = self.request_timeout;

        let h = move |req: Request| {
            let handler = handler.clone();
            let shutdown = shutdown.clone();
            let cancel = cancel.child_token();
            async move { dispatch(handler, shutdown, cancel, timeout, req).await }
        };

        let full_path = if group.is_empty() {
            path.to_string()
        } else {
            format!("/{group}{path}")
        };

        let router = std::mem::take(&mut self.router);
        self.router = router.route(&full_path, on(method, h));
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

async fn dispatch(
    handler: BoxedHandler,
    shutdown: ShutdownSignal,
    cancel: CancellationToken,
    timeout: Option<Duration>,
    req: Request,
) -> Response {
    let (mut parts, body) = req.into_parts();

    let trace_id = parts
        .headers
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let params = Path::<HashMap<String, String>>::from_request_parts(&mut parts, &()).await;

    let mut response = match params {
        Ok(Path(params)) => {
            let req = Request::from_parts(parts, body);
            let ctx = Context::new(Values::new(trace_id.clone()), params, cancel, timeout);

            match handler.call(ctx.clone(), req).await {
                Ok(response) => response,
                Err(err) => {
                    if err.is_shutdown() {
                        shutdown.signal(err.to_string());
                    }
                    respond_error(&ctx, &err)
                }
            }
        }
        Err(rejection) => {
            let ctx = Context::new(
                Values::new(trace_id.clone()),
                HashMap::new(),
                cancel,
                timeout,
            );
            let message = rejection.body_text();
            warn!(trace_id = %trace_id, error = %message, "invalid path parameters");
            respond_error(&ctx, &AppError::bad_request(message))
        }
    };

    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::{respond, shutdown};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use std::sync::Mutex;

    /// Records `name` on the way in and out.
    struct Trace {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware for Trace {
        fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
            let name = self.name;
            let log = self.log.clone();
            Arc::new(move |ctx: Context, req: Request| {
                let next = next.clone();
                let log = log.clone();
                async move {
                    log.lock().unwrap().push(format!("{name}>"));
                    let result = next.call(ctx, req).await;
                    log.lock().unwrap().push(format!("<{name}"));
                    result
                }
            })
        }
    }

    fn trace(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> BoxedMiddleware {
        Arc::new(Trace {
            name,
            log: log.clone(),
        })
    }

    #[tokio::test]
    async fn test_middleware_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (signal, _rx) = shutdown::channel();
        let mut app = App::new(signal, vec![trace("a", &log), trace("b", &log)]);

        let handler_log = log.clone();
        app.handle(
            MethodFilter::GET,
            "v1",
            "/ping",
            move |ctx: Context, _req: Request| {
                let log = handler_log.clone();
                async move {
                    log.lock().unwrap().push("handler".into());
                    respond(&ctx, "pong", StatusCode::OK)
                }
            },
            vec![trace("route", &log)],
        );

        let server = TestServer::new(app.into_router()).unwrap();
        server.get("/v1/ping").await.assert_status_ok();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["a>", "b>", "route>", "handler", "<route", "<b", "<a"]
        );
    }

    #[tokio::test]
    async fn test_path_params_and_method() {
        let (signal, _rx) = shutdown::channel();
        let mut app = App::new(signal, vec![]);

        app.handle(
            MethodFilter::GET,
            "v1",
            "/users/{page}/{rows}",
            |ctx: Context, _req: Request| async move {
                let body = format!(
                    "{}:{}",
                    ctx.param("page").unwrap_or(""),
                    ctx.param("rows").unwrap_or("")
                );
                respond(&ctx, body, StatusCode::OK)
            },
            vec![],
        );

        let server = TestServer::new(app.into_router()).unwrap();

        let response = server.get("/v1/users/3/25").await;
        response.assert_status_ok();
        assert_eq!(response.json::<String>(), "3:25");

        server
            .post("/v1/users/3/25")
            .await
            .assert_status(StatusCode::METHOD_NOT_ALLOWED);
        server.get("/v1/users/3").await.assert_status_not_found();
    }

    #[tokio::test]
    async fn test_trace_id_propagated() {
        let (signal, _rx) = shutdown::channel();
        let mut app = App::new(signal, vec![]);
        app.handle(
            MethodFilter::GET,
            "",
            "/trace",
            |ctx: Context, _req: Request| async move {
                let id = ctx.trace_id().to_string();
                respond(&ctx, id, StatusCode::OK)
            },
            vec![],
        );

        let server = TestServer::new(app.into_router()).unwrap();

        let response = server.get("/trace").add_header("x-request-id", "abc-123").await;
        assert_eq!(response.json::<String>(), "abc-123");
        assert_eq!(response.header("x-request-id"), "abc-123");

        let response = server.get("/trace").await;
        let generated = response.json::<String>();
        assert!(Uuid::parse_str(&generated).is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_error_signals_once() {
        let (signal, mut rx) = shutdown::channel();
        let observer = signal.clone();
        let mut app = App::new(signal, vec![]);
        app.handle(
            MethodFilter::GET,
            "",
            "/fatal",
            |_ctx: Context, _req: Request| async move { Err::<Response, _>(AppError::shutdown("integrity lost")) },
            vec![],
        );

        let server = TestServer::new(app.into_router()).unwrap();

        server
            .get("/fatal")
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        server
            .get("/fatal")
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR);

        assert!(observer.is_signalled());
        assert!(rx.recv().await.unwrap().contains("integrity lost"));
        assert_eq!(rx.try_recv(), None);
    }

    #[tokio::test]
    async fn test_plain_error_does_not_signal() {
        let (signal, mut rx) = shutdown::channel();
        let observer = signal.clone();
        let mut app = App::new(signal, vec![]);
        app.handle(
            MethodFilter::GET,
            "",
            "/boom",
            |_ctx: Context, _req: Request| async move { Err::<Response, _>(AppError::internal("boom")) },
            vec![],
        );

        let server = TestServer::new(app.into_router()).unwrap();
        server
            .get("/boom")
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR);

        assert!(!observer.is_signalled());
        assert_eq!(rx.try_recv(), None);
    }

    #[tokio::test]
    async fn test_root_cancellation_reaches_request() {
        let (signal, _rx) = shutdown::channel();
        let mut app = App::new(signal, vec![]);
        let root = app.cancellation_token();
        app.handle(
            MethodFilter::GET,
            "",
            "/slow",
            |ctx: Context, _req: Request| async move {
                ctx.run(std::future::pending::<()>()).await?;
                respond(&ctx, "done", StatusCode::OK)
            },
            vec![],
        );

        root.cancel();

        let server = TestServer::new(app.into_router()).unwrap();
        server
            .get("/slow")
            .await
            .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_shutdown_status_recorded_without_errors_middleware() {
        let seen: Arc<Mutex<Option<Context>>> = Arc::new(Mutex::new(None));

        struct Capture(Arc<Mutex<Option<Context>>>);

        impl Middleware for Capture {
            fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
                let seen = self.0.clone();
                Arc::new(move |ctx: Context, req: Request| {
                    *seen.lock().unwrap() = Some(ctx.clone());
                    next.call(ctx, req)
                })
            }
        }

        let (signal, _rx) = shutdown::channel();
        let mw: Vec<BoxedMiddleware> = vec![Arc::new(Capture(seen.clone()))];
        let mut app = App::new(signal, mw);
        app.handle(
            MethodFilter::GET,
            "",
            "/fatal",
            |_ctx: Context, _req: Request| async move {
                Err::<Response, _>(AppError::shutdown("integrity lost"))
            },
            vec![],
        );

        let server = TestServer::new(app.into_router()).unwrap();
        server
            .get("/fatal")
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR);

        let ctx = seen.lock().unwrap().take().unwrap();
        assert_eq!(ctx.values().status_code(), 500);
    }

    #[tokio::test]
    async fn test_undecodable_path_param_is_bad_request() {
        let (signal, _rx) = shutdown::channel();
        let mut app = App::new(signal, vec![]);
        app.handle(
            MethodFilter::GET,
            "v1",
            "/users/{id}",
            |ctx: Context, _req: Request| async move {
                let id = ctx.param("id").unwrap_or_default().to_string();
                respond(&ctx, id, StatusCode::OK)
            },
            vec![],
        );

        let server = TestServer::new(app.into_router()).unwrap();

        let response = server.get("/v1/users/%FF").await;
        response.assert_status_bad_request();
        let json = response.json::<serde_json::Value>();
        assert_eq!(json["error"]["code"], "request_error");
        assert!(!response.header("x-request-id").is_empty());

        let response = server.get("/v1/users/abc%20def").await;
        response.assert_status_ok();
        assert_eq!(response.json::<String>(), "abc def");
    }
}
