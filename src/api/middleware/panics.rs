//! Panic recovery middleware.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Once};

use anyhow::anyhow;
use axum::extract::Request;
use futures::FutureExt;

use crate::error::AppError;
use crate::metrics::Metrics;
use crate::web::{BoxedHandler, Context, Middleware};

thread_local! {
    static LAST_BACKTRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Chains a hook that keeps the backtrace of the panicking thread, since it
/// is gone once the stack has unwound into the recovery boundary.
fn install_backtrace_hook() {
    HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let trace = Backtrace::force_capture().to_string();
            LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

/// Converts a panic in the inner chain into an internal error.
///
/// The error carries the panic message and backtrace for the logs; the
/// client only ever sees an opaque `500`. The panic is never re-raised.
#[derive(Debug, Clone)]
pub struct Panics {
    metrics: Arc<Metrics>,
}

impl Panics {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        install_backtrace_hook();
        Self { metrics }
    }
}

impl Middleware for Panics {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        let metrics = self.metrics.clone();
        Arc::new(move |ctx: Context, req: Request| {
            let next = next.clone();
            let metrics = metrics.clone();
            async move {
                // The call itself is inside the boundary too: a handler may
                // panic before returning its future.
                let guarded = AssertUnwindSafe(async move { next.call(ctx, req).await });

                match guarded.catch_unwind().await {
                    Ok(result) => result,
                    Err(payload) => {
                        metrics.add_panic();

                        let trace = LAST_BACKTRACE
                            .with(|slot| slot.borrow_mut().take())
                            .unwrap_or_else(|| Backtrace::force_capture().to_string());

                        Err(AppError::Internal(anyhow!(
                            "PANIC [{}] TRACE[{}]",
                            panic_message(&*payload),
                            trace
                        )))
                    }
                }
            }
        })
    }
}
