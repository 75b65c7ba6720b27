//! Request pipeline framework.
//!
//! A thin layer over axum that gives every request a [`Context`] and runs it
//! through an ordered chain of [`Middleware`] before the [`Handler`].
//!
//! # Modules
//!
//! - [`app`] - Route registration and middleware composition
//! - [`context`] - Per-request values, path parameters and cancellation
//! - [`shutdown`] - Escalation channel from handlers to the server loop

pub mod app;
pub mod context;
mod respond;
pub mod shutdown;

pub use app::{App, BoxedHandler, BoxedMiddleware, Handler, HandlerResult, Middleware};
pub use context::{Context, Values};
pub use respond::{decode, respond, respond_error};
pub use shutdown::{ShutdownReceiver, ShutdownSignal};
