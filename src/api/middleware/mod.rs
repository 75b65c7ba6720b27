//! Request pipeline middleware.
//!
//! Process-wide, outermost first: [`Logger`], [`Errors`], [`RequestMetrics`],
//! [`Panics`]. Route scoped: [`Authenticate`], [`Authorize`].

pub mod auth;
pub mod errors;
pub mod logger;
pub mod metrics;
pub mod panics;

pub use auth::{Authenticate, Authorize};
pub use errors::Errors;
pub use logger::Logger;
pub use metrics::RequestMetrics;
pub use panics::Panics;
