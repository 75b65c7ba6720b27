//! # Retail API
//!
//! An HTTP service skeleton with a composable request pipeline and RS256
//! token authentication, built with Axum.
//!
//! ## Architecture
//!
//! - **Auth** ([`auth`]) - Claims, key lookup by `kid`, token issuing and validation
//! - **Web** ([`web`]) - Handler/middleware contracts, per-request context, shutdown escalation
//! - **Domain Layer** ([`domain`]) - User entity and repository trait
//! - **Application Layer** ([`application`]) - User service
//! - **Infrastructure Layer** ([`infrastructure`]) - In-memory user store
//! - **API Layer** ([`api`]) - Routes, handlers, DTOs and middleware
//!
//! ## Features
//!
//! - Middleware chain: logging, error translation, metrics, panic recovery
//! - Bearer authentication and role-based authorization per route
//! - Key rotation: tokens signed by any loaded key stay valid
//! - Fatal errors reported by a handler shut the server down gracefully
//!
//! ## Quick Start
//!
//! ```bash
//! # Keys are read from <kid>.pem / <kid>.pub.pem files
//! export AUTH_KEYS_FOLDER="deploy/keys/"
//! export AUTH_ACTIVE_KID="54bb2165-71e1-41a6-af3e-7da4a0e1e2c1"
//! export ADMIN_EMAIL="admin@example.com"
//! export ADMIN_PASSWORD="gophers"
//!
//! cargo run
//! ```
//!
//! ## Configuration
//!
//! Service configuration is loaded from environment variables via [`config::Config`].
//! See [`config`] module for available options.

pub mod api;
pub mod application;
pub mod auth;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod metrics;
pub mod state;

pub mod config;
pub mod server;

pub mod routes;
pub mod web;

pub use error::AppError;
pub use state::AppState;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::application::services::UserService;
    pub use crate::auth::{Authenticator, Claims, KeyStore, Role};
    pub use crate::domain::entities::{NewUser, User, UserPatch};
    pub use crate::error::AppError;
    pub use crate::metrics::Metrics;
    pub use crate::state::AppState;
    pub use crate::web::{App, Context, ShutdownSignal};
}
