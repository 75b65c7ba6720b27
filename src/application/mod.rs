//! Application layer services implementing business logic.
//!
//! Services consume repository traits and provide a clean API for HTTP
//! handlers.
//!
//! # Available Services
//!
//! - [`services::user_service::UserService`] - User management and token issuing

pub mod services;
