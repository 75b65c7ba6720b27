//! REST API layer for HTTP request/response handling.
//!
//! # Modules
//!
//! - [`dto`] - Data Transfer Objects for request/response serialization
//! - [`handlers`] - HTTP request handlers
//! - [`middleware`] - Pipeline middleware (logging, errors, metrics, panics, auth)
//! - [`routes`] - Route registration

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
