//! Domain layer: user entities and the persistence contract.
//!
//! - [`entities`] - User data structures
//! - [`repositories`] - Data access trait definitions
//!
//! Implementations of the repository traits live in
//! [`crate::infrastructure::persistence`].

pub mod entities;
pub mod repositories;
