//! Repository implementations.
//!
//! - [`InMemoryUserRepository`] - User storage with argon2 password hashes

pub mod memory_user_repository;

pub use memory_user_repository::{InMemoryUserRepository, admin_roles};
