//! Claims-based authentication.
//!
//! - [`claims`] - token payload and role vocabulary
//! - [`keystore`] - key lookup by key identifier
//! - [`authenticator`] - RS256 token issuing and validation

pub mod authenticator;
pub mod claims;
pub mod keystore;

pub use authenticator::{AuthError, Authenticator};
pub use claims::{Claims, Role};
pub use keystore::{KeyError, KeyProvider, KeyStore};
