//! Repository trait for user storage and credential checks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::auth::Claims;
use crate::domain::entities::{NewUser, User, UserPatch};
use crate::error::AppError;

/// Failure kinds reported by a [`UserRepository`].
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("not found")]
    NotFound,
    #[error("ID is not in its proper form")]
    InvalidId,
    #[error("attempted action is not allowed")]
    Forbidden,
    #[error("authentication failed")]
    AuthenticationFailure,
    #[error("email [{0}] is already in use")]
    DuplicateEmail(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("password hashing: {0}")]
    PasswordHash(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => AppError::not_found(err.to_string()),
            RepositoryError::InvalidId => AppError::bad_request(err.to_string()),
            RepositoryError::Forbidden => AppError::forbidden(err.to_string()),
            RepositoryError::AuthenticationFailure => AppError::unauthorized(err.to_string()),
            RepositoryError::DuplicateEmail(_) => AppError::conflict(err.to_string()),
            RepositoryError::Unavailable(_) | RepositoryError::PasswordHash(_) => {
                AppError::Internal(anyhow::Error::new(err))
            }
        }
    }
}

/// Repository interface for user management.
///
/// Operations that act on a single user take the caller's [`Claims`]; only
/// admins or the user themselves may read, update or delete a user
/// ([`RepositoryError::Forbidden`] otherwise). Ids are checked for form
/// before access rights ([`RepositoryError::InvalidId`]).
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::InMemoryUserRepository`] - Process-local store
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Checks `email`/`password` and returns the claims for a new token.
    ///
    /// # Errors
    ///
    /// - [`RepositoryError::NotFound`] if no user has `email`
    /// - [`RepositoryError::AuthenticationFailure`] if the password is wrong
    async fn authenticate(
        &self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Claims, RepositoryError>;

    /// Returns page `page` (1-based) of `rows` users ordered by id.
    async fn query(&self, page: usize, rows: usize) -> Result<Vec<User>, RepositoryError>;

    async fn query_by_id(&self, claims: &Claims, id: &str) -> Result<User, RepositoryError>;

    /// # Errors
    ///
    /// Returns [`RepositoryError::DuplicateEmail`] if the email is taken.
    async fn create(&self, new_user: NewUser, now: DateTime<Utc>) -> Result<User, RepositoryError>;

    async fn update(
        &self,
        claims: &Claims,
        id: &str,
        patch: UserPatch,
        now: DateTime<Utc>,
    ) -> Result<User, RepositoryError>;

    async fn delete(&self, claims: &Claims, id: &str) -> Result<(), RepositoryError>;
}
