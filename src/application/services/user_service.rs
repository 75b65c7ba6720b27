//! User management and token issuing service.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::auth::{AuthError, Authenticator, Claims};
use crate::domain::entities::{NewUser, User, UserPatch};
use crate::domain::repositories::UserRepository;
use crate::error::AppError;

/// Service for user CRUD and credential exchange.
///
/// Repository failures are translated into [`AppError`] kinds; access rules
/// are enforced by the repository.
pub struct UserService<R: UserRepository + ?Sized = dyn UserRepository> {
    repository: Arc<R>,
    authenticator: Arc<Authenticator>,
}

impl<R: UserRepository + ?Sized> UserService<R> {
    pub fn new(repository: Arc<R>, authenticator: Arc<Authenticator>) -> Self {
        Self {
            repository,
            authenticator,
        }
    }

    /// Exchanges email and password for a signed token.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if no user has `email`
    /// - [`AppError::Unauthorized`] if the password does not match
    /// - [`AppError::Shutdown`] if the active signing key is gone; the
    ///   process can no longer issue tokens and must restart
    pub async fn token(
        &self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let claims = self.repository.authenticate(email, password, now).await?;

        let token = self.authenticator.issue_token(&claims).map_err(|e| match e {
            AuthError::SigningKeyUnavailable { .. } => {
                error!(error = %e, "cannot sign tokens");
                AppError::shutdown(e.to_string())
            }
            other => AppError::Internal(anyhow::Error::new(other).context("generating token")),
        })?;

        info!(user_id = %claims.subject, kid = %self.authenticator.active_kid(), "token issued");
        Ok(token)
    }

    pub async fn query(&self, page: usize, rows: usize) -> Result<Vec<User>, AppError> {
        Ok(self.repository.query(page, rows).await?)
    }

    pub async fn query_by_id(&self, claims: &Claims, id: &str) -> Result<User, AppError> {
        Ok(self.repository.query_by_id(claims, id).await?)
    }

    pub async fn create(&self, new_user: NewUser, now: DateTime<Utc>) -> Result<User, AppError> {
        Ok(self.repository.create(new_user, now).await?)
    }

    /// # Errors
    ///
    /// Returns a `400` request error for an empty patch.
    pub async fn update(
        &self,
        claims: &Claims,
        id: &str,
        patch: UserPatch,
        now: DateTime<Utc>,
    ) -> Result<User, AppError> {
        if patch.is_empty() {
            return Err(AppError::bad_request("no fields to update"));
        }

        Ok(self.repository.update(claims, id, patch, now).await?)
    }

    pub async fn delete(&self, claims: &Claims, id: &str) -> Result<(), AppError> {
        Ok(self.repository.delete(claims, id).await?)
    }
}
