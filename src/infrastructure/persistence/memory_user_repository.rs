//! Process-local user store with argon2 password hashes.

use std::collections::BTreeMap;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::{Claims, Role};
use crate::domain::entities::{NewUser, User, UserPatch};
use crate::domain::repositories::{RepositoryError, UserRepository};

/// User repository backed by an ordered in-memory map.
///
/// Contents are lost on restart. Password hashing runs on the blocking pool.
pub struct InMemoryUserRepository {
    users: RwLock<BTreeMap<Uuid, User>>,
    issuer: String,
    token_ttl: Duration,
}

impl InMemoryUserRepository {
    /// Creates an empty store whose issued claims carry `issuer` and expire
    /// `token_ttl` after authentication.
    pub fn new(issuer: impl Into<String>, token_ttl: Duration) -> Self {
        Self {
            users: RwLock::new(BTreeMap::new()),
            issuer: issuer.into(),
            token_ttl,
        }
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

fn parse_id(id: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(id).map_err(|_| RepositoryError::InvalidId)
}

fn check_access(claims: &Claims, id: Uuid) -> Result<(), RepositoryError> {
    if claims.is_admin() || claims.subject == id.to_string() {
        return Ok(());
    }
    Err(RepositoryError::Forbidden)
}

async fn hash_password(password: String) -> Result<String, RepositoryError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
            .map_err(|e| RepositoryError::PasswordHash(e.to_string()))?;

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| RepositoryError::PasswordHash(e.to_string()))
    })
    .await
    .map_err(|e| RepositoryError::PasswordHash(e.to_string()))?
}

async fn verify_password(password: String, hash: String) -> Result<bool, RepositoryError> {
    tokio::task::spawn_blocking(move || {
        let parsed =
            PasswordHash::new(&hash).map_err(|e| RepositoryError::PasswordHash(e.to_string()))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| RepositoryError::PasswordHash(e.to_string()))?
}

fn email_taken(users: &BTreeMap<Uuid, User>, email: &str, except: Option<Uuid>) -> bool {
    users
        .values()
        .any(|u| Some(u.id) != except && u.email.eq_ignore_ascii_case(email))
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn authenticate(
        &self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Claims, RepositoryError> {
        let user = {
            let users = self.users.read().await;
            users
                .values()
                .find(|u| u.email.eq_ignore_ascii_case(email))
                .cloned()
                .ok_or(RepositoryError::NotFound)?
        };

        if !verify_password(password.to_string(), user.password_hash).await? {
            debug!(user_id = %user.id, "password mismatch");
            return Err(RepositoryError::AuthenticationFailure);
        }

        Ok(Claims::new(
            self.issuer.clone(),
            user.id.to_string(),
            now,
            self.token_ttl,
            user.roles,
        ))
    }

    async fn query(&self, page: usize, rows: usize) -> Result<Vec<User>, RepositoryError> {
        let offset = page.saturating_sub(1).saturating_mul(rows);

        let users = self.users.read().await;
        Ok(users.values().skip(offset).take(rows).cloned().collect())
    }

    async fn query_by_id(&self, claims: &Claims, id: &str) -> Result<User, RepositoryError> {
        let id = parse_id(id)?;
        check_access(claims, id)?;

        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn create(&self, new_user: NewUser, now: DateTime<Utc>) -> Result<User, RepositoryError> {
        let password_hash = hash_password(new_user.password).await?;

        let mut users = self.users.write().await;
        if email_taken(&users, &new_user.email, None) {
            return Err(RepositoryError::DuplicateEmail(new_user.email));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            roles: new_user.roles,
            password_hash,
            date_created: now,
            date_updated: now,
        };
        users.insert(user.id, user.clone());

        info!(user_id = %user.id, "user created");
        Ok(user)
    }

    async fn update(
        &self,
        claims: &Claims,
        id: &str,
        patch: UserPatch,
        now: DateTime<Utc>,
    ) -> Result<User, RepositoryError> {
        let id = parse_id(id)?;
        check_access(claims, id)?;

        // Only admins may change roles.
        if patch.roles.is_some() && !claims.is_admin() {
            return Err(RepositoryError::Forbidden);
        }

        let password_hash = match patch.password {
            Some(password) => Some(hash_password(password).await?),
            None => None,
        };

        let mut users = self.users.write().await;

        if let Some(email) = &patch.email {
            if email_taken(&users, email, Some(id)) {
                return Err(RepositoryError::DuplicateEmail(email.clone()));
            }
        }

        let user = users.get_mut(&id).ok_or(RepositoryError::NotFound)?;

        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(roles) = patch.roles {
            user.roles = roles;
        }
        if let Some(hash) = password_hash {
            user.password_hash = hash;
        }
        user.date_updated = now;

        Ok(user.clone())
    }

    async fn delete(&self, claims: &Claims, id: &str) -> Result<(), RepositoryError> {
        let id = parse_id(id)?;
        check_access(claims, id)?;

        self.users
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

/// Roles granted to the seeded administrator.
pub fn admin_roles() -> std::collections::BTreeSet<Role> {
    [Role::Admin, Role::User].into_iter().collect()
}
