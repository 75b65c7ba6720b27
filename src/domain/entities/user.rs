//! User entity and its creation/update inputs.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::Role;

/// A stored user.
///
/// The password hash is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub roles: BTreeSet<Role>,
    #[serde(skip)]
    pub password_hash: String,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

/// Data required to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub roles: BTreeSet<Role>,
    pub password: String,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub roles: Option<BTreeSet<Role>>,
    pub password: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.roles.is_none() && self.password.is_none()
    }
}
