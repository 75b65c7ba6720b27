//! Identity payload carried inside signed tokens.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Fixed role vocabulary understood by tokens and route registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "USER" => Ok(Role::User),
            other => Err(format!("unknown role [{other}]")),
        }
    }
}

/// Claims embedded in a token.
///
/// Serialized with the registered JWT names (`iss`, `sub`, `iat`, `exp`) plus
/// a `roles` array. Timestamps are Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "iss")]
    pub issuer: String,
    #[serde(rename = "sub")]
    pub subject: String,
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "exp")]
    pub expires_at: i64,
    pub roles: BTreeSet<Role>,
}

impl Claims {
    /// Builds claims valid from `now` for `ttl`. A lifetime past the
    /// representable range expires at the latest representable instant.
    pub fn new(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        now: DateTime<Utc>,
        ttl: Duration,
        roles: impl IntoIterator<Item = Role>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            subject: subject.into(),
            issued_at: now.timestamp(),
            expires_at: now
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
                .timestamp(),
            roles: roles.into_iter().collect(),
        }
    }

    /// `expires_at` must be strictly after `issued_at`.
    pub fn is_well_formed(&self) -> bool {
        self.expires_at > self.issued_at
    }

    /// Returns `true` when the claims hold at least one of `roles`.
    pub fn authorized(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| self.roles.contains(r))
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}
