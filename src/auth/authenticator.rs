//! RS256 token issuing and validation with `kid`-based key lookup.

use std::sync::Arc;

use jsonwebtoken::{Algorithm, Header, Validation, decode, decode_header, encode, errors::ErrorKind};
use tracing::debug;

use super::claims::Claims;
use super::keystore::{KeyError, KeyProvider};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("signing key unavailable for kid [{kid}]")]
    SigningKeyUnavailable {
        kid: String,
        #[source]
        source: KeyError,
    },
    #[error("invalid claims: {0}")]
    InvalidClaims(&'static str),
    #[error("signing token")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("malformed token")]
    MalformedToken,
    #[error("unknown key id [{0}]")]
    UnknownKeyId(String),
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token expired")]
    TokenExpired,
}

/// Issues and validates signed tokens.
///
/// New tokens are always signed with the active kid. Validation resolves the
/// verification key from the kid in the token header, so tokens signed
/// before a key rotation keep validating while their public key is retained.
pub struct Authenticator {
    active_kid: String,
    keys: Arc<dyn KeyProvider>,
    algorithm: Algorithm,
    validation: Validation,
}

impl Authenticator {
    /// Creates an authenticator signing with `active_kid`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SigningKeyUnavailable`] if `keys` has no signing
    /// key for `active_kid`.
    pub fn new(active_kid: impl Into<String>, keys: Arc<dyn KeyProvider>) -> Result<Self, AuthError> {
        let active_kid = active_kid.into();

        if let Err(source) = keys.signing_key(&active_kid) {
            return Err(AuthError::SigningKeyUnavailable {
                kid: active_kid,
                source,
            });
        }

        let algorithm = Algorithm::RS256;
        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Ok(Self {
            active_kid,
            keys,
            algorithm,
            validation,
        })
    }

    pub fn active_kid(&self) -> &str {
        &self.active_kid
    }

    /// Signs `claims` with the active key.
    pub fn issue_token(&self, claims: &Claims) -> Result<String, AuthError> {
        if !claims.is_well_formed() {
            return Err(AuthError::InvalidClaims("expires_at must be after issued_at"));
        }

        let key = self
            .keys
            .signing_key(&self.active_kid)
            .map_err(|source| AuthError::SigningKeyUnavailable {
                kid: self.active_kid.clone(),
                source,
            })?;

        let mut header = Header::new(self.algorithm);
        header.kid = Some(self.active_kid.clone());

        encode(&header, claims, &key).map_err(AuthError::Signing)
    }

    /// Verifies `token` and returns its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;

        if header.alg != self.algorithm {
            debug!(alg = ?header.alg, "rejecting token signed with unexpected algorithm");
            return Err(AuthError::InvalidSignature);
        }

        let kid = header.kid.ok_or(AuthError::MalformedToken)?;

        let key = self.keys.verification_key(&kid).map_err(|e| {
            debug!(kid = %kid, error = %e, "no verification key");
            AuthError::UnknownKeyId(kid.clone())
        })?;

        let data = decode::<Claims>(token, &key, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::InvalidSignature,
            _ => AuthError::MalformedToken,
        })?;

        Ok(data.claims)
    }
}
