//! Application configuration loaded from environment variables.
//!
//! Configuration is loaded once at startup and validated before the server starts.
//!
//! ## Required Variables
//!
//! - `AUTH_ACTIVE_KID` - Key id used to sign new tokens; `<kid>.pem` must
//!   exist in the keys folder
//!
//! ## Optional Variables
//!
//! - `LISTEN` - Bind address (default: `0.0.0.0:3000`)
//! - `RUST_LOG` - Log level (default: `info`)
//! - `LOG_FORMAT` - Log format: `text` or `json` (default: `text`)
//! - `SHUTDOWN_TIMEOUT` - Seconds to drain in-flight requests (default: 20)
//! - `REQUEST_TIMEOUT` - Per-request deadline in seconds (default: none)
//! - `AUTH_KEYS_FOLDER` - Directory of PEM keys (default: `deploy/keys/`)
//! - `AUTH_ISSUER` - Token issuer (default: `retail-api`)
//! - `AUTH_TOKEN_TTL` - Token lifetime in seconds (default: 3600)
//! - `ADMIN_EMAIL` / `ADMIN_PASSWORD` - Seed administrator; both or neither
//!
//! ```bash
//! export AUTH_ACTIVE_KID="54bb2165-71e1-41a6-af3e-7da4a0e1e2c1"
//! export AUTH_KEYS_FOLDER="deploy/keys/"
//! export ADMIN_EMAIL="admin@example.com"
//! export ADMIN_PASSWORD="gophers"
//! ```

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound for `REQUEST_TIMEOUT`.
pub const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);
/// Upper bound for `AUTH_TOKEN_TTL`.
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub log_level: String,
    pub log_format: String,
    /// Upper bound on graceful shutdown before in-flight requests are cancelled.
    pub shutdown_timeout: Duration,
    pub request_timeout: Option<Duration>,

    pub keys_folder: PathBuf,
    pub active_kid: String,
    pub issuer: String,
    pub token_ttl: Duration,

    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

/// Parses `name` if set, failing on an unparsable value.
fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("{name} has an invalid value '{raw}'")),
        Err(_) => Ok(None),
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `AUTH_ACTIVE_KID` is missing or a numeric variable
    /// cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let listen_addr = env::var("LISTEN").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

        let shutdown_timeout =
            Duration::from_secs(parse_var("SHUTDOWN_TIMEOUT")?.unwrap_or(20));
        let request_timeout = parse_var::<u64>("REQUEST_TIMEOUT")?.map(Duration::from_secs);

        let keys_folder = PathBuf::from(
            env::var("AUTH_KEYS_FOLDER").unwrap_or_else(|_| "deploy/keys/".to_string()),
        );
        let active_kid = env::var("AUTH_ACTIVE_KID").context("AUTH_ACTIVE_KID must be set")?;
        let issuer = env::var("AUTH_ISSUER").unwrap_or_else(|_| "retail-api".to_string());
        let token_ttl = Duration::from_secs(parse_var("AUTH_TOKEN_TTL")?.unwrap_or(3600));

        Ok(Self {
            listen_addr,
            log_level,
            log_format,
            shutdown_timeout,
            request_timeout,
            keys_folder,
            active_kid,
            issuer,
            token_ttl,
            admin_email: non_empty_var("ADMIN_EMAIL"),
            admin_password: non_empty_var("ADMIN_PASSWORD"),
        })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `log_format` is not `text` or `json`
    /// - `listen_addr` is invalid
    /// - a timeout or the token lifetime is zero
    /// - `REQUEST_TIMEOUT` exceeds [`MAX_REQUEST_TIMEOUT`] or `AUTH_TOKEN_TTL`
    ///   exceeds [`MAX_TOKEN_TTL`]
    /// - `active_kid` or `issuer` is empty
    /// - only one of `ADMIN_EMAIL` / `ADMIN_PASSWORD` is set
    pub fn validate(&self) -> Result<()> {
        if self.log_format != "text" && self.log_format != "json" {
            anyhow::bail!(
                "LOG_FORMAT must be 'text' or 'json', got '{}'",
                self.log_format
            );
        }

        if !self.listen_addr.contains(':') {
            anyhow::bail!(
                "LISTEN must be in format 'host:port', got '{}'",
                self.listen_addr
            );
        }

        if self.shutdown_timeout.is_zero() {
            anyhow::bail!("SHUTDOWN_TIMEOUT must be greater than 0");
        }

        if let Some(timeout) = self.request_timeout {
            if timeout.is_zero() || timeout > MAX_REQUEST_TIMEOUT {
                anyhow::bail!(
                    "REQUEST_TIMEOUT must be between 1 and {} seconds when set",
                    MAX_REQUEST_TIMEOUT.as_secs()
                );
            }
        }

        if self.active_kid.trim().is_empty() {
            anyhow::bail!("AUTH_ACTIVE_KID must not be empty");
        }

        if self.issuer.trim().is_empty() {
            anyhow::bail!("AUTH_ISSUER must not be empty");
        }

        if self.token_ttl.is_zero() || self.token_ttl > MAX_TOKEN_TTL {
            anyhow::bail!(
                "AUTH_TOKEN_TTL must be between 1 and {} seconds",
                MAX_TOKEN_TTL.as_secs()
            );
        }

        if self.admin_email.is_some() != self.admin_password.is_some() {
            anyhow::bail!("ADMIN_EMAIL and ADMIN_PASSWORD must be set together");
        }

        Ok(())
    }

    /// Prints configuration summary (without sensitive data).
    pub fn print_summary(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Listen address: {}", self.listen_addr);
        tracing::info!("  Log level: {}", self.log_level);
        tracing::info!("  Log format: {}", self.log_format);
        tracing::info!("  Shutdown timeout: {:?}", self.shutdown_timeout);
        match self.request_timeout {
            Some(t) => tracing::info!("  Request timeout: {:?}", t),
            None => tracing::info!("  Request timeout: none"),
        }
        tracing::info!("  Keys folder: {}", self.keys_folder.display());
        tracing::info!("  Active kid: {}", self.active_kid);
        tracing::info!("  Issuer: {}", self.issuer);
        tracing::info!("  Token TTL: {:?}", self.token_ttl);

        if let Some(ref email) = self.admin_email {
            tracing::info!(
                "  Seed admin: {} (password {})",
                email,
                mask_secret(self.admin_password.as_deref().unwrap_or_default())
            );
        } else {
            tracing::info!("  Seed admin: disabled");
        }
    }
}

/// Masks a secret for logging, keeping only whether it is set.
fn mask_secret(secret: &str) -> &'static str {
    if secret.is_empty() { "<unset>" } else { "***" }
}

/// Loads and validates configuration from environment variables.
///
/// # Errors
///
/// Returns an error if required variables are missing or validation fails.
///
/// # Note
///
/// This function expects environment variables to be already loaded
/// (e.g., via `dotenvy::dotenv()` in `main.rs`).
pub fn load_from_env() -> Result<Config> {
    let config = Config::from_env()?;
    config.validate()?;
    Ok(config)
}
