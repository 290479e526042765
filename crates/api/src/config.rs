//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MARKETPLACE_PUBLIC_URL` - Public URL used in emailed links and redirects
//! - `MARKETPLACE_ACCOUNT_TOKEN_SECRET` - Signing secret for account sessions (min 32 chars, high entropy)
//! - `MARKETPLACE_VENDOR_TOKEN_SECRET` - Signing secret for vendor sessions (min 32 chars, high entropy,
//!   must differ from the account secret)
//!
//! ## Optional
//! - `MARKETPLACE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`;
//!   the in-memory store is used when neither is set)
//! - `MARKETPLACE_HOST` - Bind address (default: 127.0.0.1)
//! - `MARKETPLACE_PORT` - Listen port (default: 5000)
//! - `MARKETPLACE_UPLOAD_DIR` - Root directory for uploaded files (default: uploads)
//! - `MARKETPLACE_SESSION_TTL_HOURS` - Session token lifetime (default: 120)
//! - `MARKETPLACE_RESET_TOKEN_TTL_MINUTES` - Password reset code lifetime (default: 15)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD` - Outbound mail relay.
//!   Without `SMTP_HOST` mail is written to the log instead of sent.
//! - `EMAIL_FROM` - Sender address (default: `Marketplace <no-reply@marketplace.local>`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use chrono::Duration;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_EMAIL_FROM: &str = "Marketplace <no-reply@marketplace.local>";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL; `None` selects the in-memory store
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, without a trailing slash
    pub public_url: String,
    /// Root directory of the attachment store
    pub upload_dir: PathBuf,
    /// Session token signing configuration
    pub sessions: SessionConfig,
    /// How long a password reset code stays valid
    pub reset_token_ttl: Duration,
    /// SMTP relay; `None` logs outbound mail instead
    pub email: Option<EmailConfig>,
    /// Sender address for outbound mail
    pub email_from: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Session token configuration.
///
/// Account and vendor sessions are signed with different secrets so a token
/// of one kind never validates as the other. Implements `Debug` manually to
/// redact both secrets.
#[derive(Clone)]
pub struct SessionConfig {
    /// Secret for account (`userId`) tokens
    pub account_secret: SecretString,
    /// Secret for vendor (`vendorId`) tokens
    pub vendor_secret: SecretString,
    /// Token lifetime
    pub ttl: Duration,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("account_secret", &"[REDACTED]")
            .field("vendor_secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// SMTP relay configuration.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP relay host
    pub smtp_host: String,
    /// SMTP port (STARTTLS)
    pub smtp_port: u16,
    /// SMTP username
    pub smtp_username: String,
    /// SMTP password
    pub smtp_password: SecretString,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check,
    /// account and vendor secrets being equal).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("MARKETPLACE_DATABASE_URL");
        let host = get_env_or_default("MARKETPLACE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("MARKETPLACE_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("MARKETPLACE_PORT", "5000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("MARKETPLACE_PORT".to_string(), e.to_string())
            })?;
        let public_url =
            normalize_public_url("MARKETPLACE_PUBLIC_URL", &get_required_env("MARKETPLACE_PUBLIC_URL")?)?;
        let upload_dir = PathBuf::from(get_env_or_default("MARKETPLACE_UPLOAD_DIR", "uploads"));

        let sessions = SessionConfig::from_env()?;
        let reset_token_ttl =
            Duration::minutes(get_positive_number("MARKETPLACE_RESET_TOKEN_TTL_MINUTES", 15)?);

        let email = EmailConfig::from_env()?;
        let email_from = get_env_or_default("EMAIL_FROM", DEFAULT_EMAIL_FROM);

        Ok(Self {
            database_url,
            host,
            port,
            public_url,
            upload_dir,
            sessions,
            reset_token_ttl,
            email,
            email_from,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl SessionConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let account_secret = get_validated_secret("MARKETPLACE_ACCOUNT_TOKEN_SECRET")?;
        validate_token_secret(&account_secret, "MARKETPLACE_ACCOUNT_TOKEN_SECRET")?;
        let vendor_secret = get_validated_secret("MARKETPLACE_VENDOR_TOKEN_SECRET")?;
        validate_token_secret(&vendor_secret, "MARKETPLACE_VENDOR_TOKEN_SECRET")?;
        validate_distinct_secrets(&account_secret, &vendor_secret)?;

        let ttl = Duration::hours(get_positive_number("MARKETPLACE_SESSION_TTL_HOURS", 120)?);

        Ok(Self {
            account_secret,
            vendor_secret,
            ttl,
        })
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };
        let smtp_port = get_env_or_default("SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;

        Ok(Some(Self {
            smtp_host,
            smtp_port,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(SecretString::from)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a positive integer environment variable with a default value.
fn get_positive_number(key: &str, default: i64) -> Result<i64, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<i64>() {
        Ok(value) if value > 0 => Ok(value),
        Ok(value) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be positive (got {value})"),
        )),
        Err(e) => Err(ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}

/// Parse the public URL and strip any trailing slash.
fn normalize_public_url(key: &str, raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must include a host".to_string(),
        ));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Validate that a token secret meets minimum length requirements.
fn validate_token_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_TOKEN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_TOKEN_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Account and vendor tokens must not be interchangeable.
fn validate_distinct_secrets(
    account: &SecretString,
    vendor: &SecretString,
) -> Result<(), ConfigError> {
    if account.expose_secret() == vendor.expose_secret() {
        return Err(ConfigError::InsecureSecret(
            "MARKETPLACE_VENDOR_TOKEN_SECRET".to_string(),
            "must differ from MARKETPLACE_ACCOUNT_TOKEN_SECRET".to_string(),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
