//! CLI command implementations.

pub mod account;
pub mod migrate;

use secrecy::SecretString;
use sqlx::PgPool;

/// Errors shared by the commands.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Store operation failed.
    #[error("Store error: {0}")]
    Repository(#[from] marketplace_api::db::RepositoryError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Invalid account kind.
    #[error("Invalid kind: {0}. Valid kinds: user, vendor")]
    InvalidKind(String),

    /// No account with this email.
    #[error("No account with email: {0}")]
    AccountNotFound(String),
}

/// Connect to the marketplace database.
///
/// Reads `MARKETPLACE_DATABASE_URL`, falling back to `DATABASE_URL`.
pub(crate) async fn connect() -> Result<PgPool, CliError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("MARKETPLACE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CliError::MissingEnvVar("MARKETPLACE_DATABASE_URL"))?;

    tracing::info!("Connecting to marketplace database...");
    let pool = marketplace_api::db::create_pool(&SecretString::from(database_url)).await?;
    Ok(pool)
}
