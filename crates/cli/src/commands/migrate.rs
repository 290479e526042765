//! Database migration command.
//!
//! Migrations live in `crates/api/migrations/` and are embedded at compile
//! time. The API server never runs them on startup.

use super::{CliError, connect};

/// Apply all pending migrations.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running marketplace migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Marketplace migrations complete!");
    Ok(())
}
