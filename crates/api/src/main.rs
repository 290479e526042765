//! Marketplace API - REST backend for accounts, vendors and the catalog.
//!
//! This binary serves the JSON API on port 5000 by default.
//!
//! # Architecture
//!
//! - Axum web framework, JSON in and out
//! - `PostgreSQL` document store via sqlx (in-memory store without a database)
//! - Signed session tokens, separate secrets for accounts and vendors
//! - Uploaded images on local disk, served at `/uploads`
//! - SMTP mail for verification and password reset codes

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::Arc;

use marketplace_api::config::ApiConfig;
use marketplace_api::db::{self, MemoryStore, PgStore, Store};
use marketplace_api::middleware::credentials_rate_limiter;
use marketplace_api::services::email::{LogMailer, Mailer, SmtpMailer};
use marketplace_api::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Start Sentry when a DSN is configured. Keep the guard alive for the process lifetime.
fn init_sentry(config: &ApiConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "marketplace_api=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

async fn open_store(config: &ApiConfig) -> Arc<dyn Store> {
    match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url)
                .await
                .expect("Failed to create database pool");
            tracing::info!("Database pool created");
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("No database configured, using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    }
}

fn open_mailer(config: &ApiConfig) -> Arc<dyn Mailer> {
    match &config.email {
        Some(email) => {
            let mailer = SmtpMailer::new(email, &config.email_from)
                .expect("Failed to configure SMTP transport");
            tracing::info!(host = %email.smtp_host, "SMTP mailer configured");
            Arc::new(mailer)
        }
        None => {
            tracing::warn!("SMTP not configured, emails will be logged instead of sent");
            Arc::new(LogMailer)
        }
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = ApiConfig::from_env().expect("Failed to load configuration");

    // Sentry first, so the tracing layer below has a client to report to
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p marketplace-cli -- migrate
    let store = open_store(&config).await;
    let mailer = open_mailer(&config);

    let addr = config.socket_addr();
    let public_url = config.public_url.clone();
    let state = AppState::new(config, store, mailer);
    state
        .uploads()
        .ensure_folders()
        .await
        .expect("Failed to create upload directories");

    let limiter = credentials_rate_limiter();
    let app = marketplace_api::app_with_limiter(state, &limiter)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    tracing::info!(%addr, public_url = %public_url, "Marketplace API listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let interrupt = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {},
        () = terminate => {},
    }

    tracing::info!("Shutting down, draining in-flight requests");
}
