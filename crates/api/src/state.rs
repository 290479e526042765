//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::db::Store;
use crate::services::accounts::AccountService;
use crate::services::catalog::CatalogService;
use crate::services::email::Mailer;
use crate::services::sessions::SessionIssuer;
use crate::services::uploads::UploadStore;
use crate::services::vendors::VendorService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the document store and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    store: Arc<dyn Store>,
    sessions: SessionIssuer,
    mailer: Arc<dyn Mailer>,
    uploads: UploadStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - API configuration
    /// * `store` - Document store (`PostgreSQL` or in-memory)
    /// * `mailer` - Outbound mail delivery
    #[must_use]
    pub fn new(config: ApiConfig, store: Arc<dyn Store>, mailer: Arc<dyn Mailer>) -> Self {
        let sessions = SessionIssuer::new(&config.sessions);
        let uploads = UploadStore::new(config.upload_dir.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                sessions,
                mailer,
                uploads,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionIssuer {
        &self.inner.sessions
    }

    #[must_use]
    pub fn uploads(&self) -> &UploadStore {
        &self.inner.uploads
    }

    /// Account lifecycle operations.
    #[must_use]
    pub fn accounts(&self) -> AccountService<'_> {
        AccountService::new(
            self.store(),
            self.sessions(),
            self.inner.mailer.as_ref(),
            &self.inner.config.public_url,
            self.inner.config.reset_token_ttl,
        )
    }

    /// Vendor operations.
    #[must_use]
    pub fn vendors(&self) -> VendorService<'_> {
        VendorService::new(self.store(), self.sessions(), self.uploads())
    }

    /// Catalog operations.
    #[must_use]
    pub fn catalog(&self) -> CatalogService<'_> {
        CatalogService::new(self.store(), self.uploads())
    }
}
