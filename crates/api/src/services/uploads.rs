//! Attachment store on local disk.
//!
//! Files live under `<root>/<folder>/<generated name>` and are referenced
//! everywhere by their stored path `<folder>/<generated name>`, which is also
//! the path they are served under at `/uploads/`.

use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use marketplace_core::UploadFolder;

const MAX_EXTENSION_LEN: usize = 10;

/// Disk-backed attachment store.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory, served read-only at `/uploads`.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root and every upload folder.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if a directory cannot be created.
    pub async fn ensure_folders(&self) -> io::Result<()> {
        for folder in [UploadFolder::ProductImage, UploadFolder::VendorLogo] {
            tokio::fs::create_dir_all(self.root.join(folder.as_str())).await?;
        }
        Ok(())
    }

    /// Write a received file and return its stored path.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error. Nothing is left on disk on failure.
    pub async fn write(
        &self,
        folder: UploadFolder,
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> io::Result<String> {
        let stored = folder.path_for(&generate_filename(original_name));
        let target = self.root.join(&stored);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        if let Err(err) = tokio::fs::write(&target, bytes).await {
            let _ = tokio::fs::remove_file(&target).await;
            return Err(err);
        }
        Ok(stored)
    }

    /// Resolve a stored path to a location under the root.
    ///
    /// Returns `None` for anything that is not a plain relative path
    /// (absolute paths, `..`, empty).
    #[must_use]
    pub fn resolve(&self, stored: &str) -> Option<PathBuf> {
        let relative = Path::new(stored);
        let mut components = relative.components().peekable();
        components.peek()?;
        if components.all(|c| matches!(c, Component::Normal(_))) {
            Some(self.root.join(relative))
        } else {
            None
        }
    }

    /// Whether a stored path currently exists on disk.
    pub async fn exists(&self, stored: &str) -> bool {
        match self.resolve(stored) {
            Some(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
            None => false,
        }
    }

    /// Delete one stored file.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not a valid stored path or the
    /// file cannot be removed.
    pub async fn remove(&self, stored: &str) -> io::Result<()> {
        let path = self.resolve(stored).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("invalid stored path: {stored}"))
        })?;
        tokio::fs::remove_file(path).await
    }

    /// Delete every listed file, continuing past failures.
    ///
    /// Failures are logged and returned so callers can report them.
    pub async fn remove_all<'a, I>(&self, stored: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut failed = Vec::new();
        for path in stored {
            if let Err(err) = self.remove(path).await {
                tracing::warn!(path = %path, error = %err, "Failed to delete stored file");
                failed.push(path.to_string());
            }
        }
        failed
    }
}

/// Generate a collision-resistant filename: `<unix millis>-<uuid><.ext>`.
///
/// The extension is kept from the original name when it is short and
/// alphanumeric, and lowercased.
#[must_use]
pub fn generate_filename(original_name: Option<&str>) -> String {
    let extension = original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    format!(
        "{}-{}{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        extension
    )
}
