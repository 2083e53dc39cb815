//! Implicit resolution into an application-private writable directory.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::DestinationResolver;
use crate::cancel::CancellationBridge;
use crate::error::{CoreResult, SaveError, SaveStage};

/// Capability that reports the application's writable directory.
pub trait AppDirectory: Send + Sync {
    /// Absolute directory the application may write into.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the host cannot provide one.
    fn writable_dir(&self) -> io::Result<PathBuf>;
}

/// Directory chosen up front, typically from configuration.
#[derive(Debug, Clone)]
pub struct FixedAppDirectory {
    path: PathBuf,
}

impl FixedAppDirectory {
    /// Use `path` as the writable directory.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AppDirectory for FixedAppDirectory {
    fn writable_dir(&self) -> io::Result<PathBuf> {
        Ok(self.path.clone())
    }
}

/// Per-user local data directory of the host, namespaced by application name.
#[derive(Debug, Clone)]
pub struct PlatformAppDirectory {
    app_name: String,
}

impl PlatformAppDirectory {
    /// Namespace the platform data directory with `app_name`.
    #[must_use]
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

impl AppDirectory for PlatformAppDirectory {
    fn writable_dir(&self) -> io::Result<PathBuf> {
        dirs::data_local_dir()
            .map(|base| base.join(&self.app_name))
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    "platform has no local data directory",
                )
            })
    }
}

/// Resolver that never asks the user: every file lands under the app directory.
///
/// The caller's initial directory hint is ignored.
#[derive(Clone)]
pub struct AppDirectoryResolver {
    directory: Arc<dyn AppDirectory>,
}

impl AppDirectoryResolver {
    /// Resolve into the directory reported by `directory`.
    #[must_use]
    pub fn new(directory: Arc<dyn AppDirectory>) -> Self {
        Self { directory }
    }

    fn root(&self) -> CoreResult<PathBuf> {
        let root = self
            .directory
            .writable_dir()
            .map_err(|source| SaveError::AppDirectory { source })?;
        if !root.is_absolute() {
            return Err(SaveError::AppDirectory {
                source: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("app directory is not absolute: {}", root.display()),
                ),
            });
        }
        Ok(root)
    }
}

async fn ensure_directory(path: &Path) -> CoreResult<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|source| SaveError::unwritable("create_dir", path, source))
}

#[async_trait]
impl DestinationResolver for AppDirectoryResolver {
    fn name(&self) -> &'static str {
        "app_directory"
    }

    async fn resolve(
        &self,
        initial_directory: Option<&Path>,
        file_name: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<PathBuf> {
        CancellationBridge::new(cancel).checkpoint(SaveStage::Resolve)?;
        if let Some(hint) = initial_directory {
            debug!(hint = %hint.display(), "ignoring initial directory for app directory save");
        }

        let destination = self.root()?.join(file_name);
        if let Some(parent) = destination.parent() {
            ensure_directory(parent).await?;
        }
        Ok(destination)
    }

    async fn resolve_directory(
        &self,
        _initial_directory: Option<&Path>,
        cancel: &CancellationToken,
    ) -> CoreResult<PathBuf> {
        CancellationBridge::new(cancel).checkpoint(SaveStage::Resolve)?;
        let root = self.root()?;
        ensure_directory(&root).await?;
        Ok(root)
    }
}
