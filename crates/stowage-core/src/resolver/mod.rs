//! Destination resolution: turning a suggested file name into a concrete path.
//!
//! Layout: `dialog.rs` (interactive save dialog variant), `app_dir.rs` (implicit app-private
//! directory variant), `scripted.rs` (in-memory dialog double, behind the `test-util`
//! feature).

mod app_dir;
mod dialog;
#[cfg(any(test, feature = "test-util"))]
mod scripted;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{CoreResult, SaveError};

pub use app_dir::{AppDirectory, AppDirectoryResolver, FixedAppDirectory, PlatformAppDirectory};
pub use dialog::{
    ALL_FILES_LABEL, DialogOperation, DialogOutcome, DialogResolver, FileTypeFilter, SaveDialog,
    SaveDialogOptions, StartLocation,
};
#[cfg(any(test, feature = "test-util"))]
pub use scripted::{ScriptedDialog, ScriptedResponse};

/// Host-specific strategy for choosing where a payload is written.
#[async_trait]
pub trait DestinationResolver: Send + Sync {
    /// Short label recorded in logs.
    fn name(&self) -> &'static str;

    /// Obtain an absolute destination path for `file_name`.
    async fn resolve(
        &self,
        initial_directory: Option<&Path>,
        file_name: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<PathBuf>;

    /// Obtain a directory shared by the entries of a bulk save; default implementation reports
    /// lack of support.
    async fn resolve_directory(
        &self,
        initial_directory: Option<&Path>,
        cancel: &CancellationToken,
    ) -> CoreResult<PathBuf> {
        let _ = (initial_directory, cancel);
        Err(SaveError::unsupported(
            "resolve_directory",
            "resolver cannot choose a directory",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedResolver;

    #[async_trait]
    impl DestinationResolver for FixedResolver {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn resolve(
            &self,
            _initial_directory: Option<&Path>,
            file_name: &str,
            _cancel: &CancellationToken,
        ) -> CoreResult<PathBuf> {
            Ok(PathBuf::from("/fixed").join(file_name))
        }
    }

    #[tokio::test]
    async fn resolve_directory_defaults_to_unsupported() {
        let resolver = FixedResolver;
        let token = CancellationToken::new();
        assert_eq!(resolver.name(), "fixed");
        assert!(resolver.resolve(None, "a.txt", &token).await.is_ok());
        let error = resolver
            .resolve_directory(None, &token)
            .await
            .expect_err("default should be unsupported");
        assert!(matches!(
            error,
            SaveError::Unsupported {
                operation: "resolve_directory",
                ..
            }
        ));
    }
}
