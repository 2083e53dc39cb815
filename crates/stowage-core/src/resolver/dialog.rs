//! Interactive resolution through a host save dialog.
//!
//! # Design
//! - The dialog capability starts immediately and hands back an operation: a completion future
//!   plus the dialog's own cancel hook.
//! - The cancel hook is linked to the save's token only while the dialog is open.
//! - Dismissal, an empty path or a relative path all mean "no destination".

use std::fmt;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::DestinationResolver;
use crate::cancel::CancellationBridge;
use crate::error::{CoreResult, SaveError, SaveStage};

/// Label of the catch-all filter that every dialog offers.
pub const ALL_FILES_LABEL: &str = "All files";
const ALL_FILES_PATTERN: &str = "*";

/// Where the dialog should open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartLocation {
    /// The caller's hinted directory.
    Directory(PathBuf),
    /// Whatever the host considers the default documents location.
    PlatformDefault,
}

/// File type choice offered by the dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTypeFilter {
    /// Display label.
    pub label: String,
    /// Extensions including the leading dot, or `*` for any file.
    pub extensions: Vec<String>,
}

impl FileTypeFilter {
    /// Filter matching any file.
    #[must_use]
    pub fn all_files() -> Self {
        Self {
            label: ALL_FILES_LABEL.to_string(),
            extensions: vec![ALL_FILES_PATTERN.to_string()],
        }
    }
}

/// Everything a dialog needs to present itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveDialogOptions {
    /// File name without its extension.
    pub suggested_name: String,
    /// Type filters; the last one is always [`FileTypeFilter::all_files`].
    pub filters: Vec<FileTypeFilter>,
    /// Initial location.
    pub start_location: StartLocation,
}

impl SaveDialogOptions {
    /// Derive dialog options from a suggested file name and optional directory hint.
    #[must_use]
    pub fn for_file_name(
        file_name: &str,
        initial_directory: Option<&Path>,
        honour_initial_directory: bool,
    ) -> Self {
        let path = Path::new(file_name);
        let suggested_name = path
            .file_stem()
            .map_or_else(|| file_name.to_string(), |stem| stem.to_string_lossy().into_owned());

        let mut filters = Vec::with_capacity(2);
        if let Some(extension) = path.extension().filter(|ext| !ext.is_empty()) {
            let extension = format!(".{}", extension.to_string_lossy());
            filters.push(FileTypeFilter {
                label: extension.clone(),
                extensions: vec![extension],
            });
        }
        filters.push(FileTypeFilter::all_files());

        let start_location = match initial_directory {
            Some(directory) if honour_initial_directory => {
                StartLocation::Directory(directory.to_path_buf())
            }
            _ => StartLocation::PlatformDefault,
        };

        Self {
            suggested_name,
            filters,
            start_location,
        }
    }
}

/// What the dialog reported when it closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogOutcome {
    /// The user confirmed a path.
    Picked(PathBuf),
    /// The user dismissed the dialog.
    Dismissed,
}

/// In-flight dialog: its completion and its native cancel hook.
pub struct DialogOperation {
    completion: BoxFuture<'static, io::Result<DialogOutcome>>,
    cancel: Box<dyn FnOnce() + Send>,
}

impl DialogOperation {
    /// Pair a completion future with the hook that asks the dialog to close.
    pub fn new<F, C>(completion: F, cancel: C) -> Self
    where
        F: Future<Output = io::Result<DialogOutcome>> + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        Self {
            completion: Box::pin(completion),
            cancel: Box::new(cancel),
        }
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        BoxFuture<'static, io::Result<DialogOutcome>>,
        Box<dyn FnOnce() + Send>,
    ) {
        (self.completion, self.cancel)
    }

    /// Await the dialog while the save's token is linked to its cancel hook.
    ///
    /// The registration is dropped as soon as the dialog completes, whatever the outcome.
    /// A cancellation observed while the dialog was open wins over the dialog's answer.
    pub(crate) async fn complete(self, cancel: &CancellationToken) -> CoreResult<PathBuf> {
        let (completion, native_cancel) = self.into_parts();

        let outcome = {
            let _registration = CancellationBridge::new(cancel).link_native(native_cancel);
            completion.await
        };

        if cancel.is_cancelled() {
            return Err(SaveError::Cancelled {
                stage: SaveStage::Resolve,
            });
        }

        match outcome.map_err(|source| SaveError::Dialog { source })? {
            DialogOutcome::Picked(path) if path.is_absolute() => Ok(path),
            DialogOutcome::Picked(path) => {
                debug!(path = %path.display(), "dialog returned an unusable path");
                Err(SaveError::NoDestinationSelected)
            }
            DialogOutcome::Dismissed => Err(SaveError::NoDestinationSelected),
        }
    }
}

impl fmt::Debug for DialogOperation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("DialogOperation").finish_non_exhaustive()
    }
}

/// Host save dialog capability.
pub trait SaveDialog: Send + Sync {
    /// Present a save-file dialog. The dialog starts immediately.
    fn show(&self, options: SaveDialogOptions) -> DialogOperation;

    /// Present a folder dialog; `None` when the host has none.
    fn show_folder(&self, start_location: StartLocation) -> Option<DialogOperation> {
        let _ = start_location;
        None
    }

    /// Whether the dialog can open in a caller-chosen directory.
    fn supports_initial_directory(&self) -> bool {
        true
    }
}

/// Interactive resolver backed by a [`SaveDialog`].
#[derive(Clone)]
pub struct DialogResolver {
    dialog: Arc<dyn SaveDialog>,
}

impl DialogResolver {
    /// Wrap a dialog capability.
    #[must_use]
    pub fn new(dialog: Arc<dyn SaveDialog>) -> Self {
        Self { dialog }
    }
}

#[async_trait]
impl DestinationResolver for DialogResolver {
    fn name(&self) -> &'static str {
        "dialog"
    }

    async fn resolve(
        &self,
        initial_directory: Option<&Path>,
        file_name: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<PathBuf> {
        let options = SaveDialogOptions::for_file_name(
            file_name,
            initial_directory,
            self.dialog.supports_initial_directory(),
        );
        debug!(
            suggested_name = %options.suggested_name,
            filters = options.filters.len(),
            "presenting save dialog"
        );
        self.dialog.show(options).complete(cancel).await
    }

    async fn resolve_directory(
        &self,
        initial_directory: Option<&Path>,
        cancel: &CancellationToken,
    ) -> CoreResult<PathBuf> {
        let start_location = match initial_directory {
            Some(directory) if self.dialog.supports_initial_directory() => {
                StartLocation::Directory(directory.to_path_buf())
            }
            _ => StartLocation::PlatformDefault,
        };
        let operation = self.dialog.show_folder(start_location).ok_or_else(|| {
            SaveError::unsupported("resolve_directory", "dialog cannot choose a directory")
        })?;
        operation.complete(cancel).await
    }
}
