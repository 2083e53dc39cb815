//! Save orchestration: validate, resolve, write, report.
//!
//! # Design
//! - Every call shape funnels into one pipeline per request; errors never escape as `Err`.
//! - Each call runs inside a `save` span carrying a fresh operation id.
//! - Bulk saves resolve one directory and undo completed entries when a later entry fails.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use stowage_telemetry::{Metrics, OUTCOME_SAVED};
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::cancel::CancellationBridge;
use crate::error::{CoreResult, SaveError, SaveStage};
use crate::model::{
    BulkSaveRequest, ProgressSink, SavePayload, SaveRequest, SaveRequestParts, SaveResult,
    validate_file_name,
};
use crate::resolver::DestinationResolver;
use crate::writer::StreamWriter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CallShape {
    Single,
    Progress,
    Bulk,
}

impl CallShape {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Progress => "progress",
            Self::Bulk => "bulk",
        }
    }
}

/// Saves payloads through a host-specific resolver and the stream writer.
#[derive(Clone)]
pub struct FileSaver {
    resolver: Arc<dyn DestinationResolver>,
    writer: StreamWriter,
    metrics: Option<Metrics>,
}

impl fmt::Debug for FileSaver {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FileSaver")
            .field("resolver", &self.resolver.name())
            .field("writer", &self.writer)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl FileSaver {
    /// Construct a saver around the host's resolver.
    #[must_use]
    pub fn new(resolver: Arc<dyn DestinationResolver>) -> Self {
        Self {
            resolver,
            writer: StreamWriter::new(),
            metrics: None,
        }
    }

    /// Use a custom writer, typically to change the progress chunk size.
    #[must_use]
    pub const fn with_writer(mut self, writer: StreamWriter) -> Self {
        self.writer = writer;
        self
    }

    /// Record outcomes in `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Name of the configured resolver.
    #[must_use]
    pub fn resolver_name(&self) -> &'static str {
        self.resolver.name()
    }

    /// Save `payload` as `file_name`, starting the picker in `initial_directory` when supported.
    pub async fn save_in(
        &self,
        initial_directory: Option<&Path>,
        file_name: &str,
        payload: SavePayload,
        cancel: &CancellationToken,
    ) -> SaveResult {
        let request = with_hint(SaveRequest::new(file_name, payload), initial_directory);
        self.save_request(request, cancel).await
    }

    /// Save `payload` as `file_name` without a directory hint.
    pub async fn save(
        &self,
        file_name: &str,
        payload: SavePayload,
        cancel: &CancellationToken,
    ) -> SaveResult {
        self.save_in(None, file_name, payload, cancel).await
    }

    /// Save while reporting progress to `progress`; the payload length must be known.
    pub async fn save_with_progress(
        &self,
        file_name: &str,
        payload: SavePayload,
        progress: Arc<dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> SaveResult {
        self.save_in_with_progress(None, file_name, payload, progress, cancel)
            .await
    }

    /// [`FileSaver::save_with_progress`] with a directory hint.
    pub async fn save_in_with_progress(
        &self,
        initial_directory: Option<&Path>,
        file_name: &str,
        payload: SavePayload,
        progress: Arc<dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> SaveResult {
        let request = with_hint(SaveRequest::new(file_name, payload), initial_directory)
            .with_progress(progress);
        self.save_request(request, cancel).await
    }

    /// Run one save request through validation, resolution and writing.
    pub async fn save_request(&self, request: SaveRequest, cancel: &CancellationToken) -> SaveResult {
        let shape = if request.reports_progress() {
            CallShape::Progress
        } else {
            CallShape::Single
        };
        let span = info_span!(
            "save",
            operation_id = %Uuid::new_v4(),
            shape = shape.as_str(),
            resolver = self.resolver.name(),
            file_name = %request.file_name(),
        );

        async move {
            let outcome = self.execute(request, cancel).await;
            self.conclude(shape, outcome)
        }
        .instrument(span)
        .await
    }

    /// Save every entry of `files` into one resolved directory.
    ///
    /// Entries are written in name order without progress reporting. When an entry fails, the
    /// entries completed earlier in this call are removed and the failure is returned. On
    /// success the result path is the shared directory.
    pub async fn bulk_save(
        &self,
        initial_directory: Option<&Path>,
        files: BulkSaveRequest,
        cancel: &CancellationToken,
    ) -> SaveResult {
        let span = info_span!(
            "save",
            operation_id = %Uuid::new_v4(),
            shape = CallShape::Bulk.as_str(),
            resolver = self.resolver.name(),
            entries = files.len(),
        );

        async move {
            let outcome = self.execute_bulk(initial_directory, files, cancel).await;
            self.conclude(CallShape::Bulk, outcome)
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        request: SaveRequest,
        cancel: &CancellationToken,
    ) -> CoreResult<(PathBuf, u64)> {
        let bridge = CancellationBridge::new(cancel);
        bridge.checkpoint(SaveStage::Start)?;

        let SaveRequestParts {
            file_name,
            initial_directory,
            payload,
            progress,
        } = request.into_parts();
        validate_file_name(&file_name)?;
        if progress.is_some() && !payload.has_known_length() {
            return Err(SaveError::unsupported(
                "save_with_progress",
                "payload length unknown",
            ));
        }

        let destination = self
            .resolver
            .resolve(initial_directory.as_deref(), &file_name, cancel)
            .await?;
        bridge.checkpoint(SaveStage::Resolve)?;
        debug!(destination = %destination.display(), "destination resolved");

        let scope = bridge.write_scope();
        let written = match progress {
            Some(sink) => {
                self.writer
                    .write_with_progress(payload, &destination, sink.as_ref(), scope.token())
                    .await?
            }
            None => self.writer.write(payload, &destination, scope.token()).await?,
        };
        Ok((destination, written))
    }

    async fn execute_bulk(
        &self,
        initial_directory: Option<&Path>,
        files: BulkSaveRequest,
        cancel: &CancellationToken,
    ) -> CoreResult<(PathBuf, u64)> {
        let bridge = CancellationBridge::new(cancel);
        bridge.checkpoint(SaveStage::Start)?;
        if files.is_empty() {
            return Err(SaveError::invalid("files", "empty", None));
        }

        let directory = self
            .resolver
            .resolve_directory(initial_directory, cancel)
            .await?;
        bridge.checkpoint(SaveStage::Resolve)?;
        debug!(directory = %directory.display(), "bulk directory resolved");

        let mut completed: Vec<PathBuf> = Vec::with_capacity(files.len());
        let mut total: u64 = 0;
        for (file_name, payload) in files.into_entries() {
            let destination = directory.join(&file_name);
            match self.write_entry(&destination, payload, &bridge).await {
                Ok(written) => {
                    debug!(destination = %destination.display(), written, "bulk entry saved");
                    total += written;
                    completed.push(destination);
                }
                Err(error) => {
                    roll_back(&completed).await;
                    return Err(error);
                }
            }
        }
        Ok((directory, total))
    }

    async fn write_entry(
        &self,
        destination: &Path,
        payload: SavePayload,
        bridge: &CancellationBridge<'_>,
    ) -> CoreResult<u64> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| SaveError::unwritable("create_dir", parent, source))?;
        }
        let scope = bridge.write_scope();
        self.writer.write(payload, destination, scope.token()).await
    }

    fn conclude(&self, shape: CallShape, outcome: CoreResult<(PathBuf, u64)>) -> SaveResult {
        match outcome {
            Ok((path, written)) => {
                info!(path = %path.display(), bytes = written, "save completed");
                if let Some(metrics) = &self.metrics {
                    metrics.inc_save(shape.as_str(), OUTCOME_SAVED);
                    metrics.add_bytes_written(written);
                }
                SaveResult::saved(path)
            }
            Err(error) => {
                let kind = error.kind();
                warn!(kind = kind.as_str(), error = %error.detail(), "save failed");
                if let Some(metrics) = &self.metrics {
                    metrics.inc_save(shape.as_str(), kind.as_str());
                    if let SaveError::Cancelled { stage } = &error {
                        metrics.inc_cancellation(stage.as_str());
                    }
                }
                SaveResult::failed(error)
            }
        }
    }
}

fn with_hint(request: SaveRequest, initial_directory: Option<&Path>) -> SaveRequest {
    match initial_directory {
        Some(directory) => request.with_initial_directory(directory),
        None => request,
    }
}

async fn roll_back(completed: &[PathBuf]) {
    for path in completed.iter().rev() {
        match fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "removed bulk entry"),
            Err(error) => warn!(
                path = %path.display(),
                error = %error,
                "failed to remove bulk entry during rollback"
            ),
        }
    }
}
