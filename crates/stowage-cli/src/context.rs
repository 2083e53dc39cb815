//! Shared saver wiring, CLI errors and exit codes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use stowage_config::{ResolverMode, StowageConfig};
use stowage_core::{
    AppDirectory, AppDirectoryResolver, CancellationToken, DestinationResolver, DialogResolver,
    FailureKind, FileSaver, FixedAppDirectory, PlatformAppDirectory, SaveFailure, StreamWriter,
};
use stowage_telemetry::Metrics;
use tracing::{debug, warn};

use crate::cli::OutputFormat;
use crate::dialog::TerminalDialog;

/// Exit code for invalid input.
pub(crate) const EXIT_VALIDATION: i32 = 2;
/// Exit code for failed saves and unexpected errors.
pub(crate) const EXIT_FAILURE: i32 = 3;
/// Exit code when the user cancels, matching shells' SIGINT convention.
pub(crate) const EXIT_CANCELLED: i32 = 130;

#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Cancelled(String),
    Failure(anyhow::Error),
}

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    /// Map a failed save onto the CLI error taxonomy.
    pub(crate) fn from_save_failure(failure: &SaveFailure) -> Self {
        let message = failure.message().to_string();
        match failure.kind() {
            kind if kind.is_cancellation() => Self::Cancelled(message),
            FailureKind::InvalidRequest => Self::Validation(message),
            _ => Self::Failure(anyhow!(message)),
        }
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => EXIT_VALIDATION,
            Self::Cancelled(_) => EXIT_CANCELLED,
            Self::Failure(_) => EXIT_FAILURE,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) | Self::Cancelled(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

pub(crate) type CliResult<T> = Result<T, CliError>;

/// Everything a command handler needs.
pub(crate) struct AppContext {
    pub(crate) config: StowageConfig,
    pub(crate) saver: FileSaver,
    pub(crate) output: OutputFormat,
    pub(crate) cancel: CancellationToken,
    pub(crate) metrics: Metrics,
}

impl AppContext {
    pub(crate) fn new(config: StowageConfig, output: OutputFormat) -> CliResult<Self> {
        let metrics = Metrics::new().map_err(CliError::failure)?;
        let saver = FileSaver::new(build_resolver(&config))
            .with_writer(StreamWriter::with_chunk_size(config.chunk_size))
            .with_metrics(metrics.clone());
        Ok(Self {
            config,
            saver,
            output,
            cancel: CancellationToken::new(),
            metrics,
        })
    }

    /// Cancel in-flight saves when the process receives Ctrl-C.
    pub(crate) fn cancel_on_interrupt(&self) {
        let token = self.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received; cancelling");
                token.cancel();
            }
        });
    }

    pub(crate) fn log_metrics(&self) {
        let snapshot = self.metrics.snapshot();
        debug!(
            saves_succeeded = snapshot.saves_succeeded,
            saves_failed = snapshot.saves_failed,
            bytes_written = snapshot.bytes_written_total,
            cancellations = snapshot.cancellations_total,
            "session totals"
        );
    }
}

fn build_resolver(config: &StowageConfig) -> Arc<dyn DestinationResolver> {
    match config.resolver {
        ResolverMode::Interactive => Arc::new(DialogResolver::new(Arc::new(TerminalDialog::new()))),
        ResolverMode::Implicit => {
            let directory: Arc<dyn AppDirectory> = match &config.app_dir {
                Some(path) => Arc::new(FixedAppDirectory::new(path.clone())),
                None => Arc::new(PlatformAppDirectory::new(config.app_name.clone())),
            };
            Arc::new(AppDirectoryResolver::new(directory))
        }
    }
}

/// Anchor `path` at the working directory when it is relative.
pub(crate) fn absolutize(path: &Path) -> CliResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|err| CliError::failure(anyhow!("cannot read working directory: {err}")))?;
    Ok(cwd.join(path))
}
