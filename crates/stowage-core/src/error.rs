//! # Design
//!
//! - Provide structured, constant-message errors for the save pipeline.
//! - Capture operation context (paths, fields, stages) to make failures reproducible in tests.
//! - Keep the outward `FailureKind` taxonomy separate from the detailed error value.

use std::error::Error as _;
use std::fmt::Write as _;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for save pipeline steps.
pub type CoreResult<T> = Result<T, SaveError>;

/// Stage of a single save at which a failure or cancellation was observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStage {
    /// Before any work was started.
    Start,
    /// While obtaining the destination path.
    Resolve,
    /// While copying payload bytes into the destination.
    Write,
}

impl SaveStage {
    /// Stable label used in logs and messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Resolve => "resolve",
            Self::Write => "write",
        }
    }
}

/// Outward failure category reported in a [`crate::SaveResult`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Cancellation was observed before or during resolution or writing.
    Cancelled,
    /// The interactive resolver produced no usable destination.
    NoDestinationSelected,
    /// The destination could not be created, opened or truncated.
    DestinationUnwritable,
    /// An I/O error occurred while copying, including a full disk.
    WriteFailed,
    /// The host has no implementation for the requested call shape.
    Unsupported,
    /// The request itself was malformed.
    InvalidRequest,
}

impl FailureKind {
    /// Stable label used in logs, metrics and CLI output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::NoDestinationSelected => "no_destination_selected",
            Self::DestinationUnwritable => "destination_unwritable",
            Self::WriteFailed => "write_failed",
            Self::Unsupported => "unsupported",
            Self::InvalidRequest => "invalid_request",
        }
    }

    /// A dismissed dialog and an external cancellation are the same outcome to callers.
    #[must_use]
    pub const fn is_cancellation(self) -> bool {
        matches!(self, Self::Cancelled | Self::NoDestinationSelected)
    }
}

/// Errors produced while resolving a destination or writing a payload.
#[derive(Debug, Error)]
pub enum SaveError {
    /// The cancellation token fired.
    #[error("save cancelled")]
    Cancelled {
        /// Stage at which cancellation was observed.
        stage: SaveStage,
    },
    /// The dialog was dismissed or returned no usable path.
    #[error("operation cancelled or no destination selected")]
    NoDestinationSelected,
    /// The dialog capability itself failed.
    #[error("destination dialog failed")]
    Dialog {
        /// Underlying dialog error.
        source: io::Error,
    },
    /// The app-private directory could not be determined.
    #[error("app directory unavailable")]
    AppDirectory {
        /// Underlying IO error.
        source: io::Error,
    },
    /// Creating, opening or truncating the destination failed.
    #[error("destination unwritable")]
    DestinationUnwritable {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Reading the payload or writing the destination failed mid-copy.
    #[error("write failed")]
    WriteFailed {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Destination path being written.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The payload produced a different number of bytes than it declared.
    #[error("payload length mismatch")]
    LengthMismatch {
        /// Destination path being written.
        path: PathBuf,
        /// Declared payload length.
        expected: u64,
        /// Bytes actually read before the mismatch was detected.
        actual: u64,
    },
    /// The call shape is not available on this host.
    #[error("unsupported operation")]
    Unsupported {
        /// Operation that is unsupported.
        operation: &'static str,
        /// Static reason for the rejection.
        reason: &'static str,
    },
    /// Request validation failures.
    #[error("invalid save request")]
    InvalidRequest {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

impl SaveError {
    pub(crate) fn unwritable(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        Self::DestinationUnwritable {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write_failed(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        Self::WriteFailed {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(
        field: &'static str,
        reason: &'static str,
        value: Option<String>,
    ) -> Self {
        Self::InvalidRequest {
            field,
            reason,
            value,
        }
    }

    pub(crate) const fn unsupported(operation: &'static str, reason: &'static str) -> Self {
        Self::Unsupported { operation, reason }
    }

    /// Map the detailed error onto its outward failure category.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Cancelled { .. } => FailureKind::Cancelled,
            Self::NoDestinationSelected | Self::Dialog { .. } => FailureKind::NoDestinationSelected,
            Self::AppDirectory { .. } | Self::DestinationUnwritable { .. } => {
                FailureKind::DestinationUnwritable
            }
            Self::WriteFailed { .. } | Self::LengthMismatch { .. } => FailureKind::WriteFailed,
            Self::Unsupported { .. } => FailureKind::Unsupported,
            Self::InvalidRequest { .. } => FailureKind::InvalidRequest,
        }
    }

    /// Human-readable message combining the constant message, its context and the source chain.
    #[must_use]
    pub fn detail(&self) -> String {
        let mut detail = self.to_string();
        let _ = match self {
            Self::Cancelled { stage } => write!(detail, " during {}", stage.as_str()),
            Self::DestinationUnwritable {
                operation, path, ..
            }
            | Self::WriteFailed {
                operation, path, ..
            } => write!(detail, " ({operation} {})", path.display()),
            Self::LengthMismatch {
                path,
                expected,
                actual,
            } => write!(
                detail,
                " ({}: declared {expected} bytes, read {actual})",
                path.display()
            ),
            Self::Unsupported { operation, reason } => write!(detail, " ({operation}: {reason})"),
            Self::InvalidRequest {
                field,
                reason,
                value,
            } => match value {
                Some(value) => write!(detail, " ({field} {reason}: {value:?})"),
                None => write!(detail, " ({field} {reason})"),
            },
            Self::NoDestinationSelected | Self::Dialog { .. } | Self::AppDirectory { .. } => Ok(()),
        };

        let mut source = self.source();
        while let Some(error) = source {
            let _ = write!(detail, ": {error}");
            source = error.source();
        }
        detail
    }
}
