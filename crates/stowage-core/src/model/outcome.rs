use std::path::{Path, PathBuf};

use crate::error::{CoreResult, FailureKind, SaveError};

/// Outcome of a save. Saves never return `Err`; every failure arrives here.
#[derive(Debug)]
pub enum SaveResult {
    /// The payload was written completely.
    Saved {
        /// Destination file, or the shared directory for bulk saves.
        path: PathBuf,
    },
    /// The save failed; the destination, if it exists, must not be trusted.
    Failed(SaveFailure),
}

/// Failure details carried by [`SaveResult::Failed`].
#[derive(Debug)]
pub struct SaveFailure {
    kind: FailureKind,
    message: String,
    error: SaveError,
}

impl SaveFailure {
    /// Outward failure category.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Human-readable description including context and source errors.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Underlying error value.
    #[must_use]
    pub const fn error(&self) -> &SaveError {
        &self.error
    }

    /// Consume the failure, returning the underlying error.
    #[must_use]
    pub fn into_error(self) -> SaveError {
        self.error
    }
}

impl From<SaveError> for SaveFailure {
    fn from(error: SaveError) -> Self {
        Self {
            kind: error.kind(),
            message: error.detail(),
            error,
        }
    }
}

impl SaveResult {
    pub(crate) const fn saved(path: PathBuf) -> Self {
        Self::Saved { path }
    }

    pub(crate) fn failed(error: SaveError) -> Self {
        Self::Failed(SaveFailure::from(error))
    }

    /// Whether the payload was saved.
    #[must_use]
    pub const fn is_successful(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }

    /// Saved path on success.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Saved { path } => Some(path),
            Self::Failed(_) => None,
        }
    }

    /// Failure details on failure.
    #[must_use]
    pub const fn failure(&self) -> Option<&SaveFailure> {
        match self {
            Self::Saved { .. } => None,
            Self::Failed(failure) => Some(failure),
        }
    }

    /// Convert into a `Result`, surfacing the failure as an error.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`SaveError`] when the save failed.
    pub fn ensure_success(self) -> CoreResult<PathBuf> {
        match self {
            Self::Saved { path } => Ok(path),
            Self::Failed(failure) => Err(failure.into_error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SaveStage;

    #[test]
    fn saved_result_exposes_path() -> CoreResult<()> {
        let result = SaveResult::saved(PathBuf::from("/tmp/out.txt"));
        assert!(result.is_successful());
        assert_eq!(result.path(), Some(Path::new("/tmp/out.txt")));
        assert!(result.failure().is_none());
        assert_eq!(result.ensure_success()?, PathBuf::from("/tmp/out.txt"));
        Ok(())
    }

    #[test]
    fn failed_result_carries_kind_and_message() {
        let result = SaveResult::failed(SaveError::Cancelled {
            stage: SaveStage::Start,
        });
        assert!(!result.is_successful());
        assert!(result.path().is_none());
        let failure = result.failure().expect("failure");
        assert_eq!(failure.kind(), FailureKind::Cancelled);
        assert_eq!(failure.message(), "save cancelled during start");
        assert!(matches!(
            result.ensure_success(),
            Err(SaveError::Cancelled {
                stage: SaveStage::Start
            })
        ));
    }
}
