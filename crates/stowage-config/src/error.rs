//! Error types for configuration operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section that failed validation (`file`, `env` or `stowage`).
        section: String,
        /// Field that failed validation.
        field: String,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Reading the configuration file failed.
    #[error("filesystem operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// The configuration file was not valid JSON for the expected shape.
    #[error("failed to parse configuration file")]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// Source JSON error.
        source: serde_json::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        section: &str,
        field: &str,
        value: Option<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            section: section.to_string(),
            field: field.to_string(),
            value,
            reason,
        }
    }

    /// Human-readable description including the offending field and value.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::InvalidField {
                section,
                field,
                value: Some(value),
                reason,
            } => format!("{self} ({section}.{field} = {value:?}: {reason})"),
            Self::InvalidField {
                section,
                field,
                value: None,
                reason,
            } => format!("{self} ({section}.{field}: {reason})"),
            Self::Io {
                operation,
                path,
                source,
            } => format!("{self} ({operation} {}): {source}", path.display()),
            Self::Parse { path, source } => format!("{self} ({}): {source}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn invalid_field_detail_names_field_and_reason() {
        let error = ConfigError::invalid("env", "chunk_size", Some("12".into()), "out_of_range");
        assert_eq!(error.to_string(), "invalid configuration field");
        assert_eq!(
            error.detail(),
            "invalid configuration field (env.chunk_size = \"12\": out_of_range)"
        );
        assert!(error.source().is_none());
    }

    #[test]
    fn io_error_exposes_source() {
        let error = ConfigError::Io {
            operation: "read_config",
            path: PathBuf::from("/etc/stowage.json"),
            source: io::Error::other("denied"),
        };
        assert!(error.source().is_some());
        assert!(error.detail().ends_with("denied"));
    }
}
