//! Typed runtime configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stowage_telemetry::{LogFormat, LoggingConfig, build_sha};

use crate::defaults::{DEFAULT_APP_NAME, DEFAULT_CHUNK_SIZE};

/// How destinations are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverMode {
    /// Ask the user through a save dialog.
    #[default]
    Interactive,
    /// Write into the application directory without asking.
    Implicit,
}

impl ResolverMode {
    /// Stable label for this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Interactive => "interactive",
            Self::Implicit => "implicit",
        }
    }
}

impl fmt::Display for ResolverMode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for ResolverMode {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "interactive" | "dialog" => Ok(Self::Interactive),
            "implicit" | "app_dir" => Ok(Self::Implicit),
            _ => Err("unknown_resolver"),
        }
    }
}

/// Runtime configuration for savers and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StowageConfig {
    /// Destination strategy.
    pub resolver: ResolverMode,
    /// Namespace for the platform data directory.
    pub app_name: String,
    /// Explicit app directory; overrides the platform location.
    pub app_dir: Option<PathBuf>,
    /// Chunk size for progress-reporting writes.
    pub chunk_size: usize,
    /// Log level or filter directive.
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for StowageConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverMode::default(),
            app_name: DEFAULT_APP_NAME.to_string(),
            app_dir: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            log_level: stowage_telemetry::DEFAULT_LOG_LEVEL.to_string(),
            log_format: LogFormat::infer(),
        }
    }
}

impl StowageConfig {
    /// Logging settings borrowed from this configuration.
    #[must_use]
    pub fn logging(&self) -> LoggingConfig<'_> {
        LoggingConfig {
            level: &self.log_level,
            format: self.log_format,
            build_sha: build_sha(),
        }
    }
}
