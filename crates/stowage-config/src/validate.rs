//! Validation helpers and parsing utilities for configuration values.

use std::path::PathBuf;

use stowage_telemetry::LogFormat;

use crate::defaults::{MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
use crate::error::{ConfigError, ConfigResult};
use crate::model::{ResolverMode, StowageConfig};

/// Check cross-field and range constraints on a fully layered configuration.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for the first field that fails validation.
pub fn validate(config: &StowageConfig) -> ConfigResult<()> {
    const SECTION: &str = "stowage";

    let app_name = config.app_name.trim();
    if app_name.is_empty() {
        return Err(ConfigError::invalid(SECTION, "app_name", None, "empty"));
    }
    if app_name.contains(['/', '\\']) || app_name == "." || app_name == ".." {
        return Err(ConfigError::invalid(
            SECTION,
            "app_name",
            Some(config.app_name.clone()),
            "not_a_single_component",
        ));
    }

    if let Some(app_dir) = &config.app_dir
        && !app_dir.is_absolute()
    {
        return Err(ConfigError::invalid(
            SECTION,
            "app_dir",
            Some(app_dir.display().to_string()),
            "must_be_absolute",
        ));
    }

    check_chunk_size(config.chunk_size, SECTION, "chunk_size")?;

    if config.log_level.trim().is_empty() {
        return Err(ConfigError::invalid(SECTION, "log_level", None, "empty"));
    }
    Ok(())
}

fn check_chunk_size(value: usize, section: &str, field: &str) -> ConfigResult<usize> {
    if (MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::invalid(
            section,
            field,
            Some(value.to_string()),
            "out_of_range",
        ))
    }
}

pub(crate) fn parse_chunk_size(raw: &str, section: &str, field: &str) -> ConfigResult<usize> {
    let value = raw
        .trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::invalid(section, field, Some(raw.to_string()), "not_an_integer"))?;
    check_chunk_size(value, section, field)
}

pub(crate) fn parse_resolver(raw: &str, section: &str, field: &str) -> ConfigResult<ResolverMode> {
    raw.parse()
        .map_err(|reason| ConfigError::invalid(section, field, Some(raw.to_string()), reason))
}

pub(crate) fn parse_log_format(raw: &str, section: &str, field: &str) -> ConfigResult<LogFormat> {
    raw.parse().map_err(|_| {
        ConfigError::invalid(section, field, Some(raw.to_string()), "unknown_log_format")
    })
}

pub(crate) fn parse_app_dir(raw: &str) -> Option<PathBuf> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}
