//! Layered configuration loading.
//!
//! # Design
//! - Layers apply in order: defaults, then an optional JSON file, then `STOWAGE_*` variables.
//! - Environment lookups go through a source that tests can replace with a fixed map.
//! - Validation runs once on the fully layered result.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::defaults::ENV_PREFIX;
use crate::error::{ConfigError, ConfigResult};
use crate::model::StowageConfig;
use crate::validate::{parse_app_dir, parse_chunk_size, parse_log_format, parse_resolver, validate};

const ENV_SECTION: &str = "env";

#[derive(Debug, Clone, Default)]
enum EnvSource {
    #[default]
    Process,
    Fixed(HashMap<String, String>),
}

impl EnvSource {
    fn get(&self, field: &str) -> Option<String> {
        let key = format!("{ENV_PREFIX}{}", field.to_ascii_uppercase());
        match self {
            Self::Process => std::env::var(&key).ok(),
            Self::Fixed(vars) => vars.get(&key).cloned(),
        }
    }
}

/// Builds a [`StowageConfig`] from defaults, a JSON file and the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env: EnvSource,
}

impl ConfigLoader {
    /// Loader reading overrides from the process environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer the JSON document at `path` over the defaults.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Read overrides from `vars` instead of the process environment.
    #[must_use]
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = EnvSource::Fixed(
            vars.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }

    /// Produce the layered, validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Parse`] when the file cannot be used, and
    /// [`ConfigError::InvalidField`] when an override or the final result is invalid.
    pub fn load(&self) -> ConfigResult<StowageConfig> {
        let mut config = match &self.file {
            Some(path) => read_file(path)?,
            None => StowageConfig::default(),
        };
        self.apply_env(&mut config)?;
        validate(&config)?;
        debug!(
            resolver = %config.resolver,
            app_name = %config.app_name,
            chunk_size = config.chunk_size,
            file = ?self.file,
            "configuration loaded"
        );
        Ok(config)
    }

    fn apply_env(&self, config: &mut StowageConfig) -> ConfigResult<()> {
        if let Some(raw) = self.env.get("resolver") {
            config.resolver = parse_resolver(&raw, ENV_SECTION, "resolver")?;
        }
        if let Some(raw) = self.env.get("app_name") {
            config.app_name = raw;
        }
        if let Some(raw) = self.env.get("app_dir") {
            config.app_dir = parse_app_dir(&raw);
        }
        if let Some(raw) = self.env.get("chunk_size") {
            config.chunk_size = parse_chunk_size(&raw, ENV_SECTION, "chunk_size")?;
        }
        if let Some(raw) = self.env.get("log_level") {
            config.log_level = raw;
        }
        if let Some(raw) = self.env.get("log_format") {
            config.log_format = parse_log_format(&raw, ENV_SECTION, "log_format")?;
        }
        Ok(())
    }
}

fn read_file(path: &Path) -> ConfigResult<StowageConfig> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        operation: "read_config",
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResolverMode;

    #[test]
    fn empty_environment_yields_defaults() -> ConfigResult<()> {
        let config = ConfigLoader::new()
            .with_env(Vec::<(String, String)>::new())
            .load()?;
        assert_eq!(config, StowageConfig::default());
        Ok(())
    }

    #[test]
    fn environment_overrides_are_parsed() -> ConfigResult<()> {
        let config = ConfigLoader::new()
            .with_env([
                ("STOWAGE_RESOLVER", "implicit"),
                ("STOWAGE_APP_DIR", "/srv/stowage"),
                ("STOWAGE_CHUNK_SIZE", "4096"),
                ("STOWAGE_LOG_LEVEL", "debug"),
            ])
            .load()?;
        assert_eq!(config.resolver, ResolverMode::Implicit);
        assert_eq!(config.app_dir, Some(PathBuf::from("/srv/stowage")));
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.log_level, "debug");
        Ok(())
    }

    #[test]
    fn invalid_override_names_env_section() {
        let error = ConfigLoader::new()
            .with_env([("STOWAGE_CHUNK_SIZE", "12")])
            .load()
            .expect_err("chunk size too small");
        assert!(matches!(
            error,
            ConfigError::InvalidField { ref section, ref field, reason: "out_of_range", .. }
                if section == "env" && field == "chunk_size"
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let error = ConfigLoader::new()
            .with_file("/definitely/missing/stowage.json")
            .with_env(Vec::<(String, String)>::new())
            .load()
            .expect_err("missing file");
        assert!(matches!(
            error,
            ConfigError::Io {
                operation: "read_config",
                ..
            }
        ));
    }
}
