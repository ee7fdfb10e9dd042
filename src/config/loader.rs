//! Configuration Loader
//!
//! Layers serde defaults, an optional YAML/TOML/JSON file and `PIPELINE_*`
//! environment variables into a validated [`PipelineConfig`].

use std::path::Path;
use tracing::debug;

use super::error::{ConfigResult, ConfigurationError};
use super::PipelineConfig;
use crate::constants::CONFIG_ENV_PREFIX;

/// Loads pipeline configuration from file and environment sources
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration using the default `PIPELINE` environment prefix
    ///
    /// When `path` is given the file must exist; its format is inferred from the
    /// extension. Environment variables take precedence over file values.
    pub fn load(path: Option<&Path>) -> ConfigResult<PipelineConfig> {
        Self::load_with_prefix(path, CONFIG_ENV_PREFIX)
    }

    /// Load configuration reading environment overrides under `env_prefix`
    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> ConfigResult<PipelineConfig> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigurationError::config_file_not_found(path));
            }
            debug!(path = %path.display(), "Loading pipeline configuration file");
            builder = builder.add_source(::config::File::from(path));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .try_parsing(true),
        );

        let config: PipelineConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        debug!(
            "Pipeline configuration loaded: {}",
            serde_json::to_string(&config).unwrap_or_else(|_| "[serialization error]".to_string())
        );

        Ok(config)
    }
}
