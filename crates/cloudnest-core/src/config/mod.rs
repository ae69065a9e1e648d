//! Client configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section. Every field carries a default, so an empty source is valid.

pub mod api;
pub mod cache;
pub mod logging;
pub mod search;
pub mod upload;

use serde::{Deserialize, Serialize};

use self::api::ApiConfig;
use self::cache::CacheConfig;
use self::logging::LoggingConfig;
use self::search::{SearchConfig, TreeConfig};
use self::upload::UploadConfig;

use crate::error::AppError;

/// Root client configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend REST settings.
    #[serde(default)]
    pub api: ApiConfig,
    /// Item cache and durable storage settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Upload validation and progress settings.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Search indexer and debounce settings.
    #[serde(default)]
    pub search: SearchConfig,
    /// Tree construction settings.
    #[serde(default)]
    pub tree: TreeConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ClientConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `<dir>/default.toml` with an environment-specific overlay
    /// and environment variables prefixed with `CLOUDNEST__`.
    pub fn load(dir: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(&format!("{dir}/default")).required(false))
            .add_source(config::File::with_name(&format!("{dir}/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("CLOUDNEST")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("upload.allowed_mime_types")
                    .with_list_parse_key("tree.root_sentinels")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Load a configuration from a single TOML file path.
    pub fn from_file(path: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("CLOUDNEST")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
