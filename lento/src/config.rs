//! Framework configuration. The [ApplicationConfig] is created with opinionated default values,
//! which can then be overwritten by the `lento.json` file or by environment variables prefixed
//! with `LENTO__`, e.g. `LENTO__CACHE__ENABLED=false`.
//!
//! Web server settings live in [WebConfig](lento_web::config::WebConfig), loaded from the same
//! sources under the `web` key.

use config::{Config, ConfigError, Environment, File};
use lento_web::config::{CONFIG_ENV_PREFIX, CONFIG_ENV_SEPARATOR, CONFIG_FILE};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Name of the default route cache directory, placed in the system temporary directory.
pub const DEFAULT_CACHE_DIRECTORY: &str = "lentocache";

/// Route cache configuration.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub struct CacheConfig {
    /// Should compiled routes be persisted and reused across boots.
    pub enabled: bool,
    /// Where cache artifacts are stored.
    pub directory: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: env::temp_dir().join(DEFAULT_CACHE_DIRECTORY),
        }
    }
}

impl From<OptionalCacheConfig> for CacheConfig {
    fn from(value: OptionalCacheConfig) -> Self {
        let default = Self::default();
        Self {
            enabled: value.enabled.unwrap_or(default.enabled),
            directory: value.directory.unwrap_or(default.directory),
        }
    }
}

/// Framework configuration used by the [Application](crate::application::Application).
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub struct ApplicationConfig {
    /// Should a default tracing logger be installed in the scope of the application.
    pub install_tracing_logger: bool,
    pub cache: CacheConfig,
    /// Should a duplicate route replace the previous one instead of failing the boot.
    pub allow_route_overriding: bool,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            install_tracing_logger: true,
            cache: Default::default(),
            allow_route_overriding: false,
        }
    }
}

impl From<OptionalApplicationConfig> for ApplicationConfig {
    fn from(value: OptionalApplicationConfig) -> Self {
        let default = Self::default();
        Self {
            install_tracing_logger: value
                .install_tracing_logger
                .unwrap_or(default.install_tracing_logger),
            cache: value.cache.map(|cache| cache.into()).unwrap_or(default.cache),
            allow_route_overriding: value
                .allow_route_overriding
                .unwrap_or(default.allow_route_overriding),
        }
    }
}

impl ApplicationConfig {
    pub fn init_from_environment() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator(CONFIG_ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .and_then(|config| config.try_deserialize::<OptionalApplicationConfig>())
            .map(|config| config.into())
    }
}

#[derive(Deserialize, Default)]
struct OptionalCacheConfig {
    enabled: Option<bool>,
    directory: Option<PathBuf>,
}

#[derive(Deserialize, Default)]
struct OptionalApplicationConfig {
    install_tracing_logger: Option<bool>,
    cache: Option<OptionalCacheConfig>,
    allow_route_overriding: Option<bool>,
}
