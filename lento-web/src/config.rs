//! Web configuration. Defaults can be overwritten by values from the `lento.json` file under the
//! `web` key, and by `LENTO__WEB__*` environment variables.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Name of the default config file.
pub const CONFIG_FILE: &str = "lento.json";

/// Prefix of environment variables overriding configuration.
pub const CONFIG_ENV_PREFIX: &str = "LENTO";

/// Separator of nested keys in environment variables.
pub const CONFIG_ENV_SEPARATOR: &str = "__";

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub struct WebConfig {
    /// Address on which to listen.
    pub listen_address: String,
    /// Directory with static assets served before route matching. Disabled if not set.
    pub public_directory: Option<PathBuf>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:80".to_string(),
            public_directory: None,
        }
    }
}

impl From<OptionalWebConfig> for WebConfig {
    fn from(value: OptionalWebConfig) -> Self {
        let default = Self::default();
        Self {
            listen_address: value.listen_address.unwrap_or(default.listen_address),
            public_directory: value.public_directory.or(default.public_directory),
        }
    }
}

impl WebConfig {
    pub fn init_from_config() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator(CONFIG_ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .and_then(|config| config.try_deserialize::<OptionalWebConfigWrapper>())
            .map(|config| config.web.map(|config| config.into()).unwrap_or_default())
    }
}

#[derive(Deserialize)]
struct OptionalWebConfig {
    listen_address: Option<String>,
    public_directory: Option<PathBuf>,
}

#[derive(Deserialize)]
struct OptionalWebConfigWrapper {
    web: Option<OptionalWebConfig>,
}

#[cfg(test)]
mod tests {
    use crate::config::{OptionalWebConfig, WebConfig};
    use std::path::PathBuf;

    #[test]
    fn should_fill_missing_values_with_defaults() {
        let config = WebConfig::from(OptionalWebConfig {
            listen_address: None,
            public_directory: Some(PathBuf::from("public")),
        });

        assert_eq!(config.listen_address, "0.0.0.0:80");
        assert_eq!(config.public_directory, Some(PathBuf::from("public")));
    }
}
