//! Service configuration layered from defaults, environment and CLI.

use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::ApiError;

/// Prefix of environment variables read by [`Config::load`].
pub const ENV_PREFIX: &str = "REDIRECT_API_";

/// Runtime settings for the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database location. `:memory:` selects a private in-memory database.
    pub dsn: String,
    /// Socket address the server listens on.
    pub addr: String,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dsn: ":memory:".to_owned(),
            addr: "0.0.0.0:8080".to_owned(),
            log_filter: "info".to_owned(),
        }
    }
}

impl Config {
    /// Builds the provider stack: defaults, then `REDIRECT_API_*` variables,
    /// then any values given on the command line.
    #[must_use]
    pub fn figment(cli: &Cli) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(cli))
    }

    /// Loads the configuration, with command-line values taking precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] when a value cannot be deserialised.
    pub fn load(cli: &Cli) -> Result<Self, ApiError> {
        Self::figment(cli)
            .extract()
            .map_err(|err| ApiError::Config(Box::new(err)))
    }
}
