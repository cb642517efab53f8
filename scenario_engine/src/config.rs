//! Runner configuration assembled from defaults and `SCENARIO_*` variables.

use camino::Utf8PathBuf;
use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Serialize};

use crate::error::{ScenarioError, ScenarioResult};

/// Prefix of environment variables read by [`RunnerConfig::load`].
pub const ENV_PREFIX: &str = "SCENARIO_";

/// Settings for a feature run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Feature file, or directory searched recursively for `.feature` files.
    pub features: Utf8PathBuf,
    /// Scenarios carrying any of these tags are skipped.
    pub exclude_tags: Vec<String>,
    /// Skip the whole run.
    pub skip: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            features: Utf8PathBuf::from("tests/features"),
            exclude_tags: vec!["wip".to_owned(), "todo".to_owned()],
            skip: false,
        }
    }
}

impl RunnerConfig {
    /// Layers `SCENARIO_*` environment variables over the defaults.
    #[must_use]
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default())).merge(Env::prefixed(ENV_PREFIX))
    }

    /// Loads the configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Config`] when a variable cannot be
    /// deserialised into its field.
    pub fn load() -> ScenarioResult<Self> {
        Self::figment()
            .extract()
            .map_err(|err| ScenarioError::Config(Box::new(err)))
    }
}
