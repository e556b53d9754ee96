//! Layered configuration for the schemalens CLI
//!
//! Sources, lowest precedence first:
//! - Built-in defaults
//! - `schemalens.toml` in the working directory or the user config dir
//! - An explicit `--config` file (must exist)
//! - Environment variables (`SCHEMALENS__SECTION__KEY`)
//!
//! Command-line flags are applied on top by [`crate::Cli::apply`].
//!
//! ## Example config file (schemalens.toml):
//! ```toml
//! [analysis]
//! competitor_count = 10
//! competitor_fetch_concurrency = 5
//! competitor_gap_threshold = 2
//! fetch_timeout_ms = 20000
//!
//! [search]
//! api_key = "..."
//!
//! [validator]
//! kind = "json-ld"
//!
//! [catalog]
//! path = "catalog.json"
//! ```

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use config_crate::{Config, ConfigError, Environment, File};
use schemalens_core::AnalysisOptions;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "schemalens.toml";
pub const ENV_PREFIX: &str = "SCHEMALENS";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub analysis: AnalysisOptions,

    #[serde(default)]
    pub search: SearchSettings,

    #[serde(default)]
    pub validator: ValidatorSettings,

    #[serde(default)]
    pub catalog: CatalogSettings,
}

/// Ranked search provider settings
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Override for the ValueSerp endpoint
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for SearchSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchSettings")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Which structured-data source feeds the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ValidatorKind {
    /// Remote schema.org validator
    #[default]
    SchemaOrg,
    /// Fetch the page and read its JSON-LD blocks locally
    JsonLd,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatorSettings {
    #[serde(default)]
    pub kind: ValidatorKind,

    /// Override for the schema.org validator endpoint
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// JSON catalog file; the built-in catalog is used when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Settings {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding an explicit file on top of the defaults
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(dirs) = directories::ProjectDirs::from("com", "pondevelopment", "schemalens") {
            let user_config = dirs.config_dir().join(CONFIG_FILE);
            builder = builder.add_source(File::from(user_config).required(false));
        }

        builder = builder.add_source(File::with_name(CONFIG_FILE).required(false));

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Parse settings from TOML text, without consulting the environment
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(text, config_crate::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
