//! # harvest-config
//!
//! Layered configuration loading for harvest using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`HARVEST_*` prefix, `__` as separator)
//! 2. Project-level `.harvest/config.toml`
//! 3. User-level `~/.config/harvest/config.toml`
//! 4. `GITHUB_TOKEN` (fills `github.token` only)
//! 5. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `HARVEST_GITHUB__TOKEN` -> `github.token`,
//! `HARVEST_CRAWL__STAR_THRESHOLD` -> `crawl.star_threshold`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use harvest_config::HarvestConfig;
//!
//! let config = HarvestConfig::load_with_dotenv().expect("config");
//! if !config.github.is_configured() {
//!     eprintln!("searching without a token");
//! }
//! ```

mod crawl;
mod error;
mod general;
mod github;
mod pipeline;

pub use crawl::CrawlConfig;
pub use error::ConfigError;
pub use general::GeneralConfig;
pub use github::GitHubConfig;
pub use pipeline::PipelineConfig;

use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HarvestConfig {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

impl HarvestConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`. Use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] when a source fails to parse and
    /// [`ConfigError::InvalidValue`] when a value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.env` from the current directory, then [`Self::load`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can add providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Env::raw().only(&["GITHUB_TOKEN"]).map(|_| "github.token".into()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        let local_path = PathBuf::from(".harvest/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("HARVEST_").split("__"))
    }

    /// Reject values the GitHub API or the pipeline cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.crawl.per_page) {
            return Err(ConfigError::InvalidValue {
                field: "crawl.per_page".into(),
                reason: format!("must be between 1 and 100, got {}", self.crawl.per_page),
            });
        }
        if self.crawl.build_config_names.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "crawl.build_config_names".into(),
                reason: "at least one file name is required".into(),
            });
        }
        if self.crawl.test_dir_names.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "crawl.test_dir_names".into(),
                reason: "at least one directory name is required".into(),
            });
        }
        Ok(())
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("harvest").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = HarvestConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.github.is_configured());
    }

    #[test]
    fn per_page_above_api_cap_is_rejected() {
        let mut config = HarvestConfig::default();
        config.crawl.per_page = 250;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "crawl.per_page"
        ));
    }

    #[test]
    fn zero_per_page_is_rejected() {
        let mut config = HarvestConfig::default();
        config.crawl.per_page = 0;
        assert!(config.validate().is_err());
    }
}
