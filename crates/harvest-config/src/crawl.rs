//! Repository search and classification settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_language() -> String {
    String::from("Solidity")
}

fn default_sort() -> String {
    String::from("stars")
}

fn default_order() -> String {
    String::from("desc")
}

const fn default_per_page() -> u32 {
    100
}

const fn default_request_delay_ms() -> u64 {
    2_000
}

const fn default_retry_delay_ms() -> u64 {
    10_000
}

fn default_test_dir_names() -> Vec<String> {
    vec!["test".into(), "tests".into()]
}

fn default_build_config_names() -> Vec<String> {
    vec!["truffle.js".into(), "truffle-config.js".into()]
}

fn default_vendor_dir() -> String {
    String::from("node_modules")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlConfig {
    /// Value of the `language:` search qualifier.
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_sort")]
    pub sort: String,

    #[serde(default = "default_order")]
    pub order: String,

    /// Results per search page. GitHub caps this at 100.
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Repositories with fewer stars are skipped entirely.
    #[serde(default)]
    pub star_threshold: u64,

    /// Extra search qualifiers, one paginated query each
    /// (e.g. `created:<2019-01-01`). Empty runs a single unfiltered query.
    #[serde(default)]
    pub search_filters: Vec<String>,

    /// Pause before every search call.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Pause before the single retry of a failed call.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_test_dir_names")]
    pub test_dir_names: Vec<String>,

    #[serde(default = "default_build_config_names")]
    pub build_config_names: Vec<String>,

    /// Paths containing this segment are never classified.
    #[serde(default = "default_vendor_dir")]
    pub vendor_dir: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            sort: default_sort(),
            order: default_order(),
            per_page: default_per_page(),
            star_threshold: 0,
            search_filters: Vec::new(),
            request_delay_ms: default_request_delay_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            test_dir_names: default_test_dir_names(),
            build_config_names: default_build_config_names(),
            vendor_dir: default_vendor_dir(),
        }
    }
}

impl CrawlConfig {
    #[must_use]
    pub const fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_search_api_limits() {
        let config = CrawlConfig::default();
        assert_eq!(config.per_page, 100);
        assert_eq!(config.request_delay(), Duration::from_secs(2));
        assert_eq!(config.retry_delay(), Duration::from_secs(10));
        assert_eq!(config.build_config_names, ["truffle.js", "truffle-config.js"]);
        assert!(config.search_filters.is_empty());
    }
}
