//! GitHub API client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_api_url() -> String {
    String::from("https://api.github.com")
}

fn default_user_agent() -> String {
    String::from("harvest/0.1")
}

const fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubConfig {
    /// Personal access token. Empty means unauthenticated requests.
    #[serde(default)]
    pub token: String,

    /// REST API base URL (override for GitHub Enterprise).
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Sent as the `User-Agent` header, which GitHub requires.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: default_api_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GitHubConfig {
    /// A token is set. Unauthenticated runs work but hit the search rate limit
    /// after ten requests per minute.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.token.trim().is_empty()
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_not_configured() {
        let config = GitHubConfig::default();
        assert!(!config.is_configured());
        assert_eq!(config.api_url, "https://api.github.com");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn whitespace_token_is_not_configured() {
        let config = GitHubConfig {
            token: "  ".into(),
            ..GitHubConfig::default()
        };
        assert!(!config.is_configured());
    }
}
