//! Shared state handed to every command handler.

use anyhow::Context;
use harvest_config::HarvestConfig;
use harvest_ledger::{ProjectLedger, RepositoryLedger, open_projects, open_repositories};

/// Application resources initialized once at startup.
pub struct AppContext {
    pub config: HarvestConfig,
}

impl AppContext {
    #[must_use]
    pub const fn new(config: HarvestConfig) -> Self {
        Self { config }
    }

    pub fn repositories(&self) -> anyhow::Result<RepositoryLedger> {
        let path = self.config.pipeline.repositories_path();
        open_repositories(&path)
            .with_context(|| format!("failed to open repository ledger {}", path.display()))
    }

    pub fn projects(&self) -> anyhow::Result<ProjectLedger> {
        let path = self.config.pipeline.projects_path();
        open_projects(&path)
            .with_context(|| format!("failed to open project ledger {}", path.display()))
    }
}

/// Emit warnings for configuration that silently fell back to defaults.
pub fn warn_unconfigured(config: &HarvestConfig) {
    for warning in collect_unconfigured_warnings(config, std::env::vars()) {
        tracing::warn!("{warning}");
    }
}

fn collect_unconfigured_warnings<I>(config: &HarvestConfig, env: I) -> Vec<String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let env_keys = env.into_iter().map(|(key, _)| key).collect::<Vec<_>>();
    let mut warnings = Vec::new();

    if !config.github.is_configured() && has_single_underscore_key(&env_keys, "HARVEST_GITHUB") {
        warnings.push(
            "GitHub token appears unset while HARVEST_GITHUB_* env vars exist. Use double underscores (example: HARVEST_GITHUB__TOKEN)."
                .to_string(),
        );
    }
    if has_single_underscore_key(&env_keys, "HARVEST_PIPELINE") {
        warnings.push(
            "HARVEST_PIPELINE_* env vars are ignored. Use double underscores (example: HARVEST_PIPELINE__CLONE_DIR)."
                .to_string(),
        );
    }

    warnings
}

/// `{section}_X` present where `{section}__X` was meant.
fn has_single_underscore_key(keys: &[String], section: &str) -> bool {
    keys.iter().any(|key| {
        key.strip_prefix(section)
            .is_some_and(|rest| rest.starts_with('_') && !rest.starts_with("__"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(keys: &[&str]) -> Vec<(String, String)> {
        keys.iter().map(|k| ((*k).to_string(), "x".to_string())).collect()
    }

    #[test]
    fn single_underscore_github_token_is_flagged() {
        let warnings = collect_unconfigured_warnings(
            &HarvestConfig::default(),
            env(&["HARVEST_GITHUB_TOKEN"]),
        );
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("HARVEST_GITHUB__TOKEN"));
    }

    #[test]
    fn double_underscore_keys_are_not_flagged() {
        let mut config = HarvestConfig::default();
        config.github.token = "ghp_example".into();
        let warnings = collect_unconfigured_warnings(
            &config,
            env(&["HARVEST_GITHUB__TOKEN", "HARVEST_PIPELINE__CLONE_DIR"]),
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn single_underscore_pipeline_key_is_flagged() {
        let warnings = collect_unconfigured_warnings(
            &HarvestConfig::default(),
            env(&["HARVEST_PIPELINE_CLONE_DIR"]),
        );
        assert_eq!(warnings.len(), 1);
    }
}
