use anyhow::Context;
use harvest_config::HarvestConfig;

use crate::cli::GlobalFlags;

/// Load `.env`, the layered configuration, then apply command-line overrides.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<HarvestConfig> {
    let mut config =
        HarvestConfig::load_with_dotenv().context("failed to load harvest configuration")?;
    apply_overrides(&mut config, flags);
    Ok(config)
}

fn apply_overrides(config: &mut HarvestConfig, flags: &GlobalFlags) {
    if let Some(dir) = &flags.data_dir {
        config.pipeline.data_dir.clone_from(dir);
    }
    if let Some(dir) = &flags.clone_dir {
        config.pipeline.clone_dir.clone_from(dir);
    }
}
