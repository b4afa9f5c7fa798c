pub mod config;
pub mod files;
pub mod rules;
pub mod run;
pub mod verify;

use anyhow::Context;
use migrate_core::config::Config;
use std::path::Path;

pub(crate) fn load_config(root: &Path) -> anyhow::Result<Config> {
    Config::load(root).with_context(|| {
        format!(
            "failed to load {}",
            migrate_core::paths::config_path(root).display()
        )
    })
}
