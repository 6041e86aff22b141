//! Command implementations.

pub mod check;
pub mod resolve;
pub mod serve;

use std::{path::Path, sync::Arc};

use agencyos_blocks::{ContentSource, DirectusSource, MemorySource};
use agencyos_core::Config;
use color_eyre::eyre::{Result, WrapErr};

/// Load the configuration file with environment overrides.
pub fn load_config(config_path: &Path) -> Result<Config> {
    Config::load_with_env(config_path)
        .wrap_err_with(|| format!("Failed to load configuration from {}", config_path.display()))
}

/// Content source for a command: the fixture directory when one is given,
/// the configured Directus instance otherwise.
pub fn content_source(config: &Config, fixtures: Option<&Path>) -> Result<Arc<dyn ContentSource>> {
    match fixtures {
        Some(dir) => {
            let source = MemorySource::from_dir(dir)
                .wrap_err_with(|| format!("Failed to load fixtures from {}", dir.display()))?;
            Ok(Arc::new(source))
        }
        None => {
            let source = DirectusSource::from_config(&config.content)
                .wrap_err("Failed to create content source client")?;
            Ok(Arc::new(source))
        }
    }
}
