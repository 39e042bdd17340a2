//! Command implementations for the Slice CLI

pub mod balance;
pub mod daily;
pub mod monthly;
pub mod window;

use std::path::Path;

use anyhow::{Context, Result};
use slice_config::Config;
use slice_store::Store;

/// Load config (falling back to defaults when the file is absent),
/// apply environment overrides and open the store.
pub(crate) async fn open(config_path: &Path) -> Result<(Config, Store)> {
    let mut config = Config::from_file_or_default(config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    config.apply_env();

    let store = Store::new(config.store.data_dir.as_str())
        .await
        .with_context(|| format!("opening store at {}", config.store.data_dir))?;

    Ok((config, store))
}
