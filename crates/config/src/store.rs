//! Data store configuration

use serde::Deserialize;

/// Store configuration
///
/// Points at the directory holding the SQLite database file. Set to an
/// empty string (or use `Store::new_memory`) for in-memory testing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory for database files
    /// Default: "data"
    pub data_dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".into(),
        }
    }
}

impl StoreConfig {
    /// Apply environment overrides (`SLICE_DATA_DIR`)
    pub fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("SLICE_DATA_DIR") {
            if !dir.is_empty() {
                self.data_dir = dir;
            }
        }
    }
}
