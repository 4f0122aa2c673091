use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "trellis.config.json";

/// Navigation sync configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// Block wrapping the whole menu
    #[serde(default = "default_root_block_name")]
    pub root_block_name: String,

    /// Block for menu items without children
    #[serde(default = "default_link_block_name")]
    pub link_block_name: String,

    /// Block for menu items with children
    #[serde(default = "default_submenu_block_name")]
    pub submenu_block_name: String,

    /// Status given to menu items created on save
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_root_block_name() -> String {
    "navigation".to_string()
}

fn default_link_block_name() -> String {
    "navigation-link".to_string()
}

fn default_submenu_block_name() -> String {
    "navigation-submenu".to_string()
}

fn default_status() -> String {
    "publish".to_string()
}

impl SyncConfig {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: SyncConfig = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(SyncConfig::default())
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            root_block_name: default_root_block_name(),
            link_block_name: default_link_block_name(),
            submenu_block_name: default_submenu_block_name(),
            status: default_status(),
        }
    }
}
