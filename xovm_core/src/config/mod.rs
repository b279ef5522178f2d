pub mod load;

use serde::{Deserialize, Serialize};

pub const CONFIG_DIR: &'static str = "/etc/xovm";

/*
* The xovm cli configuration.
*/
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct XovmConfig {
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReconcileConfig {
    /// Applied to specs that do not set allow_stopping_for_update.
    #[serde(default)]
    pub allow_stopping_for_update: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InventoryConfig {
    /// Snapshot backing the offline repository.
    pub path: String,
}
impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            path: CONFIG_DIR.to_owned() + "/inventory.toml",
        }
    }
}
