use crate::repository::{ObjectKind, XoObject};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum DiskMode {
    #[serde(rename = "RO")]
    #[strum(serialize = "RO")]
    ReadOnly,
    #[default]
    #[serde(rename = "RW")]
    #[strum(serialize = "RW")]
    ReadWrite,
}

/// A virtual disk image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vdi {
    pub id: String,
    #[serde(rename = "name_label")]
    pub name: String,
    #[serde(rename = "name_description", default)]
    pub description: String,
    /// Bytes.
    pub size: u64,
    #[serde(rename = "$SR")]
    pub sr: String,
    /// Inherited from the storage repository.
    #[serde(rename = "$pool")]
    pub pool: String,
}
impl XoObject for Vdi {
    const KIND: ObjectKind = ObjectKind::Vdi;
}
