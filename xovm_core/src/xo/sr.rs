use crate::repository::{ObjectKind, XoObject};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SrType {
    /// Optical media library, never a boot target.
    #[serde(rename = "iso")]
    Iso,
    #[serde(untagged)]
    Other(String),
}
impl fmt::Display for SrType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SrType::Iso => write!(f, "iso"),
            SrType::Other(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRepository {
    pub id: String,
    #[serde(rename = "name_label")]
    pub name: String,
    #[serde(rename = "name_description", default)]
    pub description: String,
    #[serde(rename = "SR_type")]
    pub sr_type: SrType,
    #[serde(rename = "$pool")]
    pub pool: String,
}
impl XoObject for StorageRepository {
    const KIND: ObjectKind = ObjectKind::StorageRepository;
}
impl StorageRepository {
    pub fn is_optical(&self) -> bool {
        self.sr_type == SrType::Iso
    }
}
