use crate::repository::{ObjectKind, XoObject};
use serde::{Deserialize, Serialize};

/// A network attachment (virtual interface).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vif {
    pub id: String,
    /// Assigned by the hypervisor.
    pub device: String,
    #[serde(default)]
    pub mac: String,
    #[serde(default)]
    pub attached: bool,
    #[serde(rename = "$network")]
    pub network: String,
    #[serde(rename = "$VM")]
    pub vm: String,
}
impl XoObject for Vif {
    const KIND: ObjectKind = ObjectKind::Vif;
}
