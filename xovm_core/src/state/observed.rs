use super::ByteSize;
use crate::xo::{PowerState, Vdi};

use serde::{Deserialize, Serialize};

/// The boot disk as observed remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedBootDisk {
    pub disk_id: String,
    pub storage_repository_id: String,
    pub size: ByteSize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedDisk {
    pub disk_id: String,
    pub device: Option<String>,
    pub position: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedNic {
    pub attached: bool,
    pub device: String,
    pub network_id: String,
    pub mac_address: String,
}

/**
The state of a vm as reported back to the front end.
Attachments are listed in attachment order.
*/
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedVm {
    pub id: String,
    pub name: String,
    pub description: String,
    pub cpus: u64,
    pub memory: ByteSize,
    pub power_state: PowerState,
    pub pv_drivers_detected: bool,
    pub pool: String,
    pub boot_disk: Option<ObservedBootDisk>,
    pub attached_disks: Vec<ObservedDisk>,
    pub network_interfaces: Vec<ObservedNic>,
}

/// A standalone disk as observed remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedVdi {
    pub id: String,
    pub name: String,
    pub description: String,
    pub size: ByteSize,
    pub storage_repository_id: String,
    pub pool: String,
}
impl From<Vdi> for ObservedVdi {
    fn from(e: Vdi) -> Self {
        Self {
            id: e.id,
            name: e.name,
            description: e.description,
            size: ByteSize(e.size),
            storage_repository_id: e.sr,
            pool: e.pool,
        }
    }
}
