/*
* Parameters of the mutating remote calls.
*
* Update sets only carry the fields that change:
* a `None` field is absent from the call.
*/
use crate::xo::DiskMode;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::collections::BTreeMap;

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmUpdate {
    #[serde(rename = "name_label")]
    pub name: Option<String>,
    #[serde(rename = "name_description")]
    pub description: Option<String>,
}
impl VmUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VdiUpdate {
    #[serde(rename = "name_label")]
    pub name: Option<String>,
    #[serde(rename = "name_description")]
    pub description: Option<String>,
    /// Bytes.
    pub size: Option<u64>,
}
impl VdiUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.size.is_none()
    }
}

/// `disk.create` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVdi {
    pub name: String,
    pub mode: DiskMode,
    /// Bytes.
    pub size: u64,
    pub sr: String,
}

/// A disk described inside a `vm.create` call.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmDisk {
    pub name_label: String,
    pub name_description: Option<String>,
    #[serde(rename = "SR")]
    pub sr: String,
    /// Bytes.
    pub size: u64,
    #[serde(rename = "type")]
    pub _type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmVif {
    pub network: String,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmInstallation {
    /// "network" or "cdrom".
    pub method: String,
    /// Bootable media disk.
    pub repository: Option<String>,
}

/// `vm.create` parameters.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVm {
    pub name_label: String,
    pub name_description: String,
    pub template: String,
    #[serde(rename = "CPUs")]
    pub cpus: u64,
    /// Bytes.
    pub memory: u64,
    #[serde(rename = "VIFs")]
    pub vifs: Vec<VmVif>,
    pub installation: Option<VmInstallation>,
    /// Fresh disks (install path).
    #[serde(rename = "VDIs")]
    pub vdis: Option<Vec<VmDisk>>,
    /// Template disks to clone, keyed by position (clone path).
    #[serde(rename = "existingDisks")]
    pub existing_disks: Option<BTreeMap<String, VmDisk>>,
    #[serde(rename = "bootAfterCreate")]
    pub boot_after_create: bool,
}
