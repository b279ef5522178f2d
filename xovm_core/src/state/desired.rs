use super::ByteSize;
use crate::xo::{DesiredPowerState, DiskMode};

use serde::{Deserialize, Serialize};
use std::fs;
use strum::{Display, EnumString};

// Error Handling
use xovm_error::{CastError, PreconditionViolation, TomlError, XovmError};

/// Attached disks a vm can hold besides its boot disk.
pub const MAX_ATTACHED_DISKS: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootDiskSpec {
    pub storage_repository_id: String,
    pub size: ByteSize,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InstallMethod {
    Network,
    #[serde(alias = "cd")]
    #[strum(to_string = "media", serialize = "cd")]
    Media,
}
impl InstallMethod {
    /// The method name on the remote api.
    pub fn remote_name(&self) -> &'static str {
        match self {
            InstallMethod::Network => "network",
            InstallMethod::Media => "cdrom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationSpec {
    pub method: InstallMethod,
    /// The bootable media, for media installations only.
    #[serde(default)]
    pub disk_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiskRef {
    pub disk_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkRef {
    pub network_id: String,
}

/// The desired state of a virtual machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub template_id: String,
    pub cpus: u64,
    pub memory: ByteSize,
    pub boot_disk: BootDiskSpec,
    #[serde(default)]
    pub installation: Option<InstallationSpec>,
    /// Ordered, a repeated entry is attached once.
    #[serde(default)]
    pub attached_disks: Vec<DiskRef>,
    /// Ordered, a repeated entry is attached once.
    #[serde(default)]
    pub network_interfaces: Vec<NetworkRef>,
    #[serde(default)]
    pub desired_status: Option<DesiredPowerState>,
    #[serde(default)]
    pub allow_stopping_for_update: bool,
}

impl VmSpec {
    pub fn from_file(path: &str) -> Result<Self, XovmError> {
        let string = fs::read_to_string(path)?;
        Self::from_toml(&string)
    }
    pub fn from_toml(string: &str) -> Result<Self, XovmError> {
        let res = toml::from_str::<Self>(string);
        let item = match res {
            Ok(res) => res,
            Err(e) => {
                let err = CastError::TomlError(TomlError::new(e, string));
                return Err(err.into());
            }
        };
        Ok(item)
    }

    /*
     * Reject incoherent specs before the remote side is even queried.
     */
    pub fn validate(&self) -> Result<(), XovmError> {
        if self.name.trim().is_empty() {
            return Err(invalid("vm name is empty", "Set a non empty name."));
        }
        if self.cpus == 0 {
            return Err(invalid("vm needs at least one cpu", "Set cpus >= 1."));
        }
        if self.memory.bytes() == 0 {
            return Err(invalid(
                "vm memory is null",
                "Set a memory size, ex: memory = \"2GiB\".",
            ));
        }
        if self.boot_disk.size.bytes() == 0 {
            return Err(invalid(
                "boot disk size is null",
                "Set a boot disk size, ex: size = \"20GiB\".",
            ));
        }
        if self.network_interfaces.is_empty() {
            return Err(invalid(
                "vm needs at least one network interface",
                "Add a [[network_interfaces]] entry.",
            ));
        }
        if self.attached_disks.len() > MAX_ATTACHED_DISKS {
            let message = format!(
                "{} attached disks requested, at most {} are supported",
                self.attached_disks.len(),
                MAX_ATTACHED_DISKS
            );
            return Err(invalid(&message, "Remove some [[attached_disks]] entries."));
        }
        if let Some(installation) = &self.installation {
            installation.validate()?;
        }
        Ok(())
    }
}

impl InstallationSpec {
    pub fn validate(&self) -> Result<(), XovmError> {
        match (self.method, &self.disk_id) {
            (InstallMethod::Media, None) => Err(invalid(
                "media installation requires a disk",
                "Set installation.disk_id to the iso disk to boot from.",
            )),
            (InstallMethod::Network, Some(_)) => Err(invalid(
                "network installation can't use a disk",
                "Remove installation.disk_id or use method = \"media\".",
            )),
            _ => Ok(()),
        }
    }
}

/// The desired state of a standalone disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub storage_repository_id: String,
    pub size: ByteSize,
    #[serde(default)]
    pub mode: DiskMode,
}

impl DiskSpec {
    pub fn from_file(path: &str) -> Result<Self, XovmError> {
        let string = fs::read_to_string(path)?;
        Self::from_toml(&string)
    }
    pub fn from_toml(string: &str) -> Result<Self, XovmError> {
        let res = toml::from_str::<Self>(string);
        let item = match res {
            Ok(res) => res,
            Err(e) => {
                let err = CastError::TomlError(TomlError::new(e, string));
                return Err(err.into());
            }
        };
        Ok(item)
    }
}

fn invalid(msg: &str, help: &str) -> XovmError {
    PreconditionViolation::builder()
        .msg(msg)
        .help(help)
        .build()
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::fixtures;
    use miette::Result;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_vm_spec_from_toml() -> Result<()> {
        let toml = r#"
            name = "web"
            template_id = "tpl-debian"
            cpus = 2
            memory = "2GiB"
            desired_status = "Running"

            [boot_disk]
            storage_repository_id = "sr-local"
            size = "20GiB"

            [installation]
            method = "cd"
            disk_id = "vdi-iso"

            [[network_interfaces]]
            network_id = "net-a"

            [[network_interfaces]]
            network_id = "net-a"
        "#;
        let spec = VmSpec::from_toml(toml)?;
        assert_eq!(spec.memory, ByteSize(2 * 1024 * 1024 * 1024));
        assert_eq!(spec.desired_status, Some(DesiredPowerState::Running));
        assert_eq!(spec.installation.as_ref().map(|e| e.method), Some(InstallMethod::Media));
        assert_eq!(spec.network_interfaces.len(), 2);
        assert!(spec.attached_disks.is_empty());
        assert!(!spec.allow_stopping_for_update);
        spec.validate()?;
        Ok(())
    }

    #[test]
    fn reject_incoherent_specs() -> Result<()> {
        let mut spec = fixtures::spec();
        spec.network_interfaces.clear();
        assert!(spec.validate().is_err());

        let mut spec = fixtures::spec();
        spec.attached_disks = (0..15)
            .map(|i| DiskRef {
                disk_id: format!("vdi-{i}"),
            })
            .collect();
        assert!(spec.validate().is_err());

        let mut spec = fixtures::spec();
        spec.installation = Some(InstallationSpec {
            method: InstallMethod::Network,
            disk_id: Some(fixtures::INSTALL_MEDIA.to_owned()),
        });
        assert!(spec.validate().is_err());

        fixtures::spec().validate()?;
        Ok(())
    }

    #[test]
    fn media_maps_to_cdrom() {
        assert_eq!(InstallMethod::Media.remote_name(), "cdrom");
        assert_eq!("cd".parse::<InstallMethod>().ok(), Some(InstallMethod::Media));
    }
}
