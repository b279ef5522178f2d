use super::{Vbd, Vdi, Vif};
use crate::repository::{get_by_id, ObjectKind, Repository, XoObject};

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString};

// Error Handling
use log::warn;
use xovm_error::RepositoryError;

/// Power state as reported by the hypervisor.
/// States the engine does not act upon are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerState {
    Running,
    Halted,
    Paused,
    Suspended,
    #[serde(untagged)]
    Other(String),
}
impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let string = match self {
            PowerState::Running => "Running",
            PowerState::Halted => "Halted",
            PowerState::Paused => "Paused",
            PowerState::Suspended => "Suspended",
            PowerState::Other(v) => v,
        };
        write!(f, "{}", string)
    }
}
impl PowerState {
    pub fn is_running(&self) -> bool {
        *self == PowerState::Running
    }
    pub fn is_halted(&self) -> bool {
        *self == PowerState::Halted
    }
}

/// The only power states a caller can ask for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum DesiredPowerState {
    Running,
    Halted,
}
impl From<DesiredPowerState> for PowerState {
    fn from(e: DesiredPowerState) -> Self {
        match e {
            DesiredPowerState::Running => PowerState::Running,
            DesiredPowerState::Halted => PowerState::Halted,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmCpus {
    pub max: u64,
    pub number: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmMemory {
    /// Bytes.
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachine {
    pub id: String,
    #[serde(rename = "name_label")]
    pub name: String,
    #[serde(rename = "name_description", default)]
    pub description: String,
    #[serde(rename = "CPUs")]
    pub cpus: VmCpus,
    pub memory: VmMemory,
    pub power_state: PowerState,
    /// Paravirtualized drivers are running in the guest.
    /// Without them nothing can be hot-plugged.
    #[serde(rename = "pvDriversDetected", default)]
    pub pv_drivers_detected: bool,
    // Newest first, as listed by the remote side.
    #[serde(rename = "$VBDs", default)]
    pub vbds: Vec<String>,
    #[serde(rename = "VIFs", default)]
    pub vifs: Vec<String>,
    #[serde(rename = "$pool")]
    pub pool: String,
}
impl XoObject for VirtualMachine {
    const KIND: ObjectKind = ObjectKind::Vm;
}

impl VirtualMachine {
    /*
     * Every disk attachment of the vm, cd drives included.
     * Attachments removed since the vm snapshot was taken are skipped.
     */
    pub async fn get_vbds<R>(&self, repo: &R) -> Result<Vec<Vbd>, RepositoryError>
    where
        R: Repository + ?Sized,
    {
        let mut vbds = vec![];
        for id in &self.vbds {
            match get_by_id::<Vbd, R>(repo, id).await {
                Ok(vbd) => vbds.push(vbd),
                Err(RepositoryError::NotFound { .. }) => {
                    warn!("vbd {} of vm {} vanished, ignoring it", id, self.id);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(vbds)
    }
    /// Disk attachments subject to reconciliation:
    /// no cd drives, no boot disk.
    pub async fn get_attached_vbds<R>(&self, repo: &R) -> Result<Vec<Vbd>, RepositoryError>
    where
        R: Repository + ?Sized,
    {
        let vbds = self
            .get_vbds(repo)
            .await?
            .into_iter()
            .filter(|e| e.is_reconcilable())
            .collect();
        Ok(vbds)
    }
    pub async fn get_boot_vbd<R>(&self, repo: &R) -> Result<Option<Vbd>, RepositoryError>
    where
        R: Repository + ?Sized,
    {
        let vbd = self
            .get_vbds(repo)
            .await?
            .into_iter()
            .find(|e| e.is_boot());
        Ok(vbd)
    }
    /// The disk plugged at the boot position, if any.
    pub async fn get_boot_disk<R>(&self, repo: &R) -> Result<Option<Vdi>, RepositoryError>
    where
        R: Repository + ?Sized,
    {
        match self.get_boot_vbd(repo).await? {
            Some(vbd) => vbd.get_vdi(repo).await,
            None => Ok(None),
        }
    }
    pub async fn get_vifs<R>(&self, repo: &R) -> Result<Vec<Vif>, RepositoryError>
    where
        R: Repository + ?Sized,
    {
        let mut vifs = vec![];
        for id in &self.vifs {
            match get_by_id::<Vif, R>(repo, id).await {
                Ok(vif) => vifs.push(vif),
                Err(RepositoryError::NotFound { .. }) => {
                    warn!("vif {} of vm {} vanished, ignoring it", id, self.id);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(vifs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::{IntoDiagnostic, Result};
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_vm_snapshot() -> Result<()> {
        let json = r#"{
            "id": "vm-1",
            "name_label": "web",
            "CPUs": { "max": 2, "number": 2 },
            "memory": { "size": 2147483648 },
            "power_state": "Running",
            "pvDriversDetected": true,
            "$VBDs": ["vbd-2", "vbd-1"],
            "VIFs": ["vif-1"],
            "$pool": "pool-a"
        }"#;
        let vm: VirtualMachine = serde_json::from_str(json).into_diagnostic()?;
        assert_eq!(vm.power_state, PowerState::Running);
        assert_eq!(vm.description, "");
        assert_eq!(vm.vbds, vec!["vbd-2".to_owned(), "vbd-1".to_owned()]);
        Ok(())
    }

    #[test]
    fn unknown_power_states_are_kept_verbatim() -> Result<()> {
        let state: PowerState = serde_json::from_str(r#""Migrating""#).into_diagnostic()?;
        assert_eq!(state, PowerState::Other("Migrating".to_owned()));
        assert_eq!(state.to_string(), "Migrating");
        assert!(!state.is_running());
        Ok(())
    }
}
