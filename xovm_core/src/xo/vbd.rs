use super::Vdi;
use crate::repository::{get_by_id, ObjectKind, Repository, XoObject};

use serde::{Deserialize, Serialize};

// Error Handling
use xovm_error::RepositoryError;

/// Boot disks are always plugged at this position.
pub const BOOT_POSITION: &str = "0";

/// A disk attachment (virtual block device).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vbd {
    pub id: String,
    #[serde(default)]
    pub bootable: bool,
    /// Assigned by the hypervisor once plugged.
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub is_cd_drive: bool,
    pub position: String,
    /// Empty cd drives carry no disk.
    #[serde(rename = "VDI", default)]
    pub vdi: Option<String>,
    #[serde(rename = "VM")]
    pub vm: String,
    #[serde(default)]
    pub attached: bool,
}
impl XoObject for Vbd {
    const KIND: ObjectKind = ObjectKind::Vbd;
}

impl Vbd {
    pub fn is_boot(&self) -> bool {
        !self.is_cd_drive && self.position == BOOT_POSITION
    }
    /// Boot disk and optical media are never reconciled.
    pub fn is_reconcilable(&self) -> bool {
        !self.is_cd_drive && self.position != BOOT_POSITION
    }
    pub async fn get_vdi<R>(&self, repo: &R) -> Result<Option<Vdi>, RepositoryError>
    where
        R: Repository + ?Sized,
    {
        match &self.vdi {
            Some(id) => Ok(Some(get_by_id::<Vdi, R>(repo, id).await?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vbd(position: &str, is_cd_drive: bool) -> Vbd {
        Vbd {
            id: "vbd".to_owned(),
            bootable: false,
            device: None,
            is_cd_drive,
            position: position.to_owned(),
            vdi: None,
            vm: "vm".to_owned(),
            attached: false,
        }
    }

    #[test]
    fn boot_slot_and_cd_drives_are_not_reconcilable() {
        assert!(vbd("0", false).is_boot());
        assert!(!vbd("0", false).is_reconcilable());
        assert!(!vbd("3", true).is_reconcilable());
        assert!(!vbd("0", true).is_boot());
        assert!(vbd("1", false).is_reconcilable());
    }
}
