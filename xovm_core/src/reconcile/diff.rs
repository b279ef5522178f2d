/*
* Attachment diffing.
*
* Current attachments are matched against the set of desired fingerprints.
* Every current attachment found in the set is kept, duplicates included,
* and a desired entry is attached at most once.
*/
use super::fingerprint::{Fingerprint, Fingerprinted};
use crate::state::{DiskRef, NetworkRef};
use crate::xo::{Vbd, Vif, BOOT_POSITION};

use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttachmentKind {
    Disk,
    Network,
}
impl AttachmentKind {
    /// The boot slot is never diffed, network slots all are.
    pub fn reconciles(&self, slot: &str) -> bool {
        match self {
            AttachmentKind::Disk => slot != BOOT_POSITION,
            AttachmentKind::Network => true,
        }
    }
}

/// A live attachment, reduced to what planning needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentAttachment {
    pub id: String,
    /// Position for disks, device for networks.
    pub slot: String,
    pub fingerprint: Fingerprint,
    /// Currently plugged into the running guest.
    pub attached: bool,
}
impl From<&Vbd> for CurrentAttachment {
    fn from(e: &Vbd) -> Self {
        Self {
            id: e.id.clone(),
            slot: e.position.clone(),
            fingerprint: e.fingerprint(),
            attached: e.attached,
        }
    }
}
impl From<&Vif> for CurrentAttachment {
    fn from(e: &Vif) -> Self {
        Self {
            id: e.id.clone(),
            slot: e.device.clone(),
            fingerprint: e.fingerprint(),
            attached: e.attached,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan<D> {
    /// Attachment ids left untouched.
    pub keep: Vec<String>,
    /// Obsolete attachments, in current order.
    pub detach_delete: Vec<CurrentAttachment>,
    /// Missing entries, in desired order.
    pub attach: Vec<D>,
}
impl<D> Default for Plan<D> {
    fn default() -> Self {
        Self {
            keep: vec![],
            detach_delete: vec![],
            attach: vec![],
        }
    }
}
impl<D> Plan<D> {
    pub fn is_empty(&self) -> bool {
        self.detach_delete.is_empty() && self.attach.is_empty()
    }
}

pub fn plan<D>(kind: AttachmentKind, current: &[CurrentAttachment], desired: &[D]) -> Plan<D>
where
    D: Fingerprinted + Clone,
{
    let current: Vec<&CurrentAttachment> =
        current.iter().filter(|e| kind.reconciles(&e.slot)).collect();
    let present: HashSet<&Fingerprint> = current.iter().map(|e| &e.fingerprint).collect();
    let wanted: HashSet<Fingerprint> = desired.iter().map(|e| e.fingerprint()).collect();

    let mut res = Plan::default();
    for attachment in current {
        if wanted.contains(&attachment.fingerprint) {
            res.keep.push(attachment.id.clone());
        } else {
            res.detach_delete.push(attachment.clone());
        }
    }
    let mut queued: HashSet<Fingerprint> = HashSet::new();
    for entry in desired {
        let fingerprint = entry.fingerprint();
        if present.contains(&fingerprint) || queued.contains(&fingerprint) {
            continue;
        }
        queued.insert(fingerprint);
        res.attach.push(entry.clone());
    }
    res
}

/// Cd drives are never part of the disk plan.
pub fn plan_disks(current: &[Vbd], desired: &[DiskRef]) -> Plan<DiskRef> {
    let current: Vec<CurrentAttachment> = current
        .iter()
        .filter(|e| !e.is_cd_drive)
        .map(CurrentAttachment::from)
        .collect();
    plan(AttachmentKind::Disk, &current, desired)
}

pub fn plan_networks(current: &[Vif], desired: &[NetworkRef]) -> Plan<NetworkRef> {
    let current: Vec<CurrentAttachment> = current.iter().map(CurrentAttachment::from).collect();
    plan(AttachmentKind::Network, &current, desired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::fingerprint::AttachmentKey;
    use pretty_assertions::assert_eq;

    fn disk(id: &str) -> DiskRef {
        DiskRef {
            disk_id: id.to_owned(),
        }
    }
    fn attachment(id: &str, slot: &str, disk_id: &str) -> CurrentAttachment {
        CurrentAttachment {
            id: id.to_owned(),
            slot: slot.to_owned(),
            fingerprint: AttachmentKey::Disk {
                disk_id: disk_id.to_owned(),
            }
            .fingerprint(),
            attached: true,
        }
    }
    fn ids(attachments: &[CurrentAttachment]) -> Vec<&str> {
        attachments.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn partition_keep_detach_attach() {
        let current = vec![attachment("vbd-1", "1", "a"), attachment("vbd-2", "2", "b")];
        let res = plan(AttachmentKind::Disk, &current, &[disk("b"), disk("c")]);
        assert_eq!(res.keep, vec!["vbd-2".to_owned()]);
        assert_eq!(ids(&res.detach_delete), vec!["vbd-1"]);
        assert_eq!(res.attach, vec![disk("c")]);
    }

    #[test]
    fn unchanged_state_yields_an_empty_plan() {
        let current = vec![attachment("vbd-1", "1", "a"), attachment("vbd-2", "2", "b")];
        let res = plan(AttachmentKind::Disk, &current, &[disk("a"), disk("b")]);
        assert!(res.is_empty());
        assert_eq!(res.keep.len(), 2);
    }

    #[test]
    fn boot_slot_is_never_evaluated() {
        let current = vec![attachment("vbd-boot", "0", "boot"), attachment("vbd-1", "1", "a")];
        // Not desired: still not detached.
        let res = plan(AttachmentKind::Disk, &current, &[disk("a")]);
        assert!(res.is_empty());
        // Desired: not matched against the boot slot either.
        let res = plan(AttachmentKind::Disk, &current, &[disk("a"), disk("boot")]);
        assert!(res.detach_delete.is_empty());
        assert!(!res.keep.contains(&"vbd-boot".to_owned()));
        assert_eq!(res.attach, vec![disk("boot")]);
    }

    #[test]
    fn network_slot_zero_is_reconciled() {
        let current = vec![attachment("vif-0", "0", "a")];
        let res = plan(AttachmentKind::Network, &current, &[disk("b")]);
        assert_eq!(ids(&res.detach_delete), vec!["vif-0"]);
    }

    #[test]
    fn permutation_only_changes_attach_order() {
        let current = vec![attachment("vbd-1", "1", "a")];
        let desired = vec![disk("a"), disk("b"), disk("c")];
        let mut permuted = desired.clone();
        permuted.reverse();

        let left = plan(AttachmentKind::Disk, &current, &desired);
        let right = plan(AttachmentKind::Disk, &current, &permuted);
        assert_eq!(left.keep, right.keep);
        assert_eq!(left.detach_delete, right.detach_delete);
        assert_eq!(left.attach, vec![disk("b"), disk("c")]);
        assert_eq!(right.attach, vec![disk("c"), disk("b")]);
    }

    #[test]
    fn duplicates_follow_set_semantics() {
        // Listing a disk twice attaches it once.
        let res = plan(AttachmentKind::Disk, &[], &[disk("a"), disk("b"), disk("a")]);
        assert_eq!(res.attach, vec![disk("a"), disk("b")]);

        let current = vec![attachment("vbd-1", "1", "a")];
        let res = plan(AttachmentKind::Disk, &current, &[disk("a"), disk("a")]);
        assert_eq!(res.keep, vec!["vbd-1".to_owned()]);
        assert!(res.is_empty());

        // Two interfaces on the same network both survive a single desired entry.
        let current = vec![attachment("vif-0", "0", "n1"), attachment("vif-1", "1", "n1")];
        let res = plan(AttachmentKind::Network, &current, &[disk("n1")]);
        assert!(res.detach_delete.is_empty());
        assert!(res.attach.is_empty());
        assert_eq!(res.keep, vec!["vif-0".to_owned(), "vif-1".to_owned()]);
    }

    #[test]
    fn cd_drives_are_left_out_of_disk_plans() {
        let cd = Vbd {
            id: "vbd-cd".to_owned(),
            bootable: false,
            device: Some("xvdd".to_owned()),
            is_cd_drive: true,
            position: "3".to_owned(),
            vdi: None,
            vm: "vm".to_owned(),
            attached: true,
        };
        let res = plan_disks(&[cd], &[]);
        assert!(res.is_empty());
    }
}
