/*
* Shared test inventory.
*
* pool-a holds a running vm without pv drivers,
* pool-b only holds resources that must be rejected as foreign.
*/
use crate::repository::Inventory;
use crate::state::{BootDiskSpec, ByteSize, NetworkRef, VmSpec};
use crate::xo::{
    Network, Pool, PowerState, SrType, StorageRepository, Template, Vbd, Vdi, Vif,
    VirtualMachine, VmCpus, VmMemory,
};

pub const GIB: u64 = 1024 * 1024 * 1024;

pub const POOL: &str = "pool-a";
pub const FOREIGN_POOL: &str = "pool-b";

pub const NET_A: &str = "net-a";
pub const NET_B: &str = "net-b";
pub const FOREIGN_NET: &str = "net-foreign";

pub const SR_LOCAL: &str = "sr-local";
pub const SR_ISO: &str = "sr-iso";
pub const FOREIGN_SR: &str = "sr-foreign";

pub const BOOT_DISK: &str = "vdi-boot";
pub const DATA_DISK: &str = "vdi-data";
pub const DATA_DISK_2: &str = "vdi-data-2";
pub const FOREIGN_DISK: &str = "vdi-foreign";
pub const INSTALL_MEDIA: &str = "vdi-iso";
pub const TEMPLATE_DISK: &str = "vdi-template";
pub const TEMPLATE_DATA_DISK: &str = "vdi-template-data";

pub const TEMPLATE_CLONE: &str = "tpl-debian";
pub const TEMPLATE_INSTALL: &str = "tpl-other-install";
pub const TEMPLATE_MULTI: &str = "tpl-multi-disk";

pub const VM: &str = "vm-web";

fn pool(id: &str) -> Pool {
    Pool {
        id: id.to_owned(),
        name: id.to_owned(),
        description: "".to_owned(),
    }
}
fn network(id: &str, pool: &str) -> Network {
    Network {
        id: id.to_owned(),
        name: id.to_owned(),
        description: "".to_owned(),
        pool: pool.to_owned(),
    }
}
fn sr(id: &str, sr_type: SrType, pool: &str) -> StorageRepository {
    StorageRepository {
        id: id.to_owned(),
        name: id.to_owned(),
        description: "".to_owned(),
        sr_type,
        pool: pool.to_owned(),
    }
}
fn vdi(id: &str, size: u64, sr: &str, pool: &str) -> Vdi {
    Vdi {
        id: id.to_owned(),
        name: id.to_owned(),
        description: "".to_owned(),
        size,
        sr: sr.to_owned(),
        pool: pool.to_owned(),
    }
}
fn vbd(id: &str, vm: &str, vdi: Option<&str>, position: &str, attached: bool) -> Vbd {
    Vbd {
        id: id.to_owned(),
        bootable: position == "0",
        device: Some("xvda".to_owned()),
        is_cd_drive: vdi.is_none(),
        position: position.to_owned(),
        vdi: vdi.map(|e| e.to_owned()),
        vm: vm.to_owned(),
        attached,
    }
}
fn template(id: &str, vbds: &[&str]) -> Template {
    Template {
        id: id.to_owned(),
        name: id.to_owned(),
        description: "".to_owned(),
        vbds: vbds.iter().map(|e| e.to_string()).collect(),
        pool: POOL.to_owned(),
    }
}

pub fn inventory() -> Inventory {
    Inventory {
        pool: vec![pool(POOL), pool(FOREIGN_POOL)],
        network: vec![
            network(NET_A, POOL),
            network(NET_B, POOL),
            network(FOREIGN_NET, FOREIGN_POOL),
        ],
        sr: vec![
            sr(SR_LOCAL, SrType::Other("lvm".to_owned()), POOL),
            sr(SR_ISO, SrType::Iso, POOL),
            sr(FOREIGN_SR, SrType::Other("lvm".to_owned()), FOREIGN_POOL),
        ],
        template: vec![
            template(TEMPLATE_CLONE, &["vbd-tpl"]),
            template(TEMPLATE_INSTALL, &[]),
            template(TEMPLATE_MULTI, &["vbd-tpl-m0", "vbd-tpl-m1"]),
        ],
        vm: vec![VirtualMachine {
            id: VM.to_owned(),
            name: "web".to_owned(),
            description: "".to_owned(),
            cpus: VmCpus { max: 2, number: 2 },
            memory: VmMemory { size: 2 * GIB },
            power_state: PowerState::Running,
            pv_drivers_detected: false,
            vbds: vec!["vbd-cd".to_owned(), "vbd-boot".to_owned()],
            vifs: vec!["vif-web-0".to_owned()],
            pool: POOL.to_owned(),
        }],
        vbd: vec![
            vbd("vbd-boot", VM, Some(BOOT_DISK), "0", true),
            vbd("vbd-cd", VM, None, "3", true),
            vbd("vbd-tpl", TEMPLATE_CLONE, Some(TEMPLATE_DISK), "0", false),
            vbd("vbd-tpl-m0", TEMPLATE_MULTI, Some(TEMPLATE_DISK), "0", false),
            vbd("vbd-tpl-m1", TEMPLATE_MULTI, Some(TEMPLATE_DATA_DISK), "1", false),
        ],
        vif: vec![Vif {
            id: "vif-web-0".to_owned(),
            device: "0".to_owned(),
            mac: "02:16:3e:00:00:01".to_owned(),
            attached: true,
            network: NET_A.to_owned(),
            vm: VM.to_owned(),
        }],
        vdi: vec![
            vdi(BOOT_DISK, 10 * GIB, SR_LOCAL, POOL),
            vdi(DATA_DISK, 5 * GIB, SR_LOCAL, POOL),
            vdi(DATA_DISK_2, 5 * GIB, SR_LOCAL, POOL),
            vdi(FOREIGN_DISK, 5 * GIB, FOREIGN_SR, FOREIGN_POOL),
            vdi(INSTALL_MEDIA, GIB, SR_ISO, POOL),
            vdi(TEMPLATE_DISK, 8 * GIB, SR_LOCAL, POOL),
            vdi(TEMPLATE_DATA_DISK, 2 * GIB, SR_LOCAL, POOL),
        ],
    }
}

/// The desired state the fixture vm already converged to.
pub fn spec() -> VmSpec {
    VmSpec {
        name: "web".to_owned(),
        description: "".to_owned(),
        template_id: TEMPLATE_CLONE.to_owned(),
        cpus: 2,
        memory: ByteSize(2 * GIB),
        boot_disk: BootDiskSpec {
            storage_repository_id: SR_LOCAL.to_owned(),
            size: ByteSize(10 * GIB),
        },
        installation: None,
        attached_disks: vec![],
        network_interfaces: vec![NetworkRef {
            network_id: NET_A.to_owned(),
        }],
        desired_status: None,
        allow_stopping_for_update: false,
    }
}
