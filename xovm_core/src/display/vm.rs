use super::utils::*;
use crate::state::{ByteSize, ObservedBootDisk, ObservedDisk, ObservedNic, ObservedVm};
use crate::xo::PowerState;

use serde::{Deserialize, Serialize};
use tabled::{
    settings::{disable::Remove, location::ByColumnName, Style},
    Table, Tabled,
};

// Error Handling
use log::{log_enabled, Level};
use xovm_error::XovmError;

#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq, Tabled)]
pub struct VmTable {
    pub id: String,
    pub name: String,

    pub cpus: u64,
    pub memory: ByteSize,

    #[tabled(display("display_state"))]
    pub state: PowerState,
    pub pv_drivers: bool,

    #[tabled(display("display_boot_disk"))]
    pub boot_disk: Option<ObservedBootDisk>,
    #[tabled(display("display_disks"))]
    pub disks: Vec<ObservedDisk>,
    #[tabled(display("display_nics"))]
    pub nics: Vec<ObservedNic>,

    pub pool: String,
}

impl From<&ObservedVm> for VmTable {
    fn from(vm: &ObservedVm) -> Self {
        Self {
            id: vm.id.clone(),
            name: vm.name.clone(),
            cpus: vm.cpus,
            memory: vm.memory,
            state: vm.power_state.clone(),
            pv_drivers: vm.pv_drivers_detected,
            boot_disk: vm.boot_disk.clone(),
            disks: vm.attached_disks.clone(),
            nics: vm.network_interfaces.clone(),
            pool: vm.pool.clone(),
        }
    }
}

impl VmTable {
    pub fn display(items: Vec<Self>) -> Result<(), XovmError> {
        let mut res = Table::new(&items);

        if log_enabled!(Level::Debug) {
        } else if log_enabled!(Level::Info) {
            res.with(Remove::column(ByColumnName::new("pool")));
        } else {
            res.with(Remove::column(ByColumnName::new("pool")));
            res.with(Remove::column(ByColumnName::new("pv_drivers")));
            res.with(Remove::column(ByColumnName::new("boot_disk")));
        }
        res.with(Style::rounded());
        println!("{}", res);
        Ok(())
    }
}
