/*
* In-process repository over an inventory snapshot.
*
* Enforces the hypervisor rules the engine has to respect:
* - nothing is (un)plugged on a running vm without pv drivers,
* - a clean shutdown needs pv drivers,
* - a plugged device can't be destroyed,
* - disks only grow,
* - attachments are listed newest first.
*
* Every mutating call is recorded, and any method can be made to fail.
*/
use super::{Filter, Method, NewVdi, NewVm, ObjectKind, Repository, VdiUpdate, VmUpdate};
use crate::xo::{
    Network, Pool, PowerState, StorageRepository, Template, Vbd, Vdi, Vif, VirtualMachine,
    VmCpus, VmMemory, BOOT_POSITION,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

// Error Handling
use log::{debug, trace};
use xovm_error::{CastError, RepositoryError, TomlError, XovmError};

/// Position the installation media is plugged at.
const CD_POSITION: &str = "3";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub pool: Vec<Pool>,
    #[serde(default)]
    pub network: Vec<Network>,
    #[serde(default)]
    pub sr: Vec<StorageRepository>,
    #[serde(default)]
    pub template: Vec<Template>,
    #[serde(default)]
    pub vm: Vec<VirtualMachine>,
    #[serde(default)]
    pub vbd: Vec<Vbd>,
    #[serde(default)]
    pub vif: Vec<Vif>,
    #[serde(default)]
    pub vdi: Vec<Vdi>,
}

impl Inventory {
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
    pub fn to_file(&self, path: &str) -> Result<(), XovmError> {
        let string = toml::to_string(self)?;
        fs::write(path, string)?;
        Ok(())
    }

    fn values(&self, kind: ObjectKind) -> Result<Vec<Value>, serde_json::Error> {
        let values = match kind {
            ObjectKind::Pool => to_values(&self.pool)?,
            ObjectKind::Network => to_values(&self.network)?,
            ObjectKind::StorageRepository => to_values(&self.sr)?,
            ObjectKind::Template => to_values(&self.template)?,
            ObjectKind::Vm => to_values(&self.vm)?,
            ObjectKind::Vbd => to_values(&self.vbd)?,
            ObjectKind::Vif => to_values(&self.vif)?,
            ObjectKind::Vdi => to_values(&self.vdi)?,
        };
        Ok(values)
    }

    fn vm_mut(&mut self, method: Method, id: &str) -> Result<&mut VirtualMachine, RepositoryError> {
        self.vm
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| no_such(method, "VM", id))
    }
    fn vm_ref(&self, method: Method, id: &str) -> Result<&VirtualMachine, RepositoryError> {
        self.vm
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| no_such(method, "VM", id))
    }
    fn vdi_mut(&mut self, method: Method, id: &str) -> Result<&mut Vdi, RepositoryError> {
        self.vdi
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| no_such(method, "VDI", id))
    }
    fn sr_ref(&self, method: Method, id: &str) -> Result<&StorageRepository, RepositoryError> {
        self.sr
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| no_such(method, "SR", id))
    }

    /// Devices can only be (un)plugged live with pv drivers.
    fn ensure_hotplug(&self, method: Method, vm_id: &str) -> Result<bool, RepositoryError> {
        let vm = self.vm_ref(method, vm_id)?;
        let running = vm.power_state.is_running();
        if running && !vm.pv_drivers_detected {
            return Err(RepositoryError::remote(
                &method.to_string(),
                "VM_MISSING_PV_DRIVERS",
            ));
        }
        Ok(running)
    }

    fn new_vdi(&mut self, method: Method, name: &str, size: u64, sr: &str) -> Result<String, RepositoryError> {
        let pool = self.sr_ref(method, sr)?.pool.clone();
        let id = Uuid::new_v4().to_string();
        self.vdi.push(Vdi {
            id: id.clone(),
            name: name.to_owned(),
            description: "".to_owned(),
            size,
            sr: sr.to_owned(),
            pool,
        });
        Ok(id)
    }

    fn plug_vbd(&mut self, vm_id: &str, vdi: Option<String>, position: &str, is_cd_drive: bool, attached: bool) {
        let id = Uuid::new_v4().to_string();
        let device = match position.parse::<u8>() {
            Ok(n) if n < 26 => Some(format!("xvd{}", (b'a' + n) as char)),
            _ => None,
        };
        self.vbd.push(Vbd {
            id: id.clone(),
            bootable: position == BOOT_POSITION,
            device,
            is_cd_drive,
            position: position.to_owned(),
            vdi,
            vm: vm_id.to_owned(),
            attached,
        });
        if let Some(vm) = self.vm.iter_mut().find(|e| e.id == vm_id) {
            vm.vbds.insert(0, id);
        }
    }

    fn plug_vif(&mut self, vm_id: &str, network: &str, attached: bool) {
        let used: BTreeSet<u32> = self
            .vif
            .iter()
            .filter(|e| e.vm == vm_id)
            .filter_map(|e| e.device.parse().ok())
            .collect();
        let device = (0..).find(|n| !used.contains(n)).unwrap_or_default();
        let uuid = Uuid::new_v4();
        let bytes = uuid.as_bytes();
        let id = uuid.to_string();
        self.vif.push(Vif {
            id: id.clone(),
            device: device.to_string(),
            mac: format!("02:16:3e:{:02x}:{:02x}:{:02x}", bytes[0], bytes[1], bytes[2]),
            attached,
            network: network.to_owned(),
            vm: vm_id.to_owned(),
        });
        if let Some(vm) = self.vm.iter_mut().find(|e| e.id == vm_id) {
            vm.vifs.insert(0, id);
        }
    }

    fn set_devices_attached(&mut self, vm_id: &str, attached: bool) {
        for vbd in self.vbd.iter_mut().filter(|e| e.vm == vm_id) {
            vbd.attached = attached;
        }
        for vif in self.vif.iter_mut().filter(|e| e.vm == vm_id) {
            vif.attached = attached;
        }
    }
}

fn to_values<T: Serialize>(items: &[T]) -> Result<Vec<Value>, serde_json::Error> {
    items.iter().map(serde_json::to_value).collect()
}

fn no_such(method: Method, kind: &str, id: &str) -> RepositoryError {
    RepositoryError::remote(&method.to_string(), &format!("no such {kind} {id}"))
}

/// A mutating call as issued against the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteCall {
    pub method: Method,
    pub target: String,
}

#[derive(Debug, Default)]
pub struct MemoryRepository {
    inventory: Mutex<Inventory>,
    calls: Mutex<Vec<RemoteCall>>,
    failures: Mutex<HashMap<Method, String>>,
}

impl MemoryRepository {
    pub fn new(inventory: Inventory) -> Self {
        Self {
            inventory: Mutex::new(inventory),
            ..Default::default()
        }
    }
    /// A copy of the current inventory.
    pub fn snapshot(&self) -> Result<Inventory, RepositoryError> {
        Ok(self.state()?.clone())
    }
    /// Every mutating call issued so far, failed ones included.
    pub fn calls(&self) -> Vec<RemoteCall> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
    /// Make every later call of this method fail with the given detail.
    pub fn fail_on(&self, method: Method, detail: &str) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(method, detail.to_owned());
        }
    }
    pub fn clear_failures(&self) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.clear();
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, Inventory>, RepositoryError> {
        self.inventory
            .lock()
            .map_err(|_| RepositoryError::remote("inventory", "inventory lock poisoned"))
    }
    /*
     * Record the call, then fail it if a failure was injected for this method.
     */
    fn record(&self, method: Method, target: &str) -> Result<(), RepositoryError> {
        debug!("{} {}", method, target);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RemoteCall {
                method,
                target: target.to_owned(),
            });
        }
        let failures = self
            .failures
            .lock()
            .map_err(|_| RepositoryError::remote(&method.to_string(), "failure table poisoned"))?;
        match failures.get(&method) {
            Some(detail) => Err(RepositoryError::remote(&method.to_string(), detail)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn get_objects(
        &self,
        kind: ObjectKind,
        filter: &Filter,
    ) -> Result<Vec<Value>, RepositoryError> {
        let inventory = self.state()?;
        let values = inventory
            .values(kind)
            .map_err(|e| RepositoryError::Decode {
                kind: kind.to_string(),
                detail: e.to_string(),
            })?;
        let res: Vec<Value> = values.into_iter().filter(|e| filter.matches(e)).collect();
        trace!("{} {} matched {} objects", kind, filter, res.len());
        Ok(res)
    }

    async fn create_vdi(&self, params: &NewVdi) -> Result<String, RepositoryError> {
        self.record(Method::CreateVdi, &params.name)?;
        let mut inventory = self.state()?;
        inventory.new_vdi(Method::CreateVdi, &params.name, params.size, &params.sr)
    }
    async fn update_vdi(&self, id: &str, update: &VdiUpdate) -> Result<(), RepositoryError> {
        self.record(Method::UpdateVdi, id)?;
        let mut inventory = self.state()?;
        let vdi = inventory.vdi_mut(Method::UpdateVdi, id)?;
        if let Some(size) = update.size {
            if size < vdi.size {
                return Err(RepositoryError::remote(
                    &Method::UpdateVdi.to_string(),
                    "VDI_SIZE_SHRINK: disks can only grow",
                ));
            }
            vdi.size = size;
        }
        if let Some(name) = &update.name {
            vdi.name = name.to_owned();
        }
        if let Some(description) = &update.description {
            vdi.description = description.to_owned();
        }
        Ok(())
    }
    async fn delete_vdi(&self, id: &str) -> Result<(), RepositoryError> {
        self.record(Method::DeleteVdi, id)?;
        let mut inventory = self.state()?;
        inventory.vdi_mut(Method::DeleteVdi, id)?;
        if inventory.vbd.iter().any(|e| e.vdi.as_deref() == Some(id)) {
            return Err(RepositoryError::remote(
                &Method::DeleteVdi.to_string(),
                "VDI_IN_USE",
            ));
        }
        inventory.vdi.retain(|e| e.id != id);
        Ok(())
    }

    async fn attach_disk(&self, vm_id: &str, vdi_id: &str) -> Result<(), RepositoryError> {
        self.record(Method::AttachDisk, vm_id)?;
        let mut inventory = self.state()?;
        inventory.vdi_mut(Method::AttachDisk, vdi_id)?;
        let running = inventory.ensure_hotplug(Method::AttachDisk, vm_id)?;
        let used: BTreeSet<u32> = inventory
            .vbd
            .iter()
            .filter(|e| e.vm == vm_id)
            .filter_map(|e| e.position.parse().ok())
            .collect();
        let position = (1..).find(|n| !used.contains(n)).unwrap_or_default();
        inventory.plug_vbd(
            vm_id,
            Some(vdi_id.to_owned()),
            &position.to_string(),
            false,
            running,
        );
        Ok(())
    }
    async fn disconnect_vbd(&self, id: &str) -> Result<(), RepositoryError> {
        self.record(Method::DisconnectVbd, id)?;
        let mut inventory = self.state()?;
        let vm_id = match inventory.vbd.iter().find(|e| e.id == id) {
            Some(vbd) => vbd.vm.clone(),
            None => return Err(no_such(Method::DisconnectVbd, "VBD", id)),
        };
        inventory.ensure_hotplug(Method::DisconnectVbd, &vm_id)?;
        if let Some(vbd) = inventory.vbd.iter_mut().find(|e| e.id == id) {
            vbd.attached = false;
        }
        Ok(())
    }
    async fn delete_vbd(&self, id: &str) -> Result<(), RepositoryError> {
        self.record(Method::DeleteVbd, id)?;
        let mut inventory = self.state()?;
        let vbd = match inventory.vbd.iter().find(|e| e.id == id) {
            Some(vbd) => vbd.clone(),
            None => return Err(no_such(Method::DeleteVbd, "VBD", id)),
        };
        let running = inventory
            .vm_ref(Method::DeleteVbd, &vbd.vm)
            .map(|e| e.power_state.is_running())
            .unwrap_or(false);
        if running && vbd.attached {
            return Err(RepositoryError::remote(
                &Method::DeleteVbd.to_string(),
                "DEVICE_ALREADY_ATTACHED",
            ));
        }
        inventory.vbd.retain(|e| e.id != id);
        if let Some(vm) = inventory.vm.iter_mut().find(|e| e.id == vbd.vm) {
            vm.vbds.retain(|e| e != id);
        }
        Ok(())
    }

    async fn attach_network(&self, vm_id: &str, network_id: &str) -> Result<(), RepositoryError> {
        self.record(Method::AttachNetwork, vm_id)?;
        let mut inventory = self.state()?;
        if !inventory.network.iter().any(|e| e.id == network_id) {
            return Err(no_such(Method::AttachNetwork, "network", network_id));
        }
        let running = inventory.ensure_hotplug(Method::AttachNetwork, vm_id)?;
        inventory.plug_vif(vm_id, network_id, running);
        Ok(())
    }
    async fn disconnect_vif(&self, id: &str) -> Result<(), RepositoryError> {
        self.record(Method::DisconnectVif, id)?;
        let mut inventory = self.state()?;
        let vm_id = match inventory.vif.iter().find(|e| e.id == id) {
            Some(vif) => vif.vm.clone(),
            None => return Err(no_such(Method::DisconnectVif, "VIF", id)),
        };
        inventory.ensure_hotplug(Method::DisconnectVif, &vm_id)?;
        if let Some(vif) = inventory.vif.iter_mut().find(|e| e.id == id) {
            vif.attached = false;
        }
        Ok(())
    }
    async fn delete_vif(&self, id: &str) -> Result<(), RepositoryError> {
        self.record(Method::DeleteVif, id)?;
        let mut inventory = self.state()?;
        let vif = match inventory.vif.iter().find(|e| e.id == id) {
            Some(vif) => vif.clone(),
            None => return Err(no_such(Method::DeleteVif, "VIF", id)),
        };
        let running = inventory
            .vm_ref(Method::DeleteVif, &vif.vm)
            .map(|e| e.power_state.is_running())
            .unwrap_or(false);
        if running && vif.attached {
            return Err(RepositoryError::remote(
                &Method::DeleteVif.to_string(),
                "DEVICE_ALREADY_ATTACHED",
            ));
        }
        inventory.vif.retain(|e| e.id != id);
        if let Some(vm) = inventory.vm.iter_mut().find(|e| e.id == vif.vm) {
            vm.vifs.retain(|e| e != id);
        }
        Ok(())
    }

    async fn create_vm(&self, params: &NewVm) -> Result<String, RepositoryError> {
        self.record(Method::CreateVm, &params.name_label)?;
        let method = Method::CreateVm;
        let mut inventory = self.state()?;

        let template = match inventory.template.iter().find(|e| e.id == params.template) {
            Some(template) => template.clone(),
            None => return Err(no_such(method, "template", &params.template)),
        };
        for vif in &params.vifs {
            if !inventory.network.iter().any(|e| e.id == vif.network) {
                return Err(no_such(method, "network", &vif.network));
            }
        }

        let id = Uuid::new_v4().to_string();
        inventory.vm.push(VirtualMachine {
            id: id.clone(),
            name: params.name_label.clone(),
            description: params.name_description.clone(),
            cpus: VmCpus {
                max: params.cpus,
                number: params.cpus,
            },
            memory: VmMemory {
                size: params.memory,
            },
            power_state: PowerState::Halted,
            pv_drivers_detected: false,
            vbds: vec![],
            vifs: vec![],
            pool: template.pool.clone(),
        });

        // Clone path: copy the template disk at each requested position.
        if let Some(existing) = &params.existing_disks {
            for (position, disk) in existing {
                let source = inventory
                    .vbd
                    .iter()
                    .filter(|e| template.vbds.contains(&e.id))
                    .find(|e| !e.is_cd_drive && &e.position == position)
                    .and_then(|e| e.vdi.clone())
                    .and_then(|vdi| inventory.vdi.iter().find(|e| e.id == vdi).cloned());
                let source = match source {
                    Some(source) => source,
                    None => {
                        inventory.vm.retain(|e| e.id != id);
                        return Err(RepositoryError::remote(
                            &method.to_string(),
                            &format!("template has no disk at position {position}"),
                        ));
                    }
                };
                let size = disk.size.max(source.size);
                let vdi = inventory.new_vdi(method, &disk.name_label, size, &disk.sr)?;
                inventory.plug_vbd(&id, Some(vdi), position, false, false);
            }
        }
        // Install path: fresh disks, the first one boots.
        if let Some(vdis) = &params.vdis {
            for (position, disk) in vdis.iter().enumerate() {
                let vdi = inventory.new_vdi(method, &disk.name_label, disk.size, &disk.sr)?;
                inventory.plug_vbd(&id, Some(vdi), &position.to_string(), false, false);
            }
        }
        if let Some(installation) = &params.installation {
            if let Some(media) = &installation.repository {
                inventory.plug_vbd(&id, Some(media.to_owned()), CD_POSITION, true, false);
            }
        }
        for vif in &params.vifs {
            inventory.plug_vif(&id, &vif.network, false);
        }
        Ok(id)
    }
    async fn update_vm(&self, id: &str, update: &VmUpdate) -> Result<(), RepositoryError> {
        self.record(Method::UpdateVm, id)?;
        let mut inventory = self.state()?;
        let vm = inventory.vm_mut(Method::UpdateVm, id)?;
        if let Some(name) = &update.name {
            vm.name = name.to_owned();
        }
        if let Some(description) = &update.description {
            vm.description = description.to_owned();
        }
        Ok(())
    }
    /*
     * Remove the vm with its remaining attachments.
     * Only the boot disk is destroyed along.
     */
    async fn delete_vm(&self, id: &str) -> Result<(), RepositoryError> {
        self.record(Method::DeleteVm, id)?;
        let mut inventory = self.state()?;
        let vm = inventory.vm_ref(Method::DeleteVm, id)?;
        if !vm.power_state.is_halted() {
            return Err(RepositoryError::remote(
                &Method::DeleteVm.to_string(),
                "VM_BAD_POWER_STATE: vm must be halted",
            ));
        }
        let boot_vdi = inventory
            .vbd
            .iter()
            .find(|e| e.vm == id && e.is_boot())
            .and_then(|e| e.vdi.clone());
        inventory.vbd.retain(|e| e.vm != id);
        inventory.vif.retain(|e| e.vm != id);
        if let Some(vdi) = boot_vdi {
            inventory.vdi.retain(|e| e.id != vdi);
        }
        inventory.vm.retain(|e| e.id != id);
        Ok(())
    }
    async fn start_vm(&self, id: &str) -> Result<(), RepositoryError> {
        self.record(Method::StartVm, id)?;
        let mut inventory = self.state()?;
        let vm = inventory.vm_mut(Method::StartVm, id)?;
        if !vm.power_state.is_halted() {
            return Err(RepositoryError::remote(
                &Method::StartVm.to_string(),
                &format!("VM_BAD_POWER_STATE: vm is {}", vm.power_state),
            ));
        }
        vm.power_state = PowerState::Running;
        inventory.set_devices_attached(id, true);
        Ok(())
    }
    async fn stop_vm(&self, id: &str, force: bool) -> Result<(), RepositoryError> {
        self.record(Method::StopVm, id)?;
        let mut inventory = self.state()?;
        let vm = inventory.vm_mut(Method::StopVm, id)?;
        if !vm.power_state.is_running() {
            return Err(RepositoryError::remote(
                &Method::StopVm.to_string(),
                &format!("VM_BAD_POWER_STATE: vm is {}", vm.power_state),
            ));
        }
        if !force && !vm.pv_drivers_detected {
            return Err(RepositoryError::remote(
                &Method::StopVm.to_string(),
                "VM_MISSING_PV_DRIVERS: clean shutdown needs guest tools",
            ));
        }
        vm.power_state = PowerState::Halted;
        inventory.set_devices_attached(id, false);
        Ok(())
    }
}
