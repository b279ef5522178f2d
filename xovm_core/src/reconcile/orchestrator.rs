use super::{
    ensure_same_pool, final_transition, plan_disks, plan_networks, precondition, GateDecision,
    Plan, PowerGate, PowerTransition, Reconciler, Step,
};
use crate::repository::{get_by_id, Repository, VdiUpdate, VmUpdate};
use crate::state::{
    ByteSize, DiskRef, NetworkRef, ObservedBootDisk, ObservedDisk, ObservedNic, ObservedVm,
    VmSpec,
};
use crate::xo::{Network, PowerState, Vdi, VirtualMachine};

use serde::Serialize;

// Error Handling
use log::{debug, info, warn};
use xovm_error::{RepositoryError, XovmError};

/// Boot disks only grow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootResize {
    pub disk_id: String,
    pub from: ByteSize,
    pub to: ByteSize,
}

/// Everything an update would do, computed without mutating anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatePlan {
    pub vm_id: String,
    pub vm_update: VmUpdate,
    pub boot_resize: Option<BootResize>,
    pub disks: Plan<DiskRef>,
    pub networks: Plan<NetworkRef>,
    pub gate: GateDecision,
}

impl UpdatePlan {
    /// Changes that can't be applied live without pv drivers.
    pub fn change_pending(&self) -> bool {
        self.boot_resize.is_some() || !self.disks.is_empty() || !self.networks.is_empty()
    }
    pub fn is_empty(&self) -> bool {
        !self.change_pending() && self.vm_update.is_empty()
    }
}

impl<'a, R: Repository + ?Sized> Reconciler<'a, R> {
    /*
     * Observed state of a vm.
     * A vanished vm is reported as gone (None), not as an error.
     */
    pub async fn read(&self, id: &str) -> Result<Option<ObservedVm>, XovmError> {
        match self.read_vm(id, Step::ReadCurrent).await? {
            Some(vm) => Ok(Some(self.observe(&vm).await?)),
            None => Ok(None),
        }
    }

    /// Compute the update plan of a vm, dry run.
    pub async fn plan_update(
        &self,
        id: &str,
        previous: Option<&VmSpec>,
        desired: &VmSpec,
    ) -> Result<Option<UpdatePlan>, XovmError> {
        match self.read_vm(id, Step::ReadCurrent).await? {
            Some(vm) => {
                let (plan, _) = self.plan_for(&vm, previous, desired).await?;
                Ok(Some(plan))
            }
            None => Ok(None),
        }
    }

    /*
     * Converge a vm towards the desired state.
     *
     * `previous` is the desired state of the last successful run,
     * used to reject changes to immutable attributes.
     * Returns None when the vm vanished.
     */
    pub async fn update(
        &self,
        id: &str,
        previous: Option<&VmSpec>,
        desired: &VmSpec,
    ) -> Result<Option<ObservedVm>, XovmError> {
        info!("[start] updating vm {}", id);
        let vm = match self.read_vm(id, Step::ReadCurrent).await? {
            Some(vm) => vm,
            None => return Ok(None),
        };
        let (plan, gate) = self.plan_for(&vm, previous, desired).await?;
        // Fail closed: nothing is issued when a stop is needed but not allowed.
        gate.check(&vm.id, plan.change_pending())?;

        if plan.is_empty() && desired.desired_status.is_none() {
            debug!("vm {} already converged", vm.id);
        }
        self.apply(&vm, &plan, desired).await?;

        let res = match self.read_vm(id, Step::ReadFinal).await? {
            Some(vm) => Some(self.observe(&vm).await?),
            None => None,
        };
        info!("[end] updated vm {}", id);
        Ok(res)
    }

    /*
     * Stop the vm if needed, drop every non boot disk attachment,
     * then remove the vm along with its boot disk.
     */
    pub async fn delete(&self, id: &str) -> Result<(), XovmError> {
        info!("[start] deleting vm {}", id);
        let vm = match self.read_vm(id, Step::ReadCurrent).await? {
            Some(vm) => vm,
            None => return Ok(()),
        };
        if !vm.power_state.is_halted() {
            let force = !vm.pv_drivers_detected;
            self.call(Step::StopVm, &vm.id, self.repo.stop_vm(&vm.id, force))
                .await?;
        }
        self.checkpoint(Step::ReadCurrent)?;
        let vbds = vm.get_attached_vbds(self.repo).await?;
        for vbd in &vbds {
            self.call(Step::DeleteDiskAttachment, &vbd.id, self.repo.delete_vbd(&vbd.id))
                .await?;
        }
        self.call(Step::DeleteVm, &vm.id, self.repo.delete_vm(&vm.id))
            .await?;
        info!("[end] deleted vm {}", id);
        Ok(())
    }

    pub(super) async fn read_vm(
        &self,
        id: &str,
        step: Step,
    ) -> Result<Option<VirtualMachine>, XovmError> {
        self.checkpoint(step)?;
        match get_by_id::<VirtualMachine, R>(self.repo, id).await {
            Ok(vm) => Ok(Some(vm)),
            Err(RepositoryError::NotFound { .. }) => {
                warn!("vm {} is gone", id);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /*
     * Attachments are referenced newest first remotely,
     * they are reported in attachment order.
     */
    pub(super) async fn observe(&self, vm: &VirtualMachine) -> Result<ObservedVm, XovmError> {
        let boot_disk = vm
            .get_boot_disk(self.repo)
            .await?
            .map(|vdi| ObservedBootDisk {
                disk_id: vdi.id,
                storage_repository_id: vdi.sr,
                size: ByteSize(vdi.size),
            });
        let attached_disks = vm
            .get_attached_vbds(self.repo)
            .await?
            .iter()
            .rev()
            .map(|e| ObservedDisk {
                disk_id: e.vdi.clone().unwrap_or_default(),
                device: e.device.clone(),
                position: e.position.clone(),
            })
            .collect();
        let network_interfaces = vm
            .get_vifs(self.repo)
            .await?
            .into_iter()
            .rev()
            .map(|e| ObservedNic {
                attached: e.attached,
                device: e.device,
                network_id: e.network,
                mac_address: e.mac,
            })
            .collect();

        Ok(ObservedVm {
            id: vm.id.clone(),
            name: vm.name.clone(),
            description: vm.description.clone(),
            cpus: vm.cpus.number,
            memory: ByteSize(vm.memory.size),
            power_state: vm.power_state.clone(),
            pv_drivers_detected: vm.pv_drivers_detected,
            pool: vm.pool.clone(),
            boot_disk,
            attached_disks,
            network_interfaces,
        })
    }

    /*
     * Validate the desired state against the live vm and plan the changes.
     * Only reads are issued.
     */
    async fn plan_for(
        &self,
        vm: &VirtualMachine,
        previous: Option<&VmSpec>,
        desired: &VmSpec,
    ) -> Result<(UpdatePlan, PowerGate), XovmError> {
        desired.validate()?;
        if let Some(previous) = previous {
            ensure_immutables(previous, desired)?;
        }

        self.checkpoint(Step::ReadCurrent)?;
        let vbds = vm.get_vbds(self.repo).await?;
        let vifs = vm.get_vifs(self.repo).await?;

        let boot_resize = match vm.get_boot_disk(self.repo).await? {
            Some(vdi) => {
                let to = desired.boot_disk.size;
                if to.bytes() < vdi.size {
                    let message = format!(
                        "boot disk can't shrink from {} to {}",
                        ByteSize(vdi.size),
                        to
                    );
                    return Err(precondition(
                        &message,
                        "Disks can only grow, replace the vm to get a smaller boot disk.",
                    ));
                }
                (to.bytes() > vdi.size).then(|| BootResize {
                    disk_id: vdi.id,
                    from: ByteSize(vdi.size),
                    to,
                })
            }
            None => {
                warn!("vm {} has no boot disk, skipping resize", vm.id);
                None
            }
        };

        for disk in &desired.attached_disks {
            let vdi: Vdi = self.resolve(&disk.disk_id).await?;
            ensure_same_pool("disk", &vdi.id, &vdi.pool, &vm.pool)?;
        }
        for net in &desired.network_interfaces {
            let network: Network = self.resolve(&net.network_id).await?;
            ensure_same_pool("network", &network.id, &network.pool, &vm.pool)?;
        }

        let vm_update = VmUpdate {
            name: (desired.name != vm.name).then(|| desired.name.clone()),
            description: (desired.description != vm.description)
                .then(|| desired.description.clone()),
        };
        let mut plan = UpdatePlan {
            vm_id: vm.id.clone(),
            vm_update,
            boot_resize,
            disks: plan_disks(&vbds, &desired.attached_disks),
            networks: plan_networks(&vifs, &desired.network_interfaces),
            gate: GateDecision::Proceed,
        };
        let gate = PowerGate {
            power_state: vm.power_state.clone(),
            pv_drivers: vm.pv_drivers_detected,
            allow_stopping: desired.allow_stopping_for_update,
        };
        plan.gate = gate.decide(plan.change_pending());
        debug!("{:#?}", plan);
        Ok((plan, gate))
    }

    async fn apply(
        &self,
        vm: &VirtualMachine,
        plan: &UpdatePlan,
        desired: &VmSpec,
    ) -> Result<(), XovmError> {
        let id = vm.id.as_str();
        if !plan.vm_update.is_empty() {
            self.call(Step::UpdateVm, id, self.repo.update_vm(id, &plan.vm_update))
                .await?;
        }

        let mut stopped = false;
        if let GateDecision::PowerOff { force } = plan.gate {
            info!("stopping vm {} to apply changes", id);
            self.call(Step::PowerOff, id, self.repo.stop_vm(id, force))
                .await?;
            stopped = true;
        }
        let running = vm.power_state.is_running() && !stopped;

        if let Some(resize) = &plan.boot_resize {
            info!("growing boot disk {} to {}", resize.disk_id, resize.to);
            let update = VdiUpdate {
                size: Some(resize.to.bytes()),
                ..Default::default()
            };
            self.call(
                Step::ResizeBootDisk,
                &resize.disk_id,
                self.repo.update_vdi(&resize.disk_id, &update),
            )
            .await?;
        }

        // Freed slots get reused: every removal completes before the first attach.
        for vbd in &plan.disks.detach_delete {
            if running && vbd.attached {
                self.call(Step::DisconnectDisk, &vbd.id, self.repo.disconnect_vbd(&vbd.id))
                    .await?;
            }
            self.call(Step::DeleteDiskAttachment, &vbd.id, self.repo.delete_vbd(&vbd.id))
                .await?;
        }
        for disk in &plan.disks.attach {
            self.call(Step::AttachDisk, id, self.repo.attach_disk(id, &disk.disk_id))
                .await?;
        }

        for vif in &plan.networks.detach_delete {
            if running && vif.attached {
                self.call(Step::DisconnectNetwork, &vif.id, self.repo.disconnect_vif(&vif.id))
                    .await?;
            }
            self.call(Step::DeleteNetworkAttachment, &vif.id, self.repo.delete_vif(&vif.id))
                .await?;
        }
        for net in &plan.networks.attach {
            self.call(Step::AttachNetwork, id, self.repo.attach_network(id, &net.network_id))
                .await?;
        }

        let effective = match stopped {
            true => PowerState::Halted,
            false => vm.power_state.clone(),
        };
        match final_transition(stopped, &effective, desired.desired_status) {
            Some(PowerTransition::Start) => {
                self.call(Step::StartVm, id, self.repo.start_vm(id)).await?;
            }
            Some(PowerTransition::Stop) => {
                let force = !vm.pv_drivers_detected;
                self.call(Step::StopVm, id, self.repo.stop_vm(id, force))
                    .await?;
            }
            None => {}
        }
        Ok(())
    }
}

/*
 * Attributes fixed at creation.
 * Changing them means replacing the vm.
 */
fn ensure_immutables(previous: &VmSpec, desired: &VmSpec) -> Result<(), XovmError> {
    let changes = [
        ("template", previous.template_id != desired.template_id),
        ("cpus", previous.cpus != desired.cpus),
        ("memory", previous.memory != desired.memory),
        (
            "boot disk storage repository",
            previous.boot_disk.storage_repository_id != desired.boot_disk.storage_repository_id,
        ),
    ];
    for (field, changed) in changes {
        if changed {
            let message = format!("{field} can't be changed on an existing vm");
            return Err(precondition(&message, "Delete and recreate the vm instead."));
        }
    }
    Ok(())
}
