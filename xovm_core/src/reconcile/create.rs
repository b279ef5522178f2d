/*
* Vm creation.
*
* The template disk topology decides the path:
* - no disk: the os gets installed, from the network or from a media,
* - one disk: the template disk is cloned as the boot disk,
* - more: not supported.
* Every precondition is checked before the vm is created.
*/
use super::{ensure_same_pool, precondition, Reconciler, Step};
use crate::repository::{NewVm, Repository, VmDisk, VmInstallation, VmVif};
use crate::state::{ByteSize, InstallMethod, ObservedVm, VmSpec};
use crate::xo::{
    DesiredPowerState, Network, StorageRepository, Template, Vdi, BOOT_POSITION,
};

use std::collections::BTreeMap;

// Error Handling
use log::{debug, info};
use miette::Report;
use xovm_error::{IncompleteCreation, LibError, XovmError};

const BOOT_DISK_NAME: &str = "boot";

impl<'a, R: Repository + ?Sized> Reconciler<'a, R> {
    /*
     * Validate the desired state and build the creation call, dry run.
     */
    pub async fn plan_create(&self, desired: &VmSpec) -> Result<NewVm, XovmError> {
        desired.validate()?;
        match desired.desired_status {
            None | Some(DesiredPowerState::Running) => {}
            Some(status) => {
                let message = format!("a vm can't be created in the {status} state");
                return Err(precondition(
                    &message,
                    "Leave desired_status unset or set it to Running.",
                ));
            }
        }

        let template: Template = self.resolve(&desired.template_id).await?;

        let sr: StorageRepository = self
            .resolve(&desired.boot_disk.storage_repository_id)
            .await?;
        ensure_same_pool("storage repository", &sr.id, &sr.pool, &template.pool)?;
        if sr.is_optical() {
            let message = format!("storage repository {} holds iso images", sr.id);
            return Err(precondition(
                &message,
                "Boot disks must live on a regular storage repository.",
            ));
        }

        self.checkpoint(Step::ValidatePreconditions)?;
        let template_vbds = template.get_vbds(self.repo, false).await?;
        let boot = VmDisk {
            name_label: BOOT_DISK_NAME.to_owned(),
            name_description: None,
            sr: sr.id.clone(),
            size: desired.boot_disk.size.bytes(),
            _type: None,
        };
        let (installation, vdis, existing_disks) = match template_vbds.as_slice() {
            [] => {
                let installation = self.plan_installation(desired, &template).await?;
                let disk = VmDisk {
                    _type: Some("user".to_owned()),
                    ..boot
                };
                (Some(installation), Some(vec![disk]), None)
            }
            [vbd] => {
                if desired.installation.is_some() {
                    let message = format!(
                        "template {} already has a disk, it can't be installed",
                        template.id
                    );
                    return Err(precondition(&message, "Remove the installation section."));
                }
                let source: Vdi = match vbd.get_vdi(self.repo).await? {
                    Some(vdi) => vdi,
                    None => {
                        let message = format!(
                            "template {} disk attachment {} has no disk",
                            template.id, vbd.id
                        );
                        return Err(precondition(&message, "Repair or replace the template."));
                    }
                };
                if desired.boot_disk.size.bytes() < source.size {
                    let message = format!(
                        "boot disk shrink not allowed: template disk is {}, {} requested",
                        ByteSize(source.size),
                        desired.boot_disk.size
                    );
                    return Err(precondition(
                        &message,
                        "Request a boot disk at least as large as the template disk.",
                    ));
                }
                let existing = BTreeMap::from([(BOOT_POSITION.to_owned(), boot)]);
                (None, None, Some(existing))
            }
            vbds => {
                let message = format!(
                    "unsupported template topology: template {} has {} disks",
                    template.id,
                    vbds.len()
                );
                return Err(precondition(
                    &message,
                    "Use a template with a single disk, or none and an installation.",
                ));
            }
        };

        let mut vifs = vec![];
        for net in &desired.network_interfaces {
            let network: Network = self.resolve(&net.network_id).await?;
            ensure_same_pool("network", &network.id, &network.pool, &template.pool)?;
            vifs.push(VmVif {
                network: network.id,
            });
        }
        for disk in &desired.attached_disks {
            let vdi: Vdi = self.resolve(&disk.disk_id).await?;
            ensure_same_pool("disk", &vdi.id, &vdi.pool, &template.pool)?;
        }

        let params = NewVm {
            name_label: desired.name.clone(),
            name_description: desired.description.clone(),
            template: template.id,
            cpus: desired.cpus,
            memory: desired.memory.bytes(),
            vifs,
            installation,
            vdis,
            existing_disks,
            boot_after_create: false,
        };
        debug!("{:#?}", params);
        Ok(params)
    }

    /*
     * Create the vm, attach the additional disks and start it.
     *
     * Once the vm exists every failure is reported as an incomplete creation
     * carrying the new identity, so that an update can finish the work.
     */
    pub async fn create(&self, desired: &VmSpec) -> Result<ObservedVm, XovmError> {
        info!("[start] creating vm {}", desired.name);
        let params = self.plan_create(desired).await?;
        let vm_id = self
            .call(Step::CreateVm, &desired.name, self.repo.create_vm(&params))
            .await?;
        info!("created vm {} as {}", desired.name, vm_id);

        match self.provision(&vm_id, desired).await {
            Ok(vm) => {
                info!("[end] created vm {}", vm_id);
                Ok(vm)
            }
            Err(e) => Err(IncompleteCreation {
                vm_id,
                origin: Report::new(e),
            }
            .into()),
        }
    }

    async fn provision(&self, vm_id: &str, desired: &VmSpec) -> Result<ObservedVm, XovmError> {
        for disk in &desired.attached_disks {
            self.call(Step::AttachDisk, vm_id, self.repo.attach_disk(vm_id, &disk.disk_id))
                .await?;
        }
        self.call(Step::StartVm, vm_id, self.repo.start_vm(vm_id))
            .await?;
        match self.read_vm(vm_id, Step::ReadFinal).await? {
            Some(vm) => self.observe(&vm).await,
            None => Err(LibError::builder()
                .msg(&format!("vm {vm_id} vanished right after its creation"))
                .help("Something else deleted it, check the remote inventory.")
                .build()
                .into()),
        }
    }

    /*
     * Installation of a diskless template.
     * Media comes from an iso storage repository of the template pool.
     */
    async fn plan_installation(
        &self,
        desired: &VmSpec,
        template: &Template,
    ) -> Result<VmInstallation, XovmError> {
        let installation = match &desired.installation {
            Some(v) => v,
            None => {
                let message = format!(
                    "template {} has no disk, an installation is required",
                    template.id
                );
                return Err(precondition(
                    &message,
                    "Add an installation section with method = \"network\" or \"media\".",
                ));
            }
        };
        installation.validate()?;

        let repository = match (&installation.method, &installation.disk_id) {
            (InstallMethod::Media, Some(disk_id)) => {
                let media: Vdi = self.resolve(disk_id).await?;
                ensure_same_pool("installation media", &media.id, &media.pool, &template.pool)?;
                let sr: StorageRepository = self.resolve(&media.sr).await?;
                if !sr.is_optical() {
                    let message = format!(
                        "installation media {} is not on an iso storage repository",
                        media.id
                    );
                    return Err(precondition(&message, "Pick a disk from an iso library."));
                }
                Some(media.id)
            }
            _ => None,
        };
        Ok(VmInstallation {
            method: installation.method.remote_name().to_owned(),
            repository,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::fixtures::{self, GIB};
    use crate::repository::{Method, MemoryRepository};
    use crate::state::{DiskRef, InstallationSpec};
    use crate::xo::PowerState;
    use miette::Result;
    use pretty_assertions::assert_eq;

    fn rejected(res: Result<NewVm, XovmError>, pattern: &str) -> Result<()> {
        match res {
            Err(XovmError::PreconditionViolation(e)) => {
                assert!(
                    e.message.contains(pattern),
                    "'{}' should contain '{}'",
                    e.message,
                    pattern
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
            Ok(_) => Err(miette::miette!("expected a precondition violation")),
        }
    }

    #[tokio::test]
    async fn clone_path() -> Result<()> {
        let repo = MemoryRepository::new(fixtures::inventory());
        let mut desired = fixtures::spec();
        desired.attached_disks = vec![DiskRef {
            disk_id: fixtures::DATA_DISK.to_owned(),
        }];

        let vm = Reconciler::new(&repo).create(&desired).await?;
        assert_eq!(
            repo.calls().iter().map(|e| e.method).collect::<Vec<_>>(),
            vec![Method::CreateVm, Method::AttachDisk, Method::StartVm]
        );
        assert_eq!(vm.power_state, PowerState::Running);
        assert_eq!(vm.boot_disk.map(|e| e.size), Some(ByteSize(10 * GIB)));
        assert_eq!(vm.attached_disks.len(), 1);
        assert_eq!(vm.network_interfaces.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn clone_path_never_shrinks() -> Result<()> {
        let repo = MemoryRepository::new(fixtures::inventory());
        let mut desired = fixtures::spec();
        desired.boot_disk.size = ByteSize(4 * GIB);
        rejected(
            Reconciler::new(&repo).plan_create(&desired).await,
            "shrink not allowed",
        )?;

        let mut desired = fixtures::spec();
        desired.installation = Some(InstallationSpec {
            method: InstallMethod::Network,
            disk_id: None,
        });
        rejected(
            Reconciler::new(&repo).plan_create(&desired).await,
            "can't be installed",
        )?;
        assert!(repo.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn clone_path_requires_a_template_disk() -> Result<()> {
        let mut inventory = fixtures::inventory();
        for vbd in inventory.vbd.iter_mut().filter(|e| e.vm == fixtures::TEMPLATE_CLONE) {
            vbd.vdi = None;
        }
        let repo = MemoryRepository::new(inventory);
        rejected(
            Reconciler::new(&repo).plan_create(&fixtures::spec()).await,
            "disk attachment vbd-tpl has no disk",
        )?;
        assert!(repo.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn install_path() -> Result<()> {
        let repo = MemoryRepository::new(fixtures::inventory());
        let reconciler = Reconciler::new(&repo);
        let mut desired = fixtures::spec();
        desired.template_id = fixtures::TEMPLATE_INSTALL.to_owned();

        rejected(reconciler.plan_create(&desired).await, "installation is required")?;

        desired.installation = Some(InstallationSpec {
            method: InstallMethod::Media,
            disk_id: Some(fixtures::DATA_DISK.to_owned()),
        });
        rejected(reconciler.plan_create(&desired).await, "not on an iso")?;

        desired.installation = Some(InstallationSpec {
            method: InstallMethod::Media,
            disk_id: Some(fixtures::INSTALL_MEDIA.to_owned()),
        });
        let params = reconciler.plan_create(&desired).await?;
        assert_eq!(
            params.installation,
            Some(VmInstallation {
                method: "cdrom".to_owned(),
                repository: Some(fixtures::INSTALL_MEDIA.to_owned()),
            })
        );
        assert_eq!(params.existing_disks, None);
        assert_eq!(params.vdis.map(|e| e.len()), Some(1));

        let vm = reconciler.create(&desired).await?;
        assert_eq!(
            vm.boot_disk.map(|e| e.storage_repository_id),
            Some(fixtures::SR_LOCAL.to_owned())
        );
        // The media sits in a cd drive, not among the attached disks.
        assert!(vm.attached_disks.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn unsupported_topology() -> Result<()> {
        let repo = MemoryRepository::new(fixtures::inventory());
        let mut desired = fixtures::spec();
        desired.template_id = fixtures::TEMPLATE_MULTI.to_owned();
        rejected(
            Reconciler::new(&repo).plan_create(&desired).await,
            "unsupported template topology",
        )?;
        Ok(())
    }

    #[tokio::test]
    async fn boot_target_and_pool_locality() -> Result<()> {
        let repo = MemoryRepository::new(fixtures::inventory());
        let reconciler = Reconciler::new(&repo);

        let mut desired = fixtures::spec();
        desired.boot_disk.storage_repository_id = fixtures::SR_ISO.to_owned();
        rejected(reconciler.plan_create(&desired).await, "holds iso images")?;

        let mut desired = fixtures::spec();
        desired.boot_disk.storage_repository_id = fixtures::FOREIGN_SR.to_owned();
        rejected(reconciler.plan_create(&desired).await, "expected pool")?;

        let mut desired = fixtures::spec();
        desired.attached_disks = vec![DiskRef {
            disk_id: fixtures::FOREIGN_DISK.to_owned(),
        }];
        rejected(reconciler.plan_create(&desired).await, "expected pool")?;

        let mut desired = fixtures::spec();
        desired.desired_status = Some(DesiredPowerState::Halted);
        rejected(reconciler.plan_create(&desired).await, "can't be created")?;

        assert!(repo.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn failure_after_creation_exposes_the_vm() -> Result<()> {
        let repo = MemoryRepository::new(fixtures::inventory());
        repo.fail_on(Method::StartVm, "NO_HOSTS_AVAILABLE");
        let reconciler = Reconciler::new(&repo);

        let err = reconciler.create(&fixtures::spec()).await.unwrap_err();
        let vm_id = err
            .created_vm_id()
            .ok_or_else(|| miette::miette!("creation should be incomplete"))?
            .to_owned();

        repo.clear_failures();
        let mut desired = fixtures::spec();
        desired.desired_status = Some(DesiredPowerState::Running);
        let vm = reconciler
            .update(&vm_id, None, &desired)
            .await?
            .ok_or_else(|| miette::miette!("vm should exist"))?;
        assert_eq!(vm.power_state, PowerState::Running);
        Ok(())
    }
}
