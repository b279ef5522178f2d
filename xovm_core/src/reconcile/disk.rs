/*
* Standalone disk lifecycle.
*/
use super::{precondition, Reconciler, Step};
use crate::repository::{get_by_id, NewVdi, Repository, VdiUpdate};
use crate::state::{ByteSize, DiskSpec, ObservedVdi};
use crate::xo::{StorageRepository, Vdi};

// Error Handling
use log::{info, warn};
use xovm_error::{LibError, RepositoryError, XovmError};

impl<'a, R: Repository + ?Sized> Reconciler<'a, R> {
    pub async fn create_disk(&self, desired: &DiskSpec) -> Result<ObservedVdi, XovmError> {
        info!("[start] creating disk {}", desired.name);
        let sr: StorageRepository = self.resolve(&desired.storage_repository_id).await?;
        let params = NewVdi {
            name: desired.name.clone(),
            mode: desired.mode,
            size: desired.size.bytes(),
            sr: sr.id,
        };
        let id = self
            .call(Step::CreateDisk, &desired.name, self.repo.create_vdi(&params))
            .await?;
        // disk.create takes no description.
        if !desired.description.is_empty() {
            let update = VdiUpdate {
                description: Some(desired.description.clone()),
                ..Default::default()
            };
            self.call(Step::UpdateDisk, &id, self.repo.update_vdi(&id, &update))
                .await?;
        }
        match self.read_disk(&id).await? {
            Some(vdi) => {
                info!("[end] created disk {}", id);
                Ok(vdi)
            }
            None => Err(LibError::builder()
                .msg(&format!("disk {id} vanished right after its creation"))
                .help("Something else deleted it, check the remote inventory.")
                .build()
                .into()),
        }
    }

    /// A vanished disk is reported as gone (None).
    pub async fn read_disk(&self, id: &str) -> Result<Option<ObservedVdi>, XovmError> {
        Ok(self.read_vdi(id).await?.map(ObservedVdi::from))
    }

    /*
     * Rename, describe or grow a disk.
     * Only the fields that differ are sent.
     */
    pub async fn update_disk(
        &self,
        id: &str,
        desired: &DiskSpec,
    ) -> Result<Option<ObservedVdi>, XovmError> {
        let vdi = match self.read_vdi(id).await? {
            Some(vdi) => vdi,
            None => return Ok(None),
        };
        if desired.storage_repository_id != vdi.sr {
            let message = format!(
                "disk {} can't move from storage repository {} to {}",
                id, vdi.sr, desired.storage_repository_id
            );
            return Err(precondition(&message, "Delete and recreate the disk instead."));
        }
        if desired.size.bytes() < vdi.size {
            let message = format!(
                "disk {} can't shrink from {} to {}",
                id,
                ByteSize(vdi.size),
                desired.size
            );
            return Err(precondition(&message, "Disks can only grow."));
        }

        let update = VdiUpdate {
            name: (desired.name != vdi.name).then(|| desired.name.clone()),
            description: (desired.description != vdi.description)
                .then(|| desired.description.clone()),
            size: (desired.size.bytes() > vdi.size).then(|| desired.size.bytes()),
        };
        if !update.is_empty() {
            self.call(Step::UpdateDisk, id, self.repo.update_vdi(id, &update))
                .await?;
        }
        self.read_disk(id).await
    }

    pub async fn delete_disk(&self, id: &str) -> Result<(), XovmError> {
        if self.read_vdi(id).await?.is_none() {
            return Ok(());
        }
        self.call(Step::DeleteDisk, id, self.repo.delete_vdi(id))
            .await?;
        info!("deleted disk {}", id);
        Ok(())
    }

    async fn read_vdi(&self, id: &str) -> Result<Option<Vdi>, XovmError> {
        self.checkpoint(Step::ReadCurrent)?;
        match get_by_id::<Vdi, R>(self.repo, id).await {
            Ok(vdi) => Ok(Some(vdi)),
            Err(RepositoryError::NotFound { .. }) => {
                warn!("disk {} is gone", id);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::fixtures::{self, GIB};
    use crate::repository::{Method, MemoryRepository};
    use crate::xo::DiskMode;
    use miette::Result;
    use pretty_assertions::assert_eq;

    fn spec() -> DiskSpec {
        DiskSpec {
            name: "data".to_owned(),
            description: "application data".to_owned(),
            storage_repository_id: fixtures::SR_LOCAL.to_owned(),
            size: ByteSize(GIB),
            mode: DiskMode::ReadWrite,
        }
    }

    #[tokio::test]
    async fn disk_lifecycle() -> Result<()> {
        let repo = MemoryRepository::new(fixtures::inventory());
        let reconciler = Reconciler::new(&repo);

        let disk = reconciler.create_disk(&spec()).await?;
        assert_eq!(disk.description, "application data");
        assert_eq!(disk.pool, fixtures::POOL);

        let mut desired = spec();
        desired.size = ByteSize(2 * GIB);
        let res = reconciler.update_disk(&disk.id, &desired).await?;
        assert_eq!(res.map(|e| e.size), Some(ByteSize(2 * GIB)));

        // Nothing changed, nothing sent.
        let count = repo.calls().len();
        reconciler.update_disk(&disk.id, &desired).await?;
        assert_eq!(repo.calls().len(), count);

        reconciler.delete_disk(&disk.id).await?;
        assert_eq!(reconciler.read_disk(&disk.id).await?, None);
        reconciler.delete_disk(&disk.id).await?;

        let methods: Vec<Method> = repo.calls().iter().map(|e| e.method).collect();
        assert_eq!(
            methods,
            vec![
                Method::CreateVdi,
                Method::UpdateVdi,
                Method::UpdateVdi,
                Method::DeleteVdi
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn disks_never_shrink_nor_move() -> Result<()> {
        let repo = MemoryRepository::new(fixtures::inventory());
        let reconciler = Reconciler::new(&repo);
        let current = DiskSpec {
            name: fixtures::DATA_DISK.to_owned(),
            description: "".to_owned(),
            storage_repository_id: fixtures::SR_LOCAL.to_owned(),
            size: ByteSize(5 * GIB),
            mode: DiskMode::ReadWrite,
        };

        let mut desired = current.clone();
        desired.size = ByteSize(GIB);
        let err = reconciler
            .update_disk(fixtures::DATA_DISK, &desired)
            .await
            .unwrap_err();
        assert!(matches!(err, XovmError::PreconditionViolation(_)));

        let mut desired = current.clone();
        desired.storage_repository_id = fixtures::SR_ISO.to_owned();
        let err = reconciler
            .update_disk(fixtures::DATA_DISK, &desired)
            .await
            .unwrap_err();
        assert!(matches!(err, XovmError::PreconditionViolation(_)));

        assert!(repo.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn unknown_storage_repository() -> Result<()> {
        let repo = MemoryRepository::new(fixtures::inventory());
        let mut desired = spec();
        desired.storage_repository_id = "sr-unknown".to_owned();
        let err = Reconciler::new(&repo)
            .create_disk(&desired)
            .await
            .unwrap_err();
        assert!(matches!(err, XovmError::PreconditionViolation(_)));
        Ok(())
    }
}
