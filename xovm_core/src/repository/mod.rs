/*
* Remote object repository.
*
* The seam between the reconciliation engine and the hypervisor management api.
* Every component receives a repository handle explicitly,
* there is no process wide client.
*
* Implementations must be safe to share between independent
* reconciliations running concurrently.
*/

mod filter;
mod memory;
mod params;

// Reexports
pub use filter::Filter;
pub use memory::{Inventory, MemoryRepository, RemoteCall};
pub use params::{NewVdi, NewVm, VdiUpdate, VmDisk, VmInstallation, VmUpdate, VmVif};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

// Error Handling
use log::trace;
use xovm_error::RepositoryError;

/// Remote object types, named as the remote api names them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum ObjectKind {
    #[strum(serialize = "VM")]
    Vm,
    #[strum(serialize = "VM-template")]
    Template,
    #[strum(serialize = "VBD")]
    Vbd,
    #[strum(serialize = "VIF")]
    Vif,
    #[strum(serialize = "VDI")]
    Vdi,
    #[strum(serialize = "SR")]
    StorageRepository,
    #[strum(serialize = "network")]
    Network,
    #[strum(serialize = "pool")]
    Pool,
}

/// A typed snapshot of a remote object.
pub trait XoObject: Serialize + DeserializeOwned + Clone + Send + Sync {
    const KIND: ObjectKind;
}

/// Mutating remote calls, as named on the remote api.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Method {
    #[strum(serialize = "disk.create")]
    CreateVdi,
    #[strum(serialize = "vdi.set")]
    UpdateVdi,
    #[strum(serialize = "vdi.delete")]
    DeleteVdi,
    #[strum(serialize = "vm.attachDisk")]
    AttachDisk,
    #[strum(serialize = "vbd.disconnect")]
    DisconnectVbd,
    #[strum(serialize = "vbd.delete")]
    DeleteVbd,
    #[strum(serialize = "vm.createInterface")]
    AttachNetwork,
    #[strum(serialize = "vif.disconnect")]
    DisconnectVif,
    #[strum(serialize = "vif.delete")]
    DeleteVif,
    #[strum(serialize = "vm.create")]
    CreateVm,
    #[strum(serialize = "vm.set")]
    UpdateVm,
    #[strum(serialize = "vm.delete")]
    DeleteVm,
    #[strum(serialize = "vm.start")]
    StartVm,
    #[strum(serialize = "vm.stop")]
    StopVm,
}

#[async_trait]
pub trait Repository: Send + Sync {
    /*
     * Fetch the raw snapshots of every object of a kind
     * satisfying the filter.
     */
    async fn get_objects(
        &self,
        kind: ObjectKind,
        filter: &Filter,
    ) -> Result<Vec<Value>, RepositoryError>;

    /// Returns the new disk id.
    async fn create_vdi(&self, params: &NewVdi) -> Result<String, RepositoryError>;
    async fn update_vdi(&self, id: &str, update: &VdiUpdate) -> Result<(), RepositoryError>;
    async fn delete_vdi(&self, id: &str) -> Result<(), RepositoryError>;

    async fn attach_disk(&self, vm_id: &str, vdi_id: &str) -> Result<(), RepositoryError>;
    async fn disconnect_vbd(&self, id: &str) -> Result<(), RepositoryError>;
    async fn delete_vbd(&self, id: &str) -> Result<(), RepositoryError>;

    async fn attach_network(&self, vm_id: &str, network_id: &str) -> Result<(), RepositoryError>;
    async fn disconnect_vif(&self, id: &str) -> Result<(), RepositoryError>;
    async fn delete_vif(&self, id: &str) -> Result<(), RepositoryError>;

    /// Returns the new vm id.
    async fn create_vm(&self, params: &NewVm) -> Result<String, RepositoryError>;
    async fn update_vm(&self, id: &str, update: &VmUpdate) -> Result<(), RepositoryError>;
    async fn delete_vm(&self, id: &str) -> Result<(), RepositoryError>;
    async fn start_vm(&self, id: &str) -> Result<(), RepositoryError>;
    async fn stop_vm(&self, id: &str, force: bool) -> Result<(), RepositoryError>;
}

/*
 * Get every object of type T matching the filter.
 */
pub async fn get_all<T, R>(repo: &R, filter: &Filter) -> Result<Vec<T>, RepositoryError>
where
    T: XoObject,
    R: Repository + ?Sized,
{
    trace!("get {} {}", T::KIND, filter);
    let values = repo.get_objects(T::KIND, filter).await?;
    let mut objects = vec![];
    for value in values {
        let object: T = serde_json::from_value(value).map_err(|e| RepositoryError::Decode {
            kind: T::KIND.to_string(),
            detail: e.to_string(),
        })?;
        objects.push(object);
    }
    Ok(objects)
}

/*
 * Get the single object of type T matching the filter.
 * Zero match is NotFound, more than one is Ambiguous.
 */
pub async fn get_one<T, R>(repo: &R, filter: &Filter) -> Result<T, RepositoryError>
where
    T: XoObject,
    R: Repository + ?Sized,
{
    let mut objects = get_all::<T, R>(repo, filter).await?;
    match objects.len() {
        0 => Err(RepositoryError::NotFound {
            kind: T::KIND.to_string(),
            filter: filter.to_string(),
        }),
        1 => Ok(objects.remove(0)),
        count => Err(RepositoryError::Ambiguous {
            kind: T::KIND.to_string(),
            filter: filter.to_string(),
            count,
        }),
    }
}

pub async fn get_by_id<T, R>(repo: &R, id: &str) -> Result<T, RepositoryError>
where
    T: XoObject,
    R: Repository + ?Sized,
{
    get_one::<T, R>(repo, &Filter::new().id(id)).await
}
