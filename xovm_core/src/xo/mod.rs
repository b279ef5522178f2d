/*
* Xen Orchestra compatibility layer.
*
* Typed snapshots of the remote objects as returned by `xo.getAllObjects`.
* Field names follow the remote json keys ("name_label", "$pool"...)
* so that repository filters can match on them directly.
*/

mod network;
mod sr;
mod template;
mod vbd;
mod vdi;
mod vif;
mod vm;

// Reexports
pub use network::{Network, Pool};
pub use sr::{SrType, StorageRepository};
pub use template::Template;
pub use vbd::{Vbd, BOOT_POSITION};
pub use vdi::{DiskMode, Vdi};
pub use vif::Vif;
pub use vm::{DesiredPowerState, PowerState, VirtualMachine, VmCpus, VmMemory};
