/*
* Desired and observed state snapshots exchanged with the front end.
*/

mod desired;
mod observed;
mod size;

// Reexports
pub use desired::{
    BootDiskSpec, DiskRef, DiskSpec, InstallMethod, InstallationSpec, NetworkRef, VmSpec,
    MAX_ATTACHED_DISKS,
};
pub use observed::{ObservedBootDisk, ObservedDisk, ObservedNic, ObservedVdi, ObservedVm};
pub use size::{human_bytes, reverse_human_bytes, ByteSize};
