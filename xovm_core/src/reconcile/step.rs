use serde::Serialize;
use strum::Display;

/// Named steps of the reconciliation pipelines, as reported in errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Step {
    ReadCurrent,
    ValidatePreconditions,
    UpdateVm,
    PowerOff,
    ResizeBootDisk,
    DisconnectDisk,
    DeleteDiskAttachment,
    AttachDisk,
    DisconnectNetwork,
    DeleteNetworkAttachment,
    AttachNetwork,
    StartVm,
    StopVm,
    CreateVm,
    DeleteVm,
    CreateDisk,
    UpdateDisk,
    DeleteDisk,
    ReadFinal,
}
