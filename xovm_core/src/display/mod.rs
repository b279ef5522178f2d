pub mod disk;
pub mod plan;
mod utils;
pub mod vm;

// Reexports
pub use disk::DiskTable;
pub use plan::PlanTable;
pub use vm::VmTable;
