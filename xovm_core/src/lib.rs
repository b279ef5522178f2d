#![allow(unused_imports)]
#![allow(unused_variables)]

pub mod cli;

pub mod config;
pub mod display;

pub mod reconcile;
pub mod repository;
pub mod state;
pub mod xo;

// Reexports
pub use cli::Cli;
pub use config::XovmConfig;
pub use reconcile::Reconciler;
pub use repository::{MemoryRepository, Repository};
