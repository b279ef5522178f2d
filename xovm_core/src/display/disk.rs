use crate::state::{ByteSize, ObservedVdi};

use serde::{Deserialize, Serialize};
use tabled::{settings::Style, Table, Tabled};

// Error Handling
use xovm_error::XovmError;

#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq, Tabled)]
pub struct DiskTable {
    pub id: String,
    pub name: String,
    pub description: String,
    pub size: ByteSize,
    pub storage_repository: String,
    pub pool: String,
}

impl From<&ObservedVdi> for DiskTable {
    fn from(e: &ObservedVdi) -> Self {
        Self {
            id: e.id.clone(),
            name: e.name.clone(),
            description: e.description.clone(),
            size: e.size,
            storage_repository: e.storage_repository_id.clone(),
            pool: e.pool.clone(),
        }
    }
}

impl DiskTable {
    pub fn display(items: Vec<Self>) -> Result<(), XovmError> {
        let mut res = Table::new(&items);
        res.with(Style::rounded());
        println!("{}", res);
        Ok(())
    }
}
