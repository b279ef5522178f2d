use crate::repository::{ObjectKind, XoObject};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub id: String,
    #[serde(rename = "name_label")]
    pub name: String,
    #[serde(rename = "name_description", default)]
    pub description: String,
}
impl XoObject for Pool {
    const KIND: ObjectKind = ObjectKind::Pool;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    #[serde(rename = "name_label")]
    pub name: String,
    #[serde(rename = "name_description", default)]
    pub description: String,
    #[serde(rename = "$pool")]
    pub pool: String,
}
impl XoObject for Network {
    const KIND: ObjectKind = ObjectKind::Network;
}
