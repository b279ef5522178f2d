use super::Vbd;
use crate::repository::{get_by_id, ObjectKind, Repository, XoObject};
use serde::{Deserialize, Serialize};

// Error Handling
use xovm_error::RepositoryError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    #[serde(rename = "name_label")]
    pub name: String,
    #[serde(rename = "name_description", default)]
    pub description: String,
    /// The template own disk topology.
    #[serde(rename = "$VBDs", default)]
    pub vbds: Vec<String>,
    #[serde(rename = "$pool")]
    pub pool: String,
}
impl XoObject for Template {
    const KIND: ObjectKind = ObjectKind::Template;
}

impl Template {
    pub async fn get_vbds<R>(
        &self,
        repo: &R,
        include_cd_drives: bool,
    ) -> Result<Vec<Vbd>, RepositoryError>
    where
        R: Repository + ?Sized,
    {
        let mut vbds = vec![];
        for id in &self.vbds {
            let vbd = get_by_id::<Vbd, R>(repo, id).await?;
            if !include_cd_drives && vbd.is_cd_drive {
                continue;
            }
            vbds.push(vbd);
        }
        Ok(vbds)
    }
}
