/*
* Read only lookups by name.
* Names are not unique remotely: several matches are an error, never a pick.
*/
use crate::repository::{get_one, Filter, Repository};
use crate::xo::{Network, Pool, StorageRepository, Template, Vdi};

// Error Handling
use xovm_error::XovmError;

pub async fn pool_by_name<R>(repo: &R, name: &str) -> Result<Pool, XovmError>
where
    R: Repository + ?Sized,
{
    Ok(get_one::<Pool, R>(repo, &Filter::new().name(name)).await?)
}

pub async fn network_by_name<R>(repo: &R, pool_id: &str, name: &str) -> Result<Network, XovmError>
where
    R: Repository + ?Sized,
{
    let filter = Filter::new().pool(pool_id).name(name);
    Ok(get_one::<Network, R>(repo, &filter).await?)
}

pub async fn sr_by_name<R>(
    repo: &R,
    pool_id: &str,
    name: &str,
) -> Result<StorageRepository, XovmError>
where
    R: Repository + ?Sized,
{
    let filter = Filter::new().pool(pool_id).name(name);
    Ok(get_one::<StorageRepository, R>(repo, &filter).await?)
}

pub async fn template_by_name<R>(repo: &R, pool_id: &str, name: &str) -> Result<Template, XovmError>
where
    R: Repository + ?Sized,
{
    let filter = Filter::new().pool(pool_id).name(name);
    Ok(get_one::<Template, R>(repo, &filter).await?)
}

/// Disk names are only looked up inside a storage repository.
pub async fn vdi_by_name<R>(repo: &R, sr_id: &str, name: &str) -> Result<Vdi, XovmError>
where
    R: Repository + ?Sized,
{
    let filter = Filter::new().sr(sr_id).name(name);
    Ok(get_one::<Vdi, R>(repo, &filter).await?)
}
