/*
* Content identity of attachments.
*
* Desired attachments carry no remote identity,
* so both sides are compared through a hash of the caller visible fields only.
* Hypervisor assigned fields (device, position, mac) never take part.
*/
use crate::state::{DiskRef, NetworkRef};
use crate::xo::{Vbd, Vif};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex encoded sha256 of an attachment canonical encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The projection of an attachment that gets fingerprinted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttachmentKey {
    Disk { disk_id: String },
    Network { network_id: String },
}

impl AttachmentKey {
    /*
     * Kind tag followed by length prefixed key=value pairs.
     * Lengths keep ("ab","c") and ("a","bc") apart.
     */
    fn canonical(&self) -> Vec<u8> {
        let (tag, fields) = match self {
            AttachmentKey::Disk { disk_id } => ("disk", vec![("disk_id", disk_id)]),
            AttachmentKey::Network { network_id } => ("network", vec![("network_id", network_id)]),
        };
        let mut bytes = format!("{}:{};", tag.len(), tag).into_bytes();
        for (key, value) in fields {
            bytes.extend(format!("{}:{}={}:{};", key.len(), key, value.len(), value).into_bytes());
        }
        bytes
    }
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical());
        Fingerprint(hex::encode(hasher.finalize()))
    }
}

pub trait Fingerprinted {
    fn key(&self) -> AttachmentKey;
    fn fingerprint(&self) -> Fingerprint {
        self.key().fingerprint()
    }
}

impl Fingerprinted for DiskRef {
    fn key(&self) -> AttachmentKey {
        AttachmentKey::Disk {
            disk_id: self.disk_id.clone(),
        }
    }
}
impl Fingerprinted for NetworkRef {
    fn key(&self) -> AttachmentKey {
        AttachmentKey::Network {
            network_id: self.network_id.clone(),
        }
    }
}
impl Fingerprinted for Vbd {
    fn key(&self) -> AttachmentKey {
        AttachmentKey::Disk {
            disk_id: self.vdi.clone().unwrap_or_default(),
        }
    }
}
impl Fingerprinted for Vif {
    fn key(&self) -> AttachmentKey {
        AttachmentKey::Network {
            network_id: self.network.clone(),
        }
    }
}
