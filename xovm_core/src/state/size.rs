use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// Error Handling
use xovm_error::{LibError, XovmError};

/// A size in bytes.
/// Reads either a plain integer or a human readable string ("50GiB").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub fn bytes(&self) -> u64 {
        self.0
    }
}
impl From<u64> for ByteSize {
    fn from(e: u64) -> Self {
        Self(e)
    }
}
impl FromStr for ByteSize {
    type Err = XovmError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(reverse_human_bytes(s)?))
    }
}
impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", human_bytes(&self.0))
    }
}
impl Serialize for ByteSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}
impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bytes(u64),
            Human(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Bytes(v) => Ok(Self(v)),
            Raw::Human(v) => reverse_human_bytes(&v)
                .map(Self)
                .map_err(serde::de::Error::custom),
        }
    }
}

pub fn human_bytes(num: &u64) -> String {
    let mut res = human_bytes::human_bytes(num.to_owned() as f64);
    res = res.replace(" ", "");
    res
}
/// Convert string to bytes.
pub fn reverse_human_bytes(string: &str) -> Result<u64, XovmError> {
    let mut string = string.replace(" ", "");
    string = string.replace("_", "");
    let units = [("TiB", 4), ("GiB", 3), ("MiB", 2), ("KiB", 1), ("B", 0)];
    for (suffix, power) in units {
        if let Some(num) = string.strip_suffix(suffix) {
            let int: u64 = num.parse()?;
            return int.checked_mul(u64::pow(1024, power)).ok_or_else(|| {
                LibError::builder()
                    .msg(&format!("Size {} doesn't fit in 64 bits", string))
                    .help("Request a smaller size")
                    .build()
                    .into()
            });
        }
    }
    if let Ok(int) = string.parse::<u64>() {
        return Ok(int);
    }
    Err(LibError::builder()
        .msg("Couldn't convert human readable string to bytes")
        .help("Must be of the form 50GiB, 2MiB, 110KiB or 1B")
        .build()
        .into())
}
