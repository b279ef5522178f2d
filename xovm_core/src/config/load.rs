use super::{XovmConfig, CONFIG_DIR};

use std::fs;
use std::path::{Path, PathBuf};

// Error Handling
use log::{debug, info};
use xovm_error::{CastError, TomlError, XovmError};

impl XovmConfig {
    /*
     * Get config from crate directory
     */
    fn debug_path() -> PathBuf {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("./xovm.config.toml");
        path
    }
    /*
     * Get config from FHS path.
     */
    fn release_path() -> PathBuf {
        let mut path = PathBuf::from(CONFIG_DIR);
        path.push("config.toml");
        path
    }
    /// A missing config file is not an error, defaults apply.
    pub fn get() -> Result<Self, XovmError> {
        info!("Search config file.");

        #[cfg(debug_assertions)]
        let path = Self::debug_path();

        #[cfg(not(debug_assertions))]
        let path = Self::release_path();

        if !Path::new(&path).exists() {
            debug!("No config file at {}, using defaults.", path.display());
            return Ok(Self::default());
        }
        let path = path.display().to_string();
        let config = Self::from_file(&path)?;

        Ok(config)
    }
    pub fn from_file(path: &str) -> Result<Self, XovmError> {
        let string = fs::read_to_string(path)?;
        Self::from_toml(&string)
    }
    pub fn from_toml(string: &str) -> Result<Self, XovmError> {
        let res = toml::from_str::<Self>(string);
        let item = match res {
            Ok(res) => res,
            Err(e) => {
                let err = CastError::TomlError(TomlError::new(e, string));
                return Err(err.into());
            }
        };
        Ok(item)
    }
}
