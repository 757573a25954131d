//! NVS backend for the configuration blob.
//!
//! The whole record lives under one key; `set_raw` replaces it as a unit.

use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use esp_idf_svc::sys::EspError;

use rust_tally_light::config::{ConfigStorage, StorageError};
use rust_tally_light::tally_warn;

/// NVS namespace for tally configuration
pub const NVS_NAMESPACE: &str = "tally";

/// NVS key holding the record blob
const CONFIG_KEY: &str = "config";

pub struct NvsStorage {
    nvs: EspNvs<NvsDefault>,
}

impl NvsStorage {
    pub fn new(partition: EspDefaultNvsPartition) -> Result<Self, EspError> {
        Ok(Self {
            nvs: EspNvs::new(partition, NVS_NAMESPACE, true)?,
        })
    }
}

fn io(e: EspError) -> StorageError {
    tally_warn!("nvs: {}", e);
    StorageError::Io
}

impl ConfigStorage for NvsStorage {
    fn read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, StorageError> {
        match self.nvs.get_raw(CONFIG_KEY, buf).map_err(io)? {
            Some(data) => Ok(Some(data.len())),
            None => Ok(None),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StorageError> {
        self.nvs.set_raw(CONFIG_KEY, data).map_err(io)?;
        Ok(())
    }

    fn erase(&mut self) -> Result<(), StorageError> {
        self.nvs.remove(CONFIG_KEY).map_err(io)?;
        Ok(())
    }
}
