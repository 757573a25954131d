//! Whole-record persistence for [`DeviceConfig`].
//!
//! The record is a postcard-encoded envelope padded into a fixed
//! [`CONFIG_RECORD_SIZE`] blob. Every save rewrites the whole blob; there is
//! no per-field persistence.
//!
//! # Recovery
//!
//! A blob that cannot be read, decoded, carries the wrong magic, or fails
//! [`DeviceConfig::is_valid`] is treated as never initialized: the factory
//! defaults replace the entire record and are written back immediately.

use serde::{Deserialize, Serialize};

use super::DeviceConfig;
use crate::{tally_error, tally_info, tally_warn};

/// Size of the persisted blob in bytes.
pub const CONFIG_RECORD_SIZE: usize = 320;

/// Identifies a blob written by this firmware ("TLY1").
pub const RECORD_MAGIC: u32 = 0x544C_5931;

/// Storage medium errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Medium read/write fault
    Io,
    /// Stored bytes could not be decoded
    Corrupted,
    /// Record does not fit the blob
    TooLarge,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io => f.write_str("storage I/O fault"),
            Self::Corrupted => f.write_str("stored record corrupted"),
            Self::TooLarge => f.write_str("record too large"),
        }
    }
}

/// Blob-level persistent storage.
///
/// `write` must replace the stored blob as a unit: a later `read` returns
/// either the previous blob or the new one, never a mix.
pub trait ConfigStorage {
    /// Read the stored blob into `buf`.
    ///
    /// Returns `Ok(None)` if nothing was ever stored.
    fn read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, StorageError>;

    /// Replace the stored blob.
    fn write(&mut self, data: &[u8]) -> Result<(), StorageError>;

    /// Remove the stored blob.
    fn erase(&mut self) -> Result<(), StorageError>;
}

impl<S: ConfigStorage + ?Sized> ConfigStorage for &mut S {
    fn read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, StorageError> {
        (**self).read(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StorageError> {
        (**self).write(data)
    }

    fn erase(&mut self) -> Result<(), StorageError> {
        (**self).erase()
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    magic: u32,
    config: DeviceConfig,
}

/// Why a stored record was replaced with defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Stored record was valid and is returned unchanged
    Loaded,
    /// Nothing stored yet
    FreshInstall,
    /// Stored bytes unreadable or undecodable
    Corrupted,
    /// Decoded, but `device_id` outside `[1, 10]`
    Invalid { device_id: i32 },
}

/// Load/save front end over a [`ConfigStorage`].
pub struct ConfigStore<S> {
    storage: S,
    last_outcome: Option<LoadOutcome>,
}

impl<S: ConfigStorage> ConfigStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            last_outcome: None,
        }
    }

    /// Read the persisted record, self-healing on anything unusable.
    ///
    /// Never fails: a medium fault while reading or re-persisting is logged
    /// and the defaults are still returned.
    pub fn load(&mut self) -> DeviceConfig {
        let outcome = match self.read_record() {
            Ok(Some(config)) if config.is_valid() => {
                self.last_outcome = Some(LoadOutcome::Loaded);
                return config;
            }
            Ok(Some(config)) => LoadOutcome::Invalid {
                device_id: config.device_id,
            },
            Ok(None) => LoadOutcome::FreshInstall,
            Err(e) => {
                tally_warn!("config: {}", e);
                LoadOutcome::Corrupted
            }
        };

        tally_info!("config: {:?}, writing defaults", outcome);
        self.last_outcome = Some(outcome);

        let defaults = DeviceConfig::factory_default();
        if let Err(e) = self.save(&defaults) {
            tally_error!("config: persisting defaults failed: {}", e);
        }
        defaults
    }

    /// Persist the whole record.
    ///
    /// Values are not validated here; callers validate before mutating.
    pub fn save(&mut self, config: &DeviceConfig) -> Result<(), StorageError> {
        let record = encode_record(config)?;
        self.storage.write(&record)
    }

    /// Replace the stored record with factory defaults.
    ///
    /// A failed write leaves the previous record in place.
    pub fn reset(&mut self) -> Result<DeviceConfig, StorageError> {
        let defaults = DeviceConfig::factory_default();
        self.save(&defaults)?;
        Ok(defaults)
    }

    /// What the most recent [`load`](Self::load) found.
    pub fn last_outcome(&self) -> Option<LoadOutcome> {
        self.last_outcome
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    fn read_record(&mut self) -> Result<Option<DeviceConfig>, StorageError> {
        let mut buf = [0u8; CONFIG_RECORD_SIZE];
        match self.storage.read(&mut buf)? {
            None => Ok(None),
            Some(len) => decode_record(&buf[..len.min(CONFIG_RECORD_SIZE)]).map(Some),
        }
    }
}

/// Whole-record persistence as seen by the console.
pub trait ConfigPersist {
    fn save(&mut self, config: &DeviceConfig) -> Result<(), StorageError>;
    fn reset(&mut self) -> Result<DeviceConfig, StorageError>;
}

impl<S: ConfigStorage> ConfigPersist for ConfigStore<S> {
    fn save(&mut self, config: &DeviceConfig) -> Result<(), StorageError> {
        ConfigStore::save(self, config)
    }

    fn reset(&mut self) -> Result<DeviceConfig, StorageError> {
        ConfigStore::reset(self)
    }
}

/// Encode into the fixed-size blob (zero padded).
pub fn encode_record(config: &DeviceConfig) -> Result<[u8; CONFIG_RECORD_SIZE], StorageError> {
    let mut record = [0u8; CONFIG_RECORD_SIZE];
    let envelope = Envelope {
        magic: RECORD_MAGIC,
        config: config.clone(),
    };
    postcard::to_slice(&envelope, &mut record).map_err(|_| StorageError::TooLarge)?;
    Ok(record)
}

/// Decode a blob; trailing padding is ignored.
pub fn decode_record(bytes: &[u8]) -> Result<DeviceConfig, StorageError> {
    let envelope: Envelope = postcard::from_bytes(bytes).map_err(|_| StorageError::Corrupted)?;
    if envelope.magic != RECORD_MAGIC {
        return Err(StorageError::Corrupted);
    }
    Ok(envelope.config)
}

/// RAM-backed storage for host runs and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    blob: Option<heapless::Vec<u8, CONFIG_RECORD_SIZE>>,
    fail_writes: bool,
    writes: u32,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load raw bytes, as if left behind by earlier firmware.
    pub fn with_blob(bytes: &[u8]) -> Self {
        let mut blob = heapless::Vec::new();
        let len = bytes.len().min(CONFIG_RECORD_SIZE);
        let _ = blob.extend_from_slice(&bytes[..len]);
        Self {
            blob: Some(blob),
            ..Self::default()
        }
    }

    /// Make subsequent writes fail with [`StorageError::Io`].
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of successful writes.
    pub fn writes(&self) -> u32 {
        self.writes
    }

    pub fn blob(&self) -> Option<&[u8]> {
        self.blob.as_deref()
    }
}

impl ConfigStorage for MemoryStorage {
    fn read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, StorageError> {
        let Some(blob) = &self.blob else {
            return Ok(None);
        };
        let len = blob.len().min(buf.len());
        buf[..len].copy_from_slice(&blob[..len]);
        Ok(Some(len))
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Io);
        }
        let blob = heapless::Vec::from_slice(data).map_err(|_| StorageError::TooLarge)?;
        self.blob = Some(blob);
        self.writes += 1;
        Ok(())
    }

    fn erase(&mut self) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Io);
        }
        self.blob = None;
        Ok(())
    }
}
