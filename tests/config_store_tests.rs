//! Configuration persistence tests

use proptest::prelude::*;

use rust_tally_light::config::store::{encode_record, RECORD_MAGIC};
use rust_tally_light::config::{
    ConfigStorage, ConfigStore, DeviceConfig, LoadOutcome, MemoryStorage, StorageError, CONFIG_RECORD_SIZE,
    DEVICE_ID_MAX, DEVICE_ID_MIN,
};

fn stored(config: &DeviceConfig) -> MemoryStorage {
    MemoryStorage::with_blob(&encode_record(config).unwrap())
}

#[test]
fn test_valid_record_loads_unchanged() {
    let mut cfg = DeviceConfig::factory_default();
    cfg.set_device_id(5).unwrap();
    cfg.set_rotation(2).unwrap();
    cfg.set_ssid("Control Room").unwrap();
    cfg.dhcp = false;

    let mut store = ConfigStore::new(stored(&cfg));
    assert_eq!(store.load(), cfg);
    assert_eq!(store.last_outcome(), Some(LoadOutcome::Loaded));
    assert_eq!(store.storage().writes(), 0);
}

#[test]
fn test_invalid_id_resets_whole_record() {
    let mut cfg = DeviceConfig::factory_default();
    cfg.set_ssid("Somewhere").unwrap();
    cfg.device_id = 0;

    let mut store = ConfigStore::new(stored(&cfg));
    let loaded = store.load();

    assert_eq!(loaded, DeviceConfig::factory_default());
    assert_eq!(store.last_outcome(), Some(LoadOutcome::Invalid { device_id: 0 }));
    // Defaults written back immediately
    assert_eq!(store.storage().writes(), 1);
    assert_eq!(store.load(), DeviceConfig::factory_default());
    assert_eq!(store.last_outcome(), Some(LoadOutcome::Loaded));
}

#[test]
fn test_truncated_record_is_corrupted() {
    let record = encode_record(&DeviceConfig::factory_default()).unwrap();
    let mut store = ConfigStore::new(MemoryStorage::with_blob(&record[..6]));

    assert_eq!(store.load(), DeviceConfig::factory_default());
    assert_eq!(store.last_outcome(), Some(LoadOutcome::Corrupted));
}

/// Medium that can still erase but no longer write.
struct WriteFault {
    inner: MemoryStorage,
    fail_writes: bool,
}

impl ConfigStorage for WriteFault {
    fn read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, StorageError> {
        self.inner.read(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Io);
        }
        self.inner.write(data)
    }

    fn erase(&mut self) -> Result<(), StorageError> {
        self.inner.erase()
    }
}

#[test]
fn test_failed_reset_keeps_saved_record() {
    let mut cfg = DeviceConfig::factory_default();
    cfg.set_device_id(7).unwrap();
    let mut store = ConfigStore::new(WriteFault {
        inner: stored(&cfg),
        fail_writes: true,
    });

    assert_eq!(store.reset(), Err(StorageError::Io));

    store.storage_mut().fail_writes = false;
    assert_eq!(store.load().device_id, 7);
    assert_eq!(store.last_outcome(), Some(LoadOutcome::Loaded));
}

#[test]
fn test_reset_writes_defaults() {
    let mut cfg = DeviceConfig::factory_default();
    cfg.set_device_id(7).unwrap();
    let mut store = ConfigStore::new(stored(&cfg));

    assert_eq!(store.reset(), Ok(DeviceConfig::factory_default()));
    assert_eq!(store.load(), DeviceConfig::factory_default());
    assert_eq!(store.last_outcome(), Some(LoadOutcome::Loaded));
}

#[test]
fn test_magic_constant_is_stable() {
    // Changing this invalidates every stored record in the field
    assert_eq!(RECORD_MAGIC, 0x544C_5931);
    assert_eq!(CONFIG_RECORD_SIZE, 320);
}

fn arb_config() -> impl Strategy<Value = DeviceConfig> {
    (
        "[ -~]{0,32}",
        "[ -~]{0,64}",
        "[a-z0-9.]{1,64}",
        DEVICE_ID_MIN..=DEVICE_ID_MAX,
        0u8..=3,
        any::<bool>(),
        any::<[u8; 4]>(),
        0u8..=32,
    )
        .prop_map(|(ssid, pass, broker, id, rotation, dhcp, ip, prefix)| {
            let mut cfg = DeviceConfig::factory_default();
            cfg.set_ssid(&ssid).unwrap();
            cfg.set_password(&pass).unwrap();
            cfg.set_broker(&broker).unwrap();
            cfg.set_device_id(id).unwrap();
            cfg.set_rotation(rotation as i32).unwrap();
            cfg.dhcp = dhcp;

            let mask = u32::MAX.checked_shl(32 - prefix as u32).unwrap_or(0);
            let ip = std::net::Ipv4Addr::from(ip).to_string();
            let mask = std::net::Ipv4Addr::from(mask).to_string();
            cfg.set_static(&ip, &mask, &ip).unwrap();
            cfg
        })
}

proptest! {
    #[test]
    fn prop_loaded_id_always_valid(id in any::<i32>()) {
        let mut cfg = DeviceConfig::factory_default();
        cfg.device_id = id;
        let mut store = ConfigStore::new(stored(&cfg));

        let loaded = store.load();
        prop_assert!((DEVICE_ID_MIN..=DEVICE_ID_MAX).contains(&loaded.device_id));
        if (DEVICE_ID_MIN..=DEVICE_ID_MAX).contains(&id) {
            prop_assert_eq!(loaded.device_id, id);
        } else {
            prop_assert_eq!(loaded, DeviceConfig::factory_default());
        }
    }

    #[test]
    fn prop_garbage_never_yields_invalid_config(bytes in proptest::collection::vec(any::<u8>(), 0..CONFIG_RECORD_SIZE)) {
        let mut store = ConfigStore::new(MemoryStorage::with_blob(&bytes));
        prop_assert!(store.load().is_valid());
    }

    #[test]
    fn prop_save_then_load_round_trips(cfg in arb_config()) {
        let mut store = ConfigStore::new(MemoryStorage::new());
        store.save(&cfg).unwrap();
        prop_assert_eq!(store.load(), cfg);
    }
}
