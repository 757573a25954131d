//! Module: config
//!
//! Purpose: Device identity and network settings persisted across reboots.
//!
//! Architecture:
//! - `DeviceConfig`: the whole record, bounded strings only
//! - `store`: whole-record load/save over a `ConfigStorage` backend
//! - Setters validate before mutating; nothing here persists implicitly

pub mod store;

use core::net::Ipv4Addr;
use core::str::FromStr;

use heapless::String;
use serde::{Deserialize, Serialize};

pub use store::{
    ConfigPersist, ConfigStorage, ConfigStore, LoadOutcome, MemoryStorage, StorageError,
    CONFIG_RECORD_SIZE,
};

/// Maximum SSID length (bytes).
pub const SSID_LEN: usize = 32;

/// Maximum Wi-Fi password length (bytes).
pub const PASSWORD_LEN: usize = 64;

/// Maximum broker address length (bytes).
pub const BROKER_LEN: usize = 64;

/// Longest dotted quad: `255.255.255.255`.
pub const IPV4_LEN: usize = 15;

/// Valid device ids.
pub const DEVICE_ID_MIN: i32 = 1;
pub const DEVICE_ID_MAX: i32 = 10;

/// Highest rotation step (quarter turns).
pub const ROTATION_MAX: u8 = 3;

/// MQTT broker port.
pub const BROKER_PORT: u16 = 1883;

/// Rejected setter input. Nothing is mutated when one of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Numeric value outside its allowed range
    OutOfRange,
    /// Text longer than the field capacity
    TooLong,
    /// Not a dotted-quad IPv4 address (or not a contiguous netmask)
    InvalidAddress,
}

/// Persisted device configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub ssid: String<SSID_LEN>,
    pub password: String<PASSWORD_LEN>,
    pub broker: String<BROKER_LEN>,
    /// Key into tally broadcasts; meaningful only in `[1, 10]`.
    pub device_id: i32,
    /// Matrix rotation in quarter turns.
    pub rotation: u8,
    pub dhcp: bool,
    pub static_ip: String<IPV4_LEN>,
    pub subnet: String<IPV4_LEN>,
    pub gateway: String<IPV4_LEN>,
}

impl DeviceConfig {
    /// Factory settings written on first boot or after corruption.
    pub fn factory_default() -> Self {
        Self {
            ssid: bounded("Atem_Py"),
            password: bounded("Tally33"),
            broker: bounded("192.168.1.100"),
            device_id: 1,
            rotation: 0,
            dhcp: true,
            static_ip: bounded("192.168.1.101"),
            subnet: bounded("255.255.255.0"),
            gateway: bounded("192.168.1.1"),
        }
    }

    /// The single validity rule checked at load time.
    ///
    /// A record failing this is treated as never initialized.
    pub fn is_valid(&self) -> bool {
        is_valid_device_id(self.device_id)
    }

    pub fn set_device_id(&mut self, id: i32) -> Result<(), ConfigError> {
        if !is_valid_device_id(id) {
            return Err(ConfigError::OutOfRange);
        }
        self.device_id = id;
        Ok(())
    }

    pub fn set_rotation(&mut self, rotation: i32) -> Result<(), ConfigError> {
        if !(0..=ROTATION_MAX as i32).contains(&rotation) {
            return Err(ConfigError::OutOfRange);
        }
        self.rotation = rotation as u8;
        Ok(())
    }

    pub fn set_ssid(&mut self, ssid: &str) -> Result<(), ConfigError> {
        self.ssid = try_bounded(ssid)?;
        Ok(())
    }

    pub fn set_password(&mut self, password: &str) -> Result<(), ConfigError> {
        self.password = try_bounded(password)?;
        Ok(())
    }

    pub fn set_broker(&mut self, broker: &str) -> Result<(), ConfigError> {
        self.broker = try_bounded(broker)?;
        Ok(())
    }

    /// Replace the static triple. All three are checked before any is stored.
    pub fn set_static(&mut self, ip: &str, subnet: &str, gateway: &str) -> Result<(), ConfigError> {
        parse_ipv4(ip)?;
        mask_prefix_len(parse_ipv4(subnet)?).ok_or(ConfigError::InvalidAddress)?;
        parse_ipv4(gateway)?;

        let ip = try_bounded(ip)?;
        let subnet = try_bounded(subnet)?;
        let gateway = try_bounded(gateway)?;

        self.static_ip = ip;
        self.subnet = subnet;
        self.gateway = gateway;
        Ok(())
    }

    /// Parsed static triple, or `None` if any stored field is not usable.
    pub fn static_network(&self) -> Option<StaticNetwork> {
        let ip = parse_ipv4(&self.static_ip).ok()?;
        let mask = parse_ipv4(&self.subnet).ok()?;
        let gateway = parse_ipv4(&self.gateway).ok()?;
        Some(StaticNetwork {
            ip,
            gateway,
            prefix_len: mask_prefix_len(mask)?,
        })
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::factory_default()
    }
}

/// Static addressing in the form network stacks want it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticNetwork {
    pub ip: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub prefix_len: u8,
}

pub fn is_valid_device_id(id: i32) -> bool {
    (DEVICE_ID_MIN..=DEVICE_ID_MAX).contains(&id)
}

/// Prefix length of a contiguous netmask (`255.255.255.0` → 24).
pub fn mask_prefix_len(mask: Ipv4Addr) -> Option<u8> {
    let bits = u32::from(mask);
    let ones = bits.leading_ones();
    // Every bit after the leading ones must be zero
    if bits.checked_shl(ones).unwrap_or(0) != 0 {
        return None;
    }
    Some(ones as u8)
}

fn parse_ipv4(s: &str) -> Result<Ipv4Addr, ConfigError> {
    Ipv4Addr::from_str(s).map_err(|_| ConfigError::InvalidAddress)
}

fn try_bounded<const N: usize>(s: &str) -> Result<String<N>, ConfigError> {
    String::try_from(s).map_err(|_| ConfigError::TooLong)
}

// Literals used here always fit; an overlong literal would come back empty.
fn bounded<const N: usize>(s: &str) -> String<N> {
    String::try_from(s).unwrap_or_default()
}
