//! Station-mode Wi-Fi join with optional static addressing.

use core::net::Ipv4Addr;

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::ipv4;
use esp_idf_svc::netif::{EspNetif, NetifConfiguration, NetifStack};
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sys::{EspError, ESP_ERR_INVALID_ARG};
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi, WifiDriver};

use rust_tally_light::config::DeviceConfig;
use rust_tally_light::display::{IndicatorPanel, Leds, Matrix, Rgb};
use rust_tally_light::{tally_info, tally_warn};

/// Join attempts before giving up.
pub const JOIN_ATTEMPTS: u32 = 20;

/// Pause between join attempts.
pub const JOIN_RETRY_MS: u32 = 500;

/// How long the red failure fill stays up.
pub const JOIN_FAILED_HOLD_MS: u32 = 2_000;

fn invalid_arg() -> EspError {
    EspError::from_infallible::<ESP_ERR_INVALID_ARG>()
}

fn station_netif(config: &DeviceConfig) -> Result<EspNetif, EspError> {
    if config.dhcp {
        return EspNetif::new(NetifStack::Sta);
    }

    let Some(net) = config.static_network() else {
        tally_warn!("wifi: static settings unusable, using DHCP");
        return EspNetif::new(NetifStack::Sta);
    };

    let settings = ipv4::ClientSettings {
        ip: net.ip,
        subnet: ipv4::Subnet {
            gateway: net.gateway,
            mask: ipv4::Mask(net.prefix_len),
        },
        dns: None,
        secondary_dns: None,
    };

    EspNetif::new_with_conf(&NetifConfiguration {
        ip_configuration: Some(ipv4::Configuration::Client(ipv4::ClientConfiguration::Fixed(settings))),
        ..NetifConfiguration::wifi_default_client()
    })
}

/// Join the configured network.
///
/// The status pixel shows blue while trying. On failure the matrix goes red
/// for two seconds and the returned address is `None`; the caller carries on
/// and the broker loop keeps retrying.
pub fn connect<M: Matrix, L: Leds>(
    modem: impl Peripheral<P = Modem> + 'static,
    sysloop: EspSystemEventLoop,
    nvs: EspDefaultNvsPartition,
    config: &DeviceConfig,
    panel: &mut IndicatorPanel<M, L>,
) -> Result<(BlockingWifi<EspWifi<'static>>, Option<Ipv4Addr>), EspError> {
    let driver = WifiDriver::new(modem, sysloop.clone(), Some(nvs))?;
    let esp_wifi = EspWifi::wrap_all(driver, station_netif(config)?, EspNetif::new(NetifStack::Ap)?)?;
    let mut wifi = BlockingWifi::wrap(esp_wifi, sysloop)?;

    let auth_method = if config.password.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: config.ssid.as_str().try_into().map_err(|_| invalid_arg())?,
        password: config.password.as_str().try_into().map_err(|_| invalid_arg())?,
        auth_method,
        ..Default::default()
    }))?;
    wifi.start()?;

    tally_info!("wifi: connecting to {}", config.ssid);
    for attempt in 1..=JOIN_ATTEMPTS {
        panel.status_pixel(Rgb::BLUE);
        match wifi.connect().and_then(|_| wifi.wait_netif_up()) {
            Ok(()) => {
                let ip = wifi.wifi().sta_netif().get_ip_info()?.ip;
                tally_info!("wifi: connected, ip {}", ip);
                panel.status_pixel(Rgb::BLACK);
                return Ok((wifi, Some(ip)));
            }
            Err(e) => {
                tally_warn!("wifi: attempt {}/{}: {}", attempt, JOIN_ATTEMPTS, e);
                FreeRtos::delay_ms(JOIN_RETRY_MS);
            }
        }
    }

    tally_warn!("wifi: failed to connect");
    panel.fill(Rgb::RED);
    FreeRtos::delay_ms(JOIN_FAILED_HOLD_MS);
    Ok((wifi, None))
}
