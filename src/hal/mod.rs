//! Hardware Abstraction Layer for RustTallyLight.
//!
//! Thin wrappers around ESP-IDF peripherals.
//! Business logic stays in the library, HAL is just I/O.

pub mod gpio;
pub mod matrix;
pub mod mqtt;
pub mod storage;
pub mod uart;
pub mod wifi;

pub use gpio::{Button, GpioLeds};
pub use matrix::Ws2812Matrix;
pub use mqtt::MqttTransport;
pub use storage::NvsStorage;
pub use uart::ConsolePort;

use esp_idf_svc::hal::delay::FreeRtos;
use rust_tally_light::transport::Delay;

/// Blocking delay on the calling FreeRTOS task.
pub struct RtosDelay;

impl Delay for RtosDelay {
    fn delay_ms(&mut self, ms: u32) {
        FreeRtos::delay_ms(ms);
    }
}

/// Milliseconds since boot.
pub fn now_ms() -> u64 {
    // SAFETY: reads a monotonic hardware timer, no shared state
    let us = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
    us.max(0) as u64 / 1000
}
