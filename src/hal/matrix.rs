//! WS2812 5×5 matrix on GPIO 27, clocked out through the RMT peripheral.
//!
//! # Timing
//!
//! ```text
//! bit 0:  ▔▔▔|▁▁▁▁▁▁▁▁    0.35 µs high, 0.80 µs low
//! bit 1:  ▔▔▔▔▔▔▔|▁▁▁▁    0.70 µs high, 0.60 µs low
//! ```
//!
//! Bytes go out green, red, blue; MSB first. Pixel index is `y * 5 + x`.

use core::time::Duration;

use esp_idf_svc::hal::gpio::OutputPin;
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::rmt::config::TransmitConfig;
use esp_idf_svc::hal::rmt::{FixedLengthSignal, PinState, Pulse, RmtChannel, TxRmtDriver};
use esp_idf_svc::sys::EspError;

use rust_tally_light::display::{Matrix, Rgb, MATRIX_SIZE};
use rust_tally_light::tally_warn;

const PIXELS: usize = (MATRIX_SIZE as usize) * (MATRIX_SIZE as usize);
const BITS: usize = PIXELS * 24;

/// Output scale out of 255. Full drive on this board runs hot.
pub const BRIGHTNESS: u8 = 40;

pub struct Ws2812Matrix<'d> {
    tx: TxRmtDriver<'d>,
    pixels: [Rgb; PIXELS],
    zero: (Pulse, Pulse),
    one: (Pulse, Pulse),
}

impl<'d> Ws2812Matrix<'d> {
    pub fn new<C: RmtChannel>(
        channel: impl Peripheral<P = C> + 'd,
        pin: impl Peripheral<P = impl OutputPin> + 'd,
    ) -> Result<Self, EspError> {
        let config = TransmitConfig::new().clock_divider(1);
        let tx = TxRmtDriver::new(channel, pin, &config)?;

        let ticks_hz = tx.counter_clock()?;
        let pulse = |state, ns| Pulse::new_with_duration(ticks_hz, state, &Duration::from_nanos(ns));
        let zero = (pulse(PinState::High, 350)?, pulse(PinState::Low, 800)?);
        let one = (pulse(PinState::High, 700)?, pulse(PinState::Low, 600)?);

        Ok(Self {
            tx,
            pixels: [Rgb::BLACK; PIXELS],
            zero,
            one,
        })
    }

    fn transmit(&mut self) -> Result<(), EspError> {
        let mut signal = FixedLengthSignal::<BITS>::new();
        let mut bit = 0;
        for px in &self.pixels {
            for byte in [scale(px.g), scale(px.r), scale(px.b)] {
                for i in (0..8).rev() {
                    let pair = if byte & (1 << i) != 0 { &self.one } else { &self.zero };
                    signal.set(bit, pair)?;
                    bit += 1;
                }
            }
        }
        self.tx.start_blocking(&signal)
    }
}

fn scale(channel: u8) -> u8 {
    ((channel as u16 * BRIGHTNESS as u16) / 255) as u8
}

impl Matrix for Ws2812Matrix<'_> {
    fn fill(&mut self, color: Rgb) {
        self.pixels = [color; PIXELS];
    }

    fn set_pixel(&mut self, x: u8, y: u8, color: Rgb) {
        if x < MATRIX_SIZE && y < MATRIX_SIZE {
            self.pixels[(y * MATRIX_SIZE + x) as usize] = color;
        }
    }

    fn show(&mut self) {
        if let Err(e) = self.transmit() {
            tally_warn!("matrix: {}", e);
        }
    }
}
