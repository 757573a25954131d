//! Serial console on UART0 (USB bridge), 115200 8N1.

use core::fmt;

use esp_idf_svc::hal::delay::NON_BLOCK;
use esp_idf_svc::hal::gpio::{self, InputPin, OutputPin};
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::uart::{self, UartDriver};
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::sys::EspError;

pub const CONSOLE_BAUD: u32 = 115_200;

/// Non-blocking reader and blocking writer on one UART.
pub struct ConsolePort<'d> {
    uart: UartDriver<'d>,
}

impl<'d> ConsolePort<'d> {
    pub fn new(
        uart: impl Peripheral<P = uart::UART0> + 'd,
        tx_pin: impl Peripheral<P = impl OutputPin> + 'd,
        rx_pin: impl Peripheral<P = impl InputPin> + 'd,
    ) -> Result<Self, EspError> {
        let config = uart::config::Config::default().baudrate(Hertz(CONSOLE_BAUD));
        let uart = UartDriver::new(
            uart,
            tx_pin,
            rx_pin,
            Option::<gpio::AnyIOPin>::None, // CTS
            Option::<gpio::AnyIOPin>::None, // RTS
            &config,
        )?;
        Ok(Self { uart })
    }

    /// Whatever bytes have arrived, without waiting.
    pub fn read_available(&mut self, buf: &mut [u8]) -> usize {
        self.uart.read(buf, NON_BLOCK).unwrap_or(0)
    }

    fn write_all(&mut self, mut bytes: &[u8]) -> fmt::Result {
        while !bytes.is_empty() {
            let n = self.uart.write(bytes).map_err(|_| fmt::Error)?;
            bytes = &bytes[n..];
        }
        Ok(())
    }
}

/// Bare LF becomes CRLF for serial terminals.
impl fmt::Write for ConsolePort<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut lines = s.split('\n');
        if let Some(first) = lines.next() {
            self.write_all(first.as_bytes())?;
        }
        for line in lines {
            self.write_all(b"\r\n")?;
            self.write_all(line.as_bytes())?;
        }
        Ok(())
    }
}
