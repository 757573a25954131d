//! GPIO HAL for the discrete tally LEDs and the front button.

use esp_idf_svc::hal::gpio::{AnyInputPin, AnyOutputPin, Input, InputPin, Output, OutputPin, PinDriver, Pull};
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::sys::EspError;

use rust_tally_light::display::{LedLevels, Leds};

/// Red / green / yellow LEDs, active high (GPIO 21 / 22 / 23).
pub struct GpioLeds<'d> {
    red: PinDriver<'d, AnyOutputPin, Output>,
    green: PinDriver<'d, AnyOutputPin, Output>,
    yellow: PinDriver<'d, AnyOutputPin, Output>,
}

impl<'d> GpioLeds<'d> {
    pub fn new(
        red: impl Peripheral<P = impl OutputPin> + 'd,
        green: impl Peripheral<P = impl OutputPin> + 'd,
        yellow: impl Peripheral<P = impl OutputPin> + 'd,
    ) -> Result<Self, EspError> {
        let mut leds = Self {
            red: PinDriver::output(red.into_ref().map_into::<AnyOutputPin>())?,
            green: PinDriver::output(green.into_ref().map_into::<AnyOutputPin>())?,
            yellow: PinDriver::output(yellow.into_ref().map_into::<AnyOutputPin>())?,
        };
        leds.set(LedLevels::default());
        Ok(leds)
    }
}

impl Leds for GpioLeds<'_> {
    fn set(&mut self, levels: LedLevels) {
        let _ = self.red.set_level(levels.red.into());
        let _ = self.green.set_level(levels.green.into());
        let _ = self.yellow.set_level(levels.yellow.into());
    }
}

/// Front button (GPIO 39), active low with an external pull-up.
pub struct Button<'d> {
    pin: PinDriver<'d, AnyInputPin, Input>,
}

impl<'d> Button<'d> {
    pub fn new(pin: impl Peripheral<P = impl InputPin> + 'd) -> Result<Self, EspError> {
        let mut pin = PinDriver::input(pin.into_ref().map_into::<AnyInputPin>())?;
        // GPIO 34..39 have no internal pulls; ignore the refusal there
        let _ = pin.set_pull(Pull::Floating);
        Ok(Self { pin })
    }

    pub fn is_pressed(&self) -> bool {
        self.pin.is_low()
    }
}
