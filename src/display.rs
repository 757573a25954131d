//! Indicator output: the 5×5 RGB matrix and three discrete LEDs.
//!
//! Pixel drivers are platform code; this module decides what to show.

use crate::tally::DisplayState;

/// Matrix edge length.
pub const MATRIX_SIZE: u8 = 5;

/// 24-bit color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::from_u32(0x000000);
    pub const WHITE: Rgb = Rgb::from_u32(0xFFFFFF);
    pub const RED: Rgb = Rgb::from_u32(0xFF0000);
    pub const GREEN: Rgb = Rgb::from_u32(0x00FF00);
    pub const BLUE: Rgb = Rgb::from_u32(0x0000FF);
    pub const YELLOW: Rgb = Rgb::from_u32(0xFFFF00);
    pub const MAGENTA: Rgb = Rgb::from_u32(0xFF00FF);

    pub const fn from_u32(rgb: u32) -> Self {
        Self {
            r: (rgb >> 16) as u8,
            g: (rgb >> 8) as u8,
            b: rgb as u8,
        }
    }
}

/// Discrete LED levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct LedLevels {
    pub red: bool,
    pub green: bool,
    pub yellow: bool,
}

/// Everything one render writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndicatorFrame {
    pub fill: Rgb,
    pub leds: LedLevels,
}

/// Frame for a display state. At most one discrete LED is lit.
pub fn frame_for(state: DisplayState) -> IndicatorFrame {
    let off = LedLevels::default();
    match state {
        DisplayState::Off => IndicatorFrame { fill: Rgb::BLACK, leds: off },
        DisplayState::Preview => IndicatorFrame {
            fill: Rgb::GREEN,
            leds: LedLevels { green: true, ..off },
        },
        DisplayState::Program => IndicatorFrame {
            fill: Rgb::RED,
            leds: LedLevels { red: true, ..off },
        },
        DisplayState::Call => IndicatorFrame {
            fill: Rgb::YELLOW,
            leds: LedLevels { yellow: true, ..off },
        },
    }
}

/// Render sink called every tick. Must not block beyond the tick budget.
pub trait DisplaySink {
    fn render(&mut self, state: DisplayState);
}

/// RGB matrix driver.
pub trait Matrix {
    fn fill(&mut self, color: Rgb);
    /// Set one pixel in physical (unrotated) coordinates.
    fn set_pixel(&mut self, x: u8, y: u8, color: Rgb);
    /// Push pending pixels to the hardware.
    fn show(&mut self);
}

/// Discrete LED driver.
pub trait Leds {
    fn set(&mut self, levels: LedLevels);
}

/// Map logical coordinates through `rotation` quarter turns clockwise.
pub fn rotate(x: u8, y: u8, rotation: u8) -> (u8, u8) {
    let max = MATRIX_SIZE - 1;
    match rotation % 4 {
        0 => (x, y),
        1 => (max - y, x),
        2 => (max - x, max - y),
        _ => (y, max - x),
    }
}

/// Logical pixels lit to show `n`: row-major, five per row. Empty outside 1..=10.
pub fn number_pixels(n: i32) -> impl Iterator<Item = (u8, u8)> {
    let count = if (1..=10).contains(&n) { n as u8 } else { 0 };
    (0..count).map(|i| (i % MATRIX_SIZE, i / MATRIX_SIZE))
}

/// Matrix plus LEDs driven as one indicator.
pub struct IndicatorPanel<M, L> {
    matrix: M,
    leds: L,
    rotation: u8,
}

impl<M: Matrix, L: Leds> IndicatorPanel<M, L> {
    pub fn new(matrix: M, leds: L, rotation: u8) -> Self {
        Self { matrix, leds, rotation }
    }

    pub fn set_rotation(&mut self, rotation: u8) {
        self.rotation = rotation;
    }

    /// Show `n` as a pixel count in white, all LEDs off.
    pub fn show_number(&mut self, n: i32) {
        self.leds.set(LedLevels::default());
        self.matrix.fill(Rgb::BLACK);
        for (x, y) in number_pixels(n) {
            let (px, py) = rotate(x, y, self.rotation);
            self.matrix.set_pixel(px, py, Rgb::WHITE);
        }
        self.matrix.show();
    }

    /// Status pixel at logical (0,0), leaving the rest as is.
    pub fn status_pixel(&mut self, color: Rgb) {
        let (px, py) = rotate(0, 0, self.rotation);
        self.matrix.set_pixel(px, py, color);
        self.matrix.show();
    }

    pub fn fill(&mut self, color: Rgb) {
        self.matrix.fill(color);
        self.matrix.show();
    }

    pub fn matrix(&self) -> &M {
        &self.matrix
    }

    pub fn leds(&self) -> &L {
        &self.leds
    }
}

impl<M: Matrix, L: Leds> DisplaySink for IndicatorPanel<M, L> {
    fn render(&mut self, state: DisplayState) {
        let frame = frame_for(state);
        self.leds.set(frame.leds);
        self.matrix.fill(frame.fill);
        self.matrix.show();
    }
}

impl<M: Matrix, L: Leds> crate::transport::LinkIndicator for IndicatorPanel<M, L> {
    fn connect_failed(&mut self) {
        self.status_pixel(Rgb::MAGENTA);
    }
}
