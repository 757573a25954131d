//! Display states, the operator override, and how they combine.

use core::sync::atomic::{AtomicU8, Ordering};

/// A state the indicator can show.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DisplayState {
    Off = 0,
    Preview = 1,
    Program = 2,
    Call = 3,
}

impl DisplayState {
    /// Map a broadcast tier: `1` → Preview, `2` → Program, anything else → Off.
    pub fn from_tier(tier: i64) -> Self {
        match tier {
            1 => DisplayState::Preview,
            2 => DisplayState::Program,
            _ => DisplayState::Off,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DisplayState::Off => "OFF",
            DisplayState::Preview => "PVW",
            DisplayState::Program => "PGM",
            DisplayState::Call => "CALL",
        }
    }

    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(DisplayState::Off),
            1 => Some(DisplayState::Preview),
            2 => Some(DisplayState::Program),
            3 => Some(DisplayState::Call),
            _ => None,
        }
    }
}

impl core::fmt::Display for DisplayState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator override: either absent or forcing a concrete state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Override {
    Inactive,
    Active(DisplayState),
}

impl Override {
    pub fn is_active(self) -> bool {
        matches!(self, Override::Active(_))
    }
}

impl core::fmt::Display for Override {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Override::Inactive => f.write_str("none"),
            Override::Active(state) => write!(f, "{}", state),
        }
    }
}

/// Encoded `Override::Inactive`; active states are stored as `state + 1`.
const INACTIVE: u8 = 0;

/// Override shared between the console and event delivery contexts.
///
/// The only datum written from two execution contexts; every access goes
/// through an atomic with Release/Acquire ordering.
pub struct OverrideCell {
    raw: AtomicU8,
}

impl OverrideCell {
    pub const fn new() -> Self {
        Self {
            raw: AtomicU8::new(INACTIVE),
        }
    }

    #[inline]
    pub fn get(&self) -> Override {
        decode(self.raw.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, value: Override) {
        let raw = match value {
            Override::Inactive => INACTIVE,
            Override::Active(state) => state as u8 + 1,
        };
        self.raw.store(raw, Ordering::Release);
    }

    /// Reset to `Inactive`, returning what was there.
    #[inline]
    pub fn clear(&self) -> Override {
        decode(self.raw.swap(INACTIVE, Ordering::AcqRel))
    }
}

fn decode(raw: u8) -> Override {
    match raw {
        INACTIVE => Override::Inactive,
        raw => DisplayState::from_u8(raw - 1)
            .map(Override::Active)
            .unwrap_or(Override::Inactive),
    }
}

impl Default for OverrideCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Effective state: the override when active, else the authoritative state.
#[inline]
pub fn resolve(ovr: Override, authoritative: DisplayState) -> DisplayState {
    match ovr {
        Override::Active(state) => state,
        Override::Inactive => authoritative,
    }
}
