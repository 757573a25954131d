//! Button-driven setup mode, entered when the button is held at power-on.
//!
//! Pure logic, no hardware dependencies. The firmware samples the button
//! level, feeds it to [`GestureDetector::tick`] and hands any gesture to
//! [`SetupSession::handle`].
//!
//! # Gestures
//!
//! - **Click**: device id +1, 10 wraps to 1
//! - **Double click**: rotation +1, 3 wraps to 0
//! - **Long press** (≥ 2 s): commit id and rotation, save, restart

use crate::config::{ConfigPersist, DeviceConfig, StorageError, DEVICE_ID_MAX, DEVICE_ID_MIN, ROTATION_MAX};
use crate::tally_info;

/// Second press must start within this long after the first release.
pub const DOUBLE_CLICK_MS: u64 = 300;

/// Hold time that commits.
pub const LONG_PRESS_MS: u64 = 2_000;

/// How long the green confirmation stays up before restarting.
pub const COMMIT_FLASH_MS: u32 = 500;

/// Classified button gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gesture {
    Click,
    DoubleClick,
    LongPress,
}

/// Detector state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    /// Released, nothing pending
    Idle,
    /// Held since `since`; `second` if this is the second press of a pair
    Held { since: u64, second: bool, long_fired: bool },
    /// Released after one click, waiting to see if another follows
    AwaitSecond { released: u64 },
}

/// Turns sampled button levels into gestures.
pub struct GestureDetector {
    state: State,
}

impl GestureDetector {
    pub const fn new() -> Self {
        Self { state: State::Idle }
    }

    /// Feed the current level. At most one gesture is reported per call.
    ///
    /// A single click is only reported once the double click window has
    /// passed, so a double click never also produces a click.
    pub fn tick(&mut self, now_ms: u64, pressed: bool) -> Option<Gesture> {
        match (self.state, pressed) {
            (State::Idle, true) => {
                self.state = State::Held { since: now_ms, second: false, long_fired: false };
                None
            }
            (State::Idle, false) => None,

            (State::Held { since, second, long_fired }, true) => {
                if !long_fired && now_ms.saturating_sub(since) >= LONG_PRESS_MS {
                    self.state = State::Held { since, second, long_fired: true };
                    return Some(Gesture::LongPress);
                }
                None
            }
            (State::Held { long_fired: true, .. }, false) => {
                self.state = State::Idle;
                None
            }
            (State::Held { second: true, .. }, false) => {
                self.state = State::Idle;
                Some(Gesture::DoubleClick)
            }
            (State::Held { .. }, false) => {
                self.state = State::AwaitSecond { released: now_ms };
                None
            }

            (State::AwaitSecond { released }, true) => {
                if now_ms.saturating_sub(released) <= DOUBLE_CLICK_MS {
                    self.state = State::Held { since: now_ms, second: true, long_fired: false };
                    None
                } else {
                    // Window passed unobserved; the first click stands alone
                    self.state = State::Held { since: now_ms, second: false, long_fired: false };
                    Some(Gesture::Click)
                }
            }
            (State::AwaitSecond { released }, false) => {
                if now_ms.saturating_sub(released) > DOUBLE_CLICK_MS {
                    self.state = State::Idle;
                    return Some(Gesture::Click);
                }
                None
            }
        }
    }

    pub fn reset(&mut self) {
        self.state = State::Idle;
    }
}

impl Default for GestureDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// What the caller must do after a gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetupStep {
    /// Candidate changed; redraw the number with the candidate rotation
    Redraw,
    /// Long press: persist with [`SetupSession::commit`], flash green, restart
    Commit,
}

/// Candidate id and rotation being edited.
pub struct SetupSession {
    config: DeviceConfig,
    device_id: i32,
    rotation: u8,
}

impl SetupSession {
    /// Start from the loaded configuration.
    pub fn new(config: DeviceConfig) -> Self {
        let device_id = config.device_id.clamp(DEVICE_ID_MIN, DEVICE_ID_MAX);
        let rotation = config.rotation.min(ROTATION_MAX);
        Self { config, device_id, rotation }
    }

    pub fn device_id(&self) -> i32 {
        self.device_id
    }

    pub fn rotation(&self) -> u8 {
        self.rotation
    }

    pub fn handle(&mut self, gesture: Gesture) -> SetupStep {
        match gesture {
            Gesture::Click => {
                self.device_id = if self.device_id >= DEVICE_ID_MAX {
                    DEVICE_ID_MIN
                } else {
                    self.device_id + 1
                };
                SetupStep::Redraw
            }
            Gesture::DoubleClick => {
                self.rotation = if self.rotation >= ROTATION_MAX { 0 } else { self.rotation + 1 };
                SetupStep::Redraw
            }
            Gesture::LongPress => SetupStep::Commit,
        }
    }

    /// Write the candidates into the configuration and persist it.
    pub fn commit<P: ConfigPersist + ?Sized>(&self, store: &mut P) -> Result<DeviceConfig, StorageError> {
        let mut config = self.config.clone();
        config.device_id = self.device_id;
        config.rotation = self.rotation;
        store.save(&config)?;
        tally_info!("setup: id {} rotation {} saved", self.device_id, self.rotation);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(detector: &mut GestureDetector, samples: &[(u64, bool)]) -> std::vec::Vec<Gesture> {
        samples
            .iter()
            .filter_map(|&(t, level)| detector.tick(t, level))
            .collect()
    }

    #[test]
    fn test_single_click_after_window() {
        let mut d = GestureDetector::new();
        let got = run(&mut d, &[(0, true), (80, false), (200, false), (381, false)]);
        assert_eq!(got, [Gesture::Click]);
    }

    #[test]
    fn test_double_click() {
        let mut d = GestureDetector::new();
        let got = run(&mut d, &[(0, true), (80, false), (250, true), (320, false), (1000, false)]);
        assert_eq!(got, [Gesture::DoubleClick]);
    }

    #[test]
    fn test_long_press_fires_once() {
        let mut d = GestureDetector::new();
        let got = run(&mut d, &[(0, true), (1999, true), (2000, true), (2500, true), (2600, false), (3000, false)]);
        assert_eq!(got, [Gesture::LongPress]);
    }

    #[test]
    fn test_wraps() {
        let mut cfg = DeviceConfig::factory_default();
        cfg.device_id = 10;
        cfg.rotation = 3;
        let mut s = SetupSession::new(cfg);

        assert_eq!(s.handle(Gesture::Click), SetupStep::Redraw);
        assert_eq!(s.device_id(), 1);
        s.handle(Gesture::DoubleClick);
        assert_eq!(s.rotation(), 0);
        assert_eq!(s.handle(Gesture::LongPress), SetupStep::Commit);
    }
}
