//! # RustTallyLight
//!
//! Camera tally light firmware for the M5 Atom Matrix.
//!
//! ## Architecture
//!
//! The device subscribes to switcher tally broadcasts and intercom call
//! announcements, folds them into one [`DisplayState`] and shows it on a
//! 5×5 RGB matrix plus three discrete LEDs. A serial console edits and
//! persists the configuration and can force the indicator.
//!
//! - [`tally`]: event decoding and the state engine (pure logic)
//! - [`config`]: persisted device record with self-healing load
//! - [`console`]: line-oriented command console
//! - [`transport`] / [`display`]: collaborator contracts for the bus and the indicator
//! - [`node`]: run-mode tick tying the above together
//! - [`setup_mode`]: button gestures for on-device id/rotation setup
//!
//! Hardware drivers live in the binary; everything here runs on the host.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod console;
pub mod display;
pub mod log_globals;
pub mod logging;
pub mod node;
pub mod setup_mode;
pub mod tally;
pub mod transport;

pub use config::{ConfigStore, DeviceConfig};
pub use log_globals::LOG_STREAM;
pub use node::TallyNode;
pub use tally::{DisplayState, Override, TallyEngine};
