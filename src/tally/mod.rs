//! Tally state: display states, the override, bus decoding, and the engine.

pub mod engine;
pub mod event;
pub mod state;

pub use engine::{Applied, TallyEngine};
pub use event::{decode, CallAnnouncement, DecodeError, TallyEvent, TierMap, Topic};
pub use state::{resolve, DisplayState, Override, OverrideCell};
