//! Tally decision engine.
//!
//! Merges broadcast tiers and call announcements into one authoritative
//! state and combines it with the operator override.
//!
//! # Rules
//!
//! - Tier broadcasts always apply; a missing key counts as tier `0`.
//! - Call announcements apply only when `cam` equals this device's id.
//!   Call ON → `Call`; call OFF → `Off` (the previous tier is not restored;
//!   the next broadcast fixes it).
//! - Every applied event clears the override, even if the resulting state
//!   equals the forced one.
//! - A payload that fails to decode changes nothing.

use super::event::{self, CallAnnouncement, TallyEvent, TierMap, Topic};
use super::state::{resolve, DisplayState, Override, OverrideCell};
use crate::{tally_debug, tally_info, tally_warn};

/// Result of offering an event to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applied {
    /// Event targeted this device; authoritative state recomputed
    Updated {
        previous: DisplayState,
        current: DisplayState,
    },
    /// Call announcement for another device
    Ignored,
    /// Payload could not be decoded
    Dropped,
}

/// Authoritative state plus the override cell it owns.
pub struct TallyEngine {
    authoritative: DisplayState,
    override_cell: OverrideCell,
}

impl TallyEngine {
    pub const fn new() -> Self {
        Self {
            authoritative: DisplayState::Off,
            override_cell: OverrideCell::new(),
        }
    }

    /// State derived purely from bus events.
    pub fn authoritative(&self) -> DisplayState {
        self.authoritative
    }

    pub fn override_state(&self) -> Override {
        self.override_cell.get()
    }

    /// Handle for operator writes (`force ...`).
    pub fn override_cell(&self) -> &OverrideCell {
        &self.override_cell
    }

    /// What the indicator shows this tick. Pure: no state is touched.
    pub fn effective(&self) -> DisplayState {
        resolve(self.override_cell.get(), self.authoritative)
    }

    /// Decode and apply a raw message.
    ///
    /// Bounded in time and never blocks; failures are logged and dropped.
    pub fn handle_message(&mut self, topic: Topic, payload: &[u8], device_id: i32) -> Applied {
        match event::decode(topic, payload) {
            Ok(event) => self.apply(&event, device_id),
            Err(e) => {
                tally_warn!("{}: {} ({} bytes)", topic.name(), e, payload.len());
                Applied::Dropped
            }
        }
    }

    pub fn apply(&mut self, event: &TallyEvent, device_id: i32) -> Applied {
        let next = match event {
            TallyEvent::Tiers(tiers) => Some(tier_state(tiers, device_id)),
            TallyEvent::Call(call) => call_state(call, device_id),
        };

        let Some(current) = next else {
            tally_debug!("call for other device ignored");
            return Applied::Ignored;
        };

        let previous = self.authoritative;
        self.authoritative = current;

        let cleared = self.override_cell.clear();
        if cleared.is_active() {
            tally_info!("override {} cleared by bus update", cleared);
        }
        if previous != current {
            tally_info!("tally {} -> {}", previous, current);
        }

        Applied::Updated { previous, current }
    }
}

impl Default for TallyEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn tier_state(tiers: &TierMap, device_id: i32) -> DisplayState {
    DisplayState::from_tier(tiers.tier_for(device_id))
}

fn call_state(call: &CallAnnouncement, device_id: i32) -> Option<DisplayState> {
    if call.target != Some(i64::from(device_id)) {
        return None;
    }
    Some(if call.active {
        DisplayState::Call
    } else {
        DisplayState::Off
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let engine = TallyEngine::new();
        assert_eq!(engine.authoritative(), DisplayState::Off);
        assert_eq!(engine.override_state(), Override::Inactive);
        assert_eq!(engine.effective(), DisplayState::Off);
    }

    #[test]
    fn test_call_end_goes_off_not_back_to_tier() {
        let mut engine = TallyEngine::new();
        engine.handle_message(Topic::TallyState, br#"{"2":2}"#, 2);
        engine.handle_message(Topic::Call, br#"{"cam":2,"state":"ON"}"#, 2);
        assert_eq!(engine.authoritative(), DisplayState::Call);

        engine.handle_message(Topic::Call, br#"{"cam":2,"state":"OFF"}"#, 2);
        assert_eq!(engine.authoritative(), DisplayState::Off);
    }

    #[test]
    fn test_malformed_leaves_state() {
        let mut engine = TallyEngine::new();
        engine.handle_message(Topic::TallyState, br#"{"1":1}"#, 1);
        engine.override_cell().set(Override::Active(DisplayState::Program));

        assert_eq!(engine.handle_message(Topic::TallyState, b"{oops", 1), Applied::Dropped);
        assert_eq!(engine.authoritative(), DisplayState::Preview);
        assert_eq!(engine.override_state(), Override::Active(DisplayState::Program));
    }
}
