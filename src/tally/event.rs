//! Bus payload decoding.
//!
//! Two topics are consumed:
//! - `atem/tally/state`: `{"1": 2, "2": 1, ...}`, device index → tier
//! - `companion/call`: `{"cam": 3, "state": "ON"}`

use alloc::string::String;

use serde::Deserialize;
use serde_json::{Map, Value};

/// Tally broadcast topic.
pub const TALLY_STATE_TOPIC: &str = "atem/tally/state";

/// Call announcement topic.
pub const CALL_TOPIC: &str = "companion/call";

/// Topics the engine consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topic {
    TallyState,
    Call,
}

impl Topic {
    pub const ALL: [Topic; 2] = [Topic::TallyState, Topic::Call];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            TALLY_STATE_TOPIC => Some(Topic::TallyState),
            CALL_TOPIC => Some(Topic::Call),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Topic::TallyState => TALLY_STATE_TOPIC,
            Topic::Call => CALL_TOPIC,
        }
    }
}

/// Decoded inbound event.
#[derive(Clone, Debug, PartialEq)]
pub enum TallyEvent {
    /// Global broadcast of every device's tier
    Tiers(TierMap),
    /// Call started or ended for one device
    Call(CallAnnouncement),
}

/// Payload decode failures. The event is dropped; state is untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    UnknownTopic,
    /// Not valid JSON, or not the expected shape
    Malformed,
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownTopic => f.write_str("unknown topic"),
            Self::Malformed => f.write_str("malformed payload"),
        }
    }
}

/// Broadcast mapping from decimal device index to tier.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TierMap {
    entries: Map<String, Value>,
}

impl TierMap {
    /// Tier for a device; absent or non-integer values read as `0`.
    pub fn tier_for(&self, device_id: i32) -> i64 {
        let mut key = heapless::String::<12>::new();
        let _ = core::fmt::Write::write_fmt(&mut key, format_args!("{}", device_id));
        self.entries
            .get(key.as_str())
            .and_then(Value::as_i64)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<const N: usize> From<[(i32, i64); N]> for TierMap {
    fn from(pairs: [(i32, i64); N]) -> Self {
        let entries = pairs
            .into_iter()
            .map(|(id, tier)| (alloc::format!("{}", id), Value::from(tier)))
            .collect();
        Self { entries }
    }
}

/// Call state for one device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallAnnouncement {
    /// `None` when the payload names no usable device index.
    pub target: Option<i64>,
    pub active: bool,
}

#[derive(Deserialize)]
struct CallPayload {
    #[serde(default)]
    cam: Value,
    #[serde(default)]
    state: Value,
}

/// Decode a message for `topic`.
pub fn decode(topic: Topic, payload: &[u8]) -> Result<TallyEvent, DecodeError> {
    match topic {
        Topic::TallyState => {
            let value: Value =
                serde_json::from_slice(payload).map_err(|_| DecodeError::Malformed)?;
            match value {
                Value::Object(entries) => Ok(TallyEvent::Tiers(TierMap { entries })),
                _ => Err(DecodeError::Malformed),
            }
        }
        Topic::Call => {
            let call: CallPayload =
                serde_json::from_slice(payload).map_err(|_| DecodeError::Malformed)?;
            Ok(TallyEvent::Call(CallAnnouncement {
                target: call.cam.as_i64(),
                active: call.state.as_str() == Some("ON"),
            }))
        }
    }
}

/// Decode a message by topic name.
pub fn decode_named(topic: &str, payload: &[u8]) -> Result<TallyEvent, DecodeError> {
    let topic = Topic::from_name(topic).ok_or(DecodeError::UnknownTopic)?;
    decode(topic, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_tiers() {
        let event = decode(Topic::TallyState, br#"{"1":2,"3":1}"#).unwrap();
        let TallyEvent::Tiers(tiers) = event else {
            panic!("expected tiers");
        };
        assert_eq!(tiers.tier_for(1), 2);
        assert_eq!(tiers.tier_for(3), 1);
        assert_eq!(tiers.tier_for(2), 0);
    }

    #[test]
    fn test_non_integer_tier_reads_zero() {
        let event = decode(Topic::TallyState, br#"{"4":"2","5":null}"#).unwrap();
        let TallyEvent::Tiers(tiers) = event else {
            panic!("expected tiers");
        };
        assert_eq!(tiers.tier_for(4), 0);
        assert_eq!(tiers.tier_for(5), 0);
    }

    #[test]
    fn test_tiers_must_be_object() {
        assert_eq!(decode(Topic::TallyState, b"[1,2]"), Err(DecodeError::Malformed));
        assert_eq!(decode(Topic::TallyState, b"{\"1\":"), Err(DecodeError::Malformed));
        assert_eq!(decode(Topic::TallyState, b""), Err(DecodeError::Malformed));
    }

    #[test]
    fn test_decode_call() {
        let event = decode(Topic::Call, br#"{"cam":3,"state":"ON"}"#).unwrap();
        assert_eq!(
            event,
            TallyEvent::Call(CallAnnouncement {
                target: Some(3),
                active: true
            })
        );

        let event = decode(Topic::Call, br#"{"cam":3,"state":"OFF"}"#).unwrap();
        assert_eq!(
            event,
            TallyEvent::Call(CallAnnouncement {
                target: Some(3),
                active: false
            })
        );
    }

    #[test]
    fn test_call_without_cam_targets_nobody() {
        let event = decode(Topic::Call, br#"{"state":"ON"}"#).unwrap();
        assert_eq!(
            event,
            TallyEvent::Call(CallAnnouncement {
                target: None,
                active: true
            })
        );
    }

    #[test]
    fn test_call_must_be_object() {
        assert_eq!(decode(Topic::Call, b"\"ON\""), Err(DecodeError::Malformed));
    }

    #[test]
    fn test_topic_names() {
        for topic in Topic::ALL {
            assert_eq!(Topic::from_name(topic.name()), Some(topic));
        }
        assert_eq!(decode_named("other/topic", b"{}"), Err(DecodeError::UnknownTopic));
    }
}
