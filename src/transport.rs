//! Message-bus collaborator contract and the reconnect loop.
//!
//! The transport delivers raw `(topic, payload)` pairs; decoding happens in
//! the engine. Delivery from the transport's own context must only enqueue.

use core::net::Ipv4Addr;

use heapless::Vec;

use crate::tally::Topic;
use crate::{tally_info, tally_warn};

/// Largest payload kept; longer messages are dropped by the transport.
pub const MAX_PAYLOAD: usize = 512;

/// Sleep between failed connection attempts.
pub const RECONNECT_BACKOFF_MS: u32 = 5_000;

/// One message as received from the bus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: Topic,
    pub payload: Vec<u8, MAX_PAYLOAD>,
}

impl InboundMessage {
    /// Copy a received message; `None` if the topic is not ours or the
    /// payload does not fit.
    pub fn new(topic: &str, payload: &[u8]) -> Option<Self> {
        Some(Self {
            topic: Topic::from_name(topic)?,
            payload: Vec::from_slice(payload).ok()?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// Broker refused or unreachable
    ConnectFailed,
    /// Operation needs a live session
    NotConnected,
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ConnectFailed => f.write_str("connect failed"),
            Self::NotConnected => f.write_str("not connected"),
        }
    }
}

/// Topic subscription source.
pub trait Transport {
    fn is_connected(&self) -> bool;

    /// One connection attempt. On success both [`Topic::ALL`] are subscribed.
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Next queued message, without blocking.
    fn poll(&mut self) -> Option<InboundMessage>;
}

/// Blocking millisecond delay.
pub trait Delay {
    fn delay_ms(&mut self, ms: u32);
}

/// Called after each failed attempt, before the backoff sleep.
pub trait LinkIndicator {
    fn connect_failed(&mut self);
}

impl LinkIndicator for () {
    fn connect_failed(&mut self) {}
}

/// Block until the transport is connected.
///
/// Retries forever with a fixed [`RECONNECT_BACKOFF_MS`] sleep. Returns the
/// number of failed attempts.
pub fn ensure_connected<T, D, L>(transport: &mut T, delay: &mut D, indicator: &mut L) -> u32
where
    T: Transport + ?Sized,
    D: Delay + ?Sized,
    L: LinkIndicator + ?Sized,
{
    let mut failures = 0;
    while !transport.is_connected() {
        match transport.connect() {
            Ok(()) => {
                tally_info!("broker connected after {} retries", failures);
                break;
            }
            Err(e) => {
                failures += 1;
                tally_warn!("broker: {}, retry in {}s", e, RECONNECT_BACKOFF_MS / 1000);
                indicator.connect_failed();
                delay.delay_ms(RECONNECT_BACKOFF_MS);
            }
        }
    }
    failures
}

/// Network facts shown by `status`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkStatus {
    pub ip: Option<Ipv4Addr>,
    pub broker_connected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlakyBroker {
        failures_left: u32,
        connected: bool,
    }

    impl Transport for FlakyBroker {
        fn is_connected(&self) -> bool {
            self.connected
        }

        fn connect(&mut self) -> Result<(), TransportError> {
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(TransportError::ConnectFailed);
            }
            self.connected = true;
            Ok(())
        }

        fn poll(&mut self) -> Option<InboundMessage> {
            None
        }
    }

    struct RecordingDelay(std::vec::Vec<u32>);

    impl Delay for RecordingDelay {
        fn delay_ms(&mut self, ms: u32) {
            self.0.push(ms);
        }
    }

    #[test]
    fn test_backoff_per_failure() {
        let mut broker = FlakyBroker {
            failures_left: 3,
            connected: false,
        };
        let mut delay = RecordingDelay(std::vec::Vec::new());

        assert_eq!(ensure_connected(&mut broker, &mut delay, &mut ()), 3);
        assert!(broker.is_connected());
        assert_eq!(delay.0, [5_000, 5_000, 5_000]);
    }

    #[test]
    fn test_connected_is_noop() {
        let mut broker = FlakyBroker {
            failures_left: 0,
            connected: true,
        };
        let mut delay = RecordingDelay(std::vec::Vec::new());

        assert_eq!(ensure_connected(&mut broker, &mut delay, &mut ()), 0);
        assert!(delay.0.is_empty());
    }

    #[test]
    fn test_inbound_message_filters() {
        assert!(InboundMessage::new("companion/call", b"{}").is_some());
        assert!(InboundMessage::new("other", b"{}").is_none());
        assert!(InboundMessage::new("companion/call", &[b' '; MAX_PAYLOAD + 1]).is_none());
    }
}
