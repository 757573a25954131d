//! MQTT transport over the ESP-IDF client.
//!
//! The client runs its own task and reconnects by itself. Its callback only
//! copies received messages into a bounded queue; the main tick drains it.
//! A session counts as usable once both topics were subscribed on it.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;

use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};
use esp_idf_svc::sys::EspError;

use rust_tally_light::config::BROKER_PORT;
use rust_tally_light::tally::Topic;
use rust_tally_light::transport::{InboundMessage, Transport, TransportError};
use rust_tally_light::{tally_debug, tally_info, tally_warn};

/// Inbound messages buffered between ticks.
pub const QUEUE_DEPTH: usize = 16;

/// How long one `connect` waits for the session to come up.
const CONNECT_WAIT_MS: u32 = 3_000;
const CONNECT_POLL_MS: u32 = 50;

#[derive(Default)]
struct Session {
    connected: AtomicBool,
    /// Bumped on every broker connect
    generation: AtomicU32,
}

pub struct MqttTransport {
    client: EspMqttClient<'static>,
    session: Arc<Session>,
    subscribed_generation: Option<u32>,
    rx: Receiver<InboundMessage>,
}

impl MqttTransport {
    pub fn new(broker: &str) -> Result<Self, EspError> {
        // SAFETY: hardware RNG read, no shared state
        let suffix = unsafe { esp_idf_svc::sys::esp_random() } & 0xFFFF;
        let client_id = format!("M5-Tally-{:x}", suffix);
        let url = format!("mqtt://{}:{}", broker, BROKER_PORT);

        let session = Arc::new(Session::default());
        let (tx, rx) = mpsc::sync_channel(QUEUE_DEPTH);

        let conf = MqttClientConfiguration {
            client_id: Some(&client_id),
            ..Default::default()
        };
        let cb_session = session.clone();
        let client = EspMqttClient::new_cb(&url, &conf, move |event| {
            on_event(event.payload(), &cb_session, &tx);
        })?;

        tally_info!("mqtt: {} as {}", url, client_id);
        Ok(Self {
            client,
            session,
            subscribed_generation: None,
            rx,
        })
    }
}

fn on_event(payload: EventPayload<'_, EspError>, session: &Session, tx: &SyncSender<InboundMessage>) {
    match payload {
        EventPayload::Connected(_) => {
            session.generation.fetch_add(1, Ordering::AcqRel);
            session.connected.store(true, Ordering::Release);
        }
        EventPayload::Disconnected => {
            session.connected.store(false, Ordering::Release);
        }
        EventPayload::Received { topic: Some(topic), data, .. } => {
            let Some(msg) = InboundMessage::new(topic, data) else {
                tally_warn!("mqtt: dropped {} ({} bytes)", topic, data.len());
                return;
            };
            match tx.try_send(msg) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => tally_warn!("mqtt: queue full, dropped {}", topic),
                Err(TrySendError::Disconnected(_)) => {}
            }
        }
        EventPayload::Error(e) => tally_debug!("mqtt: {}", e),
        _ => {}
    }
}

impl Transport for MqttTransport {
    fn is_connected(&self) -> bool {
        self.session.connected.load(Ordering::Acquire)
            && self.subscribed_generation == Some(self.session.generation.load(Ordering::Acquire))
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        let mut waited = 0;
        while !self.session.connected.load(Ordering::Acquire) {
            if waited >= CONNECT_WAIT_MS {
                return Err(TransportError::ConnectFailed);
            }
            FreeRtos::delay_ms(CONNECT_POLL_MS);
            waited += CONNECT_POLL_MS;
        }

        let generation = self.session.generation.load(Ordering::Acquire);
        for topic in Topic::ALL {
            self.client
                .subscribe(topic.name(), QoS::AtMostOnce)
                .map_err(|_| TransportError::NotConnected)?;
        }
        self.subscribed_generation = Some(generation);
        Ok(())
    }

    fn poll(&mut self) -> Option<InboundMessage> {
        self.rx.try_recv().ok()
    }
}
