//! Run mode: one tally device driven by a periodic tick.
//!
//! Everything except the transport's receive path runs on the tick, so the
//! console, engine and renderer never race. The transport only enqueues.

use core::fmt::Write;
use core::net::Ipv4Addr;

use crate::config::{ConfigStorage, ConfigStore, DeviceConfig};
use crate::console::{CommandContext, Console, SystemAction};
use crate::display::DisplaySink;
use crate::tally::{Applied, DisplayState, TallyEngine};
use crate::transport::{ensure_connected, Delay, LinkIndicator, LinkStatus, Transport};
use crate::LOG_STREAM;

/// Upper bound on bus messages handled per tick, so a flood cannot starve
/// the console or the renderer.
pub const MAX_MESSAGES_PER_TICK: usize = 16;

/// Device state for run mode.
pub struct TallyNode<S> {
    store: ConfigStore<S>,
    config: DeviceConfig,
    engine: TallyEngine,
    console: Console,
    ip: Option<Ipv4Addr>,
    shown: Option<DisplayState>,
}

impl<S: ConfigStorage> TallyNode<S> {
    /// Load (or self-heal) the configuration and start with everything Off.
    pub fn boot(storage: S) -> Self {
        let mut store = ConfigStore::new(storage);
        let config = store.load();
        Self {
            store,
            config,
            engine: TallyEngine::new(),
            console: Console::new(),
            ip: None,
            shown: None,
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn engine(&self) -> &TallyEngine {
        &self.engine
    }

    pub fn store(&self) -> &ConfigStore<S> {
        &self.store
    }

    /// Give the storage back, as a restart does.
    pub fn into_storage(self) -> S {
        self.store.into_storage()
    }

    /// Address acquired by the network layer, shown by `status`.
    pub fn set_ip(&mut self, ip: Option<Ipv4Addr>) {
        self.ip = ip;
    }

    pub fn print_banner(&self, out: &mut dyn Write) {
        self.console.print_banner(out);
    }

    /// Feed console input. Returns the first system action requested.
    pub fn feed_console(&mut self, input: &[u8], broker_connected: bool, out: &mut dyn Write) -> Option<SystemAction> {
        let mut ctx = CommandContext {
            config: &mut self.config,
            store: &mut self.store,
            override_cell: self.engine.override_cell(),
            authoritative: self.engine.authoritative(),
            link: LinkStatus { ip: self.ip, broker_connected },
            action: None,
        };

        for &byte in input {
            self.console.process_byte(byte, &mut ctx, out);
            if ctx.action.is_some() {
                break;
            }
        }
        ctx.action
    }

    /// Offer one bus message to the engine, keyed by the current device id.
    pub fn deliver(&mut self, topic: crate::tally::Topic, payload: &[u8]) -> Applied {
        self.engine.handle_message(topic, payload, self.config.device_id)
    }

    /// One pass of the main loop.
    ///
    /// Order: console input, pending action, connection upkeep (blocks while
    /// the broker is unreachable), inbound messages, render, log drain.
    pub fn tick<T, D, P>(
        &mut self,
        input: &[u8],
        transport: &mut T,
        delay: &mut D,
        panel: &mut P,
        out: &mut dyn Write,
    ) -> Option<SystemAction>
    where
        T: Transport + ?Sized,
        D: Delay + ?Sized,
        P: DisplaySink + LinkIndicator + ?Sized,
    {
        if let Some(action) = self.feed_console(input, transport.is_connected(), out) {
            LOG_STREAM.drain_to(out);
            return Some(action);
        }

        ensure_connected(transport, delay, panel);

        for _ in 0..MAX_MESSAGES_PER_TICK {
            let Some(msg) = transport.poll() else {
                break;
            };
            self.deliver(msg.topic, &msg.payload);
        }

        let state = self.engine.effective();
        panel.render(state);
        self.shown = Some(state);

        LOG_STREAM.drain_to(out);
        None
    }

    /// Last state handed to the renderer.
    pub fn shown(&self) -> Option<DisplayState> {
        self.shown
    }
}
