//! Run-mode tick tests with scripted collaborators

use std::collections::VecDeque;

use rust_tally_light::config::{ConfigStorage, MemoryStorage};
use rust_tally_light::console::SystemAction;
use rust_tally_light::display::DisplaySink;
use rust_tally_light::tally::{DisplayState, Override};
use rust_tally_light::transport::{
    Delay, InboundMessage, LinkIndicator, Transport, TransportError, RECONNECT_BACKOFF_MS,
};
use rust_tally_light::TallyNode;

#[derive(Default)]
struct ScriptedBus {
    failures_left: u32,
    connected: bool,
    connects: u32,
    queue: VecDeque<InboundMessage>,
}

impl ScriptedBus {
    fn online() -> Self {
        Self {
            connected: true,
            ..Self::default()
        }
    }

    fn publish(&mut self, topic: &str, payload: &str) {
        self.queue
            .push_back(InboundMessage::new(topic, payload.as_bytes()).unwrap());
    }
}

impl Transport for ScriptedBus {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        self.connects += 1;
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(TransportError::ConnectFailed);
        }
        self.connected = true;
        Ok(())
    }

    fn poll(&mut self) -> Option<InboundMessage> {
        self.queue.pop_front()
    }
}

#[derive(Default)]
struct RecordingDelay(Vec<u32>);

impl Delay for RecordingDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.0.push(ms);
    }
}

#[derive(Default)]
struct RecordingPanel {
    frames: Vec<DisplayState>,
    link_failures: u32,
}

impl DisplaySink for RecordingPanel {
    fn render(&mut self, state: DisplayState) {
        self.frames.push(state);
    }
}

impl LinkIndicator for RecordingPanel {
    fn connect_failed(&mut self) {
        self.link_failures += 1;
    }
}

struct Rig {
    node: TallyNode<MemoryStorage>,
    bus: ScriptedBus,
    delay: RecordingDelay,
    panel: RecordingPanel,
    out: String,
}

impl Rig {
    fn new() -> Self {
        Self::with_storage(MemoryStorage::new())
    }

    fn with_storage(storage: MemoryStorage) -> Self {
        Self {
            node: TallyNode::boot(storage),
            bus: ScriptedBus::online(),
            delay: RecordingDelay::default(),
            panel: RecordingPanel::default(),
            out: String::new(),
        }
    }

    fn tick(&mut self, input: &str) -> Option<SystemAction> {
        self.node.tick(
            input.as_bytes(),
            &mut self.bus,
            &mut self.delay,
            &mut self.panel,
            &mut self.out,
        )
    }

    fn shown(&self) -> DisplayState {
        *self.panel.frames.last().unwrap()
    }
}

#[test]
fn test_boot_renders_off() {
    let mut rig = Rig::new();
    assert_eq!(rig.tick(""), None);
    assert_eq!(rig.shown(), DisplayState::Off);
    assert_eq!(rig.node.config().device_id, 1);
}

#[test]
fn test_render_every_tick() {
    let mut rig = Rig::new();
    rig.tick("");
    rig.tick("");
    rig.tick("");
    assert_eq!(rig.panel.frames, [DisplayState::Off; 3]);
}

#[test]
fn test_broadcast_reaches_display() {
    let mut rig = Rig::new();
    rig.bus.publish("atem/tally/state", r#"{"1":2,"2":1}"#);
    rig.tick("");
    assert_eq!(rig.shown(), DisplayState::Program);

    rig.bus.publish("atem/tally/state", r#"{"1":1}"#);
    rig.tick("");
    assert_eq!(rig.shown(), DisplayState::Preview);
}

#[test]
fn test_force_then_bus_update_clears() {
    let mut rig = Rig::new();
    rig.tick("force pgm\n");
    assert_eq!(rig.shown(), DisplayState::Program);
    assert_eq!(rig.node.engine().override_state(), Override::Active(DisplayState::Program));

    rig.bus.publish("atem/tally/state", r#"{"1":0}"#);
    rig.tick("");
    assert_eq!(rig.shown(), DisplayState::Off);
    assert_eq!(rig.node.engine().override_state(), Override::Inactive);
}

#[test]
fn test_call_for_other_device_keeps_override() {
    let mut rig = Rig::new();
    rig.tick("force pvw\n");
    rig.bus.publish("companion/call", r#"{"cam":3,"state":"ON"}"#);
    rig.tick("");

    assert_eq!(rig.shown(), DisplayState::Preview);
    assert_eq!(rig.node.engine().override_state(), Override::Active(DisplayState::Preview));
}

#[test]
fn test_new_id_applies_without_restart() {
    let mut rig = Rig::new();
    rig.tick("set id 7\n");
    rig.bus.publish("atem/tally/state", r#"{"1":1,"7":2}"#);
    rig.tick("");
    assert_eq!(rig.shown(), DisplayState::Program);

    rig.bus.publish("companion/call", r#"{"cam":7,"state":"ON"}"#);
    rig.tick("");
    assert_eq!(rig.shown(), DisplayState::Call);
}

#[test]
fn test_console_scenario_id_and_status() {
    let mut rig = Rig::new();
    rig.tick("set id 7\r\nset id 99\r\nstatus\r\n");

    assert!(rig.out.contains("OK. Camera ID set to: 7"));
    assert!(rig.out.contains("ERR E04"));
    assert!(rig.out.contains("Camera ID: 7"));
    assert_eq!(rig.node.config().device_id, 7);
}

#[test]
fn test_crlf_is_one_line() {
    let mut rig = Rig::new();
    rig.tick("status\r\n");
    assert_eq!(rig.out.matches("--- Tally Status ---").count(), 1);
    // No stray help from the LF half of the pair
    assert!(!rig.out.contains("Commands:"));
}

#[test]
fn test_bare_enter_prints_help() {
    let mut rig = Rig::new();
    rig.tick("\r");
    assert!(rig.out.contains("Commands:"));
}

#[test]
fn test_line_split_across_ticks() {
    let mut rig = Rig::new();
    rig.tick("force ");
    assert_eq!(rig.node.engine().override_state(), Override::Inactive);
    rig.tick("pgm\n");
    assert_eq!(rig.node.engine().override_state(), Override::Active(DisplayState::Program));
}

#[test]
fn test_reboot_returns_before_network_work() {
    let mut rig = Rig::new();
    rig.bus.connected = false;
    rig.bus.publish("atem/tally/state", r#"{"1":2}"#);

    assert_eq!(rig.tick("reboot\nforce pgm\n"), Some(SystemAction::Reboot));
    assert_eq!(rig.bus.connects, 0);
    assert_eq!(rig.bus.queue.len(), 1);
    // Input after the reboot line is not executed
    assert_eq!(rig.node.engine().override_state(), Override::Inactive);
}

#[test]
fn test_reconnect_backoff() {
    let mut rig = Rig::new();
    rig.bus = ScriptedBus {
        failures_left: 2,
        ..ScriptedBus::default()
    };
    rig.bus.publish("atem/tally/state", r#"{"1":1}"#);

    rig.tick("");

    assert_eq!(rig.bus.connects, 3);
    assert_eq!(rig.delay.0, [RECONNECT_BACKOFF_MS; 2]);
    assert_eq!(rig.panel.link_failures, 2);
    assert_eq!(rig.shown(), DisplayState::Preview);
}

#[test]
fn test_flood_is_bounded_per_tick() {
    let mut rig = Rig::new();
    for _ in 0..20 {
        rig.bus.publish("atem/tally/state", r#"{"1":1}"#);
    }
    rig.bus.publish("atem/tally/state", r#"{"1":2}"#);

    rig.tick("");
    assert_eq!(rig.shown(), DisplayState::Preview);
    rig.tick("");
    assert_eq!(rig.shown(), DisplayState::Program);
}

#[test]
fn test_save_survives_restart() {
    let mut rig = Rig::new();
    rig.tick("set id 4\nset rotation 1\nsave\n");

    let mut storage = rig.node.into_storage();
    let mut buf = [0u8; 512];
    assert!(storage.read(&mut buf).unwrap().is_some());

    let rig = Rig::with_storage(storage);
    assert_eq!(rig.node.config().device_id, 4);
    assert_eq!(rig.node.config().rotation, 1);
}

#[test]
fn test_unsaved_changes_lost_on_restart() {
    let mut rig = Rig::new();
    rig.tick("set id 4\n");
    assert_eq!(rig.tick("reboot\n"), Some(SystemAction::Reboot));

    let rig = Rig::with_storage(rig.node.into_storage());
    assert_eq!(rig.node.config().device_id, 1);
}
