//! Host runner: the run-mode tick against stdin/stdout.
//!
//! Lines starting with `<` inject a bus message (`< atem/tally/state {"1":2}`);
//! every other line goes to the console. The matrix is printed whenever
//! the shown state changes. `reboot` restarts the node from the same storage.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, BufRead, Write as _};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use rust_tally_light::config::{ConfigStorage, MemoryStorage};
use rust_tally_light::console::SystemAction;
use rust_tally_light::display::DisplaySink;
use rust_tally_light::tally::DisplayState;
use rust_tally_light::transport::{Delay, InboundMessage, LinkIndicator, Transport, TransportError};
use rust_tally_light::{tally_warn, TallyNode};

const TICK: Duration = Duration::from_millis(20);

struct Stdout;

impl fmt::Write for Stdout {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut out = io::stdout().lock();
        out.write_all(s.as_bytes()).map_err(|_| fmt::Error)?;
        out.flush().map_err(|_| fmt::Error)
    }
}

/// Always-connected bus fed from stdin.
#[derive(Default)]
struct LocalBus {
    queue: VecDeque<InboundMessage>,
}

impl Transport for LocalBus {
    fn is_connected(&self) -> bool {
        true
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn poll(&mut self) -> Option<InboundMessage> {
        self.queue.pop_front()
    }
}

struct SleepDelay;

impl Delay for SleepDelay {
    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms.into()));
    }
}

#[derive(Default)]
struct TextPanel {
    last: Option<DisplayState>,
}

impl DisplaySink for TextPanel {
    fn render(&mut self, state: DisplayState) {
        if self.last != Some(state) {
            println!("[matrix] {}", state);
            self.last = Some(state);
        }
    }
}

impl LinkIndicator for TextPanel {
    fn connect_failed(&mut self) {
        println!("[matrix] broker unreachable");
    }
}

fn inject(bus: &mut LocalBus, line: &str) {
    let mut parts = line.trim().splitn(2, char::is_whitespace);
    let topic = parts.next().unwrap_or("");
    let payload = parts.next().unwrap_or("").trim();
    match InboundMessage::new(topic, payload.as_bytes()) {
        Some(msg) => bus.queue.push_back(msg),
        None => tally_warn!("inject: unknown topic or oversized payload: {}", topic),
    }
}

fn boot<S: ConfigStorage>(storage: S, out: &mut Stdout) -> TallyNode<S> {
    let mut node = TallyNode::boot(storage);
    node.set_ip(Some(std::net::Ipv4Addr::LOCALHOST));
    node.print_banner(out);
    node
}

pub fn run() {
    let (tx, rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut out = Stdout;
    let mut bus = LocalBus::default();
    let mut panel = TextPanel::default();
    let mut node = boot(MemoryStorage::new(), &mut out);

    loop {
        let mut input = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(line) => match line.strip_prefix('<') {
                    Some(msg) => inject(&mut bus, msg),
                    None => {
                        input.extend_from_slice(line.as_bytes());
                        input.push(b'\n');
                    }
                },
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    node.tick(&input, &mut bus, &mut SleepDelay, &mut panel, &mut out);
                    return;
                }
            }
        }

        if let Some(SystemAction::Reboot) = node.tick(&input, &mut bus, &mut SleepDelay, &mut panel, &mut out) {
            println!("[restart]");
            panel = TextPanel::default();
            node = boot(node.into_storage(), &mut out);
        }

        thread::sleep(TICK);
    }
}
