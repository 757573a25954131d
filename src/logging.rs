//! Non-blocking diagnostic logging.
//!
//! # Architecture
//!
//! ```text
//! MQTT task / tick          LogStream              Main tick
//! ────────────────          ─────────              ─────────
//!
//! tally_warn!() ───────▶ [L0][L1][L2] ───────▶ console output
//! non-blocking             lock-free ring        drain_to()
//! drops when full          fixed entries         blocking ok
//! ```
//!
//! Event handling runs in the transport's execution context and must stay
//! bounded in time, so it never writes to the console directly: it pushes an
//! entry here and the main tick prints it later.

use core::cell::UnsafeCell;
use core::fmt::Write;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

/// Maximum message length.
pub const MAX_MSG_LEN: usize = 120;

/// Log buffer size (number of entries).
pub const LOG_BUFFER_SIZE: usize = 64;

/// Log level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    /// Convert to string for output.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    /// Parse a console level name (`error`, `warn`, `info`, `debug`, `trace`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "error" => Some(LogLevel::Error),
            "warn" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

/// A single log entry.
#[derive(Clone, Copy)]
pub struct LogEntry {
    /// Monotonic sequence number assigned at push time.
    pub seq: u32,
    pub level: LogLevel,
    /// Message length.
    pub len: u8,
    /// Message bytes (not null-terminated).
    pub msg: [u8; MAX_MSG_LEN],
}

impl LogEntry {
    const EMPTY: LogEntry = LogEntry {
        seq: 0,
        level: LogLevel::Info,
        len: 0,
        msg: [0; MAX_MSG_LEN],
    };

    /// Message text, cut at the first invalid UTF-8 sequence.
    pub fn message(&self) -> &str {
        let bytes = &self.msg[..self.len as usize];
        match core::str::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default(),
        }
    }
}

impl Default for LogEntry {
    fn default() -> Self {
        Self::EMPTY
    }
}

struct Slot {
    ready: AtomicBool,
    entry: UnsafeCell<LogEntry>,
}

/// Lock-free log ring: multiple producers, one consumer at a time.
///
/// Producers reserve a slot with `fetch_add` and publish it through the
/// slot's `ready` flag, so the consumer never reads a half-written entry.
pub struct LogStream<const N: usize = LOG_BUFFER_SIZE> {
    slots: [Slot; N],
    write_idx: AtomicU32,
    read_idx: AtomicU32,
    dropped: AtomicU32,
    max_level: AtomicU8,
    /// Held by the caller currently draining
    draining: AtomicBool,
}

// SAFETY: a slot is written only by the producer that reserved its index and
// read only by the one consumer holding `draining`, after `ready` is observed
// with Acquire.
unsafe impl<const N: usize> Sync for LogStream<N> {}
unsafe impl<const N: usize> Send for LogStream<N> {}

impl<const N: usize> LogStream<N> {
    const MASK: usize = N - 1;

    /// Create a new empty log stream.
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "Log buffer size must be power of 2");

        #[allow(clippy::declare_interior_mutable_const)]
        const EMPTY_SLOT: Slot = Slot {
            ready: AtomicBool::new(false),
            entry: UnsafeCell::new(LogEntry::EMPTY),
        };

        Self {
            slots: [EMPTY_SLOT; N],
            write_idx: AtomicU32::new(0),
            read_idx: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            max_level: AtomicU8::new(LogLevel::Info as u8),
            draining: AtomicBool::new(false),
        }
    }

    /// Most verbose level currently accepted.
    pub fn max_level(&self) -> LogLevel {
        LogLevel::from_u8(self.max_level.load(Ordering::Relaxed))
    }

    pub fn set_max_level(&self, level: LogLevel) {
        self.max_level.store(level as u8, Ordering::Relaxed);
    }

    /// Whether an entry at `level` would be kept.
    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level <= self.max_level()
    }

    /// Push a log entry. Never blocks.
    ///
    /// Returns `true` if message was queued, `false` if filtered or dropped.
    pub fn push(&self, level: LogLevel, msg: &[u8]) -> bool {
        if !self.enabled(level) {
            return false;
        }

        // Reserve a slot only if the ring has room; a failed reservation
        // leaves write_idx untouched.
        let mut write = self.write_idx.load(Ordering::Relaxed);
        loop {
            let read = self.read_idx.load(Ordering::Acquire);
            if write.wrapping_sub(read) >= N as u32 {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return false;
            }
            match self.write_idx.compare_exchange_weak(
                write,
                write.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => write = current,
            }
        }

        let slot = &self.slots[(write as usize) & Self::MASK];

        // SAFETY: this producer owns index `write` until it sets `ready`.
        unsafe {
            let entry = &mut *slot.entry.get();
            entry.seq = write;
            entry.level = level;
            entry.len = msg.len().min(MAX_MSG_LEN) as u8;
            entry.msg[..entry.len as usize].copy_from_slice(&msg[..entry.len as usize]);
        }
        slot.ready.store(true, Ordering::Release);
        true
    }

    /// Take the oldest published entry, if any.
    ///
    /// Returns `None` while another caller is draining.
    pub fn drain(&self) -> Option<LogEntry> {
        if self.draining.swap(true, Ordering::Acquire) {
            return None;
        }
        let entry = self.take_next();
        self.draining.store(false, Ordering::Release);
        entry
    }

    fn take_next(&self) -> Option<LogEntry> {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);
        if read == write {
            return None;
        }

        let slot = &self.slots[(read as usize) & Self::MASK];
        if !slot.ready.load(Ordering::Acquire) {
            // Reserved but still being written
            return None;
        }

        // SAFETY: `draining` admits one consumer, slot published by its producer.
        let entry = unsafe { *slot.entry.get() };
        slot.ready.store(false, Ordering::Relaxed);
        self.read_idx.store(read.wrapping_add(1), Ordering::Release);
        Some(entry)
    }

    /// Count of dropped messages.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Read and zero the dropped counter.
    #[inline]
    pub fn take_dropped(&self) -> u32 {
        self.dropped.swap(0, Ordering::Relaxed)
    }

    /// Number of entries waiting to be drained.
    #[inline]
    pub fn pending(&self) -> u32 {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }

    /// Print every pending entry, one line each, then report drops.
    ///
    /// Runs on the main tick; the writer may block.
    pub fn drain_to(&self, out: &mut dyn Write) -> usize {
        let mut count = 0;
        while let Some(entry) = self.drain() {
            let _ = write_entry(&entry, out);
            count += 1;
        }
        let dropped = self.take_dropped();
        if dropped > 0 {
            let _ = writeln!(out, "[WARN] dropped: {}", dropped);
        }
        count
    }
}

impl<const N: usize> Default for LogStream<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Format: `#<seq> LEVEL: message`
pub fn write_entry(entry: &LogEntry, out: &mut dyn Write) -> core::fmt::Result {
    writeln!(out, "#{:05} {}: {}", entry.seq, entry.level.as_str(), entry.message())
}

/// Format a message into a buffer.
///
/// Returns the number of bytes written; overflow is truncated.
#[inline]
pub fn format_to_buffer(buf: &mut [u8], args: core::fmt::Arguments<'_>) -> usize {
    struct BufWriter<'a> {
        buf: &'a mut [u8],
        pos: usize,
        truncated: bool,
    }

    impl<'a> Write for BufWriter<'a> {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            if self.truncated {
                return Ok(());
            }
            let bytes = s.as_bytes();
            let remaining = self.buf.len() - self.pos;
            let mut to_write = bytes.len().min(remaining);
            while !s.is_char_boundary(to_write) {
                to_write -= 1;
            }
            self.buf[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
            self.pos += to_write;
            // Nothing is appended after a cut
            self.truncated = to_write < bytes.len();
            Ok(())
        }
    }

    let mut writer = BufWriter { buf, pos: 0, truncated: false };
    let _ = core::fmt::write(&mut writer, args);
    writer.pos
}

/// Log to the global [`LOG_STREAM`](crate::LOG_STREAM).
///
/// ```ignore
/// tally_log!(LogLevel::Warn, "dropped payload on {}", topic);
/// ```
#[macro_export]
macro_rules! tally_log {
    ($level:expr, $($arg:tt)*) => {{
        let level = $level;
        if $crate::LOG_STREAM.enabled(level) {
            let mut buf = [0u8; $crate::logging::MAX_MSG_LEN];
            let len = $crate::logging::format_to_buffer(&mut buf, format_args!($($arg)*));
            $crate::LOG_STREAM.push(level, &buf[..len]);
        }
    }};
}

#[macro_export]
macro_rules! tally_error {
    ($($arg:tt)*) => {
        $crate::tally_log!($crate::logging::LogLevel::Error, $($arg)*)
    };
}

#[macro_export]
macro_rules! tally_warn {
    ($($arg:tt)*) => {
        $crate::tally_log!($crate::logging::LogLevel::Warn, $($arg)*)
    };
}

#[macro_export]
macro_rules! tally_info {
    ($($arg:tt)*) => {
        $crate::tally_log!($crate::logging::LogLevel::Info, $($arg)*)
    };
}

#[macro_export]
macro_rules! tally_debug {
    ($($arg:tt)*) => {
        $crate::tally_log!($crate::logging::LogLevel::Debug, $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sink(std::string::String);

    impl Write for Sink {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            self.0.push_str(s);
            Ok(())
        }
    }

    #[test]
    fn test_format_truncates_on_char_boundary() {
        let mut buf = [0u8; MAX_MSG_LEN];
        let long = "a".repeat(MAX_MSG_LEN - 1);
        let len = format_to_buffer(&mut buf, format_args!("{}é", long));
        assert_eq!(len, MAX_MSG_LEN - 1);

        let stream = LogStream::<4>::new();
        stream.push(LogLevel::Warn, &buf[..len]);
        assert_eq!(stream.drain().unwrap().message(), long);
    }

    #[test]
    fn test_format_stops_after_cut() {
        let mut buf = [0u8; 4];
        let len = format_to_buffer(&mut buf, format_args!("abc{}{}", "é", "d"));
        assert_eq!(&buf[..len], b"abc");
    }

    #[test]
    fn test_message_keeps_valid_prefix() {
        let stream = LogStream::<4>::new();
        stream.push(LogLevel::Info, &[b'o', b'k', 0xC3]);
        assert_eq!(stream.drain().unwrap().message(), "ok");
    }

    #[test]
    fn test_log_stream_basic() {
        let stream = LogStream::<16>::new();

        assert!(stream.push(LogLevel::Info, b"test message"));
        assert_eq!(stream.pending(), 1);

        let entry = stream.drain().unwrap();
        assert_eq!(entry.seq, 0);
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.message(), "test message");

        assert!(stream.drain().is_none());
    }

    #[test]
    fn test_log_stream_full() {
        let stream = LogStream::<4>::new();

        for msg in [b"1", b"2", b"3", b"4"] {
            assert!(stream.push(LogLevel::Warn, msg));
        }

        assert!(!stream.push(LogLevel::Warn, b"5"));
        assert_eq!(stream.dropped(), 1);

        stream.drain();
        assert!(stream.push(LogLevel::Warn, b"6"));
    }

    #[test]
    fn test_level_filter() {
        let stream = LogStream::<4>::new();

        assert!(!stream.push(LogLevel::Debug, b"hidden"));
        stream.set_max_level(LogLevel::Debug);
        assert!(stream.push(LogLevel::Debug, b"shown"));
        assert_eq!(stream.dropped(), 0);
    }

    #[test]
    fn test_drain_to_formats_lines_and_drops() {
        let stream = LogStream::<2>::new();
        stream.push(LogLevel::Error, b"broker gone");
        stream.push(LogLevel::Info, b"x");
        stream.push(LogLevel::Info, b"lost");

        let mut out = Sink(std::string::String::new());
        assert_eq!(stream.drain_to(&mut out), 2);
        assert!(out.0.contains("#00000 ERROR: broker gone"));
        assert!(out.0.contains("dropped: 1"));
        assert_eq!(stream.dropped(), 0);
    }

    #[test]
    fn test_format_to_buffer_truncates() {
        let mut buf = [0u8; 8];
        let len = format_to_buffer(&mut buf, format_args!("Hello {}", 4242));
        assert_eq!(&buf[..len], b"Hello 42");
    }

    #[test]
    fn test_level_names() {
        assert_eq!(LogLevel::from_name("warn"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_name("WARN"), None);
        assert!(LogLevel::Error < LogLevel::Trace);
    }

    #[test]
    fn test_multiple_producers() {
        use std::sync::Arc;
        use std::thread;

        let stream = Arc::new(LogStream::<64>::new());
        let handles: std::vec::Vec<_> = (0..4)
            .map(|i| {
                let stream = Arc::clone(&stream);
                thread::spawn(move || {
                    for j in 0..10 {
                        let msg = std::format!("Thread {} msg {}", i, j);
                        stream.push(LogLevel::Info, msg.as_bytes());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let mut count = 0;
        while stream.drain().is_some() {
            count += 1;
        }
        assert_eq!(count, 40);
    }
}
