//! Line buffer for console input

use heapless::String;

/// Maximum line length. Fits `set pass` with a 64-byte password.
pub const LINE_SIZE: usize = 128;

/// Line input buffer, printable ASCII only
pub struct LineBuffer {
    buf: String<LINE_SIZE>,
}

impl LineBuffer {
    /// Create empty buffer
    pub const fn new() -> Self {
        Self { buf: String::new() }
    }

    /// Append a printable ASCII byte.
    ///
    /// Returns `false` if the byte was refused (full or not printable).
    pub fn push(&mut self, c: u8) -> bool {
        if !(0x20..=0x7E).contains(&c) {
            return false;
        }
        self.buf.push(c as char).is_ok()
    }

    /// Remove last character
    pub fn backspace(&mut self) -> bool {
        self.buf.pop().is_some()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn as_str(&self) -> &str {
        self.buf.as_str()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() == LINE_SIZE
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}
