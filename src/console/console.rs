//! Main console struct integrating all components

use core::fmt::Write;

use super::commands::CommandContext;
use super::{execute, parse_line, ConsoleError, LineBuffer};

/// Version string (set by build.rs, includes git hash)
pub const VERSION: &str = env!("VERSION_STRING");

/// Prompt printed after every completed line
pub const PROMPT: &str = "tally> ";

/// Console state machine
pub struct Console {
    line: LineBuffer,
    /// Previous byte was CR; a following LF belongs to the same Enter
    after_cr: bool,
    /// Escape sequence state
    escape_state: EscapeState,
}

#[derive(Clone, Copy, PartialEq)]
enum EscapeState {
    Normal,
    Escape,      // Got ESC
    Bracket,     // Got ESC [
}

impl Console {
    /// Create new console
    pub const fn new() -> Self {
        Self {
            line: LineBuffer::new(),
            after_cr: false,
            escape_state: EscapeState::Normal,
        }
    }

    /// Process a single input byte
    ///
    /// Returns Some(result) if a line completed, None if more input needed.
    /// Errors have already been printed as `ERR <code>: <message>`.
    pub fn process_byte(
        &mut self,
        byte: u8,
        ctx: &mut CommandContext<'_>,
        out: &mut dyn Write,
    ) -> Option<Result<(), ConsoleError>> {
        let after_cr = core::mem::replace(&mut self.after_cr, byte == b'\r');

        match self.escape_state {
            EscapeState::Normal => self.process_normal(byte, after_cr, ctx, out),
            EscapeState::Escape => {
                if byte == b'[' {
                    self.escape_state = EscapeState::Bracket;
                } else {
                    self.escape_state = EscapeState::Normal;
                }
                None
            }
            EscapeState::Bracket => {
                // Cursor keys and the like are not supported; swallow the final byte
                if (0x40..=0x7E).contains(&byte) {
                    self.escape_state = EscapeState::Normal;
                }
                None
            }
        }
    }

    fn process_normal(
        &mut self,
        byte: u8,
        after_cr: bool,
        ctx: &mut CommandContext<'_>,
        out: &mut dyn Write,
    ) -> Option<Result<(), ConsoleError>> {
        match byte {
            b'\n' if after_cr => None,

            // Enter
            b'\r' | b'\n' => {
                let _ = writeln!(out);
                let result = self.execute_line(ctx, out);
                self.line.clear();
                self.print_prompt(out);
                Some(result)
            }

            // Backspace
            0x7F | 0x08 => {
                if self.line.backspace() {
                    // Echo: backspace, space, backspace
                    let _ = write!(out, "\x08 \x08");
                }
                None
            }

            // Escape
            0x1B => {
                self.escape_state = EscapeState::Escape;
                None
            }

            // Ctrl+C
            0x03 => {
                let _ = writeln!(out, "^C");
                self.line.clear();
                self.print_prompt(out);
                None
            }

            // Ctrl+U (clear line)
            0x15 => {
                for _ in 0..self.line.len() {
                    let _ = write!(out, "\x08 \x08");
                }
                self.line.clear();
                None
            }

            // Printable character
            0x20..=0x7E => {
                if self.line.push(byte) {
                    let _ = write!(out, "{}", byte as char);
                }
                None
            }

            _ => None,
        }
    }

    fn execute_line(&self, ctx: &mut CommandContext<'_>, out: &mut dyn Write) -> Result<(), ConsoleError> {
        let cmd = parse_line(self.line.as_str());
        let result = execute(&cmd, ctx, out);
        if let Err(e) = result {
            let _ = writeln!(out, "ERR {}", e);
        }
        result
    }

    /// Current unfinished input
    pub fn pending(&self) -> &str {
        self.line.as_str()
    }

    /// Print the prompt
    pub fn print_prompt(&self, out: &mut dyn Write) {
        let _ = write!(out, "{}", PROMPT);
    }

    /// Print welcome banner
    pub fn print_banner(&self, out: &mut dyn Write) {
        let _ = writeln!(out, "\n{}", VERSION);
        let _ = writeln!(out, "Type 'help' for commands.");
        self.print_prompt(out);
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}
