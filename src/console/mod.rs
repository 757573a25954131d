//! Serial console for configuration and diagnostics
//!
//! Polled from the main tick - no dedicated task.
//! Line input lives in a fixed buffer; commands edit the in-memory
//! configuration and only `save` persists it.

pub mod commands;
#[allow(clippy::module_inception)]
pub mod console;
pub mod error;
pub mod line_buffer;
pub mod parser;

pub use commands::{execute, find, CommandContext, SystemAction, COMMANDS};
pub use console::{Console, PROMPT, VERSION};
pub use error::ConsoleError;
pub use line_buffer::LineBuffer;
pub use parser::{parse_line, split_args, ParsedCommand};
