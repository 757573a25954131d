//! Global log stream instance.
//!
//! Producers: the transport callback context and the main tick.
//! Single consumer: the main tick's console drain.

use crate::logging::LogStream;

/// Diagnostic ring shared by every component.
///
/// Append-only; holds no application state.
pub static LOG_STREAM: LogStream = LogStream::new();
