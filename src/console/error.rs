//! Console error types

use crate::config::{ConfigError, StorageError};

/// Console error with code and message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleError {
    /// E01: Unknown command or sub-command
    UnknownCommand,
    /// E02: Invalid value format
    InvalidValue,
    /// E03: Missing required argument
    MissingArg,
    /// E04: Value out of allowed range
    OutOfRange,
    /// E05: Dangerous command requires 'confirm'
    RequiresConfirm,
    /// E06: Persistent storage fault
    Storage,
    /// E07: Text longer than the field allows
    TooLong,
}

impl ConsoleError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownCommand => "E01",
            Self::InvalidValue => "E02",
            Self::MissingArg => "E03",
            Self::OutOfRange => "E04",
            Self::RequiresConfirm => "E05",
            Self::Storage => "E06",
            Self::TooLong => "E07",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::UnknownCommand => "unknown command, type 'help'",
            Self::InvalidValue => "invalid value",
            Self::MissingArg => "missing argument",
            Self::OutOfRange => "out of range",
            Self::RequiresConfirm => "requires 'confirm'",
            Self::Storage => "storage error, changes kept in memory only",
            Self::TooLong => "value too long",
        }
    }
}

impl core::fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl From<ConfigError> for ConsoleError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::OutOfRange => Self::OutOfRange,
            ConfigError::TooLong => Self::TooLong,
            ConfigError::InvalidAddress => Self::InvalidValue,
        }
    }
}

impl From<StorageError> for ConsoleError {
    fn from(_: StorageError) -> Self {
        Self::Storage
    }
}
