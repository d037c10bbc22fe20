//! Unified error types for the CourtTimer firmware.
//!
//! Command rejections are a first-class, structured result: they are
//! returned to the caller (and echoed to the originating observer) and
//! never leave partially-applied state behind.  All variants are `Copy`
//! so they pass through the control loop without allocation.

use core::fmt;

use crate::app::ports::StorageError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An inbound command was rejected.
    Command(CommandError),
    /// Persistent storage failed.
    Storage(StorageError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Compiled-in configuration is inconsistent.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(e) => write!(f, "command: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Command rejections
// ---------------------------------------------------------------------------

/// Why a command was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// A field failed range validation.  The message names the field.
    Validation(&'static str),
    /// No schedule with the requested id exists.
    UnknownSchedule,
    /// The caller may not perform this action.
    PermissionDenied,
    /// The timer is in a state where the action is not allowed.
    InvalidState(&'static str),
    /// The frame could not be decoded.
    Malformed,
    /// The client exceeded its command budget.
    RateLimited,
    /// A fixed-capacity table is full.
    TableFull,
}

impl CommandError {
    /// Stable machine-readable code for the wire protocol.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::UnknownSchedule => "unknown_schedule",
            Self::PermissionDenied => "permission_denied",
            Self::InvalidState(_) => "invalid_state",
            Self::Malformed => "malformed",
            Self::RateLimited => "rate_limited",
            Self::TableFull => "table_full",
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "invalid value: {msg}"),
            Self::UnknownSchedule => write!(f, "schedule not found"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::InvalidState(msg) => write!(f, "not allowed now: {msg}"),
            Self::Malformed => write!(f, "malformed command"),
            Self::RateLimited => write!(f, "rate limit exceeded"),
            Self::TableFull => write!(f, "capacity reached"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
