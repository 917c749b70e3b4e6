//! Unified error types for the tracker core.
//!
//! A single `Error` enum that the bus and receiver layers convert into. All
//! variants are `Copy` so they pass through the acquisition loop without
//! allocation. None of them is fatal: callers skip the failed step and
//! carry on.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The shared bus could not be acquired.
    Bus(BusError),
    /// The positioning receiver did not answer or answered garbage.
    Receiver(ReceiverError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Receiver(e) => write!(f, "receiver: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// Another context held the bus for longer than the allowed wait.
    Timeout,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "lock timeout"),
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Receiver errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverError {
    /// Underlying bus transaction failed.
    Io,
    /// No response within the protocol timeout.
    NoResponse,
    /// Frame failed length or checksum validation.
    Malformed,
}

impl fmt::Display for ReceiverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io => write!(f, "I/O error"),
            Self::NoResponse => write!(f, "no response"),
            Self::Malformed => write!(f, "malformed frame"),
        }
    }
}

impl From<ReceiverError> for Error {
    fn from(e: ReceiverError) -> Self {
        Self::Receiver(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, Error>;
