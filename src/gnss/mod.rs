//! Positioning domain: fix types, sufficiency policy and the protocol
//! backends that talk to whichever receiver is fitted.
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!  discovery ───▶ │ ProtocolAdapter              │
//!  (once, boot)   │  ├─ Binary(BinaryBackend)    │ ◀── BusArbiter
//!                 │  └─ Text(TextBackend)        │ ◀── serial bytes
//!                 └──────────────┬───────────────┘
//!                                │ Observation
//!                                ▼
//!                          policy::sufficient
//! ```

pub mod binary;
pub mod discovery;
pub mod policy;
pub mod text;

use core::fmt;

use crate::config::BackendKind;

pub use binary::{BinaryBackend, BinaryReceiver, FixStatus, Position};
pub use text::{SerialSource, TextBackend};

// ---------------------------------------------------------------------------
// Fix class
// ---------------------------------------------------------------------------

/// Receiver-reported quality tier, ordered from worst to best-with-position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum FixClass {
    None = 0,
    DeadReckoning = 1,
    Fix2D = 2,
    Fix3D = 3,
    /// Combined GNSS + dead reckoning.
    Gnss = 4,
    /// Time-only solution.
    Time = 5,
}

impl FixClass {
    /// Decode the receiver's numeric fix type. Unknown codes map to `None`.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::DeadReckoning,
            2 => Self::Fix2D,
            3 => Self::Fix3D,
            4 => Self::Gnss,
            5 => Self::Time,
            _ => Self::None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::None => "No Fix",
            Self::DeadReckoning => "Dead reckoning",
            Self::Fix2D => "Fix type 2D",
            Self::Fix3D => "Fix type 3D",
            Self::Gnss => "GNSS fix",
            Self::Time => "Time fix",
        }
    }
}

impl fmt::Display for FixClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Samples and observations
// ---------------------------------------------------------------------------

/// An accepted position fix. Produced at most once per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixSample {
    /// Degrees ×10⁷.
    pub latitude: i32,
    /// Degrees ×10⁷.
    pub longitude: i32,
    /// Millimetres.
    pub altitude_mm: i32,
    /// Horizontal DOP ×100.
    pub hdop: u32,
    pub fix_class: FixClass,
    pub satellites: u8,
    /// Time from cycle start to acceptance.
    pub duration_ms: u32,
}

impl FixSample {
    /// A 0/0 position is what receivers emit before they know anything.
    pub fn is_null_island(&self) -> bool {
        self.latitude == 0 && self.longitude == 0
    }
}

/// Outcome of one acquisition cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixResult {
    Fix(FixSample),
    NoFix,
}

impl FixResult {
    pub fn is_fix(&self) -> bool {
        matches!(self, Self::Fix(_))
    }

    pub fn sample(&self) -> Option<&FixSample> {
        match self {
            Self::Fix(s) => Some(s),
            Self::NoFix => None,
        }
    }
}

/// Best knowledge so far during a cycle, used for the NoFix status lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub fix_class: FixClass,
    pub satellites: u8,
}

impl Default for Observation {
    fn default() -> Self {
        Self {
            fix_class: FixClass::None,
            satellites: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Protocol adapter
// ---------------------------------------------------------------------------

/// The receiver backend chosen once at startup by [`discovery`].
pub enum ProtocolAdapter<R, S> {
    Binary(BinaryBackend<R>),
    Text(TextBackend<S>),
}

impl<R, S> ProtocolAdapter<R, S> {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Binary(_) => BackendKind::Binary,
            Self::Text(_) => BackendKind::Text,
        }
    }
}
