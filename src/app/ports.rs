//! Port traits: the boundary between the tracker core and the board.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AcquisitionScheduler / MenuController
//! ```
//!
//! Driven adapters (panel, event sinks, config storage, system control)
//! implement these traits. The domain consumes them via generics injected at
//! call sites, so it never touches hardware directly.
//!
//! Rendering calls take the bus handle `&mut B`. The only way to get one is
//! from inside [`BusArbiter::with_bus`](crate::bus::BusArbiter::with_bus),
//! so the display can never be driven without holding the arbiter.

use embedded_hal::delay::DelayNs;

use crate::config::AcquisitionConfig;
use crate::payload::PayloadRecord;
use crate::ui::Screen;

// ───────────────────────────────────────────────────────────────
// Time
// ───────────────────────────────────────────────────────────────

/// Monotonic clock plus a blocking delay. The delay is the scheduler's
/// suspension point; the clock drives deadlines.
pub trait Timebase: DelayNs {
    /// Milliseconds since boot.
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Display port (domain → panel)
// ───────────────────────────────────────────────────────────────

/// Status and menu rendering on the shared bus.
pub trait StatusDisplay<B> {
    /// Blank the status area.
    fn clear(&mut self, bus: &mut B);

    /// Append one line below the previous ones.
    fn append_status_line(&mut self, bus: &mut B, line: &str);

    /// Replace the header line.
    fn write_header(&mut self, bus: &mut B, title: &str);

    /// Draw `screen` with entry `highlighted` selected.
    fn render_menu(&mut self, bus: &mut B, screen: Screen, highlighted: u8, entry_count: u8);

    fn set_power(&mut self, bus: &mut B, on: bool);
}

/// Board without a panel.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDisplay;

impl<B> StatusDisplay<B> for NoDisplay {
    fn clear(&mut self, _bus: &mut B) {}
    fn append_status_line(&mut self, _bus: &mut B, _line: &str) {}
    fn write_header(&mut self, _bus: &mut B, _title: &str) {}
    fn render_menu(&mut self, _bus: &mut B, _screen: Screen, _highlighted: u8, _entry_count: u8) {}
    fn set_power(&mut self, _bus: &mut B, _on: bool) {}
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Payload port (domain → radio stack)
// ───────────────────────────────────────────────────────────────

/// Hands accepted fixes to the uplink. Packet encoding lives on the other
/// side of this trait.
pub trait PayloadSink {
    /// Supply voltage for beacon records.
    fn battery_mv(&mut self) -> u16;

    fn send(&mut self, record: &PayloadRecord);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists [`AcquisitionConfig`].
///
/// Implementations MUST run [`AcquisitionConfig::validate`] before
/// persisting and reject invalid values with
/// [`ConfigError::ValidationFailed`] rather than clamping them.
pub trait ConfigPort {
    /// Returns [`AcquisitionConfig::default()`] if nothing is stored.
    fn load(&self) -> Result<AcquisitionConfig, ConfigError>;

    fn save(&self, config: &AcquisitionConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// System control port (domain → chip)
// ───────────────────────────────────────────────────────────────

/// Device-level actions triggered from the menu.
pub trait SystemControl {
    /// Soft reset. Does not return on hardware.
    fn restart(&mut self);

    /// Reboot into firmware-update mode. Does not return on hardware.
    fn enter_bootloader(&mut self);

    /// Re-open the transport's discovery/advertising window.
    fn restart_advertising(&mut self, window_ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored blob failed to deserialize.
    Corrupted,
    /// A field failed range validation; the message names it.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
