//! Acquisition configuration
//!
//! All tunable parameters consumed by the acquisition core and edited by the
//! settings menu. Values are persisted through [`ConfigPort`] on every
//! committing menu transition and reloaded at boot.
//!
//! [`ConfigPort`]: crate::app::ports::ConfigPort

use serde::{Deserialize, Serialize};

/// Fix-sufficiency gating applied by the binary backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrecisionMode {
    /// Any 3D fix is accepted.
    Low,
    /// 3D fix, at least 6 satellites and HDOP no worse than 2.5.
    High,
}

/// Whether the receiver is power-cycled per request or left running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportMode {
    Standard,
    /// Receiver stays powered and self-schedules long-interval fixes.
    LowPowerBeacon,
}

/// Radio link flavour. Switching requires a device restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkMode {
    /// Network-managed transport (join, ADR, confirmed uplinks).
    Managed,
    PeerToPeer,
}

/// Coordinate precision of the outbound payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateDigits {
    Four,
    Six,
}

/// Which positioning protocol backend is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    /// Register-style binary protocol on the shared bus.
    Binary,
    /// NMEA sentence stream on a serial link.
    Text,
}

/// Core acquisition configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    // --- Fix gating ---
    pub precision_mode: PrecisionMode,

    // --- Transport ---
    pub transport_mode: TransportMode,
    pub link_mode: LinkMode,
    pub coordinate_digits: CoordinateDigits,

    // --- Timing ---
    /// Reporting interval in milliseconds. 0 disables the periodic trigger.
    pub report_interval_ms: u32,
    /// Idle time before the display saver blanks the screen.
    pub display_saver_timeout_ms: u32,

    // --- Hardware ---
    pub backend_kind: BackendKind,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            precision_mode: PrecisionMode::Low,

            transport_mode: TransportMode::Standard,
            link_mode: LinkMode::Managed,
            coordinate_digits: CoordinateDigits::Four,

            report_interval_ms: 60_000,         // 1/min
            display_saver_timeout_ms: 120_000, // 2 min

            backend_kind: BackendKind::Binary,
        }
    }
}

impl AcquisitionConfig {
    /// True when the receiver should stay powered between cycles.
    pub fn is_beacon(&self) -> bool {
        self.transport_mode == TransportMode::LowPowerBeacon
    }

    /// Range-check every field. Called before persisting.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.report_interval_ms != 0 && !(1_000..=86_400_000).contains(&self.report_interval_ms)
        {
            return Err("report_interval_ms must be 0 or 1000–86400000");
        }
        if !(5_000..=3_600_000).contains(&self.display_saver_timeout_ms) {
            return Err("display_saver_timeout_ms must be 5000–3600000");
        }
        Ok(())
    }
}
