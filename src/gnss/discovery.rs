//! Receiver discovery, run once at boot.
//!
//! Order of attempts:
//!
//! 1. Bus-attached binary receiver.
//! 2. Serial-attached binary receiver, up to [`SERIAL_ROUNDS`] rounds:
//!    try [`WORKING_BAUD`]; else try [`FACTORY_BAUD`] and, if it answers,
//!    switch it to the working rate for the next round; else factory-reset
//!    the receiver and back off.
//! 3. Nothing answered: text (NMEA) receiver at the factory rate. No
//!    further discovery is attempted for the rest of the session.
//!
//! [`discover_powered`] wraps this with the receiver's power rail: up and
//! settled for the probes, then back down unless the caller keeps it on.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::acquisition::POWER_SETTLE_MS;
use crate::config::BackendKind;

/// Rate every serial binary receiver is normalised to.
pub const WORKING_BAUD: u32 = 38_400;

/// Rate receivers ship with.
pub const FACTORY_BAUD: u32 = 9_600;

pub const SERIAL_ROUNDS: u8 = 3;

const FACTORY_RESET_BACKOFF_MS: u32 = 2000;
const RATE_SWITCH_SETTLE_MS: u32 = 100;

/// Physical link the chosen receiver sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverLink {
    Bus,
    Serial { baud: u32 },
}

/// What discovery settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discovered {
    pub kind: BackendKind,
    pub link: ReceiverLink,
}

/// Hardware hooks discovery needs. Implemented by the board support code.
pub trait ReceiverProbe {
    /// Does a binary receiver answer on the shared bus?
    fn probe_bus(&mut self) -> bool;

    /// Open the serial link at `baud` and check for a binary receiver.
    fn probe_serial(&mut self, baud: u32) -> bool;

    /// Ask the currently answering receiver to switch to `baud`.
    fn set_serial_rate(&mut self, baud: u32);

    /// Restore receiver defaults.
    fn factory_reset(&mut self);

    /// Open the serial link at `baud` for NMEA text.
    fn open_text(&mut self, baud: u32);
}

pub fn discover(probe: &mut impl ReceiverProbe, delay: &mut impl DelayNs) -> Discovered {
    if probe.probe_bus() {
        info!("GNSS: binary receiver found on bus");
        return Discovered {
            kind: BackendKind::Binary,
            link: ReceiverLink::Bus,
        };
    }
    info!("GNSS: no answer on bus, trying serial");

    for round in 0..SERIAL_ROUNDS {
        if probe.probe_serial(WORKING_BAUD) {
            info!("GNSS: binary receiver found on serial at {}", WORKING_BAUD);
            return Discovered {
                kind: BackendKind::Binary,
                link: ReceiverLink::Serial { baud: WORKING_BAUD },
            };
        }
        delay.delay_ms(RATE_SWITCH_SETTLE_MS);

        if probe.probe_serial(FACTORY_BAUD) {
            info!(
                "GNSS: receiver answered at {}, switching to {}",
                FACTORY_BAUD, WORKING_BAUD
            );
            probe.set_serial_rate(WORKING_BAUD);
            delay.delay_ms(RATE_SWITCH_SETTLE_MS);
        } else {
            warn!("GNSS: serial round {} got no answer, factory reset", round + 1);
            probe.factory_reset();
            delay.delay_ms(FACTORY_RESET_BACKOFF_MS);
        }
    }

    warn!("GNSS: no binary receiver, assuming NMEA text at {}", FACTORY_BAUD);
    probe.open_text(FACTORY_BAUD);
    Discovered {
        kind: BackendKind::Text,
        link: ReceiverLink::Serial { baud: FACTORY_BAUD },
    }
}

/// Power the receiver, run [`discover`], and switch it off again unless
/// `keep_powered` (beacon transport leaves it running between cycles).
pub fn discover_powered(
    probe: &mut impl ReceiverProbe,
    power: &mut impl OutputPin,
    delay: &mut impl DelayNs,
    keep_powered: bool,
) -> Discovered {
    if let Err(e) = power.set_high() {
        warn!("GNSS: power-on for discovery failed: {:?}", e);
    }
    delay.delay_ms(POWER_SETTLE_MS);

    let found = discover(probe, delay);

    if !keep_powered {
        if let Err(e) = power.set_low() {
            warn!("GNSS: power-off after discovery failed: {:?}", e);
        }
    }
    found
}
