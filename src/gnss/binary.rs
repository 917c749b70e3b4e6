//! Binary-protocol backend (bus-attached receiver).
//!
//! Each poll issues one fix-status query under the bus arbiter. Only once
//! the policy accepts the status is the full position read, in a second
//! scoped bus transaction. An unsuccessful poll returns
//! [`BinaryPoll::Pending`]; the scheduler then suspends for
//! [`POLL_INTERVAL_MS`] to bound bus traffic.

use embassy_sync::blocking_mutex::raw::RawMutex;
use log::{debug, warn};

use super::{FixClass, Observation, policy};
use crate::app::ports::Timebase;
use crate::bus::{BusArbiter, DEFAULT_BUS_TIMEOUT_MS};
use crate::config::PrecisionMode;
use crate::error::{Error, ReceiverError};

/// Sleep between unsuccessful polls.
pub const POLL_INTERVAL_MS: u32 = 1000;

/// Navigation rate used while the receiver is being actively polled.
pub const ACTIVE_MEASUREMENT_RATE_MS: u16 = 1000;

/// Self-scheduled fix interval in beacon low-power tracking.
pub const BEACON_TRACKING_INTERVAL_MS: u16 = 10_000;

/// Quality summary returned by the fix-status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixStatus {
    pub fix_class: FixClass,
    pub satellites: u8,
    /// DOP ×100.
    pub hdop: u32,
}

/// Full position read once the status is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Degrees ×10⁷.
    pub latitude: i32,
    /// Degrees ×10⁷.
    pub longitude: i32,
    pub altitude_mm: i32,
    /// DOP ×100.
    pub hdop: u32,
}

/// Register-level access to a bus-attached receiver. Every call receives the
/// bus handle, so it can only run while the arbiter is held.
pub trait BinaryReceiver<B> {
    /// `Ok(None)` when the receiver reports no valid fix yet.
    fn fix_status(&mut self, bus: &mut B) -> Result<Option<FixStatus>, ReceiverError>;

    fn position(&mut self, bus: &mut B) -> Result<Position, ReceiverError>;

    fn set_measurement_rate(&mut self, bus: &mut B, rate_ms: u16) -> Result<(), ReceiverError>;

    /// Switch to self-scheduled low-power tracking at `interval_ms`.
    fn enter_power_save(&mut self, bus: &mut B, interval_ms: u16) -> Result<(), ReceiverError>;
}

/// Result of one binary poll iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryPoll {
    Accepted { status: FixStatus, position: Position },
    Pending,
}

pub struct BinaryBackend<R> {
    receiver: R,
    last: Observation,
}

impl<R> BinaryBackend<R> {
    pub fn new(receiver: R) -> Self {
        Self {
            receiver,
            last: Observation::default(),
        }
    }

    /// Forget the previous cycle's observation.
    pub fn begin_cycle(&mut self) {
        self.last = Observation::default();
    }

    /// Latest fix class / satellite count seen this cycle.
    pub fn last_observation(&self) -> Observation {
        self.last
    }

    pub fn receiver(&self) -> &R {
        &self.receiver
    }

    pub fn receiver_mut(&mut self) -> &mut R {
        &mut self.receiver
    }

    /// One poll iteration: query status, and read the position if accepted.
    ///
    /// Each bus wait is capped at `bus_timeout_ms` so a contended bus cannot
    /// carry the poll past the cycle deadline.
    pub fn poll<M, B>(
        &mut self,
        bus: &BusArbiter<M, B>,
        time: &mut impl Timebase,
        mode: PrecisionMode,
        bus_timeout_ms: u32,
    ) -> BinaryPoll
    where
        M: RawMutex,
        R: BinaryReceiver<B>,
    {
        let status = match bus.transact(bus_timeout_ms, time, |b| self.receiver.fix_status(b)) {
            Ok(Some(status)) => status,
            Ok(None) | Err(Error::Bus(_)) => return BinaryPoll::Pending,
            Err(e) => {
                debug!("GNSS: status query failed: {}", e);
                return BinaryPoll::Pending;
            }
        };

        self.last = Observation {
            fix_class: status.fix_class,
            satellites: status.satellites,
        };
        debug!(
            "GNSS: {} sat={} hdop={}",
            status.fix_class, status.satellites, status.hdop
        );

        if !policy::sufficient(status.fix_class, status.satellites, status.hdop, mode) {
            return BinaryPoll::Pending;
        }

        match bus.transact(bus_timeout_ms, time, |b| self.receiver.position(b)) {
            Ok(position) => BinaryPoll::Accepted { status, position },
            Err(Error::Bus(_)) => BinaryPoll::Pending,
            Err(e) => {
                warn!("GNSS: position read failed after accepted status: {}", e);
                BinaryPoll::Pending
            }
        }
    }

    /// Hand the receiver over to self-scheduled tracking (beacon transport).
    pub fn enter_low_power_tracking<M, B>(&mut self, bus: &BusArbiter<M, B>, time: &mut impl Timebase)
    where
        M: RawMutex,
        R: BinaryReceiver<B>,
    {
        let r = bus.transact(DEFAULT_BUS_TIMEOUT_MS, time, |b| {
            self.receiver.set_measurement_rate(b, BEACON_TRACKING_INTERVAL_MS)?;
            self.receiver.enter_power_save(b, BEACON_TRACKING_INTERVAL_MS)
        });
        if let Err(e) = r {
            warn!("GNSS: could not enter low-power tracking: {}", e);
        }
    }

    /// Back to the active navigation rate after a failed beacon cycle.
    pub fn restore_measurement_rate<M, B>(&mut self, bus: &BusArbiter<M, B>, time: &mut impl Timebase)
    where
        M: RawMutex,
        R: BinaryReceiver<B>,
    {
        let r = bus.transact(DEFAULT_BUS_TIMEOUT_MS, time, |b| {
            self.receiver.set_measurement_rate(b, ACTIVE_MEASUREMENT_RATE_MS)
        });
        if let Err(e) = r {
            warn!("GNSS: could not restore measurement rate: {}", e);
        }
    }
}
