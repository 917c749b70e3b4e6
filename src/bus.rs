//! Shared-bus arbiter.
//!
//! The positioning receiver and the status display hang off the same I2C
//! bus. Both the acquisition task and the main loop talk to it, so every
//! transaction goes through [`BusArbiter::with_bus`]:
//!
//! ```text
//!  acquisition task ──┐                    ┌──▶ receiver (0x42)
//!                     ├──▶ BusArbiter ─────┤
//!  main loop (UI) ────┘    (scoped lock)   └──▶ display  (0x3C)
//! ```
//!
//! The lock is scoped to one discrete operation, never to a whole cycle, so
//! the interactive side is never starved by a long acquisition. Release is
//! tied to the guard's `Drop`, which covers early returns and unwinding.
//! A lock that cannot be taken within the timeout is reported as
//! [`BusError::Timeout`]; callers skip that step and continue. The timeout
//! is measured on the monotonic clock, not by summing requested sleeps, so
//! a delay that rounds up to the RTOS tick does not stretch it.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use log::warn;

use crate::app::ports::Timebase;
use crate::error::{self, BusError, Error};

/// Default bounded wait for the bus lock.
pub const DEFAULT_BUS_TIMEOUT_MS: u32 = 2000;

/// Re-poll granularity while the bus is contended.
const LOCK_POLL_MS: u32 = 1;

/// Mutual-exclusion wrapper around the one shared bus `B`.
pub struct BusArbiter<M: RawMutex, B> {
    bus: Mutex<M, B>,
}

impl<M: RawMutex, B> BusArbiter<M, B> {
    pub const fn new(bus: B) -> Self {
        Self {
            bus: Mutex::new(bus),
        }
    }

    /// Run `op` with exclusive access to the bus.
    ///
    /// Waits up to `timeout_ms` of elapsed time for the lock, suspending
    /// through `time` between attempts. The bus is released when `op`
    /// returns.
    pub fn with_bus<R>(
        &self,
        timeout_ms: u32,
        time: &mut impl Timebase,
        op: impl FnOnce(&mut B) -> R,
    ) -> Result<R, BusError> {
        let start = time.now_ms();
        loop {
            if let Ok(mut guard) = self.bus.try_lock() {
                return Ok(op(&mut guard));
            }
            if time.now_ms().saturating_sub(start) >= u64::from(timeout_ms) {
                warn!("BUS: lock not acquired within {} ms, skipping", timeout_ms);
                return Err(BusError::Timeout);
            }
            time.delay_ms(LOCK_POLL_MS);
        }
    }

    /// [`with_bus`](Self::with_bus) for a fallible `op`: lock timeout and
    /// the operation's own error both come back as [`Error`].
    pub fn transact<T, E>(
        &self,
        timeout_ms: u32,
        time: &mut impl Timebase,
        op: impl FnOnce(&mut B) -> Result<T, E>,
    ) -> error::Result<T>
    where
        Error: From<E>,
    {
        Ok(self.with_bus(timeout_ms, time, op)??)
    }

    /// Give the bus back (e.g. to re-initialise the peripheral).
    pub fn into_inner(self) -> B {
        self.bus.into_inner()
    }
}
