//! Acquisition wake sources.
//!
//! ```text
//!  ReportTimer (main loop) ──┐
//!                            ├──▶ WakeSignal ──▶ AcquisitionTask
//!  Triple click (menu)  ─────┘
//! ```
//!
//! The timer is stopped while the menu is open and restarted with the
//! (possibly edited) interval on exit. Wakes that arrive while the menu is
//! open are refused by the task, not queued.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{debug, info, warn};

/// Pending wakes the channel can hold before new ones are dropped.
pub const WAKE_QUEUE_DEPTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    /// Report interval elapsed.
    Periodic,
    /// Requested from the idle screen.
    Forced,
}

/// Counting wake signal shared between the main loop and the acquisition
/// task.
pub struct WakeSignal {
    channel: Channel<CriticalSectionRawMutex, WakeReason, WAKE_QUEUE_DEPTH>,
}

impl Default for WakeSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl WakeSignal {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Queue a wake. Returns `false` if the queue was full and the wake was
    /// dropped.
    pub fn notify(&self, reason: WakeReason) -> bool {
        match self.channel.try_send(reason) {
            Ok(()) => true,
            Err(_) => {
                warn!("Wake: queue full, dropping {:?}", reason);
                false
            }
        }
    }

    /// Block the calling thread until a wake arrives.
    pub fn wait(&self) -> WakeReason {
        futures_lite::future::block_on(self.channel.receive())
    }

    pub fn try_take(&self) -> Option<WakeReason> {
        self.channel.try_receive().ok()
    }

    pub fn pending(&self) -> usize {
        self.channel.len()
    }
}

/// Periodic trigger, ticked from the main loop.
#[derive(Debug, Clone)]
pub struct ReportTimer {
    interval_ms: u32,
    next_due_ms: Option<u64>,
}

impl ReportTimer {
    /// Create a running timer whose first fire is one interval after
    /// `now_ms`. An interval of 0 never fires.
    pub fn new(interval_ms: u32, now_ms: u64) -> Self {
        let mut t = Self {
            interval_ms,
            next_due_ms: None,
        };
        t.restart(interval_ms, now_ms);
        t
    }

    pub fn is_running(&self) -> bool {
        self.next_due_ms.is_some()
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Fire `Periodic` into `signal` if the interval has elapsed.
    /// Returns whether it fired.
    pub fn tick(&mut self, now_ms: u64, signal: &WakeSignal) -> bool {
        let Some(due) = self.next_due_ms else {
            return false;
        };
        if now_ms < due {
            return false;
        }
        // Re-anchor on the current time so a long stall fires once, not in a burst.
        self.next_due_ms = Some(now_ms + u64::from(self.interval_ms));
        debug!("Wake: report interval elapsed at {} ms", now_ms);
        signal.notify(WakeReason::Periodic);
        true
    }

    pub fn stop(&mut self) {
        if self.next_due_ms.take().is_some() {
            info!("Wake: report timer stopped");
        }
    }

    pub fn restart(&mut self, interval_ms: u32, now_ms: u64) {
        self.interval_ms = interval_ms;
        self.next_due_ms = if interval_ms == 0 {
            None
        } else {
            Some(now_ms + u64::from(interval_ms))
        };
        info!("Wake: report timer restarted, interval {} ms", interval_ms);
    }
}
