//! Process-wide device flags shared by the acquisition task and the menu.
//!
//! Each field has exactly one writer; everyone else only reads.
//!
//! | Flag                    | Writer                                   |
//! |-------------------------|------------------------------------------|
//! | `menu_active`           | menu controller                          |
//! | `display_saver_enabled` | menu controller                          |
//! | `display_off`           | power-toggle gesture / saver timeout     |
//! | `acquisition_active`    | acquisition task                         |
//!
//! The display flags only need visibility across the two tasks, so they are
//! relaxed. `menu_active` and `acquisition_active` guard each other: each
//! side raises its own flag, then checks the other's, and backs out if it
//! is set. With sequentially consistent ordering at least one side sees the
//! other's flag, so the menu and a cycle never both proceed. Both backing
//! out is possible and harmless.

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::config::AcquisitionConfig;

#[derive(Debug, Default)]
pub struct DeviceState {
    menu_active: AtomicBool,
    display_off: AtomicBool,
    display_saver_enabled: AtomicBool,
    acquisition_active: AtomicBool,
}

impl DeviceState {
    pub const fn new() -> Self {
        Self {
            menu_active: AtomicBool::new(false),
            display_off: AtomicBool::new(false),
            display_saver_enabled: AtomicBool::new(false),
            acquisition_active: AtomicBool::new(false),
        }
    }

    // ── Readers ───────────────────────────────────────────────

    pub fn menu_active(&self) -> bool {
        self.menu_active.load(Ordering::SeqCst)
    }

    pub fn display_off(&self) -> bool {
        self.display_off.load(Ordering::Relaxed)
    }

    pub fn display_saver_enabled(&self) -> bool {
        self.display_saver_enabled.load(Ordering::Relaxed)
    }

    pub fn acquisition_active(&self) -> bool {
        self.acquisition_active.load(Ordering::SeqCst)
    }

    // ── Writers (one owner each) ──────────────────────────────

    /// Menu controller only.
    pub fn set_menu_active(&self, active: bool) {
        self.menu_active.store(active, Ordering::SeqCst);
    }

    /// Display power toggle only.
    pub fn set_display_off(&self, off: bool) {
        self.display_off.store(off, Ordering::Relaxed);
    }

    /// Menu controller only.
    pub fn set_display_saver_enabled(&self, enabled: bool) {
        self.display_saver_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Acquisition task only.
    pub fn set_acquisition_active(&self, active: bool) {
        self.acquisition_active.store(active, Ordering::SeqCst);
    }

    // ── Exclusive claims ──────────────────────────────────────

    /// Menu controller: open the menu unless a cycle is running.
    pub fn try_enter_menu(&self) -> bool {
        self.menu_active.store(true, Ordering::SeqCst);
        if self.acquisition_active.load(Ordering::SeqCst) {
            self.menu_active.store(false, Ordering::SeqCst);
            return false;
        }
        true
    }

    /// Acquisition task: start a cycle unless the menu is open.
    pub fn try_begin_acquisition(&self) -> bool {
        self.acquisition_active.store(true, Ordering::SeqCst);
        if self.menu_active.load(Ordering::SeqCst) {
            self.acquisition_active.store(false, Ordering::SeqCst);
            return false;
        }
        true
    }
}

/// The live [`AcquisitionConfig`]. Written by the menu controller on
/// commit, snapshotted by the scheduler at the start of every cycle.
pub struct SharedConfig {
    inner: Mutex<CriticalSectionRawMutex, Cell<AcquisitionConfig>>,
}

impl SharedConfig {
    pub const fn new(config: AcquisitionConfig) -> Self {
        Self {
            inner: Mutex::new(Cell::new(config)),
        }
    }

    pub fn get(&self) -> AcquisitionConfig {
        self.inner.lock(Cell::get)
    }

    /// Menu controller only.
    pub fn set(&self, config: AcquisitionConfig) {
        self.inner.lock(|c| c.set(config));
    }
}
