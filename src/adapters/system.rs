//! System control adapter.
//!
//! Implements [`SystemControl`]. On ESP-IDF, restart and bootloader entry
//! go through `esp_restart()`; bootloader entry first latches the ROM's
//! force-download strap in the RTC option register. Host builds only count
//! the requests.

use log::{info, warn};

use crate::app::ports::SystemControl;

/// `RTC_CNTL_OPTION1_REG` on ESP32-S3, and its `FORCE_DOWNLOAD_BOOT` bit.
#[cfg(target_os = "espidf")]
const RTC_CNTL_OPTION1_REG: usize = 0x6000_812C;
#[cfg(target_os = "espidf")]
const RTC_CNTL_FORCE_DOWNLOAD_BOOT: u32 = 1;

#[derive(Debug, Default)]
pub struct EspSystemControl {
    #[cfg(not(target_os = "espidf"))]
    restarts: u32,
}

impl EspSystemControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restart requests seen so far (host only).
    #[cfg(not(target_os = "espidf"))]
    pub fn restarts(&self) -> u32 {
        self.restarts
    }
}

impl SystemControl for EspSystemControl {
    #[cfg(target_os = "espidf")]
    fn restart(&mut self) {
        warn!("SYS: restarting");
        // SAFETY: esp_restart is always safe to call; it does not return.
        unsafe { esp_idf_sys::esp_restart() };
    }

    #[cfg(not(target_os = "espidf"))]
    fn restart(&mut self) {
        warn!("SYS: restart requested");
        self.restarts += 1;
    }

    #[cfg(target_os = "espidf")]
    fn enter_bootloader(&mut self) {
        warn!("SYS: rebooting into download mode");
        // SAFETY: fixed, always-mapped RTC peripheral register on this chip.
        unsafe {
            core::ptr::write_volatile(
                RTC_CNTL_OPTION1_REG as *mut u32,
                RTC_CNTL_FORCE_DOWNLOAD_BOOT,
            );
            esp_idf_sys::esp_restart();
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn enter_bootloader(&mut self) {
        warn!("SYS: bootloader requested");
        self.restarts += 1;
    }

    fn restart_advertising(&mut self, window_ms: u32) {
        // The radio stack owns advertising; this board only reports it.
        info!("SYS: advertising window {} ms requested", window_ms);
    }
}
