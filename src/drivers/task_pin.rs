//! Core-pinned scoped threads for the ESP32-S3 dual core.
//!
//! The acquisition task borrows the bus arbiter, device flags and shared
//! config from `main`'s stack, so it is spawned inside a
//! [`std::thread::scope`] rather than with a `'static` closure.
//!
//! ESP-IDF implements `std::thread` on pthreads over FreeRTOS tasks.
//! `esp_pthread_set_cfg()` applies to the *next* `pthread_create()` from the
//! calling thread, so the config→spawn pair must not be interleaved with
//! other thread creation on the same thread.

use std::thread::{Builder, Scope, ScopedJoinHandle};

/// CPU core identifiers for the ESP32-S3 Xtensa LX7 dual-core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): radio stack.
    Pro = 0,
    /// Core 1 (APP_CPU): acquisition.
    App = 1,
}

/// Spawn `f` in `scope`, pinned to `core` with explicit priority and stack.
///
/// `name` must be null-terminated (e.g. `"gnss\0"`). Off-target, `core` and
/// `priority` are ignored.
pub fn spawn_scoped_on_core<'scope, 'env, T: Send + 'scope>(
    scope: &'scope Scope<'scope, 'env>,
    core: Core,
    priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() -> T + Send + 'scope,
) -> std::io::Result<ScopedJoinHandle<'scope, T>> {
    #[cfg(target_os = "espidf")]
    unsafe {
        let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
        cfg.pin_to_core = core as i32;
        cfg.prio = i32::from(priority);
        cfg.stack_size = (stack_kb * 1024) as i32;
        cfg.thread_name = name.as_ptr().cast();
        let ret = esp_idf_sys::esp_pthread_set_cfg(&cfg);
        if ret != esp_idf_sys::ESP_OK {
            return Err(std::io::Error::other(format!("esp_pthread_set_cfg failed: {ret}")));
        }
    }

    let display_name = name.trim_end_matches('\0');
    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        display_name,
        core,
        priority,
        stack_kb
    );

    Builder::new()
        .name(display_name.into())
        .stack_size(stack_kb * 1024)
        .spawn_scoped(scope, f)
}
