//! Trackfix firmware library.
//!
//! Exposes the acquisition core, settings menu and adapters for integration
//! testing. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod acquisition;
pub mod app;
pub mod bus;
pub mod config;
pub mod error;
pub mod gnss;
pub mod payload;
pub mod state;
pub mod ui;
pub mod wake;

pub mod adapters;
pub mod drivers;
