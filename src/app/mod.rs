//! Application boundary.
//!
//! The acquisition core and the menu never touch hardware directly. They
//! report through [`events::AppEvent`] and reach the outside world through
//! the **port traits** in [`ports`], keeping both fully testable without
//! real peripherals.

pub mod events;
pub mod ports;
