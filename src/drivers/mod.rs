//! Board drivers: button gesture decoding and task placement.

pub mod button;
pub mod task_pin;
