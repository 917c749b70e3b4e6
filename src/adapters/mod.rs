//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements           | Connects to                 |
//! |---------------|----------------------|-----------------------------|
//! | `log_display` | StatusDisplay        | Serial log output           |
//! | `log_sink`    | EventSink            | Serial log output           |
//! |               | PayloadSink          |                             |
//! | `nvs`         | ConfigPort           | NVS / in-memory store       |
//! | `system`      | SystemControl        | esp_restart / RTC strap     |
//! | `time`        | Timebase             | ESP32 system timer          |
//! | `uart`        | SerialSource         | ESP-IDF UART driver         |
//! | `ubx`         | BinaryReceiver       | u-blox over I2C DDC or UART |

pub mod log_display;
pub mod log_sink;
pub mod nvs;
pub mod system;
pub mod time;
#[cfg(target_os = "espidf")]
pub mod uart;
pub mod ubx;
