//! Log-based event and payload sink.
//!
//! Implements [`EventSink`] and [`PayloadSink`] by writing to the logger
//! (UART / USB-CDC in production). A radio adapter would implement the same
//! traits.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, PayloadSink};
use crate::gnss::FixResult;
use crate::payload::PayloadRecord;

/// Adapter that logs every [`AppEvent`] and payload record.
#[derive(Debug, Default)]
pub struct LogEventSink {
    battery_mv: u16,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a fixed battery voltage in beacon records.
    pub fn with_battery_mv(battery_mv: u16) -> Self {
        Self { battery_mv }
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::AcquisitionStarted { backend, reason } => {
                info!("ACQ | start backend={:?} reason={:?}", backend, reason);
            }
            AppEvent::AcquisitionFinished(FixResult::Fix(s)) => {
                info!(
                    "ACQ | fix {} sat={} lat={} lon={} alt={}mm dop={} t={}ms",
                    s.fix_class, s.satellites, s.latitude, s.longitude, s.altitude_mm, s.hdop,
                    s.duration_ms
                );
            }
            AppEvent::AcquisitionFinished(FixResult::NoFix) => info!("ACQ | no fix"),
            AppEvent::AcquisitionRefused(reason) => {
                info!("ACQ | {:?} wake refused, menu open", reason);
            }
            AppEvent::MenuBusy => warn!("UI  | busy, acquisition running"),
            AppEvent::MenuOpened => info!("UI  | menu opened"),
            AppEvent::MenuClosed => info!("UI  | menu closed"),
            AppEvent::ConfigCommitted(c) => {
                info!(
                    "CFG | prec={:?} transport={:?} link={:?} digits={:?}",
                    c.precision_mode, c.transport_mode, c.link_mode, c.coordinate_digits
                );
            }
        }
    }
}

impl PayloadSink for LogEventSink {
    fn battery_mv(&mut self) -> u16 {
        self.battery_mv
    }

    fn send(&mut self, record: &PayloadRecord) {
        match record {
            PayloadRecord::Standard {
                digits,
                satellites,
                accuracy,
                ..
            } => info!(
                "UPLINK | standard digits={:?} sat={} acc={}",
                digits, satellites, accuracy
            ),
            PayloadRecord::Beacon { battery_mv, .. } => {
                info!("UPLINK | beacon batt={}mV", battery_mv);
            }
        }
    }
}
