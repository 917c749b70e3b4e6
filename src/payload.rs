//! Uplink payload records.
//!
//! The radio stack encodes these; this module only decides which record a
//! fix becomes under the current configuration.

use crate::config::{AcquisitionConfig, CoordinateDigits};
use crate::gnss::FixSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadRecord {
    /// Position plus the auxiliary satellite count and accuracy.
    Standard {
        sample: FixSample,
        digits: CoordinateDigits,
        satellites: u8,
        /// DOP ×100.
        accuracy: u32,
    },
    /// Combined high-precision record sent in beacon transport.
    Beacon { sample: FixSample, battery_mv: u16 },
}

impl PayloadRecord {
    pub fn sample(&self) -> &FixSample {
        match self {
            Self::Standard { sample, .. } | Self::Beacon { sample, .. } => sample,
        }
    }
}

pub fn build(sample: &FixSample, config: &AcquisitionConfig, battery_mv: u16) -> PayloadRecord {
    if config.is_beacon() {
        PayloadRecord::Beacon {
            sample: *sample,
            battery_mv,
        }
    } else {
        PayloadRecord::Standard {
            sample: *sample,
            digits: config.coordinate_digits,
            satellites: sample.satellites,
            accuracy: sample.hdop,
        }
    }
}
