//! Fix-sufficiency policy.
//!
//! Pure decision: is an observation good enough to report under the
//! configured [`PrecisionMode`]? The binary backend has every input; the
//! text backend only knows which sentence fields it has seen, so it uses
//! [`text_sufficient`] and ignores the precision mode.

use super::FixClass;
use crate::config::PrecisionMode;

/// Minimum satellites in view for a high-precision fix.
pub const HIGH_MIN_SATELLITES: u8 = 6;

/// Worst acceptable HDOP ×100 for a high-precision fix (2.5).
pub const HIGH_MAX_HDOP: u32 = 250;

/// Binary-backend gate. `hdop` is DOP ×100.
pub fn sufficient(fix_class: FixClass, satellites: u8, hdop: u32, mode: PrecisionMode) -> bool {
    if fix_class < FixClass::Fix3D {
        return false;
    }
    match mode {
        PrecisionMode::Low => true,
        PrecisionMode::High => satellites >= HIGH_MIN_SATELLITES && hdop <= HIGH_MAX_HDOP,
    }
}

/// Text-backend gate: position and altitude each seen at least once.
pub fn text_sufficient(position_observed: bool, altitude_observed: bool) -> bool {
    position_observed && altitude_observed
}

/// Convert a floating DOP to the ×100 fixed-point form used throughout.
pub fn hdop_from_f32(dop: f32) -> u32 {
    if dop.is_nan() || dop <= 0.0 {
        return 0;
    }
    (dop * 100.0).round() as u32
}
