//! Status-line text for the passive view and cycle results.

use core::fmt::Write;

use heapless::{String, Vec};

use crate::config::{AcquisitionConfig, BackendKind, CoordinateDigits, LinkMode, PrecisionMode};
use crate::gnss::{FixSample, Observation};

/// Characters per panel line.
pub const LINE_WIDTH: usize = 32;

pub type Line = String<LINE_WIDTH>;

pub type Lines = Vec<Line, 6>;

fn line(args: core::fmt::Arguments<'_>) -> Line {
    let mut l = Line::new();
    // Overlong text is cut at the panel width.
    let _ = l.write_fmt(args);
    l
}

fn push(lines: &mut Lines, l: Line) {
    let _ = lines.push(l);
}

/// Header shown above the status area.
pub fn header(config: &AcquisitionConfig) -> &'static str {
    if config.is_beacon() {
        "Beacon Tracker"
    } else {
        match config.link_mode {
            LinkMode::Managed => "LPWAN Tracker",
            LinkMode::PeerToPeer => "LoRa Tracker",
        }
    }
}

/// Summary of the active settings, shown when the menu closes.
pub fn summary(config: &AcquisitionConfig) -> Lines {
    let mut out = Lines::new();
    let six = config.coordinate_digits == CoordinateDigits::Six || config.is_beacon();
    push(
        &mut out,
        line(format_args!("GNSS {} digit prec", if six { 6 } else { 4 })),
    );
    if config.precision_mode == PrecisionMode::High {
        push(&mut out, line(format_args!("GNSS fix + 6 sat prec")));
    }
    push(&mut out, line(format_args!("{}", header(config))));
    out
}

fn quality(backend: BackendKind, obs: Observation) -> Line {
    match backend {
        BackendKind::Binary => line(format_args!("Fix: {} Sat: {}", obs.fix_class, obs.satellites)),
        BackendKind::Text => line(format_args!("Sat: {}", obs.satellites)),
    }
}

fn seconds(ms: u32) -> Line {
    line(format_args!("Acq time: {:.1}", f64::from(ms) / 1000.0))
}

/// Lines rendered after an accepted fix.
pub fn fix_lines(sample: &FixSample, backend: BackendKind) -> Lines {
    let mut out = Lines::new();
    push(
        &mut out,
        quality(
            backend,
            Observation {
                fix_class: sample.fix_class,
                satellites: sample.satellites,
            },
        ),
    );
    push(
        &mut out,
        line(format_args!("Lat: {:.6}", f64::from(sample.latitude) / 1e7)),
    );
    push(
        &mut out,
        line(format_args!("Lon: {:.6}", f64::from(sample.longitude) / 1e7)),
    );
    push(
        &mut out,
        line(format_args!(
            "Alt: {:.2}, Acc {:.2}",
            f64::from(sample.altitude_mm) / 1000.0,
            f64::from(sample.hdop) / 100.0
        )),
    );
    push(&mut out, seconds(sample.duration_ms));
    out
}

/// Lines rendered when the deadline passed or the cycle was cancelled.
pub fn no_fix_lines(obs: Observation, backend: BackendKind, duration_ms: u32) -> Lines {
    let mut out = Lines::new();
    push(&mut out, line(format_args!("No location fix")));
    push(&mut out, quality(backend, obs));
    push(&mut out, seconds(duration_ms));
    out
}
