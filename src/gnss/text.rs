//! NMEA text backend (serial-attached receiver).
//!
//! Bytes are fed into an `nmea0183` parser as they arrive. Three one-shot
//! latches record whether a position, an altitude and an HDOP have been
//! seen during the current cycle; they are reset only by
//! [`TextBackend::begin_cycle`]. Values persist until overwritten by a
//! later sentence. A sample is usable once position and altitude have both
//! been observed.
//!
//! Fix class and DOP are not reliable in this protocol, so the precision
//! mode is not applied here (see [`policy::text_sufficient`]).

use log::{debug, warn};
use nmea0183::{ParseResult, Parser};

use super::{FixClass, FixSample, Observation, policy};

/// Upper bound on bytes consumed per poll so the cancellation check runs
/// regularly even on a chatty link.
pub const MAX_BYTES_PER_POLL: usize = 256;

/// Suspension when the serial buffer is empty.
pub const IDLE_POLL_MS: u32 = 50;

const CHUNK: usize = 32;

/// Non-blocking byte source (UART receive FIFO).
pub trait SerialSource {
    /// Next pending byte, or `None` if the FIFO is empty.
    fn read_byte(&mut self) -> Option<u8>;
}

impl<T: SerialSource + ?Sized> SerialSource for &mut T {
    fn read_byte(&mut self) -> Option<u8> {
        (**self).read_byte()
    }
}

/// Result of one text poll iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextPoll {
    /// Position and altitude latched; the sample's duration is left at 0
    /// for the scheduler to stamp.
    Usable(FixSample),
    /// Bytes were consumed but the sample is not complete yet.
    Pending,
    /// Nothing was waiting on the link.
    Idle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Latches {
    position: Option<(i32, i32)>,
    altitude_mm: Option<i32>,
    hdop: Option<u32>,
    satellites: u8,
}

pub struct TextBackend<S> {
    source: S,
    parser: Parser,
    latches: Latches,
}

impl<S: SerialSource> TextBackend<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            parser: Parser::new(),
            latches: Latches::default(),
        }
    }

    /// Reset the observed latches for a new cycle.
    pub fn begin_cycle(&mut self) {
        self.latches = Latches::default();
    }

    pub fn position_observed(&self) -> bool {
        self.latches.position.is_some()
    }

    pub fn altitude_observed(&self) -> bool {
        self.latches.altitude_mm.is_some()
    }

    pub fn hdop_observed(&self) -> bool {
        self.latches.hdop.is_some()
    }

    pub fn last_observation(&self) -> Observation {
        Observation {
            fix_class: if self.is_usable() {
                FixClass::Fix3D
            } else {
                FixClass::None
            },
            satellites: self.latches.satellites,
        }
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Drain up to [`MAX_BYTES_PER_POLL`] bytes through the decoder.
    pub fn poll(&mut self) -> TextPoll {
        let mut consumed = 0;
        let mut chunk = [0u8; CHUNK];

        while consumed < MAX_BYTES_PER_POLL {
            let mut n = 0;
            while n < CHUNK {
                match self.source.read_byte() {
                    Some(byte) => {
                        chunk[n] = byte;
                        n += 1;
                    }
                    None => break,
                }
            }
            if n == 0 {
                break;
            }
            consumed += n;
            self.feed(&chunk[..n]);
            if self.is_usable() {
                return TextPoll::Usable(self.sample());
            }
            if n < CHUNK {
                break;
            }
        }

        if consumed == 0 {
            TextPoll::Idle
        } else {
            TextPoll::Pending
        }
    }

    fn is_usable(&self) -> bool {
        policy::text_sufficient(self.position_observed(), self.altitude_observed())
    }

    fn feed(&mut self, bytes: &[u8]) {
        for result in self.parser.parse_from_bytes(bytes) {
            match result {
                Ok(ParseResult::GGA(Some(gga))) => {
                    debug!("GNSS: GGA position + altitude");
                    self.latches.position = Some((
                        to_fixed(gga.latitude.as_f64()),
                        to_fixed(gga.longitude.as_f64()),
                    ));
                    self.latches.altitude_mm = Some((gga.altitude.meters * 1000.0).round() as i32);
                    self.latches.hdop = Some(policy::hdop_from_f32(gga.hdop));
                    self.latches.satellites = gga.sat_in_use;
                }
                Ok(ParseResult::RMC(Some(rmc))) => {
                    debug!("GNSS: RMC position");
                    self.latches.position = Some((
                        to_fixed(rmc.latitude.as_f64()),
                        to_fixed(rmc.longitude.as_f64()),
                    ));
                }
                Ok(_) => {}
                Err(e) => warn!("GNSS: NMEA parse error: {}", e),
            }
        }
    }

    fn sample(&self) -> FixSample {
        let (latitude, longitude) = self.latches.position.unwrap_or((0, 0));
        FixSample {
            latitude,
            longitude,
            altitude_mm: self.latches.altitude_mm.unwrap_or(0),
            hdop: self.latches.hdop.unwrap_or(0),
            fix_class: FixClass::Fix3D,
            satellites: self.latches.satellites,
            duration_ms: 0,
        }
    }
}

/// Degrees to degrees ×10⁷.
fn to_fixed(deg: f64) -> i32 {
    (deg * 10_000_000.0).round() as i32
}
