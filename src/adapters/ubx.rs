//! u-blox receiver over I2C (DDC) or UART, implementing [`BinaryReceiver`].
//!
//! ## Wire format
//!
//! ```text
//!  0xB5 0x62 | class | id | len (u16 LE) | payload … | ck_a ck_b
//! ```
//!
//! Checksum is 8-bit Fletcher over class..payload. The receiver sits at
//! 7-bit address `0x42`; register `0xFD/0xFE` holds the number of pending
//! bytes (big-endian), register `0xFF` is the output stream.
//!
//! The same framing runs over a dedicated UART when the receiver is
//! serial-attached ([`Link::Serial`]).
//!
//! Only the fields the tracker needs are decoded:
//!
//! | Message  | Class/Id  | Fields                                           |
//! |----------|-----------|--------------------------------------------------|
//! | NAV-PVT  | 0x01 0x07 | fixType@20, flags@21 (bit0 gnssFixOK), numSV@23, |
//! |          |           | lon@24, lat@28, height@32 (mm)                   |
//! | NAV-DOP  | 0x01 0x04 | hDOP@12 (×0.01)                                  |

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, warn};

use crate::error::ReceiverError;
use crate::gnss::{BinaryReceiver, FixClass, FixStatus, Position, SerialSource};

pub const DEFAULT_ADDRESS: u8 = 0x42;

const REG_BYTES_AVAILABLE: u8 = 0xFD;
const REG_STREAM: u8 = 0xFF;

const SYNC_1: u8 = 0xB5;
const SYNC_2: u8 = 0x62;
const HEADER_LEN: usize = 6;
const FRAME_OVERHEAD: usize = HEADER_LEN + 2;

const CLASS_NAV: u8 = 0x01;
const ID_NAV_PVT: u8 = 0x07;
const ID_NAV_DOP: u8 = 0x04;
const CLASS_CFG: u8 = 0x06;
const ID_CFG_RATE: u8 = 0x08;
const ID_CFG_RXM: u8 = 0x11;
const ID_CFG_PRT: u8 = 0x00;
const ID_CFG_CFG: u8 = 0x09;

/// UART1, 8N1, UBX+NMEA+RTCM in, UBX+NMEA out.
const PRT_PORT_UART1: u8 = 1;
const PRT_MODE_8N1: u32 = 0x0000_08D0;
const PRT_IN_PROTO: u16 = 0x0007;
const PRT_OUT_PROTO: u16 = 0x0003;

const NAV_PVT_LEN: usize = 92;
const NAV_DOP_LEN: usize = 18;

const RX_BUF: usize = 256;
const RESPONSE_ATTEMPTS: u32 = 20;
const RESPONSE_POLL_MS: u32 = 5;

// ---------------------------------------------------------------------------
// Framing
// ---------------------------------------------------------------------------

/// A checksum-valid frame borrowed from a receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub class: u8,
    pub id: u8,
    pub payload: &'a [u8],
}

pub fn checksum(bytes: &[u8]) -> (u8, u8) {
    bytes.iter().fold((0u8, 0u8), |(a, b), &x| {
        let a = a.wrapping_add(x);
        (a, b.wrapping_add(a))
    })
}

/// Encode a frame into `out`. Returns the encoded length, or `None` if `out`
/// is too small.
pub fn encode(class: u8, id: u8, payload: &[u8], out: &mut [u8]) -> Option<usize> {
    let total = payload.len() + FRAME_OVERHEAD;
    if out.len() < total || payload.len() > usize::from(u16::MAX) {
        return None;
    }
    let len = (payload.len() as u16).to_le_bytes();
    out[..HEADER_LEN].copy_from_slice(&[SYNC_1, SYNC_2, class, id, len[0], len[1]]);
    out[HEADER_LEN..HEADER_LEN + payload.len()].copy_from_slice(payload);
    let (a, b) = checksum(&out[2..HEADER_LEN + payload.len()]);
    out[total - 2] = a;
    out[total - 1] = b;
    Some(total)
}

/// First checksum-valid frame in `buf`, and the offset just past it.
/// Garbage and corrupt frames before it are skipped.
pub fn next_frame(buf: &[u8]) -> Option<(Frame<'_>, usize)> {
    let mut i = 0;
    while i + FRAME_OVERHEAD <= buf.len() {
        if buf[i] != SYNC_1 || buf[i + 1] != SYNC_2 {
            i += 1;
            continue;
        }
        let len = usize::from(u16::from_le_bytes([buf[i + 4], buf[i + 5]]));
        let end = i + FRAME_OVERHEAD + len;
        if end > buf.len() {
            // Truncated; a later sync pair may still hold a whole frame.
            i += 1;
            continue;
        }
        let (a, b) = checksum(&buf[i + 2..end - 2]);
        if a == buf[end - 2] && b == buf[end - 1] {
            let frame = Frame {
                class: buf[i + 2],
                id: buf[i + 3],
                payload: &buf[i + HEADER_LEN..end - 2],
            };
            return Some((frame, end));
        }
        i += 1;
    }
    None
}

fn i32_at(p: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([p[at], p[at + 1], p[at + 2], p[at + 3]])
}

// ---------------------------------------------------------------------------
// Decoded messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavPvt {
    pub fix_type: u8,
    pub fix_ok: bool,
    pub num_sv: u8,
    pub lon: i32,
    pub lat: i32,
    pub height_mm: i32,
}

impl NavPvt {
    pub fn decode(payload: &[u8]) -> Result<Self, ReceiverError> {
        if payload.len() < NAV_PVT_LEN {
            return Err(ReceiverError::Malformed);
        }
        Ok(Self {
            fix_type: payload[20],
            fix_ok: payload[21] & 0x01 != 0,
            num_sv: payload[23],
            lon: i32_at(payload, 24),
            lat: i32_at(payload, 28),
            height_mm: i32_at(payload, 32),
        })
    }
}

/// hDOP ×100 from a NAV-DOP payload.
pub fn decode_hdop(payload: &[u8]) -> Result<u32, ReceiverError> {
    if payload.len() < NAV_DOP_LEN {
        return Err(ReceiverError::Malformed);
    }
    Ok(u32::from(u16::from_le_bytes([payload[12], payload[13]])))
}

// ---------------------------------------------------------------------------
// Link
// ---------------------------------------------------------------------------

/// Byte sink half of a UART. The source half is [`SerialSource`].
pub trait SerialWrite {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ReceiverError>;
}

impl<T: SerialWrite + ?Sized> SerialWrite for &mut T {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ReceiverError> {
        (**self).write_all(bytes)
    }
}

/// Placeholder serial port for boards where the receiver is bus-only.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSerial;

impl SerialSource for NoSerial {
    fn read_byte(&mut self) -> Option<u8> {
        None
    }
}

impl SerialWrite for NoSerial {
    fn write_all(&mut self, _bytes: &[u8]) -> Result<(), ReceiverError> {
        Err(ReceiverError::Io)
    }
}

/// How frames reach the receiver. A serial link ignores the bus handle.
pub enum Link<U> {
    Ddc { address: u8 },
    Serial(U),
}

impl<U: SerialSource + SerialWrite> Link<U> {
    fn send<I: I2c>(&mut self, bus: &mut I, frame: &[u8]) -> Result<(), ReceiverError> {
        match self {
            Self::Ddc { address } => bus.write(*address, frame).map_err(|_| ReceiverError::Io),
            Self::Serial(port) => port.write_all(frame),
        }
    }

    /// Read whatever is pending into `buf`. Returns the count, 0 if idle.
    fn receive<I: I2c>(&mut self, bus: &mut I, buf: &mut [u8]) -> Result<usize, ReceiverError> {
        match self {
            Self::Ddc { address } => {
                let mut n = [0u8; 2];
                bus.write_read(*address, &[REG_BYTES_AVAILABLE], &mut n)
                    .map_err(|_| ReceiverError::Io)?;
                let take = usize::from(u16::from_be_bytes(n)).min(buf.len());
                if take > 0 {
                    bus.write_read(*address, &[REG_STREAM], &mut buf[..take])
                        .map_err(|_| ReceiverError::Io)?;
                }
                Ok(take)
            }
            Self::Serial(port) => {
                let mut n = 0;
                while n < buf.len() {
                    match port.read_byte() {
                        Some(b) => {
                            buf[n] = b;
                            n += 1;
                        }
                        None => break,
                    }
                }
                Ok(n)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Receiver
// ---------------------------------------------------------------------------

pub struct UbxReceiver<U, D> {
    link: Link<U>,
    delay: D,
    rx: [u8; RX_BUF],
    last_hdop: u32,
}

impl<D: DelayNs> UbxReceiver<NoSerial, D> {
    /// Receiver on the shared I2C bus.
    pub fn ddc(address: u8, delay: D) -> Self {
        Self::new(Link::Ddc { address }, delay)
    }
}

impl<U: SerialSource + SerialWrite, D: DelayNs> UbxReceiver<U, D> {
    /// `delay` paces the short waits for a poll response.
    pub fn new(link: Link<U>, delay: D) -> Self {
        Self {
            link,
            delay,
            rx: [0; RX_BUF],
            last_hdop: 0,
        }
    }

    /// Receiver on a dedicated UART.
    pub fn serial(port: U, delay: D) -> Self {
        Self::new(Link::Serial(port), delay)
    }

    pub fn link_mut(&mut self) -> &mut Link<U> {
        &mut self.link
    }

    /// Does a receiver answer a NAV-PVT poll?
    pub fn probe<I: I2c>(&mut self, bus: &mut I) -> bool {
        self.poll_message(bus, CLASS_NAV, ID_NAV_PVT).is_ok()
    }

    /// Switch the receiver's UART to `baud`. The host side must follow.
    pub fn set_port_rate<I: I2c>(&mut self, bus: &mut I, baud: u32) -> Result<(), ReceiverError> {
        let mut p = [0u8; 20];
        p[0] = PRT_PORT_UART1;
        p[4..8].copy_from_slice(&PRT_MODE_8N1.to_le_bytes());
        p[8..12].copy_from_slice(&baud.to_le_bytes());
        p[12..14].copy_from_slice(&PRT_IN_PROTO.to_le_bytes());
        p[14..16].copy_from_slice(&PRT_OUT_PROTO.to_le_bytes());
        self.send(bus, CLASS_CFG, ID_CFG_PRT, &p)
    }

    /// Clear and reload every configuration section from defaults.
    pub fn factory_reset<I: I2c>(&mut self, bus: &mut I) -> Result<(), ReceiverError> {
        // clearMask, saveMask, loadMask
        let p = [0xFF, 0xFF, 0, 0, 0, 0, 0, 0, 0xFF, 0xFF, 0, 0];
        self.send(bus, CLASS_CFG, ID_CFG_CFG, &p)
    }

    fn send<I: I2c>(&mut self, bus: &mut I, class: u8, id: u8, payload: &[u8]) -> Result<(), ReceiverError> {
        let mut out = [0u8; 32];
        let n = encode(class, id, payload, &mut out).ok_or(ReceiverError::Malformed)?;
        self.link.send(bus, &out[..n])
    }

    /// Send an empty poll request for `class/id` and wait for the answer.
    /// Returns the payload's range inside `self.rx`.
    fn poll_message<I: I2c>(
        &mut self,
        bus: &mut I,
        class: u8,
        id: u8,
    ) -> Result<core::ops::Range<usize>, ReceiverError> {
        self.send(bus, class, id, &[])?;
        let mut filled = 0;
        for _ in 0..RESPONSE_ATTEMPTS {
            if filled == RX_BUF {
                // Full of frames we do not want; start over.
                filled = 0;
            }
            let got = self.link.receive(bus, &mut self.rx[filled..])?;
            if got == 0 {
                self.delay.delay_ms(RESPONSE_POLL_MS);
                continue;
            }
            filled += got;

            let mut off = 0;
            while let Some((frame, end)) = next_frame(&self.rx[off..filled]) {
                if frame.class == class && frame.id == id {
                    let start = off + end - 2 - frame.payload.len();
                    return Ok(start..start + frame.payload.len());
                }
                debug!("UBX: skipping {:02X}/{:02X}", frame.class, frame.id);
                off += end;
            }
        }
        Err(ReceiverError::NoResponse)
    }

    fn nav_pvt<I: I2c>(&mut self, bus: &mut I) -> Result<NavPvt, ReceiverError> {
        let r = self.poll_message(bus, CLASS_NAV, ID_NAV_PVT)?;
        NavPvt::decode(&self.rx[r])
    }

    fn nav_hdop<I: I2c>(&mut self, bus: &mut I) -> Result<u32, ReceiverError> {
        let r = self.poll_message(bus, CLASS_NAV, ID_NAV_DOP)?;
        decode_hdop(&self.rx[r])
    }
}

impl<I, U, D> BinaryReceiver<I> for UbxReceiver<U, D>
where
    I: I2c,
    U: SerialSource + SerialWrite,
    D: DelayNs,
{
    fn fix_status(&mut self, bus: &mut I) -> Result<Option<FixStatus>, ReceiverError> {
        let pvt = self.nav_pvt(bus)?;
        if !pvt.fix_ok {
            return Ok(None);
        }
        let hdop = self.nav_hdop(bus)?;
        self.last_hdop = hdop;
        Ok(Some(FixStatus {
            fix_class: FixClass::from_code(pvt.fix_type),
            satellites: pvt.num_sv,
            hdop,
        }))
    }

    fn position(&mut self, bus: &mut I) -> Result<Position, ReceiverError> {
        let pvt = self.nav_pvt(bus)?;
        let hdop = self.nav_hdop(bus).unwrap_or(self.last_hdop);
        Ok(Position {
            latitude: pvt.lat,
            longitude: pvt.lon,
            altitude_mm: pvt.height_mm,
            hdop,
        })
    }

    fn set_measurement_rate(&mut self, bus: &mut I, rate_ms: u16) -> Result<(), ReceiverError> {
        let r = rate_ms.to_le_bytes();
        // measRate, navRate = 1 cycle, timeRef = GPS
        self.send(bus, CLASS_CFG, ID_CFG_RATE, &[r[0], r[1], 1, 0, 1, 0])
    }

    fn enter_power_save(&mut self, bus: &mut I, interval_ms: u16) -> Result<(), ReceiverError> {
        debug!("UBX: power save, {} ms cycle", interval_ms);
        let r = self.send(bus, CLASS_CFG, ID_CFG_RXM, &[8, 1]);
        if r.is_err() {
            warn!("UBX: power-save command not sent");
        }
        r
    }
}
