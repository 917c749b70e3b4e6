//! Mock hardware for integration tests.
//!
//! A simulated clock drives everything: delays advance it instantly, and
//! scheduled hooks fire when it passes their time, so a 30 s acquisition
//! cycle runs in microseconds. Every collaborator records its calls so
//! tests can assert on the full history.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

use trackfix::app::events::AppEvent;
use trackfix::app::ports::{
    ConfigError, ConfigPort, EventSink, PayloadSink, StatusDisplay, SystemControl, Timebase,
};
use trackfix::bus::BusArbiter;
use trackfix::config::AcquisitionConfig;
use trackfix::error::ReceiverError;
use trackfix::gnss::{BinaryReceiver, FixClass, FixStatus, Position, SerialSource};
use trackfix::payload::PayloadRecord;
use trackfix::ui::Screen;

pub type Arbiter = BusArbiter<CriticalSectionRawMutex, MockBus>;

// ── Simulated clock ───────────────────────────────────────────

/// Shared view of the simulated time, in milliseconds.
pub type Clock = Rc<Cell<u64>>;

type Hook<'a> = (u64, Box<dyn FnMut() + 'a>);

pub struct SimTime<'a> {
    now_ns: u64,
    clock: Clock,
    hooks: Vec<Hook<'a>>,
}

impl<'a> SimTime<'a> {
    pub fn new() -> Self {
        Self {
            now_ns: 0,
            clock: Rc::new(Cell::new(0)),
            hooks: Vec::new(),
        }
    }

    pub fn clock(&self) -> Clock {
        Rc::clone(&self.clock)
    }

    /// Run `f` once the clock reaches `at_ms`.
    pub fn at(&mut self, at_ms: u64, f: impl FnMut() + 'a) {
        self.hooks.push((at_ms, Box::new(f)));
    }

    pub fn advance_ms(&mut self, ms: u64) {
        self.delay_ns_u64(ms * 1_000_000);
    }

    fn delay_ns_u64(&mut self, ns: u64) {
        self.now_ns += ns;
        let now = self.now_ns / 1_000_000;
        self.clock.set(now);
        let mut i = 0;
        while i < self.hooks.len() {
            if self.hooks[i].0 <= now {
                let (_, mut f) = self.hooks.remove(i);
                f();
            } else {
                i += 1;
            }
        }
    }
}

impl DelayNs for SimTime<'_> {
    fn delay_ns(&mut self, ns: u32) {
        self.delay_ns_u64(u64::from(ns));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay_ns_u64(u64::from(ms) * 1_000_000);
    }
}

impl Timebase for SimTime<'_> {
    fn now_ms(&self) -> u64 {
        self.now_ns / 1_000_000
    }
}

// ── Bus ───────────────────────────────────────────────────────

/// Stand-in for the shared I2C bus. Counts transactions.
#[derive(Debug, Default)]
pub struct MockBus {
    pub ops: u32,
}

// ── Binary receiver ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverCall {
    Status,
    Position,
    SetRate(u16),
    PowerSave(u16),
}

/// Receiver whose fix status follows a time script: each entry applies
/// from its start time until the next one.
pub struct ScriptedReceiver {
    clock: Clock,
    script: Vec<(u64, Option<FixStatus>)>,
    pub position: Position,
    pub calls: Vec<ReceiverCall>,
}

impl ScriptedReceiver {
    pub fn new(clock: Clock, position: Position) -> Self {
        Self {
            clock,
            script: Vec::new(),
            position,
            calls: Vec::new(),
        }
    }

    /// From `from_ms` on, report `status` (`None` = no fix yet).
    pub fn then(mut self, from_ms: u64, status: Option<FixStatus>) -> Self {
        self.script.push((from_ms, status));
        self
    }

    pub fn count(&self, call: ReceiverCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }
}

impl BinaryReceiver<MockBus> for ScriptedReceiver {
    fn fix_status(&mut self, bus: &mut MockBus) -> Result<Option<FixStatus>, ReceiverError> {
        bus.ops += 1;
        self.calls.push(ReceiverCall::Status);
        let now = self.clock.get();
        Ok(self
            .script
            .iter()
            .rev()
            .find(|(from, _)| *from <= now)
            .and_then(|(_, s)| *s))
    }

    fn position(&mut self, bus: &mut MockBus) -> Result<Position, ReceiverError> {
        bus.ops += 1;
        self.calls.push(ReceiverCall::Position);
        Ok(self.position)
    }

    fn set_measurement_rate(&mut self, bus: &mut MockBus, rate_ms: u16) -> Result<(), ReceiverError> {
        bus.ops += 1;
        self.calls.push(ReceiverCall::SetRate(rate_ms));
        Ok(())
    }

    fn enter_power_save(&mut self, bus: &mut MockBus, interval_ms: u16) -> Result<(), ReceiverError> {
        bus.ops += 1;
        self.calls.push(ReceiverCall::PowerSave(interval_ms));
        Ok(())
    }
}

pub fn status(fix_class: FixClass, satellites: u8, hdop: u32) -> Option<FixStatus> {
    Some(FixStatus {
        fix_class,
        satellites,
        hdop,
    })
}

pub fn position(latitude: i32, longitude: i32) -> Position {
    Position {
        latitude,
        longitude,
        altitude_mm: 35_500,
        hdop: 180,
    }
}

// ── Serial link ───────────────────────────────────────────────

/// UART whose bytes become readable at scheduled times.
pub struct TimedSerial {
    clock: Clock,
    pending: VecDeque<(u64, Vec<u8>)>,
    fifo: VecDeque<u8>,
}

impl TimedSerial {
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            pending: VecDeque::new(),
            fifo: VecDeque::new(),
        }
    }

    pub fn at(mut self, at_ms: u64, bytes: &[u8]) -> Self {
        self.pending.push_back((at_ms, bytes.to_vec()));
        self
    }
}

impl SerialSource for TimedSerial {
    fn read_byte(&mut self) -> Option<u8> {
        let now = self.clock.get();
        while self.pending.front().is_some_and(|(t, _)| *t <= now) {
            if let Some((_, bytes)) = self.pending.pop_front() {
                self.fifo.extend(bytes);
            }
        }
        self.fifo.pop_front()
    }
}

/// NMEA sentence with checksum and CRLF.
pub fn nmea(body: &str) -> String {
    let sum = body.bytes().fold(0u8, |acc, b| acc ^ b);
    format!("${}*{:02X}\r\n", body, sum)
}

// ── Power pin ─────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockPin {
    pub levels: Vec<bool>,
}

impl MockPin {
    pub fn is_high(&self) -> bool {
        self.levels.last().copied().unwrap_or(false)
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.push(true);
        Ok(())
    }
}

// ── Display ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayCall {
    Clear,
    Line(String),
    Header(String),
    Menu {
        screen: Screen,
        highlighted: u8,
        entry_count: u8,
    },
    Power(bool),
}

#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub calls: Vec<DisplayCall>,
}

impl RecordingDisplay {
    pub fn lines(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DisplayCall::Line(l) => Some(l.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn last_menu(&self) -> Option<(Screen, u8)> {
        self.calls.iter().rev().find_map(|c| match c {
            DisplayCall::Menu {
                screen,
                highlighted,
                ..
            } => Some((*screen, *highlighted)),
            _ => None,
        })
    }

    pub fn headers(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DisplayCall::Header(h) => Some(h.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl StatusDisplay<MockBus> for RecordingDisplay {
    fn clear(&mut self, bus: &mut MockBus) {
        bus.ops += 1;
        self.calls.push(DisplayCall::Clear);
    }

    fn append_status_line(&mut self, bus: &mut MockBus, line: &str) {
        bus.ops += 1;
        self.calls.push(DisplayCall::Line(line.to_owned()));
    }

    fn write_header(&mut self, bus: &mut MockBus, title: &str) {
        bus.ops += 1;
        self.calls.push(DisplayCall::Header(title.to_owned()));
    }

    fn render_menu(&mut self, bus: &mut MockBus, screen: Screen, highlighted: u8, entry_count: u8) {
        bus.ops += 1;
        self.calls.push(DisplayCall::Menu {
            screen,
            highlighted,
            entry_count,
        });
    }

    fn set_power(&mut self, bus: &mut MockBus, on: bool) {
        bus.ops += 1;
        self.calls.push(DisplayCall::Power(on));
    }
}

// ── Sinks ─────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
    pub payloads: Vec<PayloadRecord>,
    pub battery_mv: u16,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_event(&self) -> Option<&AppEvent> {
        self.events.last()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}

impl PayloadSink for RecordingSink {
    fn battery_mv(&mut self) -> u16 {
        self.battery_mv
    }

    fn send(&mut self, record: &PayloadRecord) {
        self.payloads.push(*record);
    }
}

// ── Config store ──────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemConfig {
    pub saved: RefCell<Vec<AcquisitionConfig>>,
    pub fail: bool,
}

impl MemConfig {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn save_count(&self) -> usize {
        self.saved.borrow().len()
    }
}

impl ConfigPort for MemConfig {
    fn load(&self) -> Result<AcquisitionConfig, ConfigError> {
        Ok(self.saved.borrow().last().copied().unwrap_or_default())
    }

    fn save(&self, config: &AcquisitionConfig) -> Result<(), ConfigError> {
        if self.fail {
            return Err(ConfigError::IoError);
        }
        config.validate().map_err(ConfigError::ValidationFailed)?;
        self.saved.borrow_mut().push(*config);
        Ok(())
    }
}

// ── System control ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemCall {
    Restart,
    Bootloader,
    Advertising(u32),
}

#[derive(Debug, Default)]
pub struct RecordingSystem {
    pub calls: Vec<SystemCall>,
}

impl SystemControl for RecordingSystem {
    fn restart(&mut self) {
        self.calls.push(SystemCall::Restart);
    }

    fn enter_bootloader(&mut self) {
        self.calls.push(SystemCall::Bootloader);
    }

    fn restart_advertising(&mut self, window_ms: u32) {
        self.calls.push(SystemCall::Advertising(window_ms));
    }
}
