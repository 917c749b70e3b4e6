//! Acquisition scheduler: one bounded positioning cycle per wake.
//!
//! ```text
//!   WakeSignal ──▶ AcquisitionTask ──▶ AcquisitionScheduler::run_cycle
//!                                          │  power on, settle if it was off
//!                                          │  loop: menu? deadline? poll
//!                                          │  power off (unless beacon)
//!                                          ▼
//!                                  EventSink / PayloadSink / display
//! ```
//!
//! The loop's only suspension points are the backend sleeps, and each one
//! is followed by a `menu_active` check, so an opened menu ends the cycle
//! within one poll interval. The bus is taken per operation, never for the
//! whole cycle.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::digital::OutputPin;
use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, PayloadSink, StatusDisplay, Timebase};
use crate::bus::{BusArbiter, DEFAULT_BUS_TIMEOUT_MS};
use crate::config::AcquisitionConfig;
use crate::gnss::binary::{BinaryPoll, POLL_INTERVAL_MS};
use crate::gnss::text::{IDLE_POLL_MS, TextPoll};
use crate::gnss::{
    BinaryReceiver, FixResult, FixSample, Observation, ProtocolAdapter, SerialSource,
};
use crate::payload;
use crate::state::{DeviceState, SharedConfig};
use crate::ui::status;
use crate::wake::{WakeReason, WakeSignal};

/// Receiver warm-up after power-on.
pub const POWER_SETTLE_MS: u32 = 500;

/// Longest a cycle may run.
pub const MAX_TIMEOUT_MS: u32 = 90_000;

/// Cycle deadline for a given report interval: half the interval, capped at
/// [`MAX_TIMEOUT_MS`]. An interval of 0 (no periodic reports) gets the cap.
pub fn derive_timeout(report_interval_ms: u32) -> u32 {
    match report_interval_ms {
        0 => MAX_TIMEOUT_MS,
        i if i <= MAX_TIMEOUT_MS => i / 2,
        _ => MAX_TIMEOUT_MS,
    }
}

/// Shared resources a cycle touches.
pub struct CycleContext<'a, M: RawMutex, B> {
    pub bus: &'a BusArbiter<M, B>,
    pub state: &'a DeviceState,
}

enum Outcome {
    Sample(FixSample),
    Deadline,
    Cancelled,
}

pub struct AcquisitionScheduler<R, S, P> {
    adapter: ProtocolAdapter<R, S>,
    power: P,
    powered: bool,
}

impl<R, S, P> AcquisitionScheduler<R, S, P>
where
    S: SerialSource,
    P: OutputPin,
{
    /// `power` is assumed low until the first cycle drives it.
    pub fn new(adapter: ProtocolAdapter<R, S>, power: P) -> Self {
        Self {
            adapter,
            power,
            powered: false,
        }
    }

    /// Start with the receiver already powered and settled (left on after
    /// discovery for beacon transport).
    pub fn powered_on(mut self) -> Self {
        self.powered = true;
        self
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub fn adapter(&self) -> &ProtocolAdapter<R, S> {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut ProtocolAdapter<R, S> {
        &mut self.adapter
    }

    pub fn power_pin(&self) -> &P {
        &self.power
    }

    /// Run one acquisition cycle. Refused (NoFix, no bus access) if the menu
    /// is open.
    pub fn run_cycle<M, B>(
        &mut self,
        config: &AcquisitionConfig,
        reason: WakeReason,
        ctx: &CycleContext<'_, M, B>,
        time: &mut impl Timebase,
        display: &mut impl StatusDisplay<B>,
        out: &mut (impl EventSink + PayloadSink),
    ) -> FixResult
    where
        M: RawMutex,
        R: BinaryReceiver<B>,
    {
        if ctx.state.menu_active() {
            return refuse(reason, out);
        }

        let backend = self.adapter.kind();
        out.emit(&AppEvent::AcquisitionStarted { backend, reason });
        let _ = ctx
            .bus
            .with_bus(DEFAULT_BUS_TIMEOUT_MS, time, |b| display.clear(b));

        match &mut self.adapter {
            ProtocolAdapter::Binary(b) => b.begin_cycle(),
            ProtocolAdapter::Text(t) => t.begin_cycle(),
        }

        self.power_on(time);

        let timeout = derive_timeout(config.report_interval_ms);
        let start = time.now_ms();
        let deadline = start + u64::from(timeout);
        info!("GNSS: cycle start on {:?}, timeout {} ms", backend, timeout);

        let outcome = self.acquire(config, ctx, time, deadline);
        let cancelled = matches!(outcome, Outcome::Cancelled);
        let duration_ms = u32::try_from(time.now_ms() - start).unwrap_or(u32::MAX);

        let result = match outcome {
            Outcome::Sample(mut sample) if !sample.is_null_island() => {
                sample.duration_ms = duration_ms;
                FixResult::Fix(sample)
            }
            Outcome::Sample(_) => {
                warn!("GNSS: 0/0 position rejected");
                FixResult::NoFix
            }
            Outcome::Deadline => {
                info!("GNSS: no fix within {} ms", timeout);
                FixResult::NoFix
            }
            Outcome::Cancelled => {
                info!("GNSS: cycle cancelled by menu after {} ms", duration_ms);
                FixResult::NoFix
            }
        };

        self.finish(config, ctx, time, &result, cancelled);

        if !ctx.state.menu_active() {
            let lines = match &result {
                FixResult::Fix(s) => status::fix_lines(s, backend),
                FixResult::NoFix => status::no_fix_lines(self.observation(), backend, duration_ms),
            };
            let _ = ctx.bus.with_bus(DEFAULT_BUS_TIMEOUT_MS, time, |b| {
                if !result.is_fix() {
                    display.clear(b);
                }
                for l in &lines {
                    display.append_status_line(b, l);
                }
            });
        }

        if let FixResult::Fix(sample) = &result {
            info!(
                "GNSS: fix lat={} lon={} alt={}mm dop={} in {} ms",
                sample.latitude, sample.longitude, sample.altitude_mm, sample.hdop, duration_ms
            );
            let battery_mv = out.battery_mv();
            out.send(&payload::build(sample, config, battery_mv));
        }
        out.emit(&AppEvent::AcquisitionFinished(result));
        result
    }

    fn acquire<M, B>(
        &mut self,
        config: &AcquisitionConfig,
        ctx: &CycleContext<'_, M, B>,
        time: &mut impl Timebase,
        deadline: u64,
    ) -> Outcome
    where
        M: RawMutex,
        R: BinaryReceiver<B>,
    {
        loop {
            if ctx.state.menu_active() {
                return Outcome::Cancelled;
            }
            let now = time.now_ms();
            if now >= deadline {
                return Outcome::Deadline;
            }
            let remaining = u32::try_from(deadline - now).unwrap_or(u32::MAX);

            match &mut self.adapter {
                ProtocolAdapter::Binary(b) => {
                    let bus_timeout = DEFAULT_BUS_TIMEOUT_MS.min(remaining);
                    match b.poll(ctx.bus, time, config.precision_mode, bus_timeout) {
                        BinaryPoll::Accepted { status, position } => {
                            return Outcome::Sample(FixSample {
                                latitude: position.latitude,
                                longitude: position.longitude,
                                altitude_mm: position.altitude_mm,
                                hdop: position.hdop,
                                fix_class: status.fix_class,
                                satellites: status.satellites,
                                duration_ms: 0,
                            });
                        }
                        BinaryPoll::Pending => time.delay_ms(POLL_INTERVAL_MS.min(remaining)),
                    }
                }
                ProtocolAdapter::Text(t) => match t.poll() {
                    TextPoll::Usable(sample) => return Outcome::Sample(sample),
                    TextPoll::Pending => {}
                    TextPoll::Idle => time.delay_ms(IDLE_POLL_MS.min(remaining)),
                },
            }
        }
    }

    /// Drive the receiver's power high. Settles only when it was off; in
    /// beacon transport it normally stays on between cycles.
    fn power_on(&mut self, time: &mut impl Timebase) {
        if let Err(e) = self.power.set_high() {
            warn!("GNSS: power-on failed: {:?}", e);
        }
        if !self.powered {
            time.delay_ms(POWER_SETTLE_MS);
            self.powered = true;
        }
    }

    /// Power down, or in beacon transport hand the receiver over to its own
    /// low-power schedule. A cancelled cycle issues no receiver commands.
    fn finish<M, B>(
        &mut self,
        config: &AcquisitionConfig,
        ctx: &CycleContext<'_, M, B>,
        time: &mut impl Timebase,
        result: &FixResult,
        cancelled: bool,
    ) where
        M: RawMutex,
        R: BinaryReceiver<B>,
    {
        if !config.is_beacon() {
            if let Err(e) = self.power.set_low() {
                warn!("GNSS: power-off failed: {:?}", e);
            }
            self.powered = false;
            return;
        }
        if cancelled {
            return;
        }
        if let ProtocolAdapter::Binary(b) = &mut self.adapter {
            if result.is_fix() {
                debug!("GNSS: beacon fix, entering low-power tracking");
                b.enter_low_power_tracking(ctx.bus, time);
            } else {
                debug!("GNSS: beacon cycle failed, restoring measurement rate");
                b.restore_measurement_rate(ctx.bus, time);
            }
        }
    }

    fn observation(&self) -> Observation {
        match &self.adapter {
            ProtocolAdapter::Binary(b) => b.last_observation(),
            ProtocolAdapter::Text(t) => t.last_observation(),
        }
    }
}

fn refuse(reason: WakeReason, out: &mut impl EventSink) -> FixResult {
    info!("GNSS: menu open, {:?} wake refused", reason);
    out.emit(&AppEvent::AcquisitionRefused(reason));
    FixResult::NoFix
}

// ───────────────────────────────────────────────────────────────
// Task
// ───────────────────────────────────────────────────────────────

/// The acquisition thread's body: wait for a wake, run one cycle.
pub struct AcquisitionTask<'a, M: RawMutex, B, R, S, P> {
    scheduler: AcquisitionScheduler<R, S, P>,
    ctx: CycleContext<'a, M, B>,
    config: &'a SharedConfig,
    wake: &'a WakeSignal,
}

impl<'a, M, B, R, S, P> AcquisitionTask<'a, M, B, R, S, P>
where
    M: RawMutex,
    R: BinaryReceiver<B>,
    S: SerialSource,
    P: OutputPin,
{
    pub fn new(
        scheduler: AcquisitionScheduler<R, S, P>,
        ctx: CycleContext<'a, M, B>,
        config: &'a SharedConfig,
        wake: &'a WakeSignal,
    ) -> Self {
        Self {
            scheduler,
            ctx,
            config,
            wake,
        }
    }

    pub fn scheduler(&self) -> &AcquisitionScheduler<R, S, P> {
        &self.scheduler
    }

    /// Run one cycle for `reason`, unless the menu holds the device. The
    /// claim is exclusive with [`DeviceState::try_enter_menu`].
    pub fn handle_wake(
        &mut self,
        reason: WakeReason,
        time: &mut impl Timebase,
        display: &mut impl StatusDisplay<B>,
        out: &mut (impl EventSink + PayloadSink),
    ) -> FixResult {
        if !self.ctx.state.try_begin_acquisition() {
            return refuse(reason, out);
        }
        let config = self.config.get();
        let result = self
            .scheduler
            .run_cycle(&config, reason, &self.ctx, time, display, out);
        self.ctx.state.set_acquisition_active(false);
        result
    }

    /// Block for the next wake, then handle it.
    pub fn run_once(
        &mut self,
        time: &mut impl Timebase,
        display: &mut impl StatusDisplay<B>,
        out: &mut (impl EventSink + PayloadSink),
    ) -> FixResult {
        let reason = self.wake.wait();
        debug!("GNSS: woken ({:?})", reason);
        self.handle_wake(reason, time, display, out)
    }

    pub fn run(
        mut self,
        time: &mut impl Timebase,
        display: &mut impl StatusDisplay<B>,
        out: &mut (impl EventSink + PayloadSink),
    ) -> ! {
        loop {
            self.run_once(time, display, out);
        }
    }
}
