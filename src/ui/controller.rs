//! Applies menu transitions to the device.
//!
//! [`MenuController`] owns the UI state, the report timer and the display
//! saver countdown. It runs in the main loop: `handle` for each gesture,
//! `tick` every loop iteration. All rendering goes through the bus arbiter;
//! a bus timeout skips that draw and the controller carries on.

use embassy_sync::blocking_mutex::raw::RawMutex;
use log::{info, warn};

use super::menu::{Effect, MenuView, transition};
use super::{Gesture, Screen, UiState, status};
use crate::app::events::AppEvent;
use crate::app::ports::{ConfigPort, EventSink, StatusDisplay, SystemControl, Timebase};
use crate::bus::{BusArbiter, DEFAULT_BUS_TIMEOUT_MS};
use crate::config::AcquisitionConfig;
use crate::state::{DeviceState, SharedConfig};
use crate::wake::{ReportTimer, WakeReason, WakeSignal};

/// Minimum time a destructive-action banner stays on screen.
pub const CONFIRM_DELAY_MS: u32 = 1000;

/// Shared resources the controller works against.
pub struct UiContext<'a, M: RawMutex, B> {
    pub bus: &'a BusArbiter<M, B>,
    pub state: &'a DeviceState,
    pub config: &'a SharedConfig,
    pub wake: &'a WakeSignal,
}

pub struct MenuController<D, C, S> {
    display: D,
    store: C,
    system: S,
    ui: UiState,
    timer: ReportTimer,
    saver_deadline_ms: Option<u64>,
}

impl<D, C: ConfigPort, S: SystemControl> MenuController<D, C, S> {
    /// Start in Idle with the report timer running at `config`'s interval.
    pub fn new(display: D, store: C, system: S, config: &AcquisitionConfig, now_ms: u64) -> Self {
        Self {
            display,
            store,
            system,
            ui: UiState::Idle,
            timer: ReportTimer::new(config.report_interval_ms, now_ms),
            saver_deadline_ms: None,
        }
    }

    pub fn state(&self) -> UiState {
        self.ui
    }

    pub fn timer(&self) -> &ReportTimer {
        &self.timer
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    pub fn system(&self) -> &S {
        &self.system
    }

    /// When the saver will next blank the display, if armed.
    pub fn saver_deadline_ms(&self) -> Option<u64> {
        self.saver_deadline_ms
    }

    /// Process one gesture.
    pub fn handle<M, B>(
        &mut self,
        gesture: Gesture,
        ctx: &UiContext<'_, M, B>,
        time: &mut impl Timebase,
        sink: &mut impl EventSink,
    ) where
        M: RawMutex,
        D: StatusDisplay<B>,
    {
        let now = time.now_ms();
        let config = ctx.config.get();
        if self.saver_deadline_ms.is_some() {
            self.saver_deadline_ms = Some(now + u64::from(config.display_saver_timeout_ms));
        }

        let view = MenuView {
            config,
            acquisition_active: ctx.state.acquisition_active(),
            display_off: ctx.state.display_off(),
            saver_enabled: ctx.state.display_saver_enabled(),
        };
        let t = transition(self.ui, gesture, &view);
        self.ui = t.next;
        for effect in t.effects {
            // A cycle may have claimed the device since the view was taken.
            if effect == Effect::EnterMenu && !ctx.state.try_enter_menu() {
                self.ui = UiState::Idle;
                self.apply(Effect::Busy, ctx, time, sink);
                break;
            }
            self.apply(effect, ctx, time, sink);
        }
    }

    /// Periodic housekeeping: report timer and display saver.
    pub fn tick<M, B>(&mut self, ctx: &UiContext<'_, M, B>, time: &mut impl Timebase)
    where
        M: RawMutex,
        D: StatusDisplay<B>,
    {
        let now = time.now_ms();
        self.timer.tick(now, ctx.wake);

        let Some(deadline) = self.saver_deadline_ms else {
            return;
        };
        if now < deadline {
            return;
        }
        self.saver_deadline_ms = None;
        if ctx.state.display_saver_enabled() && !ctx.state.display_off() {
            info!("UI: display saver timeout, display off");
            self.power(ctx, time, false);
        }
    }

    /// Draw the passive status view: header plus settings summary.
    pub fn show_idle<M, B>(&mut self, ctx: &UiContext<'_, M, B>, time: &mut impl Timebase)
    where
        M: RawMutex,
        D: StatusDisplay<B>,
    {
        let config = ctx.config.get();
        let lines = status::summary(&config);
        let display = &mut self.display;
        let _ = ctx.bus.with_bus(DEFAULT_BUS_TIMEOUT_MS, time, |b| {
            display.write_header(b, status::header(&config));
            display.clear(b);
            for l in &lines {
                display.append_status_line(b, l);
            }
        });
    }

    fn apply<M, B>(
        &mut self,
        effect: Effect,
        ctx: &UiContext<'_, M, B>,
        time: &mut impl Timebase,
        sink: &mut impl EventSink,
    ) where
        M: RawMutex,
        D: StatusDisplay<B>,
    {
        match effect {
            Effect::Busy => {
                warn!("UI: acquisition in progress, menu refused");
                sink.emit(&AppEvent::MenuBusy);
            }
            Effect::EnterMenu => {
                // `menu_active` was claimed in `handle`.
                self.timer.stop();
                info!("UI: menu opened");
                sink.emit(&AppEvent::MenuOpened);
            }
            Effect::ExitMenu => {
                ctx.state.set_menu_active(false);
                let interval = ctx.config.get().report_interval_ms;
                self.timer.restart(interval, time.now_ms());
                self.show_idle(ctx, time);
                info!("UI: menu closed");
                sink.emit(&AppEvent::MenuClosed);
            }
            Effect::Render {
                screen,
                highlighted,
            } => self.render(ctx, time, screen, highlighted),
            Effect::Commit(config) => {
                ctx.config.set(config);
                match self.store.save(&config) {
                    Ok(()) => info!("UI: configuration saved"),
                    Err(e) => warn!("UI: configuration not saved: {}", e),
                }
                sink.emit(&AppEvent::ConfigCommitted(config));
            }
            Effect::RestartDevice => {
                info!("UI: link changed, restarting");
                self.system.restart();
            }
            Effect::ForceAcquisition => {
                info!("UI: forced acquisition requested");
                ctx.wake.notify(WakeReason::Forced);
            }
            Effect::DisplayPower(on) => self.power(ctx, time, on),
            Effect::Saver(enabled) => {
                ctx.state.set_display_saver_enabled(enabled);
                self.saver_deadline_ms = enabled.then(|| {
                    time.now_ms() + u64::from(ctx.config.get().display_saver_timeout_ms)
                });
                info!("UI: display saver {}", if enabled { "on" } else { "off" });
            }
            Effect::RestartAdvertising { window_ms } => {
                info!("UI: advertising restart, {} ms window", window_ms);
                self.system.restart_advertising(window_ms);
            }
            Effect::ConfirmReset => {
                self.confirm(ctx, time, "RESET");
                warn!("UI: reset requested");
                self.system.restart();
            }
            Effect::ConfirmBootloader => {
                self.confirm(ctx, time, "BOOTLOADER MODE");
                warn!("UI: bootloader requested");
                self.system.enter_bootloader();
            }
        }
    }

    fn render<M, B>(
        &mut self,
        ctx: &UiContext<'_, M, B>,
        time: &mut impl Timebase,
        screen: Screen,
        highlighted: u8,
    ) where
        M: RawMutex,
        D: StatusDisplay<B>,
    {
        let display = &mut self.display;
        let _ = ctx.bus.with_bus(DEFAULT_BUS_TIMEOUT_MS, time, |b| {
            display.render_menu(b, screen, highlighted, screen.entry_count());
        });
    }

    fn power<M, B>(&mut self, ctx: &UiContext<'_, M, B>, time: &mut impl Timebase, on: bool)
    where
        M: RawMutex,
        D: StatusDisplay<B>,
    {
        let display = &mut self.display;
        let _ = ctx.bus.with_bus(DEFAULT_BUS_TIMEOUT_MS, time, |b| display.set_power(b, on));
        ctx.state.set_display_off(!on);
        if !on {
            self.saver_deadline_ms = None;
        }
        info!("UI: display {}", if on { "on" } else { "off" });
    }

    /// Banner before a destructive action. The action runs even if the
    /// banner could not be drawn.
    fn confirm<M, B>(&mut self, ctx: &UiContext<'_, M, B>, time: &mut impl Timebase, text: &str)
    where
        M: RawMutex,
        D: StatusDisplay<B>,
    {
        if ctx.state.display_off() {
            self.power(ctx, time, true);
        }
        let display = &mut self.display;
        let _ = ctx.bus.with_bus(DEFAULT_BUS_TIMEOUT_MS, time, |b| {
            display.clear(b);
            display.write_header(b, text);
        });
        time.delay_ms(CONFIRM_DELAY_MS);
    }
}
