//! Integration tests for wake → acquisition cycle → events/payload/display.
//!
//! Every cycle runs against the simulated clock in `mock_hw`, so deadlines
//! and poll intervals are asserted to the millisecond.

use std::cell::Cell;

use crate::mock_hw::{
    Arbiter, DisplayCall, MockBus, MockPin, ReceiverCall, RecordingDisplay, RecordingSink,
    ScriptedReceiver, SimTime, TimedSerial, nmea, position, status,
};

use trackfix::acquisition::{AcquisitionScheduler, AcquisitionTask, CycleContext};
use trackfix::app::events::AppEvent;
use trackfix::app::ports::Timebase;
use trackfix::config::{AcquisitionConfig, BackendKind, PrecisionMode, TransportMode};
use trackfix::gnss::{BinaryBackend, FixClass, FixResult, ProtocolAdapter, TextBackend};
use trackfix::payload::PayloadRecord;
use trackfix::state::{DeviceState, SharedConfig};
use trackfix::wake::{WakeReason, WakeSignal};

type BinaryScheduler = AcquisitionScheduler<ScriptedReceiver, TimedSerial, MockPin>;

fn high_precision() -> AcquisitionConfig {
    AcquisitionConfig {
        precision_mode: PrecisionMode::High,
        report_interval_ms: 60_000,
        ..AcquisitionConfig::default()
    }
}

fn beacon() -> AcquisitionConfig {
    AcquisitionConfig {
        transport_mode: TransportMode::LowPowerBeacon,
        report_interval_ms: 60_000,
        ..AcquisitionConfig::default()
    }
}

fn binary(receiver: ScriptedReceiver) -> BinaryScheduler {
    AcquisitionScheduler::new(
        ProtocolAdapter::Binary(BinaryBackend::new(receiver)),
        MockPin::default(),
    )
}

fn receiver_of(s: &BinaryScheduler) -> &ScriptedReceiver {
    match s.adapter() {
        ProtocolAdapter::Binary(b) => b.receiver(),
        ProtocolAdapter::Text(_) => panic!("expected binary backend"),
    }
}

// ── Binary backend ───────────────────────────────────────────

#[test]
fn high_precision_fix_available_immediately() {
    let state = DeviceState::new();
    let bus = Arbiter::new(MockBus::default());
    let mut time = SimTime::new();
    let rx = ScriptedReceiver::new(time.clock(), position(144_213_730, 1_210_069_140))
        .then(0, status(FixClass::Fix3D, 7, 200));
    let mut sched = binary(rx);
    let mut display = RecordingDisplay::default();
    let mut sink = RecordingSink::new();

    let ctx = CycleContext {
        bus: &bus,
        state: &state,
    };
    let result = sched.run_cycle(
        &high_precision(),
        WakeReason::Periodic,
        &ctx,
        &mut time,
        &mut display,
        &mut sink,
    );

    let FixResult::Fix(sample) = result else {
        panic!("expected a fix, got {result:?}");
    };
    assert_eq!(sample.fix_class, FixClass::Fix3D);
    assert_eq!(sample.satellites, 7);
    assert_eq!(sample.latitude, 144_213_730);
    // Power settle only; the first poll is accepted.
    assert_eq!(time.now_ms(), 500);
    assert_eq!(sched.power_pin().levels, vec![true, false]);
    assert_eq!(
        sink.events.first(),
        Some(&AppEvent::AcquisitionStarted {
            backend: BackendKind::Binary,
            reason: WakeReason::Periodic,
        })
    );
    assert_eq!(sink.last_event(), Some(&AppEvent::AcquisitionFinished(result)));
    assert_eq!(sink.payloads.len(), 1);
    assert!(matches!(
        sink.payloads[0],
        PayloadRecord::Standard { satellites: 7, .. }
    ));
    assert_eq!(display.lines()[0], "Fix: Fix type 3D Sat: 7");
    assert_eq!(display.lines()[1], "Lat: 14.421373");
}

#[test]
fn fix_after_quality_improves_is_stamped_with_duration() {
    let state = DeviceState::new();
    let bus = Arbiter::new(MockBus::default());
    let mut time = SimTime::new();
    let rx = ScriptedReceiver::new(time.clock(), position(10, 20))
        .then(0, status(FixClass::Fix2D, 3, 900))
        .then(2_000, status(FixClass::Fix3D, 7, 200));
    let mut sched = binary(rx);
    let ctx = CycleContext {
        bus: &bus,
        state: &state,
    };

    let result = sched.run_cycle(
        &high_precision(),
        WakeReason::Forced,
        &ctx,
        &mut time,
        &mut RecordingDisplay::default(),
        &mut RecordingSink::new(),
    );

    // Polls at 500 and 1500 are rejected, 2500 is accepted.
    let sample = result.sample().copied().expect("fix");
    assert_eq!(sample.duration_ms, 2_000);
    assert_eq!(receiver_of(&sched).count(ReceiverCall::Status), 3);
    assert_eq!(receiver_of(&sched).count(ReceiverCall::Position), 1);
}

#[test]
fn insufficient_satellites_times_out_at_half_interval() {
    let state = DeviceState::new();
    let bus = Arbiter::new(MockBus::default());
    let mut time = SimTime::new();
    let rx = ScriptedReceiver::new(time.clock(), position(10, 20))
        .then(0, status(FixClass::Fix3D, 3, 120));
    let mut sched = binary(rx);
    let mut display = RecordingDisplay::default();
    let mut sink = RecordingSink::new();
    let ctx = CycleContext {
        bus: &bus,
        state: &state,
    };

    let result = sched.run_cycle(
        &high_precision(),
        WakeReason::Periodic,
        &ctx,
        &mut time,
        &mut display,
        &mut sink,
    );

    assert_eq!(result, FixResult::NoFix);
    assert_eq!(time.now_ms(), 500 + 30_000);
    let rx = receiver_of(&sched);
    assert_eq!(rx.count(ReceiverCall::Status), 30);
    assert_eq!(rx.count(ReceiverCall::Position), 0);
    assert!(sink.payloads.is_empty());
    assert!(!sched.power_pin().is_high());

    let lines = display.lines();
    assert_eq!(lines[0], "No location fix");
    assert_eq!(lines[1], "Fix: Fix type 3D Sat: 3");
    assert_eq!(lines[2], "Acq time: 30.0");
}

#[test]
fn low_precision_ignores_satellites_and_dop() {
    let state = DeviceState::new();
    let bus = Arbiter::new(MockBus::default());
    let mut time = SimTime::new();
    let rx = ScriptedReceiver::new(time.clock(), position(10, 20))
        .then(0, status(FixClass::Fix3D, 0, 9_900));
    let mut sched = binary(rx);
    let ctx = CycleContext {
        bus: &bus,
        state: &state,
    };
    let config = AcquisitionConfig {
        precision_mode: PrecisionMode::Low,
        ..high_precision()
    };

    let result = sched.run_cycle(
        &config,
        WakeReason::Periodic,
        &ctx,
        &mut time,
        &mut RecordingDisplay::default(),
        &mut RecordingSink::new(),
    );
    assert!(result.is_fix());
}

#[test]
fn menu_raised_mid_cycle_cancels_within_one_poll() {
    let state = DeviceState::new();
    let bus = Arbiter::new(MockBus::default());
    let mut time = SimTime::new();
    time.at(5_200, || state.set_menu_active(true));
    let rx = ScriptedReceiver::new(time.clock(), position(10, 20)).then(0, None);
    let mut sched = binary(rx);
    let mut display = RecordingDisplay::default();
    let mut sink = RecordingSink::new();
    let ctx = CycleContext {
        bus: &bus,
        state: &state,
    };

    let result = sched.run_cycle(
        &high_precision(),
        WakeReason::Periodic,
        &ctx,
        &mut time,
        &mut display,
        &mut sink,
    );

    assert_eq!(result, FixResult::NoFix);
    assert!(time.now_ms() - 5_200 <= 1_000, "ended at {}", time.now_ms());
    // No polls after the menu opened.
    assert_eq!(receiver_of(&sched).count(ReceiverCall::Status), 5);
    // The menu owns the display now; no result lines drawn.
    assert!(display.lines().is_empty());
    assert!(!sched.power_pin().is_high());
    assert_eq!(sink.last_event(), Some(&AppEvent::AcquisitionFinished(FixResult::NoFix)));
}

#[test]
fn cycle_refused_while_menu_open() {
    let state = DeviceState::new();
    state.set_menu_active(true);
    let bus = Arbiter::new(MockBus::default());
    let mut time = SimTime::new();
    let rx = ScriptedReceiver::new(time.clock(), position(10, 20))
        .then(0, status(FixClass::Fix3D, 9, 100));
    let mut sched = binary(rx);
    let mut sink = RecordingSink::new();
    let ctx = CycleContext {
        bus: &bus,
        state: &state,
    };

    let result = sched.run_cycle(
        &high_precision(),
        WakeReason::Periodic,
        &ctx,
        &mut time,
        &mut RecordingDisplay::default(),
        &mut sink,
    );

    assert_eq!(result, FixResult::NoFix);
    assert_eq!(sink.events, vec![AppEvent::AcquisitionRefused(WakeReason::Periodic)]);
    assert!(receiver_of(&sched).calls.is_empty());
    assert!(sched.power_pin().levels.is_empty());
    assert_eq!(time.now_ms(), 0);
    assert_eq!(bus.into_inner().ops, 0);
}

#[test]
fn zero_zero_position_is_rejected() {
    let state = DeviceState::new();
    let bus = Arbiter::new(MockBus::default());
    let mut time = SimTime::new();
    let rx = ScriptedReceiver::new(time.clock(), position(0, 0))
        .then(0, status(FixClass::Fix3D, 9, 100));
    let mut sched = binary(rx);
    let mut sink = RecordingSink::new();
    let ctx = CycleContext {
        bus: &bus,
        state: &state,
    };

    let result = sched.run_cycle(
        &high_precision(),
        WakeReason::Periodic,
        &ctx,
        &mut time,
        &mut RecordingDisplay::default(),
        &mut sink,
    );

    assert_eq!(result, FixResult::NoFix);
    assert!(sink.payloads.is_empty());
}

// ── Beacon transport ─────────────────────────────────────────

#[test]
fn beacon_fix_keeps_receiver_powered_and_enters_tracking() {
    let state = DeviceState::new();
    let bus = Arbiter::new(MockBus::default());
    let mut time = SimTime::new();
    let rx = ScriptedReceiver::new(time.clock(), position(10, 20))
        .then(0, status(FixClass::Fix3D, 4, 300));
    let mut sched = binary(rx);
    let mut sink = RecordingSink {
        battery_mv: 3_870,
        ..RecordingSink::new()
    };
    let ctx = CycleContext {
        bus: &bus,
        state: &state,
    };

    let result = sched.run_cycle(
        &beacon(),
        WakeReason::Periodic,
        &ctx,
        &mut time,
        &mut RecordingDisplay::default(),
        &mut sink,
    );

    assert!(result.is_fix());
    // Powered from cold, settled once, never switched off.
    assert_eq!(sched.power_pin().levels, vec![true]);
    assert!(sched.is_powered());
    assert_eq!(time.now_ms(), 500);
    let rx = receiver_of(&sched);
    assert!(rx.calls.ends_with(&[
        ReceiverCall::SetRate(10_000),
        ReceiverCall::PowerSave(10_000)
    ]));
    assert!(matches!(
        sink.payloads[0],
        PayloadRecord::Beacon {
            battery_mv: 3_870,
            ..
        }
    ));
}

#[test]
fn failed_beacon_cycle_restores_measurement_rate() {
    let state = DeviceState::new();
    let bus = Arbiter::new(MockBus::default());
    let mut time = SimTime::new();
    let rx = ScriptedReceiver::new(time.clock(), position(10, 20)).then(0, None);
    let mut sched = binary(rx);
    let ctx = CycleContext {
        bus: &bus,
        state: &state,
    };
    let config = AcquisitionConfig {
        report_interval_ms: 4_000,
        ..beacon()
    };

    let result = sched.run_cycle(
        &config,
        WakeReason::Periodic,
        &ctx,
        &mut time,
        &mut RecordingDisplay::default(),
        &mut RecordingSink::new(),
    );

    assert_eq!(result, FixResult::NoFix);
    assert_eq!(time.now_ms(), 500 + 2_000);
    let rx = receiver_of(&sched);
    assert_eq!(rx.calls.last(), Some(&ReceiverCall::SetRate(1_000)));
    assert_eq!(rx.count(ReceiverCall::PowerSave(10_000)), 0);
    assert!(sched.power_pin().is_high());
}

#[test]
fn switching_to_beacon_after_standard_cycle_powers_receiver() {
    let state = DeviceState::new();
    let bus = Arbiter::new(MockBus::default());
    let mut time = SimTime::new();
    let rx = ScriptedReceiver::new(time.clock(), position(10, 20))
        .then(0, status(FixClass::Fix3D, 9, 100));
    let mut sched = binary(rx);
    let ctx = CycleContext {
        bus: &bus,
        state: &state,
    };
    let standard = AcquisitionConfig {
        report_interval_ms: 60_000,
        ..AcquisitionConfig::default()
    };

    let first = sched.run_cycle(
        &standard,
        WakeReason::Periodic,
        &ctx,
        &mut time,
        &mut RecordingDisplay::default(),
        &mut RecordingSink::new(),
    );
    assert!(first.is_fix());
    assert!(!sched.power_pin().is_high());

    let second = sched.run_cycle(
        &beacon(),
        WakeReason::Periodic,
        &ctx,
        &mut time,
        &mut RecordingDisplay::default(),
        &mut RecordingSink::new(),
    );
    assert!(second.is_fix());
    assert_eq!(sched.power_pin().levels, vec![true, false, true]);
    assert_eq!(time.now_ms(), 1_000);

    // Still powered: the next beacon cycle skips the settle.
    let third = sched.run_cycle(
        &beacon(),
        WakeReason::Periodic,
        &ctx,
        &mut time,
        &mut RecordingDisplay::default(),
        &mut RecordingSink::new(),
    );
    assert!(third.is_fix());
    assert!(sched.power_pin().is_high());
    assert_eq!(time.now_ms(), 1_000);
}

#[test]
fn receiver_left_on_after_boot_skips_first_settle() {
    let state = DeviceState::new();
    let bus = Arbiter::new(MockBus::default());
    let mut time = SimTime::new();
    let rx = ScriptedReceiver::new(time.clock(), position(10, 20))
        .then(0, status(FixClass::Fix3D, 9, 100));
    let mut sched = binary(rx).powered_on();
    let ctx = CycleContext {
        bus: &bus,
        state: &state,
    };

    let result = sched.run_cycle(
        &beacon(),
        WakeReason::Forced,
        &ctx,
        &mut time,
        &mut RecordingDisplay::default(),
        &mut RecordingSink::new(),
    );

    assert!(result.is_fix());
    assert_eq!(sched.power_pin().levels, vec![true]);
    assert_eq!(time.now_ms(), 0);
}

#[test]
fn cancelled_beacon_cycle_sends_no_receiver_commands() {
    let state = DeviceState::new();
    let bus = Arbiter::new(MockBus::default());
    let mut time = SimTime::new();
    time.at(3_000, || state.set_menu_active(true));
    let rx = ScriptedReceiver::new(time.clock(), position(10, 20)).then(0, None);
    let mut sched = binary(rx);
    let ctx = CycleContext {
        bus: &bus,
        state: &state,
    };

    let result = sched.run_cycle(
        &beacon(),
        WakeReason::Periodic,
        &ctx,
        &mut time,
        &mut RecordingDisplay::default(),
        &mut RecordingSink::new(),
    );

    assert_eq!(result, FixResult::NoFix);
    let rx = receiver_of(&sched);
    // Polls at 500, 1500 and 2500; the menu is seen at 3500.
    assert_eq!(rx.calls, vec![ReceiverCall::Status; 3]);
    assert!(sched.power_pin().is_high());
}

// ── Text backend ─────────────────────────────────────────────

#[test]
fn text_backend_reports_once_position_and_altitude_seen() {
    let state = DeviceState::new();
    let bus = Arbiter::new(MockBus::default());
    let mut time = SimTime::new();
    let rmc = nmea("GPRMC,092750.000,A,5321.6802,N,00630.3372,W,0.02,31.66,280511,,,A");
    let gga = nmea("GPGGA,092751.000,5321.6802,N,00630.3372,W,1,8,1.03,61.7,M,55.2,M,,");
    let serial = TimedSerial::new(time.clock())
        .at(1_000, rmc.as_bytes())
        .at(3_000, gga.as_bytes());
    let mut sched: AcquisitionScheduler<ScriptedReceiver, TimedSerial, MockPin> =
        AcquisitionScheduler::new(
            ProtocolAdapter::Text(TextBackend::new(serial)),
            MockPin::default(),
        );
    let mut display = RecordingDisplay::default();
    let mut sink = RecordingSink::new();
    let ctx = CycleContext {
        bus: &bus,
        state: &state,
    };

    // Text ignores the precision mode.
    let result = sched.run_cycle(
        &high_precision(),
        WakeReason::Periodic,
        &ctx,
        &mut time,
        &mut display,
        &mut sink,
    );

    let sample = result.sample().copied().expect("fix");
    assert_eq!(sample.satellites, 8);
    assert_eq!(sample.altitude_mm, 61_700);
    assert!((sample.latitude - 533_613_367).abs() <= 5);
    assert_eq!(sample.duration_ms, 2_500);
    assert_eq!(display.lines()[0], "Sat: 8");
    assert_eq!(
        sink.events.first(),
        Some(&AppEvent::AcquisitionStarted {
            backend: BackendKind::Text,
            reason: WakeReason::Periodic,
        })
    );
}

#[test]
fn silent_text_link_times_out() {
    let state = DeviceState::new();
    let bus = Arbiter::new(MockBus::default());
    let mut time = SimTime::new();
    let mut sched: AcquisitionScheduler<ScriptedReceiver, TimedSerial, MockPin> =
        AcquisitionScheduler::new(
            ProtocolAdapter::Text(TextBackend::new(TimedSerial::new(time.clock()))),
            MockPin::default(),
        );
    let ctx = CycleContext {
        bus: &bus,
        state: &state,
    };
    let config = AcquisitionConfig {
        report_interval_ms: 10_000,
        ..AcquisitionConfig::default()
    };

    let result = sched.run_cycle(
        &config,
        WakeReason::Periodic,
        &ctx,
        &mut time,
        &mut RecordingDisplay::default(),
        &mut RecordingSink::new(),
    );
    assert_eq!(result, FixResult::NoFix);
    assert_eq!(time.now_ms(), 500 + 5_000);
}

// ── Task ─────────────────────────────────────────────────────

#[test]
fn task_flags_acquisition_active_for_the_cycle() {
    let state = DeviceState::new();
    let bus = Arbiter::new(MockBus::default());
    let config = SharedConfig::new(high_precision());
    let wake = WakeSignal::new();
    let seen = Cell::new(false);
    let mut time = SimTime::new();
    time.at(200, || seen.set(state.acquisition_active()));
    let rx = ScriptedReceiver::new(time.clock(), position(10, 20))
        .then(0, status(FixClass::Fix3D, 7, 200));
    let sched = binary(rx);
    let mut task = AcquisitionTask::new(
        sched,
        CycleContext {
            bus: &bus,
            state: &state,
        },
        &config,
        &wake,
    );

    assert!(wake.notify(WakeReason::Forced));
    let mut sink = RecordingSink::new();
    let result = task.run_once(&mut time, &mut RecordingDisplay::default(), &mut sink);

    assert!(result.is_fix());
    assert!(seen.get(), "flag not raised during the cycle");
    assert!(!state.acquisition_active());
    assert_eq!(wake.pending(), 0);
    assert_eq!(
        sink.events.first(),
        Some(&AppEvent::AcquisitionStarted {
            backend: BackendKind::Binary,
            reason: WakeReason::Forced,
        })
    );
}

#[test]
fn task_reads_config_snapshot_per_cycle() {
    let state = DeviceState::new();
    let bus = Arbiter::new(MockBus::default());
    let config = SharedConfig::new(high_precision());
    let wake = WakeSignal::new();
    let mut time = SimTime::new();
    let rx = ScriptedReceiver::new(time.clock(), position(10, 20))
        .then(0, status(FixClass::Fix3D, 2, 900));
    let mut task = AcquisitionTask::new(
        binary(rx),
        CycleContext {
            bus: &bus,
            state: &state,
        },
        &config,
        &wake,
    );
    let mut display = RecordingDisplay::default();
    let mut sink = RecordingSink::new();

    let first = task.handle_wake(WakeReason::Periodic, &mut time, &mut display, &mut sink);
    assert_eq!(first, FixResult::NoFix);

    config.set(AcquisitionConfig {
        precision_mode: PrecisionMode::Low,
        ..high_precision()
    });
    let second = task.handle_wake(WakeReason::Periodic, &mut time, &mut display, &mut sink);
    assert!(second.is_fix());
    assert!(display.calls.contains(&DisplayCall::Clear));
}
