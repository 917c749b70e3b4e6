//! Trackfix Firmware: Main Entry Point
//!
//! Two execution contexts share one I2C bus:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  UbxReceiver    UartPort      LogDisplay    LogEventSink       │
//! │  (Binary)       (Text)        (Status)      (Event+Payload)    │
//! │  NvsAdapter     Esp32Time     EspSystemControl                 │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌──────────────────────┐        ┌──────────────────────┐      │
//! │  │ AcquisitionTask      │        │ MenuController       │      │
//! │  │ (thread, core 1)     │◀─wake──│ (main loop, 10 ms)   │      │
//! │  └──────────┬───────────┘        └──────────┬───────────┘      │
//! │             └──────────▶ BusArbiter ◀───────┘                  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::delay::DelayNs;
use esp_idf_hal::gpio::{AnyIOPin, PinDriver, Pull};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::*;
use esp_idf_hal::uart::{UartDriver, config::Config as UartConfig};
use log::{info, warn};

use trackfix::acquisition::{AcquisitionScheduler, AcquisitionTask, CycleContext};
use trackfix::adapters::log_display::LogDisplay;
use trackfix::adapters::log_sink::LogEventSink;
use trackfix::adapters::nvs::{self, NvsAdapter};
use trackfix::adapters::system::EspSystemControl;
use trackfix::adapters::time::Esp32TimeAdapter;
use trackfix::adapters::uart::UartPort;
use trackfix::adapters::ubx::{self, Link, UbxReceiver};
use trackfix::app::ports::Timebase;
use trackfix::bus::{BusArbiter, DEFAULT_BUS_TIMEOUT_MS};
use trackfix::config::BackendKind;
use trackfix::drivers::button::{GestureDetector, TICK_MS};
use trackfix::drivers::task_pin::{Core, spawn_scoped_on_core};
use trackfix::gnss::discovery::{self, Discovered, ReceiverLink, ReceiverProbe};
use trackfix::gnss::{BinaryBackend, ProtocolAdapter, TextBackend};
use trackfix::state::{DeviceState, SharedConfig};
use trackfix::ui::MenuController;
use trackfix::ui::controller::UiContext;
use trackfix::wake::WakeSignal;

use std::thread::ScopedJoinHandle;

type Bus<'d> = BusArbiter<CriticalSectionRawMutex, I2cDriver<'d>>;

const I2C_BAUD_KHZ: u32 = 400;
const ACQ_TASK_PRIORITY: u8 = 5;
const ACQ_TASK_STACK_KB: usize = 8;

// ── Process-wide state ────────────────────────────────────────

static STATE: DeviceState = DeviceState::new();
static WAKE: WakeSignal = WakeSignal::new();

// ── Receiver discovery hooks ──────────────────────────────────
//
// Discovery talks UBX to whatever answers. The serial probes still take the
// bus lock because the receiver adapter is generic over the I2C handle; the
// serial link itself never touches it.

struct BoardProbe<'a, 'd> {
    bus: &'a Bus<'d>,
    uart: &'a mut UartPort<'d>,
    time: Esp32TimeAdapter,
}

type SerialUbx<'a, 'd> = UbxReceiver<&'a mut UartPort<'d>, Esp32TimeAdapter>;

impl<'d> BoardProbe<'_, 'd> {
    fn serial_command(
        &mut self,
        f: impl FnOnce(&mut SerialUbx<'_, 'd>, &mut I2cDriver<'d>) -> bool,
    ) -> bool {
        let mut rx = UbxReceiver::serial(&mut *self.uart, Esp32TimeAdapter::new());
        self.bus
            .with_bus(DEFAULT_BUS_TIMEOUT_MS, &mut self.time, |b| f(&mut rx, b))
            .unwrap_or(false)
    }
}

impl ReceiverProbe for BoardProbe<'_, '_> {
    fn probe_bus(&mut self) -> bool {
        let mut rx = UbxReceiver::ddc(ubx::DEFAULT_ADDRESS, Esp32TimeAdapter::new());
        self.bus
            .with_bus(DEFAULT_BUS_TIMEOUT_MS, &mut self.time, |b| rx.probe(b))
            .unwrap_or(false)
    }

    fn probe_serial(&mut self, baud: u32) -> bool {
        self.uart.set_baud(baud);
        self.serial_command(|rx, b| rx.probe(b))
    }

    fn set_serial_rate(&mut self, baud: u32) {
        if !self.serial_command(|rx, b| rx.set_port_rate(b, baud).is_ok()) {
            warn!("GNSS: rate switch command not sent");
        }
        self.uart.set_baud(baud);
    }

    fn factory_reset(&mut self) {
        for baud in [discovery::WORKING_BAUD, discovery::FACTORY_BAUD] {
            self.uart.set_baud(baud);
            if !self.serial_command(|rx, b| rx.factory_reset(b).is_ok()) {
                warn!("GNSS: factory reset not sent at {}", baud);
            }
        }
    }

    fn open_text(&mut self, baud: u32) {
        self.uart.set_baud(baud);
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Trackfix v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let store = NvsAdapter::new().map_err(|e| anyhow::anyhow!("NVS init: {e}"))?;
    let config = SharedConfig::new(nvs::load_or_default(&store));
    info!("Config: {:?}", config.get());

    // ── 3. Peripherals ────────────────────────────────────────
    let p = Peripherals::take()?;
    let i2c = I2cDriver::new(
        p.i2c0,
        p.pins.gpio17,
        p.pins.gpio18,
        &I2cConfig::new().baudrate(I2C_BAUD_KHZ.kHz().into()),
    )?;
    let bus: Bus<'_> = BusArbiter::new(i2c);

    let uart = UartDriver::new(
        p.uart1,
        p.pins.gpio43,
        p.pins.gpio44,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::default().baudrate(Hertz(discovery::FACTORY_BAUD)),
    )?;
    let mut uart = UartPort::new(uart);

    let mut gnss_power = PinDriver::output(p.pins.gpio3)?;
    let mut button = PinDriver::input(p.pins.gpio0)?;
    button.set_pull(Pull::Up)?;

    // ── 4. Receiver discovery (once per boot) ─────────────────
    // Beacon transport keeps the receiver on between cycles.
    let keep_powered = config.get().is_beacon();
    let Discovered { kind, link } = {
        let mut probe = BoardProbe {
            bus: &bus,
            uart: &mut uart,
            time: Esp32TimeAdapter::new(),
        };
        discovery::discover_powered(
            &mut probe,
            &mut gnss_power,
            &mut Esp32TimeAdapter::new(),
            keep_powered,
        )
    };
    info!("GNSS: {:?} receiver on {:?}", kind, link);
    let mut detected = config.get();
    detected.backend_kind = kind;
    config.set(detected);

    let adapter = match link {
        ReceiverLink::Bus => ProtocolAdapter::Binary(BinaryBackend::new(UbxReceiver::new(
            Link::Ddc {
                address: ubx::DEFAULT_ADDRESS,
            },
            Esp32TimeAdapter::new(),
        ))),
        ReceiverLink::Serial { .. } if kind == BackendKind::Binary => {
            ProtocolAdapter::Binary(BinaryBackend::new(UbxReceiver::serial(
                uart,
                Esp32TimeAdapter::new(),
            )))
        }
        ReceiverLink::Serial { .. } => ProtocolAdapter::Text(TextBackend::new(uart)),
    };

    // ── 5. Run both contexts ──────────────────────────────────
    std::thread::scope(|s| -> Result<()> {
        let mut scheduler = AcquisitionScheduler::new(adapter, gnss_power);
        if keep_powered {
            scheduler = scheduler.powered_on();
        }
        let task = AcquisitionTask::new(
            scheduler,
            CycleContext {
                bus: &bus,
                state: &STATE,
            },
            &config,
            &WAKE,
        );
        let _acquisition: ScopedJoinHandle<'_, ()> = spawn_scoped_on_core(
            s,
            Core::App,
            ACQ_TASK_PRIORITY,
            ACQ_TASK_STACK_KB,
            "gnss\0",
            move || {
                let mut time = Esp32TimeAdapter::new();
                task.run(&mut time, &mut LogDisplay, &mut LogEventSink::new())
            },
        )?;

        let mut time = Esp32TimeAdapter::new();
        let ctx = UiContext {
            bus: &bus,
            state: &STATE,
            config: &config,
            wake: &WAKE,
        };
        let mut menu = MenuController::new(
            LogDisplay,
            store,
            EspSystemControl::new(),
            &config.get(),
            time.now_ms(),
        );
        let mut gestures = GestureDetector::new();
        let mut sink = LogEventSink::new();

        menu.show_idle(&ctx, &mut time);
        info!("System ready. Entering UI loop.");

        // ── 6. UI loop ────────────────────────────────────────
        loop {
            let now = time.now_ms();
            if let Some(g) = gestures.tick(now as u32, button.is_low()) {
                info!("Button: {:?}", g);
                menu.handle(g, &ctx, &mut time, &mut sink);
            }
            menu.tick(&ctx, &mut time);
            time.delay_ms(TICK_MS);
        }
    })
}
