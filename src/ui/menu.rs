//! Menu transition table.
//!
//! `transition(state, gesture, view)` is pure: it reads the current
//! configuration and flags from [`MenuView`] and returns the next state plus
//! the effects the controller must apply, in order. Pairs with no entry
//! return the current state and no effects.

use heapless::Vec;
use log::debug;

use super::{Gesture, MenuState, Screen, UiState};
use crate::config::{
    AcquisitionConfig, CoordinateDigits, LinkMode, PrecisionMode, TransportMode,
};

/// Upper bound on effects produced by one transition.
pub const MAX_EFFECTS: usize = 4;

/// Advertising window opened by the six-click gesture.
pub const ADVERTISING_WINDOW_MS: u32 = 15_000;

/// What the table needs to know about the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuView {
    pub config: AcquisitionConfig,
    pub acquisition_active: bool,
    pub display_off: bool,
    pub saver_enabled: bool,
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Menu entry refused: a cycle is running.
    Busy,
    /// Stop the periodic trigger and raise `menu_active`.
    EnterMenu,
    /// Restart the periodic trigger, clear `menu_active`, redraw the
    /// passive status view.
    ExitMenu,
    /// Draw a menu screen.
    Render { screen: Screen, highlighted: u8 },
    /// Adopt and persist a new configuration.
    Commit(AcquisitionConfig),
    /// Reboot so a link change takes effect.
    RestartDevice,
    /// Wake the acquisition task now.
    ForceAcquisition,
    DisplayPower(bool),
    /// Enable or disable the display saver.
    Saver(bool),
    RestartAdvertising { window_ms: u32 },
    /// Show "RESET", wait, reset.
    ConfirmReset,
    /// Show "BOOTLOADER MODE", wait, enter update mode.
    ConfirmBootloader,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: UiState,
    pub effects: Vec<Effect, MAX_EFFECTS>,
}

impl Transition {
    fn stay(state: UiState) -> Self {
        Self {
            next: state,
            effects: Vec::new(),
        }
    }

    fn to(next: UiState, effects: &[Effect]) -> Self {
        let mut v = Vec::new();
        for e in effects {
            // Every call site passes at most MAX_EFFECTS.
            let _ = v.push(*e);
        }
        Self { next, effects: v }
    }

    fn open(screen: Screen, highlighted: u8) -> Self {
        let m = MenuState::new(screen, highlighted);
        Self::to(
            UiState::Menu(m),
            &[Effect::Render {
                screen,
                highlighted: m.selected(),
            }],
        )
    }

    /// Commit `config` and redraw `screen` with `highlighted` selected.
    fn commit(screen: Screen, highlighted: u8, config: AcquisitionConfig) -> Self {
        let m = MenuState::new(screen, highlighted);
        Self::to(
            UiState::Menu(m),
            &[
                Effect::Commit(config),
                Effect::Render {
                    screen,
                    highlighted: m.selected(),
                },
            ],
        )
    }
}

// ---------------------------------------------------------------------------
// Selection helpers
// ---------------------------------------------------------------------------

pub fn link_index(link: LinkMode) -> u8 {
    match link {
        LinkMode::Managed => 1,
        LinkMode::PeerToPeer => 2,
    }
}

pub fn packet_index(config: &AcquisitionConfig) -> u8 {
    if config.is_beacon() {
        3
    } else if config.coordinate_digits == CoordinateDigits::Six {
        2
    } else {
        1
    }
}

pub fn precision_index(mode: PrecisionMode) -> u8 {
    match mode {
        PrecisionMode::Low => 1,
        PrecisionMode::High => 2,
    }
}

pub fn saver_index(enabled: bool) -> u8 {
    if enabled { 1 } else { 2 }
}

fn top(view: &MenuView) -> Transition {
    Transition::open(Screen::Top, link_index(view.config.link_mode))
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

pub fn transition(state: UiState, gesture: Gesture, view: &MenuView) -> Transition {
    // Global gestures behave the same everywhere.
    match gesture {
        Gesture::Sextuple => {
            return Transition::to(
                state,
                &[Effect::RestartAdvertising {
                    window_ms: ADVERTISING_WINDOW_MS,
                }],
            );
        }
        Gesture::Septuple => return Transition::to(state, &[Effect::ConfirmReset]),
        Gesture::Octuple => return Transition::to(state, &[Effect::ConfirmBootloader]),
        Gesture::LongPress => {
            return if view.display_off {
                Transition::to(state, &[Effect::DisplayPower(true), Effect::Saver(true)])
            } else {
                Transition::to(state, &[Effect::DisplayPower(false)])
            };
        }
        _ => {}
    }

    let t = match state {
        UiState::Idle => idle(gesture, view),
        UiState::Menu(m) => match m.screen() {
            Screen::Top => top_screen(state, gesture, view),
            Screen::TransportMode => transport_screen(state, gesture, view),
            Screen::PacketMode => packet_screen(state, gesture, view),
            Screen::Precision => precision_screen(state, gesture, view),
            Screen::DisplayPower => display_screen(state, gesture, view),
        },
    };
    if t.next != state || !t.effects.is_empty() {
        debug!("UI: {:?} --{:?}--> {:?}", state, gesture, t.next);
    }
    t
}

fn idle(gesture: Gesture, view: &MenuView) -> Transition {
    match gesture {
        Gesture::Double if view.acquisition_active => {
            Transition::to(UiState::Idle, &[Effect::Busy])
        }
        Gesture::Double => {
            let sel = link_index(view.config.link_mode);
            let m = MenuState::new(Screen::Top, sel);
            let render = Effect::Render {
                screen: Screen::Top,
                highlighted: m.selected(),
            };
            if view.display_off {
                Transition::to(
                    UiState::Menu(m),
                    &[Effect::DisplayPower(true), Effect::EnterMenu, render],
                )
            } else {
                Transition::to(UiState::Menu(m), &[Effect::EnterMenu, render])
            }
        }
        Gesture::Triple => Transition::to(UiState::Idle, &[Effect::ForceAcquisition]),
        _ => Transition::stay(UiState::Idle),
    }
}

fn top_screen(state: UiState, gesture: Gesture, view: &MenuView) -> Transition {
    let cfg = &view.config;
    match gesture {
        Gesture::Single => Transition::to(UiState::Idle, &[Effect::ExitMenu]),
        Gesture::Double => Transition::open(Screen::TransportMode, link_index(cfg.link_mode)),
        Gesture::Triple => Transition::open(Screen::PacketMode, packet_index(cfg)),
        Gesture::Quadruple => {
            Transition::open(Screen::Precision, precision_index(cfg.precision_mode))
        }
        Gesture::Quintuple => {
            Transition::open(Screen::DisplayPower, saver_index(view.saver_enabled))
        }
        _ => Transition::stay(state),
    }
}

fn transport_screen(state: UiState, gesture: Gesture, view: &MenuView) -> Transition {
    let target = match gesture {
        Gesture::Single => return top(view),
        Gesture::Double => LinkMode::Managed,
        Gesture::Triple => LinkMode::PeerToPeer,
        _ => return Transition::stay(state),
    };
    if view.config.link_mode == target {
        return Transition::stay(state);
    }
    let config = AcquisitionConfig {
        link_mode: target,
        ..view.config
    };
    let m = MenuState::new(Screen::TransportMode, link_index(target));
    Transition::to(
        UiState::Menu(m),
        &[
            Effect::Commit(config),
            Effect::Render {
                screen: Screen::TransportMode,
                highlighted: m.selected(),
            },
            Effect::RestartDevice,
        ],
    )
}

fn packet_screen(state: UiState, gesture: Gesture, view: &MenuView) -> Transition {
    let (digits, transport) = match gesture {
        Gesture::Single => return top(view),
        Gesture::Double => (CoordinateDigits::Four, TransportMode::Standard),
        Gesture::Triple => (CoordinateDigits::Six, TransportMode::Standard),
        Gesture::Quadruple => (CoordinateDigits::Four, TransportMode::LowPowerBeacon),
        _ => return Transition::stay(state),
    };
    let cfg = &view.config;
    if cfg.coordinate_digits == digits && cfg.transport_mode == transport {
        return Transition::stay(state);
    }
    let config = AcquisitionConfig {
        coordinate_digits: digits,
        transport_mode: transport,
        ..*cfg
    };
    Transition::commit(Screen::PacketMode, packet_index(&config), config)
}

fn precision_screen(state: UiState, gesture: Gesture, view: &MenuView) -> Transition {
    let cfg = &view.config;
    let target = match gesture {
        Gesture::Single => return top(view),
        // Beacon records are always high precision.
        Gesture::Double if cfg.is_beacon() => return Transition::stay(state),
        Gesture::Double => PrecisionMode::Low,
        Gesture::Triple => PrecisionMode::High,
        _ => return Transition::stay(state),
    };
    if cfg.precision_mode == target {
        return Transition::stay(state);
    }
    let config = AcquisitionConfig {
        precision_mode: target,
        ..*cfg
    };
    Transition::commit(Screen::Precision, precision_index(target), config)
}

fn display_screen(state: UiState, gesture: Gesture, view: &MenuView) -> Transition {
    let enable = match gesture {
        Gesture::Single => return top(view),
        Gesture::Double => true,
        Gesture::Triple => false,
        _ => return Transition::stay(state),
    };
    let m = MenuState::new(Screen::DisplayPower, saver_index(enable));
    Transition::to(
        UiState::Menu(m),
        &[
            Effect::Saver(enable),
            Effect::Render {
                screen: Screen::DisplayPower,
                highlighted: m.selected(),
            },
        ],
    )
}
