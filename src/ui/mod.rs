//! On-device settings menu driven by a single button.
//!
//! ```text
//!  GestureDetector ──▶ Gesture ──▶ menu::transition ──▶ Transition
//!                                   (pure table)          │ effects
//!                                                         ▼
//!                                                  MenuController
//!                                          (bus, config, timer, system)
//! ```
//!
//! The table decides; the controller performs. Keeping the table pure
//! lets every (state, gesture) pair be tested without hardware.

pub mod controller;
pub mod menu;
pub mod status;

pub use controller::MenuController;
pub use menu::{Effect, MenuView, Transition, transition};

// ---------------------------------------------------------------------------
// Gestures
// ---------------------------------------------------------------------------

/// Aggregated button input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    Single,
    Double,
    Triple,
    Quadruple,
    Quintuple,
    Sextuple,
    Septuple,
    Octuple,
    LongPress,
}

impl Gesture {
    /// Map a click count to its gesture. Counts outside 1..=8 are dropped.
    pub fn from_clicks(clicks: u8) -> Option<Self> {
        Some(match clicks {
            1 => Self::Single,
            2 => Self::Double,
            3 => Self::Triple,
            4 => Self::Quadruple,
            5 => Self::Quintuple,
            6 => Self::Sextuple,
            7 => Self::Septuple,
            8 => Self::Octuple,
            _ => return None,
        })
    }
}

// ---------------------------------------------------------------------------
// Screens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Top,
    TransportMode,
    PacketMode,
    Precision,
    DisplayPower,
}

impl Screen {
    pub const ALL: [Screen; 5] = [
        Screen::Top,
        Screen::TransportMode,
        Screen::PacketMode,
        Screen::Precision,
        Screen::DisplayPower,
    ];

    /// Entry labels. Entry 0 is always Back.
    pub fn entries(self) -> &'static [&'static str] {
        match self {
            Self::Top => &["Back", "Link", "Packet format", "Fix quality", "Display"],
            Self::TransportMode => &["Back", "LPWAN", "Peer-to-peer"],
            Self::PacketMode => &["Back", "4 digit", "6 digit", "Beacon"],
            Self::Precision => &["Back", "Any 3D fix", "6 sat, DOP <= 2.5"],
            Self::DisplayPower => &["Back", "Saver on", "Saver off"],
        }
    }

    pub fn entry_count(self) -> u8 {
        self.entries().len() as u8
    }
}

// ---------------------------------------------------------------------------
// UI state
// ---------------------------------------------------------------------------

/// Position inside the menu. `selected < screen.entry_count()` always holds
/// for values built through [`MenuState::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuState {
    screen: Screen,
    selected: u8,
}

impl MenuState {
    /// Out-of-range selections fall back to Back (entry 0).
    pub fn new(screen: Screen, selected: u8) -> Self {
        let selected = if selected < screen.entry_count() {
            selected
        } else {
            0
        };
        Self { screen, selected }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn selected(&self) -> u8 {
        self.selected
    }

    pub fn entry_count(&self) -> u8 {
        self.screen.entry_count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiState {
    /// Passive status view; the periodic trigger runs.
    Idle,
    Menu(MenuState),
}

impl UiState {
    pub fn is_menu(&self) -> bool {
        matches!(self, Self::Menu(_))
    }

    pub fn screen(&self) -> Option<Screen> {
        match self {
            Self::Idle => None,
            Self::Menu(m) => Some(m.screen()),
        }
    }
}
