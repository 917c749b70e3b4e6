//! Multi-click / long-press gesture detection for the single user button.
//!
//! ## Input
//!
//! `tick()` is called from the main loop every [`TICK_MS`] with the
//! already-debounced button level. Edge debouncing is the board's job.
//!
//! ## Gesture detection
//!
//! | Gesture       | Condition                                          |
//! |---------------|----------------------------------------------------|
//! | N clicks      | N releases, each gap < 400 ms; emitted when the    |
//! |               | window after the last release closes (1 ≤ N ≤ 8)   |
//! | Long press    | Held ≥ 1500 ms; emitted once per hold, the hold    |
//! |               | itself is not a click                              |
//!
//! More than eight clicks in one burst are dropped.

use log::debug;

use crate::ui::Gesture;

/// Expected call period of [`GestureDetector::tick`].
pub const TICK_MS: u32 = 10;

const CLICK_WINDOW_MS: u32 = 400;
const LONG_PRESS_MS: u32 = 1500;

/// Internal state machine for gesture detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GestureState {
    Idle,
    Pressed { since_ms: u32, clicks: u8 },
    Released { since_ms: u32, clicks: u8 },
    /// Long press already reported; waiting for release.
    Held,
}

#[derive(Debug)]
pub struct GestureDetector {
    state: GestureState,
}

impl Default for GestureDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureDetector {
    pub const fn new() -> Self {
        Self {
            state: GestureState::Idle,
        }
    }

    /// True while a click burst or hold is in progress.
    pub fn is_busy(&self) -> bool {
        self.state != GestureState::Idle
    }

    /// Feed the current level. Returns a gesture when one completes.
    pub fn tick(&mut self, now_ms: u32, pressed: bool) -> Option<Gesture> {
        match self.state {
            GestureState::Idle => {
                if pressed {
                    self.state = GestureState::Pressed {
                        since_ms: now_ms,
                        clicks: 0,
                    };
                }
                None
            }

            GestureState::Pressed { since_ms, clicks } => {
                if !pressed {
                    self.state = GestureState::Released {
                        since_ms: now_ms,
                        clicks: clicks.saturating_add(1),
                    };
                    return None;
                }
                if now_ms.wrapping_sub(since_ms) >= LONG_PRESS_MS {
                    self.state = GestureState::Held;
                    return Some(Gesture::LongPress);
                }
                None
            }

            GestureState::Released { since_ms, clicks } => {
                if pressed {
                    self.state = GestureState::Pressed {
                        since_ms: now_ms,
                        clicks,
                    };
                    return None;
                }
                if now_ms.wrapping_sub(since_ms) < CLICK_WINDOW_MS {
                    return None;
                }
                self.state = GestureState::Idle;
                let gesture = Gesture::from_clicks(clicks);
                if gesture.is_none() {
                    debug!("BTN: {} clicks, ignored", clicks);
                }
                gesture
            }

            GestureState::Held => {
                if !pressed {
                    self.state = GestureState::Idle;
                }
                None
            }
        }
    }
}
