//! Outbound application events.
//!
//! The scheduler and the menu controller emit these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them.

use crate::config::{AcquisitionConfig, BackendKind};
use crate::gnss::FixResult;
use crate::wake::WakeReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// A cycle began on the given backend.
    AcquisitionStarted { backend: BackendKind, reason: WakeReason },

    /// A cycle ended. Emitted exactly once per started cycle.
    AcquisitionFinished(FixResult),

    /// A wake arrived while the menu was open and was dropped.
    AcquisitionRefused(WakeReason),

    /// Menu entry attempted during a cycle; the gesture was dropped.
    MenuBusy,

    MenuOpened,

    MenuClosed,

    /// A menu commit changed the configuration.
    ConfigCommitted(AcquisitionConfig),
}
