//! Event fabric
//!
//! Notifications from the display and power collaborators reach the
//! device through one of two channels, fixed per event kind:
//!
//! - **Blocking**: listeners run in registration order under the Device
//!   Context lock and may stop delivery.
//! - **Atomic**: safe from a context that must not block. The event lands
//!   in a single slot (a newer one overwrites an unconsumed older one) and
//!   the notification task delivers it later through the blocking path.

mod listener;
mod slot;

pub use listener::{Listener, ListenerChain, Verdict, MAX_LISTENERS};
pub use slot::AtomicSlot;

use crate::state::CorePhase;

/// Delivery channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    Blocking,
    Atomic,
}

/// Notification kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventId {
    /// Display stack finished its own init; the touch init may proceed
    DeferredInitComplete,
    /// Display stack is about to pulse the shared reset line
    HardwareReset,
    /// Display mode changed; payload is the raw mode code
    DisplayMode,
    /// Panel blanked or unblanked; payload 1 when blank
    DisplayBlank,
    /// Charger connection; payload 1 when connected
    Connection,
    /// Wireless charger; payload 1 when active
    Wireless,
    /// Headset jack; payload 1 when inserted
    Earjack,
    /// Soft keyboard shown; payload 1 when shown
    ImeState,
    /// Telephony call state
    CallState,
    /// Debug tool command
    DebugTool,
}

impl EventId {
    /// Wire code used by the diagnostic mirror
    pub const fn code(self) -> u32 {
        match self {
            EventId::DeferredInitComplete => 0x01,
            EventId::HardwareReset => 0x02,
            EventId::DisplayMode => 0x03,
            EventId::DisplayBlank => 0x04,
            EventId::Connection => 0x10,
            EventId::Wireless => 0x11,
            EventId::Earjack => 0x12,
            EventId::ImeState => 0x13,
            EventId::CallState => 0x14,
            EventId::DebugTool => 0x20,
        }
    }

    /// Decode a wire code
    pub const fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0x01 => EventId::DeferredInitComplete,
            0x02 => EventId::HardwareReset,
            0x03 => EventId::DisplayMode,
            0x04 => EventId::DisplayBlank,
            0x10 => EventId::Connection,
            0x11 => EventId::Wireless,
            0x12 => EventId::Earjack,
            0x13 => EventId::ImeState,
            0x14 => EventId::CallState,
            0x20 => EventId::DebugTool,
            _ => return None,
        })
    }

    /// Channel this kind travels on
    pub const fn channel(self) -> Channel {
        match self {
            EventId::HardwareReset | EventId::DisplayMode | EventId::DebugTool => Channel::Blocking,
            _ => Channel::Atomic,
        }
    }
}

/// One notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Notification {
    pub event: EventId,
    pub payload: u32,
}

impl Notification {
    pub const fn new(event: EventId, payload: u32) -> Self {
        Self { event, payload }
    }

    /// Channel this notification travels on
    pub const fn channel(&self) -> Channel {
        self.event.channel()
    }
}

/// Check whether `event` may be delivered in core phase `core`
///
/// Nothing is delivered during teardown. `DeferredInitComplete` is only
/// meaningful while probing; every other kind needs a normal device.
pub fn admits(event: EventId, core: CorePhase) -> bool {
    match (core, event) {
        (CorePhase::Teardown, _) => false,
        (CorePhase::Probe, EventId::DeferredInitComplete) => true,
        (_, EventId::DeferredInitComplete) => false,
        (CorePhase::Normal, _) => true,
        _ => false,
    }
}
