//! Lifecycle axes
//!
//! Three independent axes, each with a total transition function over
//! state x input. A transition either moves, reports that the axis is
//! already there, or rejects the input.

use crate::config::BootMode;

/// Result of feeding an input to one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step<S> {
    /// The axis moves to the new state
    Moved(S),
    /// The axis is already in the requested state
    Unchanged,
    /// The input is not valid in the current state
    Rejected,
}

impl<S: Copy> Step<S> {
    /// State after the step, or `None` when rejected
    pub fn resolve(self, current: S) -> Option<S> {
        match self {
            Step::Moved(next) => Some(next),
            Step::Unchanged => Some(current),
            Step::Rejected => None,
        }
    }

    /// Check whether the input was rejected
    pub fn is_rejected(&self) -> bool {
        matches!(self, Step::Rejected)
    }
}

/// Core phase of the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CorePhase {
    /// Not attached
    #[default]
    None,
    /// Attached, probing hardware
    EarlyProbe,
    /// Hardware found, waiting to initialize
    Probe,
    /// Operational
    Normal,
    /// Off-mode charging boot; controller powered down
    ChargerLogo,
    /// Factory test boot
    Mfts,
    /// Firmware upgrade in progress
    Upgrade,
    /// Detached; terminal
    Teardown,
}

/// Inputs to the core phase axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CoreInput {
    Attach,
    Probed,
    Fail,
    Initialized(BootMode),
    BeginUpgrade,
    EndUpgrade,
    Detach,
}

impl CoreInput {
    fn target(self) -> CorePhase {
        match self {
            CoreInput::Attach => CorePhase::EarlyProbe,
            CoreInput::Probed => CorePhase::Probe,
            CoreInput::Fail => CorePhase::None,
            CoreInput::Initialized(mode) => CorePhase::for_boot(mode),
            CoreInput::BeginUpgrade => CorePhase::Upgrade,
            CoreInput::EndUpgrade => CorePhase::Normal,
            CoreInput::Detach => CorePhase::Teardown,
        }
    }
}

impl CorePhase {
    /// Phase an initialized device settles in for a boot mode
    pub const fn for_boot(mode: BootMode) -> Self {
        match mode {
            BootMode::Normal => CorePhase::Normal,
            BootMode::ChargerLogo => CorePhase::ChargerLogo,
            BootMode::Mfts => CorePhase::Mfts,
        }
    }

    /// Check whether the interrupt handler may read reports
    pub fn services_reports(&self) -> bool {
        matches!(self, CorePhase::Normal | CorePhase::Mfts)
    }

    /// Check whether the bus is reachable for pass-through commands
    pub fn bus_ready(&self) -> bool {
        !matches!(
            self,
            CorePhase::None | CorePhase::EarlyProbe | CorePhase::Teardown
        )
    }

    /// Feed an input to the core axis
    pub fn transition(self, input: CoreInput) -> Step<CorePhase> {
        let target = input.target();
        if self == target {
            return Step::Unchanged;
        }

        let legal = match (self, input) {
            (CorePhase::Teardown, _) => false,
            (_, CoreInput::Detach) => true,
            (CorePhase::None, CoreInput::Attach) => true,
            (CorePhase::EarlyProbe, CoreInput::Probed) => true,
            (CorePhase::EarlyProbe | CorePhase::Probe, CoreInput::Fail) => true,
            (CorePhase::Probe, CoreInput::Initialized(_)) => true,
            (CorePhase::Normal, CoreInput::BeginUpgrade) => true,
            (CorePhase::Upgrade, CoreInput::EndUpgrade) => true,
            _ => false,
        };

        if legal {
            Step::Moved(target)
        } else {
            Step::Rejected
        }
    }
}

/// Power phase of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerPhase {
    #[default]
    Off,
    /// Low power with wake gestures armed
    Sleep,
    /// Woken by a gesture, display not yet on
    Wake,
    On,
    /// Reset line pulsed by another subsystem; transient
    HardwareReset,
}

impl PowerPhase {
    /// Request a move to `target`
    pub fn transition(self, target: PowerPhase) -> Step<PowerPhase> {
        use PowerPhase::*;

        if self == target {
            return Step::Unchanged;
        }
        let legal = match (self, target) {
            (Off, On) => true,
            (On, Sleep | Off | HardwareReset) => true,
            (Sleep, Wake | On | Off | HardwareReset) => true,
            (Wake, On | Sleep | Off | HardwareReset) => true,
            (HardwareReset, On | Off) => true,
            _ => false,
        };

        if legal {
            Step::Moved(target)
        } else {
            Step::Rejected
        }
    }

    /// Check whether the controller is scanning or sleeping (not off)
    pub fn is_powered(&self) -> bool {
        !matches!(self, PowerPhase::Off)
    }
}

/// Display mode published by the display stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayMode {
    #[default]
    Unknown,
    /// Panel off
    U0,
    /// Always-on low power
    U2,
    /// Always-on low power, unblanked
    U2Unblank,
    /// Panel on
    U3,
    /// Panel on, partial refresh
    U3Partial,
    /// Panel on behind a quick cover
    U3QuickCover,
    /// Display stack stopped
    Stop,
}

impl DisplayMode {
    /// Decode the display stack's raw mode code
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            0 => DisplayMode::U0,
            1 => DisplayMode::U2Unblank,
            2 => DisplayMode::U2,
            3 => DisplayMode::U3,
            4 => DisplayMode::U3Partial,
            5 => DisplayMode::U3QuickCover,
            6 => DisplayMode::Stop,
            _ => DisplayMode::Unknown,
        }
    }

    /// Raw mode code, the inverse of [`from_raw`](Self::from_raw)
    pub const fn raw(self) -> u32 {
        match self {
            DisplayMode::U0 => 0,
            DisplayMode::U2Unblank => 1,
            DisplayMode::U2 => 2,
            DisplayMode::U3 => 3,
            DisplayMode::U3Partial => 4,
            DisplayMode::U3QuickCover => 5,
            DisplayMode::Stop => 6,
            DisplayMode::Unknown => 0xFF,
        }
    }

    /// Panel is on; touch should scan
    pub fn is_on(&self) -> bool {
        matches!(
            self,
            DisplayMode::U3 | DisplayMode::U3Partial | DisplayMode::U3QuickCover
        )
    }

    /// Panel is off or in always-on; touch should suspend
    pub fn is_off(&self) -> bool {
        matches!(
            self,
            DisplayMode::U0 | DisplayMode::U2 | DisplayMode::U2Unblank
        )
    }

    /// Every mode is reachable from every other
    pub fn transition(self, next: DisplayMode) -> Step<DisplayMode> {
        if self == next {
            Step::Unchanged
        } else {
            Step::Moved(next)
        }
    }
}
