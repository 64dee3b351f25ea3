//! Hardware configuration types
//!
//! Pin assignments, interrupt trigger, bus timing and quirk bits for one
//! touch controller.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bus::{MAX_SEGMENTS, MAX_TRANSFER};

/// Configuration format version
pub const CONFIG_VERSION: u8 = 1;

/// Pin configuration with optional inversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PinConfig {
    /// GPIO pin number (0-29 for RP2040)
    pub pin: u8,
    /// Pin is active-low (inverted)
    pub inverted: bool,
    /// Enable internal pull-up
    pub pull_up: bool,
}

impl PinConfig {
    /// Create a new pin config
    pub const fn new(pin: u8) -> Self {
        Self {
            pin,
            inverted: false,
            pull_up: false,
        }
    }

    /// Create an inverted (active-low) pin
    pub const fn inverted(pin: u8) -> Self {
        Self {
            pin,
            inverted: true,
            pull_up: false,
        }
    }

    /// Create a pin with pull-up enabled
    pub const fn with_pullup(pin: u8) -> Self {
        Self {
            pin,
            inverted: false,
            pull_up: true,
        }
    }
}

/// Command window width on a four-wire bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Addressing {
    /// 2-byte write header, 4-byte read header plus 2 dummy bytes
    #[default]
    Standard,
    /// 16-bit command window
    Wide,
    /// 128-bit command window
    Block,
}

/// Serial bus style the controller is wired with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BusStyle {
    /// Two-wire (I2C style), addressed by device address
    #[default]
    TwoWire,
    /// Four-wire (SPI style) with the given addressing width
    FourWire(Addressing),
}

/// Bus configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BusConfig {
    /// Bus style
    pub style: BusStyle,
    /// 7-bit device address (two-wire only)
    pub address: u8,
    /// Clock frequency in Hz
    pub frequency_hz: u32,
    /// Largest payload accepted by one read or write
    pub max_transfer: u16,
    /// Largest number of segments accepted by one transfer
    pub max_segments: u8,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            style: BusStyle::TwoWire,
            address: 0x28,
            frequency_hz: 400_000,
            max_transfer: 256,
            max_segments: 4,
        }
    }
}

impl BusConfig {
    /// Check the configured limits against the transport's static capacity
    pub fn fits_capacity(&self) -> bool {
        let transfer = self.max_transfer as usize;
        let segments = self.max_segments as usize;
        transfer > 0 && transfer <= MAX_TRANSFER && segments > 0 && segments <= MAX_SEGMENTS
    }
}

/// Interrupt trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IrqTrigger {
    /// Falling edge (most controllers pull INT low)
    #[default]
    FallingEdge,
    /// Rising edge
    RisingEdge,
    /// Level low, re-armed after each service
    LevelLow,
}

/// Interrupt line configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IrqConfig {
    /// Interrupt input pin
    pub pin: PinConfig,
    /// Trigger condition
    pub trigger: IrqTrigger,
}

/// Capability quirk bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Quirks {
    /// Stop probe at the Probe phase and wait for the display stack to
    /// announce `DeferredInitComplete` before initializing
    pub deferred_init: bool,
    /// Use wake gestures (LPWG) while the display is off, when the chip
    /// profile supports them
    pub lpwg: bool,
}

/// Runtime timing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimingConfig {
    /// Delay before the init finisher runs after it is scheduled
    pub init_delay_ms: u32,
    /// Period of the health monitor (0 disables it)
    pub monitor_period_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            init_delay_ms: 100,
            monitor_period_ms: 0,
        }
    }
}

/// Complete per-device configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceConfig {
    /// Configuration version for compatibility checks
    pub version: u8,
    /// Bus parameters
    pub bus: BusConfig,
    /// Controller reset output
    pub reset_pin: PinConfig,
    /// Controller interrupt input
    pub irq: IrqConfig,
    /// Quirk bits
    pub quirks: Quirks,
    /// Timing parameters
    pub timing: TimingConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            bus: BusConfig::default(),
            reset_pin: PinConfig::inverted(13),
            irq: IrqConfig {
                pin: PinConfig::with_pullup(14),
                trigger: IrqTrigger::FallingEdge,
            },
            quirks: Quirks::default(),
            timing: TimingConfig::default(),
        }
    }
}

impl DeviceConfig {
    /// Create a default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether the health monitor should run
    pub fn monitor_enabled(&self) -> bool {
        self.timing.monitor_period_ms > 0
    }
}
