//! Chip profile trait and its operation vocabulary

use super::Slot;
use crate::bus::RegisterIo;
use crate::error::Result;
use crate::event::Notification;
use crate::report::{IcInfo, TouchReport};

/// Reset flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResetKind {
    /// Register-level reset, line stays high
    Soft,
    /// Follows a pulse on the reset line
    Hardware,
}

/// Power command issued to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerCommand {
    Off,
    On,
    /// Low-power mode with wake gestures armed
    Sleep,
    /// Back to scanning after a wake gesture
    Wake,
}

/// Wake gesture configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LpwgMode {
    Off,
    KnockOn,
}

/// Adaptive sensitivity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AscMode {
    Normal,
    /// Charger connected; noisier ground reference
    Charging,
}

/// Health check verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Health {
    #[default]
    Healthy,
    /// The controller needs a hardware reset
    Abnormal,
}

/// Chip timing constants, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChipTiming {
    /// How long the reset line is held asserted
    pub reset_low_ms: u32,
    /// Boot time after the reset line is released
    pub reset_settle_ms: u32,
    /// Settle time after a power-on command
    pub power_settle_ms: u32,
    /// Retry interval while waiting for test-mode acknowledgement
    pub poll_interval_ms: u32,
}

impl ChipTiming {
    /// Conservative timing most controllers tolerate
    pub const DEFAULT: Self = Self {
        reset_low_ms: 5,
        reset_settle_ms: 100,
        power_settle_ms: 10,
        poll_interval_ms: 10,
    };
}

impl Default for ChipTiming {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Static facts about a chip profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChipTraits {
    pub name: &'static str,
    /// Supports wake gestures while the panel is off
    pub lpwg: bool,
    /// Supports the periodic health check
    pub health_check: bool,
    /// Probe attempts before the device is marked failed
    pub probe_retry_cap: u8,
    pub timing: ChipTiming,
}

impl ChipTraits {
    /// Traits with no optional features and a retry cap of 3
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            lpwg: false,
            health_check: false,
            probe_retry_cap: 3,
            timing: ChipTiming::DEFAULT,
        }
    }
}

/// Opaque firmware image bytes for an upgrade
pub trait FirmwareSource: Sync {
    /// Image size in bytes
    fn size(&self) -> usize;

    /// Copy image bytes starting at `offset`, returning the count copied
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<usize>;
}

/// In-memory image, for images linked into the host firmware
impl FirmwareSource for &[u8] {
    fn size(&self) -> usize {
        self.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<usize> {
        let rest = self.get(offset..).unwrap_or(&[]);
        let count = rest.len().min(buf.len());
        buf[..count].copy_from_slice(&rest[..count]);
        Ok(count)
    }
}

/// Chip-specific behavior
///
/// Every operation defaults to unpopulated. Implementations override the
/// ones their silicon supports; the runtime resolves the rest through
/// [`dispatch`](super::dispatch). Operations run with the Device Context
/// lock held and must not sleep; settle delays come from
/// [`ChipTraits::timing`] and are applied by the runtime.
pub trait ChipProfile: Sync {
    /// Static facts about the chip
    fn traits(&self) -> ChipTraits;

    /// Confirm the chip answers and is the expected part
    fn probe(&self, _io: &mut dyn RegisterIo) -> Slot<()> {
        None
    }

    /// Bring the chip to a known state
    fn reset(&self, _io: &mut dyn RegisterIo, _kind: ResetKind) -> Slot<()> {
        None
    }

    /// Change the chip's power mode
    fn power(&self, _io: &mut dyn RegisterIo, _command: PowerCommand) -> Slot<()> {
        None
    }

    /// Read firmware version and product identity
    fn ic_info(&self, _io: &mut dyn RegisterIo) -> Slot<IcInfo> {
        None
    }

    /// Program runtime registers after power-on or reset
    fn init(&self, _io: &mut dyn RegisterIo) -> Slot<()> {
        None
    }

    /// Read the pending touch report
    fn read_report(&self, _io: &mut dyn RegisterIo) -> Slot<TouchReport> {
        None
    }

    /// Offer a notification to the chip
    fn notify(&self, _io: &mut dyn RegisterIo, _note: &Notification) -> Slot<()> {
        None
    }

    /// Configure wake gestures
    fn lpwg_configure(&self, _io: &mut dyn RegisterIo, _mode: LpwgMode) -> Slot<()> {
        None
    }

    /// Switch adaptive sensitivity
    fn asc(&self, _io: &mut dyn RegisterIo, _mode: AscMode) -> Slot<()> {
        None
    }

    /// Check the chip for internal faults
    fn health_check(&self, _io: &mut dyn RegisterIo) -> Slot<Health> {
        None
    }

    /// Program a new firmware image
    fn upgrade(&self, _io: &mut dyn RegisterIo, _image: &dyn FirmwareSource) -> Slot<()> {
        None
    }

    /// Check whether the chip acknowledged test mode
    fn test_mode_ack(&self, _io: &mut dyn RegisterIo) -> Slot<bool> {
        None
    }

    /// Generic write pass-through for diagnostic subsystems
    fn set(&self, _io: &mut dyn RegisterIo, _command: u32, _data: &[u8]) -> Slot<()> {
        None
    }

    /// Generic read pass-through, returning the byte count written to `out`
    fn get(&self, _io: &mut dyn RegisterIo, _command: u32, _out: &mut [u8]) -> Slot<usize> {
        None
    }
}
