//! Process-wide configuration
//!
//! Settings shared by every device instance. Built once during boot from
//! the bootloader hand-off and passed by reference to each
//! [`Device`](crate::device::Device); nothing reads it through a global.
//! Dropping the last device ends its use, so there is no teardown step
//! beyond that.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How the system was booted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BootMode {
    /// Regular boot
    #[default]
    Normal,
    /// Off-mode charging: the panel only shows a battery animation and
    /// the controller stays powered down
    ChargerLogo,
    /// Factory test boot: reports are serviced, notifications are not
    Mfts,
}

/// Process-wide runtime settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SystemConfig {
    /// Boot mode reported by the bootloader
    pub boot_mode: BootMode,
}

impl SystemConfig {
    /// Create settings for the given boot mode
    pub const fn new(boot_mode: BootMode) -> Self {
        Self { boot_mode }
    }
}
