//! RP2040-specific HAL for the Tactus touch controller runtime
//!
//! This crate provides RP2040 implementations of the shared `tactus-hal`
//! traits, plus the board plumbing the firmware needs:
//!
//! - Config-driven pin lookup for the reset and interrupt lines
//! - Blocking I2C and SPI masters for the two bus styles
//! - Flash storage driver (implements `tactus_hal::FlashStorage`)
//! - Raw flash image partition used as the upgrade firmware source

#![no_std]

pub mod flash;
pub mod gpio;
pub mod i2c;
pub mod pins;
pub mod spi;

// Re-export shared traits from tactus-hal for convenience
pub use tactus_hal::{FlashStorage as FlashStorageTrait, StorageKey};
