//! Tactus Hardware Abstraction Layer
//!
//! This crate defines the hardware traits a touch controller runtime needs
//! from a board: a serial bus in one of two styles, the reset line, the
//! interrupt line and a small key-value flash store for configuration.
//! Chip-specific HALs (RP2040, ...) implement them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  tactus-core (Device, Transport, ...)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  tactus-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │  tactus-hal-  │
//!             │    rp2040     │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`], [`gpio::InputPin`] - Reset and interrupt lines
//! - [`i2c::TwoWireBus`] - Two-wire (I2C style) bus operations
//! - [`spi::FourWireBus`] - Four-wire (SPI style) bus operations
//! - [`flash::FlashStorage`] - Persistent storage

#![no_std]
#![deny(unsafe_code)]

pub mod flash;
pub mod gpio;
pub mod i2c;
pub mod spi;

// Re-export key traits at crate root for convenience
pub use flash::{FlashStorage, StorageKey};
pub use gpio::{InputPin, OutputPin};
pub use i2c::TwoWireBus;
pub use spi::FourWireBus;
