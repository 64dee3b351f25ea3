//! Board-agnostic touch controller runtime
//!
//! Everything between a touch controller's serial bus and the rest of the
//! system that does not depend on a specific board or chip:
//!
//! - Bus transport over two-wire and four-wire buses
//! - Capability table resolving optional chip operations
//! - Interrupt line bookkeeping with pending-edge replay
//! - Lifecycle state machine (core, power and display axes)
//! - Event fabric with blocking and atomic channels
//! - Coalescing deferred task queue
//! - Configuration type definitions
//!
//! Chip profiles live in `tactus-drivers`; board bindings in the HAL
//! crates.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod bus;
pub mod capability;
pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod irq;
pub mod poll;
pub mod report;
pub mod state;
pub mod task;

#[cfg(test)]
mod test_support;

pub use device::Device;
pub use error::{Error, Result};
