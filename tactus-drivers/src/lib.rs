//! Touch controller chip profiles
//!
//! Concrete [`ChipProfile`](tactus_core::capability::ChipProfile)
//! implementations for the Tactus runtime:
//!
//! - [`profile::Basic`] - two-wire controller with the mandatory operations only
//! - [`profile::Gesture`] - four-wire controller with wake gestures, health
//!   checks and in-field firmware upgrade
//!
//! Both speak the same report packet format, decoded in [`packet`].

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod packet;
pub mod profile;

#[cfg(test)]
mod test_io;
