//! Configuration types
//!
//! Board and system configuration read once at construction. The firmware
//! stores these as TOML text or postcard-serialized binary data.

pub mod hardware;
pub mod system;

pub use hardware::*;
pub use system::*;
