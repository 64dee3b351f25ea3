//! Chip profiles
//!
//! Both profiles share the identity block at the bottom of the register
//! map and the pass-through command window:
//!
//! | Offset   | Size | Register                          |
//! |----------|------|-----------------------------------|
//! | `0x0000` | 4    | chip id (LE)                      |
//! | `0x0004` | 3    | firmware major, minor, revision   |
//! | `0x0008` | 8    | product id (ASCII, NUL padded)    |
//! | `0x0010` | 1    | status bits                       |
//! | `0x0011` | 1    | power control                     |
//! | `0x0012` | 1    | reset control                     |
//! | `0x0100` | -    | report packet                     |
//! | `0x0800` | 256  | command window                    |

mod basic;
mod gesture;

pub use basic::Basic;
pub use gesture::{Gesture, GestureConfig};

use tactus_core::bus::{RegisterIo, Segment};
use tactus_core::capability::{PowerCommand, ResetKind};
use tactus_core::report::{IcInfo, Version};
use tactus_core::{Error, Result};

/// Shared register offsets
pub mod reg {
    pub const CHIP_ID: u16 = 0x0000;
    pub const FW_VERSION: u16 = 0x0004;
    pub const PRODUCT_ID: u16 = 0x0008;
    pub const STATUS: u16 = 0x0010;
    pub const POWER: u16 = 0x0011;
    pub const RESET: u16 = 0x0012;
    pub const REPORT: u16 = 0x0100;
    pub const COMMAND: u16 = 0x0800;
}

/// Status register bits
pub mod status {
    /// Boot finished, scanning possible
    pub const READY: u8 = 1 << 0;
    /// Internal fault latched
    pub const FAULT: u8 = 1 << 1;
    /// Test mode entered
    pub const TEST_ACK: u8 = 1 << 2;
}

/// Size of the pass-through command window
pub const COMMAND_WINDOW: usize = 0x100;

/// Value written to the reset register for a soft reset
const SOFT_RESET: u8 = 0xA5;

fn power_code(command: PowerCommand) -> u8 {
    match command {
        PowerCommand::Off => 0,
        PowerCommand::On => 1,
        PowerCommand::Sleep => 2,
        PowerCommand::Wake => 3,
    }
}

fn read_status(io: &mut dyn RegisterIo) -> Result<u8> {
    let mut raw = [0u8; 1];
    io.read(reg::STATUS, &mut raw)?;
    Ok(raw[0])
}

/// Compare the chip id; an unexpected part is treated as no answer
fn check_id(io: &mut dyn RegisterIo, expected: u32) -> Result<()> {
    if io.read_u32(reg::CHIP_ID)? == expected {
        Ok(())
    } else {
        Err(Error::BusError)
    }
}

/// Soft reset writes the reset register; after a line pulse the chip only
/// has to report ready
fn reset(io: &mut dyn RegisterIo, kind: ResetKind) -> Result<()> {
    match kind {
        ResetKind::Soft => io.write(reg::RESET, &[SOFT_RESET]),
        ResetKind::Hardware => {
            if read_status(io)? & status::READY != 0 {
                Ok(())
            } else {
                Err(Error::TimedOut)
            }
        }
    }
}

fn ic_info(io: &mut dyn RegisterIo) -> Result<IcInfo> {
    let mut version = [0u8; 3];
    let mut product_id = [0u8; 8];
    io.transfer(&mut [
        Segment::Read {
            offset: reg::FW_VERSION,
            buf: &mut version,
        },
        Segment::Read {
            offset: reg::PRODUCT_ID,
            buf: &mut product_id,
        },
    ])?;

    Ok(IcInfo {
        version: Version {
            major: version[0],
            minor: version[1],
        },
        product_id,
        revision: version[2],
    })
}

fn test_mode_ack(io: &mut dyn RegisterIo) -> Result<bool> {
    Ok(read_status(io)? & status::TEST_ACK != 0)
}

/// Offset of `command` in the command window, if `len` bytes fit
fn command_offset(command: u32, len: usize) -> Result<u16> {
    let start = command as usize;
    if start >= COMMAND_WINDOW || start + len > COMMAND_WINDOW {
        return Err(Error::BusOverflow);
    }
    Ok(reg::COMMAND + start as u16)
}

fn set(io: &mut dyn RegisterIo, command: u32, data: &[u8]) -> Result<()> {
    io.write(command_offset(command, data.len())?, data)
}

fn get(io: &mut dyn RegisterIo, command: u32, out: &mut [u8]) -> Result<usize> {
    io.read(command_offset(command, out.len())?, out)?;
    Ok(out.len())
}
