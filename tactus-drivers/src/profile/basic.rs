//! Minimal two-wire controller
//!
//! Populates the mandatory operations and nothing else: no runtime
//! register programming, no wake gestures, no notifications and no
//! in-field upgrade.

use tactus_core::bus::RegisterIo;
use tactus_core::capability::{ChipProfile, ChipTraits, PowerCommand, ResetKind, Slot};
use tactus_core::report::{IcInfo, TouchReport};

use super::reg;
use crate::packet;

/// Basic two-wire profile
#[derive(Debug, Clone, Copy)]
pub struct Basic {
    chip_id: u32,
}

impl Basic {
    /// Chip id reported by stock parts
    pub const DEFAULT_CHIP_ID: u32 = 0x5443_0100;

    pub const fn new(chip_id: u32) -> Self {
        Self { chip_id }
    }
}

impl Default for Basic {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CHIP_ID)
    }
}

impl ChipProfile for Basic {
    fn traits(&self) -> ChipTraits {
        ChipTraits::new("basic")
    }

    fn probe(&self, io: &mut dyn RegisterIo) -> Slot<()> {
        Some(super::check_id(io, self.chip_id))
    }

    fn reset(&self, io: &mut dyn RegisterIo, kind: ResetKind) -> Slot<()> {
        Some(super::reset(io, kind))
    }

    fn power(&self, io: &mut dyn RegisterIo, command: PowerCommand) -> Slot<()> {
        Some(io.write(reg::POWER, &[super::power_code(command)]))
    }

    fn ic_info(&self, io: &mut dyn RegisterIo) -> Slot<IcInfo> {
        Some(super::ic_info(io))
    }

    fn read_report(&self, io: &mut dyn RegisterIo) -> Slot<TouchReport> {
        Some(packet::read_report(io, reg::REPORT))
    }

    fn test_mode_ack(&self, io: &mut dyn RegisterIo) -> Slot<bool> {
        Some(super::test_mode_ack(io))
    }

    fn set(&self, io: &mut dyn RegisterIo, command: u32, data: &[u8]) -> Slot<()> {
        Some(super::set(io, command, data))
    }

    fn get(&self, io: &mut dyn RegisterIo, command: u32, out: &mut [u8]) -> Slot<usize> {
        Some(super::get(io, command, out))
    }
}
