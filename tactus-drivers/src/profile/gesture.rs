//! Four-wire controller with wake gestures
//!
//! Adds to the shared register map:
//!
//! | Offset   | Size | Register                                   |
//! |----------|------|--------------------------------------------|
//! | `0x0020` | 1    | report rate in Hz                          |
//! | `0x0021` | 1    | init commit                                |
//! | `0x0030` | 5    | host notification: code, payload (LE)      |
//! | `0x0040` | 4    | gesture control: mode, taps, window (LE)   |
//! | `0x0048` | 1    | adaptive sensitivity mode                  |
//! | `0x0050` | 4    | ESD recovery counter (LE)                  |
//! | `0x4000` | 4    | flash address (LE)                         |
//! | `0x4004` | 256  | flash data window                          |
//! | `0x4400` | 1    | flash control                              |
//! | `0x4404` | 4    | flash checksum readback (LE)               |

use tactus_core::bus::{RegisterIo, Segment};
use tactus_core::capability::{
    AscMode, ChipProfile, ChipTiming, ChipTraits, FirmwareSource, Health, LpwgMode, PowerCommand,
    ResetKind, Slot,
};
use tactus_core::event::{EventId, Notification};
use tactus_core::report::{IcInfo, TouchReport};
use tactus_core::{Error, Result};

use super::{reg, status};
use crate::packet;

/// Registers specific to this profile
pub mod gesture_reg {
    pub const REPORT_RATE: u16 = 0x0020;
    pub const INIT_COMMIT: u16 = 0x0021;
    pub const NOTIFY: u16 = 0x0030;
    pub const LPWG: u16 = 0x0040;
    pub const ASC: u16 = 0x0048;
    pub const ESD_COUNT: u16 = 0x0050;
    pub const FLASH_ADDR: u16 = 0x4000;
    pub const FLASH_DATA: u16 = 0x4004;
    pub const FLASH_CTRL: u16 = 0x4400;
    pub const FLASH_SUM: u16 = 0x4404;
}

/// Flash control commands
mod flash_cmd {
    pub const ERASE: u8 = 0x01;
    pub const COMMIT: u8 = 0x02;
}

/// Largest flash data chunk the window accepts
pub const MAX_CHUNK: usize = 256;

/// Gesture profile configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GestureConfig {
    /// Expected chip id
    pub chip_id: u32,
    /// Report rate while scanning
    pub report_rate_hz: u8,
    /// Taps making up a knock-on
    pub knock_taps: u8,
    /// Longest gap between taps
    pub knock_window_ms: u16,
    /// Flash chunk per transfer; must not exceed the bus transfer limit
    pub flash_chunk: usize,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            chip_id: 0x5443_0200,
            report_rate_hz: 120,
            knock_taps: 2,
            knock_window_ms: 500,
            flash_chunk: 128,
        }
    }
}

/// Wake-gesture capable four-wire profile
#[derive(Debug, Clone, Copy, Default)]
pub struct Gesture {
    config: GestureConfig,
}

impl Gesture {
    pub const TIMING: ChipTiming = ChipTiming {
        reset_low_ms: 10,
        reset_settle_ms: 150,
        power_settle_ms: 20,
        poll_interval_ms: 20,
    };

    pub const fn new(config: GestureConfig) -> Self {
        Self { config }
    }

    fn chunk(&self) -> usize {
        self.config.flash_chunk.clamp(1, MAX_CHUNK)
    }

    fn flash(&self, io: &mut dyn RegisterIo, image: &dyn FirmwareSource) -> Result<()> {
        let size = image.size();
        if size == 0 {
            return Err(Error::InvalidState);
        }

        io.write(gesture_reg::FLASH_CTRL, &[flash_cmd::ERASE])?;
        let mut chunk = [0u8; MAX_CHUNK];
        let mut offset = 0;
        let mut sum = 0u32;
        while offset < size {
            let count = image.read(offset, &mut chunk[..self.chunk()])?;
            if count == 0 {
                // Image shorter than it claims
                return Err(Error::InvalidState);
            }
            let data = &chunk[..count];
            sum = checksum(sum, data);

            let address = (offset as u32).to_le_bytes();
            io.transfer(&mut [
                Segment::Write {
                    offset: gesture_reg::FLASH_ADDR,
                    data: &address,
                },
                Segment::Write {
                    offset: gesture_reg::FLASH_DATA,
                    data,
                },
            ])?;
            offset += count;
        }

        io.write(gesture_reg::FLASH_CTRL, &[flash_cmd::COMMIT])?;
        if io.read_u32(gesture_reg::FLASH_SUM)? == sum {
            Ok(())
        } else {
            Err(Error::BusError)
        }
    }
}

/// Running checksum over image bytes, as the controller computes it
pub fn checksum(seed: u32, data: &[u8]) -> u32 {
    data.iter()
        .fold(seed, |sum, &byte| sum.rotate_left(1).wrapping_add(byte as u32))
}

/// Notification kinds the controller firmware reacts to
fn forwarded(event: EventId) -> bool {
    matches!(
        event,
        EventId::Connection
            | EventId::Wireless
            | EventId::Earjack
            | EventId::ImeState
            | EventId::CallState
            | EventId::DisplayBlank
    )
}

impl ChipProfile for Gesture {
    fn traits(&self) -> ChipTraits {
        ChipTraits {
            lpwg: true,
            health_check: true,
            timing: Self::TIMING,
            ..ChipTraits::new("gesture")
        }
    }

    fn probe(&self, io: &mut dyn RegisterIo) -> Slot<()> {
        Some(super::check_id(io, self.config.chip_id))
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

    fn init(&self, io: &mut dyn RegisterIo) -> Slot<()> {
        Some(io.transfer(&mut [
            Segment::Write {
                offset: gesture_reg::REPORT_RATE,
                data: &[self.config.report_rate_hz],
            },
            Segment::Write {
                offset: gesture_reg::INIT_COMMIT,
                data: &[1],
            },
        ]))
    }

    fn read_report(&self, io: &mut dyn RegisterIo) -> Slot<TouchReport> {
        Some(packet::read_report(io, reg::REPORT))
    }

    fn notify(&self, io: &mut dyn RegisterIo, note: &Notification) -> Slot<()> {
        if !forwarded(note.event) {
            return Some(Ok(()));
        }
        let mut raw = [0u8; 5];
        raw[0] = note.event.code() as u8;
        raw[1..].copy_from_slice(&note.payload.to_le_bytes());
        Some(io.write(gesture_reg::NOTIFY, &raw))
    }

    fn lpwg_configure(&self, io: &mut dyn RegisterIo, mode: LpwgMode) -> Slot<()> {
        let raw = match mode {
            LpwgMode::Off => [0, 0, 0, 0],
            LpwgMode::KnockOn => {
                let window = self.config.knock_window_ms.to_le_bytes();
                [1, self.config.knock_taps, window[0], window[1]]
            }
        };
        Some(io.write(gesture_reg::LPWG, &raw))
    }

    fn asc(&self, io: &mut dyn RegisterIo, mode: AscMode) -> Slot<()> {
        let raw = match mode {
            AscMode::Normal => 0,
            AscMode::Charging => 1,
        };
        Some(io.write(gesture_reg::ASC, &[raw]))
    }

    fn health_check(&self, io: &mut dyn RegisterIo) -> Slot<Health> {
        Some(super::read_status(io).map(|bits| {
            if bits & status::FAULT != 0 || bits & status::READY == 0 {
                Health::Abnormal
            } else {
                Health::Healthy
            }
        }))
    }

    fn upgrade(&self, io: &mut dyn RegisterIo, image: &dyn FirmwareSource) -> Slot<()> {
        Some(self.flash(io, image))
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
