//! Report packet format
//!
//! A report starts with a two-byte header, followed by one fixed-size
//! record per contact:
//!
//! ```text
//! header: [count] [flags]
//! record: [id] [x lo] [x hi] [y lo] [y hi] [pressure] [width]
//! ```
//!
//! Counts above [`MAX_CONTACTS`] are clamped; the extra records are never
//! read.

use tactus_core::bus::RegisterIo;
use tactus_core::report::{Contact, Gesture, TouchReport, MAX_CONTACTS};
use tactus_core::Result;

/// Header length in bytes
pub const HEADER_LEN: usize = 2;

/// Contact record length in bytes
pub const RECORD_LEN: usize = 7;

/// Header flag bits
pub mod flag {
    /// Controller detected an internal fault
    pub const ABNORMAL: u8 = 1 << 0;
    /// Double-tap wake gesture
    pub const KNOCK_ON: u8 = 1 << 1;
    /// Tap-sequence wake gesture
    pub const KNOCK_CODE: u8 = 1 << 2;
}

/// Decoded report header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header {
    /// Contact records that follow, clamped to [`MAX_CONTACTS`]
    pub count: usize,
    pub flags: u8,
}

impl Header {
    pub fn parse(raw: [u8; HEADER_LEN]) -> Self {
        Self {
            count: (raw[0] as usize).min(MAX_CONTACTS),
            flags: raw[1],
        }
    }

    /// Gesture announced by the flags; knock-on wins if both are set
    pub fn gesture(&self) -> Option<Gesture> {
        if self.flags & flag::KNOCK_ON != 0 {
            Some(Gesture::KnockOn)
        } else if self.flags & flag::KNOCK_CODE != 0 {
            Some(Gesture::KnockCode)
        } else {
            None
        }
    }

    pub fn abnormal(&self) -> bool {
        self.flags & flag::ABNORMAL != 0
    }
}

/// Decode one contact record
pub fn decode_contact(raw: &[u8; RECORD_LEN]) -> Contact {
    Contact {
        id: raw[0],
        x: u16::from_le_bytes([raw[1], raw[2]]),
        y: u16::from_le_bytes([raw[3], raw[4]]),
        pressure: raw[5],
        width: raw[6],
    }
}

/// Read a complete report starting at `offset`
///
/// Two reads: the header, then exactly the records it announces.
pub fn read_report(io: &mut dyn RegisterIo, offset: u16) -> Result<TouchReport> {
    let mut raw = [0u8; HEADER_LEN];
    io.read(offset, &mut raw)?;
    let header = Header::parse(raw);

    let mut report = TouchReport {
        gesture: header.gesture(),
        abnormal: header.abnormal(),
        ..TouchReport::default()
    };
    if header.count == 0 {
        return Ok(report);
    }

    let mut records = [0u8; MAX_CONTACTS * RECORD_LEN];
    let records = &mut records[..header.count * RECORD_LEN];
    io.read(offset + HEADER_LEN as u16, records)?;

    for chunk in records.chunks_exact(RECORD_LEN) {
        let mut record = [0u8; RECORD_LEN];
        record.copy_from_slice(chunk);
        // Capacity matches the clamped count
        let _ = report.contacts.push(decode_contact(&record));
    }
    Ok(report)
}
