//! Bus framing
//!
//! Header and dummy-byte accounting for each bus style. Four-wire headers
//! carry the register offset big-endian with the top bit of the first byte
//! flagging a read; read headers append the transfer length big-endian.
//! Remaining header bytes are zero.

use crate::config::{Addressing, BusStyle};

/// Largest header any bus style uses
pub const MAX_HEADER: usize = 16;

/// Largest dummy window any bus style uses
pub const MAX_DUMMY: usize = 16;

/// Read flag in the first four-wire header byte
const READ_FLAG: u8 = 0x80;

/// Highest register offset addressable on a four-wire bus
pub const FOUR_WIRE_MAX_OFFSET: u16 = 0x7FFF;

/// Header and dummy sizes for one bus style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Framing {
    /// Header bytes preceding a write payload
    pub write_header: usize,
    /// Dummy bytes between write header and payload
    pub write_dummy: usize,
    /// Header bytes preceding a read
    pub read_header: usize,
    /// Dummy bytes clocked between read header and data
    pub read_dummy: usize,
}

impl Framing {
    /// Two-wire: 2-byte offset header, no dummy bytes
    pub const TWO_WIRE: Self = Self {
        write_header: 2,
        write_dummy: 0,
        read_header: 2,
        read_dummy: 0,
    };

    /// Four-wire, standard addressing
    pub const FOUR_WIRE: Self = Self {
        write_header: 2,
        write_dummy: 0,
        read_header: 4,
        read_dummy: 2,
    };

    /// Four-wire, 16-bit command window
    pub const FOUR_WIRE_WIDE: Self = Self {
        write_header: 4,
        write_dummy: 0,
        read_header: 6,
        read_dummy: 4,
    };

    /// Four-wire, 128-bit command window
    pub const FOUR_WIRE_BLOCK: Self = Self {
        write_header: 16,
        write_dummy: 0,
        read_header: 16,
        read_dummy: 16,
    };

    /// Framing used by a bus style
    pub const fn for_style(style: BusStyle) -> Self {
        match style {
            BusStyle::TwoWire => Self::TWO_WIRE,
            BusStyle::FourWire(Addressing::Standard) => Self::FOUR_WIRE,
            BusStyle::FourWire(Addressing::Wide) => Self::FOUR_WIRE_WIDE,
            BusStyle::FourWire(Addressing::Block) => Self::FOUR_WIRE_BLOCK,
        }
    }

    /// Bytes on the wire for a write of `len` payload bytes
    pub const fn write_frame_len(&self, len: usize) -> usize {
        self.write_header + self.write_dummy + len
    }

    /// Bytes on the wire for a read of `len` data bytes
    pub const fn read_frame_len(&self, len: usize) -> usize {
        self.read_header + self.read_dummy + len
    }
}

/// Check that `offset` is addressable with `style`
pub fn offset_in_range(style: BusStyle, offset: u16) -> bool {
    match style {
        BusStyle::TwoWire => true,
        BusStyle::FourWire(_) => offset <= FOUR_WIRE_MAX_OFFSET,
    }
}

/// Encode a write header into `out`, returning the header length
pub fn encode_write_header(style: BusStyle, framing: &Framing, offset: u16, out: &mut [u8]) -> usize {
    let len = framing.write_header;
    let header = &mut out[..len];
    header.fill(0);
    let [hi, lo] = offset.to_be_bytes();
    header[0] = match style {
        BusStyle::TwoWire => hi,
        BusStyle::FourWire(_) => hi & !READ_FLAG,
    };
    header[1] = lo;
    len
}

/// Encode a read header into `out`, returning the header length
pub fn encode_read_header(
    style: BusStyle,
    framing: &Framing,
    offset: u16,
    data_len: usize,
    out: &mut [u8],
) -> usize {
    let len = framing.read_header;
    let header = &mut out[..len];
    header.fill(0);
    let [hi, lo] = offset.to_be_bytes();
    match style {
        BusStyle::TwoWire => {
            header[0] = hi;
            header[1] = lo;
        }
        BusStyle::FourWire(_) => {
            header[0] = hi | READ_FLAG;
            header[1] = lo;
            let [len_hi, len_lo] = (data_len as u16).to_be_bytes();
            header[2] = len_hi;
            header[3] = len_lo;
        }
    }
    len
}
