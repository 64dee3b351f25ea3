//! Bus transport
//!
//! One read, one write and one multi-segment transfer over either bus
//! style. Limits are checked before any byte reaches the wire, failures are
//! reported once and never retried.
//!
//! # Example
//!
//! ```ignore
//! let mut transport = Transport::new(wire, &config.bus, None)?;
//! let mut id = [0u8; 4];
//! transport.read(0x0000, &mut id)?;
//! ```

mod frame;
mod trace;
mod wire;

pub use frame::{Framing, FOUR_WIRE_MAX_OFFSET, MAX_DUMMY, MAX_HEADER};
pub use trace::{TraceKind, TraceRecord, TraceSink};
pub use wire::{FourWire, Scratch, TwoWire, Wire, WireFault, FRAME_CAPACITY};

pub(crate) use trace::mirror;

use crate::config::{BusConfig, BusStyle};
use crate::error::{Error, Result};

/// Largest payload one read or write may carry
pub const MAX_TRANSFER: usize = 1024;

/// Largest number of segments one transfer may carry
pub const MAX_SEGMENTS: usize = 8;

/// Payload bytes included in a failure dump
const DUMP_BYTES: usize = 16;

/// One step of a multi-segment transfer
#[derive(Debug)]
pub enum Segment<'b> {
    /// Read `buf.len()` bytes starting at `offset`
    Read { offset: u16, buf: &'b mut [u8] },
    /// Write `data` starting at `offset`
    Write { offset: u16, data: &'b [u8] },
}

impl Segment<'_> {
    /// Payload length of this segment
    pub fn len(&self) -> usize {
        match self {
            Segment::Read { buf, .. } => buf.len(),
            Segment::Write { data, .. } => data.len(),
        }
    }

    /// Check for an empty payload
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn offset(&self) -> u16 {
        match self {
            Segment::Read { offset, .. } | Segment::Write { offset, .. } => *offset,
        }
    }
}

/// Bus activity counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusStats {
    /// Wire operations issued (successful or not)
    pub transfers: u32,
    /// Wire operations that failed
    pub failures: u32,
}

/// Register access as seen by chip profiles
pub trait RegisterIo {
    /// Read `buf.len()` bytes at `offset`
    fn read(&mut self, offset: u16, buf: &mut [u8]) -> Result<()>;

    /// Write `data` at `offset`
    fn write(&mut self, offset: u16, data: &[u8]) -> Result<()>;

    /// Run ordered segments; the first failure aborts the rest
    fn transfer(&mut self, segments: &mut [Segment<'_>]) -> Result<()>;

    /// Read a little-endian 32-bit register
    fn read_u32(&mut self, offset: u16) -> Result<u32> {
        let mut raw = [0u8; 4];
        self.read(offset, &mut raw)?;
        Ok(u32::from_le_bytes(raw))
    }

    /// Write a little-endian 32-bit register
    fn write_u32(&mut self, offset: u16, value: u32) -> Result<()> {
        self.write(offset, &value.to_le_bytes())
    }
}

/// Unified transport over one wire
///
/// Not re-entrant: the Device Context only hands it out while holding its
/// lock.
pub struct Transport<'a, W> {
    wire: W,
    style: BusStyle,
    framing: Framing,
    max_transfer: usize,
    max_segments: usize,
    scratch: Scratch,
    trace: Option<&'a dyn TraceSink>,
    stats: BusStats,
}

impl<'a, W: Wire> Transport<'a, W> {
    /// Bind a wire to the configured limits
    ///
    /// Fails with `AllocationFailure` when the limits exceed the static
    /// scratch capacity and `InvalidState` when the wire does not speak the
    /// configured style.
    pub fn new(wire: W, config: &BusConfig, trace: Option<&'a dyn TraceSink>) -> Result<Self> {
        if !config.fits_capacity() {
            error!(
                "bus limits exceed capacity: transfer {} segments {}",
                config.max_transfer,
                config.max_segments
            );
            return Err(Error::AllocationFailure);
        }
        let style = wire.style();
        if style != config.style {
            error!("wire style does not match configuration");
            return Err(Error::InvalidState);
        }

        Ok(Self {
            framing: wire.framing(),
            wire,
            style,
            max_transfer: config.max_transfer as usize,
            max_segments: config.max_segments as usize,
            scratch: Scratch::new(),
            trace,
            stats: BusStats::default(),
        })
    }

    /// Attach or replace the diagnostic sink
    pub fn set_trace(&mut self, trace: Option<&'a dyn TraceSink>) {
        self.trace = trace;
    }

    /// Framing in use
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Activity counters
    pub fn stats(&self) -> BusStats {
        self.stats
    }

    /// Release the wire
    pub fn release(self) -> W {
        self.wire
    }

    fn check(&self, offset: u16, len: usize) -> Result<()> {
        if len > self.max_transfer {
            debug!("bus request of {} bytes exceeds {}", len, self.max_transfer);
            return Err(Error::BusOverflow);
        }
        if !frame::offset_in_range(self.style, offset) {
            debug!("offset {=u16:#x} not addressable", offset);
            return Err(Error::BusOverflow);
        }
        Ok(())
    }

    /// Read `buf.len()` bytes starting at `offset`
    pub fn read(&mut self, offset: u16, buf: &mut [u8]) -> Result<()> {
        self.check(offset, buf.len())?;
        self.read_unchecked(offset, buf)
    }

    /// Write `data` starting at `offset`
    pub fn write(&mut self, offset: u16, data: &[u8]) -> Result<()> {
        self.check(offset, data.len())?;
        self.write_unchecked(offset, data)
    }

    /// Run ordered segments
    ///
    /// Segment count and every segment's length are checked before the
    /// first byte is sent.
    pub fn transfer(&mut self, segments: &mut [Segment<'_>]) -> Result<()> {
        if segments.len() > self.max_segments {
            debug!(
                "transfer of {} segments exceeds {}",
                segments.len(),
                self.max_segments
            );
            return Err(Error::BusOverflow);
        }
        for segment in segments.iter() {
            self.check(segment.offset(), segment.len())?;
        }

        for segment in segments.iter_mut() {
            match segment {
                Segment::Read { offset, buf } => self.read_unchecked(*offset, buf)?,
                Segment::Write { offset, data } => self.write_unchecked(*offset, data)?,
            }
        }
        Ok(())
    }

    fn read_unchecked(&mut self, offset: u16, buf: &mut [u8]) -> Result<()> {
        let mut header = [0u8; MAX_HEADER];
        let len = frame::encode_read_header(self.style, &self.framing, offset, buf.len(), &mut header);
        let header = &header[..len];

        self.stats.transfers = self.stats.transfers.wrapping_add(1);
        let result = self
            .wire
            .read(header, self.framing.read_dummy, buf, &mut self.scratch)
            .map_err(|WireFault| Error::BusError);

        if result.is_err() {
            self.stats.failures = self.stats.failures.wrapping_add(1);
            dump("read", offset, header[0], buf);
        }
        trace::mirror(
            self.trace,
            TraceRecord {
                kind: TraceKind::Read,
                code: offset as u32,
                payload: buf,
                result,
            },
        );
        result
    }

    fn write_unchecked(&mut self, offset: u16, data: &[u8]) -> Result<()> {
        let framing = self.framing;
        let start = framing.write_header + framing.write_dummy;
        let total = framing.write_frame_len(data.len());

        let tx = &mut self.scratch.tx[..total];
        frame::encode_write_header(self.style, &framing, offset, tx);
        tx[framing.write_header..start].fill(0);
        tx[start..].copy_from_slice(data);
        let flags = tx[0];

        self.stats.transfers = self.stats.transfers.wrapping_add(1);
        let result = self
            .wire
            .write(&self.scratch.tx[..total])
            .map_err(|WireFault| Error::BusError);

        if result.is_err() {
            self.stats.failures = self.stats.failures.wrapping_add(1);
            dump("write", offset, flags, data);
        }
        trace::mirror(
            self.trace,
            TraceRecord {
                kind: TraceKind::Write,
                code: offset as u32,
                payload: data,
                result,
            },
        );
        result
    }
}

impl<W: Wire> RegisterIo for Transport<'_, W> {
    fn read(&mut self, offset: u16, buf: &mut [u8]) -> Result<()> {
        Transport::read(self, offset, buf)
    }

    fn write(&mut self, offset: u16, data: &[u8]) -> Result<()> {
        Transport::write(self, offset, data)
    }

    fn transfer(&mut self, segments: &mut [Segment<'_>]) -> Result<()> {
        Transport::transfer(self, segments)
    }
}

fn dump(direction: &str, offset: u16, flags: u8, payload: &[u8]) {
    let shown = &payload[..payload.len().min(DUMP_BYTES)];
    warn!(
        "bus {} failed: offset={=u16:#x} flags={=u8:#x} len={} payload={=[u8]:x}",
        direction,
        offset,
        flags,
        payload.len(),
        shown
    );
}
