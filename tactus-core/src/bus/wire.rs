//! Wire adapters
//!
//! A [`Wire`] moves already-framed bytes over one concrete bus. The
//! transport composes headers; wires only know how their bus sequences
//! header, dummy and data phases.

use tactus_hal::{FourWireBus, TwoWireBus};

use super::frame::Framing;
use crate::config::{Addressing, BusStyle};

/// Scratch frame capacity: largest payload plus the largest header and
/// dummy windows
pub const FRAME_CAPACITY: usize = super::MAX_TRANSFER + super::frame::MAX_HEADER + super::frame::MAX_DUMMY;

/// The underlying bus reported a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WireFault;

/// Scratch buffers for full-duplex framing
pub struct Scratch {
    pub(crate) tx: [u8; FRAME_CAPACITY],
    pub(crate) rx: [u8; FRAME_CAPACITY],
}

impl Scratch {
    /// Create zeroed scratch buffers
    pub const fn new() -> Self {
        Self {
            tx: [0; FRAME_CAPACITY],
            rx: [0; FRAME_CAPACITY],
        }
    }
}

impl Default for Scratch {
    fn default() -> Self {
        Self::new()
    }
}

/// One bus style's way of moving frames
pub trait Wire {
    /// Bus style this wire speaks
    fn style(&self) -> BusStyle;

    /// Send one write frame (header, dummy and payload)
    fn write(&mut self, frame: &[u8]) -> Result<(), WireFault>;

    /// Send `header`, clock `dummy` bytes, then read `data.len()` bytes
    fn read(
        &mut self,
        header: &[u8],
        dummy: usize,
        data: &mut [u8],
        scratch: &mut Scratch,
    ) -> Result<(), WireFault>;

    /// Framing for this wire's style
    fn framing(&self) -> Framing {
        Framing::for_style(self.style())
    }
}

/// Two-wire adapter: a read is an address-write segment chained to a read
/// segment with a repeated start
pub struct TwoWire<B> {
    bus: B,
    address: u8,
}

impl<B: TwoWireBus> TwoWire<B> {
    /// Wrap a two-wire bus for the device at `address`
    pub fn new(bus: B, address: u8) -> Self {
        Self { bus, address }
    }

    /// Release the underlying bus
    pub fn release(self) -> B {
        self.bus
    }
}

impl<B: TwoWireBus> Wire for TwoWire<B> {
    fn style(&self) -> BusStyle {
        BusStyle::TwoWire
    }

    fn write(&mut self, frame: &[u8]) -> Result<(), WireFault> {
        self.bus.write(self.address, frame).map_err(|_| WireFault)
    }

    fn read(
        &mut self,
        header: &[u8],
        _dummy: usize,
        data: &mut [u8],
        _scratch: &mut Scratch,
    ) -> Result<(), WireFault> {
        self.bus
            .write_read(self.address, header, data)
            .map_err(|_| WireFault)
    }
}

/// Four-wire adapter: a read is one full-duplex segment covering header,
/// dummy and data
pub struct FourWire<B> {
    bus: B,
    addressing: Addressing,
}

impl<B: FourWireBus> FourWire<B> {
    /// Wrap a four-wire bus using the given addressing width
    pub fn new(bus: B, addressing: Addressing) -> Self {
        Self { bus, addressing }
    }

    /// Release the underlying bus
    pub fn release(self) -> B {
        self.bus
    }
}

impl<B: FourWireBus> Wire for FourWire<B> {
    fn style(&self) -> BusStyle {
        BusStyle::FourWire(self.addressing)
    }

    fn write(&mut self, frame: &[u8]) -> Result<(), WireFault> {
        self.bus.write(frame).map_err(|_| WireFault)
    }

    fn read(
        &mut self,
        header: &[u8],
        dummy: usize,
        data: &mut [u8],
        scratch: &mut Scratch,
    ) -> Result<(), WireFault> {
        let skip = header.len() + dummy;
        let total = skip + data.len();
        let tx = &mut scratch.tx[..total];
        tx[..header.len()].copy_from_slice(header);
        tx[header.len()..].fill(0);
        let rx = &mut scratch.rx[..total];

        self.bus.transfer(rx, tx).map_err(|_| WireFault)?;
        data.copy_from_slice(&rx[skip..]);
        Ok(())
    }
}
