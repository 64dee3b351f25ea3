//! Four-wire bus abstractions
//!
//! Touch controllers on a four-wire (SPI style) bus exchange a command
//! header, optional dummy clocks and the payload within one chip-select
//! window. Implementations own the chip-select line.

/// Four-wire bus master
pub trait FourWireBus {
    /// Error type for bus operations
    type Error;

    /// Full-duplex transfer inside one chip-select window
    ///
    /// Writes `write` while reading into `read`. Both buffers must be the
    /// same length.
    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error>;

    /// Write data inside one chip-select window, discarding input
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;
}

/// Four-wire bus configuration
#[derive(Debug, Clone, Copy)]
pub struct FourWireConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
    /// Clock mode
    pub mode: Mode,
}

impl Default for FourWireConfig {
    fn default() -> Self {
        Self {
            frequency: 10_000_000, // 10 MHz
            mode: Mode::Mode0,
        }
    }
}

/// SPI clock polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Clock idles low (CPOL=0)
    IdleLow,
    /// Clock idles high (CPOL=1)
    IdleHigh,
}

/// SPI clock phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Data captured on first clock transition (CPHA=0)
    CaptureOnFirstTransition,
    /// Data captured on second clock transition (CPHA=1)
    CaptureOnSecondTransition,
}

/// SPI mode (combined polarity and phase)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Mode 0: CPOL=0, CPHA=0
    Mode0,
    /// Mode 3: CPOL=1, CPHA=1
    Mode3,
}

impl From<Mode> for (Polarity, Phase) {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Mode0 => (Polarity::IdleLow, Phase::CaptureOnFirstTransition),
            Mode::Mode3 => (Polarity::IdleHigh, Phase::CaptureOnSecondTransition),
        }
    }
}
