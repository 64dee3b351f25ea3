//! Two-wire bus abstractions
//!
//! Touch controllers on a two-wire (I2C style) bus are addressed by a 7-bit
//! device address; register offsets travel inside the written payload.

/// Two-wire bus master
pub trait TwoWireBus {
    /// Error type for bus operations
    type Error;

    /// Write data to a device at the given address
    ///
    /// # Arguments
    /// * `address` - 7-bit device address
    /// * `data` - Bytes to write (register header followed by payload)
    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// Write then read in a single transaction (repeated start)
    ///
    /// This is how a register offset is selected before reading it back.
    ///
    /// # Arguments
    /// * `address` - 7-bit device address
    /// * `header` - Bytes to write (register header)
    /// * `read_buf` - Buffer to read into
    fn write_read(
        &mut self,
        address: u8,
        header: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), Self::Error>;
}

/// Two-wire bus configuration
#[derive(Debug, Clone, Copy)]
pub struct TwoWireConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
}

impl Default for TwoWireConfig {
    fn default() -> Self {
        Self::FAST
    }
}

impl TwoWireConfig {
    /// Standard mode (100 kHz)
    pub const STANDARD: Self = Self { frequency: 100_000 };

    /// Fast mode (400 kHz), what most touch controllers ship with
    pub const FAST: Self = Self { frequency: 400_000 };

    /// Fast mode plus (1 MHz)
    pub const FAST_PLUS: Self = Self {
        frequency: 1_000_000,
    };
}
