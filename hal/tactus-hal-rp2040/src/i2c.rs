//! Blocking I2C master for two-wire controllers
//!
//! Bus transfers run with the device lock held and must complete before it
//! is released, so the blocking driver is used rather than the async one.

use embassy_rp::i2c::{self, Blocking, I2c, Instance, SclPin, SdaPin};
use embassy_rp::Peri;
use tactus_hal::i2c::TwoWireConfig;

/// Two-wire bus on one RP2040 I2C block
pub struct TwoWireMaster<'d, T: Instance> {
    i2c: I2c<'d, T, Blocking>,
}

impl<'d, T: Instance> TwoWireMaster<'d, T> {
    pub fn new(
        peri: Peri<'d, T>,
        scl: Peri<'d, impl SclPin<T>>,
        sda: Peri<'d, impl SdaPin<T>>,
        config: TwoWireConfig,
    ) -> Self {
        let mut i2c_config = i2c::Config::default();
        i2c_config.frequency = config.frequency;
        Self {
            i2c: I2c::new_blocking(peri, scl, sda, i2c_config),
        }
    }
}

impl<T: Instance> tactus_hal::TwoWireBus for TwoWireMaster<'_, T> {
    type Error = i2c::Error;

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        self.i2c.blocking_write(address, data)
    }

    fn write_read(
        &mut self,
        address: u8,
        header: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.i2c.blocking_write_read(address, header, read_buf)
    }
}
