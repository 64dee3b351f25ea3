//! Blocking SPI master for four-wire controllers
//!
//! Chip select is driven by hand so one window can span the command
//! header, dummy clocks and payload.

use embassy_rp::gpio::{AnyPin, Level, Output};
use embassy_rp::spi::{self, Blocking, ClkPin, Instance, MisoPin, MosiPin, Spi};
use embassy_rp::Peri;
use tactus_hal::spi::{FourWireConfig, Phase, Polarity};

/// Four-wire bus on one RP2040 SPI block
pub struct FourWireMaster<'d, T: Instance> {
    spi: Spi<'d, T, Blocking>,
    cs: Output<'d>,
}

impl<'d, T: Instance> FourWireMaster<'d, T> {
    pub fn new(
        peri: Peri<'d, T>,
        clk: Peri<'d, impl ClkPin<T>>,
        mosi: Peri<'d, impl MosiPin<T>>,
        miso: Peri<'d, impl MisoPin<T>>,
        cs: Peri<'d, AnyPin>,
        config: FourWireConfig,
    ) -> Self {
        let (polarity, phase) = config.mode.into();
        let mut spi_config = spi::Config::default();
        spi_config.frequency = config.frequency;
        spi_config.polarity = match polarity {
            Polarity::IdleLow => spi::Polarity::IdleLow,
            Polarity::IdleHigh => spi::Polarity::IdleHigh,
        };
        spi_config.phase = match phase {
            Phase::CaptureOnFirstTransition => spi::Phase::CaptureOnFirstTransition,
            Phase::CaptureOnSecondTransition => spi::Phase::CaptureOnSecondTransition,
        };

        Self {
            spi: Spi::new_blocking(peri, clk, mosi, miso, spi_config),
            cs: Output::new(cs, Level::High),
        }
    }

    /// Run `f` with chip select asserted
    fn select<R>(&mut self, f: impl FnOnce(&mut Spi<'d, T, Blocking>) -> R) -> R {
        self.cs.set_low();
        let result = f(&mut self.spi);
        self.cs.set_high();
        result
    }
}

impl<T: Instance> tactus_hal::FourWireBus for FourWireMaster<'_, T> {
    type Error = spi::Error;

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        self.select(|spi| spi.blocking_transfer(read, write))
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.select(|spi| spi.blocking_write(data))
    }
}
