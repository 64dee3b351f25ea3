//! Board glue
//!
//! Concrete types binding the runtime to this board: the wire picked by
//! the configuration, the timer-backed delay and the RTT trace sink.

use defmt::*;
use embassy_rp::peripherals::{I2C0, SPI0};
use embassy_time::Timer;
use embedded_hal_async::delay::DelayNs;

use tactus_core::bus::{FourWire, Scratch, TraceRecord, TraceSink, TwoWire, Wire, WireFault};
use tactus_core::capability::ChipProfile;
use tactus_core::config::BusStyle;
use tactus_core::Device;
use tactus_hal_rp2040::gpio::ResetLine;
use tactus_hal_rp2040::i2c::TwoWireMaster;
use tactus_hal_rp2040::spi::FourWireMaster;

/// The controller as wired on this board
pub type TouchDevice = Device<'static, dyn ChipProfile, BoardWire, ResetLine<'static>, TimerDelay>;

/// Either bus style, chosen from the configuration at boot
pub enum BoardWire {
    TwoWire(TwoWire<TwoWireMaster<'static, I2C0>>),
    FourWire(FourWire<FourWireMaster<'static, SPI0>>),
}

impl Wire for BoardWire {
    fn style(&self) -> BusStyle {
        match self {
            BoardWire::TwoWire(wire) => wire.style(),
            BoardWire::FourWire(wire) => wire.style(),
        }
    }

    fn write(&mut self, frame: &[u8]) -> Result<(), WireFault> {
        match self {
            BoardWire::TwoWire(wire) => wire.write(frame),
            BoardWire::FourWire(wire) => wire.write(frame),
        }
    }

    fn read(
        &mut self,
        header: &[u8],
        dummy: usize,
        data: &mut [u8],
        scratch: &mut Scratch,
    ) -> Result<(), WireFault> {
        match self {
            BoardWire::TwoWire(wire) => wire.read(header, dummy, data, scratch),
            BoardWire::FourWire(wire) => wire.read(header, dummy, data, scratch),
        }
    }
}

/// Delay backed by the embassy time driver
#[derive(Debug, Clone, Copy, Default)]
pub struct TimerDelay;

impl DelayNs for TimerDelay {
    async fn delay_ns(&mut self, ns: u32) {
        Timer::after_nanos(ns as u64).await
    }

    async fn delay_us(&mut self, us: u32) {
        Timer::after_micros(us as u64).await
    }

    async fn delay_ms(&mut self, ms: u32) {
        Timer::after_millis(ms as u64).await
    }
}

/// Mirrors bus transfers and delivered events to the RTT log
pub struct RttTrace;

impl TraceSink for RttTrace {
    fn record(&self, record: &TraceRecord<'_>) {
        trace!(
            "{:?} {=u32:#x} [{} bytes] {:?}",
            record.kind,
            record.code,
            record.payload.len(),
            record.result
        );
    }
}
