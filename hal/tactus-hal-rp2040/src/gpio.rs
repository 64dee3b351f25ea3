//! Reset and interrupt lines
//!
//! Both lines carry the board-level inversion from their [`PinConfig`], so
//! the runtime always sees the controller's logical levels.

use embassy_rp::gpio::{AnyPin, Input, Level, Output, Pull};
use embassy_rp::Peri;
use tactus_core::config::{IrqConfig, IrqTrigger, PinConfig};

use crate::pins::GPIO_COUNT;

/// Controller reset output
///
/// Starts released (logical high).
pub struct ResetLine<'d> {
    pin: Output<'d>,
    inverted: bool,
}

impl<'d> ResetLine<'d> {
    pub fn new(pin: Peri<'d, AnyPin>, config: &PinConfig) -> Self {
        let released = if config.inverted { Level::Low } else { Level::High };
        Self {
            pin: Output::new(pin, released),
            inverted: config.inverted,
        }
    }
}

impl tactus_hal::OutputPin for ResetLine<'_> {
    fn set_high(&mut self) {
        if self.inverted {
            self.pin.set_low();
        } else {
            self.pin.set_high();
        }
    }

    fn set_low(&mut self) {
        if self.inverted {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
    }

    fn is_set_high(&self) -> bool {
        self.pin.is_set_high() != self.inverted
    }
}

/// Controller interrupt input
pub struct IrqLine<'d> {
    pin: Input<'d>,
    inverted: bool,
    trigger: IrqTrigger,
}

impl<'d> IrqLine<'d> {
    pub fn new(pin: Peri<'d, AnyPin>, config: &IrqConfig) -> Self {
        let pull = if config.pin.pull_up { Pull::Up } else { Pull::None };
        Self {
            pin: Input::new(pin, pull),
            inverted: config.pin.inverted,
            trigger: config.trigger,
        }
    }

    /// Wait for the configured trigger condition
    ///
    /// Inversion swaps edge direction and turns level-low into level-high.
    pub async fn wait(&mut self) {
        match (self.trigger, self.inverted) {
            (IrqTrigger::FallingEdge, false) | (IrqTrigger::RisingEdge, true) => {
                self.pin.wait_for_falling_edge().await
            }
            (IrqTrigger::RisingEdge, false) | (IrqTrigger::FallingEdge, true) => {
                self.pin.wait_for_rising_edge().await
            }
            (IrqTrigger::LevelLow, false) => self.pin.wait_for_low().await,
            (IrqTrigger::LevelLow, true) => self.pin.wait_for_high().await,
        }
    }

    /// Wait until a level-triggered line is released
    ///
    /// Returns at once for edge triggers.
    pub async fn wait_idle(&mut self) {
        match (self.trigger, self.inverted) {
            (IrqTrigger::LevelLow, false) => self.pin.wait_for_high().await,
            (IrqTrigger::LevelLow, true) => self.pin.wait_for_low().await,
            _ => {}
        }
    }
}

impl tactus_hal::InputPin for IrqLine<'_> {
    fn is_high(&self) -> bool {
        self.pin.is_high() != self.inverted
    }
}

/// Parse a pin string from config
///
/// Supports formats:
/// - "gpio13" -> pin 13
/// - "!gpio13" -> pin 13, inverted (active-low)
/// - "^gpio14" -> pin 14 with pull-up
/// - "!^gpio14" or "^!gpio14" -> both
pub fn parse_pin_string(s: &str) -> Option<PinConfig> {
    let mut s = s.trim();
    let mut inverted = false;
    let mut pull_up = false;
    loop {
        if let Some(rest) = s.strip_prefix('!') {
            inverted = true;
            s = rest;
        } else if let Some(rest) = s.strip_prefix('^') {
            pull_up = true;
            s = rest;
        } else {
            break;
        }
    }

    let pin: u8 = s.strip_prefix("gpio")?.parse().ok()?;
    if pin as usize >= GPIO_COUNT {
        return None;
    }

    Some(PinConfig {
        pin,
        inverted,
        pull_up,
    })
}
