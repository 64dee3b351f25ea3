//! Pin lookup by number
//!
//! The reset and interrupt lines come from the touch configuration, so the
//! firmware cannot name them at compile time. Free GPIOs are parked in a
//! [`PinBank`] and taken by number once the configuration is known.

use embassy_rp::gpio::AnyPin;
use embassy_rp::Peri;

/// Number of user GPIOs on the RP2040
pub const GPIO_COUNT: usize = 30;

/// Park peripheral pins in a new [`PinBank`]
///
/// Usage:
/// ```ignore
/// let mut bank = pin_bank!(p, PIN_13 = 13, PIN_14 = 14, PIN_15 = 15);
/// let reset = bank.take(config.reset_pin.pin)?;
/// ```
#[macro_export]
macro_rules! pin_bank {
    ($p:expr, $($pin:ident = $num:literal),* $(,)?) => {{
        let mut bank = $crate::pins::PinBank::new();
        $(
            bank.insert($num, embassy_rp::Peri::<embassy_rp::gpio::AnyPin>::from($p.$pin));
        )*
        bank
    }};
}

/// Error when requesting a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinError {
    /// Pin number out of range (0-29 valid)
    InvalidPin,
    /// Pin taken already, or never parked in the bank
    Unavailable,
}

/// GPIOs available for config-driven assignment
pub struct PinBank {
    pins: [Option<Peri<'static, AnyPin>>; GPIO_COUNT],
}

impl Default for PinBank {
    fn default() -> Self {
        Self::new()
    }
}

impl PinBank {
    /// Create an empty bank
    pub fn new() -> Self {
        Self {
            pins: core::array::from_fn(|_| None),
        }
    }

    /// Park a pin under its GPIO number
    ///
    /// Out-of-range numbers are ignored.
    pub fn insert(&mut self, pin_num: u8, pin: Peri<'static, AnyPin>) {
        if let Some(slot) = self.pins.get_mut(pin_num as usize) {
            *slot = Some(pin);
        }
    }

    /// Take a pin by number
    pub fn take(&mut self, pin_num: u8) -> Result<Peri<'static, AnyPin>, PinError> {
        self.pins
            .get_mut(pin_num as usize)
            .ok_or(PinError::InvalidPin)?
            .take()
            .ok_or(PinError::Unavailable)
    }

    /// Check if a pin can still be taken
    pub fn is_available(&self, pin_num: u8) -> bool {
        matches!(self.pins.get(pin_num as usize), Some(Some(_)))
    }
}
