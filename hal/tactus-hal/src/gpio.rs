//! GPIO pin abstractions
//!
//! A touch controller needs two lines from the board: an output driving the
//! controller's reset input, and an input carrying its interrupt request.
//! Edge waiting stays with the executor-specific HAL; the runtime only needs
//! level access here.

/// Digital output pin
///
/// Used for the controller reset line, which is active low at the
/// controller. Implementations apply any board-level inversion, so
/// `set_low` always asserts reset.
pub trait OutputPin {
    /// Drive the pin high (logic 1)
    fn set_high(&mut self);

    /// Drive the pin low (logic 0)
    fn set_low(&mut self);

    /// Drive the pin to a specific level
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }

    /// Check if the pin is currently driven high
    fn is_set_high(&self) -> bool;
}

/// Digital input pin
pub trait InputPin {
    /// Check if the pin reads high (logic 1)
    fn is_high(&self) -> bool;

    /// Check if the pin reads low (logic 0)
    fn is_low(&self) -> bool {
        !self.is_high()
    }
}

/// Output that never drives anything
///
/// For boards where the controller reset is shared with the panel and owned
/// by the display stack.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPin;

impl OutputPin for NoPin {
    fn set_high(&mut self) {}

    fn set_low(&mut self) {}

    fn is_set_high(&self) -> bool {
        true
    }
}
