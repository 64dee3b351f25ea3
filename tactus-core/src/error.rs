//! Runtime error taxonomy

use core::fmt;

/// Errors surfaced by the touch runtime
///
/// `BusOverflow` and `InvalidState` are always detected before any hardware
/// access. `BusError` and `TimedOut` come back from the hardware and are
/// reported to the immediate caller without changing lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Request exceeds a configured bus limit; nothing was sent
    BusOverflow,
    /// The bus transfer failed
    BusError,
    /// The chip profile does not implement a mandatory operation
    NotSupported,
    /// A bounded poll ran out of time
    TimedOut,
    /// Operation is not permitted in the current lifecycle phase
    InvalidState,
    /// A bounded resource could not hold the request
    AllocationFailure,
}

/// Result alias used throughout the runtime
pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Error::BusOverflow => "bus request exceeds configured maximum",
            Error::BusError => "bus transfer failed",
            Error::NotSupported => "operation not supported by chip profile",
            Error::TimedOut => "timed out",
            Error::InvalidState => "invalid lifecycle state",
            Error::AllocationFailure => "resource capacity exhausted",
        };
        f.write_str(text)
    }
}
