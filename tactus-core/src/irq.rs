//! Interrupt line controller
//!
//! Owns the enable, wake and pending bookkeeping for the controller's
//! interrupt line. The bookkeeping sits behind its own critical-section
//! lock so the interrupt path can consult it without touching the Device
//! Context lock.
//!
//! An edge arriving while the line is masked is latched as pending, and
//! `disable()` always latches pending. The next `enable()` consumes the
//! latch and reports [`Enable::Replayed`]; the replay stays visible in
//! [`LineState::replay`] until the interrupt handler starts servicing it.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::error::{Error, Result};

/// Interrupt line bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineState {
    /// The line is claimed by this device
    pub registered: bool,
    /// Edges are delivered to the handler
    pub enabled: bool,
    /// The line may wake the system from sleep
    pub wake_armed: bool,
    /// An edge may have been missed while masked
    pub pending: bool,
    /// The last enable replayed a pending edge that has not been serviced yet
    pub replay: bool,
}

/// Outcome of [`IrqController::enable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Enable {
    /// Line unmasked, nothing pending
    Enabled,
    /// Line unmasked and a pending edge must be processed now
    Replayed,
    /// Line was already enabled; state unchanged
    AlreadyEnabled,
}

/// Outcome of [`IrqController::on_edge`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    /// Line enabled; schedule the handler
    Service,
    /// Line masked; remembered as pending
    Latched,
    /// Line not registered
    Ignored,
}

#[derive(Clone, Copy, Default)]
struct Bookkeeping {
    line: LineState,
    replays: u32,
}

/// Interrupt line controller
pub struct IrqController {
    wake_capable: bool,
    book: Mutex<CriticalSectionRawMutex, Cell<Bookkeeping>>,
}

impl IrqController {
    /// Create a controller; `wake_capable` comes from the chip profile
    pub const fn new(wake_capable: bool) -> Self {
        Self {
            wake_capable,
            book: Mutex::new(Cell::new(Bookkeeping {
                line: LineState {
                    registered: false,
                    enabled: false,
                    wake_armed: false,
                    pending: false,
                    replay: false,
                },
                replays: 0,
            })),
        }
    }

    fn update<R>(&self, f: impl FnOnce(&mut Bookkeeping) -> R) -> R {
        self.book.lock(|cell| {
            let mut book = cell.get();
            let result = f(&mut book);
            cell.set(book);
            result
        })
    }

    /// Claim the line; it starts masked
    pub fn register(&self) -> Result<()> {
        self.update(|book| {
            if book.line.registered {
                return Err(Error::InvalidState);
            }
            book.line = LineState {
                registered: true,
                ..LineState::default()
            };
            Ok(())
        })
    }

    /// Release the line, dropping all bookkeeping
    pub fn unregister(&self) {
        self.update(|book| book.line = LineState::default());
    }

    /// Unmask the line
    pub fn enable(&self) -> Result<Enable> {
        let outcome = self.update(|book| {
            let line = &mut book.line;
            if !line.registered {
                return Err(Error::InvalidState);
            }
            if line.enabled {
                return Ok(Enable::AlreadyEnabled);
            }
            line.enabled = true;
            if line.pending {
                line.pending = false;
                line.replay = true;
                book.replays = book.replays.wrapping_add(1);
                Ok(Enable::Replayed)
            } else {
                Ok(Enable::Enabled)
            }
        });

        if let Ok(Enable::AlreadyEnabled) = outcome {
            warn!("irq already enabled");
        }
        outcome
    }

    /// Mask the line and latch pending
    ///
    /// Idempotent; a no-op on an unregistered line.
    pub fn disable(&self) {
        self.update(|book| {
            let line = &mut book.line;
            if line.registered {
                line.enabled = false;
                line.pending = true;
            }
        });
    }

    /// Arm or disarm wake; silently ignored on chips without wake gestures
    pub fn set_wake(&self, armed: bool) {
        if !self.wake_capable {
            debug!("wake arming ignored, chip has no wake gestures");
            return;
        }
        self.update(|book| {
            if book.line.registered {
                book.line.wake_armed = armed;
            }
        });
    }

    /// Record a hardware edge
    ///
    /// Callable from the restricted interrupt path.
    pub fn on_edge(&self) -> Edge {
        self.update(|book| {
            let line = &mut book.line;
            if !line.registered {
                Edge::Ignored
            } else if line.enabled {
                Edge::Service
            } else {
                line.pending = true;
                Edge::Latched
            }
        })
    }

    /// Start servicing the line, consuming any replay marker
    ///
    /// Returns whether the line is currently enabled.
    pub fn begin_service(&self) -> bool {
        self.update(|book| {
            book.line.replay = false;
            book.line.enabled
        })
    }

    /// Snapshot of the line bookkeeping
    pub fn state(&self) -> LineState {
        self.book.lock(|cell| cell.get().line)
    }

    /// Number of pending edges replayed by `enable()`
    pub fn replays(&self) -> u32 {
        self.book.lock(|cell| cell.get().replays)
    }

    /// Whether wake arming has any effect
    pub fn wake_capable(&self) -> bool {
        self.wake_capable
    }
}
