//! Lifecycle snapshot
//!
//! The three axes plus the probe retry bookkeeping, kept behind a narrow
//! lock so any context can take a consistent snapshot. Writers hold the
//! Device Context lock, read one snapshot, decide, and commit.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use super::phase::{CoreInput, CorePhase, DisplayMode, PowerPhase};
use crate::error::{Error, Result};

/// Complete lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LifecycleState {
    pub core: CorePhase,
    pub power: PowerPhase,
    pub display: DisplayMode,
    /// Probe attempts made so far
    pub probe_attempts: u8,
    /// Retry cap reached; probing is refused for good
    pub failed: bool,
}

impl LifecycleState {
    /// Apply a core input, failing with `InvalidState` when rejected
    pub fn apply_core(&mut self, input: CoreInput) -> Result<()> {
        match self.core.transition(input).resolve(self.core) {
            Some(next) => {
                self.core = next;
                Ok(())
            }
            None => {
                warn!("core input rejected in current phase");
                Err(Error::InvalidState)
            }
        }
    }

    /// Move the power axis, failing with `InvalidState` when rejected
    pub fn apply_power(&mut self, target: PowerPhase) -> Result<()> {
        match self.power.transition(target).resolve(self.power) {
            Some(next) => {
                self.power = next;
                Ok(())
            }
            None => {
                warn!("power move rejected");
                Err(Error::InvalidState)
            }
        }
    }

    /// Record the display mode
    pub fn apply_display(&mut self, mode: DisplayMode) {
        if let Some(next) = self.display.transition(mode).resolve(self.display) {
            self.display = next;
        }
    }
}

/// Shared lifecycle cell
pub struct StateCell {
    inner: Mutex<CriticalSectionRawMutex, Cell<LifecycleState>>,
}

impl StateCell {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(LifecycleState {
                core: CorePhase::None,
                power: PowerPhase::Off,
                display: DisplayMode::Unknown,
                probe_attempts: 0,
                failed: false,
            })),
        }
    }

    /// Consistent copy of all axes
    pub fn snapshot(&self) -> LifecycleState {
        self.inner.lock(|cell| cell.get())
    }

    /// Mutate the state
    ///
    /// Only called with the Device Context lock held. Changes are
    /// discarded when `f` fails.
    pub(crate) fn commit<R>(&self, f: impl FnOnce(&mut LifecycleState) -> Result<R>) -> Result<R> {
        self.inner.lock(|cell| {
            let mut state = cell.get();
            let result = f(&mut state)?;
            cell.set(state);
            Ok(result)
        })
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_discards_on_error() {
        let cell = StateCell::new();
        let result = cell.commit(|state| {
            state.probe_attempts = 5;
            state.apply_power(PowerPhase::Sleep)
        });
        assert_eq!(result, Err(Error::InvalidState));
        assert_eq!(cell.snapshot(), LifecycleState::default());
    }

    #[test]
    fn test_commit_applies_axes() {
        let cell = StateCell::new();
        cell.commit(|state| {
            state.apply_core(CoreInput::Attach)?;
            state.apply_power(PowerPhase::On)?;
            state.apply_display(DisplayMode::U3);
            Ok(())
        })
        .unwrap();

        let state = cell.snapshot();
        assert_eq!(state.core, CorePhase::EarlyProbe);
        assert_eq!(state.power, PowerPhase::On);
        assert_eq!(state.display, DisplayMode::U3);
    }
}
