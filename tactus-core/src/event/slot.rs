//! Single-slot store for the atomic channel

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use super::Notification;

/// Last unconsumed atomic notification
///
/// Storing never blocks and never queues: a newer notification replaces
/// an older one that has not been taken yet.
pub struct AtomicSlot {
    last: Mutex<CriticalSectionRawMutex, Cell<Option<Notification>>>,
}

impl AtomicSlot {
    pub const fn new() -> Self {
        Self {
            last: Mutex::new(Cell::new(None)),
        }
    }

    /// Store `note`, returning the notification it overwrote
    pub fn store(&self, note: Notification) -> Option<Notification> {
        self.last.lock(|cell| cell.replace(Some(note)))
    }

    /// Take the stored notification
    pub fn take(&self) -> Option<Notification> {
        self.last.lock(|cell| cell.take())
    }

    /// Drop any stored notification
    pub fn clear(&self) {
        self.take();
    }
}

impl Default for AtomicSlot {
    fn default() -> Self {
        Self::new()
    }
}
