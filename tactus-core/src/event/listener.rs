//! Blocking listener chain

use heapless::Vec;

use super::Notification;
use crate::error::{Error, Result};

/// Most listeners one device accepts
pub const MAX_LISTENERS: usize = 8;

/// Listener decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Verdict {
    /// Let the next listener see the event
    Continue,
    /// Suppress the remaining listeners
    Stop,
}

/// Receiver on the blocking channel
///
/// Runs with the Device Context lock held; must not call back into the
/// device.
pub trait Listener: Sync {
    fn on_event(&self, note: &Notification) -> Verdict;
}

/// Listeners in registration order
pub struct ListenerChain<'a> {
    listeners: Vec<&'a dyn Listener, MAX_LISTENERS>,
}

impl<'a> ListenerChain<'a> {
    pub const fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Append a listener
    pub fn register(&mut self, listener: &'a dyn Listener) -> Result<()> {
        self.listeners.push(listener).map_err(|_| {
            warn!("listener chain full");
            Error::AllocationFailure
        })
    }

    /// Run the chain until a listener stops it
    pub fn deliver(&self, note: &Notification) -> Verdict {
        for listener in &self.listeners {
            if listener.on_event(note) == Verdict::Stop {
                return Verdict::Stop;
            }
        }
        Verdict::Continue
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl Default for ListenerChain<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventId;
    use crate::test_support::RecordingListener;

    #[test]
    fn test_registration_order_and_stop() {
        let first = RecordingListener::new(Verdict::Continue);
        let second = RecordingListener::new(Verdict::Stop);
        let third = RecordingListener::new(Verdict::Continue);

        let mut chain = ListenerChain::new();
        chain.register(&first).unwrap();
        chain.register(&second).unwrap();
        chain.register(&third).unwrap();

        let note = Notification::new(EventId::DebugTool, 3);
        assert_eq!(chain.deliver(&note), Verdict::Stop);
        assert_eq!(first.seen(), vec![note]);
        assert_eq!(second.seen(), vec![note]);
        assert!(third.seen().is_empty());
    }

    #[test]
    fn test_capacity() {
        let listener = RecordingListener::new(Verdict::Continue);
        let mut chain = ListenerChain::new();
        for _ in 0..MAX_LISTENERS {
            chain.register(&listener).unwrap();
        }
        assert_eq!(chain.register(&listener), Err(Error::AllocationFailure));
        assert_eq!(chain.len(), MAX_LISTENERS);
    }
}
