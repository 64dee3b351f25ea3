//! Bounded polling

use core::future::Future;

use embedded_hal_async::delay::DelayNs;

use crate::error::{Error, Result};

/// Attempts and spacing for a bounded poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollBudget {
    attempts: u32,
    interval_ms: u32,
}

impl PollBudget {
    /// Budget covering `timeout_ms` at a fixed `interval_ms`
    ///
    /// Always allows at least one attempt.
    pub fn new(timeout_ms: u32, interval_ms: u32) -> Self {
        let interval_ms = interval_ms.max(1);
        Self {
            attempts: timeout_ms / interval_ms + 1,
            interval_ms,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }
}

/// Run `attempt` until it reports done, sleeping between tries
///
/// Errors from `attempt` end the poll at once. Running out of attempts
/// fails with `TimedOut`.
pub async fn poll_until<D, F, Fut>(budget: PollBudget, delay: &mut D, mut attempt: F) -> Result<()>
where
    D: DelayNs,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    for tried in 1..=budget.attempts {
        if attempt().await? {
            return Ok(());
        }
        if tried < budget.attempts {
            delay.delay_ms(budget.interval_ms).await;
        }
    }
    debug!("poll gave up after {} attempts", budget.attempts);
    Err(Error::TimedOut)
}
