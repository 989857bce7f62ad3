//! Bounded Polling
//!
//! Every "wait until the device says so" loop runs through [`PollPolicy`].
//! The default policy never gives up, which matches how the hardware is
//! normally driven; a bounded policy turns a dead device into a
//! [`BringupError::Timeout`] instead of a hang.

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{BringupError, Result};

/// Retry bound and pacing for device polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    /// Give up after this many attempts (`None` = block until satisfied)
    pub max_attempts: Option<u32>,
    /// Delay between attempts, in milliseconds
    pub interval_ms: u64,
}

impl PollPolicy {
    /// Poll forever without delay.
    pub const fn unbounded() -> Self {
        PollPolicy {
            max_attempts: None,
            interval_ms: 0,
        }
    }

    /// Poll at most `attempts` times, sleeping `interval` between attempts.
    pub fn bounded(attempts: u32, interval: Duration) -> Self {
        PollPolicy {
            max_attempts: Some(attempts.max(1)),
            interval_ms: interval.as_millis() as u64,
        }
    }

    /// Delay between attempts
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Run `attempt` until it yields a value.
    ///
    /// `attempt` returns `Ok(None)` to ask for another round. Errors from the
    /// attempt end the poll immediately.
    pub fn run<R, F>(&self, operation: &'static str, mut attempt: F) -> Result<R>
    where
        F: FnMut() -> Result<Option<R>>,
    {
        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);
            if let Some(value) = attempt()? {
                return Ok(value);
            }

            if let Some(max) = self.max_attempts {
                if attempts >= max {
                    log::error!("{operation}: giving up after {attempts} attempts");
                    return Err(BringupError::Timeout {
                        operation,
                        attempts,
                    });
                }
            }

            if self.interval_ms > 0 {
                thread::sleep(self.interval());
            }
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::unbounded()
    }
}
