//! [`Delay`] implementations for hosts and tests.

use std::{thread, time::Duration};

use radiolink_core::Delay;

/// Sleeps the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl Delay for StdDelay {
    #[inline]
    fn delay(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Records requested delays without sleeping.
#[derive(Debug, Default, Clone)]
pub struct ManualDelay {
    elapsed: Duration,
    calls: u64,
}

impl ManualDelay {
    /// Simulated time spent in delays so far.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Number of delay calls so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl Delay for ManualDelay {
    fn delay(&mut self, duration: Duration) {
        self.elapsed += duration;
        self.calls += 1;
    }
}
