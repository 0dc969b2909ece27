//! Fixed-cadence tick source.
//!
//! Fire times are `anchor + n * interval` on the monotonic clock, so a slow
//! cycle never shifts later ticks. Fire times that have already passed when
//! the next tick is computed are skipped rather than replayed.

mod shutdown;

pub use shutdown::ShutdownSignal;

use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use tracing::debug;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Position of this fire time in the schedule (0 = anchor)
    pub index: u64,
    /// When the tick was due, not when it actually ran
    pub scheduled: Instant,
}

#[derive(Debug)]
pub struct Scheduler {
    interval: Duration,
    anchor: Instant,
    next_index: u64,
}

impl Scheduler {
    pub fn new(interval: Duration, anchor: Instant) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            anchor,
            next_index: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn fire_time(&self, index: u64) -> Instant {
        let nanos = self.interval.as_nanos().saturating_mul(index as u128);
        self.anchor + Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// The next tick to wait for as seen at `now`.
    ///
    /// Returns the first unfired index whose fire time is not in the past.
    /// The anchor tick itself always fires.
    pub fn next_tick(&mut self, now: Instant) -> Tick {
        let due = if self.next_index == 0 {
            0
        } else {
            let elapsed = now.saturating_duration_since(self.anchor).as_nanos();
            u64::try_from(elapsed.div_ceil(self.interval.as_nanos())).unwrap_or(u64::MAX)
        };

        let index = self.next_index.max(due);
        if index > self.next_index {
            debug!(
                "Skipping {} missed tick(s) ({} -> {})",
                index - self.next_index,
                self.next_index,
                index
            );
        }
        self.next_index = index + 1;

        Tick {
            index,
            scheduled: self.fire_time(index),
        }
    }

    /// Drive `cycle` on every tick until it breaks or `shutdown` triggers.
    ///
    /// The shutdown flag is checked at each interval boundary; a running
    /// cycle always completes.
    pub fn run<F>(&mut self, shutdown: &ShutdownSignal, mut cycle: F)
    where
        F: FnMut(Tick) -> ControlFlow<()>,
    {
        loop {
            let tick = self.next_tick(Instant::now());
            if shutdown.wait_until(tick.scheduled) || shutdown.is_shutdown() {
                debug!("Scheduler stopped before tick {}", tick.index);
                return;
            }
            if cycle(tick).is_break() {
                debug!("Scheduler stopped by cycle at tick {}", tick.index);
                return;
            }
        }
    }
}
