use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Stop flag with interruptible waits.
///
/// Waiting threads wake up as soon as the signal is triggered instead of
/// sleeping out the rest of their interval.
pub struct ShutdownSignal {
    shutdown: AtomicBool,
    condvar: Condvar,
    mutex: Mutex<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self {
            shutdown: AtomicBool::new(false),
            condvar: Condvar::new(),
            mutex: Mutex::new(()),
        }
    }

    /// Set the flag and wake every waiter.
    pub fn trigger(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // Take the lock so a waiter between its check and its wait sees the notify
        let _guard = self.mutex.lock();
        self.condvar.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Wait for `duration` or until triggered. Returns `true` if triggered.
    pub fn wait(&self, duration: Duration) -> bool {
        if self.is_shutdown() {
            return true;
        }

        let Ok(guard) = self.mutex.lock() else {
            // Poisoned: treat as shutdown
            return true;
        };
        match self
            .condvar
            .wait_timeout_while(guard, duration, |_| !self.is_shutdown())
        {
            Ok((_, timeout)) => !timeout.timed_out(),
            Err(_) => true,
        }
    }

    /// Wait until `deadline` or until triggered. Returns `true` if triggered.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return self.is_shutdown();
        }
        self.wait(remaining)
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_trigger_is_sticky() {
        let signal = ShutdownSignal::default();
        assert!(!signal.is_shutdown());
        signal.trigger();
        signal.trigger();
        assert!(signal.is_shutdown());
        assert!(signal.wait(Duration::from_secs(10)));
    }

    #[test]
    fn test_wait_until_sleeps_to_deadline() {
        let signal = ShutdownSignal::new();
        let deadline = Instant::now() + Duration::from_millis(40);
        assert!(!signal.wait_until(deadline));
        assert!(Instant::now() >= deadline);
    }

    #[test]
    fn test_trigger_wakes_all_waiters() {
        let signal = Arc::new(ShutdownSignal::new());
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let signal = Arc::clone(&signal);
                thread::spawn(move || {
                    let start = Instant::now();
                    let woken = signal.wait_until(Instant::now() + Duration::from_secs(30));
                    (woken, start.elapsed())
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(30));
        signal.trigger();

        for waiter in waiters {
            let (woken, elapsed) = waiter.join().unwrap();
            assert!(woken);
            assert!(elapsed < Duration::from_secs(5));
        }
    }

    #[test]
    fn test_past_deadline_does_not_block() {
        let signal = ShutdownSignal::new();
        let start = Instant::now();
        assert!(!signal.wait_until(start - Duration::from_millis(1)));
        assert!(start.elapsed() < Duration::from_millis(500));
    }
}
