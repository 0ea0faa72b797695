//! Parking for an idle queue consumer.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;

/// Sticky wake-up flag: an `unpark` that happens before `park_timeout`
/// makes the next park return immediately.
#[derive(Debug, Clone)]
pub(crate) struct Parker {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Parker {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(false), Condvar::new())),
        }
    }

    /// Parks the current thread until notified or `duration` elapses.
    pub(crate) fn park_timeout(&self, duration: Duration) {
        let (lock, cvar) = &*self.inner;
        let mut notified = lock.lock();
        if !*notified {
            let _ = cvar.wait_for(&mut notified, duration);
        }
        *notified = false;
    }

    /// Wakes a parked consumer.
    pub(crate) fn unpark(&self) {
        let (lock, cvar) = &*self.inner;
        {
            let mut notified = lock.lock();
            *notified = true;
        }
        cvar.notify_one();
    }
}

impl Default for Parker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn unpark_before_park_returns_immediately() {
        let parker = Parker::new();
        parker.unpark();
        let start = Instant::now();
        parker.park_timeout(Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn park_times_out_without_notification() {
        let parker = Parker::new();
        let start = Instant::now();
        parker.park_timeout(Duration::from_millis(20));
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn unpark_from_other_thread_wakes() {
        let parker = Parker::new();
        let remote = parker.clone();
        let waker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            remote.unpark();
        });
        let start = Instant::now();
        parker.park_timeout(Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(1));
        waker.join().expect("waker thread");
    }
}
