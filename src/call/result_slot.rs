//! Write-once result slot and the future a caller blocks on.
//!
//! ```text
//!   performing thread                       caller
//!        │                                    │
//!        │── set_value / set_error ──► slot ◄─┤ CallFuture::wait()
//!        │                             │      │   (condvar, no spinning)
//!        │                        notify_all ─►│
//! ```
//!
//! The slot moves through `Pending -> Value | Failed`, and `Value -> Retrieved`
//! once the value was moved out. A call dropped without ever running moves
//! the slot to `Abandoned` so blocked waiters wake up.

use crate::error::{Error, ErrorKind, Result};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

enum SlotState<T> {
    Pending,
    Value(T),
    Failed(Error),
    Retrieved,
    Abandoned,
}

impl<T> SlotState<T> {
    const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    const fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Value(_) => "value",
            Self::Failed(_) => "failed",
            Self::Retrieved => "retrieved",
            Self::Abandoned => "abandoned",
        }
    }

    /// Moves the value out, leaving `Retrieved` behind. Failures stay put so
    /// every reader observes them.
    fn take(&mut self) -> Result<T> {
        match std::mem::replace(self, Self::Retrieved) {
            Self::Value(value) => Ok(value),
            Self::Failed(err) => {
                let out = err.clone();
                *self = Self::Failed(err);
                Err(out)
            }
            Self::Pending => {
                *self = Self::Pending;
                Err(Error::new(ErrorKind::NotReady))
            }
            Self::Retrieved => Err(Error::new(ErrorKind::AlreadyRetrieved)),
            Self::Abandoned => {
                *self = Self::Abandoned;
                Err(Error::new(ErrorKind::Abandoned))
            }
        }
    }
}

impl<T: Clone> SlotState<T> {
    fn peek(&self) -> Result<T> {
        match self {
            Self::Value(value) => Ok(value.clone()),
            Self::Failed(err) => Err(err.clone()),
            Self::Pending => Err(Error::new(ErrorKind::NotReady)),
            Self::Retrieved => Err(Error::new(ErrorKind::AlreadyRetrieved)),
            Self::Abandoned => Err(Error::new(ErrorKind::Abandoned)),
        }
    }
}

struct SlotInner<T> {
    state: Mutex<SlotState<T>>,
    condvar: Condvar,
}

impl<T> SlotInner<T> {
    /// Stores `next` if nothing was written yet. Returns false otherwise.
    fn complete(&self, next: SlotState<T>) -> bool {
        let mut state = self.state.lock();
        if !state.is_pending() {
            return false;
        }
        *state = next;
        drop(state);
        self.condvar.notify_all();
        true
    }
}

/// Write-once storage for a call's outcome.
pub struct ResultSlot<T> {
    inner: Arc<SlotInner<T>>,
}

impl<T> ResultSlot<T> {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SlotInner {
                state: Mutex::new(SlotState::Pending),
                condvar: Condvar::new(),
            }),
        }
    }

    /// Returns a future observing this slot.
    #[must_use]
    pub fn future(&self) -> CallFuture<T> {
        CallFuture {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Stores a produced value. Returns false if the slot was already written.
    pub fn set_value(&self, value: T) -> bool {
        self.inner.complete(SlotState::Value(value))
    }

    /// Stores a captured failure. Returns false if the slot was already written.
    pub fn set_error(&self, err: Error) -> bool {
        self.inner.complete(SlotState::Failed(err))
    }

    /// Marks the slot as never going to be written.
    pub(crate) fn abandon(&self) -> bool {
        self.inner.complete(SlotState::Abandoned)
    }

    /// Returns true once a value or failure has been written.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        !self.inner.state.lock().is_pending()
    }

    /// Returns true if a value (not a failure) is stored and not yet moved out.
    #[must_use]
    pub fn has_value(&self) -> bool {
        matches!(*self.inner.state.lock(), SlotState::Value(_))
    }

    /// Moves the value out of the slot.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::NotReady`] before anything was written
    /// - the captured failure if the call failed
    /// - [`ErrorKind::AlreadyRetrieved`] if the value was already moved out
    pub fn retrieve(&self) -> Result<T> {
        self.inner.state.lock().take()
    }
}

impl<T: Clone> ResultSlot<T> {
    /// Returns a copy of the value, leaving it in place.
    ///
    /// # Errors
    ///
    /// Same conditions as [`ResultSlot::retrieve`].
    pub fn get(&self) -> Result<T> {
        self.inner.state.lock().peek()
    }
}

impl<T> Default for ResultSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ResultSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSlot")
            .field("state", &self.inner.state.lock().name())
            .finish()
    }
}

/// Handle a caller blocks on to observe a call's outcome.
///
/// Dropping the future does not affect the call; it still runs and writes its
/// result, which is then never read.
pub struct CallFuture<T> {
    inner: Arc<SlotInner<T>>,
}

impl<T> CallFuture<T> {
    /// Blocks until the call completes and returns its outcome.
    ///
    /// # Errors
    ///
    /// Returns the call's captured failure, or [`ErrorKind::Abandoned`] if the
    /// call was dropped without running.
    pub fn wait(self) -> Result<T> {
        let mut state = self.inner.state.lock();
        while state.is_pending() {
            self.inner.condvar.wait(&mut state);
        }
        state.take()
    }

    /// Returns true once the call completed (or was abandoned).
    #[must_use]
    pub fn is_ready(&self) -> bool {
        !self.inner.state.lock().is_pending()
    }
}

impl<T: Clone> CallFuture<T> {
    /// Blocks for at most `timeout`.
    ///
    /// Returns `None` if the call has not completed in time. The outcome is
    /// copied out, so later reads and [`wait`](Self::wait) see it too.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.state.lock();
        while state.is_pending() {
            if self
                .inner
                .condvar
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                if state.is_pending() {
                    return None;
                }
                break;
            }
        }
        Some(state.peek())
    }

    /// Returns a copy of the outcome if the call already completed, without
    /// blocking.
    #[must_use]
    pub fn try_get(&self) -> Option<Result<T>> {
        let state = self.inner.state.lock();
        if state.is_pending() {
            return None;
        }
        Some(state.peek())
    }
}

impl<T> fmt::Debug for CallFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallFuture")
            .field("state", &self.inner.state.lock().name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn init_test(name: &str) {
        crate::test_utils::init_test(name);
    }

    #[test]
    fn read_before_write_is_not_ready() {
        init_test("read_before_write_is_not_ready");
        let slot: ResultSlot<i32> = ResultSlot::new();
        assert!(!slot.is_ready());
        assert_eq!(slot.retrieve().unwrap_err().kind(), ErrorKind::NotReady);
        assert_eq!(slot.get().unwrap_err().kind(), ErrorKind::NotReady);
        // A failed premature read leaves the slot writable.
        assert!(slot.set_value(3));
        assert_eq!(slot.retrieve().unwrap(), 3);
        crate::test_complete!("read_before_write_is_not_ready");
    }

    #[test]
    fn write_happens_at_most_once() {
        init_test("write_happens_at_most_once");
        let slot = ResultSlot::new();
        assert!(slot.set_value(1));
        assert!(!slot.set_value(2));
        assert!(!slot.set_error(Error::user("late")));
        assert_eq!(slot.get().unwrap(), 1);
        crate::test_complete!("write_happens_at_most_once");
    }

    #[test]
    fn get_is_repeatable() {
        init_test("get_is_repeatable");
        let slot = ResultSlot::new();
        slot.set_value(String::from("done"));
        assert_eq!(slot.get().unwrap(), "done");
        assert_eq!(slot.get().unwrap(), "done");
        assert!(slot.has_value());
        crate::test_complete!("get_is_repeatable");
    }

    #[test]
    fn retrieve_moves_value_out() {
        init_test("retrieve_moves_value_out");
        let slot = ResultSlot::new();
        slot.set_value(vec![1, 2, 3]);
        assert_eq!(slot.retrieve().unwrap(), vec![1, 2, 3]);
        assert!(!slot.has_value());
        assert!(slot.is_ready());
        let err = slot.retrieve().unwrap_err();
        crate::assert_with_log!(
            err.kind() == ErrorKind::AlreadyRetrieved,
            "second retrieve",
            ErrorKind::AlreadyRetrieved,
            err.kind()
        );
        crate::test_complete!("retrieve_moves_value_out");
    }

    #[test]
    fn failure_is_reraised_on_every_read() {
        init_test("failure_is_reraised_on_every_read");
        let slot: ResultSlot<u8> = ResultSlot::new();
        slot.set_error(Error::user("broken"));
        for _ in 0..2 {
            let err = slot.retrieve().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::User);
            assert_eq!(err.message(), Some("broken"));
        }
        assert_eq!(slot.get().unwrap_err().kind(), ErrorKind::User);
        assert!(!slot.has_value());
        crate::test_complete!("failure_is_reraised_on_every_read");
    }

    #[test]
    fn future_wakes_on_cross_thread_write() {
        init_test("future_wakes_on_cross_thread_write");
        let slot = ResultSlot::new();
        let future = slot.future();
        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            slot.set_value(99_u64);
        });
        assert_eq!(future.wait().unwrap(), 99);
        writer.join().expect("writer thread");
        crate::test_complete!("future_wakes_on_cross_thread_write");
    }

    #[test]
    fn future_times_out_then_completes() {
        init_test("future_times_out_then_completes");
        let slot = ResultSlot::new();
        let future = slot.future();
        assert!(future.wait_timeout(Duration::from_millis(10)).is_none());
        assert!(future.try_get().is_none());
        slot.set_value(5);
        assert!(future.is_ready());
        assert_eq!(future.wait_timeout(Duration::from_millis(10)).unwrap().unwrap(), 5);
        crate::test_complete!("future_times_out_then_completes");
    }

    #[test]
    fn polling_reads_leave_outcome_for_wait() {
        init_test("polling_reads_leave_outcome_for_wait");
        let slot = ResultSlot::new();
        let future = slot.future();
        slot.set_value(5_u32);
        assert_eq!(future.try_get().unwrap().unwrap(), 5);
        assert_eq!(future.try_get().unwrap().unwrap(), 5);
        assert_eq!(
            future.wait_timeout(Duration::from_millis(10)).unwrap().unwrap(),
            5
        );
        assert_eq!(future.wait().unwrap(), 5);
        assert!(slot.is_ready());
        crate::test_complete!("polling_reads_leave_outcome_for_wait");
    }

    #[test]
    fn abandoned_slot_wakes_waiter() {
        init_test("abandoned_slot_wakes_waiter");
        let slot: ResultSlot<()> = ResultSlot::new();
        let future = slot.future();
        let dropper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            slot.abandon();
        });
        assert_eq!(future.wait().unwrap_err().kind(), ErrorKind::Abandoned);
        dropper.join().expect("dropper thread");
        crate::test_complete!("abandoned_slot_wakes_waiter");
    }

    #[test]
    fn abandon_after_write_is_ignored() {
        init_test("abandon_after_write_is_ignored");
        let slot = ResultSlot::new();
        slot.set_value(1);
        assert!(!slot.abandon());
        assert_eq!(slot.future().wait().unwrap(), 1);
        crate::test_complete!("abandon_after_write_is_ignored");
    }
}
