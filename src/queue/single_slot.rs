//! Queue that keeps only the most recent pending call.

use crate::call::BoxedCall;
use crate::queue::parker::Parker;
use crate::queue::CallbackQueue;
use crate::tracing_compat::trace;
use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;

/// Holds at most one pending call. Enqueueing while a call is still waiting
/// replaces it; the replaced call is dropped and its future reports
/// [`ErrorKind::Abandoned`](crate::ErrorKind::Abandoned).
#[derive(Default)]
pub struct SingleSlotQueue {
    slot: Mutex<Option<BoxedCall>>,
    parker: Parker,
}

impl SingleSlotQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            parker: Parker::new(),
        }
    }
}

impl CallbackQueue for SingleSlotQueue {
    fn enqueue(&self, call: BoxedCall) {
        let replaced = self.slot.lock().replace(call);
        self.parker.unpark();
        if replaced.is_some() {
            trace!("single-slot queue replaced an unconsumed call");
        }
        // `replaced` drops here, outside the slot lock.
    }

    fn try_dequeue(&self) -> Option<BoxedCall> {
        self.slot.lock().take()
    }

    fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }

    fn len(&self) -> usize {
        usize::from(self.slot.lock().is_some())
    }

    fn wait_for_work(&self, timeout: Duration) {
        if self.is_empty() {
            self.parker.park_timeout(timeout);
        }
    }

    fn notify(&self) {
        self.parker.unpark();
    }
}

impl fmt::Debug for SingleSlotQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleSlotQueue")
            .field("occupied", &!self.is_empty())
            .finish()
    }
}
