//! Callback queues: where deferred calls wait for their owning thread.
//!
//! | Queue | Capacity | On enqueue while occupied |
//! |-------|----------|---------------------------|
//! | [`FifoQueue`] | unbounded | appended to the tail |
//! | [`SingleSlotQueue`] | one call | replaces the waiting call |
//!
//! Both are safe for any number of producers and are drained by a single
//! consumer, normally a [`WorkerThread`](crate::runtime::WorkerThread).

use crate::call::BoxedCall;
use std::sync::{Arc, Weak};
use std::time::Duration;

pub mod fifo;
pub(crate) mod parker;
pub mod single_slot;

pub use fifo::FifoQueue;
pub use single_slot::SingleSlotQueue;

/// Thread-safe queue of deferred calls.
pub trait CallbackQueue: Send + Sync {
    /// Adds a call. Never blocks, never fails.
    fn enqueue(&self, call: BoxedCall);

    /// Removes the next call, or returns `None` without blocking.
    fn try_dequeue(&self) -> Option<BoxedCall>;

    /// Snapshot emptiness check.
    fn is_empty(&self) -> bool;

    /// Snapshot count of pending calls.
    fn len(&self) -> usize;

    /// Blocks the consumer for at most `timeout` while the queue is empty.
    ///
    /// Returns early once a call is enqueued. The default yields instead of
    /// parking.
    fn wait_for_work(&self, timeout: Duration) {
        let _ = timeout;
        if self.is_empty() {
            std::thread::yield_now();
        }
    }

    /// Wakes a consumer blocked in [`wait_for_work`](Self::wait_for_work)
    /// without adding a call.
    fn notify(&self) {}
}

/// Shared handle to a callback queue.
pub type QueueHandle = Arc<dyn CallbackQueue>;

/// Non-owning handle to a callback queue.
pub type WeakQueueHandle = Weak<dyn CallbackQueue>;
