//! Unbounded multi-producer FIFO of deferred calls.

use crate::call::BoxedCall;
use crate::queue::parker::Parker;
use crate::queue::CallbackQueue;
use crossbeam_queue::SegQueue;
use std::fmt;
use std::time::Duration;

/// Thread-safe FIFO drained by one worker.
///
/// Calls pushed by one producer come out in submission order; calls from
/// different producers interleave in no particular order.
#[derive(Default)]
pub struct FifoQueue {
    inner: SegQueue<BoxedCall>,
    parker: Parker,
}

impl FifoQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: SegQueue::new(),
            parker: Parker::new(),
        }
    }
}

impl CallbackQueue for FifoQueue {
    fn enqueue(&self, call: BoxedCall) {
        self.inner.push(call);
        self.parker.unpark();
    }

    fn try_dequeue(&self) -> Option<BoxedCall> {
        self.inner.pop()
    }

    fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn wait_for_work(&self, timeout: Duration) {
        if self.inner.is_empty() {
            self.parker.park_timeout(timeout);
        }
    }

    fn notify(&self) {
        self.parker.unpark();
    }
}

impl fmt::Debug for FifoQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FifoQueue")
            .field("len", &self.inner.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::{CallFuture, DeferredCall};
    use crate::callable::{callable, CallableRef};
    use crate::test_utils::init_test;
    use std::sync::{Arc, Barrier, Mutex};
    use std::thread;
    use std::time::Instant;

    fn push_value(
        queue: &FifoQueue,
        target: &CallableRef<u32, u32>,
        value: u32,
    ) -> CallFuture<u32> {
        let call = DeferredCall::new(target, value);
        let future = call.future();
        queue.enqueue(Box::new(call));
        future
    }

    #[test]
    fn dequeue_in_submission_order() {
        init_test("dequeue_in_submission_order");
        let queue = FifoQueue::new();
        let identity = callable(|x: u32| x);
        let futures: Vec<_> = (0..10).map(|i| push_value(&queue, &identity, i)).collect();
        assert_eq!(queue.len(), 10);

        while let Some(mut call) = queue.try_dequeue() {
            call.perform();
        }
        assert!(queue.is_empty());

        let values: Vec<u32> = futures.into_iter().map(|f| f.wait().unwrap()).collect();
        crate::assert_with_log!(
            values == (0..10).collect::<Vec<_>>(),
            "fifo order",
            (0..10).collect::<Vec<u32>>(),
            values
        );
        crate::test_complete!("dequeue_in_submission_order");
    }

    #[test]
    fn empty_queue_dequeues_none() {
        init_test("empty_queue_dequeues_none");
        let queue = FifoQueue::default();
        assert!(queue.is_empty());
        assert!(queue.try_dequeue().is_none());
        crate::test_complete!("empty_queue_dequeues_none");
    }

    #[test]
    fn order_preserved_per_producer() {
        init_test("order_preserved_per_producer");
        let queue = Arc::new(FifoQueue::new());
        let producers = 4;
        let per_producer = 200;
        let barrier = Arc::new(Barrier::new(producers));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..producers)
            .map(|p| {
                let q = Arc::clone(&queue);
                let b = Arc::clone(&barrier);
                let s = Arc::clone(&seen);
                thread::spawn(move || {
                    let record = callable(move |i: usize| s.lock().unwrap().push((p, i)));
                    b.wait();
                    for i in 0..per_producer {
                        q.enqueue(Box::new(DeferredCall::owned(record.clone(), i)));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("producer should complete");
        }

        while let Some(mut call) = queue.try_dequeue() {
            call.perform();
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), producers * per_producer);
        for p in 0..producers {
            let order: Vec<usize> = seen.iter().filter(|(q, _)| *q == p).map(|(_, i)| *i).collect();
            assert_eq!(order, (0..per_producer).collect::<Vec<_>>(), "producer {p}");
        }
        crate::test_complete!("order_preserved_per_producer");
    }

    #[test]
    fn enqueue_wakes_waiting_consumer() {
        init_test("enqueue_wakes_waiting_consumer");
        let queue = Arc::new(FifoQueue::new());
        let producer = Arc::clone(&queue);
        let target = callable(|x: u32| x);
        let pusher = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            producer.enqueue(Box::new(DeferredCall::owned(target, 1)));
        });
        let start = Instant::now();
        while queue.is_empty() && start.elapsed() < Duration::from_secs(5) {
            queue.wait_for_work(Duration::from_secs(5));
        }
        assert!(!queue.is_empty());
        assert!(start.elapsed() < Duration::from_secs(2));
        pusher.join().expect("pusher thread");
        crate::test_complete!("enqueue_wakes_waiting_consumer");
    }

    #[test]
    fn dropped_queue_abandons_pending_calls() {
        init_test("dropped_queue_abandons_pending_calls");
        let queue = FifoQueue::new();
        let identity = callable(|x: u32| x);
        let future = push_value(&queue, &identity, 3);
        drop(queue);
        assert_eq!(
            future.wait().unwrap_err().kind(),
            crate::ErrorKind::Abandoned
        );
        crate::test_complete!("dropped_queue_abandons_pending_calls");
    }
}
