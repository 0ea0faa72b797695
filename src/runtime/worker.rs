//! Owned background threads that drain a callback queue.
//!
//! A [`WorkerThread`] owns one [`CallbackQueue`] and, once started, one OS
//! thread that performs the queued calls in order until it is stopped. The
//! identity callers route on is the [`ThreadId`] of that OS thread.
//!
//! ```text
//!  Idle ──start()──▶ Running ──stop()/drop──▶ Stopped
//!                       ▲                        │
//!                       └────────start()─────────┘
//! ```
//!
//! Stopping joins the OS thread but leaves the queue and its pending calls
//! alone; restarting drains them on a new thread with a new identity.

use crate::error::{Error, ErrorKind, Result};
use crate::queue::{CallbackQueue, FifoQueue, QueueHandle};
use crate::runtime::config::{DispatchConfig, ThreadHook};
use crate::runtime::event_system::{EventSystem, WeakEventSystem};
use crate::tracing_compat::{debug, trace, warn};
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

/// Shared handle to a worker thread, as stored in the registry.
pub type WorkerHandle = Arc<WorkerThread>;

static WORKER_SEQ: AtomicUsize = AtomicUsize::new(0);

struct WorkerState {
    join: Option<JoinHandle<()>>,
    thread_id: Option<ThreadId>,
    // Replaced on every start so a detached loop from an earlier run can
    // never observe a later run's flag.
    running: Arc<AtomicBool>,
    registry: Option<WeakEventSystem>,
}

/// A background thread draining its own callback queue.
pub struct WorkerThread {
    name: String,
    queue: QueueHandle,
    stack_size: usize,
    idle_park: Duration,
    on_thread_start: Option<ThreadHook>,
    on_thread_stop: Option<ThreadHook>,
    state: ReentrantMutex<RefCell<WorkerState>>,
}

impl WorkerThread {
    /// Creates an idle worker named `{thread_name_prefix}-{n}`.
    #[must_use]
    pub fn new(config: &DispatchConfig) -> Self {
        let seq = WORKER_SEQ.fetch_add(1, Ordering::Relaxed);
        Self::named(format!("{}-{seq}", config.thread_name_prefix), config)
    }

    /// Creates an idle worker with an explicit thread name.
    #[must_use]
    pub fn named(name: impl Into<String>, config: &DispatchConfig) -> Self {
        Self::with_queue(name, Arc::new(FifoQueue::new()), config)
    }

    /// Creates an idle worker draining a caller-supplied queue.
    #[must_use]
    pub fn with_queue(name: impl Into<String>, queue: QueueHandle, config: &DispatchConfig) -> Self {
        let mut config = config.clone();
        config.normalize();
        Self {
            name: name.into(),
            queue,
            stack_size: config.thread_stack_size,
            idle_park: config.idle_park,
            on_thread_start: config.on_thread_start,
            on_thread_stop: config.on_thread_stop,
            state: ReentrantMutex::new(RefCell::new(WorkerState {
                join: None,
                thread_id: None,
                running: Arc::new(AtomicBool::new(false)),
                registry: None,
            })),
        }
    }

    /// Starts a worker with the event system's configuration and registers it.
    pub fn create_registered(system: &EventSystem) -> Result<WorkerHandle> {
        if !system.is_initialized() {
            return Err(ErrorKind::NotInitialized.into());
        }
        let worker = Arc::new(Self::new(system.config()));
        worker.start()?;
        system.register_thread(&worker)?;
        Ok(worker)
    }

    /// Looks up a registered worker by identity.
    ///
    /// Returns `Ok(None)` when nothing is registered under `id`.
    pub fn find_registered(system: &EventSystem, id: ThreadId) -> Result<Option<WorkerHandle>> {
        if system.contains_registered_thread(id)? {
            system.get_registered_thread(id).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Spawns the drain loop. Does nothing if the worker is already running.
    ///
    /// A registered worker that is restarted moves to its new identity in
    /// the registry.
    pub fn start(&self) -> Result<()> {
        let guard = self.state.lock();
        if guard.borrow().running.load(Ordering::Acquire) {
            return Ok(());
        }

        let running = Arc::new(AtomicBool::new(true));
        let loop_running = Arc::clone(&running);
        let queue = Arc::clone(&self.queue);
        let idle_park = self.idle_park;
        let on_start = self.on_thread_start.clone();
        let on_stop = self.on_thread_stop.clone();

        let handle = thread::Builder::new()
            .name(self.name.clone())
            .stack_size(self.stack_size)
            .spawn(move || {
                if let Some(ref callback) = on_start {
                    callback();
                }

                drain_loop(queue.as_ref(), &loop_running, idle_park);

                if let Some(ref callback) = on_stop {
                    callback();
                }
            })
            .map_err(Error::spawn_failed)?;

        let id = handle.thread().id();
        let mut state = guard.borrow_mut();
        state.running = running;
        state.thread_id = Some(id);
        state.join = Some(handle);
        let registry = state.registry.clone();
        drop(state);
        drop(guard);

        debug!(worker = %self.name, thread_id = ?id, "worker thread started");
        if let Some(system) = registry.and_then(|weak| weak.upgrade()) {
            if let Ok(true) = system.rekey_thread(self, id) {
                debug!(worker = %self.name, thread_id = ?id, "registration moved to new identity");
            }
        }
        Ok(())
    }

    pub(crate) fn bind_registry(&self, system: WeakEventSystem) {
        self.state.lock().borrow_mut().registry = Some(system);
    }

    /// Stops the drain loop and joins the OS thread. Idempotent.
    ///
    /// Called from the worker's own thread, the loop is told to exit after
    /// the current call and the thread is detached instead of joined.
    ///
    /// A registered worker keeps its entry under the old identity until it is
    /// started again.
    pub fn stop(&self) {
        let handle = {
            let guard = self.state.lock();
            let mut state = guard.borrow_mut();
            state.running.store(false, Ordering::Release);
            state.thread_id = None;
            state.join.take()
        };
        self.queue.notify();

        let Some(handle) = handle else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            debug!(worker = %self.name, "worker stopped from its own thread, detaching");
            return;
        }
        if handle.join().is_err() {
            warn!(worker = %self.name, "worker thread panicked outside a call");
        }
        debug!(worker = %self.name, "worker thread stopped");
    }

    /// Identity of the running OS thread, `None` when not started or stopped.
    #[must_use]
    pub fn thread_id(&self) -> Option<ThreadId> {
        self.state.lock().borrow().thread_id
    }

    /// Returns true while the drain loop is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.lock().borrow().running.load(Ordering::Acquire)
    }

    /// Shared handle to this worker's queue.
    #[must_use]
    pub fn callback_queue(&self) -> QueueHandle {
        Arc::clone(&self.queue)
    }

    /// Thread name given to the OS thread.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn drain_loop(queue: &dyn CallbackQueue, running: &AtomicBool, idle_park: Duration) {
    while running.load(Ordering::Acquire) {
        match queue.try_dequeue() {
            Some(mut call) => {
                trace!("worker performing queued call");
                call.perform();
            }
            None => queue.wait_for_work(idle_park),
        }
    }
}

impl Default for WorkerThread {
    fn default() -> Self {
        Self::new(&DispatchConfig::default())
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for WorkerThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerThread")
            .field("name", &self.name)
            .field("thread_id", &self.thread_id())
            .field("running", &self.is_running())
            .field("pending", &self.queue.len())
            .finish()
    }
}
