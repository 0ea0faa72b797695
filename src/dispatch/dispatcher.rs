//! Policy resolution and the per-target executor cache.

use crate::callable::CallableRef;
use crate::dispatch::executor::Executor;
use crate::dispatch::policy::InvokePolicy;
use crate::dispatch::Dispatch;
use crate::error::Result;
use crate::runtime::config::DispatchConfig;
use crate::runtime::event_system::EventSystem;
use crate::tracing_compat::{debug, trace};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::thread::ThreadId;

/// Routes calls to the thread they should run on.
///
/// For every target identity the dispatcher resolves an [`Executor`] once and
/// caches it: a queued executor if the target is a registered worker of the
/// dispatcher's [`EventSystem`], the immediate executor otherwise. Cached
/// entries are never revalidated; a queued executor whose worker has since
/// gone falls back per [`ExpiredTargetPolicy`](crate::runtime::ExpiredTargetPolicy).
///
/// # Example
///
/// ```no_run
/// use threadaffine::callable::callable;
/// use threadaffine::dispatch::{Dispatcher, InvokePolicy};
/// use threadaffine::runtime::{EventSystem, WorkerThread};
///
/// # fn main() -> threadaffine::Result<()> {
/// let system = EventSystem::init()?;
/// let worker = WorkerThread::create_registered(&system)?;
/// let dispatcher = Dispatcher::with_event_system(&system);
///
/// let whoami = callable(|()| std::thread::current().id());
/// let target = worker.thread_id().expect("started");
/// let ran_on = dispatcher.call(&whoami, (), InvokePolicy::BlockQueued, target)?;
/// assert_eq!(ran_on, target);
/// system.release();
/// # Ok(())
/// # }
/// ```
pub struct Dispatcher {
    system: Option<EventSystem>,
    config: DispatchConfig,
    executors: Mutex<HashMap<ThreadId, Executor>>,
}

impl Dispatcher {
    /// Dispatcher without a registry: every call runs on the calling thread
    /// (or a fresh one for `Async`).
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DispatchConfig::default())
    }

    /// Registry-less dispatcher with explicit configuration.
    #[must_use]
    pub fn with_config(mut config: DispatchConfig) -> Self {
        config.normalize();
        Self {
            system: None,
            config,
            executors: Mutex::new(HashMap::new()),
        }
    }

    /// Dispatcher that routes calls to the workers registered in `system`,
    /// using the system's configuration.
    #[must_use]
    pub fn with_event_system(system: &EventSystem) -> Self {
        Self {
            system: Some(system.clone()),
            config: system.config().clone(),
            executors: Mutex::new(HashMap::new()),
        }
    }

    /// Executes `target(args)` for the thread `thread` under `policy`.
    ///
    /// `Auto` becomes `Direct` when the caller is `thread` and `Queued`
    /// otherwise. `Queued` returns [`Dispatch::Pending`] without waiting;
    /// every other policy returns [`Dispatch::Ready`] once the call finished.
    ///
    /// # Errors
    ///
    /// The call's own failure for blocking policies,
    /// [`ErrorKind::NotInitialized`](crate::ErrorKind::NotInitialized) if the
    /// dispatcher's event system was released before the target was first
    /// resolved, and the executor errors described on [`Executor::execute`].
    pub fn execute<A, R>(
        &self,
        target: &CallableRef<A, R>,
        args: A,
        policy: InvokePolicy,
        thread: ThreadId,
    ) -> Result<Dispatch<R>>
    where
        A: Send + 'static,
        R: Send + 'static,
    {
        let effective = policy.resolve_for_current(thread);
        let executor = self.executor_for(thread)?;
        trace!(requested = %policy, effective = %effective, target = ?thread, "dispatching call");
        executor.execute(target, args, effective, &self.config)
    }

    /// [`execute`](Self::execute), then waits for the outcome whatever the
    /// policy.
    pub fn call<A, R>(
        &self,
        target: &CallableRef<A, R>,
        args: A,
        policy: InvokePolicy,
        thread: ThreadId,
    ) -> Result<R>
    where
        A: Send + 'static,
        R: Send + 'static,
    {
        self.execute(target, args, policy, thread)?.wait()
    }

    /// Fire-and-forget: queues `target(args)` for `thread` and discards the
    /// outcome.
    ///
    /// Unlike [`execute`](Self::execute) with `Queued`, the queued call keeps
    /// the callable alive until it ran.
    pub fn post<A, R>(&self, target: &CallableRef<A, R>, args: A, thread: ThreadId) -> Result<()>
    where
        A: Send + 'static,
        R: Send + 'static,
    {
        let executor = self.executor_for(thread)?;
        trace!(target = ?thread, "posting call");
        executor.post(target, args, &self.config)
    }

    /// Returns the executor for `thread`, resolving and caching it on first
    /// use.
    pub fn executor_for(&self, thread: ThreadId) -> Result<Executor> {
        if let Some(executor) = self.executors.lock().get(&thread) {
            return Ok(executor.clone());
        }

        // Resolve without holding the cache lock; the registry has its own.
        let resolved = self.resolve_executor(thread)?;
        let mut executors = self.executors.lock();
        Ok(executors.entry(thread).or_insert(resolved).clone())
    }

    fn resolve_executor(&self, thread: ThreadId) -> Result<Executor> {
        let Some(system) = self.system.as_ref().filter(|_| self.config.cross_thread) else {
            return Ok(Executor::Immediate);
        };
        if !system.contains_registered_thread(thread)? {
            debug!(target = ?thread, "target not registered, using immediate executor");
            return Ok(Executor::Immediate);
        }
        let worker = system.get_registered_thread(thread)?;
        debug!(target = ?thread, worker = %worker.name(), "bound queued executor");
        Ok(Executor::for_queue(&worker.callback_queue(), Some(thread)))
    }

    /// Number of cached target executors.
    #[must_use]
    pub fn cached_targets(&self) -> usize {
        self.executors.lock().len()
    }

    /// Drops every cached executor so targets are resolved again.
    pub fn clear_cache(&self) {
        self.executors.lock().clear();
    }

    /// The configuration calls run with.
    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("event_system", &self.system.is_some())
            .field("cached_targets", &self.cached_targets())
            .finish()
    }
}
