//! Execution strategies: run here, run on a fresh thread, or hand the call to
//! a target queue.

use crate::call::DeferredCall;
use crate::callable::CallableRef;
use crate::dispatch::policy::InvokePolicy;
use crate::dispatch::Dispatch;
use crate::error::{Error, ErrorKind, Result};
use crate::queue::{QueueHandle, WeakQueueHandle};
use crate::runtime::config::{DispatchConfig, ExpiredTargetPolicy};
use crate::runtime::worker::{WorkerHandle, WorkerThread};
use crate::tracing_compat::{debug, trace};
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// How calls for one target thread are executed.
///
/// An immediate executor treats `Queued` and `BlockQueued` as `Direct`, since
/// it has no queue to hand the call to. A queued executor holds only a weak
/// reference to its queue; once the owning worker is gone the configured
/// [`ExpiredTargetPolicy`] decides what happens.
#[derive(Clone, Default)]
pub enum Executor {
    /// Run on the calling thread.
    #[default]
    Immediate,
    /// Hand calls to a worker's queue.
    Queued {
        /// The target queue.
        queue: WeakQueueHandle,
        /// Thread draining the queue, if known.
        owner: Option<ThreadId>,
    },
}

impl Executor {
    /// Executor bound to a worker's queue.
    #[must_use]
    pub fn for_worker(worker: &WorkerThread) -> Self {
        Self::for_queue(&worker.callback_queue(), worker.thread_id())
    }

    /// Executor bound to an arbitrary queue, optionally drained by `owner`.
    #[must_use]
    pub fn for_queue(queue: &QueueHandle, owner: Option<ThreadId>) -> Self {
        Self::Queued {
            queue: Arc::downgrade(queue),
            owner,
        }
    }

    /// Returns true for the immediate executor.
    #[must_use]
    pub fn is_immediate(&self) -> bool {
        matches!(self, Self::Immediate)
    }

    /// Returns true if this executor's queue no longer exists.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        match self {
            Self::Immediate => false,
            Self::Queued { queue, .. } => queue.strong_count() == 0,
        }
    }

    /// Executes `target(args)` under `policy`.
    ///
    /// `Auto` is treated as `Direct` here; resolve it against the target's
    /// identity first (see [`InvokePolicy::resolve`]).
    ///
    /// # Errors
    ///
    /// `Direct`, `Async` and `BlockQueued` report the call's own failure.
    /// Queued policies report [`ErrorKind::TargetGone`] when the queue expired
    /// under [`ExpiredTargetPolicy::Fail`]. `Async` reports
    /// [`ErrorKind::SpawnFailed`] if no thread could be spawned.
    pub fn execute<A, R>(
        &self,
        target: &CallableRef<A, R>,
        args: A,
        policy: InvokePolicy,
        config: &DispatchConfig,
    ) -> Result<Dispatch<R>>
    where
        A: Send + 'static,
        R: Send + 'static,
    {
        match policy {
            InvokePolicy::Direct | InvokePolicy::Auto => target.invoke(args).map(Dispatch::Ready),
            InvokePolicy::Async => run_async(target, args, config).map(Dispatch::Ready),
            InvokePolicy::Queued | InvokePolicy::BlockQueued => {
                let Some((queue, owner)) = self.live_queue(config)? else {
                    return target.invoke(args).map(Dispatch::Ready);
                };
                let blocking = policy == InvokePolicy::BlockQueued;
                if blocking && owner == Some(thread::current().id()) {
                    trace!("block-queued call from the queue owner, running direct");
                    return target.invoke(args).map(Dispatch::Ready);
                }

                let call = DeferredCall::new(target, args);
                let future = call.future();
                queue.enqueue(Box::new(call));
                if blocking {
                    future.wait().map(Dispatch::Ready)
                } else {
                    Ok(Dispatch::Pending(future))
                }
            }
        }
    }

    /// Queues `target(args)` without waiting for or reporting its outcome.
    ///
    /// The queued call holds a strong reference to the callable, so a
    /// temporary handle still runs. Without a live queue the call runs
    /// directly and its failure is discarded like a queued one would be.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::TargetGone`] when the queue expired under
    /// [`ExpiredTargetPolicy::Fail`].
    pub fn post<A, R>(&self, target: &CallableRef<A, R>, args: A, config: &DispatchConfig) -> Result<()>
    where
        A: Send + 'static,
        R: Send + 'static,
    {
        match self.live_queue(config)? {
            Some((queue, _)) => {
                queue.enqueue(Box::new(DeferredCall::owned(target.clone(), args)));
            }
            None => {
                if let Err(err) = target.invoke(args) {
                    debug!(error = %err, "posted call failed");
                }
            }
        }
        Ok(())
    }

    fn live_queue(&self, config: &DispatchConfig) -> Result<Option<(QueueHandle, Option<ThreadId>)>> {
        match self {
            Self::Immediate => Ok(None),
            Self::Queued { queue, owner } => match queue.upgrade() {
                Some(queue) => Ok(Some((queue, *owner))),
                None => match config.expired_target {
                    ExpiredTargetPolicy::RunDirect => {
                        debug!(owner = ?owner, "target queue expired, running direct");
                        Ok(None)
                    }
                    ExpiredTargetPolicy::Fail => {
                        let err = Error::new(ErrorKind::TargetGone);
                        Err(match owner {
                            Some(id) => err.with_message(format!("queue of thread {id:?} is gone")),
                            None => err,
                        })
                    }
                },
            },
        }
    }
}

/// Runs the call on a detached thread and blocks until it finished.
fn run_async<A, R>(target: &CallableRef<A, R>, args: A, config: &DispatchConfig) -> Result<R>
where
    A: Send + 'static,
    R: Send + 'static,
{
    let mut call = DeferredCall::owned(target.clone(), args);
    let future = call.future();
    let mut builder = thread::Builder::new().name(config.async_thread_name.clone());
    if config.thread_stack_size > 0 {
        builder = builder.stack_size(config.thread_stack_size);
    }
    builder
        .spawn(move || call.perform())
        .map_err(Error::spawn_failed)?;
    future.wait()
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate => f.write_str("Executor::Immediate"),
            Self::Queued { queue, owner } => f
                .debug_struct("Executor::Queued")
                .field("owner", owner)
                .field("expired", &(queue.strong_count() == 0))
                .finish(),
        }
    }
}

/// Executor that owns the worker it sends calls to.
pub struct DedicatedExecutor {
    worker: WorkerHandle,
    executor: Executor,
    config: DispatchConfig,
}

impl DedicatedExecutor {
    /// Creates and starts a private worker.
    pub fn new(config: &DispatchConfig) -> Result<Self> {
        let worker = Arc::new(WorkerThread::new(config));
        worker.start()?;
        Ok(Self::with_worker(worker, config))
    }

    /// Wraps an existing worker. The worker is used as is; start it first.
    #[must_use]
    pub fn with_worker(worker: WorkerHandle, config: &DispatchConfig) -> Self {
        let executor = Executor::for_worker(&worker);
        Self {
            worker,
            executor,
            config: config.clone(),
        }
    }

    /// The owned worker.
    #[must_use]
    pub fn worker(&self) -> &WorkerHandle {
        &self.worker
    }

    /// Identity of the owned worker's thread.
    #[must_use]
    pub fn thread_id(&self) -> Option<ThreadId> {
        self.worker.thread_id()
    }

    /// Executes `target(args)`, resolving `Auto` against the owned worker.
    pub fn execute<A, R>(
        &self,
        target: &CallableRef<A, R>,
        args: A,
        policy: InvokePolicy,
    ) -> Result<Dispatch<R>>
    where
        A: Send + 'static,
        R: Send + 'static,
    {
        let policy = match self.worker.thread_id() {
            Some(id) => policy.resolve_for_current(id),
            None => policy,
        };
        self.executor.execute(target, args, policy, &self.config)
    }
}

impl fmt::Debug for DedicatedExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DedicatedExecutor")
            .field("worker", &self.worker)
            .finish()
    }
}
