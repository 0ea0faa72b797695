//! Threadaffine: thread-affine task dispatch.
//!
//! # Overview
//!
//! Threadaffine runs a unit of work on the thread it belongs to. A caller
//! hands a callable and its arguments to a [`Dispatcher`] together with a
//! target thread and an [`InvokePolicy`]; the call then runs immediately,
//! on a throwaway thread, or on the target worker's queue, and the result
//! comes back through a blocking future.
//!
//! # Core Guarantees
//!
//! - **Same-thread calls never queue**: `Auto` resolves to `Direct` on the target thread
//! - **Per-producer FIFO**: calls from one producer run in submission order
//! - **Nothing escapes a call**: failures and panics are captured and surface on retrieval
//! - **No stuck waiters**: a call dropped unexecuted resolves its future as `Abandoned`
//! - **No lock held across user code**: the registry and queues never lock around a call
//!
//! # Module Structure
//!
//! - [`callable`]: Reference-counted callable handles with weak counterparts
//! - [`call`]: Deferred calls, result slots and futures
//! - [`queue`]: Callback queues drained by workers
//! - [`runtime`]: Worker threads, the thread registry, configuration
//! - [`dispatch`]: Policies, executors and the dispatcher
//! - [`error`]: Error types
//!
//! # Example
//!
//! ```no_run
//! use threadaffine::callable::callable;
//! use threadaffine::dispatch::{Dispatcher, InvokePolicy};
//! use threadaffine::runtime::{EventSystem, WorkerThread};
//!
//! # fn main() -> threadaffine::Result<()> {
//! let system = EventSystem::init()?;
//! let worker = WorkerThread::create_registered(&system)?;
//! let dispatcher = Dispatcher::with_event_system(&system);
//!
//! let add = callable(|(a, b): (i32, i32)| a + b);
//! let target = worker.thread_id().expect("started");
//! assert_eq!(dispatcher.call(&add, (2, 5), InvokePolicy::BlockQueued, target)?, 7);
//!
//! system.release();
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

pub mod call;
pub mod callable;
pub mod dispatch;
pub mod error;
pub mod queue;
pub mod runtime;
pub mod tracing_compat;

#[cfg(test)]
mod test_utils;

pub use call::{CallFuture, DeferredCall, ResultSlot};
pub use callable::{callable, fallible, Callable, CallableRef, WeakCallable};
pub use dispatch::{DedicatedExecutor, Dispatch, DispatchTarget, Dispatcher, InvokePolicy};
pub use error::{Error, ErrorCategory, ErrorKind, Result};
pub use queue::{CallbackQueue, FifoQueue, SingleSlotQueue};
pub use runtime::{DispatchConfig, EventSystem, EventSystemBuilder, ExpiredTargetPolicy, WorkerThread};
