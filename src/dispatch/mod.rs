//! Choosing where a call runs.
//!
//! - [`policy`]: [`InvokePolicy`] and `Auto` resolution
//! - [`executor`]: [`Executor`] strategies and the worker-owning
//!   [`DedicatedExecutor`]
//! - [`dispatcher`]: [`Dispatcher`], which caches one executor per target
//!   thread
//! - [`target`]: [`DispatchTarget`], a callable bundled with its policy and
//!   thread affinity

use crate::call::CallFuture;
use crate::error::Result;
use std::fmt;

pub mod dispatcher;
pub mod executor;
pub mod policy;
pub mod target;

pub use dispatcher::Dispatcher;
pub use executor::{DedicatedExecutor, Executor};
pub use policy::InvokePolicy;
pub use target::DispatchTarget;

/// Outcome of a dispatch.
///
/// Blocking policies produce `Ready`. `Queued` produces `Pending`, whose
/// future may be waited on or simply dropped.
#[must_use = "a pending dispatch only reports its outcome through wait()"]
pub enum Dispatch<R> {
    /// The call already ran and produced this value.
    Ready(R),
    /// The call was queued; the future resolves once it ran.
    Pending(CallFuture<R>),
}

impl<R> Dispatch<R> {
    /// Returns the value, blocking on a pending call.
    pub fn wait(self) -> Result<R> {
        match self {
            Self::Ready(value) => Ok(value),
            Self::Pending(future) => future.wait(),
        }
    }

    /// Returns true if the call had not run when the dispatch returned.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// The value, if the call already ran.
    #[must_use]
    pub fn ready(self) -> Option<R> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Pending(_) => None,
        }
    }

    /// The future, if the call was queued.
    #[must_use]
    pub fn into_future(self) -> Option<CallFuture<R>> {
        match self {
            Self::Ready(_) => None,
            Self::Pending(future) => Some(future),
        }
    }
}

impl<R: fmt::Debug> fmt::Debug for Dispatch<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Self::Pending(future) => f.debug_tuple("Pending").field(future).finish(),
        }
    }
}
