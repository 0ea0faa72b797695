//! Deferred call: a callable plus its captured arguments, run exactly once.

use crate::call::result_slot::{CallFuture, ResultSlot};
use crate::callable::{CallableRef, WeakCallable};
use crate::error::{Error, ErrorKind, Result};
use crate::tracing_compat::trace;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Type-erased unit of work stored in a callback queue.
pub trait Deferred: Send {
    /// Runs the call and records its outcome. Never panics, never fails.
    fn perform(&mut self);

    /// Returns true once `perform` has run.
    fn is_performed(&self) -> bool;
}

/// Boxed deferred call as held by queues.
pub type BoxedCall = Box<dyn Deferred>;

enum Target<A, R> {
    /// Liveness-checked: the call does not keep the callable alive.
    Weak(WeakCallable<A, R>),
    /// Ownership transferred: the call keeps the callable alive until it runs.
    Owned(CallableRef<A, R>),
}

impl<A, R> Target<A, R> {
    /// Returns the callable to run, or `None` if a weak target expired.
    fn resolve(&self) -> Option<CallableRef<A, R>> {
        match self {
            Self::Weak(weak) => weak.upgrade(),
            Self::Owned(strong) => Some(strong.clone()),
        }
    }
}

/// A packaged, delayed invocation of a callable with captured arguments.
///
/// The call owns a [`ResultSlot`]; [`DeferredCall::future`] hands out the
/// handle another thread blocks on. If the call is dropped before it ran,
/// its futures resolve with [`ErrorKind::Abandoned`].
///
/// # Example
///
/// ```
/// use threadaffine::call::DeferredCall;
/// use threadaffine::callable::callable;
///
/// let add = callable(|(a, b): (i32, i32)| a + b);
/// let mut call = DeferredCall::new(&add, (2, 5));
/// let future = call.future();
/// call.perform();
/// assert_eq!(future.wait().unwrap(), 7);
/// ```
pub struct DeferredCall<A, R> {
    target: Target<A, R>,
    args: Option<A>,
    slot: ResultSlot<R>,
}

impl<A, R> DeferredCall<A, R> {
    /// Creates a call holding a weak reference to `callable`.
    ///
    /// If every strong handle is dropped before the call runs, the result is
    /// [`ErrorKind::StaleCallable`]. An empty handle yields
    /// [`ErrorKind::EmptyTarget`] instead, so "gone" and "never existed" stay
    /// distinguishable.
    #[must_use]
    pub fn new(callable: &CallableRef<A, R>, args: A) -> Self {
        let target = if callable.is_empty() {
            Target::Owned(CallableRef::empty())
        } else {
            Target::Weak(callable.downgrade())
        };
        Self {
            target,
            args: Some(args),
            slot: ResultSlot::new(),
        }
    }

    /// Creates a call that keeps `callable` alive until it runs.
    #[must_use]
    pub fn owned(callable: CallableRef<A, R>, args: A) -> Self {
        Self {
            target: Target::Owned(callable),
            args: Some(args),
            slot: ResultSlot::new(),
        }
    }

    /// Returns a future resolved when the call runs.
    #[must_use]
    pub fn future(&self) -> CallFuture<R> {
        self.slot.future()
    }

    /// Applies the captured arguments to the callable and stores the outcome.
    ///
    /// Failures (stale callable, callable error, panic) are stored, not
    /// returned. Only the first call has any effect.
    pub fn perform(&mut self) {
        let Some(args) = self.args.take() else {
            return;
        };
        let outcome = match self.target.resolve() {
            Some(callable) => panic::catch_unwind(AssertUnwindSafe(|| callable.invoke(args)))
                .unwrap_or_else(|payload| Err(Error::panicked(payload.as_ref()))),
            None => {
                trace!("deferred call target expired before execution");
                Err(Error::new(ErrorKind::StaleCallable))
            }
        };
        match outcome {
            Ok(value) => {
                self.slot.set_value(value);
            }
            Err(err) => {
                trace!(error = %err, "deferred call captured failure");
                self.slot.set_error(err);
            }
        }
    }

    /// Returns true once `perform` has run.
    #[must_use]
    pub fn is_performed(&self) -> bool {
        self.args.is_none()
    }

    /// Returns true if a successful value is stored.
    #[must_use]
    pub fn has_value(&self) -> bool {
        self.slot.has_value()
    }

    /// Moves the produced value out.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::NotReady`] before `perform`, the captured failure after a
    /// failing `perform`, [`ErrorKind::AlreadyRetrieved`] on a second call.
    pub fn retrieve(&self) -> Result<R> {
        self.slot.retrieve()
    }

    /// Returns the result slot.
    #[must_use]
    pub fn slot(&self) -> &ResultSlot<R> {
        &self.slot
    }
}

impl<A, R: Clone> DeferredCall<A, R> {
    /// Returns a copy of the produced value; repeatable.
    ///
    /// # Errors
    ///
    /// Same conditions as [`DeferredCall::retrieve`], except that reading
    /// twice is fine.
    pub fn get(&self) -> Result<R> {
        self.slot.get()
    }
}

impl<A, R> Drop for DeferredCall<A, R> {
    fn drop(&mut self) {
        if self.args.is_some() && self.slot.abandon() {
            trace!("deferred call dropped before execution");
        }
    }
}

impl<A, R> fmt::Debug for DeferredCall<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredCall")
            .field("performed", &self.is_performed())
            .field("owned", &matches!(self.target, Target::Owned(_)))
            .field("slot", &self.slot)
            .finish()
    }
}

impl<A: Send, R: Send> Deferred for DeferredCall<A, R> {
    fn perform(&mut self) {
        Self::perform(self);
    }

    fn is_performed(&self) -> bool {
        Self::is_performed(self)
    }
}
