//! A callable bound to the thread it should run on.

use crate::callable::CallableRef;
use crate::dispatch::dispatcher::Dispatcher;
use crate::dispatch::policy::InvokePolicy;
use crate::dispatch::Dispatch;
use crate::error::Result;
use std::fmt;
use std::thread::{self, ThreadId};

/// Callable plus the policy and thread its invocations default to.
///
/// Created on a thread, a target is affine to that thread with
/// [`InvokePolicy::Auto`]: invoking it there runs directly, invoking it from
/// anywhere else queues the call back to the creating thread (if that thread
/// is a registered worker).
pub struct DispatchTarget<A, R> {
    callable: CallableRef<A, R>,
    policy: InvokePolicy,
    thread: ThreadId,
}

impl<A, R> DispatchTarget<A, R> {
    /// Binds `callable` to the current thread with `Auto` policy.
    #[must_use]
    pub fn new(callable: CallableRef<A, R>) -> Self {
        Self {
            callable,
            policy: InvokePolicy::Auto,
            thread: thread::current().id(),
        }
    }

    /// Replaces the default policy.
    #[must_use]
    pub fn with_policy(mut self, policy: InvokePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Rebinds the target to another thread.
    #[must_use]
    pub fn on_thread(mut self, thread: ThreadId) -> Self {
        self.thread = thread;
        self
    }

    /// The bound callable.
    #[must_use]
    pub fn callable(&self) -> &CallableRef<A, R> {
        &self.callable
    }

    /// The default policy.
    #[must_use]
    pub fn policy(&self) -> InvokePolicy {
        self.policy
    }

    /// The thread calls are routed to.
    #[must_use]
    pub fn thread(&self) -> ThreadId {
        self.thread
    }

    /// Returns true if both targets wrap the same callable.
    #[must_use]
    pub fn same_callable(&self, other: &Self) -> bool {
        self.callable.same(&other.callable)
    }
}

impl<A, R> DispatchTarget<A, R>
where
    A: Send + 'static,
    R: Send + 'static,
{
    /// Dispatches with the target's own policy and thread.
    pub fn dispatch(&self, dispatcher: &Dispatcher, args: A) -> Result<Dispatch<R>> {
        self.dispatch_with(dispatcher, args, self.policy)
    }

    /// Dispatches with an explicit policy to the target's thread.
    pub fn dispatch_with(
        &self,
        dispatcher: &Dispatcher,
        args: A,
        policy: InvokePolicy,
    ) -> Result<Dispatch<R>> {
        dispatcher.execute(&self.callable, args, policy, self.thread)
    }

    /// Dispatches and waits for the outcome.
    pub fn call(&self, dispatcher: &Dispatcher, args: A) -> Result<R> {
        self.dispatch(dispatcher, args)?.wait()
    }
}

impl<A, R> Clone for DispatchTarget<A, R> {
    fn clone(&self) -> Self {
        Self {
            callable: self.callable.clone(),
            policy: self.policy,
            thread: self.thread,
        }
    }
}

impl<A, R> fmt::Debug for DispatchTarget<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTarget")
            .field("policy", &self.policy)
            .field("thread", &self.thread)
            .field("empty", &self.callable.is_empty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callable::CallableRef;
    use crate::runtime::{EventSystem, WorkerThread};
    use crate::test_utils::{current_thread_id, init_test, sum};
    use crate::ErrorKind;
    use std::time::Duration;

    #[test]
    fn defaults_to_auto_on_creating_thread() {
        init_test("defaults_to_auto_on_creating_thread");
        let target = DispatchTarget::new(sum());
        assert_eq!(target.policy(), InvokePolicy::Auto);
        assert_eq!(target.thread(), thread::current().id());
        let dispatcher = Dispatcher::new();
        assert_eq!(target.call(&dispatcher, (4, 5)).unwrap(), 9);
        crate::test_complete!("defaults_to_auto_on_creating_thread");
    }

    #[test]
    fn created_on_worker_runs_on_worker() {
        init_test("created_on_worker_runs_on_worker");
        let system = EventSystem::builder()
            .idle_park(Duration::from_millis(2))
            .build()
            .unwrap();
        let worker = WorkerThread::create_registered(&system).unwrap();
        let dispatcher = Dispatcher::with_event_system(&system);

        let target = DispatchTarget::new(current_thread_id())
            .on_thread(worker.thread_id().unwrap())
            .with_policy(InvokePolicy::BlockQueued);
        let ran_on = target.call(&dispatcher, ()).unwrap();
        assert_eq!(Some(ran_on), worker.thread_id());

        let direct = target
            .dispatch_with(&dispatcher, (), InvokePolicy::Direct)
            .unwrap()
            .wait()
            .unwrap();
        assert_eq!(direct, thread::current().id());
        system.release();
        crate::test_complete!("created_on_worker_runs_on_worker");
    }

    #[test]
    fn empty_target_reports_empty() {
        init_test("empty_target_reports_empty");
        let target: DispatchTarget<(), u8> = DispatchTarget::new(CallableRef::empty());
        let err = target.call(&Dispatcher::new(), ()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyTarget);
        crate::test_complete!("empty_target_reports_empty");
    }

    #[test]
    fn clones_share_callable() {
        let target = DispatchTarget::new(sum());
        let copy = target.clone();
        assert!(target.same_callable(&copy));
        assert!(!target.same_callable(&DispatchTarget::new(sum())));
    }
}
