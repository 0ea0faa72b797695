//! Callable contract consumed by the dispatch core.
//!
//! A [`CallableRef`] is a reference-counted handle to something that can be
//! invoked with one argument value `A` (use a tuple for several) and yields
//! `Result<R>`. Handles compare by identity: two handles are the same when they
//! point at the same allocation. [`WeakCallable`] is the non-owning
//! counterpart a deferred call holds to notice that the callable's owner went
//! away before the call ran.
//!
//! # Example
//!
//! ```
//! use threadaffine::callable::{callable, fallible};
//! use threadaffine::Error;
//!
//! let add = callable(|(a, b): (i32, i32)| a + b);
//! assert_eq!(add.invoke((2, 5)).unwrap(), 7);
//!
//! let parse = fallible(|s: String| s.parse::<u8>().map_err(Error::from_user_error));
//! assert!(parse.invoke("nope".to_string()).is_err());
//! ```

use crate::error::{Error, ErrorKind, Result};
use std::fmt;
use std::sync::{Arc, Weak};

/// Something that can be invoked with `A` and produces `R` or an error.
pub trait Callable<A, R>: Send + Sync {
    /// Runs the callable.
    ///
    /// # Errors
    ///
    /// Returns whatever failure the callable produces.
    fn invoke(&self, args: A) -> Result<R>;
}

/// Adapter turning a closure into a [`Callable`].
pub struct FnCallable<F> {
    f: F,
}

impl<F> FnCallable<F> {
    /// Wraps `f`.
    #[must_use]
    pub const fn new(f: F) -> Self {
        Self { f }
    }
}

impl<A, R, F> Callable<A, R> for FnCallable<F>
where
    F: Fn(A) -> Result<R> + Send + Sync,
{
    fn invoke(&self, args: A) -> Result<R> {
        (self.f)(args)
    }
}

impl<F> fmt::Debug for FnCallable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCallable").finish_non_exhaustive()
    }
}

/// Shared handle to a callable. May be empty.
pub struct CallableRef<A, R> {
    inner: Option<Arc<dyn Callable<A, R>>>,
}

impl<A: 'static, R: 'static> CallableRef<A, R> {
    /// Creates a handle owning `callable`.
    #[must_use]
    pub fn new(callable: impl Callable<A, R> + 'static) -> Self {
        Self {
            inner: Some(Arc::new(callable)),
        }
    }
}

impl<A, R> CallableRef<A, R> {
    /// Creates a handle from an already shared callable.
    #[must_use]
    pub fn from_arc(callable: Arc<dyn Callable<A, R>>) -> Self {
        Self {
            inner: Some(callable),
        }
    }

    /// Creates a handle holding nothing.
    #[must_use]
    pub const fn empty() -> Self {
        Self { inner: None }
    }

    /// Returns true if the handle holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// Drops this handle's reference to the callable.
    pub fn reset(&mut self) {
        self.inner = None;
    }

    /// Invokes the callable on the current thread.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::EmptyTarget`] for an empty handle, otherwise the
    /// callable's own failure.
    pub fn invoke(&self, args: A) -> Result<R> {
        match &self.inner {
            Some(callable) => callable.invoke(args),
            None => Err(Error::new(ErrorKind::EmptyTarget)),
        }
    }

    /// Returns a non-owning reference to the same callable.
    #[must_use]
    pub fn downgrade(&self) -> WeakCallable<A, R> {
        WeakCallable {
            inner: self.inner.as_ref().map(Arc::downgrade),
        }
    }

    /// Returns true if both handles hold the same callable.
    ///
    /// Empty handles are never the same as anything.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (Some(a), Some(b)) => {
                Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
            }
            _ => false,
        }
    }

    /// Number of strong handles to the callable, 0 when empty.
    #[must_use]
    pub fn strong_count(&self) -> usize {
        self.inner.as_ref().map_or(0, Arc::strong_count)
    }
}

impl<A, R> Clone for CallableRef<A, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A, R> Default for CallableRef<A, R> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<A, R> PartialEq for CallableRef<A, R> {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl<A, R> fmt::Debug for CallableRef<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallableRef")
            .field("empty", &self.is_empty())
            .field("strong_count", &self.strong_count())
            .finish()
    }
}

/// Non-owning handle to a callable.
pub struct WeakCallable<A, R> {
    inner: Option<Weak<dyn Callable<A, R>>>,
}

impl<A, R> WeakCallable<A, R> {
    /// Attempts to recover a strong handle.
    ///
    /// Returns `None` if the callable was dropped or the source handle was
    /// empty.
    #[must_use]
    pub fn upgrade(&self) -> Option<CallableRef<A, R>> {
        self.inner
            .as_ref()
            .and_then(Weak::upgrade)
            .map(CallableRef::from_arc)
    }

    /// Returns true if the callable can no longer be reached.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.inner.as_ref().map_or(true, |w| w.strong_count() == 0)
    }
}

impl<A, R> Clone for WeakCallable<A, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A, R> fmt::Debug for WeakCallable<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakCallable")
            .field("expired", &self.is_expired())
            .finish()
    }
}

/// Wraps an infallible closure.
#[must_use]
pub fn callable<A, R, F>(f: F) -> CallableRef<A, R>
where
    A: 'static,
    R: 'static,
    F: Fn(A) -> R + Send + Sync + 'static,
{
    CallableRef::new(FnCallable::new(move |args: A| -> Result<R> { Ok(f(args)) }))
}

/// Wraps a closure that reports its own failures.
#[must_use]
pub fn fallible<A, R, F>(f: F) -> CallableRef<A, R>
where
    A: 'static,
    R: 'static,
    F: Fn(A) -> Result<R> + Send + Sync + 'static,
{
    CallableRef::new(FnCallable::new(f))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoke_returns_value() {
        let add = callable(|(a, b): (i32, i32)| a + b);
        assert_eq!(add.invoke((2, 5)).unwrap(), 7);
    }

    #[test]
    fn empty_handle_fails_with_empty_target() {
        let empty: CallableRef<(), ()> = CallableRef::empty();
        assert!(empty.is_empty());
        let err = empty.invoke(()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyTarget);
    }

    #[test]
    fn reset_empties_handle() {
        let mut handle = callable(|()| 1);
        handle.reset();
        assert!(handle.is_empty());
        assert_eq!(handle.invoke(()).unwrap_err().kind(), ErrorKind::EmptyTarget);
    }

    #[test]
    fn identity_comparison() {
        let a = callable(|x: i32| x);
        let b = a.clone();
        let c = callable(|x: i32| x);
        assert!(a.same(&b));
        assert_eq!(a, b);
        assert!(!a.same(&c));

        let empty: CallableRef<i32, i32> = CallableRef::empty();
        assert!(!empty.same(&CallableRef::empty()));
    }

    #[test]
    fn weak_expires_with_last_strong() {
        let strong = callable(|()| 5);
        let weak = strong.downgrade();
        assert!(!weak.is_expired());
        assert_eq!(weak.upgrade().unwrap().invoke(()).unwrap(), 5);

        drop(strong);
        assert!(weak.is_expired());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn weak_of_empty_is_expired() {
        let empty: CallableRef<(), ()> = CallableRef::empty();
        assert!(empty.downgrade().is_expired());
    }

    #[test]
    fn fallible_propagates_failure() {
        let fail = fallible(|()| -> Result<u8> { Err(Error::user("nope")) });
        let err = fail.invoke(()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::User);
        assert_eq!(err.message(), Some("nope"));
    }
}
