//! Error types for threadaffine.
//!
//! Every fallible operation in the crate returns [`Error`], a small struct made
//! of an [`ErrorKind`], an optional message and an optional source error.
//!
//! # Propagation
//!
//! Errors fall into two groups:
//!
//! - **Captured**: failures raised while a deferred call runs
//!   ([`ErrorKind::StaleCallable`], [`ErrorKind::Panicked`],
//!   [`ErrorKind::User`], [`ErrorKind::EmptyTarget`]) are stored in the call's
//!   result slot. They never escape `perform`, so a worker's drain loop keeps
//!   running; they surface when the result is read.
//! - **Immediate**: reading a result too early ([`ErrorKind::NotReady`]),
//!   registry misuse ([`ErrorKind::NotInitialized`],
//!   [`ErrorKind::UnregisteredThread`]) and dispatch failures are returned at
//!   the call site.
//!
//! Nothing in the crate retries on its own; re-dispatching is up to the caller.

use core::fmt;
use std::sync::Arc;
use std::thread::ThreadId;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // === Call ===
    /// Invocation attempted on a callable handle holding nothing.
    EmptyTarget,
    /// The callable's owner was destroyed between scheduling and execution.
    StaleCallable,
    /// The callable panicked while executing.
    Panicked,
    /// The callable returned a failure of its own.
    User,

    // === Result ===
    /// The result was read before the backing call executed.
    NotReady,
    /// The value was already moved out of the result slot.
    AlreadyRetrieved,
    /// The call was dropped without ever being executed.
    Abandoned,

    // === Registry ===
    /// Registry used before init or after release.
    NotInitialized,
    /// Process-wide registry initialised twice.
    AlreadyInitialized,
    /// Lookup of an identity that was never registered.
    UnregisteredThread,

    // === Dispatch ===
    /// The target worker's queue no longer exists.
    TargetGone,
    /// The operating system refused to spawn a thread.
    SpawnFailed,

    // === Config ===
    /// Invalid configuration value.
    Config,
}

impl ErrorKind {
    /// Returns the error category for this kind.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::EmptyTarget | Self::StaleCallable | Self::Panicked | Self::User => {
                ErrorCategory::Call
            }
            Self::NotReady | Self::AlreadyRetrieved | Self::Abandoned => ErrorCategory::Result,
            Self::NotInitialized | Self::AlreadyInitialized | Self::UnregisteredThread => {
                ErrorCategory::Registry
            }
            Self::TargetGone | Self::SpawnFailed => ErrorCategory::Dispatch,
            Self::Config => ErrorCategory::Config,
        }
    }

    /// Returns true if the failure was produced by running the call itself and
    /// was therefore captured into the call's result slot.
    #[must_use]
    pub const fn is_captured(&self) -> bool {
        matches!(self.category(), ErrorCategory::Call)
    }

    const fn description(&self) -> &'static str {
        match self {
            Self::EmptyTarget => "callable object is empty",
            Self::StaleCallable => "callable object no longer exists",
            Self::Panicked => "callable panicked",
            Self::User => "callable failed",
            Self::NotReady => "result is not ready",
            Self::AlreadyRetrieved => "result was already retrieved",
            Self::Abandoned => "call was dropped before it executed",
            Self::NotInitialized => "event system is not initialized",
            Self::AlreadyInitialized => "event system is already initialized",
            Self::UnregisteredThread => "thread is not registered",
            Self::TargetGone => "target thread queue no longer exists",
            Self::SpawnFailed => "failed to spawn thread",
            Self::Config => "invalid configuration",
        }
    }
}

/// High-level error category for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Failures raised by running a call.
    Call,
    /// Result slot and future failures.
    Result,
    /// Thread registry misuse.
    Registry,
    /// Dispatch and thread management failures.
    Dispatch,
    /// Configuration failures.
    Config,
}

/// The main error type for threadaffine operations.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Adds a message description to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Creates a user failure carrying `msg`.
    #[must_use]
    pub fn user(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::User).with_message(msg)
    }

    /// Wraps an arbitrary error returned by a callable.
    #[must_use]
    pub fn from_user_error(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        let msg = err.to_string();
        Self::new(ErrorKind::User).with_message(msg).with_source(err)
    }

    /// Converts a caught panic payload into an error.
    #[must_use]
    pub fn panicked(payload: &(dyn std::any::Any + Send)) -> Self {
        let msg = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::new(ErrorKind::Panicked).with_message(msg)
    }

    /// Creates an unregistered-thread error for `id`.
    #[must_use]
    pub fn unregistered(id: ThreadId) -> Self {
        Self::new(ErrorKind::UnregisteredThread).with_message(format!("{id:?}"))
    }

    /// Creates a spawn failure wrapping the OS error.
    #[must_use]
    pub fn spawn_failed(err: std::io::Error) -> Self {
        Self::new(ErrorKind::SpawnFailed).with_source(err)
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config).with_message(detail)
    }

    /// Returns true if the result was read before the call ran.
    #[must_use]
    pub const fn is_not_ready(&self) -> bool {
        matches!(self.kind, ErrorKind::NotReady)
    }

    /// Returns true if the callable was gone when the call ran.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self.kind, ErrorKind::StaleCallable)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.description())?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
