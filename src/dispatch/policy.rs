//! Dispatch policies and their resolution.

use crate::error::Error;
use std::fmt;
use std::str::FromStr;
use std::thread::{self, ThreadId};

/// Where and how synchronously a call executes.
///
/// | Policy | Runs on | Caller blocks |
/// |--------|---------|---------------|
/// | `Direct` | calling thread | yes |
/// | `Async` | fresh detached thread | yes |
/// | `Queued` | target worker | no |
/// | `BlockQueued` | target worker | yes |
/// | `Auto` | resolved to `Direct` or `Queued` | - |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InvokePolicy {
    /// Invoke synchronously on the calling thread.
    Direct,
    /// Invoke on a newly spawned thread and wait for it.
    Async,
    /// Enqueue on the target thread and return without waiting.
    Queued,
    /// Enqueue on the target thread and wait until it ran.
    BlockQueued,
    /// `Direct` when the caller is the target thread, `Queued` otherwise.
    #[default]
    Auto,
}

impl InvokePolicy {
    /// Resolves `Auto` against the caller's and target's identities.
    ///
    /// Every other policy is returned unchanged.
    #[must_use]
    pub fn resolve(self, target: ThreadId, caller: ThreadId) -> Self {
        match self {
            Self::Auto if target == caller => Self::Direct,
            Self::Auto => Self::Queued,
            other => other,
        }
    }

    /// [`resolve`](Self::resolve) with the current thread as caller.
    #[must_use]
    pub fn resolve_for_current(self, target: ThreadId) -> Self {
        self.resolve(target, thread::current().id())
    }

    /// Returns true if the caller waits for the call to complete.
    ///
    /// `Auto` is reported as non-blocking since it may resolve to `Queued`.
    #[must_use]
    pub const fn blocks_caller(self) -> bool {
        matches!(self, Self::Direct | Self::Async | Self::BlockQueued)
    }

    /// Returns true for the policies that go through a target queue.
    #[must_use]
    pub const fn is_queued(self) -> bool {
        matches!(self, Self::Queued | Self::BlockQueued)
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Async => "async",
            Self::Queued => "queued",
            Self::BlockQueued => "block_queued",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for InvokePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvokePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "direct" => Ok(Self::Direct),
            "async" => Ok(Self::Async),
            "queued" => Ok(Self::Queued),
            "block_queued" | "blockqueued" => Ok(Self::BlockQueued),
            "auto" => Ok(Self::Auto),
            other => Err(Error::config(format!("unknown invoke policy {other:?}"))),
        }
    }
}
