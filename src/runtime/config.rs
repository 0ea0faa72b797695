//! Dispatch configuration types.
//!
//! In most cases you should use
//! [`EventSystemBuilder`](super::builder::EventSystemBuilder) rather than
//! creating a [`DispatchConfig`] directly.
//!
//! # Defaults
//!
//! | Field | Default |
//! |-------|---------|
//! | `thread_name_prefix` | `"threadaffine-worker"` |
//! | `main_thread_name` | `"threadaffine-main"` |
//! | `async_thread_name` | `"threadaffine-async"` |
//! | `thread_stack_size` | 2 MiB |
//! | `idle_park` | 10 ms |
//! | `cross_thread` | `true` |
//! | `expired_target` | [`ExpiredTargetPolicy::RunDirect`] |

use crate::error::Error;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_STACK_SIZE: usize = 2 * 1024 * 1024;
const DEFAULT_IDLE_PARK: Duration = Duration::from_millis(10);

/// What a queued dispatch does when the target worker's queue is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiredTargetPolicy {
    /// Run the call on the calling thread instead.
    #[default]
    RunDirect,
    /// Report [`ErrorKind::TargetGone`](crate::ErrorKind::TargetGone).
    Fail,
}

impl fmt::Display for ExpiredTargetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunDirect => write!(f, "direct"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

impl FromStr for ExpiredTargetPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "direct" | "run_direct" | "run-direct" => Ok(Self::RunDirect),
            "fail" | "error" => Ok(Self::Fail),
            other => Err(Error::config(format!(
                "unknown expired target policy {other:?} (expected direct/fail)"
            ))),
        }
    }
}

/// Hook run on a worker thread as it starts or stops.
pub type ThreadHook = Arc<dyn Fn() + Send + Sync>;

/// Configuration shared by an event system, its workers and dispatchers.
#[derive(Clone)]
pub struct DispatchConfig {
    /// Name prefix for worker threads; a sequence number is appended.
    pub thread_name_prefix: String,
    /// Name of the designated main worker thread.
    pub main_thread_name: String,
    /// Name of the throwaway threads used by `Async` dispatch.
    pub async_thread_name: String,
    /// Stack size per spawned thread.
    pub thread_stack_size: usize,
    /// Longest time an idle worker parks before re-checking its queue.
    pub idle_park: Duration,
    /// Route calls to registered threads through their queues. When false,
    /// dispatchers never consult the registry and run everything immediately.
    pub cross_thread: bool,
    /// Behavior when a cached target queue has expired.
    pub expired_target: ExpiredTargetPolicy,
    /// Callback executed when a worker thread starts.
    pub on_thread_start: Option<ThreadHook>,
    /// Callback executed when a worker thread stops.
    pub on_thread_stop: Option<ThreadHook>,
}

impl DispatchConfig {
    /// Normalize configuration values to safe defaults.
    pub fn normalize(&mut self) {
        if self.thread_stack_size == 0 {
            self.thread_stack_size = DEFAULT_STACK_SIZE;
        }
        if self.idle_park.is_zero() {
            self.idle_park = Duration::from_millis(1);
        }
        if self.thread_name_prefix.is_empty() {
            self.thread_name_prefix = "threadaffine-worker".to_string();
        }
        if self.main_thread_name.is_empty() {
            self.main_thread_name = "threadaffine-main".to_string();
        }
        if self.async_thread_name.is_empty() {
            self.async_thread_name = "threadaffine-async".to_string();
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: "threadaffine-worker".to_string(),
            main_thread_name: "threadaffine-main".to_string(),
            async_thread_name: "threadaffine-async".to_string(),
            thread_stack_size: DEFAULT_STACK_SIZE,
            idle_park: DEFAULT_IDLE_PARK,
            cross_thread: true,
            expired_target: ExpiredTargetPolicy::RunDirect,
            on_thread_start: None,
            on_thread_stop: None,
        }
    }
}

impl fmt::Debug for DispatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchConfig")
            .field("thread_name_prefix", &self.thread_name_prefix)
            .field("main_thread_name", &self.main_thread_name)
            .field("async_thread_name", &self.async_thread_name)
            .field("thread_stack_size", &self.thread_stack_size)
            .field("idle_park", &self.idle_park)
            .field("cross_thread", &self.cross_thread)
            .field("expired_target", &self.expired_target)
            .field("on_thread_start", &self.on_thread_start.is_some())
            .field("on_thread_stop", &self.on_thread_stop.is_some())
            .finish()
    }
}
