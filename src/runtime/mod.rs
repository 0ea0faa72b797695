//! Worker threads, the thread registry, and their configuration.
//!
//! - [`config`]: Dispatch configuration types
//! - [`env_config`]: `THREADAFFINE_*` environment overrides and TOML loading
//! - [`builder`]: Fluent [`EventSystemBuilder`]
//! - [`worker`]: [`WorkerThread`], an owned thread draining its callback queue
//! - [`event_system`]: [`EventSystem`], the identity-to-worker registry
//! - [`global`]: Optional process-wide event system
//!
//! # Quick Start
//!
//! ```ignore
//! use threadaffine::runtime::{EventSystem, WorkerThread};
//!
//! let system = EventSystem::init()?;
//! let worker = WorkerThread::create_registered(&system)?;
//! // dispatch to `worker.thread_id()` through a `Dispatcher`
//! system.release();
//! ```
//!
//! ## Config File + Environment Overrides
//!
//! ```ignore
//! use threadaffine::runtime::EventSystemBuilder;
//!
//! // Requires the `config-file` feature.
//! let system = EventSystemBuilder::from_toml("config/dispatch.toml")?
//!     .with_env_overrides()?
//!     .build()?;
//! ```

pub mod builder;
pub mod config;
pub mod env_config;
pub mod event_system;
pub mod global;
pub mod worker;

pub use builder::EventSystemBuilder;
pub use config::{DispatchConfig, ExpiredTargetPolicy, ThreadHook};
pub use event_system::EventSystem;
pub use worker::{WorkerHandle, WorkerThread};
