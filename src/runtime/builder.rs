//! Event system builder.

use crate::error::Result;
use crate::runtime::config::{DispatchConfig, ExpiredTargetPolicy};
use crate::runtime::event_system::EventSystem;
use std::sync::Arc;
use std::time::Duration;

/// Builder for an [`EventSystem`] with custom configuration.
///
/// Later calls win, so the usual precedence (builder over environment over
/// file) follows from call order:
///
/// ```ignore
/// use threadaffine::runtime::EventSystemBuilder;
///
/// // Requires the `config-file` feature.
/// let system = EventSystemBuilder::from_toml("config/dispatch.toml")?
///     .with_env_overrides()?
///     .thread_name_prefix("ui-worker")
///     .build()?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct EventSystemBuilder {
    config: DispatchConfig,
}

impl EventSystemBuilder {
    /// Create a new builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: DispatchConfig::default(),
        }
    }

    /// Start from an existing configuration.
    #[must_use]
    pub fn from_config(config: DispatchConfig) -> Self {
        Self { config }
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    /// Set the main worker's thread name.
    #[must_use]
    pub fn main_thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.main_thread_name = name.into();
        self
    }

    /// Set the name of threads spawned for `Async` dispatch.
    #[must_use]
    pub fn async_thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.async_thread_name = name.into();
        self
    }

    /// Set the stack size of spawned threads.
    #[must_use]
    pub fn thread_stack_size(mut self, size: usize) -> Self {
        self.config.thread_stack_size = size;
        self
    }

    /// Set how long an idle worker parks before re-checking its queue.
    #[must_use]
    pub fn idle_park(mut self, interval: Duration) -> Self {
        self.config.idle_park = interval;
        self
    }

    /// Enable or disable routing through registered worker queues.
    #[must_use]
    pub fn cross_thread(mut self, enable: bool) -> Self {
        self.config.cross_thread = enable;
        self
    }

    /// Choose what queued dispatch does when the target queue is gone.
    #[must_use]
    pub fn expired_target(mut self, policy: ExpiredTargetPolicy) -> Self {
        self.config.expired_target = policy;
        self
    }

    /// Register a callback to run when a worker thread starts.
    #[must_use]
    pub fn on_thread_start<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.config.on_thread_start = Some(Arc::new(f));
        self
    }

    /// Register a callback to run when a worker thread stops.
    #[must_use]
    pub fn on_thread_stop<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.config.on_thread_stop = Some(Arc::new(f));
        self
    }

    /// Apply `THREADAFFINE_*` environment variables on top of the current
    /// settings.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        super::env_config::apply_env_overrides(&mut self.config)?;
        Ok(self)
    }

    /// Start from a TOML config file.
    #[cfg(feature = "config-file")]
    pub fn from_toml(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let parsed = super::env_config::parse_toml_file(path.as_ref())?;
        let mut config = DispatchConfig::default();
        super::env_config::apply_toml_config(&mut config, &parsed)?;
        Ok(Self { config })
    }

    /// Start from TOML text.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let parsed = super::env_config::parse_toml_str(toml)?;
        let mut config = DispatchConfig::default();
        super::env_config::apply_toml_config(&mut config, &parsed)?;
        Ok(Self { config })
    }

    /// The configuration as currently set.
    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Build the event system, starting and registering its main worker.
    pub fn build(self) -> Result<EventSystem> {
        EventSystem::with_config(self.config)
    }
}
