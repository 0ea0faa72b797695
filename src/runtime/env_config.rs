//! Environment variable and config file support for
//! [`EventSystemBuilder`](super::builder::EventSystemBuilder).
//!
//! # Configuration Precedence
//!
//! Every layer overwrites what was set before it, so the later call wins.
//! Applied in the usual order the result is (highest priority first):
//!
//! 1. **Programmatic**: builder methods called after the overrides (`idle_park(..)`)
//! 2. **Environment variables**: `THREADAFFINE_*`, via `with_env_overrides()`
//! 3. **Config file**: a TOML file via `from_toml(..)` (requires `config-file` feature)
//! 4. **Defaults**: built-in defaults from [`DispatchConfig::default()`]
//!
//! A builder method called *before* `with_env_overrides()` is overwritten by
//! a set environment variable.
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `THREADAFFINE_THREAD_NAME_PREFIX` | `String` | `thread_name_prefix` |
//! | `THREADAFFINE_MAIN_THREAD_NAME` | `String` | `main_thread_name` |
//! | `THREADAFFINE_ASYNC_THREAD_NAME` | `String` | `async_thread_name` |
//! | `THREADAFFINE_THREAD_STACK_SIZE` | `usize` | `thread_stack_size` |
//! | `THREADAFFINE_IDLE_PARK_MS` | `u64` | `idle_park` |
//! | `THREADAFFINE_CROSS_THREAD` | `bool` | `cross_thread` |
//! | `THREADAFFINE_EXPIRED_TARGET` | `direct`/`fail` | `expired_target` |

use crate::error::{Error, Result};
use crate::runtime::config::{DispatchConfig, ExpiredTargetPolicy};
use std::time::Duration;

/// Environment variable name for the worker thread name prefix.
pub const ENV_THREAD_NAME_PREFIX: &str = "THREADAFFINE_THREAD_NAME_PREFIX";
/// Environment variable name for the main worker thread name.
pub const ENV_MAIN_THREAD_NAME: &str = "THREADAFFINE_MAIN_THREAD_NAME";
/// Environment variable name for the async dispatch thread name.
pub const ENV_ASYNC_THREAD_NAME: &str = "THREADAFFINE_ASYNC_THREAD_NAME";
/// Environment variable name for thread stack size.
pub const ENV_THREAD_STACK_SIZE: &str = "THREADAFFINE_THREAD_STACK_SIZE";
/// Environment variable name for the idle park interval in milliseconds.
pub const ENV_IDLE_PARK_MS: &str = "THREADAFFINE_IDLE_PARK_MS";
/// Environment variable name for the cross-thread dispatch toggle.
pub const ENV_CROSS_THREAD: &str = "THREADAFFINE_CROSS_THREAD";
/// Environment variable name for the expired target policy.
pub const ENV_EXPIRED_TARGET: &str = "THREADAFFINE_EXPIRED_TARGET";

/// Apply environment variable overrides to a [`DispatchConfig`].
///
/// Only variables that are set in the environment are applied.
/// Returns an error if a variable is set but contains an unparseable value.
pub fn apply_env_overrides(config: &mut DispatchConfig) -> Result<()> {
    if let Some(val) = read_env(ENV_THREAD_NAME_PREFIX) {
        config.thread_name_prefix = val;
    }
    if let Some(val) = read_env(ENV_MAIN_THREAD_NAME) {
        config.main_thread_name = val;
    }
    if let Some(val) = read_env(ENV_ASYNC_THREAD_NAME) {
        config.async_thread_name = val;
    }
    if let Some(val) = read_env(ENV_THREAD_STACK_SIZE) {
        config.thread_stack_size = parse_usize(ENV_THREAD_STACK_SIZE, &val)?;
    }
    if let Some(val) = read_env(ENV_IDLE_PARK_MS) {
        config.idle_park = Duration::from_millis(parse_u64(ENV_IDLE_PARK_MS, &val)?);
    }
    if let Some(val) = read_env(ENV_CROSS_THREAD) {
        config.cross_thread = parse_bool(ENV_CROSS_THREAD, &val)?;
    }
    if let Some(val) = read_env(ENV_EXPIRED_TARGET) {
        config.expired_target = parse_policy(ENV_EXPIRED_TARGET, &val)?;
    }
    Ok(())
}

/// Read an environment variable, returning `None` if unset.
fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_usize(var_name: &str, val: &str) -> Result<usize> {
    val.trim().parse::<usize>().map_err(|e| {
        Error::config(format!(
            "invalid value for {var_name}: expected unsigned integer, got {val:?} ({e})"
        ))
    })
}

fn parse_u64(var_name: &str, val: &str) -> Result<u64> {
    val.trim().parse::<u64>().map_err(|e| {
        Error::config(format!(
            "invalid value for {var_name}: expected u64, got {val:?} ({e})"
        ))
    })
}

fn parse_bool(var_name: &str, val: &str) -> Result<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::config(format!(
            "invalid value for {var_name}: expected bool (true/false/1/0/yes/no), got {val:?}"
        ))),
    }
}

fn parse_policy(var_name: &str, val: &str) -> Result<ExpiredTargetPolicy> {
    val.parse::<ExpiredTargetPolicy>()
        .map_err(|e| Error::config(format!("invalid value for {var_name}: {e}")))
}

// =========================================================================
// TOML config file support (feature-gated)
// =========================================================================

/// TOML-deserializable dispatch configuration.
///
/// ```toml
/// [threads]
/// name_prefix = "ui-worker"
/// main_name = "ui-main"
/// async_name = "ui-async"
/// stack_size = 2097152
/// idle_park_ms = 5
///
/// [dispatch]
/// cross_thread = true
/// expired_target = "fail"
/// ```
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct DispatchTomlConfig {
    /// Worker thread settings.
    #[serde(default)]
    pub threads: ThreadsToml,
    /// Dispatch routing settings.
    #[serde(default)]
    pub dispatch: DispatchToml,
}

/// Thread section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct ThreadsToml {
    /// Name prefix for worker threads.
    pub name_prefix: Option<String>,
    /// Name of the main worker thread.
    pub main_name: Option<String>,
    /// Name of async dispatch threads.
    pub async_name: Option<String>,
    /// Stack size per thread in bytes.
    pub stack_size: Option<usize>,
    /// Idle park interval in milliseconds.
    pub idle_park_ms: Option<u64>,
}

/// Dispatch section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct DispatchToml {
    /// Route calls through registered worker queues.
    pub cross_thread: Option<bool>,
    /// `"direct"` or `"fail"`.
    pub expired_target: Option<String>,
}

/// Apply a parsed TOML config to a [`DispatchConfig`].
///
/// Only fields that are `Some` in the TOML struct override the config.
#[cfg(feature = "config-file")]
pub fn apply_toml_config(config: &mut DispatchConfig, toml: &DispatchTomlConfig) -> Result<()> {
    if let Some(ref v) = toml.threads.name_prefix {
        config.thread_name_prefix.clone_from(v);
    }
    if let Some(ref v) = toml.threads.main_name {
        config.main_thread_name.clone_from(v);
    }
    if let Some(ref v) = toml.threads.async_name {
        config.async_thread_name.clone_from(v);
    }
    if let Some(v) = toml.threads.stack_size {
        config.thread_stack_size = v;
    }
    if let Some(v) = toml.threads.idle_park_ms {
        config.idle_park = Duration::from_millis(v);
    }
    if let Some(v) = toml.dispatch.cross_thread {
        config.cross_thread = v;
    }
    if let Some(ref v) = toml.dispatch.expired_target {
        config.expired_target = parse_policy("dispatch.expired_target", v)?;
    }
    Ok(())
}

/// Parse a TOML string into a [`DispatchTomlConfig`].
#[cfg(feature = "config-file")]
pub fn parse_toml_str(toml_str: &str) -> Result<DispatchTomlConfig> {
    toml::from_str(toml_str)
        .map_err(|e| Error::config(format!("failed to parse TOML config: {e}")))
}

/// Read and parse a TOML file into a [`DispatchTomlConfig`].
#[cfg(feature = "config-file")]
pub fn parse_toml_file(path: &std::path::Path) -> Result<DispatchTomlConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "failed to read config file {}: {e}",
            path.display()
        ))
        .with_source(e)
    })?;
    parse_toml_str(&content)
}

// =========================================================================
// Tests
// =========================================================================
