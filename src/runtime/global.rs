//! Process-wide event system.
//!
//! For callers that want one registry reachable from anywhere instead of
//! passing an [`EventSystem`] around. Every function here fails with
//! [`ErrorKind::NotInitialized`] outside an [`init`]/[`release`] bracket.

use crate::error::{ErrorKind, Result};
use crate::runtime::builder::EventSystemBuilder;
use crate::runtime::event_system::EventSystem;
use crate::runtime::worker::WorkerHandle;
use parking_lot::RwLock;

static GLOBAL: RwLock<Option<EventSystem>> = parking_lot::const_rwlock(None);

/// Initializes the process-wide event system with default configuration.
///
/// Fails with [`ErrorKind::AlreadyInitialized`] if one is active.
pub fn init() -> Result<EventSystem> {
    init_with(EventSystemBuilder::new())
}

/// Initializes the process-wide event system from a builder.
pub fn init_with(builder: EventSystemBuilder) -> Result<EventSystem> {
    let mut slot = GLOBAL.write();
    if slot.is_some() {
        return Err(ErrorKind::AlreadyInitialized.into());
    }
    let system = builder.build()?;
    *slot = Some(system.clone());
    Ok(system)
}

/// Releases the process-wide event system, stopping its main worker.
pub fn release() -> Result<()> {
    let taken = GLOBAL.write().take();
    match taken {
        Some(system) => {
            system.release();
            Ok(())
        }
        None => Err(ErrorKind::NotInitialized.into()),
    }
}

/// The active process-wide event system.
pub fn instance() -> Result<EventSystem> {
    GLOBAL
        .read()
        .clone()
        .ok_or_else(|| ErrorKind::NotInitialized.into())
}

/// The process-wide main worker.
pub fn main_thread() -> Result<WorkerHandle> {
    instance()?.main_thread()
}

/// Returns true between [`init`] and [`release`].
#[must_use]
pub fn is_initialized() -> bool {
    GLOBAL.read().is_some()
}
