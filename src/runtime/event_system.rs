//! Thread registry: maps a worker's identity to its shared handle.
//!
//! An [`EventSystem`] exists between construction ([`EventSystem::init`] or
//! [`EventSystemBuilder::build`](super::EventSystemBuilder::build)) and
//! [`EventSystem::release`]. Construction starts and registers one designated
//! main worker. After release every registry operation fails with
//! [`ErrorKind::NotInitialized`](crate::ErrorKind::NotInitialized).
//!
//! The handle is cheap to clone; all clones share one registry. The registry
//! lock is reentrant so registration may happen from code that already holds
//! it on the same thread, such as a callback running on a registered worker.

use crate::error::{Error, ErrorKind, Result};
use crate::runtime::builder::EventSystemBuilder;
use crate::runtime::config::DispatchConfig;
use crate::runtime::worker::{WorkerHandle, WorkerThread};
use crate::tracing_compat::debug;
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::thread::ThreadId;

struct Registry {
    main: WorkerHandle,
    threads: HashMap<ThreadId, WorkerHandle>,
}

struct Inner {
    config: DispatchConfig,
    registry: ReentrantMutex<RefCell<Option<Registry>>>,
}

/// Shared registry of worker threads plus the configuration they run with.
#[derive(Clone)]
pub struct EventSystem {
    inner: Arc<Inner>,
}

/// Non-owning handle a registered worker keeps to its registry.
#[derive(Clone)]
pub(crate) struct WeakEventSystem {
    inner: Weak<Inner>,
}

impl WeakEventSystem {
    pub(crate) fn upgrade(&self) -> Option<EventSystem> {
        self.inner.upgrade().map(|inner| EventSystem { inner })
    }
}

impl EventSystem {
    /// Creates a registry with default configuration and starts its main
    /// worker.
    pub fn init() -> Result<Self> {
        EventSystemBuilder::new().build()
    }

    /// Returns a builder for custom configuration.
    #[must_use]
    pub fn builder() -> EventSystemBuilder {
        EventSystemBuilder::new()
    }

    /// Creates a registry from an explicit configuration.
    pub fn with_config(mut config: DispatchConfig) -> Result<Self> {
        config.normalize();
        let main = Arc::new(WorkerThread::named(config.main_thread_name.clone(), &config));
        main.start()?;
        let main_id = main
            .thread_id()
            .ok_or_else(|| Error::new(ErrorKind::SpawnFailed).with_message("main worker has no identity"))?;

        let mut threads = HashMap::new();
        threads.insert(main_id, Arc::clone(&main));
        debug!(main_thread = ?main_id, "event system initialized");

        let system = Self {
            inner: Arc::new(Inner {
                config,
                registry: ReentrantMutex::new(RefCell::new(Some(Registry {
                    main: Arc::clone(&main),
                    threads,
                }))),
            }),
        };
        main.bind_registry(system.downgrade());
        Ok(system)
    }

    /// Stops the main worker and clears the registry. Idempotent.
    ///
    /// Handles to other workers are dropped from the registry; workers with
    /// no remaining handle stop as they drop.
    pub fn release(&self) {
        let taken = self.inner.registry.lock().borrow_mut().take();
        if let Some(registry) = taken {
            registry.main.stop();
            debug!(
                registered = registry.threads.len(),
                "event system released"
            );
        }
    }

    /// Returns true between construction and [`release`](Self::release).
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.registry.lock().borrow().is_some()
    }

    /// Configuration shared by this system's workers and dispatchers.
    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.inner.config
    }

    /// The designated main worker.
    pub fn main_thread(&self) -> Result<WorkerHandle> {
        self.with_registry(|registry| Ok(Arc::clone(&registry.main)))
    }

    /// Registers a started worker under its current identity.
    ///
    /// A worker with no identity (never started, or stopped) is ignored, and
    /// registering an identity that is already present keeps the existing
    /// entry. A registered worker that is stopped and started again moves to
    /// its new identity; its old one is dropped from the registry.
    pub fn register_thread(&self, worker: &WorkerHandle) -> Result<()> {
        let Some(id) = worker.thread_id() else {
            self.with_registry(|_| Ok(()))?;
            debug!(worker = %worker.name(), "ignoring registration of a worker without identity");
            return Ok(());
        };
        let inserted = self.with_registry_mut(|registry| {
            if registry.threads.contains_key(&id) {
                return Ok(false);
            }
            registry
                .threads
                .retain(|_, entry| !Arc::ptr_eq(entry, worker));
            registry.threads.insert(id, Arc::clone(worker));
            Ok(true)
        })?;
        if inserted {
            worker.bind_registry(self.downgrade());
            debug!(worker = %worker.name(), thread_id = ?id, "registered worker thread");
        }
        Ok(())
    }

    /// Moves `worker`'s entry to `id`. Returns false if it was not registered.
    pub(crate) fn rekey_thread(&self, worker: &WorkerThread, id: ThreadId) -> Result<bool> {
        self.with_registry_mut(|registry| {
            let Some(old) = registry
                .threads
                .iter()
                .find(|(_, entry)| std::ptr::eq(Arc::as_ptr(entry), worker))
                .map(|(key, _)| *key)
            else {
                return Ok(false);
            };
            if let Some(entry) = registry.threads.remove(&old) {
                registry.threads.entry(id).or_insert(entry);
            }
            Ok(true)
        })
    }

    pub(crate) fn downgrade(&self) -> WeakEventSystem {
        WeakEventSystem {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Looks up the worker registered under `id`.
    ///
    /// Fails with [`ErrorKind::UnregisteredThread`](crate::ErrorKind::UnregisteredThread)
    /// when nothing is registered under it.
    pub fn get_registered_thread(&self, id: ThreadId) -> Result<WorkerHandle> {
        self.with_registry(|registry| {
            registry
                .threads
                .get(&id)
                .cloned()
                .ok_or_else(|| Error::unregistered(id))
        })
    }

    /// Returns true if a worker is registered under `id`.
    pub fn contains_registered_thread(&self, id: ThreadId) -> Result<bool> {
        self.with_registry(|registry| Ok(registry.threads.contains_key(&id)))
    }

    /// Number of registered workers, the main worker included.
    pub fn registered_count(&self) -> Result<usize> {
        self.with_registry(|registry| Ok(registry.threads.len()))
    }

    /// Identities of all registered workers, in no particular order.
    pub fn registered_ids(&self) -> Result<Vec<ThreadId>> {
        self.with_registry(|registry| Ok(registry.threads.keys().copied().collect()))
    }

    fn with_registry<T>(&self, f: impl FnOnce(&Registry) -> Result<T>) -> Result<T> {
        let guard = self.inner.registry.lock();
        let registry = guard.borrow();
        match registry.as_ref() {
            Some(registry) => f(registry),
            None => Err(ErrorKind::NotInitialized.into()),
        }
    }

    fn with_registry_mut<T>(&self, f: impl FnOnce(&mut Registry) -> Result<T>) -> Result<T> {
        let guard = self.inner.registry.lock();
        let mut registry = guard.borrow_mut();
        match registry.as_mut() {
            Some(registry) => f(registry),
            None => Err(ErrorKind::NotInitialized.into()),
        }
    }
}

impl fmt::Debug for EventSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSystem")
            .field("initialized", &self.is_initialized())
            .field("registered", &self.registered_count().unwrap_or(0))
            .finish()
    }
}
