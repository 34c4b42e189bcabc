//! Module-resolve subscribers.
//!
//! When the engine fails to resolve a module of an assembly it asks the assembly's
//! subscribers for one. The registry only holds the subscribers; firing is up to the engine,
//! through [`ResolveEventRegistry::notify`].

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use dashmap::DashMap;

use crate::{engine::AssemblyHandle, metadata::module::ModuleRc};

/// Details of a failed module resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveEventArgs {
    /// Name of the module that could not be resolved
    pub name: String,
    /// Assembly whose module was requested
    pub requesting_assembly: Option<AssemblyHandle>,
}

impl ResolveEventArgs {
    /// Arguments for a failed resolution of module `name`.
    pub fn new(name: impl Into<String>) -> Self {
        ResolveEventArgs {
            name: name.into(),
            requesting_assembly: None,
        }
    }
}

/// A subscriber. Returns the module it resolved, if any.
pub type ModuleResolveHandler = Arc<dyn Fn(&ResolveEventArgs) -> Option<ModuleRc> + Send + Sync>;

/// Identifies a registered handler, for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

/// Thread-safe set of module-resolve subscribers.
///
/// The same closure may be registered several times; every registration gets its own
/// [`HandlerId`] and is invoked once per notification.
pub struct ResolveEventRegistry {
    handlers: DashMap<HandlerId, ModuleResolveHandler>,
    next_id: AtomicU64,
}

impl ResolveEventRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        ResolveEventRegistry {
            handlers: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    /// Registers `handler`.
    pub fn add(&self, handler: ModuleResolveHandler) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.insert(id, handler);
        log::debug!("added module resolve handler {:?}", id);
        id
    }

    /// Removes a handler. Returns `false` if `id` was not registered.
    pub fn remove(&self, id: HandlerId) -> bool {
        let removed = self.handlers.remove(&id).is_some();
        log::debug!("removed module resolve handler {:?}: {}", id, removed);
        removed
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Asks every handler registered at the time of the call, oldest first, to resolve a
    /// module. Each is invoked exactly once; the first module produced is returned.
    ///
    /// No lock is held while a handler runs, so handlers may add or remove handlers.
    pub fn notify(&self, args: &ResolveEventArgs) -> Option<ModuleRc> {
        let mut resolved = None;
        for handler in self.snapshot() {
            let module = handler(args);
            if resolved.is_none() {
                resolved = module;
            }
        }

        if resolved.is_none() {
            log::trace!("no handler resolved module '{}'", args.name);
        }
        resolved
    }

    fn snapshot(&self) -> Vec<ModuleResolveHandler> {
        let mut entries: Vec<(HandlerId, ModuleResolveHandler)> = self
            .handlers
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        entries.sort_unstable_by_key(|(id, _)| *id);
        entries.into_iter().map(|(_, handler)| handler).collect()
    }
}

impl Default for ResolveEventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ResolveEventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveEventRegistry")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
