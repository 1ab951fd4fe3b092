//! Resource handle ownership for the current batch
//!
//! Every binary resource the pipeline exposes for rendering or downloading
//! (original previews, cleaned outputs) is minted through a [`ResourceLedger`].
//! The ledger is the only component that releases handles, and it only does
//! so when the whole batch is discarded.
//!
//! The concrete handle registry sits behind [`ResourceStore`] so embedders can
//! plug in a platform-specific registry (object URLs, shared memory, temp
//! files). [`MemoryStore`] is the in-process registry used by default.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, trace};
use uuid::Uuid;

/// URI scheme prefix minted by [`MemoryStore`]
pub const MEMORY_URI_PREFIX: &str = "blob:unmark/";

/// Opaque reference to binary content
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    id: Uuid,
    uri: String,
}

impl ResourceHandle {
    /// Create a handle from a store-assigned id and URI
    pub fn new<S: Into<String>>(id: Uuid, uri: S) -> Self {
        Self {
            id,
            uri: uri.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Dereferenceable URI used by renderers and download actions
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl std::fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri)
    }
}

/// Platform adapter that backs resource handles
pub trait ResourceStore: Send + Sync {
    /// Register content and return a handle to it
    fn create(&self, bytes: Arc<[u8]>) -> ResourceHandle;

    /// Release a handle. Returns `false` if the handle was not live.
    fn revoke(&self, handle: &ResourceHandle) -> bool;

    /// Look up the content behind a live handle
    fn resolve(&self, handle: &ResourceHandle) -> Option<Arc<[u8]>>;

    /// Number of handles currently live in the store
    fn live_count(&self) -> usize;
}

/// In-process handle registry, modelled on an object-URL table
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<Uuid, Arc<[u8]>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Arc<[u8]>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ResourceStore for MemoryStore {
    fn create(&self, bytes: Arc<[u8]>) -> ResourceHandle {
        let id = Uuid::new_v4();
        self.entries().insert(id, bytes);
        ResourceHandle::new(id, format!("{MEMORY_URI_PREFIX}{id}"))
    }

    fn revoke(&self, handle: &ResourceHandle) -> bool {
        self.entries().remove(&handle.id()).is_some()
    }

    fn resolve(&self, handle: &ResourceHandle) -> Option<Arc<[u8]>> {
        self.entries().get(&handle.id()).cloned()
    }

    fn live_count(&self) -> usize {
        self.entries().len()
    }
}

/// Tracks every handle allocated for the current batch
pub struct ResourceLedger {
    store: Arc<dyn ResourceStore>,
    live: Vec<ResourceHandle>,
}

impl ResourceLedger {
    /// Create a ledger over the given store
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self {
            store,
            live: Vec::new(),
        }
    }

    /// Create a ledger over a fresh [`MemoryStore`]
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Mint a handle for `bytes` and record it as live
    pub fn allocate(&mut self, bytes: Arc<[u8]>) -> ResourceHandle {
        let size = bytes.len();
        let handle = self.store.create(bytes);
        trace!(uri = %handle, size_bytes = size, "Allocated resource handle");
        self.live.push(handle.clone());
        handle
    }

    /// Release every tracked handle and clear tracking
    ///
    /// Returns the number of handles released. Calling this with nothing
    /// tracked is a no-op.
    pub fn release_all(&mut self) -> usize {
        let handles = std::mem::take(&mut self.live);
        let mut released = 0;
        for handle in &handles {
            if self.store.revoke(handle) {
                released += 1;
            } else {
                debug!(uri = %handle, "Handle was already gone from the store");
            }
        }
        if !handles.is_empty() {
            debug!(released, "Released batch resources");
        }
        released
    }

    /// Look up the content behind a tracked handle
    #[must_use]
    pub fn resolve(&self, handle: &ResourceHandle) -> Option<Arc<[u8]>> {
        if self.is_tracked(handle) {
            self.store.resolve(handle)
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_tracked(&self, handle: &ResourceHandle) -> bool {
        self.live.contains(handle)
    }

    /// Number of handles tracked for the current batch
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// The store this ledger allocates from
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ResourceStore> {
        &self.store
    }
}

impl Drop for ResourceLedger {
    fn drop(&mut self) {
        self.release_all();
    }
}
