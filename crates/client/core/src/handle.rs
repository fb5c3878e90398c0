//! Revocable local resource handles.
//!
//! Decrypted or downloaded bytes are registered in a [`HandleStore`] and
//! referenced through a [`LocalHandle`]. A handle is revoked exactly once:
//! explicitly through [`LocalHandle::revoke`] or implicitly on drop.
//!
//! A [`HandleSlot`] is the per-consumer owner of handles. Each load begins a
//! new generation, which releases whatever the slot held; results of a load
//! whose generation has been superseded are released instead of installed.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

struct Resource {
    bytes: Arc<[u8]>,
    mime_type: String,
}

#[derive(Default)]
struct StoreState {
    resources: HashMap<u64, Resource>,
    next_id: u64,
    created: u64,
    revoked: u64,
}

/// Registry of live local resources.
#[derive(Clone, Default)]
pub struct HandleStore {
    state: Arc<Mutex<StoreState>>,
}

impl HandleStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // Poisoning only happens if a holder panicked; the map itself stays consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register bytes and return the owning handle.
    pub fn create(&self, bytes: Vec<u8>, mime_type: &str) -> LocalHandle {
        let mut state = self.lock();
        state.next_id += 1;
        state.created += 1;
        let id = state.next_id;
        state.resources.insert(
            id,
            Resource {
                bytes: bytes.into(),
                mime_type: mime_type.to_string(),
            },
        );
        tracing::debug!("Created local handle {} ({})", id, mime_type);

        LocalHandle {
            id,
            mime_type: mime_type.to_string(),
            store: self.clone(),
            revoked: AtomicBool::new(false),
        }
    }

    /// Bytes behind a live handle id.
    pub fn resolve(&self, id: u64) -> Option<Arc<[u8]>> {
        self.lock().resources.get(&id).map(|r| Arc::clone(&r.bytes))
    }

    pub fn mime_type(&self, id: u64) -> Option<String> {
        self.lock().resources.get(&id).map(|r| r.mime_type.clone())
    }

    pub fn is_live(&self, id: u64) -> bool {
        self.lock().resources.contains_key(&id)
    }

    pub fn live_count(&self) -> usize {
        self.lock().resources.len()
    }

    pub fn created_count(&self) -> u64 {
        self.lock().created
    }

    pub fn revoked_count(&self) -> u64 {
        self.lock().revoked
    }

    fn release(&self, id: u64) {
        let mut state = self.lock();
        if state.resources.remove(&id).is_some() {
            state.revoked += 1;
            tracing::debug!("Revoked local handle {}", id);
        }
    }
}

/// Owning reference to one local resource.
pub struct LocalHandle {
    id: u64,
    mime_type: String,
    store: HandleStore,
    revoked: AtomicBool,
}

impl LocalHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Renderable reference to the resource.
    pub fn uri(&self) -> String {
        format!("blob:local/{}", self.id)
    }

    pub fn bytes(&self) -> Option<Arc<[u8]>> {
        self.store.resolve(self.id)
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked.load(Ordering::SeqCst)
    }

    /// Release the resource. Calling it again is a no-op.
    pub fn revoke(&self) {
        if !self.revoked.swap(true, Ordering::SeqCst) {
            self.store.release(self.id);
        }
    }
}

impl Drop for LocalHandle {
    fn drop(&mut self) {
        self.revoke();
    }
}

impl fmt::Debug for LocalHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalHandle")
            .field("id", &self.id)
            .field("mime_type", &self.mime_type)
            .field("revoked", &self.is_revoked())
            .finish()
    }
}

/// Token identifying one load on a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Generation(u64);

#[derive(Default)]
struct SlotState {
    generation: u64,
    handles: Vec<LocalHandle>,
    closed: bool,
}

/// Per-consumer holder of the handles produced by its latest load.
#[derive(Default)]
pub struct HandleSlot {
    state: Mutex<SlotState>,
}

impl HandleSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a new load. Handles from the previous load are revoked now.
    pub fn begin(&self) -> Generation {
        let (generation, previous) = {
            let mut state = self.lock();
            state.generation += 1;
            (state.generation, std::mem::take(&mut state.handles))
        };
        revoke_all(previous);
        Generation(generation)
    }

    /// Whether `generation` is still the latest load.
    pub fn is_current(&self, generation: Generation) -> bool {
        let state = self.lock();
        !state.closed && state.generation == generation.0
    }

    /// Install the handles of `generation`.
    ///
    /// Returns `false` and revokes `handles` when the load was superseded or
    /// the slot was closed.
    pub fn install(&self, generation: Generation, handles: Vec<LocalHandle>) -> bool {
        let (installed, displaced) = {
            let mut state = self.lock();
            if state.closed || state.generation != generation.0 {
                (false, handles)
            } else {
                let displaced = std::mem::replace(&mut state.handles, handles);
                (true, displaced)
            }
        };
        revoke_all(displaced);
        installed
    }

    /// Ids of the installed handles.
    pub fn handle_ids(&self) -> Vec<u64> {
        self.lock().handles.iter().map(LocalHandle::id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().handles.is_empty()
    }

    /// Revoke everything and reject later installs.
    pub fn close(&self) {
        let handles = {
            let mut state = self.lock();
            state.closed = true;
            std::mem::take(&mut state.handles)
        };
        revoke_all(handles);
    }
}

impl Drop for HandleSlot {
    fn drop(&mut self) {
        self.close();
    }
}

fn revoke_all(handles: Vec<LocalHandle>) {
    for handle in &handles {
        handle.revoke();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revoke_is_idempotent() {
        let store = HandleStore::new();
        let handle = store.create(vec![1, 2, 3], "image/png");
        assert!(store.is_live(handle.id()));

        handle.revoke();
        handle.revoke();
        drop(handle);

        assert_eq!(store.live_count(), 0);
        assert_eq!(store.revoked_count(), 1);
    }

    #[test]
    fn drop_revokes() {
        let store = HandleStore::new();
        {
            let _handle = store.create(vec![0], "image/jpeg");
            assert_eq!(store.live_count(), 1);
        }
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn new_load_revokes_previous_before_install() {
        let store = HandleStore::new();
        let slot = HandleSlot::new();

        let first = slot.begin();
        let a = store.create(b"a".to_vec(), "image/png");
        let a_id = a.id();
        assert!(slot.install(first, vec![a]));

        let second = slot.begin();
        assert!(!store.is_live(a_id), "previous handle released when a new load starts");

        let b = store.create(b"b".to_vec(), "image/png");
        let b_id = b.id();
        assert!(slot.install(second, vec![b]));
        assert_eq!(slot.handle_ids(), vec![b_id]);
        assert_eq!(store.revoked_count(), 1);
    }

    #[test]
    fn stale_generation_is_released() {
        let store = HandleStore::new();
        let slot = HandleSlot::new();

        let stale = slot.begin();
        let _fresh = slot.begin();

        let late = store.create(b"late".to_vec(), "image/png");
        assert!(!slot.install(stale, vec![late]));
        assert_eq!(store.live_count(), 0);
        assert!(slot.is_empty());
    }

    #[test]
    fn closed_slot_rejects_installs() {
        let store = HandleStore::new();
        let slot = HandleSlot::new();
        let generation = slot.begin();
        slot.close();

        assert!(!slot.is_current(generation));
        assert!(!slot.install(generation, vec![store.create(vec![1], "image/png")]));
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn dropping_slot_releases_handles() {
        let store = HandleStore::new();
        {
            let slot = HandleSlot::new();
            let generation = slot.begin();
            slot.install(
                generation,
                vec![store.create(vec![1], "image/png"), store.create(vec![2], "image/png")],
            );
            assert_eq!(store.live_count(), 2);
        }
        assert_eq!(store.live_count(), 0);
        assert_eq!(store.revoked_count(), 2);
    }
}
