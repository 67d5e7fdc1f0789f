//! Handle-based preview store

use std::collections::HashMap;
use std::sync::Arc;

use piiguard_core::{PreviewHandle, PreviewSlot};
use tracing::{debug, trace};
use uuid::Uuid;

/// Counters for issued and released handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreviewStats {
    pub created: u64,
    pub released: u64,
    pub live: usize,
}

/// Owns the bytes behind every live preview handle.
///
/// Each slot holds at most one handle. Installing into an occupied slot
/// releases the previous handle before the new one becomes visible.
#[derive(Default)]
pub struct PreviewStore {
    blobs: HashMap<Uuid, Arc<[u8]>>,
    slots: HashMap<PreviewSlot, PreviewHandle>,
    created: u64,
    released: u64,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register content and hand back a reference to it. Never fails.
    pub fn create_handle(&mut self, content: impl Into<Arc<[u8]>>, media_type: &str) -> PreviewHandle {
        let content = content.into();
        let digest = blake3::hash(&content).to_hex().to_string();
        let handle = PreviewHandle::new(media_type.to_string(), content.len(), digest);

        self.blobs.insert(handle.id, content);
        self.created += 1;
        trace!(handle = %handle.url(), size = handle.size_bytes, "preview handle created");
        handle
    }

    /// Release a handle. Releasing `None` or an already released handle is a no-op.
    ///
    /// Returns whether this call freed the content.
    pub fn release_handle(&mut self, handle: Option<&PreviewHandle>) -> bool {
        let Some(handle) = handle else {
            return false;
        };

        self.slots.retain(|_, held| held.id != handle.id);

        if self.blobs.remove(&handle.id).is_some() {
            self.released += 1;
            trace!(handle = %handle.url(), "preview handle released");
            true
        } else {
            false
        }
    }

    /// Replace the handle in `slot`, releasing the old one first
    pub fn install(
        &mut self,
        slot: PreviewSlot,
        content: impl Into<Arc<[u8]>>,
        media_type: &str,
    ) -> PreviewHandle {
        self.clear(slot);
        let handle = self.create_handle(content, media_type);
        debug!(slot = slot.as_str(), handle = %handle.url(), "preview installed");
        self.slots.insert(slot, handle.clone());
        handle
    }

    /// Release whatever `slot` holds. Returns whether anything was released.
    pub fn clear(&mut self, slot: PreviewSlot) -> bool {
        match self.slots.remove(&slot) {
            Some(old) => self.release_handle(Some(&old)),
            None => false,
        }
    }

    pub fn slot(&self, slot: PreviewSlot) -> Option<&PreviewHandle> {
        self.slots.get(&slot)
    }

    /// Bytes behind a live handle
    pub fn content(&self, handle: &PreviewHandle) -> Option<&[u8]> {
        self.blobs.get(&handle.id).map(|c| c.as_ref())
    }

    pub fn is_live(&self, handle: &PreviewHandle) -> bool {
        self.blobs.contains_key(&handle.id)
    }

    pub fn live_count(&self) -> usize {
        self.blobs.len()
    }

    pub fn stats(&self) -> PreviewStats {
        PreviewStats {
            created: self.created,
            released: self.released,
            live: self.blobs.len(),
        }
    }

    /// Release every live handle, slotted or not
    pub fn release_all(&mut self) {
        self.slots.clear();
        let count = self.blobs.len();
        self.blobs.clear();
        self.released += count as u64;
        if count > 0 {
            debug!(count, "released all preview handles");
        }
    }
}

impl Drop for PreviewStore {
    fn drop(&mut self) {
        self.release_all();
    }
}
