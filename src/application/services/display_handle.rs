//! Displayable references to in-memory payloads.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::trace;
use uuid::Uuid;

const HANDLE_SCHEME: &str = "blob:folio/";

/// Registry of live payload handles.
///
/// Cloning shares the registry.
#[derive(Clone, Default)]
pub struct HandleRegistry {
    handles: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl std::fmt::Debug for HandleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("live", &self.live_count())
            .finish()
    }
}

impl HandleRegistry {
    /// Creates empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `payload` and returns a handle that releases it on drop.
    #[must_use]
    pub fn create(&self, payload: Bytes) -> DisplayHandle {
        let url = format!("{HANDLE_SCHEME}{}", Uuid::new_v4());
        let size = payload.len();
        self.handles.write().insert(url.clone(), payload);
        trace!(url = %url, size, "Created display handle");
        DisplayHandle {
            url,
            size,
            registry: self.clone(),
        }
    }

    /// Returns the payload behind a live handle url.
    #[must_use]
    pub fn resolve(&self, url: &str) -> Option<Bytes> {
        self.handles.read().get(url).cloned()
    }

    /// Number of handles not yet released.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.handles.read().len()
    }

    fn release(&self, url: &str) {
        if self.handles.write().remove(url).is_some() {
            trace!(url = %url, "Released display handle");
        }
    }
}

/// A live reference to a payload, valid until released or dropped.
#[derive(Debug)]
pub struct DisplayHandle {
    url: String,
    size: usize,
    registry: HandleRegistry,
}

impl DisplayHandle {
    /// Returns the handle url.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the payload size in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Releases the handle now.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for DisplayHandle {
    fn drop(&mut self) {
        self.registry.release(&self.url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_resolve() {
        let registry = HandleRegistry::new();

        let handle = registry.create(Bytes::from_static(b"png"));

        assert!(handle.url().starts_with(HANDLE_SCHEME));
        assert_eq!(handle.size(), 3);
        assert_eq!(registry.resolve(handle.url()), Some(Bytes::from_static(b"png")));
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn test_drop_releases() {
        let registry = HandleRegistry::new();
        let handle = registry.create(Bytes::from_static(b"a"));
        let url = handle.url().to_string();

        drop(handle);

        assert_eq!(registry.resolve(&url), None);
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_handles_are_distinct() {
        let registry = HandleRegistry::new();
        let a = registry.create(Bytes::from_static(b"a"));
        let b = registry.create(Bytes::from_static(b"a"));

        assert_ne!(a.url(), b.url());

        a.release();
        assert_eq!(registry.live_count(), 1);
        assert!(registry.resolve(b.url()).is_some());
    }
}
