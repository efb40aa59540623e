//! Port definition for the local image cache store.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::errors::CacheResult;

/// Outcome of a store write that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The entry was persisted.
    Stored,
    /// The store is unavailable or closed; nothing was written.
    Skipped,
}

/// Port for address-keyed payload storage with expiry.
///
/// Implementations are fail-open: an unavailable store behaves as an empty
/// one, so only genuine write failures surface as errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStorePort: Send + Sync {
    /// Returns the payload stored under `key` if present and unexpired.
    async fn get(&self, key: &str) -> Option<Bytes>;

    /// Stores `payload` under `key`, replacing any previous entry.
    async fn set(&self, key: &str, payload: Bytes) -> CacheResult<WriteOutcome>;

    /// Removes the entry for `key`, if any.
    async fn delete(&self, key: &str);

    /// Removes every entry.
    async fn clear(&self);
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;

    use parking_lot::Mutex;

    /// In-memory store without expiry, for service tests.
    #[derive(Default)]
    pub struct InMemoryStore {
        entries: Mutex<HashMap<String, Bytes>>,
    }

    impl InMemoryStore {
        /// Creates empty store.
        pub fn new() -> Self {
            Self::default()
        }

        /// Returns true if the key has an entry.
        pub fn contains(&self, key: &str) -> bool {
            self.entries.lock().contains_key(key)
        }

        /// Number of entries.
        pub fn len(&self) -> usize {
            self.entries.lock().len()
        }
    }

    #[async_trait]
    impl CacheStorePort for InMemoryStore {
        async fn get(&self, key: &str) -> Option<Bytes> {
            self.entries.lock().get(key).cloned()
        }

        async fn set(&self, key: &str, payload: Bytes) -> CacheResult<WriteOutcome> {
            self.entries.lock().insert(key.to_string(), payload);
            Ok(WriteOutcome::Stored)
        }

        async fn delete(&self, key: &str) {
            self.entries.lock().remove(key);
        }

        async fn clear(&self) {
            self.entries.lock().clear();
        }
    }
}
