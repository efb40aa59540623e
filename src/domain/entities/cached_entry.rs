//! Cached payload records.

use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Default time-to-live for cached payloads, in days.
pub const DEFAULT_TTL_DAYS: u32 = 30;

/// Returns the default TTL.
#[must_use]
pub fn default_ttl() -> TimeDelta {
    ttl_from_days(DEFAULT_TTL_DAYS)
}

/// Converts a day count into a TTL, saturating on overflow.
#[must_use]
pub fn ttl_from_days(days: u32) -> TimeDelta {
    TimeDelta::try_days(i64::from(days)).unwrap_or(TimeDelta::MAX)
}

/// Persisted metadata describing a cached payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryHeader {
    /// Full resolved address the payload was fetched from.
    pub key: String,
    /// When the entry was written.
    pub stored_at: DateTime<Utc>,
    /// When the entry stops being served.
    pub expires_at: DateTime<Utc>,
    /// Payload length in bytes.
    pub size: u64,
}

impl EntryHeader {
    /// Returns true if the entry is no longer valid at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A payload stored under its address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    /// Full resolved address; unique per store.
    pub key: String,
    /// Raw image bytes.
    pub payload: Bytes,
    /// When the entry was written.
    pub stored_at: DateTime<Utc>,
    /// When the entry stops being served.
    pub expires_at: DateTime<Utc>,
}

impl CachedEntry {
    /// Creates an entry written at `now` that lives for `ttl`.
    #[must_use]
    pub fn new(key: impl Into<String>, payload: Bytes, now: DateTime<Utc>, ttl: TimeDelta) -> Self {
        let expires_at = now
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            key: key.into(),
            payload,
            stored_at: now,
            expires_at,
        }
    }

    /// Rebuilds an entry from its persisted header and payload.
    #[must_use]
    pub fn from_parts(header: EntryHeader, payload: Bytes) -> Self {
        Self {
            key: header.key,
            payload,
            stored_at: header.stored_at,
            expires_at: header.expires_at,
        }
    }

    /// Returns the persisted header for this entry.
    #[must_use]
    pub fn header(&self) -> EntryHeader {
        EntryHeader {
            key: self.key.clone(),
            stored_at: self.stored_at,
            expires_at: self.expires_at,
            size: self.payload.len() as u64,
        }
    }

    /// Returns true if the entry is no longer valid at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Where a payload was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSource {
    /// Served from the local cache store.
    Cache,
    /// Downloaded from the network.
    Network,
}

impl std::fmt::Display for PayloadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Network => write!(f, "network"),
        }
    }
}
