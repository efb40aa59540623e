//! Image cache error types.

use thiserror::Error;

/// Result type for image cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Image cache error variants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum CacheError {
    #[error("image cache store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("network error fetching image: {message}")]
    Network {
        message: String,
        status: Option<u16>,
    },

    #[error("failed to write image cache entry: {message}")]
    StoreWriteFailure { message: String },

    #[error("failed to read image cache entry: {message}")]
    StoreReadFailure { message: String },
}

impl CacheError {
    /// Creates store unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    /// Creates network error without an HTTP status.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            status: None,
        }
    }

    /// Creates network error for a non-success HTTP status.
    #[must_use]
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            status: Some(status),
        }
    }

    /// Creates write failure error.
    #[must_use]
    pub fn write_failed(message: impl Into<String>) -> Self {
        Self::StoreWriteFailure {
            message: message.into(),
        }
    }

    /// Creates read failure error.
    #[must_use]
    pub fn read_failed(message: impl Into<String>) -> Self {
        Self::StoreReadFailure {
            message: message.into(),
        }
    }

    /// Returns whether error came from the network.
    #[must_use]
    pub const fn is_network_error(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Returns whether error came from the local store.
    #[must_use]
    pub const fn is_store_error(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. }
                | Self::StoreWriteFailure { .. }
                | Self::StoreReadFailure { .. }
        )
    }

    /// Returns the HTTP status for network errors, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Network { status, .. } => *status,
            _ => None,
        }
    }
}
