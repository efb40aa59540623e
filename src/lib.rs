//! folio-media - cached, responsive image delivery.
//!
//! Builds transformation addresses for an image CDN, serves their payloads
//! through a persistent expiring cache store, and hands them to consumers as
//! releasable display handles.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the fetch orchestrator and image consumers.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing the CDN builder, cache store and config.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "folio-media";
