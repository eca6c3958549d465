//! Skylight sync - client-side incremental synchronization core
//!
//! This library keeps the Skylight mobile client's local cache consistent with
//! the server: paginated list fetching with de-duplication and end-of-data
//! detection, and real-time reconciliation of new messages, seen receipts and
//! optimistic sends against the conversation list and the open timeline.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod cursor;
pub mod events;
pub mod feed;
pub mod gate;
pub mod merge;
pub mod model;
pub mod search;
pub mod settings;
pub mod store;
pub mod sync;

#[cfg(test)]
mod tests;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for sync operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network or timeout failure; retried only by a later user action
    #[error("Network error: {0}")]
    Network(String),

    /// Business error reported by the server
    #[error("Server error: {0}")]
    Graph(String),

    /// Request conflicts with existing server state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Local state did not match what an event expected
    #[error("State invariant violated: {0}")]
    StateInvariant(String),

    /// Real-time event with an unrecognised name
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether a later retry of the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

/// Initialize logging for the host application
pub fn init() {
    tracing_subscriber::fmt::init();
}
