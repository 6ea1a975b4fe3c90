//! # Engine Error Types
//!
//! Error taxonomy for the playback engine. `EndOfQueue` is deliberately
//! absent: reaching the end of the queue is a normal navigation outcome
//! (see [`crate::queue::Advance`]), not a failure.

use thiserror::Error;

/// Errors that can occur during engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    // ========================================================================
    // Queue / Resolution Errors
    // ========================================================================
    /// `replace` was given an empty item list together with a start id.
    #[error("Queue is empty")]
    EmptyQueue,

    /// The track id is not known to the catalog registry.
    #[error("Unknown track: {0}")]
    UnknownTrack(String),

    // ========================================================================
    // Playback Errors
    // ========================================================================
    /// Transport fault, surfaced after the single silent retry.
    #[error("Playback failed: {0}")]
    Playback(String),

    /// A command arrived that the current state cannot accept.
    #[error("Invalid playback operation: {0}")]
    InvalidOperation(String),

    // ========================================================================
    // Cache / Download Errors
    // ========================================================================
    /// Network or storage fault during a background fetch.
    #[error("Download failed for {track_id}: {message}")]
    DownloadFailed { track_id: String, message: String },

    /// Cache verification failed; the entry has been removed.
    #[error("Cache entry corrupt for track {0}")]
    CacheCorrupt(String),

    // ========================================================================
    // Infrastructure Errors
    // ========================================================================
    /// The engine configuration failed validation at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The engine task has shut down; commands can no longer be delivered.
    #[error("Engine is not running")]
    EngineStopped,

    /// Error from a platform bridge.
    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    /// Error from the catalog boundary.
    #[error("Catalog error: {0}")]
    Catalog(#[from] core_catalog::CatalogError),
}

impl EngineError {
    /// Returns `true` if this error is transient and the operation can be
    /// retried with a chance of success.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::Playback(_) | EngineError::DownloadFailed { .. }
        )
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
