//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback core and
//! platform-specific implementations. Each trait represents a capability
//! that the core requires but that must be implemented differently per
//! platform (desktop, iOS, Android).
//!
//! ## Traits
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations for streams and downloads
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Media file I/O for the offline cache
//!
//! ### Storage
//! - [`SettingsStore`](storage::SettingsStore) - Key-value persistence (favorites, cache index, preferences)
//!
//! ### Platform Integration
//! - [`MediaTransport`](transport::MediaTransport) - The platform playback primitive the engine drives
//! - [`RemoteControlSurface`](remote::RemoteControlSurface) - Lock-screen / hardware-key control surface
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability
//! is missing:
//!
//! ```ignore
//! use core_runtime::error::Error;
//!
//! let transport = config.media_transport
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "MediaTransport".to_string(),
//!         message: "No media transport provided. \
//!                  Inject the platform player adapter before building the engine.".to_string()
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Platform implementations should convert platform-specific errors to
//! `BridgeError` and provide actionable messages with context.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe
//! concurrent usage across async tasks.

pub mod error;
pub mod http;
pub mod remote;
pub mod storage;
pub mod transport;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{ByteStream, HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use remote::{NowPlaying, RemoteCommand, RemoteControlSurface};
pub use storage::{FileMetadata, FileSystemAccess, SettingsStore};
pub use transport::{MediaSource, MediaTransport, TransportEvent};
