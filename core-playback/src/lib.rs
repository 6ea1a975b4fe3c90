//! # Playback Engine
//!
//! The core of the media client: play queue, playback state machine,
//! source resolution, offline download/cache management, favorites, and
//! the remote-control bridge.
//!
//! ## Overview
//!
//! [`PlayerEngine::start`](engine::PlayerEngine::start) wires the
//! components from an [`EngineConfig`](core_runtime::config::EngineConfig)
//! and returns an [`EngineHandle`](engine::EngineHandle) — the single
//! command surface for the UI and external remote controls. All state
//! flows back through the event bus in `core-runtime`.
//!
//! ## Ownership
//!
//! - The engine task exclusively owns the queue and the playback session.
//! - The download manager exclusively writes the cache store.
//! - The remote-control bridge owns nothing; it relays in both directions.

pub mod cache;
pub mod engine;
pub mod error;
pub mod favorites;
pub mod preferences;
pub mod queue;
pub mod remote;
pub mod resolver;
pub mod session;

pub use cache::{CacheStore, DownloadJob, DownloadManager};
pub use engine::{EngineHandle, PlayerEngine};
pub use error::{EngineError, Result};
pub use favorites::FavoritesLedger;
pub use preferences::Preferences;
pub use queue::{Advance, Previous, Queue, QueueEntry};
pub use remote::RemoteControlBridge;
pub use resolver::SourceResolver;
pub use session::PlaybackSession;
