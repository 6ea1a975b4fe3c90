//! # Event Bus System
//!
//! Provides an event-driven architecture for the Media Client Core using
//! `tokio::sync::broadcast`. All engine components publish state changes
//! through one bus; observers (UI, remote-control bridge) subscribe rather
//! than poll.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for each domain
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//! - **Subscription Management**: Multiple subscribers listen independently
//!
//! ## Ordering
//!
//! The engine task is the sole publisher of queue and playback events, so
//! their causal order on the channel matches the order of state
//! transitions. Download events are published from per-job tasks and are
//! ordered only per track.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, EngineEvent, FavoritesEvent};
//!
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(EngineEvent::Favorites(FavoritesEvent::Toggled {
//!         track_id: "rec-401".to_string(),
//!         is_favorite: true,
//!     }))
//!     .ok();
//! ```
//!
//! ## Error Handling
//!
//! The bus uses `tokio::sync::broadcast`:
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Non-fatal;
//!   the subscriber keeps receiving new events.
//! - **`RecvError::Closed`**: all senders dropped; treat as shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Balances memory usage with the ability to absorb bursts of download
/// progress events. Subscribers that can't keep up receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Shared Playback Vocabulary
// ============================================================================

/// Transport state of the playback state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Nothing loaded; initial state.
    Idle,
    /// Source resolution and transport load in progress.
    Loading,
    /// Transport stalled waiting for data.
    Buffering,
    /// Actively rendering.
    Playing,
    /// Paused by user or remote command.
    Paused,
    /// Queue exhausted; terminal until a new play command.
    Ended,
    /// Fatal transport fault; terminal until retry or a new play command.
    Error,
}

impl PlaybackState {
    /// Returns `true` while a `play_pause` toggle has an effect.
    pub fn is_toggleable(&self) -> bool {
        matches!(
            self,
            PlaybackState::Playing | PlaybackState::Buffering | PlaybackState::Paused
        )
    }

    /// Returns `true` for states that hold a live transport session.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            PlaybackState::Loading
                | PlaybackState::Buffering
                | PlaybackState::Playing
                | PlaybackState::Paused
        )
    }
}

/// Where the current track's bytes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Local,
    Remote,
}

/// Lifecycle of a download job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    /// Waiting for a download slot.
    Queued,
    /// Transferring bytes.
    Active,
    /// Stopped on error; no retry at this layer.
    Failed,
    /// Fully downloaded, verified, and promoted into the cache.
    Complete,
    /// Cancelled cooperatively; partial bytes discarded.
    Cancelled,
}

impl DownloadStatus {
    /// Returns `true` once the job can never produce further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DownloadStatus::Failed | DownloadStatus::Complete | DownloadStatus::Cancelled
        )
    }
}

/// Published view of the live playback session.
///
/// Carried on every `PlaybackEvent::StateChanged`; observers never read
/// engine state directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Current track id, if a session exists.
    pub track_id: Option<String>,
    /// Transport state.
    pub state: PlaybackState,
    /// Elapsed position in seconds, monotonic while playing.
    pub elapsed_secs: u64,
    /// Playback rate.
    pub rate: f32,
    /// Source kind of the current track, once resolved.
    pub source_kind: Option<SourceKind>,
    /// Current queue cursor, when the queue is non-empty.
    pub queue_index: Option<usize>,
    /// Number of entries in the queue.
    pub queue_length: usize,
}

impl SessionSnapshot {
    /// Snapshot of an engine with no session.
    pub fn idle() -> Self {
        Self {
            track_id: None,
            state: PlaybackState::Idle,
            elapsed_secs: 0,
            rate: 1.0,
            source_kind: None,
            queue_index: None,
            queue_length: 0,
        }
    }
}

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
///
/// This is the main event type published and received through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum EngineEvent {
    /// Queue content or cursor changes
    Queue(QueueEvent),
    /// Playback state machine transitions
    Playback(PlaybackEvent),
    /// Download progress and completion
    Download(DownloadEvent),
    /// Favorite set mutations
    Favorites(FavoritesEvent),
}

impl EngineEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            EngineEvent::Queue(e) => e.description(),
            EngineEvent::Playback(e) => e.description(),
            EngineEvent::Download(e) => e.description(),
            EngineEvent::Favorites(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            EngineEvent::Playback(PlaybackEvent::StateChanged { session })
                if session.state == PlaybackState::Error =>
            {
                EventSeverity::Error
            }
            EngineEvent::Download(DownloadEvent::Progress { status, .. })
                if *status == DownloadStatus::Failed =>
            {
                EventSeverity::Error
            }
            EngineEvent::Queue(_) => EventSeverity::Info,
            EngineEvent::Favorites(_) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Queue Events
// ============================================================================

/// Events related to the play queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum QueueEvent {
    /// Queue content was replaced or the cursor moved.
    Changed {
        /// Number of entries after the mutation.
        length: usize,
        /// Cursor position, when the queue is non-empty.
        current_index: Option<usize>,
        /// Track id at the cursor.
        current_track_id: Option<String>,
    },
}

impl QueueEvent {
    fn description(&self) -> &str {
        match self {
            QueueEvent::Changed { .. } => "Queue changed",
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events related to the playback state machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A state transition or position change occurred.
    StateChanged {
        /// Full session view after the transition.
        session: SessionSnapshot,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::StateChanged { .. } => "Playback state changed",
        }
    }
}

// ============================================================================
// Download Events
// ============================================================================

/// Events related to background downloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum DownloadEvent {
    /// Progress or terminal status for a download job.
    Progress {
        /// The track being downloaded.
        track_id: String,
        /// Bytes transferred so far.
        bytes_done: u64,
        /// Total bytes, when the server reports a length.
        bytes_total: Option<u64>,
        /// Job status at the time of the report.
        status: DownloadStatus,
    },
}

impl DownloadEvent {
    fn description(&self) -> &str {
        match self {
            DownloadEvent::Progress { .. } => "Download progress",
        }
    }
}

// ============================================================================
// Favorites Events
// ============================================================================

/// Events related to the favorite set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum FavoritesEvent {
    /// A track was favorited or unfavorited.
    Toggled {
        /// The track whose membership flipped.
        track_id: String,
        /// Membership after the flip.
        is_favorite: bool,
    },
}

impl FavoritesEvent {
    fn description(&self) -> &str {
        match self {
            FavoritesEvent::Toggled { .. } => "Favorite toggled",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to engine events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events buffered per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error when there are no active subscribers.
    pub fn emit(&self, event: EngineEvent) -> Result<usize, SendError<EngineEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all
    /// future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&EngineEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with filtering capabilities.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, EngineEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut downloads = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, EngineEvent::Download(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<EngineEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<EngineEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&EngineEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n`
    /// events, `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<EngineEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<EngineEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
