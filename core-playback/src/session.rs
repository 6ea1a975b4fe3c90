//! # Playback Session
//!
//! The live, singleton playback state owned exclusively by the engine
//! task. Everything other components learn about it comes from the
//! [`SessionSnapshot`]s published on the event bus.

use core_catalog::Track;
use core_runtime::events::{PlaybackState, SessionSnapshot, SourceKind};
use std::time::Duration;

/// Live state for the track currently held by the transport.
///
/// Created when playback first starts, carried across pause/resume, and
/// dropped when the queue is cleared or a fatal error goes unretried.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    /// The track the transport is (or is becoming) loaded with.
    pub track: Track,
    /// Transport state.
    pub state: PlaybackState,
    /// Elapsed position; monotonic while playing.
    pub elapsed: Duration,
    /// Playback rate.
    pub rate: f32,
    /// Where the bytes come from, once resolved.
    pub source_kind: Option<SourceKind>,
}

impl PlaybackSession {
    /// Start a session in `Loading` for `track`, resuming at `elapsed`.
    pub fn loading(track: Track, elapsed: Duration, rate: f32) -> Self {
        Self {
            track,
            state: PlaybackState::Loading,
            elapsed,
            rate,
            source_kind: None,
        }
    }

    /// Published view of this session.
    pub fn snapshot(&self, queue_index: Option<usize>, queue_length: usize) -> SessionSnapshot {
        SessionSnapshot {
            track_id: Some(self.track.id.to_string()),
            state: self.state,
            elapsed_secs: self.elapsed.as_secs(),
            rate: self.rate,
            source_kind: self.source_kind,
            queue_index,
            queue_length,
        }
    }

    /// Track duration as a `Duration`, when the catalog reports one.
    pub fn duration(&self) -> Option<Duration> {
        self.track.duration_secs.map(Duration::from_secs)
    }
}
