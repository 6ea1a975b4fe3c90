//! Media Transport Abstraction
//!
//! The transport is the platform playback primitive (AVPlayer, ExoPlayer,
//! a gstreamer pipeline, ...) that actually decodes and renders audio or
//! video. The engine drives it through [`MediaTransport`] and observes it
//! through a one-shot event stream; decoding internals never cross this
//! boundary.
//!
//! ## Threading Model
//!
//! Implementations must be `Send + Sync`; control methods are expected to
//! be fast and non-blocking, with long-running work (network reads, codec
//! startup) reported asynchronously via [`TransportEvent`]s.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::Result;

/// Source of media data handed to the transport after resolution.
///
/// Either a fully downloaded local file or a remote stream URL with the
/// authorization headers required to open it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Media file stored locally on the filesystem.
    LocalFile {
        /// Absolute path to the media file
        path: PathBuf,
    },

    /// Media stream from a remote HTTP(S) endpoint.
    RemoteStream {
        /// Full URL to the media resource
        url: String,
        /// HTTP headers to include in the request (e.g., Authorization)
        headers: HashMap<String, String>,
    },
}

impl MediaSource {
    /// Returns `true` if this source requires network access.
    pub fn is_remote(&self) -> bool {
        matches!(self, MediaSource::RemoteStream { .. })
    }
}

/// Events reported by the transport while it owns a loaded source.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The source is loaded and playable; duration is known when the
    /// container reports one.
    Ready { duration: Option<Duration> },
    /// The transport stalled waiting for data.
    Buffering,
    /// Periodic position report while playing.
    Position(Duration),
    /// The current source played to its end.
    Ended,
    /// The transport failed. `transient` marks faults that a reload of
    /// the same source may recover from (network hiccups), as opposed to
    /// missing files or undecodable streams.
    Fault { message: String, transient: bool },
}

/// Trait for platform media transports.
///
/// One source is loaded at a time; `load` replaces any previous source.
/// Events for the loaded source arrive on the stream handed out by
/// [`take_event_stream`](MediaTransport::take_event_stream), which the
/// engine claims exactly once at startup.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::transport::{MediaTransport, MediaSource};
/// use std::time::Duration;
///
/// async fn start(transport: &dyn MediaTransport, source: MediaSource) -> Result<()> {
///     transport.load(source, Duration::ZERO).await?;
///     transport.play().await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait MediaTransport: Send + Sync {
    /// Load a source and prepare it for playback starting at `start_at`.
    ///
    /// Emits `TransportEvent::Ready` (possibly after `Buffering`) once
    /// playable, or `TransportEvent::Fault` if the source cannot be opened.
    async fn load(&self, source: MediaSource, start_at: Duration) -> Result<()>;

    /// Begin or resume rendering the loaded source.
    async fn play(&self) -> Result<()>;

    /// Pause rendering without releasing the source.
    async fn pause(&self) -> Result<()>;

    /// Stop rendering and release the loaded source.
    async fn stop(&self) -> Result<()>;

    /// Seek to an absolute position in the loaded source.
    async fn seek(&self, position: Duration) -> Result<()>;

    /// Set the playback rate (1.0 = normal speed).
    async fn set_rate(&self, rate: f32) -> Result<()>;

    /// Current playback position of the loaded source.
    async fn position(&self) -> Result<Duration>;

    /// Claim the transport's event stream.
    ///
    /// Returns `None` on the second and subsequent calls; the engine is
    /// the only consumer.
    fn take_event_stream(&self) -> Option<mpsc::UnboundedReceiver<TransportEvent>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_source_classification() {
        let local = MediaSource::LocalFile {
            path: "/media/recording.mp3".into(),
        };
        assert!(!local.is_remote());

        let remote = MediaSource::RemoteStream {
            url: "https://example.com/stream".to_string(),
            headers: HashMap::new(),
        };
        assert!(remote.is_remote());
    }
}
