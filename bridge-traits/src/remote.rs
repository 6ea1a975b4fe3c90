//! Remote Control Surface Abstraction
//!
//! An external transport authority (lock screen, hardware media keys,
//! MPRIS, Bluetooth controls) that both displays playback state and can
//! command it. The surface is a pure peripheral: it renders what it is
//! told and forwards whatever the user presses, with no state of its own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::Result;

/// Snapshot mirrored out to the external control surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowPlaying {
    /// Track title, empty when nothing is loaded.
    pub title: String,
    /// Presenter / artist label.
    pub artist: String,
    /// Artwork URL for lock-screen display, if any.
    pub artwork_url: Option<String>,
    /// Track duration in seconds, when known.
    pub duration_secs: Option<u64>,
    /// Elapsed position in seconds.
    pub elapsed_secs: u64,
    /// Current playback rate.
    pub rate: f32,
    /// Whether the engine is actively playing (false covers paused,
    /// buffering, and stopped states alike; surfaces only draw a binary
    /// play/pause affordance).
    pub is_playing: bool,
}

/// Commands a remote surface can inject.
///
/// External origin is deliberately indistinguishable from UI origin once
/// the command reaches the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteCommand {
    Play,
    Pause,
    Toggle,
    Next,
    Previous,
    /// Seek by a signed number of seconds from the current position.
    SeekRelative(i64),
}

/// Trait for external remote-control surfaces.
///
/// Implementations push [`NowPlaying`] updates to the platform control
/// center and deliver button presses on the command stream, which the
/// remote-control bridge claims exactly once.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::remote::{RemoteControlSurface, NowPlaying};
///
/// async fn mirror(surface: &dyn RemoteControlSurface, snapshot: NowPlaying) -> Result<()> {
///     surface.update_now_playing(snapshot).await
/// }
/// ```
#[async_trait]
pub trait RemoteControlSurface: Send + Sync {
    /// Mirror the current playback state to the external surface.
    async fn update_now_playing(&self, snapshot: NowPlaying) -> Result<()>;

    /// Clear the external surface (nothing playing).
    async fn clear(&self) -> Result<()>;

    /// Claim the surface's inbound command stream.
    ///
    /// Returns `None` on the second and subsequent calls; the
    /// remote-control bridge is the only consumer.
    fn take_command_stream(&self) -> Option<mpsc::UnboundedReceiver<RemoteCommand>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_command_serialization() {
        let cmd = RemoteCommand::SeekRelative(-10);
        let json = serde_json::to_string(&cmd).unwrap();
        let back: RemoteCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }
}
