//! # Remote Control Bridge
//!
//! Two-way adapter between the engine and an external transport authority
//! (lock screen, hardware media keys). Outbound: every queue or playback
//! event triggers a fresh mirror of the session onto the surface.
//! Inbound: surface commands are forwarded as ordinary engine commands,
//! indistinguishable from UI origin.
//!
//! The bridge owns no state. It never acts on what it last mirrored:
//! both directions re-read the live session from the engine first, so an
//! external event that races a state change can never apply a stale
//! decision.

use crate::engine::EngineHandle;
use bridge_traits::remote::{NowPlaying, RemoteCommand, RemoteControlSurface};
use core_catalog::TrackId;
use core_runtime::events::{EngineEvent, PlaybackState, RecvError, SessionSnapshot};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Message-passing relay between the engine and a remote surface.
pub struct RemoteControlBridge;

impl RemoteControlBridge {
    /// Spawn the bridge task for `surface`.
    ///
    /// The task runs until the engine shuts down or the surface drops its
    /// command stream and the event bus closes.
    pub fn spawn(surface: Arc<dyn RemoteControlSurface>, handle: EngineHandle) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut events = handle.events();
            let mut commands = surface.take_command_stream();
            if commands.is_none() {
                warn!("Remote command stream already claimed; mirroring only");
            }

            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Ok(EngineEvent::Playback(_)) | Ok(EngineEvent::Queue(_)) => {
                            if mirror(&surface, &handle).await.is_err() {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(missed)) => {
                            // Mirroring always re-reads the live session,
                            // so skipped events cost nothing.
                            debug!(missed, "Remote bridge lagged behind events");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    command = recv_command(&mut commands) => match command {
                        Some(command) => {
                            if forward(command, &handle).await.is_err() {
                                break;
                            }
                        }
                        None => commands = None,
                    },
                }
            }

            debug!("Remote control bridge stopped");
        })
    }
}

async fn recv_command(
    commands: &mut Option<tokio::sync::mpsc::UnboundedReceiver<RemoteCommand>>,
) -> Option<RemoteCommand> {
    match commands {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Push the engine's current session onto the external surface.
async fn mirror(
    surface: &Arc<dyn RemoteControlSurface>,
    handle: &EngineHandle,
) -> Result<(), ()> {
    let snapshot = handle.session().await.map_err(|_| ())?;

    let Some(track_id) = snapshot.track_id.clone() else {
        if let Err(e) = surface.clear().await {
            warn!("Failed to clear remote surface: {}", e);
        }
        return Ok(());
    };

    let track = handle.track(&TrackId::new(track_id));
    let now_playing = build_now_playing(&snapshot, track.as_ref());

    if let Err(e) = surface.update_now_playing(now_playing).await {
        warn!("Failed to mirror remote state: {}", e);
    }
    Ok(())
}

fn build_now_playing(
    snapshot: &SessionSnapshot,
    track: Option<&core_catalog::Track>,
) -> NowPlaying {
    NowPlaying {
        title: track.map(|t| t.title.clone()).unwrap_or_default(),
        artist: track.map(|t| t.artist.clone()).unwrap_or_default(),
        artwork_url: track.and_then(|t| t.artwork_url.clone()),
        duration_secs: track.and_then(|t| t.duration_secs),
        elapsed_secs: snapshot.elapsed_secs,
        rate: snapshot.rate,
        is_playing: matches!(
            snapshot.state,
            PlaybackState::Playing | PlaybackState::Buffering
        ),
    }
}

/// Forward an inbound surface command, re-reading the live session first.
async fn forward(command: RemoteCommand, handle: &EngineHandle) -> Result<(), ()> {
    let snapshot = handle.session().await.map_err(|_| ())?;
    debug!(?command, state = ?snapshot.state, "Remote command");

    let result = match command {
        RemoteCommand::Play => {
            if snapshot.state == PlaybackState::Paused {
                handle.play_pause()
            } else {
                Ok(())
            }
        }
        RemoteCommand::Pause => {
            if matches!(
                snapshot.state,
                PlaybackState::Playing | PlaybackState::Buffering
            ) {
                handle.play_pause()
            } else {
                Ok(())
            }
        }
        RemoteCommand::Toggle => {
            if snapshot.state.is_toggleable() {
                handle.play_pause()
            } else {
                Ok(())
            }
        }
        RemoteCommand::Next => handle.skip_next(),
        RemoteCommand::Previous => handle.skip_previous(),
        RemoteCommand::SeekRelative(delta) => {
            if snapshot.state.is_active() {
                handle.seek_relative(delta)
            } else {
                Ok(())
            }
        }
    };

    result.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_catalog::Track;
    use core_runtime::events::SourceKind;

    #[test]
    fn now_playing_from_snapshot_and_track() {
        let track = Track::new("rec-9", "Evening Hymns", "https://cdn.example.org/rec-9.mp3")
            .with_artist("Choir")
            .with_duration_secs(240)
            .with_artwork_url("https://cdn.example.org/rec-9.jpg");

        let snapshot = SessionSnapshot {
            track_id: Some("rec-9".to_string()),
            state: PlaybackState::Playing,
            elapsed_secs: 30,
            rate: 1.25,
            source_kind: Some(SourceKind::Local),
            queue_index: Some(0),
            queue_length: 1,
        };

        let now_playing = build_now_playing(&snapshot, Some(&track));
        assert_eq!(now_playing.title, "Evening Hymns");
        assert_eq!(now_playing.artist, "Choir");
        assert_eq!(now_playing.duration_secs, Some(240));
        assert_eq!(now_playing.elapsed_secs, 30);
        assert!(now_playing.is_playing);
    }

    #[test]
    fn unknown_track_mirrors_empty_metadata() {
        let snapshot = SessionSnapshot {
            track_id: Some("rec-9".to_string()),
            state: PlaybackState::Paused,
            elapsed_secs: 5,
            rate: 1.0,
            source_kind: None,
            queue_index: Some(0),
            queue_length: 1,
        };

        let now_playing = build_now_playing(&snapshot, None);
        assert!(now_playing.title.is_empty());
        assert!(!now_playing.is_playing);
    }
}
