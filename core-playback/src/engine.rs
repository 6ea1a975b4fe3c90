//! # Playback Engine
//!
//! Owns the play queue and the playback state machine. All command
//! handling and event publication is serialized through one task: the
//! engine task is the sole writer of the queue and the session, so no two
//! transitions can interleave (`skip_next` racing `play_pause` is
//! impossible by construction).
//!
//! ## State machine
//!
//! ```text
//! idle → loading → (buffering ⇄ playing) ⇄ paused
//! playing/buffering/paused → ended        (queue exhausted)
//! any → error                             (fatal transport fault)
//! error → loading                         (manual retry)
//! ```
//!
//! Transient transport faults get exactly one silent retry per track
//! (same-source or re-resolved, per [`RetryResolution`]) before the
//! `error` state surfaces.
//!
//! ## Interface
//!
//! [`PlayerEngine::start`] wires the components and returns a cloneable
//! [`EngineHandle`]: the command surface for the UI and the remote-control
//! bridge alike. State flows back through the event bus only.

use crate::cache::{CacheStore, DownloadJob, DownloadManager};
use crate::error::{EngineError, Result};
use crate::favorites::FavoritesLedger;
use crate::queue::{Advance, Previous, Queue};
use crate::remote::RemoteControlBridge;
use crate::resolver::SourceResolver;
use crate::session::PlaybackSession;
use bridge_traits::transport::{MediaSource, MediaTransport, TransportEvent};
use core_catalog::{CachedMedia, Track, TrackId};
use core_runtime::config::{EngineConfig, RateRange, RetryResolution};
use core_runtime::events::{
    EngineEvent, EventBus, PlaybackEvent, PlaybackState, QueueEvent, SessionSnapshot, SourceKind,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

/// Commands handled by the engine task.
enum EngineCommand {
    PlayQueue {
        tracks: Vec<Track>,
        start_id: Option<TrackId>,
        reply: oneshot::Sender<Result<()>>,
    },
    PlayVideo {
        track: Track,
        reply: oneshot::Sender<Result<()>>,
    },
    PlayPause,
    SkipNext,
    SkipPrevious,
    SeekRelative { delta_secs: i64 },
    SetRate { rate: f32 },
    Retry,
    Stop,
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}

/// Entry point for constructing a running engine.
pub struct PlayerEngine;

impl PlayerEngine {
    /// Wire the engine components from `config`, spawn the engine task
    /// (and the remote-control bridge when a surface is configured), and
    /// return the command handle.
    pub async fn start(config: EngineConfig) -> Result<EngineHandle> {
        config
            .validate()
            .map_err(|e| EngineError::Config(e.to_string()))?;

        let event_bus = EventBus::default();

        let store = Arc::new(
            CacheStore::open(
                config.file_system.clone(),
                config.settings_store.clone(),
                &config.cache_directory,
            )
            .await?,
        );

        let downloads = Arc::new(DownloadManager::new(
            config.http_client.clone(),
            config.file_system.clone(),
            store.clone(),
            event_bus.clone(),
            config.max_concurrent_downloads,
            config.download_timeout,
            config.stream_auth_token.clone(),
        ));

        let favorites = Arc::new(
            FavoritesLedger::open(config.settings_store.clone(), event_bus.clone()).await?,
        );

        let resolver = SourceResolver::new(store.clone(), config.stream_auth_token.clone());

        let transport_events = config.media_transport.take_event_stream().ok_or_else(|| {
            EngineError::InvalidOperation(
                "Transport event stream already claimed; one engine per transport".to_string(),
            )
        })?;

        let catalog: Arc<RwLock<HashMap<TrackId, Track>>> = Arc::new(RwLock::new(HashMap::new()));
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let handle = EngineHandle {
            commands: commands_tx,
            event_bus: event_bus.clone(),
            downloads,
            favorites,
            store,
            catalog: catalog.clone(),
        };

        let task = EngineTask {
            queue: Queue::new(),
            session: None,
            rate: 1.0,
            video_session: false,
            retried_current: false,
            user_paused: false,
            current_source: None,
            transport: config.media_transport.clone(),
            resolver,
            event_bus,
            catalog,
            rate_range: config.rate_range,
            retry_resolution: config.retry_resolution,
        };
        tokio::spawn(task.run(commands_rx, transport_events));

        if let Some(surface) = config.remote_control.clone() {
            RemoteControlBridge::spawn(surface, handle.clone());
        }

        info!("Playback engine started");
        Ok(handle)
    }
}

/// Cloneable command surface exposed to the UI layer.
///
/// Playback state comes back through [`events`](EngineHandle::events) and
/// [`session`](EngineHandle::session); the handle itself holds no mutable
/// playback state.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<EngineCommand>,
    event_bus: EventBus,
    downloads: Arc<DownloadManager>,
    favorites: Arc<FavoritesLedger>,
    store: Arc<CacheStore>,
    catalog: Arc<RwLock<HashMap<TrackId, Track>>>,
}

impl EngineHandle {
    fn send(&self, command: EngineCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| EngineError::EngineStopped)
    }

    /// Replace the queue with `tracks` and start playback at `start_id`
    /// (or the first entry).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EmptyQueue`] when `tracks` is empty and a
    /// `start_id` was given.
    pub async fn play_queue(&self, tracks: Vec<Track>, start_id: Option<TrackId>) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::PlayQueue {
            tracks,
            start_id,
            reply,
        })?;
        rx.await.map_err(|_| EngineError::EngineStopped)?
    }

    /// Play a recording's video surface as a single-entry queue.
    pub async fn play_video(&self, track: Track) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::PlayVideo { track, reply })?;
        rx.await.map_err(|_| EngineError::EngineStopped)?
    }

    /// Toggle between playing and paused; no-op outside those states.
    pub fn play_pause(&self) -> Result<()> {
        self.send(EngineCommand::PlayPause)
    }

    /// Advance to the next queue entry, or end playback at the tail.
    pub fn skip_next(&self) -> Result<()> {
        self.send(EngineCommand::SkipNext)
    }

    /// Step back one entry; at the first entry the current track restarts.
    pub fn skip_previous(&self) -> Result<()> {
        self.send(EngineCommand::SkipPrevious)
    }

    /// Seek by a signed number of seconds, clamped to the track bounds;
    /// seeking past the end advances to the next entry.
    pub fn seek_relative(&self, delta_secs: i64) -> Result<()> {
        self.send(EngineCommand::SeekRelative { delta_secs })
    }

    /// Set the playback rate; out-of-range values are clamped.
    pub fn set_rate(&self, rate: f32) -> Result<()> {
        self.send(EngineCommand::SetRate { rate })
    }

    /// Manually retry after a fatal playback error.
    pub fn retry(&self) -> Result<()> {
        self.send(EngineCommand::Retry)
    }

    /// Stop playback, clear the queue, and reset the session.
    pub fn stop(&self) -> Result<()> {
        self.send(EngineCommand::Stop)
    }

    /// Current session snapshot, read from the engine task.
    pub async fn session(&self) -> Result<SessionSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Snapshot { reply })?;
        rx.await.map_err(|_| EngineError::EngineStopped)
    }

    /// Subscribe to engine events.
    pub fn events(&self) -> core_runtime::events::Receiver<EngineEvent> {
        self.event_bus.subscribe()
    }

    /// Make catalog tracks known to the engine without playing them
    /// (e.g., a listing the user may download from).
    pub fn register_tracks(&self, tracks: &[Track]) {
        let mut catalog = self.catalog.write();
        for track in tracks {
            catalog.insert(track.id.clone(), track.clone());
        }
    }

    /// Look up a registered track.
    pub fn track(&self, track_id: &TrackId) -> Option<Track> {
        self.catalog.read().get(track_id).cloned()
    }

    /// Flip favorite membership; returns the new state.
    pub async fn toggle_favorite(&self, track_id: &TrackId) -> Result<bool> {
        self.favorites.toggle(track_id).await
    }

    /// Current favorite membership.
    pub async fn is_favorite(&self, track_id: &TrackId) -> bool {
        self.favorites.is_favorite(track_id).await
    }

    /// Start (or attach to) a background download for a registered track.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownTrack`] for ids the catalog registry
    /// has never seen.
    pub async fn request_download(&self, track_id: &TrackId) -> Result<DownloadJob> {
        let track = self
            .track(track_id)
            .ok_or_else(|| EngineError::UnknownTrack(track_id.to_string()))?;
        self.downloads.request_download(&track).await
    }

    /// Cooperatively cancel a queued or active download.
    pub async fn cancel_download(&self, track_id: &TrackId) -> bool {
        self.downloads.cancel(track_id).await
    }

    /// Delete a cached entry and its backing file.
    pub async fn remove_download(&self, track_id: &TrackId) -> Result<Option<CachedMedia>> {
        self.downloads.remove(track_id).await
    }

    /// All cached entries (the offline listing).
    pub async fn cached_media(&self) -> Vec<CachedMedia> {
        self.store.list().await
    }
}

/// State owned exclusively by the engine task.
struct EngineTask {
    queue: Queue,
    session: Option<PlaybackSession>,
    /// Sticky playback rate, carried across tracks and sessions.
    rate: f32,
    /// Whether the current session plays the video surface.
    video_session: bool,
    /// Whether the current track already consumed its silent retry.
    retried_current: bool,
    /// Whether the user has paused (suppresses auto-play on `Ready`).
    user_paused: bool,
    /// The source the transport was last loaded with, kept for retry.
    current_source: Option<MediaSource>,
    transport: Arc<dyn MediaTransport>,
    resolver: SourceResolver,
    event_bus: EventBus,
    catalog: Arc<RwLock<HashMap<TrackId, Track>>>,
    rate_range: RateRange,
    retry_resolution: RetryResolution,
}

impl EngineTask {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<EngineCommand>,
        mut transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    ) {
        let mut transport_open = true;

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                event = transport_events.recv(), if transport_open => match event {
                    Some(event) => self.handle_transport_event(event).await,
                    None => transport_open = false,
                },
            }
        }

        let _ = self.transport.stop().await;
        debug!("Engine task stopped");
    }

    async fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::PlayQueue {
                tracks,
                start_id,
                reply,
            } => {
                let result = self.play_queue(tracks, start_id).await;
                reply.send(result).ok();
            }
            EngineCommand::PlayVideo { track, reply } => {
                let result = self.play_video(track).await;
                reply.send(result).ok();
            }
            EngineCommand::PlayPause => self.play_pause().await,
            EngineCommand::SkipNext => self.skip_next().await,
            EngineCommand::SkipPrevious => self.skip_previous().await,
            EngineCommand::SeekRelative { delta_secs } => self.seek_relative(delta_secs).await,
            EngineCommand::SetRate { rate } => self.set_rate(rate).await,
            EngineCommand::Retry => self.retry().await,
            EngineCommand::Stop => self.stop_all().await,
            EngineCommand::Snapshot { reply } => {
                reply.send(self.snapshot()).ok();
            }
        }
    }

    // ========================================================================
    // Command handling
    // ========================================================================

    #[instrument(skip(self, tracks))]
    async fn play_queue(&mut self, tracks: Vec<Track>, start_id: Option<TrackId>) -> Result<()> {
        for track in &tracks {
            track.validate()?;
        }

        {
            let mut catalog = self.catalog.write();
            for track in &tracks {
                catalog.insert(track.id.clone(), track.clone());
            }
        }

        self.queue.replace(tracks, start_id.as_ref())?;
        self.publish_queue_changed();

        self.video_session = false;
        if self.queue.current().is_some() {
            self.start_current(Duration::ZERO).await;
        } else {
            // Replacing with an empty list clears the session.
            let _ = self.transport.stop().await;
            self.session = None;
            self.publish_state();
        }

        Ok(())
    }

    async fn play_video(&mut self, track: Track) -> Result<()> {
        track.validate()?;
        if track.video_url.is_none() {
            return Err(EngineError::InvalidOperation(format!(
                "Track {} has no video surface",
                track.id
            )));
        }

        self.catalog.write().insert(track.id.clone(), track.clone());
        self.queue.replace(vec![track], None)?;
        self.publish_queue_changed();

        self.video_session = true;
        self.start_current(Duration::ZERO).await;
        Ok(())
    }

    async fn play_pause(&mut self) {
        let Some(state) = self.session.as_ref().map(|s| s.state) else {
            return;
        };

        match state {
            PlaybackState::Playing | PlaybackState::Buffering => {
                if let Err(e) = self.transport.pause().await {
                    warn!("Transport pause failed: {}", e);
                }
                self.user_paused = true;
                self.set_state(PlaybackState::Paused);
                self.publish_state();
            }
            PlaybackState::Paused => {
                if let Err(e) = self.transport.play().await {
                    self.fault(e.to_string(), true).await;
                    return;
                }
                self.user_paused = false;
                self.set_state(PlaybackState::Playing);
                self.publish_state();
            }
            // No-op from idle/loading/ended/error.
            _ => {}
        }
    }

    async fn skip_next(&mut self) {
        match self.queue.next() {
            Advance::Moved(_) => {
                self.publish_queue_changed();
                self.start_current(Duration::ZERO).await;
            }
            Advance::EndOfQueue => self.enter_ended().await,
        }
    }

    async fn skip_previous(&mut self) {
        match self.queue.previous() {
            Previous::Moved(_) => {
                self.publish_queue_changed();
                self.start_current(Duration::ZERO).await;
            }
            Previous::RestartCurrent => {
                let Some(session) = &mut self.session else {
                    return;
                };
                if !session.state.is_active() {
                    return;
                }

                session.elapsed = Duration::ZERO;
                if let Err(e) = self.transport.seek(Duration::ZERO).await {
                    warn!("Restart seek failed: {}", e);
                }
                self.publish_state();
            }
        }
    }

    async fn seek_relative(&mut self, delta_secs: i64) {
        let (current_secs, duration) = match &self.session {
            Some(session) if session.state.is_active() => {
                (session.elapsed.as_secs() as i64, session.duration())
            }
            _ => return,
        };

        let target_secs = (current_secs + delta_secs).max(0) as u64;
        let target = Duration::from_secs(target_secs);

        // Landing at or past the end means "next track", not an
        // out-of-range seek.
        if let Some(duration) = duration {
            if target >= duration {
                self.skip_next().await;
                return;
            }
        }

        match self.transport.seek(target).await {
            Ok(()) => {
                if let Some(session) = &mut self.session {
                    session.elapsed = target;
                }
                self.publish_state();
            }
            Err(e) => self.fault(e.to_string(), true).await,
        }
    }

    async fn set_rate(&mut self, rate: f32) {
        let clamped = self.rate_range.clamp(rate);
        if clamped != rate {
            debug!(requested = rate, clamped, "Clamped playback rate");
        }

        self.rate = clamped;

        let active = self
            .session
            .as_ref()
            .map(|s| s.state.is_active())
            .unwrap_or(false);

        if let Some(session) = &mut self.session {
            session.rate = clamped;
        }

        if active {
            if let Err(e) = self.transport.set_rate(clamped).await {
                warn!("Transport set_rate failed: {}", e);
            }
        }

        self.publish_state();
    }

    async fn retry(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        if session.state != PlaybackState::Error {
            return;
        }

        info!("Manual retry after playback error");
        let resume = session.elapsed;
        self.start_current(resume).await;
    }

    async fn stop_all(&mut self) {
        let _ = self.transport.stop().await;
        self.session = None;
        self.current_source = None;
        self.queue.clear();
        self.publish_queue_changed();
        self.publish_state();
    }

    // ========================================================================
    // Transport event handling
    // ========================================================================

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Ready { duration } => self.on_ready(duration).await,
            TransportEvent::Buffering => {
                if self.state() == Some(PlaybackState::Playing) {
                    self.set_state(PlaybackState::Buffering);
                    self.publish_state();
                }
            }
            TransportEvent::Position(position) => {
                if self.state() == Some(PlaybackState::Playing) {
                    if let Some(session) = &mut self.session {
                        session.elapsed = position;
                    }
                    self.publish_state();
                }
            }
            TransportEvent::Ended => {
                debug!("Transport reported end of track");
                match self.queue.next() {
                    Advance::Moved(_) => {
                        self.publish_queue_changed();
                        self.start_current(Duration::ZERO).await;
                    }
                    Advance::EndOfQueue => self.enter_ended().await,
                }
            }
            TransportEvent::Fault { message, transient } => self.fault(message, transient).await,
        }
    }

    async fn on_ready(&mut self, duration: Option<Duration>) {
        let Some(session) = &mut self.session else {
            return;
        };
        if !matches!(
            session.state,
            PlaybackState::Loading | PlaybackState::Buffering
        ) {
            return;
        }

        // Prefer the transport's measured duration when the catalog had none.
        if let Some(d) = duration {
            session.track.duration_secs.get_or_insert(d.as_secs());
        }

        if self.user_paused {
            self.set_state(PlaybackState::Paused);
            self.publish_state();
            return;
        }

        if let Err(e) = self.transport.play().await {
            self.fault(e.to_string(), true).await;
            return;
        }

        if self.rate != 1.0 {
            if let Err(e) = self.transport.set_rate(self.rate).await {
                warn!("Transport set_rate failed: {}", e);
            }
        }

        self.set_state(PlaybackState::Playing);
        self.publish_state();
    }

    // ========================================================================
    // Shared transitions
    // ========================================================================

    /// Begin playback of the queue's current entry, resuming at `resume`.
    async fn start_current(&mut self, resume: Duration) {
        let Some(entry) = self.queue.current().cloned() else {
            return;
        };

        self.retried_current = false;
        self.user_paused = false;
        self.session = Some(PlaybackSession::loading(
            entry.track.clone(),
            resume,
            self.rate,
        ));
        self.publish_state();

        let resolved = if self.video_session {
            self.resolver.resolve_video(&entry.track)
        } else {
            self.resolver.resolve(&entry.track).await
        };

        match resolved {
            Ok(source) => {
                if let Err(message) = self.load_source(source, resume).await {
                    self.fault(message, true).await;
                }
            }
            Err(e) => {
                warn!("Source resolution failed: {}", e);
                self.enter_error();
            }
        }
    }

    /// Hand a resolved source to the transport and enter `buffering`.
    async fn load_source(
        &mut self,
        source: MediaSource,
        start_at: Duration,
    ) -> std::result::Result<(), String> {
        let kind = if source.is_remote() {
            SourceKind::Remote
        } else {
            SourceKind::Local
        };

        if let Some(session) = &mut self.session {
            session.source_kind = Some(kind);
        }
        self.current_source = Some(source.clone());

        self.transport
            .load(source, start_at)
            .await
            .map_err(|e| e.to_string())?;

        self.set_state(PlaybackState::Buffering);
        self.publish_state();
        Ok(())
    }

    /// Transport fault path: one silent retry for transient faults, then
    /// the `error` state surfaces.
    async fn fault(&mut self, message: String, transient: bool) {
        if transient && !self.retried_current {
            if let Some((track, resume)) = self
                .session
                .as_ref()
                .map(|s| (s.track.clone(), s.elapsed))
            {
                self.retried_current = true;
                warn!("Transient transport fault, retrying once: {}", message);

                let source = match self.retry_resolution {
                    RetryResolution::SameSource => self.current_source.clone(),
                    RetryResolution::ReResolve => {
                        if self.video_session {
                            self.resolver.resolve_video(&track).ok()
                        } else {
                            self.resolver.resolve(&track).await.ok()
                        }
                    }
                };

                if let Some(source) = source {
                    self.set_state(PlaybackState::Loading);
                    self.publish_state();

                    match self.load_source(source, resume).await {
                        Ok(()) => return,
                        Err(retry_message) => {
                            warn!("Retry failed: {}", retry_message);
                        }
                    }
                }
            }
        }

        warn!("Playback fault: {}", message);
        self.enter_error();
    }

    async fn enter_ended(&mut self) {
        let _ = self.transport.stop().await;
        if self.session.is_some() {
            self.set_state(PlaybackState::Ended);
        }
        self.publish_state();
    }

    fn enter_error(&mut self) {
        if self.session.is_some() {
            self.set_state(PlaybackState::Error);
        }
        self.publish_state();
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn state(&self) -> Option<PlaybackState> {
        self.session.as_ref().map(|s| s.state)
    }

    fn set_state(&mut self, state: PlaybackState) {
        if let Some(session) = &mut self.session {
            session.state = state;
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        match &self.session {
            Some(session) => session.snapshot(self.queue.current_index(), self.queue.len()),
            None => {
                let mut snapshot = SessionSnapshot::idle();
                snapshot.rate = self.rate;
                snapshot.queue_index = self.queue.current_index();
                snapshot.queue_length = self.queue.len();
                snapshot
            }
        }
    }

    fn publish_state(&self) {
        self.event_bus
            .emit(EngineEvent::Playback(PlaybackEvent::StateChanged {
                session: self.snapshot(),
            }))
            .ok();
    }

    fn publish_queue_changed(&self) {
        self.event_bus
            .emit(EngineEvent::Queue(QueueEvent::Changed {
                length: self.queue.len(),
                current_index: self.queue.current_index(),
                current_track_id: self.queue.current().map(|e| e.track.id.to_string()),
            }))
            .ok();
    }
}
