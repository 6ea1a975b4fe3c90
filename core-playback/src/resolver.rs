//! # Source Resolver
//!
//! Decides whether a track plays from the local cache or the remote
//! stream. A present, verified cache entry always wins over the network,
//! even when the cached quality differs from the currently preferred
//! remote variant: offline reliability beats quality.

use crate::cache::CacheStore;
use crate::error::{EngineError, Result};
use bridge_traits::transport::MediaSource;
use core_catalog::Track;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Build the header map for a remote stream request.
///
/// Per-track headers from the catalog take precedence; the engine-level
/// Basic token fills in when the track carries no Authorization of its own.
pub(crate) fn stream_request_headers(
    track: &Track,
    auth_token: Option<&str>,
) -> HashMap<String, String> {
    let mut headers = track.stream_headers.clone();

    if let Some(token) = auth_token {
        headers
            .entry("Authorization".to_string())
            .or_insert_with(|| format!("Basic {}", token));
    }

    headers
}

/// Resolves tracks to playable sources, consulting the cache store first.
pub struct SourceResolver {
    cache: Arc<CacheStore>,
    auth_token: Option<String>,
}

impl SourceResolver {
    pub fn new(cache: Arc<CacheStore>, auth_token: Option<String>) -> Self {
        Self { cache, auth_token }
    }

    /// Resolve a track's audio source.
    ///
    /// A corrupt cache entry is evicted by the store during verification
    /// and resolution falls back to the remote descriptor.
    #[instrument(skip(self, track), fields(track_id = %track.id))]
    pub async fn resolve(&self, track: &Track) -> Result<MediaSource> {
        if let Some(path) = self.cache.lookup_verified(&track.id).await? {
            debug!("Resolved to cached file");
            return Ok(MediaSource::LocalFile { path });
        }

        debug!("Resolved to remote stream");
        self.remote_descriptor(track)
    }

    /// Resolve a track's video source.
    ///
    /// The audio cache is never consulted; video always streams.
    pub fn resolve_video(&self, track: &Track) -> Result<MediaSource> {
        let url = track.video_url.clone().ok_or_else(|| {
            EngineError::InvalidOperation(format!("Track {} has no video surface", track.id))
        })?;

        Ok(MediaSource::RemoteStream {
            url,
            headers: stream_request_headers(track, self.auth_token.as_deref()),
        })
    }

    fn remote_descriptor(&self, track: &Track) -> Result<MediaSource> {
        track.validate()?;

        Ok(MediaSource::RemoteStream {
            url: track.stream_url.clone(),
            headers: stream_request_headers(track, self.auth_token.as_deref()),
        })
    }
}
