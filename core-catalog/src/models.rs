//! Domain models consumed from the catalog boundary
//!
//! Track records are handed to the engine fully resolved by an external
//! catalog client; the engine never fetches catalog data itself. This
//! module also holds the cache-index records the download manager
//! persists.

use crate::error::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// =============================================================================
// ID Types
// =============================================================================

/// Unique identifier for a track.
///
/// Catalog-assigned ids are opaque strings; the engine never inspects
/// their structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// =============================================================================
// Track
// =============================================================================

/// A playable recording from the catalog.
///
/// Immutable once loaded; queue entries and cache records reference
/// tracks by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Catalog-assigned id.
    pub id: TrackId,
    /// Display title.
    pub title: String,
    /// Presenter / artist label.
    pub artist: String,
    /// Duration in seconds, when the catalog reports one.
    pub duration_secs: Option<u64>,
    /// Artwork URL for list and lock-screen display.
    pub artwork_url: Option<String>,
    /// Remote audio stream URL.
    pub stream_url: String,
    /// Remote video stream URL for recordings with a visual surface.
    pub video_url: Option<String>,
    /// Required bit-rate variant in kbps.
    pub bit_rate: Option<u32>,
    /// Recording language code.
    pub language: Option<String>,
    /// Authorization headers required to open the stream.
    #[serde(default)]
    pub stream_headers: HashMap<String, String>,
}

impl Track {
    /// Create a track with the required fields; optional attributes via
    /// the `with_*` builders.
    pub fn new(
        id: impl Into<TrackId>,
        title: impl Into<String>,
        stream_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: String::new(),
            duration_secs: None,
            artwork_url: None,
            stream_url: stream_url.into(),
            video_url: None,
            bit_rate: None,
            language: None,
            stream_headers: HashMap::new(),
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    pub fn with_duration_secs(mut self, secs: u64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    pub fn with_artwork_url(mut self, url: impl Into<String>) -> Self {
        self.artwork_url = Some(url.into());
        self
    }

    pub fn with_video_url(mut self, url: impl Into<String>) -> Self {
        self.video_url = Some(url.into());
        self
    }

    pub fn with_bit_rate(mut self, kbps: u32) -> Self {
        self.bit_rate = Some(kbps);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_stream_header(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.stream_headers.insert(key.into(), value.into());
        self
    }

    /// Validate the record as received from the catalog boundary.
    pub fn validate(&self) -> Result<()> {
        if self.id.as_str().is_empty() {
            return Err(CatalogError::InvalidTrack("empty track id".to_string()));
        }

        if self.stream_url.is_empty() {
            return Err(CatalogError::InvalidTrack(format!(
                "track {} has no stream URL",
                self.id
            )));
        }

        Ok(())
    }

    /// Returns `true` if the recording has a video surface.
    pub fn has_video(&self) -> bool {
        self.video_url.is_some()
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Opaque paging cursor returned by catalog listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageCursor(pub String);

/// One page of a catalog listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page, in catalog order.
    pub items: Vec<T>,
    /// Cursor for the next page; `None` on the last page.
    pub next: Option<PageCursor>,
}

impl<T> Page<T> {
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

// =============================================================================
// Cache Index Records
// =============================================================================

/// Index record for a fully downloaded media file.
///
/// A record exists only after a download completed, verified, and was
/// atomically promoted; partial downloads never appear here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedMedia {
    /// The track this file belongs to.
    pub track_id: TrackId,
    /// File name relative to the cache directory.
    pub file_name: String,
    /// Size of the downloaded file in bytes.
    pub size_bytes: u64,
    /// SHA-256 checksum of the file contents, hex-encoded.
    pub checksum: String,
    /// Unix timestamp of the promotion.
    pub downloaded_at: i64,
}

impl CachedMedia {
    pub fn new(
        track_id: TrackId,
        file_name: impl Into<String>,
        size_bytes: u64,
        checksum: impl Into<String>,
    ) -> Self {
        Self {
            track_id,
            file_name: file_name.into(),
            size_bytes,
            checksum: checksum.into(),
            downloaded_at: chrono::Utc::now().timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_track() -> Track {
        Track::new("rec-401", "The Still Small Voice", "https://cdn.example.org/rec-401.mp3")
            .with_artist("J. Whitfield")
            .with_duration_secs(2145)
            .with_bit_rate(64)
            .with_language("en")
    }

    #[test]
    fn track_builder_populates_fields() {
        let track = sample_track();
        assert_eq!(track.id.as_str(), "rec-401");
        assert_eq!(track.artist, "J. Whitfield");
        assert_eq!(track.duration_secs, Some(2145));
        assert!(!track.has_video());
        assert!(track.validate().is_ok());
    }

    #[test]
    fn track_validation_rejects_missing_stream_url() {
        let track = Track::new("rec-1", "Untitled", "");
        assert!(matches!(
            track.validate(),
            Err(CatalogError::InvalidTrack(_))
        ));
    }

    #[test]
    fn track_serialization_round_trip() {
        let track = sample_track().with_stream_header("Authorization", "Basic abc");
        let json = serde_json::to_string(&track).unwrap();
        let back: Track = serde_json::from_str(&json).unwrap();
        assert_eq!(back, track);
    }

    #[test]
    fn page_last_detection() {
        let page = Page::<Track> {
            items: Vec::new(),
            next: None,
        };
        assert!(page.is_last());

        let page = Page::<Track> {
            items: Vec::new(),
            next: Some(PageCursor("offset=25".to_string())),
        };
        assert!(!page.is_last());
    }

    #[test]
    fn cached_media_round_trip() {
        let record = CachedMedia::new(TrackId::new("rec-401"), "rec-401.mp3", 4096, "deadbeef");
        let json = serde_json::to_string(&record).unwrap();
        let back: CachedMedia = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
