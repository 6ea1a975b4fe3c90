//! # Engine Configuration Module
//!
//! Provides configuration management for the Media Client Core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct an
//! `EngineConfig` instance holding all injected platform bridges and
//! playback policies. It enforces fail-fast validation so a missing
//! capability is reported at startup, not mid-playback.
//!
//! ## Required Dependencies
//!
//! - `MediaTransport` - the platform playback primitive (always injected;
//!   there is no portable default)
//!
//! ## Optional Dependencies (with desktop defaults)
//!
//! - `HttpClient` - stream downloads (desktop default: reqwest)
//! - `FileSystemAccess` - media file I/O (desktop default: tokio fs)
//! - `SettingsStore` - key-value persistence (desktop default: JSON file)
//! - `RemoteControlSurface` - lock-screen mirroring (optional; engine runs
//!   without one)
//!
//! When the `desktop-shims` feature is enabled, desktop-ready defaults are
//! injected automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::EngineConfig;
//! use std::sync::Arc;
//!
//! let config = EngineConfig::builder()
//!     .media_transport(Arc::new(PlatformTransport::new()))
//!     .remote_control(Arc::new(LockScreenSurface::new()))
//!     .stream_auth_token("c2VjcmV0")
//!     .max_concurrent_downloads(2)
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    FileSystemAccess, HttpClient, MediaTransport, RemoteControlSurface, SettingsStore,
};
use std::sync::Arc;
use std::time::Duration;

/// Policy for the single silent retry after a transient transport fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryResolution {
    /// Retry the already-resolved source as-is.
    #[default]
    SameSource,
    /// Re-run source resolution before retrying; the retry may switch
    /// between local and remote.
    ReResolve,
}

/// Inclusive playback rate bounds; values outside are clamped, not rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateRange {
    pub min: f32,
    pub max: f32,
}

impl Default for RateRange {
    fn default() -> Self {
        Self { min: 0.5, max: 3.0 }
    }
}

impl RateRange {
    /// Clamp a requested rate into the supported range.
    pub fn clamp(&self, rate: f32) -> f32 {
        rate.clamp(self.min, self.max)
    }
}

/// Engine configuration for the Media Client Core.
///
/// Holds all dependencies and policies required to start the playback
/// engine. Use [`EngineConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct EngineConfig {
    /// The platform playback primitive (required).
    pub media_transport: Arc<dyn MediaTransport>,

    /// HTTP client for stream downloads.
    pub http_client: Arc<dyn HttpClient>,

    /// File system access for cached media bodies.
    pub file_system: Arc<dyn FileSystemAccess>,

    /// Key-value persistence for favorites, cache index, and preferences.
    pub settings_store: Arc<dyn SettingsStore>,

    /// External remote-control surface (optional).
    pub remote_control: Option<Arc<dyn RemoteControlSurface>>,

    /// Subdirectory of the media directory holding downloaded files.
    pub cache_directory: String,

    /// Concurrent download limit; jobs beyond it stay queued.
    pub max_concurrent_downloads: usize,

    /// Per-download timeout.
    pub download_timeout: Duration,

    /// Supported playback rate bounds.
    pub rate_range: RateRange,

    /// Transient-fault retry policy.
    pub retry_resolution: RetryResolution,

    /// Authorization token attached to remote stream requests
    /// (`Authorization: Basic <token>`).
    pub stream_auth_token: Option<String>,
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("media_transport", &"MediaTransport { ... }")
            .field("http_client", &"HttpClient { ... }")
            .field("file_system", &"FileSystemAccess { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field(
                "remote_control",
                &self
                    .remote_control
                    .as_ref()
                    .map(|_| "RemoteControlSurface { ... }"),
            )
            .field("cache_directory", &self.cache_directory)
            .field("max_concurrent_downloads", &self.max_concurrent_downloads)
            .field("download_timeout", &self.download_timeout)
            .field("rate_range", &self.rate_range)
            .field("retry_resolution", &self.retry_resolution)
            .field("stream_auth_token", &self.stream_auth_token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl EngineConfig {
    /// Creates a new builder for constructing an `EngineConfig`.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.cache_directory.is_empty() {
            return Err(Error::Config("Cache directory cannot be empty".to_string()));
        }

        if self.max_concurrent_downloads == 0 {
            return Err(Error::Config(
                "max_concurrent_downloads must be at least 1".to_string(),
            ));
        }

        if self.download_timeout.is_zero() {
            return Err(Error::Config(
                "download_timeout must be greater than zero".to_string(),
            ));
        }

        if !(self.rate_range.min > 0.0 && self.rate_range.min <= self.rate_range.max) {
            return Err(Error::Config(format!(
                "Invalid rate range [{}, {}]: min must be positive and not exceed max",
                self.rate_range.min, self.rate_range.max
            )));
        }

        Ok(())
    }
}

fn media_transport_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MediaTransport".to_string(),
        message: "MediaTransport implementation is required to drive playback. \
                 Inject the platform player adapter (AVPlayer/ExoPlayer wrapper on \
                 mobile, audio backend on desktop) with .media_transport()."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for stream downloads. \
                 Desktop: enable the 'desktop-shims' feature to use the default \
                 ReqwestHttpClient. Mobile: inject a platform-native client."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn file_system_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "FileSystemAccess".to_string(),
        message: "FileSystemAccess implementation is required for the offline cache. \
                 Desktop: enable the 'desktop-shims' feature to use the default \
                 TokioFileSystem. Mobile: inject sandboxed app-directory access."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn settings_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required for favorites and the \
                 cache index. Desktop: enable the 'desktop-shims' feature to use \
                 the default JsonSettingsStore. Mobile: inject platform settings \
                 (UserDefaults/DataStore)."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    Ok(Arc::new(ReqwestHttpClient::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    use bridge_desktop::TokioFileSystem;

    Ok(Arc::new(TokioFileSystem::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(file_system_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store() -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::JsonSettingsStore;

    let store = JsonSettingsStore::in_default_location()
        .map_err(|e| Error::Internal(format!("Failed to initialize default SettingsStore: {}", e)))?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store() -> Result<Arc<dyn SettingsStore>> {
    Err(settings_store_missing_error())
}

/// Builder for constructing [`EngineConfig`] instances.
///
/// The builder validates required dependencies and provides actionable
/// error messages when capabilities are missing.
#[derive(Default)]
pub struct EngineConfigBuilder {
    media_transport: Option<Arc<dyn MediaTransport>>,
    http_client: Option<Arc<dyn HttpClient>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    remote_control: Option<Arc<dyn RemoteControlSurface>>,
    cache_directory: Option<String>,
    max_concurrent_downloads: Option<usize>,
    download_timeout: Option<Duration>,
    rate_range: Option<RateRange>,
    retry_resolution: Option<RetryResolution>,
    stream_auth_token: Option<String>,
}

impl EngineConfigBuilder {
    /// Sets the media transport implementation (required).
    pub fn media_transport(mut self, transport: Arc<dyn MediaTransport>) -> Self {
        self.media_transport = Some(transport);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) is used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the file system access implementation.
    ///
    /// If not provided, the desktop default (tokio fs-based) is used when
    /// the `desktop-shims` feature is enabled.
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Sets the settings store implementation.
    ///
    /// If not provided, the desktop default (JSON file-backed) is used when
    /// the `desktop-shims` feature is enabled.
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Sets the remote-control surface implementation (optional).
    ///
    /// Without one, the engine skips lock-screen mirroring entirely.
    pub fn remote_control(mut self, surface: Arc<dyn RemoteControlSurface>) -> Self {
        self.remote_control = Some(surface);
        self
    }

    /// Sets the cache subdirectory name.
    ///
    /// Default: `"downloads"`
    pub fn cache_directory(mut self, dir: impl Into<String>) -> Self {
        self.cache_directory = Some(dir.into());
        self
    }

    /// Sets the concurrent download limit.
    ///
    /// Default: 2
    pub fn max_concurrent_downloads(mut self, count: usize) -> Self {
        self.max_concurrent_downloads = Some(count);
        self
    }

    /// Sets the per-download timeout.
    ///
    /// Default: 300 seconds
    pub fn download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = Some(timeout);
        self
    }

    /// Sets the supported playback rate bounds.
    ///
    /// Default: [0.5, 3.0]
    pub fn rate_range(mut self, range: RateRange) -> Self {
        self.rate_range = Some(range);
        self
    }

    /// Sets the transient-fault retry policy.
    ///
    /// Default: [`RetryResolution::SameSource`]
    pub fn retry_resolution(mut self, policy: RetryResolution) -> Self {
        self.retry_resolution = Some(policy);
        self
    }

    /// Sets the authorization token attached to remote stream requests.
    pub fn stream_auth_token(mut self, token: impl Into<String>) -> Self {
        self.stream_auth_token = Some(token.into());
        self
    }

    /// Builds the final `EngineConfig` instance.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The media transport is missing
    /// - Optional bridges are missing and no desktop default is available
    /// - Policy values are invalid
    pub fn build(self) -> Result<EngineConfig> {
        let media_transport = self.media_transport.ok_or_else(media_transport_missing_error)?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system()?,
        };

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store()?,
        };

        let config = EngineConfig {
            media_transport,
            http_client,
            file_system,
            settings_store,
            remote_control: self.remote_control,
            cache_directory: self.cache_directory.unwrap_or_else(|| "downloads".to_string()),
            max_concurrent_downloads: self.max_concurrent_downloads.unwrap_or(2),
            download_timeout: self.download_timeout.unwrap_or(Duration::from_secs(300)),
            rate_range: self.rate_range.unwrap_or_default(),
            retry_resolution: self.retry_resolution.unwrap_or_default(),
            stream_auth_token: self.stream_auth_token,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{ByteStream, HttpRequest, HttpResponse};
    use bridge_traits::storage::FileMetadata;
    use bridge_traits::transport::{MediaSource, TransportEvent};
    use bridge_traits::{BridgeError, FileSystemAccess, HttpClient, MediaTransport, SettingsStore};
    use bytes::Bytes;
    use std::path::{Path, PathBuf};
    use tokio::sync::mpsc;

    struct MockTransport;

    #[async_trait]
    impl MediaTransport for MockTransport {
        async fn load(&self, _source: MediaSource, _start_at: Duration) -> BridgeResult<()> {
            Ok(())
        }

        async fn play(&self) -> BridgeResult<()> {
            Ok(())
        }

        async fn pause(&self) -> BridgeResult<()> {
            Ok(())
        }

        async fn stop(&self) -> BridgeResult<()> {
            Ok(())
        }

        async fn seek(&self, _position: Duration) -> BridgeResult<()> {
            Ok(())
        }

        async fn set_rate(&self, _rate: f32) -> BridgeResult<()> {
            Ok(())
        }

        async fn position(&self) -> BridgeResult<Duration> {
            Ok(Duration::ZERO)
        }

        fn take_event_stream(&self) -> Option<mpsc::UnboundedReceiver<TransportEvent>> {
            None
        }
    }

    struct MockHttpClient;

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Err(BridgeError::NotAvailable("mock".to_string()))
        }

        async fn download_stream(&self, _request: HttpRequest) -> BridgeResult<ByteStream> {
            Err(BridgeError::NotAvailable("mock".to_string()))
        }
    }

    struct MockFileSystem;

    #[async_trait]
    impl FileSystemAccess for MockFileSystem {
        async fn get_media_directory(&self) -> BridgeResult<PathBuf> {
            Ok(PathBuf::from("/tmp"))
        }

        async fn exists(&self, _path: &Path) -> BridgeResult<bool> {
            Ok(false)
        }

        async fn metadata(&self, _path: &Path) -> BridgeResult<FileMetadata> {
            Err(BridgeError::NotAvailable("mock".to_string()))
        }

        async fn create_dir_all(&self, _path: &Path) -> BridgeResult<()> {
            Ok(())
        }

        async fn read_file(&self, _path: &Path) -> BridgeResult<Bytes> {
            Err(BridgeError::NotAvailable("mock".to_string()))
        }

        async fn write_file(&self, _path: &Path, _data: Bytes) -> BridgeResult<()> {
            Ok(())
        }

        async fn delete_file(&self, _path: &Path) -> BridgeResult<()> {
            Ok(())
        }

        async fn rename(&self, _from: &Path, _to: &Path) -> BridgeResult<()> {
            Ok(())
        }

        async fn open_write_stream(
            &self,
            _path: &Path,
        ) -> BridgeResult<Box<dyn tokio::io::AsyncWrite + Send + Unpin>> {
            Err(BridgeError::NotAvailable("mock".to_string()))
        }

        async fn list_directory(&self, _path: &Path) -> BridgeResult<Vec<PathBuf>> {
            Ok(Vec::new())
        }
    }

    struct MockSettingsStore;

    #[async_trait]
    impl SettingsStore for MockSettingsStore {
        async fn set_string(&self, _key: &str, _value: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn get_string(&self, _key: &str) -> BridgeResult<Option<String>> {
            Ok(None)
        }

        async fn set_bool(&self, _key: &str, _value: bool) -> BridgeResult<()> {
            Ok(())
        }

        async fn get_bool(&self, _key: &str) -> BridgeResult<Option<bool>> {
            Ok(None)
        }

        async fn delete(&self, _key: &str) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn builder_with_bridges() -> EngineConfigBuilder {
        EngineConfig::builder()
            .media_transport(Arc::new(MockTransport))
            .http_client(Arc::new(MockHttpClient))
            .file_system(Arc::new(MockFileSystem))
            .settings_store(Arc::new(MockSettingsStore))
    }

    #[test]
    fn builder_requires_media_transport() {
        let result = EngineConfig::builder()
            .http_client(Arc::new(MockHttpClient))
            .file_system(Arc::new(MockFileSystem))
            .settings_store(Arc::new(MockSettingsStore))
            .build();

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("MediaTransport"));
        assert!(err_msg.contains("platform player adapter"));
    }

    #[test]
    fn builder_with_all_bridges_uses_defaults() {
        let config = builder_with_bridges().build().unwrap();

        assert_eq!(config.cache_directory, "downloads");
        assert_eq!(config.max_concurrent_downloads, 2);
        assert_eq!(config.download_timeout, Duration::from_secs(300));
        assert_eq!(config.rate_range, RateRange { min: 0.5, max: 3.0 });
        assert_eq!(config.retry_resolution, RetryResolution::SameSource);
        assert!(config.remote_control.is_none());
    }

    #[test]
    fn validate_rejects_zero_downloads() {
        let result = builder_with_bridges().max_concurrent_downloads(0).build();

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("at least 1"));
    }

    #[test]
    fn validate_rejects_empty_cache_directory() {
        let result = builder_with_bridges().cache_directory("").build();

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("cannot be empty"));
    }

    #[test]
    fn validate_rejects_inverted_rate_range() {
        let result = builder_with_bridges()
            .rate_range(RateRange { min: 2.0, max: 1.0 })
            .build();

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("rate range"));
    }

    #[test]
    fn rate_range_clamps() {
        let range = RateRange::default();
        assert_eq!(range.clamp(5.0), 3.0);
        assert_eq!(range.clamp(0.1), 0.5);
        assert_eq!(range.clamp(1.25), 1.25);
    }

    #[test]
    fn config_is_cloneable() {
        let config = builder_with_bridges()
            .retry_resolution(RetryResolution::ReResolve)
            .stream_auth_token("c2VjcmV0")
            .build()
            .unwrap();

        let cloned = config.clone();
        assert_eq!(cloned.retry_resolution, RetryResolution::ReResolve);
        assert_eq!(cloned.stream_auth_token.as_deref(), Some("c2VjcmV0"));
    }
}
