//! # Desktop Bridge Implementations
//!
//! Desktop-ready implementations of the bridge traits:
//! - [`ReqwestHttpClient`] - HTTP operations via reqwest
//! - [`TokioFileSystem`] - File I/O via tokio::fs
//! - [`JsonSettingsStore`] - Key-value persistence in a JSON file
//!
//! No desktop default exists for [`MediaTransport`](bridge_traits::MediaTransport)
//! or [`RemoteControlSurface`](bridge_traits::RemoteControlSurface); hosts
//! wire their platform player and media-key integration explicitly.

mod filesystem;
mod http;
mod settings;

pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
pub use settings::JsonSettingsStore;
