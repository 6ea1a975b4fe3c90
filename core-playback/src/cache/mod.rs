//! # Offline Cache Module
//!
//! Makes tracks available for playback without network access.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │     DownloadManager                    │
//! │  - request_download()  (dedup by id)   │
//! │  - cancel()            (cooperative)   │
//! └────────┬───────────────────────────────┘
//!          │ sole writer
//!          ▼
//! ┌────────────────────────────────────────┐
//! │     CacheStore                         │
//! │  - index records via SettingsStore     │
//! │  - file bodies via FileSystemAccess    │
//! └────────────────────────────────────────┘
//!          ▲ read-only
//!          │
//!     SourceResolver
//! ```
//!
//! The core invariant is atomic promotion: a `CachedMedia` record exists
//! only for a fully downloaded, verified file, so playback can never read
//! a truncated body.

pub mod download;
pub mod store;

pub use download::{DownloadJob, DownloadManager};
pub use store::CacheStore;
