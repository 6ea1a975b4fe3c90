//! # Catalog Domain Models
//!
//! Types consumed from the catalog boundary: track records, pagination
//! cursors, endpoint paths, and the cache-index records persisted by the
//! download manager. The HTTP catalog client itself lives outside the
//! core; it hands fully resolved [`Track`](models::Track) records to the
//! engine.

pub mod endpoints;
pub mod error;
pub mod models;

pub use error::{CatalogError, Result};
pub use models::{CachedMedia, Page, PageCursor, Track, TrackId};
