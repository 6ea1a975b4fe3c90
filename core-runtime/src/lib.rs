//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the media client core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the playback engine depends
//! on. It establishes the async runtime patterns, logging conventions, and
//! event broadcasting mechanisms used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
