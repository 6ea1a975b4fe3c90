//! # Persisted Preferences
//!
//! Lifecycle-scoped flags backed by the settings store, constructed
//! explicitly and injected where needed rather than living as ambient
//! globals.

use crate::error::Result;
use bridge_traits::SettingsStore;
use std::sync::Arc;

const HIDE_LOGIN_KEY: &str = "hide_login";

/// Explicitly constructed persistence context for user preference flags.
#[derive(Clone)]
pub struct Preferences {
    settings: Arc<dyn SettingsStore>,
}

impl Preferences {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    /// Whether the login screen should be skipped at startup.
    pub async fn hide_login(&self) -> Result<bool> {
        Ok(self.settings.get_bool(HIDE_LOGIN_KEY).await?.unwrap_or(false))
    }

    /// Persist the skip-login choice.
    pub async fn set_hide_login(&self, hide: bool) -> Result<()> {
        self.settings.set_bool(HIDE_LOGIN_KEY, hide).await?;
        Ok(())
    }
}
