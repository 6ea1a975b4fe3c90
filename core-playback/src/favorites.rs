//! # Favorites Ledger
//!
//! A persisted set of favorited track ids with toggle semantics. Each
//! toggle flips membership and persists before returning; repeated calls
//! alternate, they do not no-op.

use crate::error::{EngineError, Result};
use bridge_traits::SettingsStore;
use core_catalog::TrackId;
use core_runtime::events::{EngineEvent, EventBus, FavoritesEvent};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

/// Settings key holding the serialized favorite set.
const FAVORITES_KEY: &str = "favorites-v1";

/// Persisted favorite-track set.
pub struct FavoritesLedger {
    settings: Arc<dyn SettingsStore>,
    event_bus: EventBus,
    set: Mutex<HashSet<TrackId>>,
}

impl FavoritesLedger {
    /// Load the persisted set from the settings store.
    pub async fn open(settings: Arc<dyn SettingsStore>, event_bus: EventBus) -> Result<Self> {
        let set = match settings.get_string(FAVORITES_KEY).await? {
            Some(raw) => match serde_json::from_str::<HashSet<TrackId>>(&raw) {
                Ok(set) => set,
                Err(e) => {
                    warn!("Discarding unreadable favorite set: {}", e);
                    HashSet::new()
                }
            },
            None => HashSet::new(),
        };

        debug!(favorites = set.len(), "Favorites ledger opened");

        Ok(Self {
            settings,
            event_bus,
            set: Mutex::new(set),
        })
    }

    /// Flip membership for a track id; returns the new membership state.
    #[instrument(skip(self))]
    pub async fn toggle(&self, track_id: &TrackId) -> Result<bool> {
        let mut set = self.set.lock().await;

        let is_favorite = if set.remove(track_id) {
            false
        } else {
            set.insert(track_id.clone());
            true
        };

        self.persist(&set).await?;
        drop(set);

        self.event_bus
            .emit(EngineEvent::Favorites(FavoritesEvent::Toggled {
                track_id: track_id.to_string(),
                is_favorite,
            }))
            .ok();

        Ok(is_favorite)
    }

    /// Current membership for a track id.
    pub async fn is_favorite(&self, track_id: &TrackId) -> bool {
        self.set.lock().await.contains(track_id)
    }

    /// All favorited ids; no ordering semantics.
    pub async fn all(&self) -> HashSet<TrackId> {
        self.set.lock().await.clone()
    }

    async fn persist(&self, set: &HashSet<TrackId>) -> Result<()> {
        let raw = serde_json::to_string(set)
            .map_err(|e| EngineError::Playback(format!("Favorites serialization: {}", e)))?;
        self.settings.set_string(FAVORITES_KEY, &raw).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        Settings {}

        #[async_trait::async_trait]
        impl SettingsStore for Settings {
            async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()>;
            async fn get_string(&self, key: &str) -> BridgeResult<Option<String>>;
            async fn set_bool(&self, key: &str, value: bool) -> BridgeResult<()>;
            async fn get_bool(&self, key: &str) -> BridgeResult<Option<bool>>;
            async fn delete(&self, key: &str) -> BridgeResult<()>;
        }
    }

    fn empty_store() -> MockSettings {
        let mut settings = MockSettings::new();
        settings
            .expect_get_string()
            .with(eq(FAVORITES_KEY))
            .returning(|_| Ok(None));
        settings.expect_set_string().returning(|_, _| Ok(()));
        settings
    }

    #[tokio::test]
    async fn toggle_alternates_membership() {
        let ledger = FavoritesLedger::open(Arc::new(empty_store()), EventBus::new(4))
            .await
            .unwrap();
        let id = TrackId::new("rec-1");

        assert!(ledger.toggle(&id).await.unwrap());
        assert!(!ledger.toggle(&id).await.unwrap());
        assert!(ledger.toggle(&id).await.unwrap());
        assert!(ledger.is_favorite(&id).await);
    }

    #[tokio::test]
    async fn open_loads_persisted_set() {
        let mut settings = MockSettings::new();
        settings
            .expect_get_string()
            .with(eq(FAVORITES_KEY))
            .returning(|_| Ok(Some("[\"rec-1\",\"rec-2\"]".to_string())));

        let ledger = FavoritesLedger::open(Arc::new(settings), EventBus::new(4))
            .await
            .unwrap();

        assert!(ledger.is_favorite(&TrackId::new("rec-1")).await);
        assert!(ledger.is_favorite(&TrackId::new("rec-2")).await);
        assert!(!ledger.is_favorite(&TrackId::new("rec-3")).await);
        assert_eq!(ledger.all().await.len(), 2);
    }

    #[tokio::test]
    async fn unreadable_persisted_set_is_discarded() {
        let mut settings = MockSettings::new();
        settings
            .expect_get_string()
            .with(eq(FAVORITES_KEY))
            .returning(|_| Ok(Some("not-json".to_string())));

        let ledger = FavoritesLedger::open(Arc::new(settings), EventBus::new(4))
            .await
            .unwrap();
        assert!(ledger.all().await.is_empty());
    }

    #[tokio::test]
    async fn toggle_persists_before_returning() {
        let mut settings = MockSettings::new();
        settings
            .expect_get_string()
            .with(eq(FAVORITES_KEY))
            .returning(|_| Ok(None));
        settings
            .expect_set_string()
            .with(eq(FAVORITES_KEY), eq("[\"rec-1\"]"))
            .times(1)
            .returning(|_, _| Ok(()));

        let ledger = FavoritesLedger::open(Arc::new(settings), EventBus::new(4))
            .await
            .unwrap();
        ledger.toggle(&TrackId::new("rec-1")).await.unwrap();
    }

    #[tokio::test]
    async fn toggle_publishes_event() {
        let bus = EventBus::new(4);
        let mut events = bus.subscribe();

        let ledger = FavoritesLedger::open(Arc::new(empty_store()), bus)
            .await
            .unwrap();
        ledger.toggle(&TrackId::new("rec-1")).await.unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(
            event,
            EngineEvent::Favorites(FavoritesEvent::Toggled {
                track_id: "rec-1".to_string(),
                is_favorite: true,
            })
        );
    }
}
