//! Application state shared by every view

use std::sync::Arc;

use tracing::info;

use crate::catalog::FieldCatalog;
use crate::config::AppSettings;
use crate::events::EventBus;
use crate::preferences::{FileStorage, KeyValueStorage, MemoryStorage, PreferenceMirror, PreferenceStore};
use crate::ReportError;

/// The main application state
pub struct AppState {
    /// Loaded settings
    pub settings: AppSettings,

    /// The event bus
    pub event_bus: Arc<EventBus>,

    /// Local key-value storage
    pub storage: Arc<dyn KeyValueStorage>,

    /// Per-report preferences
    pub preferences: Arc<PreferenceStore>,

    /// Report catalog
    pub catalog: Arc<FieldCatalog>,
}

impl AppState {
    /// Wire the services over an existing storage backend
    pub fn new(
        settings: AppSettings,
        storage: Arc<dyn KeyValueStorage>,
        mirror: Option<Arc<dyn PreferenceMirror>>,
    ) -> Self {
        let event_bus = Arc::new(EventBus::new());

        let mut preferences = PreferenceStore::new(storage.clone(), event_bus.clone());
        if let Some(mirror) = mirror {
            preferences = preferences.with_mirror(mirror);
        }
        let preferences = Arc::new(preferences);
        let catalog = Arc::new(FieldCatalog::new(storage.clone(), preferences.clone()));

        Self {
            settings,
            event_bus,
            storage,
            preferences,
            catalog,
        }
    }

    /// State with in-memory storage and default settings
    pub fn in_memory() -> Self {
        Self::new(AppSettings::default(), Arc::new(MemoryStorage::new()), None)
    }

    /// Open the storage named in the settings
    pub fn open(settings: AppSettings, mirror: Option<Arc<dyn PreferenceMirror>>) -> Result<Self, ReportError> {
        let storage: Arc<dyn KeyValueStorage> = match &settings.storage_path {
            Some(path) => {
                info!(path = %path.display(), "using file preference storage");
                Arc::new(FileStorage::open(path)?)
            }
            None => Arc::new(MemoryStorage::new()),
        };
        Ok(Self::new(settings, storage, mirror))
    }
}
