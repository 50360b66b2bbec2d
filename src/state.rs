//! Shared application state for all routes.

use crate::config::SchemaRegistry;
use crate::settings::Settings;
use crate::store::StoreClient;
use std::sync::Arc;

/// One store client and one registry per process, handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StoreClient>,
    pub registry: Arc<SchemaRegistry>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(store: Arc<dyn StoreClient>, registry: SchemaRegistry, settings: Settings) -> Self {
        AppState {
            store,
            registry: Arc::new(registry),
            settings: Arc::new(settings),
        }
    }
}
