use crate::config::FactoryConfig;
use crate::keys::KeyMaterial;
use crate::notify::CodeNotifier;
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub keys: Arc<KeyMaterial>,
    pub config: Arc<FactoryConfig>,
    pub notifier: Arc<dyn CodeNotifier>,
}

impl AppState {
    pub fn new(
        store: Store,
        keys: KeyMaterial,
        config: FactoryConfig,
        notifier: Arc<dyn CodeNotifier>,
    ) -> Self {
        Self {
            store,
            keys: Arc::new(keys),
            config: Arc::new(config),
            notifier,
        }
    }
}
