/// Shared application state
use std::sync::Arc;

use crate::config::Config;
use crate::services::Engine;
use crate::store::EntityStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub engine: Engine,
}

impl AppState {
    pub fn new(config: Config, store: Arc<EntityStore>) -> Self {
        let engine = Engine::new(store, config.limits);
        Self { config, engine }
    }
}
