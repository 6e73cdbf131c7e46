//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::RoomRegistry;
use crate::lobby::LobbyService;
use crate::ws::SessionHub;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub hub: Arc<SessionHub>,
    pub registry: Arc<RoomRegistry>,
    pub lobby: Arc<LobbyService>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let rules = Arc::new(config.rules.clone());

        let hub = Arc::new(SessionHub::new());
        let registry = Arc::new(RoomRegistry::new());
        let lobby = Arc::new(LobbyService::new(rules, hub.clone(), registry.clone()));

        Self {
            config,
            hub,
            registry,
            lobby,
        }
    }
}
