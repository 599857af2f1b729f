use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::Config;
use crate::realtime::{ControllerRegistry, CountdownRegistry};
use crate::store::{RoomDefaults, RoomStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RoomStore>,
    pub config: Config,
    pub countdowns: CountdownRegistry,
    pub controllers: Arc<ControllerRegistry>,
}

impl AppState {
    /// Wires the realtime registries to `store` using the settings in `config`.
    pub fn new(store: Arc<dyn RoomStore>, config: Config) -> Self {
        let countdowns = CountdownRegistry::new(
            store.clone(),
            config.countdown_tick,
            config.store_max_retries,
        );
        let controllers = Arc::new(ControllerRegistry::new(config.gesture, config.controller_idle));
        Self {
            store,
            config,
            countdowns,
            controllers,
        }
    }

    pub fn room_defaults(config: &Config) -> RoomDefaults {
        RoomDefaults {
            mode: config.default_mode,
            time_per_round: config.default_time_per_round,
        }
    }
}

impl FromRef<AppState> for Arc<dyn RoomStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
