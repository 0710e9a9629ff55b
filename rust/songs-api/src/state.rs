use crate::{config::AppConfig, service::SongService};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub songs: SongService,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, songs: SongService) -> Self {
        Self { config, songs }
    }
}
