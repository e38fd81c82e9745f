use std::path::Path;

use jevons_app::AppState;

#[derive(Clone)]
pub struct AppContext {
    pub app_state: AppState,
}

impl AppContext {
    pub fn new(app_state: AppState) -> Self {
        Self { app_state }
    }

    pub fn data_dir(&self) -> &Path {
        &self.app_state.config.data_dir
    }
}
