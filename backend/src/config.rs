use shared::models::ModelSettings;
use std::path::PathBuf;

pub const DEFAULT_LIBRARY_PATH: &str = "knowledge_library.json";

#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub library_path: PathBuf,
    pub model: ModelSettings,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            library_path: DEFAULT_LIBRARY_PATH.into(),
            model: ModelSettings::default(),
        }
    }
}
