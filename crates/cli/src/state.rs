use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Small bits of CLI state that survive between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppState {
    /// Dataset the last `label` session worked on.
    pub selected_dataset: Option<String>,
}

impl AppState {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("LabelLoop").join("state.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| fs::read_to_string(path).ok())
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) {
        if let Some(path) = Self::config_path() {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            if let Ok(json) = serde_json::to_string_pretty(self) {
                let _ = fs::write(path, json);
            }
        }
    }
}
