use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Operator choices remembered between runner sessions.
#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct PersistentSettings {
    pub last_host: Option<String>,
}

impl PersistentSettings {
    pub fn remember_host(&mut self, host: &str) -> bool {
        if self.last_host.as_deref() == Some(host) {
            return false;
        }
        self.last_host = Some(host.to_string());
        true
    }
}

pub fn load_settings(path: &Path) -> PersistentSettings {
    let Ok(content) = std::fs::read_to_string(path) else {
        return PersistentSettings::default();
    };
    serde_json::from_str(&content).unwrap_or_else(|e| {
        debug!("Ignoring unreadable settings at {:?}: {}", path, e);
        PersistentSettings::default()
    })
}

pub fn save_settings(path: &Path, settings: &PersistentSettings) {
    match serde_json::to_string_pretty(settings) {
        Ok(json) => {
            if let Err(e) = std::fs::write(path, json) {
                warn!("Failed to save settings to {:?}: {}", path, e);
            }
        }
        Err(e) => warn!("Failed to serialize settings: {}", e),
    }
}
