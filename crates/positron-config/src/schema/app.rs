//! Application identity and lifecycle policy.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    pub version: String,
    /// Quit when the last window closes and nobody listens for
    /// `window-all-closed`.
    pub quit_on_all_windows_closed: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Positron App".into(),
            version: "0.1.0".into(),
            quit_on_all_windows_closed: true,
        }
    }
}
