//! Default options for new browser windows.

use serde::{Deserialize, Serialize};

/// Window options. Every `BrowserWindow` starts from these and may
/// override individual fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub min_width: u32,
    pub min_height: u32,
    pub resizable: bool,
    /// No native title bar or borders.
    pub frameless: bool,
    pub fullscreen: bool,
    /// `#RRGGBB` painted before content loads.
    pub background_color: String,
    /// Show the window as soon as it is created.
    pub show: bool,
    pub center: bool,
    /// Enable the engine's developer tools (always on in debug builds).
    pub devtools: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Positron".into(),
            width: 800,
            height: 600,
            min_width: 200,
            min_height: 100,
            resizable: true,
            frameless: false,
            fullscreen: false,
            background_color: "#FFFFFF".into(),
            show: true,
            center: true,
            devtools: cfg!(debug_assertions),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
