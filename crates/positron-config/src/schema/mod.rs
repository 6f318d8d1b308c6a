//! Configuration schema types for Positron.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod app;
mod dev_server;
mod ipc;
mod logging;
mod window;

pub use app::*;
pub use dev_server::*;
pub use ipc::*;
pub use logging::*;
pub use window::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for a Positron application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PositronConfig {
    pub app: AppConfig,
    pub window: WindowConfig,
    pub ipc: IpcConfig,
    pub dev_server: DevServerConfig,
    pub logging: LoggingConfig,
}

// =============================================================================
// Tests
// =============================================================================
