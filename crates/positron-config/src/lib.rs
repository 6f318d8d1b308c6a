//! Positron configuration system.
//!
//! TOML-based configuration for the application shell: app identity,
//! default window options, IPC bridge timing, the dev-server collaborator
//! and logging. All sections use defaults so partial configs work.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use positron_config::{load_config, config_to_json};
//!
//! let config = load_config().expect("failed to load config");
//! println!("{}", config_to_json(&config));
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    AppConfig, DevServerConfig, IpcConfig, LogLevel, LoggingConfig, PositronConfig, WindowConfig,
    CONFIG_SCHEMA_VERSION,
};

use positron_common::ConfigError;
use std::path::Path;

/// Load config from the platform default path, creating it if missing.
///
/// Out-of-range values are logged as warnings, not rejected; call
/// [`validation::validate`] for a strict check.
pub fn load_config() -> Result<PositronConfig, ConfigError> {
    toml_loader::load_default()
}

/// Load config from an explicit path (the `--config` override).
pub fn load_config_from(path: &Path) -> Result<PositronConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }
    toml_loader::load_from_path(path)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &PositronConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_to_json_contains_all_sections() {
        let config = PositronConfig::default();
        let json = config_to_json(&config);
        assert!(json.contains("\"app\""));
        assert!(json.contains("\"window\""));
        assert!(json.contains("\"ipc\""));
        assert!(json.contains("\"dev_server\""));
        assert!(json.contains("\"logging\""));
    }

    #[test]
    fn config_schema_version_is_1() {
        assert_eq!(CONFIG_SCHEMA_VERSION, 1);
    }

    #[test]
    fn default_config_round_trips_through_json() {
        let config = PositronConfig::default();
        let json = config_to_json(&config);
        let parsed: PositronConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.window.title, "Positron");
        assert_eq!(parsed.ipc.invoke_timeout_ms, 30_000);
        assert_eq!(parsed.dev_server.port, 5173);
    }

    #[test]
    fn load_config_from_missing_path_is_file_not_found() {
        let err = load_config_from(Path::new("/tmp/definitely_missing_positron.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }
}
