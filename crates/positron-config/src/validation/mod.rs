//! Full configuration validation.
//!
//! Validates numeric ranges and color formats, collecting every problem
//! into a single `ConfigError`.

mod helpers;

#[cfg(test)]
mod tests;

use crate::schema::PositronConfig;
use positron_common::ConfigError;

use helpers::{validate_hex_color, validate_range, validate_range_u64};

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &PositronConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_window(&mut errors, config);
    validate_ipc(&mut errors, config);
    validate_dev_server(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_window(errors: &mut Vec<String>, config: &PositronConfig) {
    let window = &config.window;
    validate_range(errors, "window.width", window.width, 100, 10_000);
    validate_range(errors, "window.height", window.height, 100, 10_000);
    if window.min_width > window.width {
        errors.push(format!(
            "window.min_width = {} exceeds window.width = {}",
            window.min_width, window.width
        ));
    }
    if window.min_height > window.height {
        errors.push(format!(
            "window.min_height = {} exceeds window.height = {}",
            window.min_height, window.height
        ));
    }
    validate_hex_color(errors, "window.background_color", &window.background_color);
}

fn validate_ipc(errors: &mut Vec<String>, config: &PositronConfig) {
    let ipc = &config.ipc;
    validate_range_u64(
        errors,
        "ipc.bridge_poll_interval_ms",
        ipc.bridge_poll_interval_ms,
        10,
        5_000,
    );
    if ipc.bridge_ready_timeout_ms < ipc.bridge_poll_interval_ms {
        errors.push(format!(
            "ipc.bridge_ready_timeout_ms = {} is shorter than one poll interval",
            ipc.bridge_ready_timeout_ms
        ));
    }
    let name_ok = !ipc.global_name.is_empty()
        && ipc
            .global_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !ipc.global_name.starts_with(|c: char| c.is_ascii_digit());
    if !name_ok {
        errors.push(format!(
            "ipc.global_name = {:?} is not a valid JavaScript identifier",
            ipc.global_name
        ));
    }
}

fn validate_dev_server(errors: &mut Vec<String>, config: &PositronConfig) {
    let dev = &config.dev_server;
    if dev.port == 0 {
        errors.push("dev_server.port = 0 is out of range [1, 65535]".into());
    }
    validate_range_u64(
        errors,
        "dev_server.wait_timeout_secs",
        dev.wait_timeout_secs,
        1,
        600,
    );
    if dev.command.trim().is_empty() {
        errors.push("dev_server.command must not be empty".into());
    }
}
