//! Validation tests.

use super::*;

#[test]
fn default_config_is_valid() {
    assert!(validate(&PositronConfig::default()).is_ok());
}

#[test]
fn window_size_out_of_range() {
    let mut config = PositronConfig::default();
    config.window.width = 50;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("window.width = 50"));
}

#[test]
fn min_size_larger_than_size() {
    let mut config = PositronConfig::default();
    config.window.min_height = 900;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("window.min_height"));
}

#[test]
fn bad_background_color() {
    let mut config = PositronConfig::default();
    config.window.background_color = "white".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("window.background_color"));
}

#[test]
fn poll_interval_out_of_range() {
    let mut config = PositronConfig::default();
    config.ipc.bridge_poll_interval_ms = 1;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("ipc.bridge_poll_interval_ms = 1"));
}

#[test]
fn global_name_must_be_identifier() {
    let mut config = PositronConfig::default();
    config.ipc.global_name = "my-app".into();
    assert!(validate(&config).is_err());

    config.ipc.global_name = "9lives".into();
    assert!(validate(&config).is_err());

    config.ipc.global_name = "$app_1".into();
    assert!(validate(&config).is_ok());
}

#[test]
fn dev_server_port_zero_rejected() {
    let mut config = PositronConfig::default();
    config.dev_server.port = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("dev_server.port"));
}

#[test]
fn multiple_errors_are_joined() {
    let mut config = PositronConfig::default();
    config.window.width = 1;
    config.dev_server.wait_timeout_secs = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("window.width"));
    assert!(err.contains("dev_server.wait_timeout_secs"));
    assert!(err.contains("; "));
}
