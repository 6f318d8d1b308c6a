//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Positron Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[app]
# name = "Positron App"
# version = "0.1.0"
# quit_on_all_windows_closed = true

[window]
# title = "Positron"
# width = 800              # 100-10000
# height = 600             # 100-10000
# min_width = 200
# min_height = 100
# resizable = true
# frameless = false
# fullscreen = false
# background_color = "#FFFFFF"
# show = true
# center = true

[ipc]
# invoke_timeout_ms = 30000        # 0 = wait forever
# bridge_poll_interval_ms = 100    # 10-5000
# bridge_ready_timeout_ms = 10000
# global_name = "positron"

[dev_server]
# command = "npm run dev"
# cwd = "."
# host = "localhost"
# port = 5173
# wait_timeout_secs = 30           # 1-600
# ready_patterns = ["ready in", "local:"]

[logging]
# level = "info"                   # trace, debug, info, warn, error
"##
    .to_string()
}
