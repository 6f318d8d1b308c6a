use std::path::PathBuf;

use crate::id::WindowId;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures on the message bridge between host and content.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IpcError {
    #[error("handler for '{channel}' failed: {message}")]
    HandlerFailed { channel: String, message: String },

    #[error("invoke on '{channel}' timed out after {timeout_ms}ms")]
    Timeout { channel: String, timeout_ms: u64 },

    #[error("invoke on '{channel}' rejected: {message}")]
    Rejected { channel: String, message: String },

    #[error("bridge closed before a reply arrived")]
    Closed,

    #[error("malformed ipc message: {0}")]
    Malformed(String),

    #[error("{0} is no longer open")]
    WindowGone(WindowId),
}

#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("content file not found: {0}")]
    ContentNotFound(PathBuf),

    #[error("{0} is closed")]
    Closed(WindowId),

    #[error("no such window: {0}")]
    UnknownWindow(WindowId),

    #[error("unknown event '{0}'")]
    UnknownEvent(String),

    #[error("rendering engine error: {0}")]
    Engine(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DevServerError {
    #[error("failed to spawn dev server: {0}")]
    Spawn(String),

    #[error("dev server failed to start within {secs} seconds")]
    ReadyTimeout { secs: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum PositronError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ipc(#[from] IpcError),

    #[error(transparent)]
    Window(#[from] WindowError),

    #[error(transparent)]
    DevServer(#[from] DevServerError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ValidationError("window.width = 5".into());
        assert_eq!(err.to_string(), "config validation error: window.width = 5");
    }

    #[test]
    fn ipc_error_display_names_the_channel() {
        let err = IpcError::HandlerFailed {
            channel: "greet".into(),
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "handler for 'greet' failed: boom");

        let err = IpcError::Timeout {
            channel: "slow".into(),
            timeout_ms: 250,
        };
        assert_eq!(err.to_string(), "invoke on 'slow' timed out after 250ms");

        let err = IpcError::WindowGone(WindowId(3));
        assert_eq!(err.to_string(), "window-3 is no longer open");
    }

    #[test]
    fn window_error_display() {
        let err = WindowError::Closed(WindowId(1));
        assert_eq!(err.to_string(), "window-1 is closed");

        let err = WindowError::UnknownEvent("resize".into());
        assert_eq!(err.to_string(), "unknown event 'resize'");
    }

    #[test]
    fn positron_error_from_variants() {
        let err: PositronError = ConfigError::ParseError("bad toml".into()).into();
        assert!(matches!(err, PositronError::Config(_)));
        assert!(err.to_string().contains("bad toml"));

        let err: PositronError = IpcError::Closed.into();
        assert!(matches!(err, PositronError::Ipc(IpcError::Closed)));

        let err: PositronError = DevServerError::ReadyTimeout { secs: 30 }.into();
        assert_eq!(
            err.to_string(),
            "dev server failed to start within 30 seconds"
        );

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: PositronError = io_err.into();
        assert!(matches!(err, PositronError::Io(_)));
    }
}
