//! External bundler / dev-server settings.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DevServerConfig {
    /// Shell command that starts the server.
    pub command: String,
    /// Working directory (where `package.json` lives).
    pub cwd: PathBuf,
    pub host: String,
    pub port: u16,
    /// Seconds to wait for readiness before giving up (valid range: 1-600).
    pub wait_timeout_secs: u64,
    /// Case-insensitive substrings in server output that signal readiness.
    pub ready_patterns: Vec<String>,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            command: "npm run dev".into(),
            cwd: PathBuf::from("."),
            host: "localhost".into(),
            port: 5173,
            wait_timeout_secs: 30,
            ready_patterns: vec!["ready in".into(), "local:".into()],
        }
    }
}
