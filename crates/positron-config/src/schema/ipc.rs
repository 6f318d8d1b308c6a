//! IPC bridge timing.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IpcConfig {
    /// How long an `invoke` waits for its reply. `0` waits forever.
    pub invoke_timeout_ms: u64,
    /// Interval at which the content-side stub polls for the host transport.
    pub bridge_poll_interval_ms: u64,
    /// Give up on the host transport after this long; queued invokes reject.
    pub bridge_ready_timeout_ms: u64,
    /// Global object the stub installs on `window` (`window.positron`).
    pub global_name: String,
}

impl IpcConfig {
    pub fn invoke_timeout(&self) -> Option<Duration> {
        match self.invoke_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            invoke_timeout_ms: 30_000,
            bridge_poll_interval_ms: 100,
            bridge_ready_timeout_ms: 10_000,
            global_name: "positron".into(),
        }
    }
}
