//! Wire shapes for both directions of the bridge.
//!
//! - **Content -> host**: the injected stub posts a JSON [`IpcMessage`] over the
//!   engine's native message channel (`window.ipc.postMessage`).
//! - **Host -> content**: the host evaluates a script built from an
//!   [`Outbound`], which calls the stub's `_receive` / `_reject` entry points.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use positron_common::IpcError;

/// Name of the one-shot channel an invoke's reply travels on.
pub fn reply_channel_for(channel: &str, message_id: u64) -> String {
    format!("{channel}-reply-{message_id}")
}

/// A message from content to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IpcMessage {
    /// Fire-and-forget; the handler's return value is discarded.
    Send {
        channel: String,
        #[serde(default)]
        args: Vec<Value>,
    },
    /// Request/response; the reply is delivered on `reply_channel`.
    #[serde(rename_all = "camelCase")]
    Invoke {
        channel: String,
        reply_channel: String,
        message_id: u64,
        #[serde(default)]
        args: Vec<Value>,
    },
}

impl IpcMessage {
    /// Parse and validate a raw body posted by content.
    pub fn from_json(raw: &str) -> Result<Self, IpcError> {
        let message: Self =
            serde_json::from_str(raw).map_err(|e| IpcError::Malformed(e.to_string()))?;

        if let Self::Invoke {
            channel,
            reply_channel,
            message_id,
            ..
        } = &message
        {
            let expected = reply_channel_for(channel, *message_id);
            if *reply_channel != expected {
                return Err(IpcError::Malformed(format!(
                    "reply channel '{reply_channel}' does not match '{expected}'"
                )));
            }
        }

        Ok(message)
    }

    pub fn to_json(&self) -> String {
        // Only strings, integers and `Value`s: serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn channel(&self) -> &str {
        match self {
            Self::Send { channel, .. } | Self::Invoke { channel, .. } => channel,
        }
    }

    pub fn args(&self) -> &[Value] {
        match self {
            Self::Send { args, .. } | Self::Invoke { args, .. } => args,
        }
    }
}

/// A delivery from the host to content.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Fan `args` out to the content's listeners on `channel`.
    Receive { channel: String, args: Vec<Value> },
    /// Fail the pending invoke waiting on `reply_channel`.
    Reject {
        reply_channel: String,
        message: String,
    },
    /// Arbitrary script evaluation requested by the application.
    Script(String),
}

impl Outbound {
    /// Render as a script for an engine whose stub lives at `window[global]`.
    pub fn to_script(&self, global: &str) -> String {
        match self {
            Self::Receive { channel, args } => {
                let mut call_args = vec![js_string(channel)];
                call_args.extend(
                    args.iter()
                        .map(|a| serde_json::to_string(a).unwrap_or_else(|_| "null".into())),
                );
                stub_call(global, "_receive", &call_args.join(", "))
            }
            Self::Reject {
                reply_channel,
                message,
            } => stub_call(
                global,
                "_reject",
                &format!("{}, {}", js_string(reply_channel), js_string(message)),
            ),
            Self::Script(script) => script.clone(),
        }
    }
}

fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".into())
}

fn stub_call(global: &str, entry: &str, args: &str) -> String {
    format!(
        "(function(){{var r=window[{g}]&&window[{g}].ipcRenderer;if(r){{r.{entry}({args});}}}})();",
        g = js_string(global),
    )
}
