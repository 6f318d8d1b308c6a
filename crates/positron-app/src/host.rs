//! The two entry points content can reach in the host.
//!
//! `ipc_send` is fire-and-forget and never fails towards the page: the
//! outcome is a record. `ipc_invoke` answers on the invoke's reply channel,
//! or rejects the page's pending invoke when the handler fails.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use positron_common::IpcError;
use positron_ipc::{IpcMain, WebContents};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendOutcome {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn failed(error: &IpcError) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
        }
    }
}

pub fn ipc_send(ipc: &IpcMain, sender: &WebContents, channel: &str, args: &[Value]) -> SendOutcome {
    match ipc.dispatch(channel, sender, args) {
        Ok(_) => SendOutcome::ok(),
        Err(e) => SendOutcome::failed(&e),
    }
}

/// Dispatch an invoke and route the result back to `sender`. Listeners and
/// unhandled channels answer `null`.
pub fn ipc_invoke(
    ipc: &IpcMain,
    sender: &WebContents,
    channel: &str,
    reply_channel: &str,
    args: &[Value],
) -> Result<Value, IpcError> {
    match ipc.dispatch_with_reply(channel, sender, Some(reply_channel), args) {
        Ok(value) => {
            let value = value.unwrap_or(Value::Null);
            if let Err(e) = sender.send(reply_channel, vec![value.clone()]) {
                warn!(channel, reply_channel, error = %e, "failed to queue invoke reply");
            }
            Ok(value)
        }
        Err(e) => {
            if let Err(send_err) = sender.reject(reply_channel, &e.to_string()) {
                warn!(channel, reply_channel, error = %send_err, "failed to queue invoke rejection");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use positron_common::{Diagnostic, MemorySink, WindowId};
    use positron_ipc::{outbox, Outbound};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn send_outcome_reports_handler_failure() {
        let sink = MemorySink::default();
        let ipc = IpcMain::new(Arc::new(sink.clone()));
        ipc.on("boom", |_, _| Err("exploded".into()));
        let (outbox, _rx) = outbox();
        let sender = WebContents::new(WindowId(1), outbox);

        let outcome = ipc_send(&ipc, &sender, "boom", &[]);
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("exploded"));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn send_outcome_serializes_without_error_field() {
        let ipc = IpcMain::default();
        let (outbox, _rx) = outbox();
        let sender = WebContents::new(WindowId(1), outbox);

        let outcome = ipc_send(&ipc, &sender, "nobody", &[]);
        assert_eq!(serde_json::to_value(&outcome).unwrap(), json!({"success": true}));
    }

    #[test]
    fn invoke_replies_on_reply_channel() {
        let ipc = IpcMain::default();
        ipc.handle("double", |_, args| {
            Ok(args.first().and_then(Value::as_i64).unwrap_or(0) * 2)
        });
        let (outbox, mut rx) = outbox();
        let sender = WebContents::new(WindowId(3), outbox);

        let value = ipc_invoke(&ipc, &sender, "double", "double-reply-0", &[json!(21)]).unwrap();
        assert_eq!(value, json!(42));

        let delivery = rx.try_recv().unwrap();
        assert_eq!(delivery.window, WindowId(3));
        assert_eq!(
            delivery.outbound,
            Outbound::Receive {
                channel: "double-reply-0".into(),
                args: vec![json!(42)],
            }
        );
    }

    #[test]
    fn invoke_failure_rejects_pending_call() {
        let sink = MemorySink::default();
        let ipc = IpcMain::new(Arc::new(sink.clone()));
        ipc.handle("fail", |_, _| -> positron_ipc::HandlerResult<Value> { Err("nope".into()) });
        let (outbox, mut rx) = outbox();
        let sender = WebContents::new(WindowId(1), outbox);

        let err = ipc_invoke(&ipc, &sender, "fail", "fail-reply-4", &[]).unwrap_err();
        assert!(matches!(err, IpcError::HandlerFailed { ref channel, .. } if channel == "fail"));
        assert!(matches!(
            rx.try_recv().unwrap().outbound,
            Outbound::Reject { ref reply_channel, ref message }
                if reply_channel == "fail-reply-4" && message.contains("nope")
        ));
        assert!(matches!(
            sink.entries().as_slice(),
            [Diagnostic::HandlerFailed { .. }]
        ));
    }

    #[test]
    fn unhandled_invoke_answers_null() {
        let ipc = IpcMain::default();
        let (outbox, mut rx) = outbox();
        let sender = WebContents::new(WindowId(1), outbox);

        assert_eq!(
            ipc_invoke(&ipc, &sender, "missing", "missing-reply-0", &[]).unwrap(),
            Value::Null
        );
        assert!(matches!(
            rx.try_recv().unwrap().outbound,
            Outbound::Receive { ref args, .. } if args == &vec![Value::Null]
        ));
    }
}
