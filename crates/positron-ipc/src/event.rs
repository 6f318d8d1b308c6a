//! Event context handed to handlers, and the route back to the sender.
//!
//! Handlers never talk to a rendering engine directly. Replies are pushed
//! into the [`Outbox`] as [`Delivery`] values; the application drains it on
//! its event loop and evaluates them in the right window. This keeps
//! handlers usable from any thread.

use std::fmt;

use serde_json::Value;
use tokio::sync::mpsc;

use positron_common::{IpcError, WindowId};

use crate::message::Outbound;

/// One host -> content delivery addressed to a window.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub window: WindowId,
    pub outbound: Outbound,
}

/// Sending half of the host -> content delivery queue.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<Delivery>,
}

/// Create a delivery queue. The receiver belongs to the event loop.
pub fn outbox() -> (Outbox, mpsc::UnboundedReceiver<Delivery>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Outbox { tx }, rx)
}

impl Outbox {
    pub fn push(&self, window: WindowId, outbound: Outbound) -> Result<(), IpcError> {
        self.tx
            .send(Delivery { window, outbound })
            .map_err(|_| IpcError::WindowGone(window))
    }
}

/// Handle to the content hosted in one window.
#[derive(Debug, Clone)]
pub struct WebContents {
    id: WindowId,
    outbox: Outbox,
}

impl WebContents {
    pub fn new(id: WindowId, outbox: Outbox) -> Self {
        Self { id, outbox }
    }

    /// The window this content lives in.
    pub fn id(&self) -> WindowId {
        self.id
    }

    /// Deliver `args` to the content's listeners on `channel`.
    pub fn send(&self, channel: &str, args: Vec<Value>) -> Result<(), IpcError> {
        self.outbox.push(
            self.id,
            Outbound::Receive {
                channel: channel.to_string(),
                args,
            },
        )
    }

    /// Fail the content's pending invoke on `reply_channel`.
    pub fn reject(&self, reply_channel: &str, message: &str) -> Result<(), IpcError> {
        self.outbox.push(
            self.id,
            Outbound::Reject {
                reply_channel: reply_channel.to_string(),
                message: message.to_string(),
            },
        )
    }

    /// Queue an arbitrary script for evaluation in the content.
    pub fn execute_script(&self, script: impl Into<String>) -> Result<(), IpcError> {
        self.outbox.push(self.id, Outbound::Script(script.into()))
    }
}

/// Context for a single dispatch. Created fresh per message and dropped
/// once the handler returns.
pub struct IpcEvent {
    sender: WebContents,
    channel: String,
    reply_channel: Option<String>,
}

impl IpcEvent {
    pub(crate) fn new(sender: WebContents, channel: &str, reply_channel: Option<&str>) -> Self {
        Self {
            sender,
            channel: channel.to_string(),
            reply_channel: reply_channel.map(str::to_string),
        }
    }

    /// The content that sent the message.
    pub fn sender(&self) -> &WebContents {
        &self.sender
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Set when the message is an invoke awaiting a reply.
    pub fn reply_channel(&self) -> Option<&str> {
        self.reply_channel.as_deref()
    }

    /// Send a message back to the sender on `channel`.
    pub fn reply(&self, channel: &str, args: Vec<Value>) -> Result<(), IpcError> {
        self.sender.send(channel, args)
    }
}

impl fmt::Debug for IpcEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IpcEvent")
            .field("sender", &self.sender.id)
            .field("channel", &self.channel)
            .field("reply_channel", &self.reply_channel)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reply_routes_to_sender() {
        let (outbox, mut rx) = outbox();
        let contents = WebContents::new(WindowId(2), outbox);
        let event = IpcEvent::new(contents, "greet", Some("greet-reply-0"));

        event.reply("greet-reply-0", vec![json!("hi")]).unwrap();

        let delivery = rx.try_recv().unwrap();
        assert_eq!(delivery.window, WindowId(2));
        assert_eq!(
            delivery.outbound,
            Outbound::Receive {
                channel: "greet-reply-0".into(),
                args: vec![json!("hi")],
            }
        );
        assert_eq!(event.reply_channel(), Some("greet-reply-0"));
        assert_eq!(event.channel(), "greet");
    }

    #[test]
    fn send_after_receiver_dropped_is_window_gone() {
        let (outbox, rx) = outbox();
        drop(rx);
        let contents = WebContents::new(WindowId(5), outbox);
        assert_eq!(
            contents.send("x", vec![]),
            Err(IpcError::WindowGone(WindowId(5)))
        );
    }

    #[test]
    fn reject_and_script_deliveries() {
        let (outbox, mut rx) = outbox();
        let contents = WebContents::new(WindowId(1), outbox);
        contents.reject("a-reply-1", "nope").unwrap();
        contents.execute_script("1 + 1").unwrap();

        assert!(matches!(
            rx.try_recv().unwrap().outbound,
            Outbound::Reject { ref reply_channel, .. } if reply_channel == "a-reply-1"
        ));
        assert_eq!(
            rx.try_recv().unwrap().outbound,
            Outbound::Script("1 + 1".into())
        );
    }
}
