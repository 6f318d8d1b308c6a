//! Content-side bridge.
//!
//! [`BridgeScript`] is the JavaScript injected into real pages.
//! [`RendererBridge`] is an in-process model of the same stub, used by the
//! headless engine and by tests to play the part of page scripts.
//!
//! Correlation follows the injected script exactly: each `invoke` takes the
//! next message id (starting at 0), registers a pending entry on
//! `"<channel>-reply-<id>"`, and posts the request. A `receive` on that reply
//! channel settles the entry with its first argument; `reject` fails it.

mod script;

#[cfg(test)]
mod tests;

pub use script::BridgeScript;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::Instant;

use positron_common::IpcError;
use positron_config::IpcConfig;

use crate::message::{reply_channel_for, IpcMessage};

/// The engine's native content -> host message channel
/// (`window.ipc.postMessage` in a real page).
pub trait Transport: Send + Sync {
    fn post_message(&self, body: String) -> Result<(), IpcError>;
}

/// Content-side listener callback. Receives the delivered arguments.
pub type Listener = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Returned by [`RendererBridge::on`] / [`RendererBridge::once`]; used to
/// remove that one listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Reply = Result<Value, IpcError>;

struct Entry {
    id: ListenerId,
    once: bool,
    callback: Listener,
}

struct Pending {
    channel: String,
    tx: oneshot::Sender<Reply>,
}

#[derive(Default)]
struct State {
    listeners: HashMap<String, Vec<Entry>>,
    pending: HashMap<String, Pending>,
    queue: Vec<IpcMessage>,
    transport: Option<Arc<dyn Transport>>,
    closed: bool,
}

struct Inner {
    state: Mutex<State>,
    next_message_id: AtomicU64,
    next_listener_id: AtomicU64,
    invoke_timeout: Option<Duration>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One page's bridge instance. Cloning shares the instance.
#[derive(Clone)]
pub struct RendererBridge {
    inner: Arc<Inner>,
}

impl RendererBridge {
    pub fn new(invoke_timeout: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                next_message_id: AtomicU64::new(0),
                next_listener_id: AtomicU64::new(0),
                invoke_timeout,
            }),
        }
    }

    pub fn from_config(config: &IpcConfig) -> Self {
        Self::new(config.invoke_timeout())
    }

    /// Connect the host transport and flush anything queued before it
    /// existed, in order.
    pub fn attach(&self, transport: Arc<dyn Transport>) -> Result<(), IpcError> {
        let queued = {
            let mut state = self.inner.state();
            if state.closed {
                return Err(IpcError::Closed);
            }
            state.transport = Some(Arc::clone(&transport));
            std::mem::take(&mut state.queue)
        };

        if !queued.is_empty() {
            tracing::debug!(count = queued.len(), "flushing queued bridge messages");
        }
        for message in queued {
            transport.post_message(message.to_json())?;
        }
        Ok(())
    }

    pub fn is_attached(&self) -> bool {
        self.inner.state().transport.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state().closed
    }

    /// Fire-and-forget message to the host.
    pub fn send(&self, channel: &str, args: Vec<Value>) -> Result<(), IpcError> {
        self.post(IpcMessage::Send {
            channel: channel.to_string(),
            args,
        })
    }

    /// Request/response call. The returned [`Invocation`] settles when the
    /// host replies on its reply channel, rejects, or the timeout elapses.
    pub fn invoke(&self, channel: &str, args: Vec<Value>) -> Invocation {
        let message_id = self.inner.next_message_id.fetch_add(1, Ordering::SeqCst);
        let reply_channel = reply_channel_for(channel, message_id);
        let (tx, rx) = oneshot::channel();

        self.inner.state().pending.insert(
            reply_channel.clone(),
            Pending {
                channel: channel.to_string(),
                tx,
            },
        );

        let guard = CancelGuard {
            reply_channel: reply_channel.clone(),
            inner: Arc::downgrade(&self.inner),
        };

        tracing::debug!(channel, message_id, "invoking host channel");

        let posted = self.post(IpcMessage::Invoke {
            channel: channel.to_string(),
            reply_channel: reply_channel.clone(),
            message_id,
            args,
        });
        if let Err(e) = posted {
            self.settle(&reply_channel, Err(e));
        }

        Invocation {
            message_id,
            channel: channel.to_string(),
            reply_channel,
            deadline: self.inner.invoke_timeout.map(|t| Instant::now() + t),
            timeout: self.inner.invoke_timeout,
            rx,
            _guard: guard,
        }
    }

    pub fn on<F>(&self, channel: &str, callback: F) -> ListenerId
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.add_listener(channel, false, Arc::new(callback))
    }

    pub fn once<F>(&self, channel: &str, callback: F) -> ListenerId
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.add_listener(channel, true, Arc::new(callback))
    }

    pub fn remove_listener(&self, channel: &str, id: ListenerId) {
        let mut state = self.inner.state();
        if let Some(entries) = state.listeners.get_mut(channel) {
            entries.retain(|e| e.id != id);
            if entries.is_empty() {
                state.listeners.remove(channel);
            }
        }
    }

    /// Drop listeners on `channel`, or on every channel when `None`.
    /// Pending invokes are unaffected.
    pub fn remove_all_listeners(&self, channel: Option<&str>) {
        let mut state = self.inner.state();
        match channel {
            Some(channel) => {
                state.listeners.remove(channel);
            }
            None => state.listeners.clear(),
        }
    }

    pub fn listener_count(&self, channel: &str) -> usize {
        self.inner
            .state()
            .listeners
            .get(channel)
            .map_or(0, Vec::len)
    }

    /// Number of invokes still waiting for a reply.
    pub fn pending_count(&self) -> usize {
        self.inner.state().pending.len()
    }

    /// Host -> content delivery (`_receive`).
    ///
    /// A pending invoke on `channel` is settled with the first argument
    /// (`null` if none). Otherwise once-listeners are consumed, then every
    /// listener registered for the channel runs, in registration order.
    /// Returns the number of callbacks that ran.
    pub fn receive(&self, channel: &str, args: &[Value]) -> usize {
        let value = args.first().cloned().unwrap_or(Value::Null);
        if self.settle(channel, Ok(value)) {
            return 0;
        }

        let callbacks: Vec<Listener> = {
            let mut state = self.inner.state();
            let Some(entries) = state.listeners.get_mut(channel) else {
                return 0;
            };
            let callbacks = entries.iter().map(|e| Arc::clone(&e.callback)).collect();
            entries.retain(|e| !e.once);
            if entries.is_empty() {
                state.listeners.remove(channel);
            }
            callbacks
        };

        for callback in &callbacks {
            callback(args);
        }
        callbacks.len()
    }

    /// Host -> content rejection of a pending invoke (`_reject`).
    pub fn reject(&self, reply_channel: &str, message: &str) -> bool {
        let channel = match self.inner.state().pending.get(reply_channel) {
            Some(p) => p.channel.clone(),
            None => return false,
        };
        self.settle(
            reply_channel,
            Err(IpcError::Rejected {
                channel,
                message: message.to_string(),
            }),
        )
    }

    /// Tear the page down: pending invokes fail with [`IpcError::Closed`],
    /// listeners and queued messages are discarded.
    pub fn close(&self) {
        let pending = {
            let mut state = self.inner.state();
            if state.closed {
                return;
            }
            state.closed = true;
            state.listeners.clear();
            state.queue.clear();
            state.transport = None;
            std::mem::take(&mut state.pending)
        };
        if !pending.is_empty() {
            tracing::debug!(count = pending.len(), "dropping pending invokes on close");
        }
        for (_, p) in pending {
            let _ = p.tx.send(Err(IpcError::Closed));
        }
    }

    fn add_listener(&self, channel: &str, once: bool, callback: Listener) -> ListenerId {
        let id = ListenerId(self.inner.next_listener_id.fetch_add(1, Ordering::SeqCst));
        self.inner
            .state()
            .listeners
            .entry(channel.to_string())
            .or_default()
            .push(Entry { id, once, callback });
        id
    }

    fn post(&self, message: IpcMessage) -> Result<(), IpcError> {
        let transport = {
            let mut state = self.inner.state();
            if state.closed {
                return Err(IpcError::Closed);
            }
            match &state.transport {
                Some(t) => Arc::clone(t),
                None => {
                    state.queue.push(message);
                    return Ok(());
                }
            }
        };
        transport.post_message(message.to_json())
    }

    fn settle(&self, reply_channel: &str, reply: Reply) -> bool {
        let pending = self.inner.state().pending.remove(reply_channel);
        match pending {
            Some(p) => {
                let _ = p.tx.send(reply);
                true
            }
            None => false,
        }
    }
}

impl Default for RendererBridge {
    fn default() -> Self {
        Self::from_config(&IpcConfig::default())
    }
}

impl fmt::Debug for RendererBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state();
        f.debug_struct("RendererBridge")
            .field("attached", &state.transport.is_some())
            .field("closed", &state.closed)
            .field("pending", &state.pending.len())
            .field("queued", &state.queue.len())
            .finish()
    }
}

/// Removes the pending entry if the invocation is dropped or times out
/// before a reply arrives.
struct CancelGuard {
    reply_channel: String,
    inner: Weak<Inner>,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            if inner.state().pending.remove(&self.reply_channel).is_some() {
                tracing::debug!(reply_channel = %self.reply_channel, "removed abandoned invoke");
            }
        }
    }
}

/// A pending `invoke`.
pub struct Invocation {
    message_id: u64,
    channel: String,
    reply_channel: String,
    deadline: Option<Instant>,
    timeout: Option<Duration>,
    rx: oneshot::Receiver<Reply>,
    _guard: CancelGuard,
}

impl Invocation {
    pub fn message_id(&self) -> u64 {
        self.message_id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn reply_channel(&self) -> &str {
        &self.reply_channel
    }

    /// Wait for the reply. The deadline was fixed when `invoke` was called.
    pub async fn response(self) -> Result<Value, IpcError> {
        let outcome = match self.deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, self.rx).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    let timeout_ms = self.timeout.map_or(0, |t| t.as_millis() as u64);
                    tracing::warn!(
                        channel = %self.channel,
                        message_id = self.message_id,
                        timeout_ms,
                        "invoke timed out"
                    );
                    return Err(IpcError::Timeout {
                        channel: self.channel,
                        timeout_ms,
                    });
                }
            },
            None => self.rx.await,
        };
        outcome.unwrap_or(Err(IpcError::Closed))
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("message_id", &self.message_id)
            .field("reply_channel", &self.reply_channel)
            .finish()
    }
}
