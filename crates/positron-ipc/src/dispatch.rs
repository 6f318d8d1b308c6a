//! Host-side dispatch engine.
//!
//! `IpcMain` is cheap to clone; every clone shares one registry. The
//! registry sits behind a mutex because content-originated calls may be
//! delivered on a thread other than the one that registered handlers.
//! Handlers are cloned out of the table and run with the lock released.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;

use positron_common::{Diagnostic, DiagnosticSink, IpcError, TracingSink};

use crate::event::{IpcEvent, WebContents};
use crate::handler::{Handler, HandlerResult, Mode};
use crate::registry::ChannelRegistry;

#[derive(Clone)]
pub struct IpcMain {
    registry: Arc<Mutex<ChannelRegistry>>,
    sink: Arc<dyn DiagnosticSink>,
}

impl IpcMain {
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            registry: Arc::new(Mutex::new(ChannelRegistry::new())),
            sink,
        }
    }

    // -- registration --------------------------------------------------------

    pub fn register(&self, channel: &str, mode: Mode, handler: Handler) {
        self.registry().register(channel, mode, handler);
    }

    pub fn unregister(&self, channel: Option<&str>, mode: Option<Mode>) {
        self.registry().unregister(channel, mode);
    }

    /// Persistent listener; replaces any persistent handler on `channel`.
    pub fn on<F>(&self, channel: &str, f: F)
    where
        F: Fn(&IpcEvent, &[Value]) -> HandlerResult<()> + Send + Sync + 'static,
    {
        self.register(channel, Mode::Persistent, Handler::listener(f));
    }

    /// Single-shot listener.
    pub fn once<F>(&self, channel: &str, f: F)
    where
        F: Fn(&IpcEvent, &[Value]) -> HandlerResult<()> + Send + Sync + 'static,
    {
        self.register(channel, Mode::Once, Handler::listener(f));
    }

    /// Persistent responder; its return value answers invokes.
    pub fn handle<F, T>(&self, channel: &str, f: F)
    where
        F: Fn(&IpcEvent, &[Value]) -> HandlerResult<T> + Send + Sync + 'static,
        T: Serialize,
    {
        self.register(channel, Mode::Persistent, Handler::responder(f));
    }

    /// Single-shot responder.
    pub fn handle_once<F, T>(&self, channel: &str, f: F)
    where
        F: Fn(&IpcEvent, &[Value]) -> HandlerResult<T> + Send + Sync + 'static,
        T: Serialize,
    {
        self.register(channel, Mode::Once, Handler::responder(f));
    }

    /// Drop both the persistent and the once handler for `channel`.
    pub fn remove_listener(&self, channel: &str) {
        self.unregister(Some(channel), None);
    }

    /// Drop everything for `channel`, or every handler when `None`.
    pub fn remove_all_listeners(&self, channel: Option<&str>) {
        self.unregister(channel, None);
    }

    pub fn listener_count(&self, channel: &str) -> usize {
        self.registry().listener_count(channel)
    }

    pub fn channels(&self) -> Vec<String> {
        self.registry().channels()
    }

    pub fn sink(&self) -> &Arc<dyn DiagnosticSink> {
        &self.sink
    }

    // -- dispatch ------------------------------------------------------------

    /// Route a fire-and-forget or invoke message to its handler.
    ///
    /// Returns `Ok(None)` for listeners and for channels with no handler
    /// (the latter is reported to the sink, never raised). A handler error
    /// is reported, then returned tagged with the channel name.
    pub fn dispatch(
        &self,
        channel: &str,
        sender: &WebContents,
        args: &[Value],
    ) -> Result<Option<Value>, IpcError> {
        self.dispatch_with_reply(channel, sender, None, args)
    }

    /// Like [`dispatch`](Self::dispatch), with the invoke's reply channel
    /// exposed to the handler through [`IpcEvent::reply_channel`].
    pub fn dispatch_with_reply(
        &self,
        channel: &str,
        sender: &WebContents,
        reply_channel: Option<&str>,
        args: &[Value],
    ) -> Result<Option<Value>, IpcError> {
        let resolved = self.registry().resolve(channel);

        let Some((mode, handler)) = resolved else {
            self.sink.report(Diagnostic::NoHandler {
                channel: channel.to_string(),
            });
            return Ok(None);
        };

        tracing::debug!(
            channel,
            window_id = %sender.id(),
            ?mode,
            "dispatching IPC message"
        );

        let event = IpcEvent::new(sender.clone(), channel, reply_channel);
        handler.call(&event, args).map_err(|e| {
            let message = e.to_string();
            self.sink.report(Diagnostic::HandlerFailed {
                channel: channel.to_string(),
                message: message.clone(),
            });
            IpcError::HandlerFailed {
                channel: channel.to_string(),
                message,
            }
        })
    }

    fn registry(&self) -> MutexGuard<'_, ChannelRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for IpcMain {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}
