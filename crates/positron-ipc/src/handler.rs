//! Handler shapes and registration modes.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::event::IpcEvent;

/// Error type handlers return. Anything implementing `std::error::Error`
/// converts into it with `?`, and so do `&str` / `String`.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

pub type HandlerResult<T = Value> = Result<T, HandlerError>;

type ListenerFn = dyn Fn(&IpcEvent, &[Value]) -> HandlerResult<()> + Send + Sync;
type ResponderFn = dyn Fn(&IpcEvent, &[Value]) -> HandlerResult<Value> + Send + Sync;

/// Which table a registration lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Stays registered until removed; at most one per channel.
    Persistent,
    /// Removed right before its first dispatch; at most one per channel.
    Once,
}

/// A callable bound to a channel.
#[derive(Clone)]
pub enum Handler {
    /// Return value ignored.
    Listener(Arc<ListenerFn>),
    /// Return value becomes the reply payload of an invoke.
    Responder(Arc<ResponderFn>),
}

impl Handler {
    pub fn listener<F>(f: F) -> Self
    where
        F: Fn(&IpcEvent, &[Value]) -> HandlerResult<()> + Send + Sync + 'static,
    {
        Self::Listener(Arc::new(f))
    }

    /// Wrap a responder whose result is anything serializable.
    pub fn responder<F, T>(f: F) -> Self
    where
        F: Fn(&IpcEvent, &[Value]) -> HandlerResult<T> + Send + Sync + 'static,
        T: Serialize,
    {
        Self::Responder(Arc::new(move |event, args| {
            let value = f(event, args)?;
            Ok(serde_json::to_value(value)?)
        }))
    }

    pub fn is_responder(&self) -> bool {
        matches!(self, Self::Responder(_))
    }

    /// Run the handler. Listeners produce `None`.
    pub(crate) fn call(&self, event: &IpcEvent, args: &[Value]) -> HandlerResult<Option<Value>> {
        match self {
            Self::Listener(f) => f(event, args).map(|()| None),
            Self::Responder(f) => f(event, args).map(Some),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listener(_) => f.write_str("Handler::Listener"),
            Self::Responder(_) => f.write_str("Handler::Responder"),
        }
    }
}
