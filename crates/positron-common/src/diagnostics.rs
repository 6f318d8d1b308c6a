//! Observability sink for recoverable protocol and lifecycle failures.
//!
//! Nothing that goes wrong inside a handler or callback is swallowed: it is
//! reported here first, then propagated (or not) by the caller.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::id::WindowId;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Warning,
    Error,
}

/// A single observable failure or protocol event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A message arrived on a channel nobody listens to.
    NoHandler { channel: String },
    /// A channel handler returned an error.
    HandlerFailed { channel: String, message: String },
    /// A lifecycle callback (`ready`, `closed`, ...) returned an error.
    CallbackFailed { event: String, message: String },
    /// A host -> content delivery could not be performed.
    DeliveryFailed { window: WindowId, message: String },
    /// The content side posted something that is not a valid message.
    MalformedMessage { window: WindowId, message: String },
}

impl Diagnostic {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoHandler { .. } => "no-handler",
            Self::HandlerFailed { .. } => "handler-failed",
            Self::CallbackFailed { .. } => "callback-failed",
            Self::DeliveryFailed { .. } => "delivery-failed",
            Self::MalformedMessage { .. } => "malformed-message",
        }
    }

    pub fn level(&self) -> DiagnosticLevel {
        match self {
            Self::NoHandler { .. } => DiagnosticLevel::Warning,
            Self::MalformedMessage { .. } => DiagnosticLevel::Warning,
            Self::HandlerFailed { .. }
            | Self::CallbackFailed { .. }
            | Self::DeliveryFailed { .. } => DiagnosticLevel::Error,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoHandler { channel } => {
                write!(f, "no IPC handler registered for channel '{channel}'")
            }
            Self::HandlerFailed { channel, message } => {
                write!(f, "IPC handler for '{channel}' failed: {message}")
            }
            Self::CallbackFailed { event, message } => {
                write!(f, "'{event}' callback failed: {message}")
            }
            Self::DeliveryFailed { window, message } => {
                write!(f, "delivery to {window} failed: {message}")
            }
            Self::MalformedMessage { window, message } => {
                write!(f, "IPC message from {window} rejected: {message}")
            }
        }
    }
}

/// Destination for diagnostics. Shared between the dispatch engine and the
/// lifecycle state machines, so it must be usable from any thread.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Default sink: every diagnostic becomes a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic.level() {
            DiagnosticLevel::Warning => tracing::warn!(kind = diagnostic.kind(), "{diagnostic}"),
            DiagnosticLevel::Error => tracing::error!(kind = diagnostic.kind(), "{diagnostic}"),
        }
    }
}

/// Bounded in-memory sink. Also forwards to `tracing` so nothing is lost
/// when it is used outside of tests.
#[derive(Debug, Clone)]
pub struct MemorySink {
    items: Arc<Mutex<VecDeque<Diagnostic>>>,
    capacity: usize,
}

impl MemorySink {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Snapshot of everything recorded so far, oldest first.
    pub fn entries(&self) -> Vec<Diagnostic> {
        match self.items.lock() {
            Ok(items) => items.iter().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut items) = self.items.lock() {
            items.clear();
        }
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(256)
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, diagnostic: Diagnostic) {
        TracingSink.report(diagnostic.clone());
        if let Ok(mut items) = self.items.lock() {
            if items.len() >= self.capacity {
                items.pop_front();
            }
            items.push_back(diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_records_in_order() {
        let sink = MemorySink::new(8);
        sink.report(Diagnostic::NoHandler {
            channel: "a".into(),
        });
        sink.report(Diagnostic::NoHandler {
            channel: "b".into(),
        });

        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0],
            Diagnostic::NoHandler {
                channel: "a".into()
            }
        );
    }

    #[test]
    fn memory_sink_evicts_oldest_at_capacity() {
        let sink = MemorySink::new(2);
        for channel in ["a", "b", "c"] {
            sink.report(Diagnostic::NoHandler {
                channel: channel.into(),
            });
        }
        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert!(matches!(&entries[0], Diagnostic::NoHandler { channel } if channel == "b"));
    }

    #[test]
    fn clones_share_storage() {
        let sink = MemorySink::default();
        let other = sink.clone();
        other.report(Diagnostic::CallbackFailed {
            event: "ready".into(),
            message: "x".into(),
        });
        assert_eq!(sink.len(), 1);
        sink.clear();
        assert!(other.is_empty());
    }

    #[test]
    fn levels() {
        let d = Diagnostic::NoHandler {
            channel: "x".into(),
        };
        assert_eq!(d.level(), DiagnosticLevel::Warning);
        let d = Diagnostic::HandlerFailed {
            channel: "x".into(),
            message: "y".into(),
        };
        assert_eq!(d.level(), DiagnosticLevel::Error);
        assert_eq!(d.kind(), "handler-failed");
    }

    #[test]
    fn display_names_the_subject() {
        let d = Diagnostic::MalformedMessage {
            window: WindowId(2),
            message: "missing field `kind`".into(),
        };
        assert_eq!(
            d.to_string(),
            "IPC message from window-2 rejected: missing field `kind`"
        );
        assert_eq!(d.level(), DiagnosticLevel::Warning);

        let d = Diagnostic::CallbackFailed {
            event: "ready".into(),
            message: "boom".into(),
        };
        assert_eq!(d.to_string(), "'ready' callback failed: boom");
    }
}
