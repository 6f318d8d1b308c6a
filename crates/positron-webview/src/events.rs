//! Engine -> host signals.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use positron_common::WindowId;

/// State of a page load lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageLoadState {
    /// Navigation has started.
    Started,
    /// Page has fully loaded (DOMContentLoaded + resources).
    Finished,
}

#[cfg(feature = "native")]
impl From<wry::PageLoadEvent> for PageLoadState {
    fn from(e: wry::PageLoadEvent) -> Self {
        match e {
            wry::PageLoadEvent::Started => Self::Started,
            wry::PageLoadEvent::Finished => Self::Finished,
        }
    }
}

/// Events emitted by a content surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// Page load state changed. Carries the URL.
    PageLoad {
        window: WindowId,
        state: PageLoadState,
        url: String,
    },
    /// The page posted a message over the native IPC channel.
    Ipc { window: WindowId, body: String },
    /// The user asked to close the window.
    CloseRequested { window: WindowId },
}

impl SurfaceEvent {
    pub fn window(&self) -> WindowId {
        match self {
            Self::PageLoad { window, .. }
            | Self::Ipc { window, .. }
            | Self::CloseRequested { window } => *window,
        }
    }
}

/// Queue shared between every surface and the application pump. Engine
/// callbacks push; the pump drains.
#[derive(Debug, Clone, Default)]
pub struct SurfaceEvents {
    inner: Arc<Mutex<Vec<SurfaceEvent>>>,
}

impl SurfaceEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: SurfaceEvent) {
        if let Ok(mut events) = self.inner.lock() {
            events.push(event);
        }
    }

    /// Take every queued event, oldest first.
    pub fn drain(&self) -> Vec<SurfaceEvent> {
        match self.inner.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(_) => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().map(|e| e.is_empty()).unwrap_or(true)
    }
}
