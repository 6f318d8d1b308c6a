//! Browser windows: one content surface each, plus lifecycle callbacks.
//!
//! A window moves `Constructing -> Loading -> Ready -> Closed`. Every load
//! (the first or a reload) goes back to `Loading` and carries the bridge
//! script, because a new page starts without it. `Ready` is entered on the
//! engine's load-finished signal. Closing is driven by
//! [`App::close_window`](crate::App::close_window) since `closed` callbacks
//! receive the application.


use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use positron_common::{WindowError, WindowId};
use positron_config::WindowConfig;
use positron_ipc::{BridgeScript, WebContents};
use positron_webview::{ContentSurface, LoadRequest};

use crate::app::{App, CallbackResult};

/// Lifecycle events a window emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowEvent {
    /// The window was closed. Fires exactly once.
    Closed,
    /// A page finished loading. Fires once per load.
    DomReady,
}

impl WindowEvent {
    pub fn name(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::DomReady => "dom-ready",
        }
    }
}

impl FromStr for WindowEvent {
    type Err = WindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "closed" => Ok(Self::Closed),
            "dom-ready" => Ok(Self::DomReady),
            other => Err(WindowError::UnknownEvent(other.to_string())),
        }
    }
}

impl fmt::Display for WindowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Constructing,
    Loading,
    Ready,
    Closed,
}

pub type WindowCallback = Arc<dyn Fn(&mut App, WindowId) -> CallbackResult>;

pub struct BrowserWindow {
    id: WindowId,
    options: WindowConfig,
    state: WindowState,
    surface: Box<dyn ContentSurface>,
    script: BridgeScript,
    contents: WebContents,
    callbacks: HashMap<WindowEvent, Vec<WindowCallback>>,
    current: Option<LoadRequest>,
}

impl BrowserWindow {
    pub(crate) fn new(
        id: WindowId,
        options: WindowConfig,
        surface: Box<dyn ContentSurface>,
        script: BridgeScript,
        contents: WebContents,
    ) -> Self {
        Self {
            id,
            options,
            state: WindowState::Constructing,
            surface,
            script,
            contents,
            callbacks: HashMap::new(),
            current: None,
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == WindowState::Closed
    }

    /// Options the window was created with.
    pub fn options(&self) -> &WindowConfig {
        &self.options
    }

    /// Handle for sending messages to this window's page.
    pub fn web_contents(&self) -> &WebContents {
        &self.contents
    }

    /// The most recent load request, if any.
    pub fn current_request(&self) -> Option<&LoadRequest> {
        self.current.as_ref()
    }

    // -- content -------------------------------------------------------------

    pub fn load_url(&mut self, url: &str) -> Result<(), WindowError> {
        self.load(LoadRequest::url(url))
    }

    /// Load a local HTML file. Missing files fail without touching the page.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<(), WindowError> {
        let request = LoadRequest::file(path.as_ref())?;
        self.load(request)
    }

    pub fn load_html(&mut self, html: &str, base_url: Option<&str>) -> Result<(), WindowError> {
        self.load(LoadRequest::html(html, base_url.map(str::to_string)))
    }

    fn load(&mut self, request: LoadRequest) -> Result<(), WindowError> {
        if self.is_closed() {
            return Err(WindowError::Closed(self.id));
        }
        tracing::info!(window_id = %self.id, url = %request.display_url(), "loading content");
        self.state = WindowState::Loading;
        self.surface.load(&request, &self.script)?;
        self.current = Some(request);
        Ok(())
    }

    pub fn evaluate_script(&mut self, script: &str) -> Result<(), WindowError> {
        if self.is_closed() {
            return Err(WindowError::Closed(self.id));
        }
        self.surface.evaluate_script(script)
    }

    // -- callbacks -----------------------------------------------------------

    pub fn on<F>(&mut self, event: WindowEvent, callback: F)
    where
        F: Fn(&mut App, WindowId) -> CallbackResult + 'static,
    {
        self.callbacks
            .entry(event)
            .or_default()
            .push(Arc::new(callback));
    }

    /// Snapshot of the callbacks for `event`, so they can run while the
    /// window itself is being mutated.
    pub(crate) fn callbacks(&self, event: WindowEvent) -> Vec<WindowCallback> {
        self.callbacks.get(&event).cloned().unwrap_or_default()
    }

    // -- chrome --------------------------------------------------------------

    pub fn show(&mut self) {
        if !self.is_closed() {
            self.surface.show();
        }
    }

    pub fn hide(&mut self) {
        if !self.is_closed() {
            self.surface.hide();
        }
    }

    pub fn is_visible(&self) -> bool {
        !self.is_closed() && self.surface.is_visible()
    }

    pub fn set_title(&mut self, title: &str) {
        if !self.is_closed() {
            self.surface.set_title(title);
        }
    }

    pub fn title(&self) -> String {
        self.surface.title()
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        if !self.is_closed() {
            self.surface.set_size(width, height);
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.surface.size()
    }

    pub fn maximize(&mut self) {
        if !self.is_closed() {
            self.surface.maximize();
        }
    }

    pub fn minimize(&mut self) {
        if !self.is_closed() {
            self.surface.minimize();
        }
    }

    // -- lifecycle (driven by the app) ----------------------------------------

    pub(crate) fn surface_mut(&mut self) -> &mut dyn ContentSurface {
        self.surface.as_mut()
    }

    pub(crate) fn page_loading(&mut self) {
        if !self.is_closed() {
            self.state = WindowState::Loading;
        }
    }

    /// Returns `true` when this load-finished signal moved the window to
    /// `Ready`.
    pub(crate) fn page_finished(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        self.state = WindowState::Ready;
        true
    }

    /// Tear down the surface. Returns `false` if already closed.
    pub(crate) fn mark_closed(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        self.state = WindowState::Closed;
        self.surface.destroy();
        true
    }
}

impl fmt::Debug for BrowserWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserWindow")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("current", &self.current)
            .finish()
    }
}
