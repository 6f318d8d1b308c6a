//! Deterministic in-process engine.
//!
//! Each window's "page" is a [`RendererBridge`] playing the part of the
//! injected stub. Loading replaces the page (and with it every listener and
//! pending invoke, as a real navigation would), then installs a fresh bridge
//! wired to the shared [`SurfaceEvents`] queue. Page scripts are driven
//! through [`HeadlessPage`], obtained from the [`HeadlessEngine`].


use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use positron_common::{IpcError, WindowError, WindowId};
use positron_config::WindowConfig;
use positron_ipc::{BridgeScript, Outbound, RendererBridge, Transport};

use crate::events::{PageLoadState, SurfaceEvent, SurfaceEvents};
use crate::inject::inject_bridge;
use crate::request::LoadRequest;
use crate::surface::{ContentSurface, SurfaceFactory};

#[derive(Debug)]
struct State {
    title: String,
    size: (u32, u32),
    visible: bool,
    maximized: bool,
    minimized: bool,
    destroyed: bool,
    page: Option<RendererBridge>,
    url: Option<String>,
    document: Option<String>,
    loads: usize,
    scripts: Vec<String>,
}

type Shared = Arc<Mutex<State>>;

fn lock(state: &Shared) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The page's `window.ipc.postMessage`.
struct PageTransport {
    window: WindowId,
    events: SurfaceEvents,
}

impl Transport for PageTransport {
    fn post_message(&self, body: String) -> Result<(), IpcError> {
        self.events.push(SurfaceEvent::Ipc {
            window: self.window,
            body,
        });
        Ok(())
    }
}

pub struct HeadlessSurface {
    id: WindowId,
    state: Shared,
    events: SurfaceEvents,
}

impl HeadlessSurface {
    pub fn new(id: WindowId, options: &WindowConfig, events: SurfaceEvents) -> Self {
        Self {
            id,
            state: Arc::new(Mutex::new(State {
                title: options.title.clone(),
                size: (options.width, options.height),
                visible: options.show,
                maximized: false,
                minimized: false,
                destroyed: false,
                page: None,
                url: None,
                document: None,
                loads: 0,
                scripts: Vec::new(),
            })),
            events,
        }
    }

    /// Handle for driving this surface's page from outside.
    pub fn page(&self) -> HeadlessPage {
        HeadlessPage {
            id: self.id,
            state: Arc::clone(&self.state),
            events: self.events.clone(),
        }
    }

    fn current_page(&self) -> Result<RendererBridge, WindowError> {
        let state = lock(&self.state);
        if state.destroyed {
            return Err(WindowError::Closed(self.id));
        }
        state
            .page
            .clone()
            .ok_or_else(|| WindowError::Engine("no content loaded".into()))
    }
}

impl ContentSurface for HeadlessSurface {
    fn load(&mut self, request: &LoadRequest, script: &BridgeScript) -> Result<(), WindowError> {
        let url = request.display_url().to_string();
        let previous = {
            let mut state = lock(&self.state);
            if state.destroyed {
                return Err(WindowError::Closed(self.id));
            }
            state.loads += 1;
            state.url = Some(url.clone());
            state.document = match request {
                LoadRequest::Html { html, .. } => Some(inject_bridge(html, script)),
                LoadRequest::Url(_) => None,
            };
            state.page.take()
        };
        if let Some(previous) = previous {
            previous.close();
        }

        self.events.push(SurfaceEvent::PageLoad {
            window: self.id,
            state: PageLoadState::Started,
            url: url.clone(),
        });

        let page = RendererBridge::new(script.invoke_timeout());
        page.attach(Arc::new(PageTransport {
            window: self.id,
            events: self.events.clone(),
        }))
        .map_err(|e| WindowError::Engine(e.to_string()))?;
        lock(&self.state).page = Some(page);

        tracing::debug!(window_id = %self.id, url = %url, "headless page loaded");
        self.events.push(SurfaceEvent::PageLoad {
            window: self.id,
            state: PageLoadState::Finished,
            url,
        });
        Ok(())
    }

    fn deliver(&mut self, outbound: &Outbound) -> Result<(), WindowError> {
        match outbound {
            Outbound::Receive { channel, args } => {
                self.current_page()?.receive(channel, args);
            }
            Outbound::Reject {
                reply_channel,
                message,
            } => {
                self.current_page()?.reject(reply_channel, message);
            }
            Outbound::Script(script) => self.evaluate_script(script)?,
        }
        Ok(())
    }

    fn evaluate_script(&mut self, script: &str) -> Result<(), WindowError> {
        let mut state = lock(&self.state);
        if state.destroyed {
            return Err(WindowError::Closed(self.id));
        }
        state.scripts.push(script.to_string());
        Ok(())
    }

    fn set_title(&mut self, title: &str) {
        lock(&self.state).title = title.to_string();
    }

    fn title(&self) -> String {
        lock(&self.state).title.clone()
    }

    fn show(&mut self) {
        let mut state = lock(&self.state);
        state.visible = true;
        state.minimized = false;
    }

    fn hide(&mut self) {
        lock(&self.state).visible = false;
    }

    fn is_visible(&self) -> bool {
        lock(&self.state).visible
    }

    fn set_size(&mut self, width: u32, height: u32) {
        lock(&self.state).size = (width, height);
    }

    fn size(&self) -> (u32, u32) {
        lock(&self.state).size
    }

    fn maximize(&mut self) {
        let mut state = lock(&self.state);
        state.maximized = true;
        state.minimized = false;
    }

    fn minimize(&mut self) {
        lock(&self.state).minimized = true;
    }

    fn destroy(&mut self) {
        let page = {
            let mut state = lock(&self.state);
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.visible = false;
            state.page.take()
        };
        if let Some(page) = page {
            page.close();
        }
        tracing::debug!(window_id = %self.id, "headless surface destroyed");
    }
}

/// Outside view of one headless window, for playing page scripts.
#[derive(Debug, Clone)]
pub struct HeadlessPage {
    id: WindowId,
    state: Shared,
    events: SurfaceEvents,
}

impl HeadlessPage {
    pub fn id(&self) -> WindowId {
        self.id
    }

    /// The bridge installed in the current page, if any content is loaded.
    pub fn bridge(&self) -> Option<RendererBridge> {
        lock(&self.state).page.clone()
    }

    pub fn url(&self) -> Option<String> {
        lock(&self.state).url.clone()
    }

    /// The last HTML document as handed to the engine, bridge included.
    pub fn document(&self) -> Option<String> {
        lock(&self.state).document.clone()
    }

    pub fn load_count(&self) -> usize {
        lock(&self.state).loads
    }

    /// Scripts evaluated in the page, oldest first.
    pub fn scripts(&self) -> Vec<String> {
        lock(&self.state).scripts.clone()
    }

    pub fn is_maximized(&self) -> bool {
        lock(&self.state).maximized
    }

    pub fn is_minimized(&self) -> bool {
        lock(&self.state).minimized
    }

    pub fn is_destroyed(&self) -> bool {
        lock(&self.state).destroyed
    }

    /// Simulate the user clicking the window's close button.
    pub fn request_close(&self) {
        self.events
            .push(SurfaceEvent::CloseRequested { window: self.id });
    }
}

/// Factory for headless surfaces. Keeps a handle to every page it created.
#[derive(Debug, Clone, Default)]
pub struct HeadlessEngine {
    pages: Arc<Mutex<HashMap<WindowId, HeadlessPage>>>,
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self, id: WindowId) -> Option<HeadlessPage> {
        self.pages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }
}

impl SurfaceFactory for HeadlessEngine {
    fn create(
        &mut self,
        id: WindowId,
        options: &WindowConfig,
        _script: &BridgeScript,
        events: SurfaceEvents,
    ) -> Result<Box<dyn ContentSurface>, WindowError> {
        let surface = HeadlessSurface::new(id, options, events);
        self.pages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, surface.page());
        Ok(Box::new(surface))
    }
}
