//! `wry` WebView hosted in a `winit` window.
//!
//! `winit` only creates windows from inside a running event loop, while
//! application code creates windows whenever it likes. A [`NativeSurface`]
//! therefore records what it was asked to do until the runtime calls
//! [`NativeEngine::realize`] from an event-loop callback; from then on every
//! operation goes straight to the window and WebView.
//!
//! The bridge is handed over when the surface is created and registered as
//! an initialization script on every WebView, so it runs before page scripts
//! on every navigation, including ones made after the window is realized.
//! HTML loads also carry an inlined copy.

mod handlers;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, error, warn};
use winit::dpi::{LogicalSize, PhysicalPosition};
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Fullscreen, Window};
use wry::{WebView, WebViewBuilder};

use positron_common::{WindowError, WindowId};
use positron_config::WindowConfig;
use positron_ipc::{BridgeScript, Outbound};

use crate::events::{SurfaceEvent, SurfaceEvents};
use crate::inject::inject_bridge;
use crate::request::LoadRequest;
use crate::surface::{ContentSurface, SurfaceFactory};

/// Field order matters: the WebView must drop before its window.
struct Realized {
    webview: WebView,
    window: Window,
}

struct NativeState {
    id: WindowId,
    options: WindowConfig,
    events: SurfaceEvents,
    title: String,
    size: (u32, u32),
    visible: bool,
    maximized: bool,
    minimized: bool,
    script: BridgeScript,
    load: Option<LoadRequest>,
    global: Option<String>,
    backlog: Vec<String>,
    realized: Option<Realized>,
    destroyed: bool,
}

type Shared = Rc<RefCell<NativeState>>;

/// What the WebView shows when it is first built.
#[derive(Debug, PartialEq)]
enum InitialContent {
    Url(String),
    Html(String),
}

const BLANK_PAGE: &str = "<html><body></body></html>";

impl NativeState {
    fn initial_content(&self) -> InitialContent {
        match &self.load {
            Some(LoadRequest::Url(url)) => InitialContent::Url(url.clone()),
            Some(LoadRequest::Html { html, .. }) => {
                InitialContent::Html(inject_bridge(html, &self.script))
            }
            None => InitialContent::Html(BLANK_PAGE.to_string()),
        }
    }

    fn realize(&mut self, event_loop: &ActiveEventLoop) -> Result<(), WindowError> {
        let (width, height) = self.size;
        let mut attrs = Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(LogicalSize::new(width as f64, height as f64))
            .with_min_inner_size(LogicalSize::new(
                self.options.min_width as f64,
                self.options.min_height as f64,
            ))
            .with_resizable(self.options.resizable)
            .with_decorations(!self.options.frameless)
            .with_visible(self.visible)
            .with_maximized(self.maximized);
        if self.options.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = event_loop
            .create_window(attrs)
            .map_err(|e| WindowError::Engine(format!("failed to create window: {e}")))?;

        if self.options.center {
            center(&window);
        }
        if self.minimized {
            window.set_minimized(true);
        }

        let mut builder = WebViewBuilder::new().with_devtools(self.options.devtools);
        match handlers::parse_background(&self.options.background_color) {
            Some(rgba) => builder = builder.with_background_color(rgba),
            None => warn!(
                window_id = %self.id,
                color = %self.options.background_color,
                "ignoring invalid background color"
            ),
        }
        builder = handlers::attach_ipc_handler(builder, self.events.clone(), self.id);
        builder = handlers::attach_page_load_handler(builder, self.events.clone(), self.id);

        builder = builder.with_initialization_script(self.script.source());
        builder = match self.initial_content() {
            InitialContent::Url(url) => builder.with_url(url),
            InitialContent::Html(html) => builder.with_html(html),
        };

        let webview = builder
            .build(&window)
            .map_err(|e| WindowError::Engine(format!("failed to create webview: {e}")))?;

        for script in self.backlog.drain(..) {
            if let Err(e) = webview.evaluate_script(&script) {
                warn!(window_id = %self.id, error = %e, "deferred script failed");
            }
        }

        debug!(window_id = %self.id, "native window realized");
        self.realized = Some(Realized { webview, window });
        Ok(())
    }
}

fn center(window: &Window) {
    let Some(monitor) = window.current_monitor() else {
        return;
    };
    let screen = monitor.size();
    let origin = monitor.position();
    let outer = window.outer_size();
    let x = origin.x + (screen.width.saturating_sub(outer.width) / 2) as i32;
    let y = origin.y + (screen.height.saturating_sub(outer.height) / 2) as i32;
    window.set_outer_position(PhysicalPosition::new(x, y));
}

pub struct NativeSurface {
    state: Shared,
}

impl NativeSurface {
    fn state(&self) -> std::cell::RefMut<'_, NativeState> {
        self.state.borrow_mut()
    }
}

impl ContentSurface for NativeSurface {
    fn load(&mut self, request: &LoadRequest, script: &BridgeScript) -> Result<(), WindowError> {
        let mut guard = self.state();
        let state = &mut *guard;
        if state.destroyed {
            return Err(WindowError::Closed(state.id));
        }
        state.global = Some(script.global().to_string());

        let Some(realized) = &state.realized else {
            state.backlog.clear();
            state.script = script.clone();
            state.load = Some(request.clone());
            return Ok(());
        };

        // The initialization script registered at build time covers URL
        // navigations; HTML documents carry their own copy.
        let result = match request {
            LoadRequest::Url(url) => realized.webview.load_url(url),
            LoadRequest::Html { html, base_url } => {
                if base_url.is_some() {
                    debug!(window_id = %state.id, "base URL not supported for HTML loads; ignored");
                }
                realized.webview.load_html(&inject_bridge(html, script))
            }
        };
        result.map_err(|e| WindowError::Engine(e.to_string()))
    }

    fn deliver(&mut self, outbound: &Outbound) -> Result<(), WindowError> {
        let script = {
            let state = self.state();
            let global = state
                .global
                .as_deref()
                .ok_or_else(|| WindowError::Engine("no content loaded".into()))?;
            outbound.to_script(global)
        };
        self.evaluate_script(&script)
    }

    fn evaluate_script(&mut self, script: &str) -> Result<(), WindowError> {
        let mut guard = self.state();
        let state = &mut *guard;
        if state.destroyed {
            return Err(WindowError::Closed(state.id));
        }
        match &state.realized {
            Some(realized) => realized
                .webview
                .evaluate_script(script)
                .map_err(|e| WindowError::Engine(e.to_string())),
            None => {
                state.backlog.push(script.to_string());
                Ok(())
            }
        }
    }

    fn set_title(&mut self, title: &str) {
        let mut state = self.state();
        state.title = title.to_string();
        if let Some(realized) = &state.realized {
            realized.window.set_title(title);
        }
    }

    fn title(&self) -> String {
        self.state.borrow().title.clone()
    }

    fn show(&mut self) {
        let mut state = self.state();
        state.visible = true;
        state.minimized = false;
        if let Some(realized) = &state.realized {
            realized.window.set_visible(true);
            realized.window.set_minimized(false);
        }
    }

    fn hide(&mut self) {
        let mut state = self.state();
        state.visible = false;
        if let Some(realized) = &state.realized {
            realized.window.set_visible(false);
        }
    }

    fn is_visible(&self) -> bool {
        self.state.borrow().visible
    }

    fn set_size(&mut self, width: u32, height: u32) {
        let mut state = self.state();
        state.size = (width, height);
        if let Some(realized) = &state.realized {
            let _ = realized
                .window
                .request_inner_size(LogicalSize::new(width as f64, height as f64));
        }
    }

    fn size(&self) -> (u32, u32) {
        self.state.borrow().size
    }

    fn maximize(&mut self) {
        let mut state = self.state();
        state.maximized = true;
        if let Some(realized) = &state.realized {
            realized.window.set_maximized(true);
        }
    }

    fn minimize(&mut self) {
        let mut state = self.state();
        state.minimized = true;
        if let Some(realized) = &state.realized {
            realized.window.set_minimized(true);
        }
    }

    fn destroy(&mut self) {
        let mut state = self.state();
        if state.destroyed {
            return;
        }
        state.destroyed = true;
        state.backlog.clear();
        state.realized = None;
        debug!(window_id = %state.id, "native window destroyed");
    }
}

/// Factory for native surfaces, and the hook the `winit` runtime uses to
/// materialize them and route window events back.
#[derive(Clone, Default)]
pub struct NativeEngine {
    states: Rc<RefCell<HashMap<WindowId, Shared>>>,
}

impl NativeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the window and WebView of every surface that does not have
    /// one yet. Must be called from an event-loop callback.
    pub fn realize(&self, event_loop: &ActiveEventLoop) {
        self.states.borrow_mut().retain(|_, s| !s.borrow().destroyed);

        for shared in self.states.borrow().values() {
            let mut state = shared.borrow_mut();
            if state.realized.is_some() {
                continue;
            }
            if let Err(e) = state.realize(event_loop) {
                error!(window_id = %state.id, error = %e, "failed to realize window");
                state.destroyed = true;
                state.events.push(SurfaceEvent::CloseRequested { window: state.id });
            }
        }
    }

    /// Route a `winit` window event to the surface that owns the window.
    pub fn handle_window_event(&self, window_id: winit::window::WindowId, event: &WindowEvent) {
        let states = self.states.borrow();
        let Some(shared) = states.values().find(|s| {
            s.borrow()
                .realized
                .as_ref()
                .is_some_and(|r| r.window.id() == window_id)
        }) else {
            return;
        };

        let mut guard = shared.borrow_mut();
        let state = &mut *guard;
        match event {
            WindowEvent::CloseRequested => {
                debug!(window_id = %state.id, "close requested");
                state.events.push(SurfaceEvent::CloseRequested { window: state.id });
            }
            WindowEvent::Resized(size) if size.width > 0 && size.height > 0 => {
                if let Some(realized) = &state.realized {
                    let logical: LogicalSize<u32> = size.to_logical(realized.window.scale_factor());
                    state.size = (logical.width, logical.height);
                }
            }
            _ => {}
        }
    }

    /// True once every surface this engine created has been destroyed.
    pub fn is_idle(&self) -> bool {
        self.states.borrow().values().all(|s| s.borrow().destroyed)
    }
}

impl SurfaceFactory for NativeEngine {
    fn create(
        &mut self,
        id: WindowId,
        options: &WindowConfig,
        script: &BridgeScript,
        events: SurfaceEvents,
    ) -> Result<Box<dyn ContentSurface>, WindowError> {
        let state = Rc::new(RefCell::new(NativeState {
            id,
            options: options.clone(),
            events,
            script: script.clone(),
            title: options.title.clone(),
            size: (options.width, options.height),
            visible: options.show,
            maximized: false,
            minimized: false,
            load: None,
            global: None,
            backlog: Vec::new(),
            realized: None,
            destroyed: false,
        }));
        self.states.borrow_mut().insert(id, Rc::clone(&state));
        Ok(Box::new(NativeSurface { state }))
    }
}
