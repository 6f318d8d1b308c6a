//! The application context: lifecycle state machine and the live-window set.
//!
//! One `App` is created at process start and passed to everything that
//! needs it. It owns the IPC dispatcher, every [`BrowserWindow`], and the
//! queues through which rendering engines and handlers talk back to it.
//! Nothing happens on its own: [`App::pump`] drains those queues, and the
//! runtime (headless [`App::run`] or the `winit` loop) calls it repeatedly.

mod events;
mod pump;

pub use events::{AppEvent, AppState};

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use positron_common::{Diagnostic, DiagnosticSink, TracingSink, WindowError, WindowId};
use positron_config::{PositronConfig, WindowConfig};
use positron_ipc::{outbox, BridgeScript, Delivery, IpcMain, Outbox, WebContents};
use positron_webview::{SurfaceEvents, SurfaceFactory};

use crate::window::{BrowserWindow, WindowEvent};

/// Interval between pumps while [`App::run`] or [`App::drive`] wait.
pub const PUMP_INTERVAL: Duration = Duration::from_millis(10);

/// Upper bound on the rounds one [`App::pump`] call runs.
pub const PUMP_ROUNDS: usize = 32;

/// Error type lifecycle callbacks return.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

pub type CallbackResult = Result<(), CallbackError>;

pub type AppCallback = Arc<dyn Fn(&mut App) -> CallbackResult>;

pub struct App {
    config: PositronConfig,
    state: AppState,
    ready_fired: bool,
    ipc: IpcMain,
    sink: Arc<dyn DiagnosticSink>,
    script: BridgeScript,
    factory: Box<dyn SurfaceFactory>,
    events: SurfaceEvents,
    outbox: Outbox,
    deliveries: mpsc::UnboundedReceiver<Delivery>,
    windows: Vec<BrowserWindow>,
    next_window_id: u32,
    callbacks: HashMap<AppEvent, Vec<AppCallback>>,
}

impl App {
    pub fn new(config: PositronConfig, factory: Box<dyn SurfaceFactory>) -> Self {
        Self::with_sink(config, factory, Arc::new(TracingSink))
    }

    /// Like [`App::new`], reporting diagnostics to `sink` instead of the
    /// log.
    pub fn with_sink(
        config: PositronConfig,
        factory: Box<dyn SurfaceFactory>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let (outbox, deliveries) = outbox();
        Self {
            script: BridgeScript::from_config(&config.ipc),
            config,
            state: AppState::NotReady,
            ready_fired: false,
            ipc: IpcMain::new(Arc::clone(&sink)),
            sink,
            factory,
            events: SurfaceEvents::new(),
            outbox,
            deliveries,
            windows: Vec::new(),
            next_window_id: 1,
            callbacks: HashMap::new(),
        }
    }

    // -- accessors -----------------------------------------------------------

    /// The host-side dispatcher. Clones share the same channel tables.
    pub fn ipc(&self) -> &IpcMain {
        &self.ipc
    }

    pub fn name(&self) -> &str {
        &self.config.app.name
    }

    pub fn version(&self) -> &str {
        &self.config.app.version
    }

    pub fn config(&self) -> &PositronConfig {
        &self.config
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.ready_fired
    }

    pub fn sink(&self) -> &Arc<dyn DiagnosticSink> {
        &self.sink
    }

    /// Live windows in creation order.
    pub fn windows(&self) -> &[BrowserWindow] {
        &self.windows
    }

    pub fn window_ids(&self) -> Vec<WindowId> {
        self.windows.iter().map(BrowserWindow::id).collect()
    }

    pub fn window(&self, id: WindowId) -> Option<&BrowserWindow> {
        self.windows.iter().find(|w| w.id() == id)
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut BrowserWindow> {
        self.windows.iter_mut().find(|w| w.id() == id)
    }

    // -- callbacks -----------------------------------------------------------

    pub fn on<F>(&mut self, event: AppEvent, callback: F)
    where
        F: Fn(&mut App) -> CallbackResult + 'static,
    {
        self.callbacks
            .entry(event)
            .or_default()
            .push(Arc::new(callback));
    }

    /// Run `callback` once the application is ready. If it already is, the
    /// callback runs now, before this call returns.
    pub fn when_ready<F>(&mut self, callback: F)
    where
        F: Fn(&mut App) -> CallbackResult + 'static,
    {
        if self.ready_fired {
            if let Err(e) = callback(self) {
                self.report_callback(AppEvent::Ready.name(), e);
            }
            return;
        }
        self.on(AppEvent::Ready, callback);
    }

    pub fn listener_count(&self, event: AppEvent) -> usize {
        self.callbacks.get(&event).map_or(0, Vec::len)
    }

    /// Run the callbacks for `event` over a snapshot of the list, so
    /// callbacks may register more. Failures are reported and do not stop
    /// the remaining callbacks.
    fn emit(&mut self, event: AppEvent) {
        let callbacks = self.callbacks.get(&event).cloned().unwrap_or_default();
        debug!(event = %event, count = callbacks.len(), "emitting app event");
        for callback in callbacks {
            if let Err(e) = callback(self) {
                self.report_callback(event.name(), e);
            }
        }
    }

    fn report_callback(&self, event: &str, error: CallbackError) {
        self.sink.report(Diagnostic::CallbackFailed {
            event: event.to_string(),
            message: error.to_string(),
        });
    }

    // -- lifecycle -----------------------------------------------------------

    /// Enter `Ready` and fire the ready callbacks. Only the first call does
    /// anything.
    pub fn start(&mut self) {
        if self.ready_fired || self.state != AppState::NotReady {
            return;
        }
        self.ready_fired = true;
        self.state = AppState::Ready;
        info!(name = %self.config.app.name, version = %self.config.app.version, "application ready");
        self.emit(AppEvent::Ready);
    }

    /// `before-quit`, close every window, `quit`, then `Quit`. Calling it
    /// again while quitting does nothing. Exiting the process is left to the
    /// caller.
    pub fn quit(&mut self) {
        if matches!(self.state, AppState::Quitting | AppState::Quit) {
            return;
        }
        info!("application quitting");
        self.state = AppState::Quitting;
        self.emit(AppEvent::BeforeQuit);

        for id in self.window_ids() {
            if let Err(e) = self.close_window(id) {
                warn!(window_id = %id, error = %e, "failed to close window during quit");
            }
        }

        self.emit(AppEvent::Quit);
        self.state = AppState::Quit;
        info!("application quit");
    }

    // -- windows -------------------------------------------------------------

    /// Create a window and add it to the live set. Its page is empty until
    /// one of the `load_*` methods is called.
    pub fn create_window(&mut self, options: WindowConfig) -> Result<WindowId, WindowError> {
        if self.state == AppState::Quit {
            return Err(WindowError::Engine("application has quit".into()));
        }

        let id = WindowId(self.next_window_id);
        self.next_window_id += 1;

        let surface = self
            .factory
            .create(id, &options, &self.script, self.events.clone())?;
        let contents = WebContents::new(id, self.outbox.clone());
        let window = BrowserWindow::new(id, options, surface, self.script.clone(), contents);

        info!(window_id = %id, title = %window.options().title, "window created");
        self.register_window(window);
        Ok(id)
    }

    /// Create a window with the `[window]` defaults from config.
    pub fn create_default_window(&mut self) -> Result<WindowId, WindowError> {
        self.create_window(self.config.window.clone())
    }

    /// Close a window: destroy its surface, fire its `closed` callbacks once,
    /// then drop it from the live set. Closing a window that is already
    /// closed is a no-op.
    pub fn close_window(&mut self, id: WindowId) -> Result<(), WindowError> {
        let issued = id.0 < self.next_window_id;
        let Some(window) = self.window_mut(id) else {
            return if issued {
                Ok(())
            } else {
                Err(WindowError::UnknownWindow(id))
            };
        };

        // Still registered but already closed: a `closed` callback closing
        // its own window again.
        if !window.mark_closed() {
            return Ok(());
        }
        info!(window_id = %id, "window closed");

        let callbacks = window.callbacks(WindowEvent::Closed);
        for callback in callbacks {
            if let Err(e) = callback(self, id) {
                self.report_callback(WindowEvent::Closed.name(), e);
            }
        }

        self.unregister_window(id);
        Ok(())
    }

    fn register_window(&mut self, window: BrowserWindow) {
        if self.window(window.id()).is_some() {
            return;
        }
        self.windows.push(window);
    }

    fn unregister_window(&mut self, id: WindowId) {
        let before = self.windows.len();
        self.windows.retain(|w| w.id() != id);
        if self.windows.len() == before || !self.windows.is_empty() {
            return;
        }

        // Also reached from quit(); the default quit below is then a no-op.
        if self.listener_count(AppEvent::WindowAllClosed) > 0 {
            self.emit(AppEvent::WindowAllClosed);
        } else if self.config.app.quit_on_all_windows_closed {
            debug!("last window closed with no listener; quitting");
            self.quit();
        }
    }

    // -- running -------------------------------------------------------------

    /// Headless run loop: fire ready, then pump until the application has
    /// quit.
    pub async fn run(&mut self) {
        self.start();
        self.pump();

        if self.windows.is_empty() && self.state != AppState::Quit {
            warn!("no windows were opened; quitting");
            self.quit();
        }

        while self.state != AppState::Quit {
            self.pump();
            tokio::time::sleep(PUMP_INTERVAL).await;
        }
        self.pump();
    }

    /// Await `future` while keeping the application pumped, so that a page
    /// waiting on the host (an invoke, say) can make progress.
    pub async fn drive<F: Future>(&mut self, future: F) -> F::Output {
        tokio::pin!(future);
        loop {
            self.pump();
            tokio::select! {
                biased;
                output = &mut future => {
                    self.pump();
                    return output;
                }
                _ = tokio::time::sleep(PUMP_INTERVAL) => {}
            }
        }
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("name", &self.config.app.name)
            .field("state", &self.state)
            .field("windows", &self.windows)
            .finish()
    }
}
