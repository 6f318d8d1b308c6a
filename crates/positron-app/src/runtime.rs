//! Driving an [`App`] from the `winit` event loop.

use std::time::{Duration, Instant};

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow};
use winit::window::WindowId;

use positron_webview::native::NativeEngine;

use crate::app::{App, AppState};

/// How often the loop wakes to pump IPC even without window events.
const POLL_INTERVAL: Duration = Duration::from_millis(16);

pub struct NativeRuntime {
    app: App,
    engine: NativeEngine,
}

impl NativeRuntime {
    /// `engine` must be the factory `app` was created with.
    pub fn new(app: App, engine: NativeEngine) -> Self {
        Self { app, engine }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut App {
        &mut self.app
    }

    pub fn into_app(self) -> App {
        self.app
    }

    fn tick(&mut self, event_loop: &ActiveEventLoop) {
        self.engine.realize(event_loop);
        self.app.pump();
        // Windows created by handlers during the pump.
        self.engine.realize(event_loop);

        if self.app.state() == AppState::Quit {
            tracing::info!("application quit; leaving event loop");
            event_loop.exit();
            return;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + POLL_INTERVAL));
    }
}

impl ApplicationHandler for NativeRuntime {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        self.app.start();
        self.tick(event_loop);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        self.engine.handle_window_event(window_id, &event);
        if matches!(event, WindowEvent::CloseRequested | WindowEvent::Destroyed) {
            self.tick(event_loop);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.tick(event_loop);
    }
}
