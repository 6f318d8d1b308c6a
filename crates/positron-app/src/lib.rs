//! Positron: native windows around web content, driven from Rust.
//!
//! - [`App`]: the application context and its lifecycle
//!   (`NotReady -> Ready -> Quitting -> Quit`)
//! - [`BrowserWindow`]: one window, one content surface
//!   (`Constructing -> Loading -> Ready -> Closed`)
//! - [`host`]: the `ipc_send` / `ipc_invoke` entry points content reaches
//! - `runtime` (feature `native`): the `winit` event-loop driver

pub mod app;
pub mod host;
#[cfg(feature = "native")]
pub mod runtime;
pub mod window;

pub use app::{
    App, AppCallback, AppEvent, AppState, CallbackError, CallbackResult, PUMP_INTERVAL,
    PUMP_ROUNDS,
};
pub use window::{BrowserWindow, WindowCallback, WindowEvent, WindowState};

pub use positron_common::{Diagnostic, DiagnosticSink, IpcError, MemorySink, WindowError, WindowId};
pub use positron_config::{PositronConfig, WindowConfig};
pub use positron_ipc::{IpcEvent, IpcMain, WebContents};
pub use positron_webview::{HeadlessEngine, HeadlessPage};
