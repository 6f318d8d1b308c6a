//! Boundary to the embedded rendering engine.
//!
//! The rest of the workspace talks to a window's content only through the
//! [`ContentSurface`] trait:
//! - load a URL or an HTML document, with the bridge script installed
//! - deliver host -> content messages and evaluate scripts
//! - basic window chrome (title, size, visibility)
//!
//! Engine signals (page loads, posted IPC bodies, close requests) are pushed
//! into a shared [`SurfaceEvents`] queue that the application drains.
//!
//! Two engines ship here: [`HeadlessSurface`], a deterministic in-process
//! engine built on the renderer bridge model, and (with the `native`
//! feature) a `wry` WebView hosted in a `winit` window.

pub mod events;
pub mod headless;
pub mod inject;
#[cfg(feature = "native")]
pub mod native;
pub mod request;
pub mod surface;

pub use events::{PageLoadState, SurfaceEvent, SurfaceEvents};
pub use headless::{HeadlessEngine, HeadlessPage, HeadlessSurface};
pub use inject::inject_bridge;
pub use request::LoadRequest;
pub use surface::{ContentSurface, SurfaceFactory};
