//! The rendering-engine boundary.

use positron_common::{WindowError, WindowId};
use positron_config::WindowConfig;
use positron_ipc::{BridgeScript, Outbound};

use crate::events::SurfaceEvents;
use crate::request::LoadRequest;

/// One window's worth of embedded web content.
///
/// Implementations report page loads, posted IPC bodies and close requests
/// through the [`SurfaceEvents`] queue they were created with.
pub trait ContentSurface {
    /// Replace the current page. `script` must be running in the new page
    /// before any of the page's own scripts.
    fn load(&mut self, request: &LoadRequest, script: &BridgeScript) -> Result<(), WindowError>;

    /// Deliver a host -> content message to the current page.
    fn deliver(&mut self, outbound: &Outbound) -> Result<(), WindowError>;

    fn evaluate_script(&mut self, script: &str) -> Result<(), WindowError>;

    fn set_title(&mut self, title: &str);
    fn title(&self) -> String;

    fn show(&mut self);
    fn hide(&mut self);
    fn is_visible(&self) -> bool;

    fn set_size(&mut self, width: u32, height: u32);
    fn size(&self) -> (u32, u32);

    fn maximize(&mut self);
    fn minimize(&mut self);

    /// Tear down the engine. Later calls are no-ops.
    fn destroy(&mut self);
}

/// Creates surfaces for new windows.
pub trait SurfaceFactory {
    /// `script` must be installed on every page the surface shows, including
    /// the first one built before any `load`.
    fn create(
        &mut self,
        id: WindowId,
        options: &WindowConfig,
        script: &BridgeScript,
        events: SurfaceEvents,
    ) -> Result<Box<dyn ContentSurface>, WindowError>;
}
