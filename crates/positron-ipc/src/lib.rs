//! Message bridge between the host process and hosted web content.
//!
//! - [`IpcMain`]: host-side channel registry and dispatch engine
//! - [`IpcEvent`] / [`WebContents`]: per-dispatch event context and the
//!   route back to the window that sent a message
//! - [`IpcMessage`] / [`Outbound`]: the JSON wire shapes in both directions
//! - [`renderer`]: the content-side bridge stub, as injected JavaScript and
//!   as an in-process model with the same semantics

pub mod dispatch;
pub mod event;
pub mod handler;
pub mod message;
pub mod registry;
pub mod renderer;

pub use dispatch::IpcMain;
pub use event::{outbox, Delivery, IpcEvent, Outbox, WebContents};
pub use handler::{Handler, HandlerError, HandlerResult, Mode};
pub use message::{reply_channel_for, IpcMessage, Outbound};
pub use registry::ChannelRegistry;
pub use renderer::{BridgeScript, Invocation, ListenerId, RendererBridge, Transport};
