//! Draining engine signals and host -> content deliveries.

use tracing::{debug, trace};

use positron_common::{Diagnostic, WindowId};
use positron_ipc::{Delivery, IpcMessage};
use positron_webview::{PageLoadState, SurfaceEvent};

use super::{App, PUMP_ROUNDS};
use crate::host;
use crate::window::WindowEvent;

impl App {
    /// Process queued engine events and deliveries. Handling one may queue
    /// more (a reply delivery can make a page post again), so this repeats,
    /// each round working on what was queued when it began, for at most
    /// [`PUMP_ROUNDS`] rounds. Leftovers wait for the next call. Returns the
    /// number of items handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        for _ in 0..PUMP_ROUNDS {
            let events = self.events.drain();
            let mut deliveries = Vec::new();
            while let Ok(delivery) = self.deliveries.try_recv() {
                deliveries.push(delivery);
            }
            if events.is_empty() && deliveries.is_empty() {
                break;
            }

            for event in events {
                self.handle_surface_event(event);
                handled += 1;
            }
            for delivery in deliveries {
                self.deliver(delivery);
                handled += 1;
            }
        }
        if handled > 0 {
            trace!(handled, "pump drained");
        }
        handled
    }

    fn handle_surface_event(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::PageLoad { window, state, url } => {
                debug!(window_id = %window, ?state, url = %url, "page load");
                match state {
                    PageLoadState::Started => {
                        if let Some(w) = self.window_mut(window) {
                            w.page_loading();
                        }
                    }
                    PageLoadState::Finished => self.page_finished(window),
                }
            }
            SurfaceEvent::Ipc { window, body } => self.handle_ipc(window, &body),
            SurfaceEvent::CloseRequested { window } => {
                if let Err(e) = self.close_window(window) {
                    debug!(window_id = %window, error = %e, "close request ignored");
                }
            }
        }
    }

    fn page_finished(&mut self, id: WindowId) {
        let Some(window) = self.window_mut(id) else {
            return;
        };
        if !window.page_finished() {
            return;
        }
        let callbacks = window.callbacks(WindowEvent::DomReady);
        for callback in callbacks {
            if let Err(e) = callback(self, id) {
                self.report_callback(WindowEvent::DomReady.name(), e);
            }
        }
    }

    fn handle_ipc(&mut self, id: WindowId, body: &str) {
        let Some(sender) = self
            .window(id)
            .filter(|w| !w.is_closed())
            .map(|w| w.web_contents().clone())
        else {
            debug!(window_id = %id, "IPC message from a closed window dropped");
            return;
        };

        let message = match IpcMessage::from_json(body) {
            Ok(message) => message,
            Err(e) => {
                self.sink.report(Diagnostic::MalformedMessage {
                    window: id,
                    message: e.to_string(),
                });
                return;
            }
        };

        match message {
            IpcMessage::Send { channel, args } => {
                let outcome = host::ipc_send(&self.ipc, &sender, &channel, &args);
                if !outcome.success {
                    debug!(window_id = %id, channel = %channel, "send failed");
                }
            }
            IpcMessage::Invoke {
                channel,
                reply_channel,
                message_id,
                args,
            } => {
                debug!(window_id = %id, channel = %channel, message_id, "invoke from page");
                // Failures already went to the sink and back to the page.
                let _ = host::ipc_invoke(&self.ipc, &sender, &channel, &reply_channel, &args);
            }
        }
    }

    fn deliver(&mut self, delivery: Delivery) {
        let Delivery { window, outbound } = delivery;
        let Some(target) = self.window_mut(window).filter(|w| !w.is_closed()) else {
            debug!(window_id = %window, "delivery for a closed window dropped");
            return;
        };
        if let Err(e) = target.surface_mut().deliver(&outbound) {
            self.sink.report(Diagnostic::DeliveryFailed {
                window,
                message: e.to_string(),
            });
        }
    }
}
