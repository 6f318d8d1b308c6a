use tracing::{debug, warn};
use wry::WebViewBuilder;

use positron_common::WindowId;

use crate::events::{PageLoadState, SurfaceEvent, SurfaceEvents};

pub(super) fn attach_ipc_handler<'a>(
    builder: WebViewBuilder<'a>,
    events: SurfaceEvents,
    window: WindowId,
) -> WebViewBuilder<'a> {
    builder.with_ipc_handler(move |request| {
        let body = request.body().to_string();

        // Bodies are parsed again by the dispatcher; only forward JSON.
        if serde_json::from_str::<serde_json::Value>(&body).is_err() {
            warn!(
                window_id = %window,
                body_len = body.len(),
                "IPC message rejected: invalid JSON"
            );
            return;
        }

        debug!(window_id = %window, body_len = body.len(), "IPC message from page");
        events.push(SurfaceEvent::Ipc { window, body });
    })
}

pub(super) fn attach_page_load_handler<'a>(
    builder: WebViewBuilder<'a>,
    events: SurfaceEvents,
    window: WindowId,
) -> WebViewBuilder<'a> {
    builder.with_on_page_load_handler(move |event, url| {
        let state = PageLoadState::from(event);
        debug!(window_id = %window, ?state, url = %url, "page load");
        events.push(SurfaceEvent::PageLoad { window, state, url });
    })
}

/// `#RRGGBB` as an opaque RGBA tuple.
pub(super) fn parse_background(color: &str) -> Option<(u8, u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?, 255))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_background() {
        assert_eq!(parse_background("#FFFFFF"), Some((255, 255, 255, 255)));
        assert_eq!(parse_background("#1e2a3B"), Some((0x1e, 0x2a, 0x3b, 255)));
    }

    #[test]
    fn rejects_bad_background() {
        assert_eq!(parse_background("FFFFFF"), None);
        assert_eq!(parse_background("#FFF"), None);
        assert_eq!(parse_background("#GG0000"), None);
    }
}
