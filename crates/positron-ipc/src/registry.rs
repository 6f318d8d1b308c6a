//! Channel registry: channel name -> handler, in two tables.
//!
//! The persistent table holds `on` listeners and `handle` responders
//! (last write wins across both). The once table holds single-shot
//! handlers, which are popped before they run.

use std::collections::HashMap;

use crate::handler::{Handler, Mode};

#[derive(Debug, Default)]
pub struct ChannelRegistry {
    persistent: HashMap<String, Handler>,
    once: HashMap<String, Handler>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `channel`, silently replacing whatever the table
    /// held for that channel.
    pub fn register(&mut self, channel: &str, mode: Mode, handler: Handler) {
        if self.table_mut(mode).insert(channel.to_string(), handler).is_some() {
            tracing::debug!(channel, ?mode, "replaced existing IPC handler");
        }
    }

    /// Remove registrations.
    ///
    /// - `channel` and `mode`: that table's entry for the channel
    /// - `channel` only: both tables' entries for the channel
    /// - neither: every table is cleared
    ///
    /// Absent entries are a no-op.
    pub fn unregister(&mut self, channel: Option<&str>, mode: Option<Mode>) {
        match (channel, mode) {
            (Some(channel), Some(mode)) => {
                self.table_mut(mode).remove(channel);
            }
            (Some(channel), None) => {
                self.persistent.remove(channel);
                self.once.remove(channel);
            }
            (None, Some(mode)) => self.table_mut(mode).clear(),
            (None, None) => {
                self.persistent.clear();
                self.once.clear();
            }
        }
    }

    /// Pick the handler for the next dispatch on `channel`.
    ///
    /// A once handler wins over a persistent one and is removed here, so it
    /// cannot fire twice even if the handler re-registers during the call.
    pub fn resolve(&mut self, channel: &str) -> Option<(Mode, Handler)> {
        if let Some(handler) = self.once.remove(channel) {
            return Some((Mode::Once, handler));
        }
        self.persistent
            .get(channel)
            .map(|handler| (Mode::Persistent, handler.clone()))
    }

    pub fn contains(&self, channel: &str, mode: Mode) -> bool {
        match mode {
            Mode::Persistent => self.persistent.contains_key(channel),
            Mode::Once => self.once.contains_key(channel),
        }
    }

    /// Number of handlers (0..=2) bound to `channel`.
    pub fn listener_count(&self, channel: &str) -> usize {
        usize::from(self.persistent.contains_key(channel)) + usize::from(self.once.contains_key(channel))
    }

    /// Every channel with at least one handler, sorted.
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self
            .persistent
            .keys()
            .chain(self.once.keys())
            .cloned()
            .collect();
        channels.sort();
        channels.dedup();
        channels
    }

    pub fn is_empty(&self) -> bool {
        self.persistent.is_empty() && self.once.is_empty()
    }

    fn table_mut(&mut self, mode: Mode) -> &mut HashMap<String, Handler> {
        match mode {
            Mode::Persistent => &mut self.persistent,
            Mode::Once => &mut self.once,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listener() -> Handler {
        Handler::listener(|_, _| Ok(()))
    }

    #[test]
    fn once_resolves_before_persistent_and_is_removed() {
        let mut registry = ChannelRegistry::new();
        registry.register("x", Mode::Persistent, listener());
        registry.register("x", Mode::Once, listener());

        let (mode, _) = registry.resolve("x").unwrap();
        assert_eq!(mode, Mode::Once);
        assert!(!registry.contains("x", Mode::Once));

        let (mode, _) = registry.resolve("x").unwrap();
        assert_eq!(mode, Mode::Persistent);
        assert!(registry.contains("x", Mode::Persistent));
    }

    #[test]
    fn register_replaces_within_table() {
        let mut registry = ChannelRegistry::new();
        registry.register("x", Mode::Persistent, listener());
        registry.register("x", Mode::Persistent, Handler::responder(|_, _| Ok(1)));

        assert_eq!(registry.listener_count("x"), 1);
        let (_, handler) = registry.resolve("x").unwrap();
        assert!(handler.is_responder());
    }

    #[test]
    fn unregister_modes() {
        let mut registry = ChannelRegistry::new();
        registry.register("a", Mode::Persistent, listener());
        registry.register("a", Mode::Once, listener());
        registry.register("b", Mode::Persistent, listener());

        registry.unregister(Some("a"), Some(Mode::Once));
        assert_eq!(registry.listener_count("a"), 1);

        registry.unregister(Some("a"), None);
        assert_eq!(registry.listener_count("a"), 0);
        assert_eq!(registry.channels(), vec!["b".to_string()]);

        registry.unregister(None, None);
        assert!(registry.is_empty());
    }

    #[test]
    fn unregister_absent_is_noop() {
        let mut registry = ChannelRegistry::new();
        registry.unregister(Some("missing"), Some(Mode::Persistent));
        registry.unregister(Some("missing"), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn resolve_unknown_is_none() {
        let mut registry = ChannelRegistry::new();
        assert!(registry.resolve("nope").is_none());
    }

    #[test]
    fn channels_are_deduplicated() {
        let mut registry = ChannelRegistry::new();
        registry.register("z", Mode::Once, listener());
        registry.register("z", Mode::Persistent, listener());
        registry.register("a", Mode::Once, listener());
        assert_eq!(registry.channels(), vec!["a".to_string(), "z".to_string()]);
    }
}
