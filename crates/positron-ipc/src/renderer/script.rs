//! JavaScript source of the content-side bridge.
//!
//! The stub is installed as `window[<global>].ipcRenderer` (plus the
//! `window.ipcRenderer` alias). Messages are JSON-encoded and posted over
//! `window.ipc.postMessage`; until that transport exists they are queued and
//! the stub polls for it. Installing twice on the same page is a no-op.

use std::time::Duration;

use positron_config::IpcConfig;

const TEMPLATE: &str = r#"(function () {
  'use strict';
  var GLOBAL = __GLOBAL__;
  var POLL_MS = __POLL_MS__;
  var READY_TIMEOUT_MS = __READY_TIMEOUT_MS__;
  var INVOKE_TIMEOUT_MS = __INVOKE_TIMEOUT_MS__;

  var root = window[GLOBAL] = window[GLOBAL] || {};
  if (root.ipcRenderer) { return; }

  var listeners = {};
  var onceListeners = {};
  var pending = {};
  var queue = [];
  var nextId = 0;
  var polling = false;
  var waited = 0;

  function transport() {
    return window.ipc && typeof window.ipc.postMessage === 'function' ? window.ipc : null;
  }

  function flush() {
    var t = transport();
    if (!t) { return false; }
    while (queue.length) { t.postMessage(JSON.stringify(queue.shift())); }
    return true;
  }

  function giveUp() {
    var dropped = queue;
    queue = [];
    dropped.forEach(function (msg) {
      if (msg.kind === 'invoke') {
        settle(msg.replyChannel, new Error('host bridge not ready after ' + READY_TIMEOUT_MS + 'ms'));
      } else {
        console.error('[' + GLOBAL + '] dropped message on "' + msg.channel + '": host bridge not ready');
      }
    });
  }

  function poll() {
    if (flush()) { polling = false; return; }
    waited += POLL_MS;
    if (waited >= READY_TIMEOUT_MS) { polling = false; giveUp(); return; }
    setTimeout(poll, POLL_MS);
  }

  function post(msg) {
    queue.push(msg);
    if (!flush() && !polling) {
      polling = true;
      waited = 0;
      setTimeout(poll, POLL_MS);
    }
  }

  function settle(replyChannel, err, value) {
    var p = pending[replyChannel];
    if (!p) { return false; }
    delete pending[replyChannel];
    if (p.timer) { clearTimeout(p.timer); }
    if (err) { p.reject(err); } else { p.resolve(value); }
    return true;
  }

  function fire(callbacks, event, args) {
    callbacks.forEach(function (cb) {
      try { cb.apply(null, [event].concat(args)); }
      catch (err) { console.error('[' + GLOBAL + '] listener failed:', err); }
    });
  }

  function without(table, channel, callback) {
    if (!table[channel]) { return; }
    table[channel] = table[channel].filter(function (cb) { return cb !== callback; });
    if (!table[channel].length) { delete table[channel]; }
  }

  root.ipcRenderer = {
    send: function (channel) {
      post({ kind: 'send', channel: channel, args: Array.prototype.slice.call(arguments, 1) });
    },

    invoke: function (channel) {
      var args = Array.prototype.slice.call(arguments, 1);
      var id = nextId++;
      var replyChannel = channel + '-reply-' + id;
      return new Promise(function (resolve, reject) {
        var entry = { resolve: resolve, reject: reject, timer: null };
        if (INVOKE_TIMEOUT_MS > 0) {
          entry.timer = setTimeout(function () {
            settle(replyChannel, new Error('invoke on "' + channel + '" timed out after ' + INVOKE_TIMEOUT_MS + 'ms'));
          }, INVOKE_TIMEOUT_MS);
        }
        pending[replyChannel] = entry;
        post({ kind: 'invoke', channel: channel, replyChannel: replyChannel, messageId: id, args: args });
      });
    },

    on: function (channel, callback) {
      (listeners[channel] = listeners[channel] || []).push(callback);
      return this;
    },

    once: function (channel, callback) {
      (onceListeners[channel] = onceListeners[channel] || []).push(callback);
      return this;
    },

    removeListener: function (channel, callback) {
      without(listeners, channel, callback);
      without(onceListeners, channel, callback);
      return this;
    },

    removeAllListeners: function (channel) {
      if (channel === undefined) {
        listeners = {};
        onceListeners = {};
      } else {
        delete listeners[channel];
        delete onceListeners[channel];
      }
      return this;
    },

    _receive: function (channel) {
      var args = Array.prototype.slice.call(arguments, 1);
      if (settle(channel, null, args.length ? args[0] : null)) { return; }
      var event = { sender: root, channel: channel };
      var once = onceListeners[channel] || [];
      delete onceListeners[channel];
      fire(once, event, args);
      fire((listeners[channel] || []).slice(), event, args);
    },

    _reject: function (replyChannel, message) {
      settle(replyChannel, new Error(message));
    }
  };

  window.ipcRenderer = root.ipcRenderer;
})();
"#;

/// The generated bridge script for one configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeScript {
    global: String,
    source: String,
    invoke_timeout: Option<Duration>,
}

impl BridgeScript {
    pub fn from_config(config: &IpcConfig) -> Self {
        let global = serde_json::to_string(&config.global_name)
            .unwrap_or_else(|_| "\"positron\"".to_string());
        let source = TEMPLATE
            .replace("__GLOBAL__", &global)
            .replace("__POLL_MS__", &config.bridge_poll_interval_ms.to_string())
            .replace(
                "__READY_TIMEOUT_MS__",
                &config.bridge_ready_timeout_ms.to_string(),
            )
            .replace("__INVOKE_TIMEOUT_MS__", &config.invoke_timeout_ms.to_string());

        Self {
            global: config.global_name.clone(),
            source,
            invoke_timeout: config.invoke_timeout(),
        }
    }

    /// Name of the global object the stub hangs off.
    pub fn global(&self) -> &str {
        &self.global
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// How long the stub's `invoke` waits before rejecting.
    pub fn invoke_timeout(&self) -> Option<Duration> {
        self.invoke_timeout
    }
}

impl Default for BridgeScript {
    fn default() -> Self {
        Self::from_config(&IpcConfig::default())
    }
}
