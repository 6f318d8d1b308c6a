use super::*;

use std::sync::atomic::AtomicUsize;

use serde_json::json;

/// Transport that records every posted body.
#[derive(Default)]
struct Recorder {
    bodies: Mutex<Vec<String>>,
}

impl Recorder {
    fn messages(&self) -> Vec<IpcMessage> {
        self.bodies
            .lock()
            .unwrap()
            .iter()
            .map(|b| IpcMessage::from_json(b).unwrap())
            .collect()
    }
}

impl Transport for Recorder {
    fn post_message(&self, body: String) -> Result<(), IpcError> {
        self.bodies.lock().unwrap().push(body);
        Ok(())
    }
}

fn attached() -> (RendererBridge, Arc<Recorder>) {
    let bridge = RendererBridge::new(None);
    let recorder = Arc::new(Recorder::default());
    bridge.attach(recorder.clone()).unwrap();
    (bridge, recorder)
}

#[test]
fn send_posts_json_message() {
    let (bridge, recorder) = attached();
    bridge.send("log", vec![json!("hello"), json!(2)]).unwrap();
    assert_eq!(
        recorder.messages(),
        vec![IpcMessage::Send {
            channel: "log".into(),
            args: vec![json!("hello"), json!(2)],
        }]
    );
}

#[test]
fn messages_queue_until_attached_and_flush_in_order() {
    let bridge = RendererBridge::new(None);
    bridge.send("a", vec![]).unwrap();
    let invocation = bridge.invoke("b", vec![json!(1)]);
    assert!(!bridge.is_attached());

    let recorder = Arc::new(Recorder::default());
    bridge.attach(recorder.clone()).unwrap();

    let channels: Vec<String> = recorder
        .messages()
        .iter()
        .map(|m| m.channel().to_string())
        .collect();
    assert_eq!(channels, vec!["a", "b"]);
    assert_eq!(invocation.reply_channel(), "b-reply-0");
}

#[test]
fn message_ids_increase_from_zero() {
    let (bridge, recorder) = attached();
    let first = bridge.invoke("x", vec![]);
    let second = bridge.invoke("y", vec![]);
    assert_eq!(first.message_id(), 0);
    assert_eq!(second.message_id(), 1);
    assert_eq!(second.reply_channel(), "y-reply-1");

    match &recorder.messages()[1] {
        IpcMessage::Invoke {
            reply_channel,
            message_id,
            ..
        } => {
            assert_eq!(reply_channel, "y-reply-1");
            assert_eq!(*message_id, 1);
        }
        other => panic!("expected invoke, got {other:?}"),
    }
}

#[tokio::test]
async fn invoke_resolves_with_first_reply_arg() {
    let (bridge, _) = attached();
    let invocation = bridge.invoke("X", vec![json!(42)]);
    let reply = invocation.reply_channel().to_string();

    assert_eq!(bridge.receive(&reply, &[json!(99), json!("ignored")]), 0);
    assert_eq!(invocation.response().await, Ok(json!(99)));
    assert_eq!(bridge.pending_count(), 0);
}

#[tokio::test]
async fn invoke_reply_without_args_is_null() {
    let (bridge, _) = attached();
    let invocation = bridge.invoke("X", vec![]);
    bridge.receive("X-reply-0", &[]);
    assert_eq!(invocation.response().await, Ok(Value::Null));
}

#[tokio::test]
async fn reject_fails_invocation_with_channel() {
    let (bridge, _) = attached();
    let invocation = bridge.invoke("greet", vec![]);
    assert!(bridge.reject("greet-reply-0", "no way"));
    assert_eq!(
        invocation.response().await,
        Err(IpcError::Rejected {
            channel: "greet".into(),
            message: "no way".into()
        })
    );
    assert!(!bridge.reject("greet-reply-0", "again"));
}

#[tokio::test(start_paused = true)]
async fn invoke_times_out_and_cleans_up() {
    let bridge = RendererBridge::new(Some(Duration::from_millis(250)));
    bridge.attach(Arc::new(Recorder::default())).unwrap();

    let invocation = bridge.invoke("slow", vec![]);
    assert_eq!(bridge.pending_count(), 1);

    let result = invocation.response().await;
    assert_eq!(
        result,
        Err(IpcError::Timeout {
            channel: "slow".into(),
            timeout_ms: 250
        })
    );
    assert_eq!(bridge.pending_count(), 0);

    // A late reply finds nothing to settle and falls through to listeners.
    assert_eq!(bridge.receive("slow-reply-0", &[json!(1)]), 0);
}

#[tokio::test]
async fn close_fails_pending_invokes() {
    let (bridge, _) = attached();
    let invocation = bridge.invoke("x", vec![]);
    bridge.close();
    assert_eq!(invocation.response().await, Err(IpcError::Closed));
    assert!(bridge.is_closed());
    assert_eq!(bridge.send("x", vec![]), Err(IpcError::Closed));
}

#[tokio::test]
async fn invoke_after_close_fails_immediately() {
    let bridge = RendererBridge::new(None);
    bridge.close();
    let invocation = bridge.invoke("x", vec![]);
    assert_eq!(invocation.response().await, Err(IpcError::Closed));
}

#[test]
fn dropped_invocation_removes_pending_entry() {
    let (bridge, _) = attached();
    let invocation = bridge.invoke("x", vec![]);
    assert_eq!(bridge.pending_count(), 1);
    drop(invocation);
    assert_eq!(bridge.pending_count(), 0);
}

#[test]
fn receive_consumes_once_and_keeps_persistent() {
    let (bridge, _) = attached();
    let persistent = Arc::new(AtomicUsize::new(0));
    let once = Arc::new(AtomicUsize::new(0));

    let p = Arc::clone(&persistent);
    bridge.on("tick", move |_| {
        p.fetch_add(1, Ordering::SeqCst);
    });
    let o = Arc::clone(&once);
    bridge.once("tick", move |_| {
        o.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(bridge.receive("tick", &[]), 2);
    assert_eq!(bridge.receive("tick", &[]), 1);
    assert_eq!(persistent.load(Ordering::SeqCst), 2);
    assert_eq!(once.load(Ordering::SeqCst), 1);
    assert_eq!(bridge.listener_count("tick"), 1);
}

#[test]
fn listeners_receive_args() {
    let (bridge, _) = attached();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    bridge.on("update", move |args| {
        s.lock().unwrap().extend_from_slice(args);
    });
    bridge.receive("update", &[json!({"n": 1}), json!("x")]);
    assert_eq!(*seen.lock().unwrap(), vec![json!({"n": 1}), json!("x")]);
}

#[test]
fn remove_listener_by_id() {
    let (bridge, _) = attached();
    let a = bridge.on("c", |_| {});
    let _b = bridge.on("c", |_| {});
    bridge.remove_listener("c", a);
    assert_eq!(bridge.listener_count("c"), 1);

    bridge.remove_all_listeners(Some("c"));
    assert_eq!(bridge.listener_count("c"), 0);
}

#[test]
fn remove_all_listeners_keeps_pending_invokes() {
    let (bridge, _) = attached();
    bridge.on("a", |_| {});
    let _invocation = bridge.invoke("b", vec![]);
    bridge.remove_all_listeners(None);
    assert_eq!(bridge.listener_count("a"), 0);
    assert_eq!(bridge.pending_count(), 1);
}

#[test]
fn receive_on_unknown_channel_is_noop() {
    let (bridge, _) = attached();
    assert_eq!(bridge.receive("nothing", &[json!(1)]), 0);
}
