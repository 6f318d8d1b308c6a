//! Page <-> host messaging through the headless engine.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use positron::{
    App, Diagnostic, HeadlessEngine, IpcError, MemorySink, PositronConfig, WindowId, PUMP_ROUNDS,
};
use positron_ipc::RendererBridge;

struct Harness {
    app: App,
    engine: HeadlessEngine,
    sink: MemorySink,
    window: WindowId,
}

impl Harness {
    fn new() -> Self {
        let engine = HeadlessEngine::new();
        let sink = MemorySink::default();
        let mut app = App::with_sink(
            PositronConfig::default(),
            Box::new(engine.clone()),
            Arc::new(sink.clone()),
        );
        app.start();
        let window = app.create_default_window().unwrap();
        app.window_mut(window)
            .unwrap()
            .load_html("<html><head></head><body></body></html>", None)
            .unwrap();
        app.pump();
        Self {
            app,
            engine,
            sink,
            window,
        }
    }

    fn page(&self) -> RendererBridge {
        self.engine.page(self.window).unwrap().bridge().unwrap()
    }

    async fn invoke(&mut self, channel: &str, args: Vec<Value>) -> Result<Value, IpcError> {
        let invocation = self.page().invoke(channel, args);
        self.app.drive(invocation.response()).await
    }
}

fn recorder() -> (Arc<Mutex<Vec<Value>>>, impl Fn(&[Value]) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |args: &[Value]| {
        sink.lock().unwrap().push(Value::Array(args.to_vec()));
    })
}

#[tokio::test]
async fn latest_persistent_handler_wins() {
    let mut h = Harness::new();
    h.app.ipc().handle("x", |_, _| Ok("first"));
    h.app.ipc().handle("x", |_, _| Ok("second"));

    assert_eq!(h.invoke("x", vec![]).await.unwrap(), json!("second"));
    assert_eq!(h.invoke("x", vec![]).await.unwrap(), json!("second"));
}

#[tokio::test]
async fn once_handler_fires_once_then_falls_through() {
    let mut h = Harness::new();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&calls);
    h.app.ipc().once("x", move |_, args| {
        log.lock().unwrap().push(("once", args.to_vec()));
        Ok(())
    });

    let page = h.page();
    page.send("x", vec![json!(1)]).unwrap();
    page.send("x", vec![json!(2)]).unwrap();
    h.app.pump();

    assert_eq!(*calls.lock().unwrap(), vec![("once", vec![json!(1)])]);
    // The second send had nobody left to run.
    assert_eq!(
        h.sink.entries(),
        vec![Diagnostic::NoHandler {
            channel: "x".into()
        }]
    );
}

#[tokio::test]
async fn once_handler_takes_precedence_over_persistent() {
    let mut h = Harness::new();
    h.app.ipc().handle("x", |_, _| Ok("persistent"));
    h.app.ipc().handle_once("x", |_, _| Ok("once"));

    assert_eq!(h.invoke("x", vec![]).await.unwrap(), json!("once"));
    assert_eq!(h.invoke("x", vec![]).await.unwrap(), json!("persistent"));
}

#[tokio::test]
async fn unregistered_channel_is_reported_once_and_answers_null() {
    let mut h = Harness::new();

    assert_eq!(h.invoke("nobody", vec![json!(1)]).await.unwrap(), Value::Null);
    assert_eq!(
        h.sink.entries(),
        vec![Diagnostic::NoHandler {
            channel: "nobody".into()
        }]
    );

    h.sink.clear();
    h.page().send("nobody", vec![]).unwrap();
    h.app.pump();
    assert_eq!(h.sink.len(), 1);
}

#[tokio::test]
async fn invoke_round_trip_uses_derived_reply_channel() {
    let mut h = Harness::new();
    let seen = Arc::new(Mutex::new(None));
    let capture = Arc::clone(&seen);
    h.app.ipc().handle("X", move |event, args| {
        *capture.lock().unwrap() = event.reply_channel().map(str::to_string);
        assert_eq!(args, &[json!(42)]);
        Ok(99)
    });

    let page = h.page();
    // Burn an id so the one under test is not simply zero.
    drop(page.invoke("warmup", vec![]));
    let invocation = page.invoke("X", vec![json!(42)]);
    let expected = format!("X-reply-{}", invocation.message_id());
    assert_eq!(invocation.message_id(), 1);
    assert_eq!(invocation.reply_channel(), expected);

    let value = h.app.drive(invocation.response()).await.unwrap();
    assert_eq!(value, json!(99));
    assert_eq!(seen.lock().unwrap().as_deref(), Some(expected.as_str()));
    assert_eq!(page.pending_count(), 0);
}

#[tokio::test]
async fn handler_failure_rejects_invoke_and_is_reported() {
    let mut h = Harness::new();
    h.app
        .ipc()
        .handle("save", |_, _| -> positron_ipc::HandlerResult<Value> {
            Err("disk full".into())
        });

    let err = h.invoke("save", vec![]).await.unwrap_err();
    match err {
        IpcError::Rejected { channel, message } => {
            assert_eq!(channel, "save");
            assert!(message.contains("disk full"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert!(matches!(
        h.sink.entries().as_slice(),
        [Diagnostic::HandlerFailed { channel, .. }] if channel == "save"
    ));
    assert!(!h.app.windows().is_empty());
}

#[tokio::test]
async fn failing_send_handler_does_not_disturb_page() {
    let mut h = Harness::new();
    h.app.ipc().on("log", |_, _| Err("bad line".into()));
    h.app.ipc().handle("ok", |_, _| Ok(true));

    h.page().send("log", vec![json!("x")]).unwrap();
    assert_eq!(h.invoke("ok", vec![]).await.unwrap(), json!(true));
    assert_eq!(h.sink.len(), 1);
}

#[tokio::test]
async fn handler_reply_reaches_page_listeners() {
    let mut h = Harness::new();
    h.app.ipc().on("subscribe", |event, args| {
        event.reply("update", args.to_vec())?;
        Ok(())
    });

    let page = h.page();
    let (persistent, on_update) = recorder();
    let (single, once_update) = recorder();
    page.on("update", on_update);
    page.once("update", once_update);

    page.send("subscribe", vec![json!("a")]).unwrap();
    page.send("subscribe", vec![json!("b")]).unwrap();
    h.app.pump();

    assert_eq!(*persistent.lock().unwrap(), vec![json!(["a"]), json!(["b"])]);
    assert_eq!(*single.lock().unwrap(), vec![json!(["a"])]);
}

#[tokio::test]
async fn host_can_push_to_page() {
    let mut h = Harness::new();
    let page = h.page();
    let (seen, listener) = recorder();
    page.on("notify", listener);

    h.app
        .window(h.window)
        .unwrap()
        .web_contents()
        .send("notify", vec![json!({"level": "info"}), json!(3)])
        .unwrap();
    h.app.pump();

    assert_eq!(*seen.lock().unwrap(), vec![json!([{"level": "info"}, 3])]);
}

#[tokio::test]
async fn handlers_may_register_handlers() {
    let mut h = Harness::new();
    let ipc = h.app.ipc().clone();
    h.app.ipc().handle_once("setup", move |_, _| {
        ipc.handle("feature", |_, _| Ok("enabled"));
        Ok(Value::Null)
    });

    h.invoke("setup", vec![]).await.unwrap();
    assert_eq!(h.invoke("feature", vec![]).await.unwrap(), json!("enabled"));
    assert_eq!(h.app.ipc().listener_count("setup"), 0);
}

#[tokio::test]
async fn pending_invoke_fails_when_window_closes() {
    let mut h = Harness::new();
    h.app.ipc().handle("slow", |_, _| Ok(1));
    let invocation = h.page().invoke("slow", vec![]);

    // Closed before the host ever saw the message.
    h.app.close_window(h.window).unwrap();
    assert_eq!(invocation.response().await, Err(IpcError::Closed));
}

#[tokio::test]
async fn windows_only_hear_their_own_replies() {
    let mut h = Harness::new();
    h.app.ipc().handle("whoami", |event, _| Ok(event.sender().id().0));

    let second = h.app.create_default_window().unwrap();
    h.app
        .window_mut(second)
        .unwrap()
        .load_url("https://example.com/")
        .unwrap();
    h.app.pump();
    let other = h.engine.page(second).unwrap().bridge().unwrap();

    let first_call = h.page().invoke("whoami", vec![]);
    let second_call = other.invoke("whoami", vec![]);
    let (a, b) = h
        .app
        .drive(async { (first_call.response().await, second_call.response().await) })
        .await;

    assert_eq!(a.unwrap(), json!(h.window.0));
    assert_eq!(b.unwrap(), json!(second.0));
}

#[tokio::test]
async fn endless_conversation_does_not_starve_the_pump() {
    let mut h = Harness::new();
    h.app.ipc().on("ping", |event, _| {
        event.reply("pong", vec![])?;
        Ok(())
    });
    h.app.ipc().handle("status", |_, _| Ok("alive"));

    let page = h.page();
    let answer = page.clone();
    let pongs = Arc::new(Mutex::new(0usize));
    let count = Arc::clone(&pongs);
    page.on("pong", move |_| {
        *count.lock().unwrap() += 1;
        let _ = answer.send("ping", vec![]);
    });
    page.send("ping", vec![]).unwrap();

    // One ping and one pong per round.
    let handled = h.app.pump();
    assert!(handled > 0 && handled <= 2 * PUMP_ROUNDS);
    let after_first = *pongs.lock().unwrap();

    h.app.pump();
    assert!(*pongs.lock().unwrap() > after_first);

    assert_eq!(h.invoke("status", vec![]).await.unwrap(), json!("alive"));
}
