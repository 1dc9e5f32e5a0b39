use modrouter::prelude::*;
use modrouter::{ActionTransport, EventBus, Payload, Router, RouterError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct Workspace {
    saves: AtomicUsize,
}

#[derive(Clone, Default, Endpoint)]
struct SaveFile {
    #[action(name = "file.save", keys = "ctrl+s")]
    meta: Pattern,
    #[bind(json = "file")]
    path: String,
    force: bool,
    #[inject(name = "Workspace")]
    workspace: Option<Arc<Workspace>>,
}

#[async_trait]
impl Handler for SaveFile {
    async fn handle(&mut self, _ctx: &mut Context) -> HandlerResult {
        let workspace = require(&self.workspace, "Workspace")?;
        let count = workspace.saves.fetch_add(1, Ordering::SeqCst) + 1;
        let path = if self.path.is_empty() {
            "untitled"
        } else {
            &self.path
        };
        reply(json!({ "saved": path, "force": self.force, "count": count }))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
struct Selection {
    start: usize,
    end: usize,
}

#[derive(Clone, Default, Endpoint)]
struct Select {
    #[action(name = "edit.select")]
    meta: Pattern,
    range: Selection,
    #[bind(skip)]
    applied: bool,
}

#[async_trait]
impl Handler for Select {
    async fn handle(&mut self, _ctx: &mut Context) -> HandlerResult {
        self.applied = true;
        if self.range.end < self.range.start {
            return Err(HttpError::bad_request("inverted selection").into());
        }
        reply(&self.range)
    }
}

#[derive(Clone, Default, Endpoint)]
struct Slow {
    #[action(name = "app.slow")]
    meta: Pattern,
    id: usize,
}

#[async_trait]
impl Handler for Slow {
    async fn handle(&mut self, _ctx: &mut Context) -> HandlerResult {
        let id = self.id;
        tokio::time::sleep(Duration::from_millis(5)).await;
        // Another dispatch must not have touched this instance meanwhile.
        assert_eq!(self.id, id);
        reply(id)
    }
}

fn transport() -> ActionTransport {
    let transport = ActionTransport::builder()
        .logger(Arc::new(modrouter::NopLogger))
        .build();
    transport.provide("Workspace", Arc::new(Workspace::default()));
    transport.register(SaveFile::default());
    transport.register(Select::default());
    transport.register(Slow::default());
    transport
}

#[tokio::test]
async fn test_key_and_name_dispatch_agree() {
    let transport = transport();
    let mut ctx = Context::new();

    let by_name = transport.dispatch(&mut ctx, "file.save", None).await.unwrap();
    let by_key = transport.dispatch_key(&mut ctx, "ctrl+s").await.unwrap();

    assert_eq!(by_name.unwrap()["saved"], "untitled");
    assert_eq!(by_key.unwrap()["saved"], "untitled");
    assert_eq!(
        transport.key_bindings().get("ctrl+s").map(String::as_str),
        Some("file.save")
    );
    assert_eq!(
        transport.actions(),
        vec!["app.slow", "edit.select", "file.save"]
    );
}

#[tokio::test]
async fn test_payload_sets_fields_by_name_and_alias() {
    let transport = transport();
    let mut ctx = Context::new();

    let payload = Payload::from(json!({ "PATH": "/tmp/a.txt", "force": true }));
    let out = transport
        .dispatch(&mut ctx, "file.save", Some(payload))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(out["saved"], "/tmp/a.txt");
    assert_eq!(out["force"], true);

    let payload = Payload::from(json!({ "file": "/tmp/b.txt" }));
    let out = transport
        .dispatch(&mut ctx, "file.save", Some(payload))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(out["saved"], "/tmp/b.txt");
    assert_eq!(out["force"], false);
}

#[tokio::test]
async fn test_struct_payload_and_nested_values() {
    let transport = transport();
    let mut ctx = Context::new();

    #[derive(Serialize)]
    struct Args {
        range: Selection,
        applied: bool,
    }

    let payload = Payload::from_serialize(&Args {
        range: Selection { start: 2, end: 9 },
        applied: true,
    })
    .unwrap();
    let out = transport
        .dispatch(&mut ctx, "edit.select", Some(payload))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(out, json!({ "start": 2, "end": 9 }));
}

#[tokio::test]
async fn test_incompatible_payload_values_are_skipped() {
    let transport = transport();
    let mut ctx = Context::new();

    let payload = Payload::from(json!({ "path": 42, "force": "yes", "unknown": 1 }));
    let out = transport
        .dispatch(&mut ctx, "file.save", Some(payload))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(out["saved"], "untitled");
    assert_eq!(out["force"], false);
}

#[tokio::test]
async fn test_non_object_payload_is_rejected() {
    let transport = transport();
    let mut ctx = Context::new();

    let err = transport
        .dispatch(&mut ctx, "file.save", Some(Payload::from(json!([1, 2]))))
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::Payload(_)), "{err}");
}

#[tokio::test]
async fn test_unknown_action_and_key() {
    let transport = transport();
    let mut ctx = Context::new();

    let err = transport.dispatch(&mut ctx, "file.close", None).await.unwrap_err();
    assert_eq!(err.to_string(), "action not found: file.close");

    let err = transport.dispatch_key(&mut ctx, "ctrl+q").await.unwrap_err();
    assert_eq!(err.to_string(), "no action bound to key: ctrl+q");
}

#[tokio::test]
async fn test_handler_error_keeps_its_capabilities() {
    let transport = transport();
    let mut ctx = Context::new();

    let payload = Payload::from(json!({ "range": { "start": 5, "end": 1 } }));
    let err = transport
        .dispatch(&mut ctx, "edit.select", Some(payload))
        .await
        .unwrap_err();
    match err {
        RouterError::Handler(err) => {
            assert_eq!(err.to_string(), "inverted selection");
            assert_eq!(err.status_code(), Some(axum::http::StatusCode::BAD_REQUEST));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_injection_skips_mismatched_type() {
    let transport = ActionTransport::new();
    transport.provide("Workspace", Arc::new("not a workspace".to_string()));
    transport.register(SaveFile::default());

    let err = transport
        .dispatch(&mut Context::new(), "file.save", None)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "dependency not provided: Workspace");
}

#[tokio::test]
async fn test_injected_dependency_is_shared_between_dispatches() {
    let transport = transport();
    let mut ctx = Context::new();
    for expected in 1..=3 {
        let out = transport
            .dispatch(&mut ctx, "file.save", None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out["count"], expected);
    }
}

#[tokio::test]
async fn test_concurrent_dispatches_are_isolated() {
    let transport = Arc::new(transport());

    let tasks: Vec<_> = (0..50)
        .map(|id| {
            let transport = Arc::clone(&transport);
            tokio::spawn(async move {
                let payload = Payload::from(json!({ "id": id }));
                transport
                    .dispatch(&mut Context::new(), "app.slow", Some(payload))
                    .await
            })
        })
        .collect();

    for (id, task) in tasks.into_iter().enumerate() {
        let out = task.await.unwrap().unwrap();
        assert_eq!(out, Some(json!(id)));
    }
}

#[tokio::test]
async fn test_event_bus_receives_dispatched_instance() {
    let bus = EventBus::new();
    let mut saves = bus.subscribe::<SaveFile>();
    let mut selections = bus.subscribe::<Select>();

    let transport = ActionTransport::builder()
        .event_bus(bus.clone())
        .logger(Arc::new(modrouter::NopLogger))
        .build();
    transport.provide("Workspace", Arc::new(Workspace::default()));
    transport.register(SaveFile::default());
    transport.register(Select::default());

    let payload = Payload::from(json!({ "path": "notes.md" }));
    transport
        .dispatch(&mut Context::new(), "file.save", Some(payload))
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(1), saves.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.path, "notes.md");

    // Failed dispatches are published too, with the state the handler left.
    let payload = Payload::from(json!({ "range": { "start": 3, "end": 0 } }));
    assert!(
        transport
            .dispatch(&mut Context::new(), "edit.select", Some(payload))
            .await
            .is_err()
    );
    let event = tokio::time::timeout(Duration::from_secs(1), selections.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(event.applied);
    assert_eq!(event.range, Selection { start: 3, end: 0 });
}

#[tokio::test]
async fn test_router_facade_routes_actions() {
    let mut router = Router::new();
    let bus = EventBus::new();
    let mut events = bus.subscribe::<SaveFile>();
    router.set_event_bus(Some(bus));
    router.provide("Workspace", Arc::new(Workspace::default()));
    router.register(SaveFile::default());

    assert!(router.http().routes().is_empty());
    let out = router
        .dispatch_key(&mut Context::new(), "ctrl+s")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(out["count"], 1);

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.path, "");
}
