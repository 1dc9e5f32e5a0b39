use clap::Parser;
use modrouter::prelude::*;
use modrouter::{ActionTransport, EventBus, Payload};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub struct Document {
    name: String,
    content: String,
    dirty: bool,
}

/// Open document shared by every action.
#[derive(Debug)]
pub struct Editor {
    document: Mutex<Document>,
}

impl Editor {
    fn with<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        let mut document = self
            .document
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut document)
    }
}

#[derive(Clone, Default, Endpoint)]
struct SaveAction {
    #[action(name = "file.save", keys = "ctrl+s")]
    meta: Pattern,
    #[inject(name = "Editor")]
    editor: Option<Arc<Editor>>,
}

#[async_trait]
impl Handler for SaveAction {
    async fn handle(&mut self, _ctx: &mut Context) -> HandlerResult {
        let editor = require(&self.editor, "Editor")?;
        let name = editor.with(|doc| {
            doc.dirty = false;
            doc.name.clone()
        });
        reply(json!({ "status": "saved", "file": name }))
    }
}

#[derive(Clone, Default, Endpoint)]
struct NewFileAction {
    #[action(name = "file.new", keys = "ctrl+n")]
    meta: Pattern,
    #[inject(name = "Editor")]
    editor: Option<Arc<Editor>>,
}

#[async_trait]
impl Handler for NewFileAction {
    async fn handle(&mut self, _ctx: &mut Context) -> HandlerResult {
        let editor = require(&self.editor, "Editor")?;
        editor.with(|doc| {
            doc.name = "Untitled".to_string();
            doc.content.clear();
            doc.dirty = false;
        });
        reply(json!({ "status": "new file created" }))
    }
}

#[derive(Clone, Default, Endpoint)]
struct InsertAction {
    #[action(name = "edit.insert")]
    meta: Pattern,
    #[bind(json = "value")]
    text: String,
    #[inject(name = "Editor")]
    editor: Option<Arc<Editor>>,
}

#[async_trait]
impl Handler for InsertAction {
    async fn handle(&mut self, _ctx: &mut Context) -> HandlerResult {
        if self.text.is_empty() {
            return Err(HandlerError::msg("nothing to insert"));
        }
        let editor = require(&self.editor, "Editor")?;
        let length = editor.with(|doc| {
            doc.content.push_str(&self.text);
            doc.dirty = true;
            doc.content.len()
        });
        reply(json!({ "length": length }))
    }
}

/// Simulate an editor driving actions through key bindings.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Text inserted before the key presses
    #[arg(long, default_value = " - edited")]
    insert: String,

    /// Key presses to simulate, in order
    #[arg(long = "press", default_values_t = vec!["ctrl+s".to_string(), "ctrl+n".to_string()])]
    keys: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let editor = Arc::new(Editor {
        document: Mutex::new(Document {
            name: "test.txt".to_string(),
            content: "Hello World".to_string(),
            dirty: true,
        }),
    });

    let bus = EventBus::new();
    let mut saves = bus.subscribe::<SaveAction>();
    let watcher = tokio::spawn(async move {
        while let Some(save) = saves.recv().await {
            if let Some(editor) = &save.editor {
                let name = editor.with(|doc| doc.name.clone());
                tracing::info!(file = %name, "📝 save observed");
            }
        }
    });

    let transport = ActionTransport::builder().event_bus(bus).build();
    transport.provide("Editor", Arc::clone(&editor));
    transport.register(SaveAction::default());
    transport.register(NewFileAction::default());
    transport.register(InsertAction::default());

    println!("Registered actions: {:?}", transport.actions());
    println!("Key bindings: {:?}", transport.key_bindings());

    let mut ctx = Context::new();

    println!("\n--- Dispatching 'edit.insert' ---");
    let payload = Payload::from(json!({ "value": args.insert }));
    match transport.dispatch(&mut ctx, "edit.insert", Some(payload)).await {
        Ok(result) => println!("Result: {}", result.unwrap_or_default()),
        Err(err) => tracing::error!(error = %err, "dispatch failed"),
    }

    for key in &args.keys {
        println!("\n--- Dispatching '{key}' ---");
        match transport.dispatch_key(&mut ctx, key).await {
            Ok(result) => println!("Result: {}", result.unwrap_or_default()),
            Err(err) => tracing::error!(error = %err, "dispatch failed"),
        }
    }

    editor.with(|doc| {
        println!(
            "\nFinal document: {} ({} bytes, dirty: {})",
            doc.name,
            doc.content.len(),
            doc.dirty
        )
    });

    // The watcher ends once the transport and its pending publishes are gone.
    drop(transport);
    let _ = tokio::time::timeout(Duration::from_millis(100), watcher).await;
    Ok(())
}
