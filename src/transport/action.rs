//! In-process action dispatch for GUI and CLI command execution.

use crate::bind::Payload;
use crate::di::Container;
use crate::error::{Result, RouterError};
use crate::handler::{Context, Descriptor, Endpoint, Output};
use crate::logger::{SharedLogger, default_logger, kv};
use crate::messaging::EventBus;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// A registered prototype, erased over its handler type.
#[async_trait]
trait ActionEntry: Send + Sync {
    fn descriptor(&self) -> Descriptor;

    async fn call(
        &self,
        container: &Container,
        bus: Option<&EventBus>,
        ctx: &mut Context,
        payload: Option<Payload>,
    ) -> Result<Output>;
}

struct Prototype<T>(T);

#[async_trait]
impl<T: Endpoint> ActionEntry for Prototype<T> {
    fn descriptor(&self) -> Descriptor {
        T::descriptor()
    }

    async fn call(
        &self,
        container: &Container,
        bus: Option<&EventBus>,
        ctx: &mut Context,
        payload: Option<Payload>,
    ) -> Result<Output> {
        let mut instance = self.0.clone();
        container.inject(&mut instance);

        if let Some(payload) = payload {
            payload.apply(&mut instance).map_err(RouterError::Payload)?;
        }

        let result = instance.handle(ctx).await;

        if let Some(bus) = bus {
            emit(bus.clone(), instance);
        }

        result.map_err(RouterError::from)
    }
}

/// Publish the dispatch instance without holding up the caller.
///
/// Inside a tokio runtime the publish runs on a detached task; outside one
/// it happens inline, which cannot block since broadcast sends never wait.
fn emit<T: Send + Sync + 'static>(bus: EventBus, instance: T) {
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn(async move {
                bus.publish(instance);
            });
        }
        Err(_) => {
            bus.publish(instance);
        }
    }
}

#[derive(Default)]
struct Index {
    actions: HashMap<String, Arc<dyn ActionEntry>>,
    keys: HashMap<String, String>,
}

/// Registry of named, optionally key-bound handler prototypes.
///
/// # Example
/// ```
/// use modrouter::prelude::*;
/// use modrouter::ActionTransport;
///
/// #[derive(Clone, Default, Endpoint)]
/// struct Save {
///     #[action(name = "file.save", keys = "ctrl+s")]
///     meta: Pattern,
///     path: String,
/// }
///
/// #[async_trait]
/// impl Handler for Save {
///     async fn handle(&mut self, _ctx: &mut Context) -> HandlerResult {
///         reply(format!("saved {}", self.path))
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let actions = ActionTransport::new();
/// actions.register(Save { path: "notes.txt".into(), ..Default::default() });
///
/// let out = actions.dispatch_key(&mut Context::new(), "ctrl+s").await.unwrap();
/// assert_eq!(out, Some("saved notes.txt".into()));
/// # }
/// ```
pub struct ActionTransport {
    container: Arc<Container>,
    logger: SharedLogger,
    bus: Option<EventBus>,
    index: RwLock<Index>,
}

impl Default for ActionTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionTransport {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ActionTransportBuilder {
        ActionTransportBuilder::default()
    }

    /// Register a dependency available to every dispatch.
    pub fn provide<T>(&self, name: impl Into<String>, instance: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.container.provide(name, instance);
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn set_logger(&mut self, logger: SharedLogger) {
        self.logger = logger;
    }

    /// Attach or detach the bus receiving every dispatch instance.
    pub fn set_event_bus(&mut self, bus: Option<EventBus>) {
        self.bus = bus;
    }

    pub fn event_bus(&self) -> Option<&EventBus> {
        self.bus.as_ref()
    }

    /// Index `prototype` by its action name and key binding.
    ///
    /// A later registration under the same name or key replaces the earlier
    /// one.
    ///
    /// # Panics
    ///
    /// When the type declares no action name.
    pub fn register<T: Endpoint>(&self, prototype: T) {
        let descriptor = T::descriptor();
        let Some(name) = descriptor.action.filter(|_| descriptor.is_action()) else {
            panic!(
                "ActionTransport::register: {} has no #[action(name = ...)] on its Pattern field",
                descriptor.type_name
            );
        };
        let keys = descriptor.key_binding();

        let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(previous) = index
            .actions
            .insert(name.to_string(), Arc::new(Prototype(prototype)))
        {
            self.logger.warn(
                "Replaced action",
                &[
                    kv("action", name),
                    kv("previous", previous.descriptor().type_name),
                    kv("handler", descriptor.type_name),
                ],
            );
        }

        if let Some(keys) = keys {
            if let Some(previous) = index.keys.insert(keys.to_string(), name.to_string()) {
                if previous != name {
                    self.logger.warn(
                        "Rebound key",
                        &[kv("keys", keys), kv("previous", previous), kv("action", name)],
                    );
                }
            }
        }

        self.logger.info(
            "Registered action",
            &[kv("action", name), kv("keys", keys.unwrap_or_default())],
        );
    }

    /// Run the action registered under `action` on a fresh instance.
    ///
    /// The instance is a copy of the prototype with dependencies injected and
    /// `payload` (if any) applied. When an event bus is attached, the instance
    /// is published after the handler returns, whatever the outcome.
    pub async fn dispatch(
        &self,
        ctx: &mut Context,
        action: &str,
        payload: Option<Payload>,
    ) -> Result<Output> {
        let entry = {
            let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
            index.actions.get(action).cloned()
        };
        let Some(entry) = entry else {
            return Err(RouterError::ActionNotFound {
                action: action.to_string(),
            });
        };

        self.logger.debug("Dispatching action", &[kv("action", action)]);
        entry
            .call(&self.container, self.bus.as_ref(), ctx, payload)
            .await
    }

    /// Run the action bound to `key`, without a payload.
    pub async fn dispatch_key(&self, ctx: &mut Context, key: &str) -> Result<Output> {
        let action = {
            let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
            index.keys.get(key).cloned()
        };
        match action {
            Some(action) => self.dispatch(ctx, &action, None).await,
            None => Err(RouterError::KeyNotBound {
                key: key.to_string(),
            }),
        }
    }

    /// Registered action names, sorted.
    pub fn actions(&self) -> Vec<String> {
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = index.actions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshot of key binding -> action name.
    pub fn key_bindings(&self) -> HashMap<String, String> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys
            .clone()
    }

    /// Descriptors of the registered actions, sorted by action name.
    pub fn descriptors(&self) -> Vec<Descriptor> {
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        let mut descriptors: Vec<Descriptor> =
            index.actions.values().map(|entry| entry.descriptor()).collect();
        descriptors.sort_by_key(|d| d.action);
        descriptors
    }
}

#[derive(Default)]
pub struct ActionTransportBuilder {
    container: Option<Arc<Container>>,
    logger: Option<SharedLogger>,
    bus: Option<EventBus>,
}

impl ActionTransportBuilder {
    /// Share an existing container instead of creating a new one.
    pub fn container(mut self, container: Arc<Container>) -> Self {
        self.container = Some(container);
        self
    }

    pub fn logger(mut self, logger: SharedLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn build(self) -> ActionTransport {
        ActionTransport {
            container: self.container.unwrap_or_default(),
            logger: self.logger.unwrap_or_else(default_logger),
            bus: self.bus,
            index: RwLock::new(Index::default()),
        }
    }
}
