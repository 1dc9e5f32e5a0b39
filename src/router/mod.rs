//! One dependency set and one logger over both transports.

use crate::bind::Payload;
use crate::di::Container;
use crate::error::Result;
use crate::handler::{Context, Endpoint, Output};
use crate::logger::{SharedLogger, default_logger};
use crate::messaging::EventBus;
use crate::transport::http::Middleware;
use crate::transport::{ActionTransport, HttpTransport};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};

/// Composes an [`ActionTransport`] and an [`HttpTransport`] over a single
/// [`Container`].
///
/// [`register`](Router::register) routes each handler by what it declares:
/// a route goes to HTTP, an action name to action dispatch, both to both.
///
/// # Example
/// ```
/// use modrouter::prelude::*;
/// use modrouter::Router;
///
/// #[derive(Clone, Default, Endpoint)]
/// struct Health {
///     #[route(method = "GET", path = "/health")]
///     #[action(name = "app.health")]
///     meta: Pattern,
/// }
///
/// #[async_trait]
/// impl Handler for Health {
///     async fn handle(&mut self, _ctx: &mut Context) -> HandlerResult {
///         reply("ok")
///     }
/// }
///
/// let router = Router::new();
/// router.register(Health::default());
/// assert_eq!(router.actions(), vec!["app.health".to_string()]);
/// assert_eq!(router.http().routes(), vec![("GET".to_string(), "/health".to_string())]);
/// ```
pub struct Router {
    container: Arc<Container>,
    action: ActionTransport,
    http: HttpTransport,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::with_container(Arc::new(Container::new()))
    }

    /// Build both transports over an existing container.
    pub fn with_container(container: Arc<Container>) -> Self {
        let logger = default_logger();
        Self {
            action: ActionTransport::builder()
                .container(container.clone())
                .logger(logger.clone())
                .build(),
            http: HttpTransport::builder()
                .container(container.clone())
                .logger(logger)
                .build(),
            container,
        }
    }

    /// Replace the logger of both transports.
    ///
    /// Action dispatch switches to it at once. HTTP routes registered earlier
    /// keep the logger they were registered with, as do groups created
    /// earlier; register after calling this to log through the new one.
    pub fn set_logger(&mut self, logger: SharedLogger) {
        self.action.set_logger(logger.clone());
        self.http.set_logger(logger);
    }

    /// Attach or detach the bus receiving every action dispatch instance.
    pub fn set_event_bus(&mut self, bus: Option<EventBus>) {
        self.action.set_event_bus(bus);
    }

    pub fn provide<T>(&self, name: impl Into<String>, instance: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.container.provide(name, instance);
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    /// Register `prototype` with every transport its declaration names.
    ///
    /// # Panics
    ///
    /// When the type declares neither a route nor an action.
    pub fn register<T: Endpoint>(&self, prototype: T) {
        let descriptor = T::descriptor();
        match (descriptor.is_http(), descriptor.is_action()) {
            (true, true) => {
                self.http.register(prototype.clone());
                self.action.register(prototype);
            }
            (true, false) => self.http.register(prototype),
            (false, true) => self.action.register(prototype),
            (false, false) => panic!(
                "Router::register: {} declares neither #[route] nor #[action] on its Pattern field",
                descriptor.type_name
            ),
        }
    }

    pub fn register_http<T: Endpoint>(&self, prototype: T) {
        self.http.register(prototype);
    }

    pub fn register_action<T: Endpoint>(&self, prototype: T) {
        self.action.register(prototype);
    }

    pub fn use_middleware<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.http.use_middleware(middleware);
        self
    }

    /// HTTP view registering under `prefix`.
    pub fn group(&self, prefix: &str) -> HttpTransport {
        self.http.group(prefix)
    }

    pub async fn listen(&self, addr: impl ToSocketAddrs) -> Result<()> {
        self.http.listen(addr).await
    }

    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        self.http.serve(listener).await
    }

    /// Serve HTTP until [`shutdown`](Self::shutdown) or until `signal`
    /// completes.
    pub async fn listen_until<F>(&self, addr: impl ToSocketAddrs, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.http.listen_until(addr, signal).await
    }

    pub async fn shutdown(&self) {
        self.http.shutdown().await;
    }

    pub async fn dispatch(
        &self,
        ctx: &mut Context,
        action: &str,
        payload: Option<Payload>,
    ) -> Result<Output> {
        self.action.dispatch(ctx, action, payload).await
    }

    pub async fn dispatch_key(&self, ctx: &mut Context, key: &str) -> Result<Output> {
        self.action.dispatch_key(ctx, key).await
    }

    pub fn actions(&self) -> Vec<String> {
        self.action.actions()
    }

    pub fn key_bindings(&self) -> HashMap<String, String> {
        self.action.key_bindings()
    }

    pub fn http(&self) -> &HttpTransport {
        &self.http
    }

    pub fn action(&self) -> &ActionTransport {
        &self.action
    }
}
