//! HTTP routing on top of axum.
//!
//! Handlers are indexed by `(method, path)`. Every registration rebuilds an
//! [`axum::Router`] from the index, which does the path matching; a running
//! server always dispatches through the latest one. Path templates use
//! axum's syntax (`/users/{id}`).

mod middleware;
mod request;
mod server;

pub use middleware::{BoxResponseFuture, FromFn, Middleware, Next, RequestLogger, from_fn};
pub use request::BODY_LIMIT;

use crate::di::Container;
use crate::error::{Result, RouterError};
use crate::handler::{Descriptor, Endpoint};
use crate::logger::{SharedLogger, default_logger, kv};
use axum::{
    body::Body,
    http::{Method, Request},
    routing::{MethodFilter, MethodRouter},
};
use middleware::RequestHandler;
use server::ServerState;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::net::{TcpListener, ToSocketAddrs};

struct Route {
    descriptor: Descriptor,
    method: Method,
    handler: RequestHandler,
}

type RouteIndex = BTreeMap<(String, String), Route>;

/// State shared by a transport and every group derived from it.
struct Shared {
    container: Arc<Container>,
    // Keyed by (path, method) so the generated router is deterministic.
    routes: RwLock<RouteIndex>,
    // Rebuilt from `routes` on every registration.
    served: RwLock<axum::Router>,
    server: Mutex<Option<ServerState>>,
}

impl Shared {
    fn current_router(&self) -> axum::Router {
        self.served
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Registry of `(method, path)` handler prototypes.
///
/// Clones and [groups](HttpTransport::group) share the container, the route
/// index and the server; each keeps its own prefix and middleware chain.
#[derive(Clone)]
pub struct HttpTransport {
    shared: Arc<Shared>,
    logger: SharedLogger,
    prefix: String,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    /// Register a dependency available to every request.
    pub fn provide<T>(&self, name: impl Into<String>, instance: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.shared.container.provide(name, instance);
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.shared.container
    }

    /// Replace the logger of this view.
    ///
    /// Routes registered earlier keep the logger they were registered with,
    /// as do groups created earlier.
    pub fn set_logger(&mut self, logger: SharedLogger) {
        self.logger = logger;
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Add a middleware to the chain of routes registered from now on.
    pub fn use_middleware<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// A view registering under `prefix` (appended to this view's prefix),
    /// starting with a copy of this view's middleware chain.
    pub fn group(&self, prefix: &str) -> HttpTransport {
        HttpTransport {
            shared: self.shared.clone(),
            logger: self.logger.clone(),
            prefix: format!("{}{}", self.prefix, prefix.trim_end_matches('/')),
            middleware: self.middleware.clone(),
        }
    }

    /// Index `prototype` under its method and prefixed path.
    ///
    /// A later registration of the same method and path replaces the earlier
    /// one. Routes registered while a server is running are served
    /// immediately.
    ///
    /// # Panics
    ///
    /// When the type declares no method or path, the method is not one the
    /// router can serve, or the path is not a valid template or conflicts
    /// with a registered one.
    pub fn register<T: Endpoint>(&self, prototype: T) {
        let descriptor = T::descriptor();
        let (Some(method), Some(path)) = (descriptor.method, descriptor.path) else {
            panic!(
                "HttpTransport::register: {} has no #[route(method = ..., path = ...)] on its Pattern field",
                descriptor.type_name
            );
        };
        if !descriptor.is_http() {
            panic!(
                "HttpTransport::register: {} declares an empty method or path",
                descriptor.type_name
            );
        }
        let method = parse_method(method).unwrap_or_else(|| {
            panic!(
                "HttpTransport::register: {} declares unsupported method {method:?}",
                descriptor.type_name
            )
        });
        let full_path = join(&self.prefix, path);
        if let Some(segment) = legacy_capture(&full_path) {
            panic!(
                "HttpTransport::register: {} path {full_path:?} has segment {segment:?}; captures are written `{{name}}` or `{{*name}}`",
                descriptor.type_name
            );
        }

        let container = self.shared.container.clone();
        let logger = self.logger.clone();
        let prototype = Arc::new(prototype);
        let endpoint: RequestHandler = Arc::new(move |req: Request<Body>| -> BoxResponseFuture {
            let container = container.clone();
            let logger = logger.clone();
            let prototype = prototype.clone();
            Box::pin(async move { request::serve(&*prototype, &container, &logger, req).await })
        });
        let handler = middleware::wrap(&self.middleware, endpoint);

        let key = (full_path.clone(), method.as_str().to_string());
        let route = Route {
            descriptor,
            method: method.clone(),
            handler,
        };

        let previous = {
            let mut routes = self
                .shared
                .routes
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            // Built before touching the index: axum panics here on a bad or
            // conflicting template, leaving the served routes unchanged.
            let router = build_router(
                routes
                    .iter()
                    .filter(|(existing, _)| **existing != key)
                    .chain(std::iter::once((&key, &route))),
            );
            let previous = routes.insert(key, route);
            *self
                .shared
                .served
                .write()
                .unwrap_or_else(PoisonError::into_inner) = router;
            previous
        };
        if let Some(previous) = previous {
            self.logger.warn(
                "Replaced route",
                &[
                    kv("method", &method),
                    kv("path", &full_path),
                    kv("previous", previous.descriptor.type_name),
                    kv("handler", descriptor.type_name),
                ],
            );
        }

        self.logger.info(
            "Registered route",
            &[kv("method", &method), kv("path", &full_path)],
        );
    }

    /// An axum router serving every route registered so far.
    ///
    /// Routes registered afterwards are not included; [`serve`](Self::serve)
    /// picks them up on its own.
    pub fn router(&self) -> axum::Router {
        self.shared.current_router()
    }

    /// Declared descriptors of the registered routes, ordered by full path
    /// then method.
    pub fn descriptors(&self) -> Vec<Descriptor> {
        self.shared
            .routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|route| route.descriptor)
            .collect()
    }

    /// `(method, full path)` of every registered route.
    pub fn routes(&self) -> Vec<(String, String)> {
        self.shared
            .routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .map(|(path, method)| (method.clone(), path.clone()))
            .collect()
    }

    /// Bind `addr` and serve until [`shutdown`](Self::shutdown).
    pub async fn listen(&self, addr: impl ToSocketAddrs) -> Result<()> {
        if self.is_listening() {
            return Err(RouterError::AlreadyListening);
        }
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Bind `addr` and serve until [`shutdown`](Self::shutdown) or until
    /// `signal` completes.
    pub async fn listen_until<F>(&self, addr: impl ToSocketAddrs, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_listening() {
            return Err(RouterError::AlreadyListening);
        }
        let listener = TcpListener::bind(addr).await?;
        self.serve_until(listener, signal).await
    }

    pub fn is_listening(&self) -> bool {
        self.shared
            .server
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

fn build_router<'a>(routes: impl Iterator<Item = (&'a (String, String), &'a Route)>) -> axum::Router {
    let mut by_path: BTreeMap<&str, MethodRouter> = BTreeMap::new();
    for ((path, _), route) in routes {
        let Ok(filter) = MethodFilter::try_from(route.method.clone()) else {
            continue;
        };
        let handler = route.handler.clone();
        let method_router = by_path
            .remove(path.as_str())
            .unwrap_or_else(MethodRouter::new);
        by_path.insert(
            path.as_str(),
            method_router.on(filter, move |request: Request<Body>| {
                let handler = handler.clone();
                async move { handler(request).await }
            }),
        );
    }

    by_path
        .into_iter()
        .fold(axum::Router::new(), |router, (path, method_router)| {
            router.route(path, method_router)
        })
}

/// First segment using the `:name` / `*name` capture syntax axum 0.8 rejects.
fn legacy_capture(path: &str) -> Option<&str> {
    path.split('/')
        .find(|segment| segment.starts_with(':') || segment.starts_with('*'))
}

fn parse_method(method: &str) -> Option<Method> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes()).ok()?;
    MethodFilter::try_from(method.clone()).ok()?;
    Some(method)
}

fn join(prefix: &str, path: &str) -> String {
    let joined = format!("{prefix}{path}");
    if joined.starts_with('/') {
        joined
    } else {
        format!("/{joined}")
    }
}

#[derive(Default)]
pub struct HttpTransportBuilder {
    container: Option<Arc<Container>>,
    logger: Option<SharedLogger>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl HttpTransportBuilder {
    /// Share an existing container instead of creating a new one.
    pub fn container(mut self, container: Arc<Container>) -> Self {
        self.container = Some(container);
        self
    }

    pub fn logger(mut self, logger: SharedLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn middleware<M: Middleware>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn build(self) -> HttpTransport {
        HttpTransport {
            shared: Arc::new(Shared {
                container: self.container.unwrap_or_default(),
                routes: RwLock::new(BTreeMap::new()),
                served: RwLock::new(axum::Router::new()),
                server: Mutex::new(None),
            }),
            logger: self.logger.unwrap_or_else(default_logger),
            prefix: String::new(),
            middleware: self.middleware,
        }
    }
}
