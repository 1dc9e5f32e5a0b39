use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

pub type BoxResponseFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// The innermost request handler of a route, after every middleware.
pub(crate) type RequestHandler = Arc<dyn Fn(Request<Body>) -> BoxResponseFuture + Send + Sync>;

/// Wraps request handling for every route registered after it is added.
///
/// The first middleware added runs first and sees the final response last.
///
/// # Example
/// ```
/// use modrouter::transport::http::{Middleware, Next};
/// use modrouter::async_trait;
/// use axum::{body::Body, http::{HeaderValue, Request}, response::Response};
///
/// struct PoweredBy;
///
/// #[async_trait]
/// impl Middleware for PoweredBy {
///     async fn handle(&self, request: Request<Body>, next: Next) -> Response {
///         let mut response = next.run(request).await;
///         response
///             .headers_mut()
///             .insert("x-powered-by", HeaderValue::from_static("modrouter"));
///         response
///     }
/// }
/// ```
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, request: Request<Body>, next: Next) -> Response;
}

/// The rest of the chain: remaining middleware, then the route handler.
pub struct Next {
    chain: Arc<[Arc<dyn Middleware>]>,
    position: usize,
    endpoint: RequestHandler,
}

impl Next {
    pub(crate) fn new(chain: Arc<[Arc<dyn Middleware>]>, endpoint: RequestHandler) -> Self {
        Self {
            chain,
            position: 0,
            endpoint,
        }
    }

    /// Execute the next handler
    pub async fn run(mut self, request: Request<Body>) -> Response {
        match self.chain.get(self.position).cloned() {
            Some(middleware) => {
                self.position += 1;
                middleware.handle(request, self).await
            }
            None => (self.endpoint)(request).await,
        }
    }
}

/// Wrap `endpoint` in a snapshot of `chain`.
pub(crate) fn wrap(chain: &[Arc<dyn Middleware>], endpoint: RequestHandler) -> RequestHandler {
    if chain.is_empty() {
        return endpoint;
    }
    let chain: Arc<[Arc<dyn Middleware>]> = chain.into();
    Arc::new(move |request: Request<Body>| -> BoxResponseFuture {
        let next = Next::new(chain.clone(), endpoint.clone());
        Box::pin(next.run(request))
    })
}

/// Middleware from an async closure.
///
/// ```
/// use modrouter::transport::http::{Next, from_fn};
/// use axum::{body::Body, http::Request};
///
/// let noop = from_fn(|request: Request<Body>, next: Next| next.run(request));
/// ```
pub fn from_fn<F, Fut>(f: F) -> FromFn<F>
where
    F: Fn(Request<Body>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    FromFn(f)
}

pub struct FromFn<F>(F);

#[async_trait]
impl<F, Fut> Middleware for FromFn<F>
where
    F: Fn(Request<Body>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    async fn handle(&self, request: Request<Body>, next: Next) -> Response {
        (self.0)(request, next).await
    }
}

/// Logs method, uri, status and latency of every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogger;

#[async_trait]
impl Middleware for RequestLogger {
    async fn handle(&self, request: Request<Body>, next: Next) -> Response {
        let method = request.method().clone();
        let uri = request.uri().clone();
        let start = Instant::now();

        tracing::debug!(%method, %uri, "--> request");
        let response = next.run(request).await;

        let status = response.status();
        let latency = start.elapsed();
        if status.is_server_error() {
            tracing::warn!(%method, %uri, status = status.as_u16(), ?latency, "<-- response");
        } else {
            tracing::info!(%method, %uri, status = status.as_u16(), ?latency, "<-- response");
        }
        response
    }
}
