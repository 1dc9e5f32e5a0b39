use super::{HttpTransport, Shared};
use crate::error::{Result, RouterError};
use crate::logger::kv;
use axum::{body::Body, http::Request};
use std::future::{self, Future};
use std::sync::{Arc, PoisonError};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::{ServiceExt, service_fn};

/// Handles of the running server.
pub(super) struct ServerState {
    /// Cancelled to request a graceful stop.
    stop: CancellationToken,
    /// Cancelled once the server has drained and returned.
    stopped: CancellationToken,
}

/// Clears the server slot when the serve future ends or is dropped.
struct Running {
    shared: Arc<Shared>,
    stopped: CancellationToken,
}

impl Drop for Running {
    fn drop(&mut self) {
        self.shared
            .server
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.stopped.cancel();
    }
}

impl HttpTransport {
    /// Serve the registered routes on `listener` until
    /// [`shutdown`](Self::shutdown) is called.
    ///
    /// Only one server may run per transport (groups included).
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        self.serve_until(listener, future::pending()).await
    }

    /// Like [`serve`](Self::serve), also stopping gracefully once `signal`
    /// completes.
    pub async fn serve_until<F>(&self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let stop = CancellationToken::new();
        let stopped = CancellationToken::new();
        {
            let mut server = self
                .shared
                .server
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if server.is_some() {
                return Err(RouterError::AlreadyListening);
            }
            *server = Some(ServerState {
                stop: stop.clone(),
                stopped: stopped.clone(),
            });
        }
        let running = Running {
            shared: Arc::clone(&self.shared),
            stopped,
        };

        let addr = listener
            .local_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_default();
        self.logger.info("HTTP server listening", &[kv("addr", &addr)]);

        let logger = self.logger.clone();
        let graceful = async move {
            tokio::select! {
                _ = stop.cancelled_owned() => {}
                _ = signal => logger.info("HTTP server shutting down", &[]),
            }
        };
        let result = axum::serve(listener, live_router(Arc::clone(&self.shared)))
            .with_graceful_shutdown(graceful)
            .await;
        drop(running);

        match &result {
            Ok(()) => self.logger.info("HTTP server stopped", &[kv("addr", &addr)]),
            Err(err) => self.logger.error(
                "HTTP server failed",
                &[kv("addr", &addr), kv("error", err)],
            ),
        }
        result.map_err(RouterError::Io)
    }

    /// Stop accepting connections and wait for in-flight requests to finish.
    ///
    /// Does nothing when no server is running.
    pub async fn shutdown(&self) {
        let handles = self
            .shared
            .server
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|state| (state.stop.clone(), state.stopped.clone()));

        let Some((stop, stopped)) = handles else {
            return;
        };
        self.logger.info("HTTP server shutting down", &[]);
        stop.cancel();
        stopped.cancelled().await;
    }
}

/// Router dispatching each request through the routes registered at the
/// time it arrives.
fn live_router(shared: Arc<Shared>) -> axum::Router {
    axum::Router::new().fallback_service(service_fn(move |request: Request<Body>| {
        let router = shared.current_router();
        async move { router.oneshot(request).await }
    }))
}
