//! # modrouter
//!
//! Declarative routing and dependency binding for HTTP routes and in-process
//! actions.
//!
//! Handlers are plain structs. A zero-size [`Pattern`] field carries the
//! routing declaration, other fields are dependency slots filled from a
//! [`Container`] or values bound from the request. The transports keep each
//! registered value as a prototype and run every call on a fresh copy of it.
//!
//! ## Features
//!
//! - **Two transports, one core**: [`HttpTransport`] on axum and
//!   [`ActionTransport`] for command dispatch with key bindings, composed by
//!   [`Router`]
//! - **Injection by name**: `#[inject]` fields receive the container entry of
//!   the same name when its type matches
//! - **Multi-source binding**: `#[bind(query = .., header = .., default = ..)]`,
//!   first non-empty source wins
//! - **Error capabilities**: handler errors choose their own status code and
//!   response body through [`ResponseError`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use modrouter::prelude::*;
//! use modrouter::Router;
//! use std::sync::Arc;
//!
//! pub struct PingService;
//!
//! impl PingService {
//!     fn pong(&self) -> &'static str {
//!         "pong"
//!     }
//! }
//!
//! #[derive(Clone, Default, Endpoint)]
//! struct Ping {
//!     #[route(method = "GET", path = "/api/v1/ping")]
//!     #[action(name = "app.ping", keys = "ctrl+p")]
//!     meta: Pattern,
//!     #[bind(query = "times", default = "1")]
//!     times: u32,
//!     #[inject(name = "PingService")]
//!     service: Option<Arc<PingService>>,
//! }
//!
//! #[async_trait]
//! impl Handler for Ping {
//!     async fn handle(&mut self, _ctx: &mut Context) -> HandlerResult {
//!         let service = require(&self.service, "PingService")?;
//!         reply(vec![service.pong(); self.times.max(1) as usize])
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let router = Router::new();
//!     router.provide("PingService", Arc::new(PingService));
//!     router.register(Ping::default());
//!
//!     router.listen("0.0.0.0:8080").await?;
//!     Ok(())
//! }
//! ```

// Lets the derive's `::modrouter::...` paths resolve inside this crate.
extern crate self as modrouter;

pub mod bind;
pub mod config;
pub mod di;
pub mod error;
pub mod handler;
pub mod logger;
pub mod messaging;
pub mod openapi;
pub mod router;
pub mod signal;
pub mod transport;

pub use bind::{BindError, Bindable, Binder, FromParam, Payload};
pub use config::{ConfigService, ServerConfig};
pub use di::{Container, ContainerBuilder, DependencySlot, Inject, require};
pub use error::{HandlerError, HttpError, ResponseError, Result, RouterError};
pub use handler::{
    Context, Descriptor, Endpoint, Handler, HandlerResult, Output, Pattern, no_content, reply,
};
pub use logger::{Logger, NopLogger, SharedLogger, TracingLogger};
pub use messaging::{EventBus, Subscription};
pub use router::Router;
pub use transport::{ActionTransport, HttpTransport};

pub use async_trait::async_trait;

// Re-export the derive. It shares the trait's name and lives in the macro
// namespace.
pub use modrouter_macro::Endpoint;

/// Common imports for writing handlers.
pub mod prelude {
    pub use crate::Endpoint;
    pub use crate::async_trait;
    pub use crate::di::require;
    pub use crate::error::{HandlerError, HttpError, ResponseError};
    pub use crate::handler::{Context, Handler, HandlerResult, Pattern, no_content, reply};
}

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
