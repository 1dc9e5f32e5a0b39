//! The handler contract shared by both transports.

mod context;
mod descriptor;

pub use context::Context;
pub use descriptor::Descriptor;

use crate::bind::Bindable;
use crate::di::Inject;
use crate::error::HandlerError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// What a handler produced. `None` is an empty result (204 over HTTP).
pub type Output = Option<Value>;

pub type HandlerResult = Result<Output, HandlerError>;

/// A unit of work the transports can invoke.
///
/// Each call runs on a fresh copy of the registered prototype, after
/// dependency injection and binding, so `&mut self` is private to the call.
#[async_trait]
pub trait Handler: Send + 'static {
    async fn handle(&mut self, ctx: &mut Context) -> HandlerResult;
}

/// A handler with a static routing declaration.
///
/// Usually derived:
///
/// ```
/// use modrouter::prelude::*;
///
/// #[derive(Clone, Default, Endpoint)]
/// struct Ping {
///     #[route(method = "GET", path = "/ping")]
///     meta: Pattern,
///     #[bind(query = "times", default = "1")]
///     times: u32,
/// }
///
/// #[async_trait]
/// impl Handler for Ping {
///     async fn handle(&mut self, _ctx: &mut Context) -> HandlerResult {
///         reply(vec!["pong"; self.times as usize])
///     }
/// }
///
/// let descriptor = Ping::descriptor();
/// assert_eq!(descriptor.method, Some("GET"));
/// assert_eq!(descriptor.path, Some("/ping"));
/// ```
pub trait Endpoint: Handler + Inject + Bindable + Clone + Send + Sync {
    fn descriptor() -> Descriptor;
}

/// Zero-size marker field carrying a handler's routing attributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Pattern;

/// Serialize `value` as the handler's result.
pub fn reply<T: Serialize>(value: T) -> HandlerResult {
    Ok(Some(serde_json::to_value(value)?))
}

/// An empty result.
pub fn no_content() -> HandlerResult {
    Ok(None)
}
