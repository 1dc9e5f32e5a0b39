//! The two transports sharing the handler core.

pub mod action;
pub mod http;

pub use action::{ActionTransport, ActionTransportBuilder};
pub use http::{HttpTransport, HttpTransportBuilder};
