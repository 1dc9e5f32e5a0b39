use crate::bind::BindError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RouterError>;

/// Errors returned to the caller of a dispatch or request.
///
/// Structural mistakes in a handler declaration are not represented here:
/// they panic at registration time, before any traffic is served.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("action not found: {action}")]
    ActionNotFound { action: String },

    #[error("no action bound to key: {key}")]
    KeyNotBound { key: String },

    #[error(transparent)]
    Binding(#[from] BindError),

    #[error("payload binding failed: {0}")]
    Payload(BindError),

    #[error("{0}")]
    Handler(HandlerError),

    #[error("http transport already listening")]
    AlreadyListening,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<HandlerError> for RouterError {
    fn from(err: HandlerError) -> Self {
        RouterError::Handler(err)
    }
}

impl IntoResponse for RouterError {
    fn into_response(self) -> Response {
        let status = match &self {
            RouterError::ActionNotFound { .. } | RouterError::KeyNotBound { .. } => {
                StatusCode::NOT_FOUND
            }
            RouterError::Binding(_) | RouterError::Payload(_) => StatusCode::BAD_REQUEST,
            RouterError::Handler(err) => return err.to_response(),
            RouterError::AlreadyListening | RouterError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// An error a handler can return, with two optional capabilities the HTTP
/// transport looks for: an explicit status code and a custom body.
///
/// Both default to `None`, so a plain error type only needs an empty impl:
///
/// ```
/// use modrouter::ResponseError;
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("disk full")]
/// struct DiskFull;
///
/// impl ResponseError for DiskFull {}
/// ```
pub trait ResponseError: std::error::Error + Send + Sync + 'static {
    fn status_code(&self) -> Option<StatusCode> {
        None
    }

    fn payload(&self) -> Option<Value> {
        None
    }
}

/// Type-erased error returned from [`Handler::handle`](crate::Handler::handle).
///
/// Anything implementing [`ResponseError`] converts with `?`, as does
/// `anyhow::Error`. The transport reads the capabilities but never alters them.
pub struct HandlerError {
    inner: Box<dyn ResponseError>,
}

impl HandlerError {
    /// An error carrying only a message; maps to 500 over HTTP.
    pub fn msg(message: impl fmt::Display) -> Self {
        Self {
            inner: Box::new(Message(message.to_string())),
        }
    }

    pub fn status_code(&self) -> Option<StatusCode> {
        self.inner.status_code()
    }

    pub fn payload(&self) -> Option<Value> {
        self.inner.payload()
    }

    /// Response for this error: the declared status or 500, and the declared
    /// payload or `{"error": message}`.
    pub fn to_response(&self) -> Response {
        let status = self
            .status_code()
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = self
            .payload()
            .unwrap_or_else(|| json!({ "error": self.to_string() }));
        (status, Json(body)).into_response()
    }
}

impl<E: ResponseError> From<E> for HandlerError {
    fn from(err: E) -> Self {
        Self {
            inner: Box::new(err),
        }
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            inner: Box::new(Opaque(err)),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);

impl ResponseError for Message {}

#[derive(Debug, Error)]
#[error("{0:#}")]
struct Opaque(anyhow::Error);

impl ResponseError for Opaque {}

/// Ready-made [`ResponseError`] with an explicit status and optional body.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HttpError {
    status: StatusCode,
    message: String,
    payload: Option<Value>,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            payload: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl ResponseError for HttpError {
    fn status_code(&self) -> Option<StatusCode> {
        Some(self.status)
    }

    fn payload(&self) -> Option<Value> {
        self.payload.clone()
    }
}

impl ResponseError for std::io::Error {}

impl ResponseError for serde_json::Error {}
