use http::{HeaderMap, StatusCode, request::Parts};
use tokio_util::sync::CancellationToken;

/// Per-call context handed to [`Handler::handle`](crate::Handler::handle).
///
/// Carries the caller's cancellation signal. Over HTTP it also holds the
/// inbound request head, plus the status and headers of a successful
/// response.
#[derive(Debug, Default)]
pub struct Context {
    cancel: CancellationToken,
    request: Option<Parts>,
    response_headers: HeaderMap,
    status: Option<StatusCode>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context observing `token`; cancelling it is visible to the handler.
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancel: token,
            ..Self::default()
        }
    }

    pub(crate) fn for_request(parts: Parts, token: CancellationToken) -> Self {
        Self {
            cancel: token,
            request: Some(parts),
            response_headers: HeaderMap::new(),
            status: None,
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Completes once the call is cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Inbound request head; `None` for action dispatch.
    pub fn request(&self) -> Option<&Parts> {
        self.request.as_ref()
    }

    /// Value of an inbound request header, when it is valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request
            .as_ref()?
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
    }

    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    /// Headers copied onto the HTTP response. Ignored by action dispatch.
    pub fn response_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.response_headers
    }

    /// Status of a successful HTTP response, replacing 200 (or 204 for an
    /// empty result). Error responses keep the status the error declares.
    /// Ignored by action dispatch.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub(crate) fn into_response_headers(self) -> HeaderMap {
        self.response_headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderValue, Request};

    #[test]
    fn test_request_header_access() {
        let (parts, _) = Request::builder()
            .uri("/x")
            .header("x-user", "ada")
            .body(())
            .unwrap()
            .into_parts();
        let ctx = Context::for_request(parts, CancellationToken::new());
        assert_eq!(ctx.header("x-user"), Some("ada"));
        assert_eq!(ctx.request().unwrap().uri.path(), "/x");
    }

    #[test]
    fn test_action_context_has_no_request() {
        let mut ctx = Context::new();
        assert!(ctx.request().is_none());
        assert!(ctx.header("x-user").is_none());
        ctx.response_headers_mut()
            .insert("x-trace", HeaderValue::from_static("1"));
        assert_eq!(ctx.into_response_headers().len(), 1);
    }

    #[test]
    fn test_status_defaults_to_unset() {
        let mut ctx = Context::new();
        assert_eq!(ctx.status(), None);
        ctx.set_status(StatusCode::CREATED);
        assert_eq!(ctx.status(), Some(StatusCode::CREATED));
    }

    #[tokio::test]
    async fn test_cancellation_is_observable() {
        let token = CancellationToken::new();
        let ctx = Context::with_cancellation(token.clone());
        assert!(!ctx.is_cancelled());
        token.cancel();
        ctx.cancelled().await;
        assert!(ctx.is_cancelled());
    }
}
