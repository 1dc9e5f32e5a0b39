use crate::bind::{BindError, Binder};
use crate::di::Container;
use crate::error::RouterError;
use crate::handler::{Context, Endpoint};
use crate::logger::{SharedLogger, kv};
use axum::{
    Json,
    body::{self, Body},
    extract::{FromRequestParts, Path, Query},
    http::{HeaderMap, Request, StatusCode, header::CONTENT_TYPE, request::Parts},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Largest request body read for JSON decoding.
pub const BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Serve one request on a fresh copy of `prototype`.
pub(crate) async fn serve<T: Endpoint>(
    prototype: &T,
    container: &Container,
    logger: &SharedLogger,
    request: Request<Body>,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let mut instance = prototype.clone();
    container.inject(&mut instance);

    let params = path_params(&mut parts).await;
    let query = query_pairs(&parts);
    if let Err(err) = bind_sources(&mut instance, &params, &query, &parts.headers) {
        logger.debug(
            "Rejected request",
            &[kv("uri", &parts.uri), kv("error", &err)],
        );
        return RouterError::Binding(err).into_response();
    }

    // Body decoding is best-effort: a body that cannot be read or decoded
    // leaves the body field as the prototype held it.
    if is_json(&parts.headers) {
        let decoded = match body::to_bytes(body, BODY_LIMIT).await {
            Ok(bytes) if bytes.is_empty() => Ok(()),
            Ok(bytes) => Binder::new().bind_json(&mut instance, &bytes),
            Err(err) => Err(BindError::Body(err.to_string())),
        };
        if let Err(err) = decoded {
            logger.debug(
                "Ignored request body",
                &[kv("uri", &parts.uri), kv("error", &err)],
            );
        }
    }

    // Cancelled when the connection drops the request future.
    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();
    let mut ctx = Context::for_request(parts, token);

    let mut response = match instance.handle(&mut ctx).await {
        Ok(Some(value)) => {
            (ctx.status().unwrap_or(StatusCode::OK), Json(value)).into_response()
        }
        Ok(None) => ctx.status().unwrap_or(StatusCode::NO_CONTENT).into_response(),
        Err(err) => {
            let response = err.to_response();
            if response.status().is_server_error() {
                logger.error(
                    "Handler failed",
                    &[kv("handler", T::descriptor().type_name), kv("error", &err)],
                );
            }
            response
        }
    };

    response.headers_mut().extend(ctx.into_response_headers());
    response
}

fn bind_sources<T: Endpoint>(
    instance: &mut T,
    params: &HashMap<String, String>,
    query: &[(String, String)],
    headers: &HeaderMap,
) -> Result<(), BindError> {
    let mut binder = Binder::new();
    binder
        .add_source("path", |key: &str| params.get(key).cloned())
        .add_source("query", |key: &str| {
            query
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.clone())
        })
        .add_source("header", |key: &str| {
            headers
                .get(key)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        });
    binder.bind(instance)
}

async fn path_params(parts: &mut Parts) -> HashMap<String, String> {
    Path::<HashMap<String, String>>::from_request_parts(parts, &())
        .await
        .map(|Path(params)| params)
        .unwrap_or_default()
}

fn query_pairs(parts: &Parts) -> Vec<(String, String)> {
    Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
        .map(|Query(pairs)| pairs)
        .unwrap_or_default()
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_is_json() {
        let mut headers = HeaderMap::new();
        assert!(!is_json(&headers));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        assert!(is_json(&headers));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert!(!is_json(&headers));
    }

    #[test]
    fn test_query_pairs_keep_first_occurrence_order() {
        let (parts, _) = Request::builder()
            .uri("/x?times=3&name=a%20b&times=9")
            .body(())
            .unwrap()
            .into_parts();
        let pairs = query_pairs(&parts);
        assert_eq!(pairs[0], ("times".to_string(), "3".to_string()));
        assert_eq!(pairs[1], ("name".to_string(), "a b".to_string()));
    }
}
