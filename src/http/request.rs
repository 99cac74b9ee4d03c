//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) when the client sent none
//! - Decode the JSON body and capture the original URI for the relay
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Body size limit enforced by the layer in front, reported here as 413
//! - An empty body is "no body", not a JSON error

use axum::body::Body;
use axum::extract::OriginalUri;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use http_body_util::LengthLimitError;
use thiserror::Error;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::http::response::error_response;
use crate::relay::context::InboundRequest;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Issues UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Why an inbound body could not be handed to the relay.
#[derive(Debug, Error)]
pub enum BodyRejection {
    #[error("request body exceeds the configured limit")]
    TooLarge,

    #[error("failed to read request body: {0}")]
    Unreadable(axum::Error),

    #[error("unsupported content type: {0}")]
    UnsupportedMediaType(String),

    #[error("request body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl IntoResponse for BodyRejection {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            BodyRejection::TooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            BodyRejection::Unreadable(_) => (StatusCode::BAD_REQUEST, "UNREADABLE_BODY"),
            BodyRejection::UnsupportedMediaType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_MEDIA_TYPE")
            }
            BodyRejection::InvalidJson(_) => (StatusCode::BAD_REQUEST, "INVALID_JSON"),
        };
        error_response(status, kind, &self.to_string())
    }
}

/// Build the relay's view of an axum request mounted under `mount_prefix`.
pub async fn read_inbound(
    request: Request<Body>,
    mount_prefix: &str,
) -> Result<InboundRequest, BodyRejection> {
    let original = request.extensions().get::<OriginalUri>().map(|uri| uri.0.clone());
    let (parts, body) = request.into_parts();

    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|err| {
            if is_length_limit(&err) {
                BodyRejection::TooLarge
            } else {
                BodyRejection::Unreadable(err)
            }
        })?;

    let body = if bytes.is_empty() {
        None
    } else {
        check_json_content_type(&parts.headers)?;
        Some(serde_json::from_slice(&bytes)?)
    };

    Ok(InboundRequest {
        method: parts.method,
        uri: original.unwrap_or(parts.uri),
        mount_prefix: mount_prefix.to_string(),
        headers: parts.headers,
        extensions: parts.extensions,
        body,
    })
}

fn check_json_content_type(headers: &HeaderMap) -> Result<(), BodyRejection> {
    let Some(value) = headers.get(header::CONTENT_TYPE) else {
        return Ok(());
    };
    let content_type = value.to_str().unwrap_or_default();
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence == "application/json" || essence.ends_with("+json") {
        Ok(())
    } else {
        Err(BodyRejection::UnsupportedMediaType(content_type.to_string()))
    }
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut cause: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(current) = cause {
        if current.is::<LengthLimitError>() {
            return true;
        }
        cause = current.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, Uri};
    use serde_json::json;

    fn request(body: &'static str, content_type: Option<&'static str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/orders/v1/items?limit=5");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn test_empty_body_is_none() {
        let inbound = read_inbound(request("", None), "/orders").await.unwrap();
        assert!(inbound.body.is_none());
        assert_eq!(inbound.mount_prefix, "/orders");
        assert_eq!(inbound.original_path(), "/orders/v1/items?limit=5");
    }

    #[tokio::test]
    async fn test_json_body_decoded() {
        let inbound = read_inbound(request(r#"{"a":[1,2]}"#, Some("application/json; charset=utf-8")), "")
            .await
            .unwrap();
        assert_eq!(inbound.body, Some(json!({"a": [1, 2]})));
        assert_eq!(inbound.method, Method::POST);
    }

    #[tokio::test]
    async fn test_original_uri_preferred() {
        let mut req = request("", None);
        *req.uri_mut() = Uri::from_static("/v1/items?limit=5");
        req.extensions_mut()
            .insert(OriginalUri(Uri::from_static("/orders/v1/items?limit=5")));

        let inbound = read_inbound(req, "/orders").await.unwrap();
        assert_eq!(inbound.original_path(), "/orders/v1/items?limit=5");
    }

    #[tokio::test]
    async fn test_invalid_json_rejected() {
        let err = read_inbound(request("{not json", Some("application/json")), "")
            .await
            .unwrap_err();
        assert!(matches!(err, BodyRejection::InvalidJson(_)));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_non_json_content_type_rejected() {
        let err = read_inbound(request("a=1", Some("application/x-www-form-urlencoded")), "")
            .await
            .unwrap_err();
        assert!(matches!(err, BodyRejection::UnsupportedMediaType(_)));
    }

    #[test]
    fn test_request_ids_are_unique() {
        let req = Request::new(());
        let mut make = MakeRequestUuid;
        let a = make.make_request_id(&req).unwrap();
        let b = make.make_request_id(&req).unwrap();
        assert_ne!(a.header_value(), b.header_value());
    }
}
