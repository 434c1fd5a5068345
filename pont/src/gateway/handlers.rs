use super::AppState;
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use pont_core::{Metadata, ProxyError};
use serde_json::json;

const CALL_PREFIX: &str = "/v1/";

/// Liveness probe. Doesn't look at the upstream.
pub async fn health() -> Response {
    Json(json!({ "status": "UP" })).into_response()
}

/// Returns the introspection catalog of the upstream.
pub async fn introspect(State(state): State<AppState>) -> Response {
    if !state.gateway.is_ready() {
        return not_ready();
    }

    match state.gateway.introspect().await {
        Ok(catalog) => json_response(catalog),
        Err(err) => {
            tracing::error!(code = %err.code(), error = %err, "error in introspection");
            error_response(&err)
        }
    }
}

/// Calls `/v1/{service}/{method}` with the request body as JSON input.
///
/// Every request header is forwarded to the upstream as call metadata.
pub async fn invoke(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let Some((service, rpc)) = parse_call_path(uri.path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if !state.gateway.is_ready() {
        return not_ready();
    }

    let ctx = state.call_context();
    let metadata = Metadata::from_headers(&headers);

    match state
        .gateway
        .invoke(&ctx, service, rpc, &body, &metadata)
        .await
    {
        Ok(output) => json_response(output),
        Err(err) => {
            tracing::error!(
                service,
                method = rpc,
                code = %err.code(),
                error = %err,
                "error in handling call"
            );
            error_response(&err)
        }
    }
}

/// Answers every path no other route matched.
pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Splits `/v1/{service}/{method}`. Both segments must be present and non empty.
fn parse_call_path(path: &str) -> Option<(&str, &str)> {
    let (service, method) = path.strip_prefix(CALL_PREFIX)?.split_once('/')?;

    if service.is_empty() || method.is_empty() || method.contains('/') {
        return None;
    }

    Some((service, method))
}

fn not_ready() -> Response {
    let err = ProxyError::UpstreamConnFailure("upstream connection is not ready".to_string());
    error_response(&err)
}

fn json_response(body: Vec<u8>) -> Response {
    (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        )],
        body,
    )
        .into_response()
}

fn error_response(err: &ProxyError) -> Response {
    (err.status_code(), json_response(err.to_json())).into_response()
}
