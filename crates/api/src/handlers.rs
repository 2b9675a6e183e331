use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Json, Response},
};
use mockd_engine::{MockRequest, Resolution};
use mockd_models::{
    CreateEndpointRequest, EndpointDefinition, ErrorShape, ListEndpointsResponse,
    MessageResponse, Method, MockError, UpdateEndpointRequest,
};
use std::collections::HashMap;
use tracing::{error, info, instrument};

use crate::AppState;

/// Largest request body the mock surface will buffer.
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[instrument(skip(state, body))]
pub async fn create_endpoint(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<MessageResponse>), (StatusCode, Json<ErrorShape>)> {
    // Parsed by hand so a malformed config is a 400 on this surface,
    // never an extractor rejection.
    let request: CreateEndpointRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            let err = MockError::MalformedDefinition {
                reason: e.to_string(),
            };
            return Err((
                StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::BAD_REQUEST),
                Json(err.to_error_shape()),
            ));
        }
    };

    info!(
        "Creating endpoint definition: {} {}",
        request.method, request.path
    );

    match state.store.upsert(request).await {
        Ok(_) => Ok((
            StatusCode::CREATED,
            Json(MessageResponse {
                message: "Endpoint created/updated successfully.".to_string(),
            }),
        )),
        Err(e) => {
            error!("Failed to create endpoint: {}", e);
            Err((
                StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                Json(e.to_error_shape()),
            ))
        }
    }
}

#[instrument(skip(state, body))]
pub async fn edit_endpoint(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<MessageResponse>, (StatusCode, Json<ErrorShape>)> {
    let request: UpdateEndpointRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            let err = MockError::MalformedDefinition {
                reason: e.to_string(),
            };
            return Err((
                StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::BAD_REQUEST),
                Json(err.to_error_shape()),
            ));
        }
    };

    info!("Updating endpoint definition: {}", id);

    match state.store.update(id, request).await {
        Ok(_) => Ok(Json(MessageResponse {
            message: "Endpoint updated successfully.".to_string(),
        })),
        Err(e) => {
            error!("Failed to update endpoint {}: {}", id, e);
            Err((
                StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                Json(e.to_error_shape()),
            ))
        }
    }
}

#[instrument(skip(state))]
pub async fn delete_endpoint(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, (StatusCode, Json<ErrorShape>)> {
    info!("Deleting endpoint definition: {}", id);

    match state.store.delete(id).await {
        Ok(_) => Ok(Json(MessageResponse {
            message: "Endpoint deleted.".to_string(),
        })),
        Err(e) => {
            error!("Failed to delete endpoint {}: {}", id, e);
            Err((
                StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                Json(e.to_error_shape()),
            ))
        }
    }
}

#[instrument(skip(state))]
pub async fn list_endpoints(
    State(state): State<AppState>,
) -> Result<Json<ListEndpointsResponse>, (StatusCode, Json<ErrorShape>)> {
    match state.store.list().await {
        Ok(endpoints) => Ok(Json(ListEndpointsResponse { endpoints })),
        Err(e) => {
            error!("Failed to list endpoints: {}", e);
            Err((
                StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                Json(e.to_error_shape()),
            ))
        }
    }
}

#[instrument(skip(state))]
pub async fn get_endpoint(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<EndpointDefinition>, (StatusCode, Json<ErrorShape>)> {
    match state.store.get(id).await {
        Ok(endpoint) => Ok(Json(endpoint)),
        Err(e) => {
            error!("Failed to get endpoint {}: {}", id, e);
            Err((
                StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                Json(e.to_error_shape()),
            ))
        }
    }
}

/// The mock-serving surface: everything under `/api` goes through the
/// engine pipeline. The stored path is the part after the prefix.
#[instrument(skip(state, req))]
pub async fn mock_gateway(State(state): State<AppState>, req: Request<Body>) -> Response {
    let method_raw = req.method().as_str().to_string();
    let uri = req.uri().clone();
    let sub_path = uri.path().strip_prefix("/api").unwrap_or(uri.path()).to_string();

    state.metrics.record_request(&method_raw, &sub_path).await;

    let method = match method_raw.parse::<Method>() {
        Ok(method) => method,
        Err(_) => {
            // Methods outside the definition set can never match
            state.metrics.record_unmatched().await;
            return error_response(&MockError::NoMatchingEndpoint);
        }
    };

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.as_str().to_string(), s.to_string())))
        .collect();

    let body = axum::body::to_bytes(req.into_body(), MAX_BODY_BYTES)
        .await
        .unwrap_or_else(|_| Bytes::new());

    let mock_request = MockRequest {
        method,
        path: sub_path,
        headers,
        body,
    };

    match state.engine.handle(&mock_request).await {
        Ok(Resolution::Static { response, status }) => {
            state.metrics.record_served().await;
            (
                StatusCode::from_u16(status).unwrap_or(StatusCode::OK),
                Json(response),
            )
                .into_response()
        }
        Ok(Resolution::Proxied {
            status,
            headers,
            body,
        }) => {
            state.metrics.record_proxied().await;
            let mut header_map = HeaderMap::new();
            for (name, value) in headers {
                if let Ok(name) = HeaderName::from_bytes(name.as_bytes()) {
                    if let Ok(value) = HeaderValue::from_str(&value) {
                        header_map.insert(name, value);
                    }
                }
            }
            (
                StatusCode::from_u16(status).unwrap_or(StatusCode::OK),
                header_map,
                Body::from(body),
            )
                .into_response()
        }
        Err(e) => {
            match &e {
                MockError::NoMatchingEndpoint => state.metrics.record_unmatched().await,
                MockError::Unauthorized => state.metrics.record_unauthorized().await,
                MockError::ValidationFailed { .. } => {
                    state.metrics.record_validation_failure().await
                }
                MockError::UpstreamUnreachable { .. } => {
                    state.metrics.record_upstream_error().await
                }
                _ => error!("Mock request failed: {}", e),
            }
            error_response(&e)
        }
    }
}

fn error_response(e: &MockError) -> Response {
    (
        StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(e.to_error_shape()),
    )
        .into_response()
}

#[instrument(skip(_state))]
pub async fn health_check(State(_state): State<AppState>) -> Result<&'static str, StatusCode> {
    Ok("OK")
}

#[instrument(skip(state))]
pub async fn metrics(State(state): State<AppState>) -> Result<String, StatusCode> {
    match state.metrics.get_prometheus_metrics().await {
        Ok(metrics) => Ok(metrics),
        Err(e) => {
            error!("Failed to get metrics: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
