//! Turns a matched, authorized, validated definition into a response:
//! either the stored canned response or a relayed upstream call.

use crate::gateway::MockRequest;
use bytes::Bytes;
use mockd_models::{EndpointDefinition, Method, MockError};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

/// Outcome of resolution, consumed by the HTTP boundary.
#[derive(Debug)]
pub enum Resolution {
    Static { response: Value, status: u16 },
    Proxied {
        status: u16,
        headers: Vec<(String, String)>,
        body: Bytes,
    },
}

/// Request headers never forwarded upstream: `host` belongs to the
/// upstream connection, `content-length` is re-framed by the client.
const SKIPPED_REQUEST_HEADERS: [&str; 2] = ["host", "content-length"];

/// Hop-by-hop response headers that must not be relayed to the caller
/// (the relayed body is already fully buffered and re-framed).
const HOP_BY_HOP_HEADERS: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "content-length",
];

pub struct Resolver {
    client: reqwest::Client,
}

impl Resolver {
    /// The client is built once with the configured timeout so a slow or
    /// unreachable upstream cannot stall a handling task indefinitely.
    pub fn new(timeout: Duration) -> Result<Self, MockError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MockError::ConfigError {
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }

    pub async fn resolve(
        &self,
        definition: &EndpointDefinition,
        request: &MockRequest,
        body: Option<&Value>,
    ) -> Result<Resolution, MockError> {
        match &definition.upstream {
            None => Ok(Resolution::Static {
                // Fresh clone per request; callers never share a mutable
                // view of the stored value.
                response: definition.response.clone(),
                status: definition.status,
            }),
            Some(upstream) => self.forward(upstream, request, body).await,
        }
    }

    /// Transparent pass-through: same method, forwarded headers minus
    /// `host`, JSON body if one parsed, and the upstream's status,
    /// headers and body bytes relayed verbatim.
    #[instrument(skip(self, request, body), fields(method = %request.method, upstream = %upstream))]
    async fn forward(
        &self,
        upstream: &str,
        request: &MockRequest,
        body: Option<&Value>,
    ) -> Result<Resolution, MockError> {
        let mut outbound = self
            .client
            .request(to_reqwest_method(request.method), upstream);

        for (name, value) in &request.headers {
            if SKIPPED_REQUEST_HEADERS.contains(&name.as_str()) {
                continue;
            }
            outbound = outbound.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            outbound = outbound.json(body);
        }

        let response = outbound
            .send()
            .await
            .map_err(|e| MockError::UpstreamUnreachable {
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter(|(name, _)| !HOP_BY_HOP_HEADERS.contains(&name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| MockError::UpstreamUnreachable {
                reason: e.to_string(),
            })?;

        debug!(status, bytes = bytes.len(), "Relaying upstream response");
        Ok(Resolution::Proxied {
            status,
            headers,
            body: bytes,
        })
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}
