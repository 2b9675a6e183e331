//! The request pipeline: Received → Matched → Authorized → Validated →
//! Resolved, with an early exit at each stage.

use crate::{authorizer, matcher, validator};
use crate::resolver::{Resolution, Resolver};
use bytes::Bytes;
use mockd_models::{Config, Method, MockError};
use mockd_store::EndpointStore;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// A transport-agnostic view of one inbound request. Header names are
/// lowercased by the boundary before they get here.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: Method,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

pub struct MockEngine {
    store: EndpointStore,
    resolver: Resolver,
}

impl MockEngine {
    pub fn new(store: EndpointStore, config: &Config) -> Result<Self, MockError> {
        let resolver = Resolver::new(Duration::from_millis(config.upstream.timeout_ms))?;
        Ok(Self { store, resolver })
    }

    /// Decide what one inbound request gets. Each stage short-circuits
    /// with a typed error the boundary maps to an HTTP response; the
    /// store is read fresh so the latest committed definition wins.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn handle(&self, request: &MockRequest) -> Result<Resolution, MockError> {
        let definitions = self.store.list().await?;
        let definition = matcher::find(&definitions, request.method, &request.path)?;
        debug!(id = definition.id, "Matched endpoint definition");

        authorizer::authorize(definition, &request.headers)?;

        if request.method.has_body() {
            if let Some(schema) = &definition.schema {
                let violations = validator::validate(schema, &request.body);
                if !violations.is_empty() {
                    return Err(MockError::ValidationFailed { violations });
                }
            }
        }

        // Parsed body rides along for proxy forwarding; a body that is
        // not JSON is forwarded as no body.
        let body = parse_body_silently(&request.body);
        self.resolver.resolve(definition, request, body.as_ref()).await
    }
}

fn parse_body_silently(body: &[u8]) -> Option<Value> {
    if body.is_empty() {
        return None;
    }
    serde_json::from_slice(body).ok()
}
