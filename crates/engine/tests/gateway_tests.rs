use bytes::Bytes;
use mockd_engine::{MockEngine, MockRequest, Resolution};
use mockd_models::{Config, CreateEndpointRequest, Method, MockError};
use mockd_store::EndpointStore;
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;
use std::collections::HashMap;

async fn engine_with_store() -> (MockEngine, EndpointStore) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let store = EndpointStore::new(pool).await.unwrap();
    let engine = MockEngine::new(store.clone(), &Config::default()).unwrap();
    (engine, store)
}

fn request(method: Method, path: &str) -> MockRequest {
    MockRequest {
        method,
        path: path.to_string(),
        headers: HashMap::new(),
        body: Bytes::new(),
    }
}

fn with_header(mut request: MockRequest, name: &str, value: &str) -> MockRequest {
    request.headers.insert(name.to_string(), value.to_string());
    request
}

fn with_body(mut request: MockRequest, body: &str) -> MockRequest {
    request.body = Bytes::copy_from_slice(body.as_bytes());
    request
}

fn assert_static(resolution: Resolution, response: serde_json::Value, status: u16) {
    match resolution {
        Resolution::Static {
            response: got_response,
            status: got_status,
        } => {
            assert_eq!(got_response, response);
            assert_eq!(got_status, status);
        }
        other => panic!("expected static resolution, got {other:?}"),
    }
}

#[tokio::test]
async fn matched_definition_returns_stored_response() {
    let (engine, store) = engine_with_store().await;
    store
        .upsert(CreateEndpointRequest {
            path: "/ping".to_string(),
            method: Method::Get,
            response: json!({"pong": true}),
            status: Some(202),
            auth_key: None,
            schema: None,
            upstream: None,
        })
        .await
        .unwrap();

    let resolution = engine.handle(&request(Method::Get, "/ping")).await.unwrap();
    assert_static(resolution, json!({"pong": true}), 202);
}

#[tokio::test]
async fn unmatched_request_is_no_matching_endpoint() {
    let (engine, store) = engine_with_store().await;
    store
        .upsert(CreateEndpointRequest {
            path: "/ping".to_string(),
            method: Method::Get,
            response: json!({}),
            status: None,
            auth_key: None,
            schema: None,
            upstream: None,
        })
        .await
        .unwrap();

    // Wrong path
    let err = engine.handle(&request(Method::Get, "/pong")).await.unwrap_err();
    assert!(matches!(err, MockError::NoMatchingEndpoint));

    // Right path, wrong method
    let err = engine.handle(&request(Method::Delete, "/ping")).await.unwrap_err();
    assert!(matches!(err, MockError::NoMatchingEndpoint));
}

#[tokio::test]
async fn auth_key_gates_resolution() {
    let (engine, store) = engine_with_store().await;
    store
        .upsert(CreateEndpointRequest {
            path: "/guarded".to_string(),
            method: Method::Get,
            response: json!({"secret": "data"}),
            status: None,
            auth_key: Some("secret".to_string()),
            schema: None,
            upstream: None,
        })
        .await
        .unwrap();

    let ok = engine
        .handle(&with_header(
            request(Method::Get, "/guarded"),
            "authorization",
            "secret",
        ))
        .await
        .unwrap();
    assert_static(ok, json!({"secret": "data"}), 200);

    let err = engine
        .handle(&with_header(
            request(Method::Get, "/guarded"),
            "authorization",
            "wrong",
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, MockError::Unauthorized));

    let err = engine.handle(&request(Method::Get, "/guarded")).await.unwrap_err();
    assert!(matches!(err, MockError::Unauthorized));
}

#[tokio::test]
async fn denied_requests_are_never_validated() {
    let (engine, store) = engine_with_store().await;
    store
        .upsert(CreateEndpointRequest {
            path: "/guarded".to_string(),
            method: Method::Post,
            response: json!({}),
            status: None,
            auth_key: Some("secret".to_string()),
            schema: Some(
                serde_json::from_value(json!({"age": {"required": true}})).unwrap(),
            ),
            upstream: None,
        })
        .await
        .unwrap();

    // Body would fail validation, but the 401 must win
    let err = engine
        .handle(&with_body(request(Method::Post, "/guarded"), "{}"))
        .await
        .unwrap_err();
    assert!(matches!(err, MockError::Unauthorized));
}

#[tokio::test]
async fn schema_violations_become_validation_failed() {
    let (engine, store) = engine_with_store().await;
    store
        .upsert(CreateEndpointRequest {
            path: "/people".to_string(),
            method: Method::Post,
            response: json!({"created": true}),
            status: Some(201),
            auth_key: None,
            schema: Some(
                serde_json::from_value(json!({
                    "age": {"required": true, "type": "int"},
                    "role": {"match": ["admin", "user"]}
                }))
                .unwrap(),
            ),
            upstream: None,
        })
        .await
        .unwrap();

    let ok = engine
        .handle(&with_body(
            request(Method::Post, "/people"),
            r#"{"age": 30, "role": "admin"}"#,
        ))
        .await
        .unwrap();
    assert_static(ok, json!({"created": true}), 201);

    let err = engine
        .handle(&with_body(request(Method::Post, "/people"), "{}"))
        .await
        .unwrap_err();
    match err {
        MockError::ValidationFailed { violations } => {
            assert_eq!(violations.len(), 1);
            assert!(violations[0].to_string().contains("age"));
        }
        other => panic!("expected validation failure, got {other}"),
    }

    let err = engine
        .handle(&with_body(
            request(Method::Post, "/people"),
            r#"{"age": "thirty", "role": "guest"}"#,
        ))
        .await
        .unwrap_err();
    match err {
        MockError::ValidationFailed { violations } => {
            assert_eq!(violations.len(), 2);
        }
        other => panic!("expected validation failure, got {other}"),
    }
}

#[tokio::test]
async fn unparsable_body_with_schema_is_a_validation_error() {
    let (engine, store) = engine_with_store().await;
    store
        .upsert(CreateEndpointRequest {
            path: "/people".to_string(),
            method: Method::Post,
            response: json!({}),
            status: None,
            auth_key: None,
            schema: Some(
                serde_json::from_value(json!({"age": {"required": true}})).unwrap(),
            ),
            upstream: None,
        })
        .await
        .unwrap();

    let err = engine
        .handle(&with_body(request(Method::Post, "/people"), "not json"))
        .await
        .unwrap_err();
    match err {
        MockError::ValidationFailed { violations } => {
            assert_eq!(violations.len(), 1);
            assert!(violations[0].to_string().contains("not valid JSON"));
        }
        other => panic!("expected validation failure, got {other}"),
    }
}

#[tokio::test]
async fn bodyless_methods_skip_validation() {
    let (engine, store) = engine_with_store().await;
    store
        .upsert(CreateEndpointRequest {
            path: "/items".to_string(),
            method: Method::Get,
            response: json!([1, 2, 3]),
            status: None,
            auth_key: None,
            // A schema on a GET definition is inert
            schema: Some(
                serde_json::from_value(json!({"q": {"required": true}})).unwrap(),
            ),
            upstream: None,
        })
        .await
        .unwrap();

    let resolution = engine.handle(&request(Method::Get, "/items")).await.unwrap();
    assert_static(resolution, json!([1, 2, 3]), 200);
}

#[tokio::test]
async fn each_request_observes_latest_committed_definition() {
    let (engine, store) = engine_with_store().await;
    let create = |response: serde_json::Value| CreateEndpointRequest {
        path: "/versioned".to_string(),
        method: Method::Get,
        response,
        status: None,
        auth_key: None,
        schema: None,
        upstream: None,
    };

    store.upsert(create(json!({"v": 1}))).await.unwrap();
    let first = engine.handle(&request(Method::Get, "/versioned")).await.unwrap();
    assert_static(first, json!({"v": 1}), 200);

    store.upsert(create(json!({"v": 2}))).await.unwrap();
    let second = engine.handle(&request(Method::Get, "/versioned")).await.unwrap();
    assert_static(second, json!({"v": 2}), 200);

    let id = store.list().await.unwrap()[0].id;
    store.delete(id).await.unwrap();
    let err = engine.handle(&request(Method::Get, "/versioned")).await.unwrap_err();
    assert!(matches!(err, MockError::NoMatchingEndpoint));
}

#[tokio::test]
async fn concurrent_identical_requests_get_identical_responses() {
    let (engine, store) = engine_with_store().await;
    store
        .upsert(CreateEndpointRequest {
            path: "/stable".to_string(),
            method: Method::Get,
            response: json!({"n": 7}),
            status: Some(200),
            auth_key: None,
            schema: None,
            upstream: None,
        })
        .await
        .unwrap();

    let engine = &engine;
    let results = futures::future::join_all((0..16).map(|_| async move {
        let request = request(Method::Get, "/stable");
        engine.handle(&request).await
    }))
    .await;

    for result in results {
        assert_static(result.unwrap(), json!({"n": 7}), 200);
    }
}
