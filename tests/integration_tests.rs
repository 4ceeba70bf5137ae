//! Integration tests using wiremock to simulate the storefront API.

use decanter::{Client, Error, RequestSpec, RetryPolicy};
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Wine {
    id: u32,
    name: String,
}

fn sample_wine() -> Wine {
    Wine {
        id: 42,
        name: "Rift Valley Syrah".to_string(),
    }
}

async fn client_for(server: &MockServer) -> Client {
    Client::builder()
        .base_url(server.uri())
        .unwrap()
        .build()
        .unwrap()
}

#[tokio::test]
async fn get_decodes_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wines/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_wine()))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let response = client.get::<Wine>("/wines/42").await.unwrap();

    assert_eq!(response.data, sample_wine());
    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.attempts, 1);
    assert!(!response.was_retried());
}

#[tokio::test]
async fn post_serializes_body_as_json() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wines"))
        .and(body_json(json!({"id": 42, "name": "Rift Valley Syrah"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(sample_wine()))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let response = client
        .post::<Wine, Wine>("/wines", &sample_wine())
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 201);
    assert_eq!(response.data, sample_wine());
}

#[tokio::test]
async fn not_found_carries_server_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wines"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "no wines matched",
            "code": "WINE_NOT_FOUND",
            "details": {"search": "zinfandel"}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let result = client.get::<Vec<Wine>>("/wines").await;

    match result {
        Err(Error::Http {
            status,
            message,
            code,
            details,
            ..
        }) => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(message, "no wines matched");
            assert_eq!(code.as_deref(), Some("WINE_NOT_FOUND"));
            assert_eq!(details.unwrap()["search"], "zinfandel");
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_error_body_becomes_the_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wines/42"))
        .respond_with(ResponseTemplate::new(500).set_body_string("cellar on fire"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let result = client.get::<Wine>("/wines/42").await;

    match result {
        Err(Error::Http { status, message, .. }) => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(message, "cellar on fire");
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn transient_failures_are_retried_until_success() {
    let server = MockServer::start().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_in_mock = hits.clone();

    Mock::given(method("GET"))
        .and(path("/wines/42"))
        .respond_with(move |_req: &Request| {
            if hits_in_mock.fetch_add(1, Ordering::SeqCst) < 2 {
                ResponseTemplate::new(503).set_body_string("restocking")
            } else {
                ResponseTemplate::new(200).set_body_json(sample_wine())
            }
        })
        .mount(&server)
        .await;

    let client = Client::builder()
        .base_url(server.uri())
        .unwrap()
        .retry_policy(RetryPolicy::new(3).with_delay(Duration::from_millis(10)))
        .build()
        .unwrap();

    let response = client.get::<Wine>("/wines/42").await.unwrap();

    assert_eq!(response.data, sample_wine());
    assert_eq!(response.attempts, 3);
    assert!(response.was_retried());
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn exhausted_retries_surface_the_last_error_unchanged() {
    let server = MockServer::start().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_in_mock = hits.clone();

    Mock::given(method("GET"))
        .and(path("/wines/42"))
        .respond_with(move |_req: &Request| {
            hits_in_mock.fetch_add(1, Ordering::SeqCst);
            ResponseTemplate::new(500).set_body_string("still broken")
        })
        .mount(&server)
        .await;

    let client = Client::builder()
        .base_url(server.uri())
        .unwrap()
        .retry_policy(RetryPolicy::new(3).with_delay(Duration::from_millis(10)))
        .build()
        .unwrap();

    let result = client.get::<Wine>("/wines/42").await;

    match result {
        Err(Error::Http { status, message, .. }) => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(message, "still broken");
        }
        other => panic!("expected Http error, got {other:?}"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_in_mock = hits.clone();

    Mock::given(method("GET"))
        .and(path("/wines/42"))
        .respond_with(move |_req: &Request| {
            hits_in_mock.fetch_add(1, Ordering::SeqCst);
            ResponseTemplate::new(400).set_body_json(json!({"message": "bad request"}))
        })
        .mount(&server)
        .await;

    let client = Client::builder()
        .base_url(server.uri())
        .unwrap()
        .retry_policy(RetryPolicy::new(5).with_delay(Duration::from_millis(10)))
        .build()
        .unwrap();

    let result = client.get::<Wine>("/wines/42").await;

    assert_eq!(result.unwrap_err().status().map(|s| s.as_u16()), Some(400));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn no_retries_without_a_policy() {
    let server = MockServer::start().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_in_mock = hits.clone();

    Mock::given(method("GET"))
        .and(path("/wines/42"))
        .respond_with(move |_req: &Request| {
            hits_in_mock.fetch_add(1, Ordering::SeqCst);
            ResponseTemplate::new(503).set_body_string("restocking")
        })
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let result = client.get::<Wine>("/wines/42").await;

    assert!(result.is_err());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn per_request_policy_overrides_client_default() {
    let server = MockServer::start().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_in_mock = hits.clone();

    Mock::given(method("GET"))
        .and(path("/wines/42"))
        .respond_with(move |_req: &Request| {
            hits_in_mock.fetch_add(1, Ordering::SeqCst);
            ResponseTemplate::new(503).set_body_string("restocking")
        })
        .mount(&server)
        .await;

    // Client default: no retries. The spec asks for two attempts.
    let client = client_for(&server).await;
    let spec = RequestSpec::new(Method::GET, "/wines/42")
        .with_retry(RetryPolicy::new(2).with_delay(Duration::from_millis(10)));

    let result = client.send::<(), Wine>(spec, None).await;

    assert!(result.is_err());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn retry_after_header_is_honored_for_rate_limits() {
    let server = MockServer::start().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_in_mock = hits.clone();

    Mock::given(method("GET"))
        .and(path("/wines/42"))
        .respond_with(move |_req: &Request| {
            if hits_in_mock.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "1")
                    .set_body_json(json!({"message": "rate limited"}))
            } else {
                ResponseTemplate::new(200).set_body_json(sample_wine())
            }
        })
        .mount(&server)
        .await;

    let client = Client::builder()
        .base_url(server.uri())
        .unwrap()
        .retry_policy(RetryPolicy::new(3).with_delay(Duration::from_millis(10)))
        .build()
        .unwrap();

    let start = Instant::now();
    let response = client.get::<Wine>("/wines/42").await.unwrap();

    assert_eq!(response.attempts, 2);
    assert!(start.elapsed() >= Duration::from_millis(900));
}

#[tokio::test]
async fn connection_failures_classify_as_network_and_retry() {
    // Nothing listens here; reqwest fails before any HTTP exchange.
    let client = Client::builder()
        .base_url("http://127.0.0.1:1")
        .unwrap()
        .retry_policy(RetryPolicy::new(2).with_delay(Duration::from_millis(50)))
        .build()
        .unwrap();

    let start = Instant::now();
    let result = client.get::<Wine>("/wines/42").await;

    match result {
        Err(Error::Network(_)) | Err(Error::Timeout) => {}
        other => panic!("expected a transport error, got {other:?}"),
    }
    // Two attempts means one inter-attempt wait happened.
    assert!(start.elapsed() >= Duration::from_millis(50));
}

#[tokio::test]
async fn query_parameters_reach_the_server() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wines"))
        .and(query_param("search", "syrah"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![sample_wine()]))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let spec = RequestSpec::new(Method::GET, "/wines")
        .with_query("search", "syrah")
        .with_query("page", "2");

    let response = client.send::<(), Vec<Wine>>(spec, None).await.unwrap();
    assert_eq!(response.data.len(), 1);
}

#[tokio::test]
async fn default_and_request_headers_are_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wines"))
        .and(wiremock::matchers::header("x-storefront", "tasty-wine"))
        .and(wiremock::matchers::header("x-request-tag", "inventory"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<Wine>::new()))
        .mount(&server)
        .await;

    let client = Client::builder()
        .base_url(server.uri())
        .unwrap()
        .default_header("x-storefront", "tasty-wine")
        .unwrap()
        .build()
        .unwrap();

    let spec = RequestSpec::new(Method::GET, "/wines")
        .with_header("x-request-tag", "inventory")
        .unwrap();

    let response = client.send::<(), Vec<Wine>>(spec, None).await.unwrap();
    assert!(response.data.is_empty());
}

#[tokio::test]
async fn all_methods_round_trip() {
    let server = MockServer::start().await;

    for verb in ["PUT", "PATCH"] {
        Mock::given(method(verb))
            .and(path("/wines/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_wine()))
            .mount(&server)
            .await;
    }
    Mock::given(method("DELETE"))
        .and(path("/wines/42"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = client_for(&server).await;

    let updated = client
        .put::<Wine, Wine>("/wines/42", &sample_wine())
        .await
        .unwrap();
    assert_eq!(updated.data, sample_wine());

    let patched = client
        .patch::<Wine, Wine>("/wines/42", &sample_wine())
        .await
        .unwrap();
    assert_eq!(patched.data, sample_wine());

    // 204 has no body; it decodes into the unit type.
    let deleted = client.delete::<()>("/wines/42").await.unwrap();
    assert_eq!(deleted.status.as_u16(), 204);
}

#[tokio::test]
async fn invalid_json_in_success_body_is_a_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wines/42"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let result = client.get::<Wine>("/wines/42").await;

    match result {
        Err(Error::Deserialization {
            status, raw_body, ..
        }) => {
            assert_eq!(status.as_u16(), 200);
            assert_eq!(raw_body, "not json");
        }
        other => panic!("expected Deserialization error, got {other:?}"),
    }
}

#[tokio::test]
async fn latency_accounts_for_retries() {
    let server = MockServer::start().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_in_mock = hits.clone();

    Mock::given(method("GET"))
        .and(path("/wines/42"))
        .respond_with(move |_req: &Request| {
            if hits_in_mock.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(502).set_body_string("upstream hiccup")
            } else {
                ResponseTemplate::new(200).set_body_json(sample_wine())
            }
        })
        .mount(&server)
        .await;

    let client = Client::builder()
        .base_url(server.uri())
        .unwrap()
        .retry_policy(RetryPolicy::new(2).with_delay(Duration::from_millis(100)))
        .build()
        .unwrap();

    let response = client.get::<Wine>("/wines/42").await.unwrap();

    assert_eq!(response.attempts, 2);
    assert!(response.latency >= Duration::from_millis(100));
}
