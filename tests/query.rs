//! Query client integration tests against a mock generation service

use std::time::Duration;

use axum::http::StatusCode;
use mouthpiece::query::{CONNECTION_ERROR_REPLY, EMPTY_RESPONSE_REPLY, TIMED_OUT_REPLY};
use mouthpiece::{MetricsAggregator, QueryClient, QueryOutcome};
use serde_json::json;

mod common;
use common::{MockGenerator, generation_config, unreachable_endpoint};

#[tokio::test]
async fn test_success_returns_trimmed_reply() {
    let server = MockGenerator::replying("  Hi there!\n").await;
    let client = QueryClient::new(generation_config(&server.url)).unwrap();

    let result = client.query("Hello").await;

    assert_eq!(result.outcome, QueryOutcome::Success);
    assert_eq!(result.reply, "Hi there!");
    assert!(result.elapsed > Duration::ZERO);
}

#[tokio::test]
async fn test_request_body_shape() {
    let server = MockGenerator::replying("ok").await;
    let client = QueryClient::new(generation_config(&server.url)).unwrap();

    client.query("What is Rust?").await;

    let requests = server.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request["model"], "phi3:mini");
    assert_eq!(request["stream"], false);
    assert_eq!(request["options"]["num_predict"], -1);
    assert!((request["options"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    let prompt = request["prompt"].as_str().unwrap();
    assert!(prompt.ends_with("User question: What is Rust?"));
}

#[tokio::test]
async fn test_empty_response() {
    let server = MockGenerator::start(
        StatusCode::OK,
        json!({ "response": "   " }),
        Duration::ZERO,
    )
    .await;
    let client = QueryClient::new(generation_config(&server.url)).unwrap();

    let result = client.query("Hello").await;

    assert_eq!(result.outcome, QueryOutcome::EmptyResponse);
    assert_eq!(result.reply, EMPTY_RESPONSE_REPLY);
}

#[tokio::test]
async fn test_missing_response_field_is_empty() {
    let server = MockGenerator::start(StatusCode::OK, json!({ "done": true }), Duration::ZERO).await;
    let client = QueryClient::new(generation_config(&server.url)).unwrap();

    let result = client.query("Hello").await;

    assert_eq!(result.outcome, QueryOutcome::EmptyResponse);
}

#[tokio::test]
async fn test_service_error_embeds_status() {
    let server = MockGenerator::start(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": "model not loaded" }),
        Duration::ZERO,
    )
    .await;
    let client = QueryClient::new(generation_config(&server.url)).unwrap();

    let result = client.query("Hello").await;

    assert_eq!(result.outcome, QueryOutcome::ServiceError(500));
    assert_eq!(result.reply, "Error 500 while querying the AI.");
}

#[tokio::test]
async fn test_unreachable_endpoint_is_connection_error() {
    let client = QueryClient::new(generation_config(&unreachable_endpoint())).unwrap();

    let result = client.query("Hello").await;

    assert_eq!(result.outcome, QueryOutcome::ConnectionError);
    assert_eq!(result.reply, CONNECTION_ERROR_REPLY);
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let server =
        MockGenerator::start(StatusCode::OK, json!({ "response": "late" }), Duration::from_secs(3))
            .await;
    let mut config = generation_config(&server.url);
    config.timeout = Duration::from_millis(200);
    let client = QueryClient::new(config).unwrap();

    let result = client.query("Hello").await;

    assert_eq!(result.outcome, QueryOutcome::TimedOut);
    assert_eq!(result.reply, TIMED_OUT_REPLY);
    assert!(result.elapsed < Duration::from_secs(3));
}

#[tokio::test]
async fn test_undecodable_body_is_unknown_error() {
    let server = MockGenerator::serving_text("not json").await;
    let client = QueryClient::new(generation_config(&server.url)).unwrap();

    let result = client.query("Hello").await;

    let QueryOutcome::UnknownError(tag) = &result.outcome else {
        panic!("expected unknown error, got {:?}", result.outcome);
    };
    assert_eq!(tag, "decode");
    assert!(result.reply.contains("(decode)"));
    assert_eq!(server.request_count(), 1);

    let mut metrics = MetricsAggregator::new();
    metrics.record_llm(result.elapsed, &result.outcome);
    let m = metrics.snapshot();
    assert_eq!(m.llm_errors, 1);
    assert!(m.total_llm_time.abs() < f64::EPSILON);
}
