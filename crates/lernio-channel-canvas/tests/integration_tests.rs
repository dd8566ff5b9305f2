//! Integration tests for the Canvas adapter using wiremock.
//!
//! These tests verify the client against a mock Canvas instance: token
//! exchange, bulk transmission with per-item results, auth failures, rate
//! limiting, and the health probe.

use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lernio_channel::chunk::{chunk_units, TransmissionChunk};
use lernio_channel::traits::{ChannelClient, WireSerializer};
use lernio_channel::types::UnitType;
use lernio_channel::unit::{ExportableUnit, SerializedUnit};
use lernio_channel_canvas::{CanvasClient, CanvasConfig, CanvasSerializer};

// =============================================================================
// Test Helpers
// =============================================================================

fn create_config(base_url: &str) -> CanvasConfig {
    CanvasConfig::new(base_url, "dev-key-id", "dev-key-secret", "refresh-token")
}

fn content_chunk(keys: &[&str]) -> TransmissionChunk {
    let serializer = CanvasSerializer::new();
    let units: Vec<SerializedUnit> = keys
        .iter()
        .map(|key| {
            let unit = ExportableUnit::new(
                (*key).to_string(),
                UnitType::ContentMetadata,
                json!({
                    "content_key": key,
                    "title": format!("Title {key}"),
                    "description": "About the course",
                }),
            );
            let payload = serializer.serialize_content(&unit).unwrap();
            SerializedUnit::new(&unit, payload)
        })
        .collect();
    chunk_units(units, usize::MAX).unwrap().remove(0)
}

async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/login/oauth2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "short-lived-token",
            "token_type": "Bearer",
            "expires_in": 3600,
        })))
        .mount(server)
        .await;
}

// =============================================================================
// Token exchange
// =============================================================================

#[tokio::test]
async fn test_bulk_post_carries_exchanged_token() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/self/bulk_courses"))
        .and(header("Authorization", "Bearer short-lived-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"status": "success"}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CanvasClient::new(create_config(&server.uri())).unwrap();
    let outcome = client.send(&content_chunk(&["course-a"])).await.unwrap();

    assert_eq!(outcome.succeeded, vec!["course-a"]);
    assert!(outcome.failed.is_empty());
}

#[tokio::test]
async fn test_rejected_refresh_token_fails_whole_chunk() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login/oauth2/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_grant"))
        .mount(&server)
        .await;

    let client = CanvasClient::new(create_config(&server.uri())).unwrap();
    let outcome = client
        .send(&content_chunk(&["course-a", "course-b"]))
        .await
        .unwrap();

    assert!(outcome.succeeded.is_empty());
    assert_eq!(outcome.failed.len(), 2);
    assert!(outcome.failed[0].1.contains("authentication failed"));
}

// =============================================================================
// Per-item outcome mapping
// =============================================================================

#[tokio::test]
async fn test_per_item_results_mapped_in_request_order() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/self/bulk_courses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"status": "success"},
                {"status": "error", "message": "course code already in use"},
                {"status": "success"},
            ],
        })))
        .mount(&server)
        .await;

    let client = CanvasClient::new(create_config(&server.uri())).unwrap();
    let outcome = client
        .send(&content_chunk(&["course-a", "course-b", "course-c"]))
        .await
        .unwrap();

    assert_eq!(outcome.succeeded, vec!["course-a", "course-c"]);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].0, "course-b");
    assert!(outcome.failed[0].1.contains("already in use"));
}

#[tokio::test]
async fn test_missing_per_item_result_is_a_failure_not_a_drop() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/self/bulk_courses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"status": "success"}],
        })))
        .mount(&server)
        .await;

    let client = CanvasClient::new(create_config(&server.uri())).unwrap();
    let outcome = client
        .send(&content_chunk(&["course-a", "course-b"]))
        .await
        .unwrap();

    assert_eq!(outcome.succeeded, vec!["course-a"]);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].0, "course-b");
    assert_eq!(outcome.total(), 2);
}

#[tokio::test]
async fn test_acknowledgement_without_results_counts_whole_chunk() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/self/bulk_courses"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = CanvasClient::new(create_config(&server.uri())).unwrap();
    let outcome = client
        .send(&content_chunk(&["course-a", "course-b"]))
        .await
        .unwrap();

    assert_eq!(outcome.succeeded.len(), 2);
    assert!(outcome.failed.is_empty());
}

// =============================================================================
// Whole-chunk failures
// =============================================================================

#[tokio::test]
async fn test_unauthorized_bulk_post_fails_whole_chunk() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/self/bulk_courses"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .mount(&server)
        .await;

    let client = CanvasClient::new(create_config(&server.uri())).unwrap();
    let outcome = client
        .send(&content_chunk(&["course-a", "course-b"]))
        .await
        .unwrap();

    assert!(outcome.succeeded.is_empty());
    assert_eq!(outcome.failed.len(), 2);
    assert!(outcome
        .failed
        .iter()
        .all(|(_, d)| d.contains("authentication failed")));
}

#[tokio::test]
async fn test_server_error_fails_whole_chunk() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/self/bulk_courses"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance window"))
        .mount(&server)
        .await;

    let client = CanvasClient::new(create_config(&server.uri())).unwrap();
    let outcome = client.send(&content_chunk(&["course-a"])).await.unwrap();

    assert_eq!(outcome.failed.len(), 1);
    assert!(outcome.failed[0].1.contains("channel unavailable"));
}

#[tokio::test]
async fn test_rate_limit_honors_retry_after_once() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/self/bulk_courses"))
        .respond_with(
            ResponseTemplate::new(429).insert_header("Retry-After", "0"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/self/bulk_courses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"status": "success"}],
        })))
        .mount(&server)
        .await;

    let client = CanvasClient::new(create_config(&server.uri())).unwrap();
    let outcome = client.send(&content_chunk(&["course-a"])).await.unwrap();

    assert_eq!(outcome.succeeded, vec!["course-a"]);
}

// =============================================================================
// Learner data routing
// =============================================================================

#[tokio::test]
async fn test_learner_chunk_posts_to_completions_endpoint() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/self/bulk_completions"))
        .and(body_string_contains("completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"status": "success"}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let serializer = CanvasSerializer::new();
    let unit = ExportableUnit::new(
        "a@example.com:course-1",
        UnitType::LearnerData,
        json!({
            "learner_id": "a@example.com",
            "content_key": "course-1",
            "status": "completed",
        }),
    );
    let payload = serializer.serialize_learner(&unit).unwrap();
    let chunk = chunk_units(vec![SerializedUnit::new(&unit, payload)], 1)
        .unwrap()
        .remove(0);

    let client = CanvasClient::new(create_config(&server.uri())).unwrap();
    let outcome = client.send(&chunk).await.unwrap();

    assert_eq!(outcome.succeeded, vec!["a@example.com:course-1"]);
}

// =============================================================================
// Health probe
// =============================================================================

#[tokio::test]
async fn test_probe_success() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/self"))
        .and(header("Authorization", "Bearer short-lived-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .mount(&server)
        .await;

    let client = CanvasClient::new(create_config(&server.uri())).unwrap();
    assert!(client.probe().await.is_ok());
}

#[tokio::test]
async fn test_probe_auth_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login/oauth2/token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = CanvasClient::new(create_config(&server.uri())).unwrap();
    let err = client.probe().await.unwrap_err();
    assert_eq!(err.error_code(), "AUTH_FAILED");
}

#[tokio::test]
async fn test_token_cached_for_client_lifetime() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "short-lived-token",
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/self"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .mount(&server)
        .await;

    let client = CanvasClient::new(create_config(&server.uri())).unwrap();
    client.probe().await.unwrap();
    // Second call reuses the cached token; the token mock expects exactly one hit
    client.probe().await.unwrap();
}
